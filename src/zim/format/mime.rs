//! MIME type list parsing.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::zim::error::Result;
use crate::zim::format::read_nul_string;

/// Reads the ordered MIME name list starting at `offset`.
///
/// The list is a run of NUL-terminated UTF-8 strings closed by an empty
/// string (a lone NUL). Directory entries reference the result by index,
/// so the order must be preserved.
pub fn parse<R: Read + Seek>(r: &mut R, offset: u64) -> Result<Vec<String>> {
    r.seek(SeekFrom::Start(offset))?;

    let mut mime_types = Vec::new();
    loop {
        let name = read_nul_string(r, "MIME list")?;
        if name.is_empty() {
            break;
        }
        mime_types.push(name);
    }

    debug!("MIME list parsed: {} entries", mime_types.len());
    Ok(mime_types)
}
