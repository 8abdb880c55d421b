//! Archive header parsing.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::zim::error::{Result, ZimError};
use crate::zim::models::{Header, ZIM_MAGIC};

/// Parses the fixed archive header from the start of the stream.
///
/// # Header Structure
/// ```text
/// [ 4 bytes] magic number (0x044D495A)
/// [ 4 bytes] version
/// [16 bytes] uuid
/// [ 4 bytes] article count
/// [ 4 bytes] cluster count
/// [ 8 bytes] URL pointer table offset
/// [ 8 bytes] title pointer table offset
/// [ 8 bytes] cluster pointer table offset
/// [ 8 bytes] MIME list offset
/// [ 4 bytes] main page index
/// [ 4 bytes] layout page index
/// [ 8 bytes] checksum section offset
/// ```
///
/// # Errors
/// Fails with [`ZimError::Truncated`] if the stream is shorter than the
/// fixed header, or [`ZimError::InvalidFormat`] if the magic number does
/// not match.
pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Header> {
    r.seek(SeekFrom::Start(0))?;

    let magic = read_u32(r)?;
    if magic != ZIM_MAGIC {
        return Err(ZimError::InvalidFormat(format!(
            "bad magic number {:#010x}, expected {:#010x}",
            magic, ZIM_MAGIC
        )));
    }

    let version = read_u32(r)?;
    let mut uuid = [0u8; 16];
    r.read_exact(&mut uuid)
        .map_err(|e| ZimError::from_read(e, "archive header"))?;

    let header = Header {
        magic,
        version,
        uuid,
        article_count: read_u32(r)?,
        cluster_count: read_u32(r)?,
        url_ptr_pos: read_u64(r)?,
        title_ptr_pos: read_u64(r)?,
        cluster_ptr_pos: read_u64(r)?,
        mime_list_pos: read_u64(r)?,
        main_page: read_u32(r)?,
        layout_page: read_u32(r)?,
        checksum_pos: read_u64(r)?,
    };

    debug!(
        "header parsed: version={}, {} articles, {} clusters",
        header.version, header.article_count, header.cluster_count
    );

    Ok(header)
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    r.read_u32::<LittleEndian>()
        .map_err(|e| ZimError::from_read(e, "archive header"))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    r.read_u64::<LittleEndian>()
        .map_err(|e| ZimError::from_read(e, "archive header"))
}
