//! Fixed-layout parsing for the ZIM container format.
//!
//! This module provides the mid-level parsing layer that bridges between
//! raw file I/O and the high-level [`ZimArchive`](crate::zim::archive::ZimArchive).
//!
//! # Module Organization
//!
//! - [`header`]: Parses the fixed archive header
//! - [`mime`]: Parses the NUL-terminated MIME type list
//! - [`entry`]: Parses a single directory entry at a given offset
//!
//! All multi-byte fields are little-endian; strings are NUL-terminated
//! UTF-8 and decode strictly (invalid bytes are a format error, never
//! replaced).

use std::io::Read;

use byteorder::ReadBytesExt;

use super::error::{Result, ZimError};

pub mod entry;
pub mod header;
pub mod mime;

/// Reads a NUL-terminated UTF-8 string, consuming the terminator.
pub(crate) fn read_nul_string<R: Read>(r: &mut R, field: &'static str) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let b = r.read_u8().map_err(|e| ZimError::from_read(e, field))?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    String::from_utf8(bytes).map_err(|source| ZimError::InvalidUtf8 { field, source })
}
