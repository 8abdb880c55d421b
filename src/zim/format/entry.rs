//! Directory entry parsing.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::zim::error::{Result, ZimError};
use crate::zim::format::read_nul_string;
use crate::zim::models::{DirectoryEntry, EntryCommon, REDIRECT_MIME};

/// Parses the directory entry stored at `offset`.
///
/// The leading 16-bit field is the dispatch point: [`REDIRECT_MIME`]
/// selects the redirect variant, any other value is a real MIME index on a
/// content entry.
///
/// # On-disk layout
/// ```text
/// [2 bytes] MIME index, or 0xFFFF for a redirect
/// [1 byte ] parameter length
/// [1 byte ] namespace
/// [4 bytes] revision
/// content:  [4 bytes] cluster number, [4 bytes] blob number
/// redirect: [4 bytes] target entry index
/// [..     ] URL (NUL-terminated)
/// [..     ] title (NUL-terminated)
/// [..     ] parameter bytes
/// ```
pub fn parse<R: Read + Seek>(r: &mut R, offset: u64) -> Result<DirectoryEntry> {
    r.seek(SeekFrom::Start(offset))?;

    let mime = read_u16(r)?;
    let parameter_len = r
        .read_u8()
        .map_err(|e| ZimError::from_read(e, "directory entry"))?;
    let namespace = r
        .read_u8()
        .map_err(|e| ZimError::from_read(e, "directory entry"))?;
    let revision = read_u32(r)?;

    if mime == REDIRECT_MIME {
        let target_index = read_u32(r)?;
        let common = read_common(r, namespace, revision, parameter_len)?;
        Ok(DirectoryEntry::Redirect {
            target_index,
            common,
        })
    } else {
        let cluster_number = read_u32(r)?;
        let blob_number = read_u32(r)?;
        let common = read_common(r, namespace, revision, parameter_len)?;
        Ok(DirectoryEntry::Content {
            mime_index: mime,
            cluster_number,
            blob_number,
            common,
        })
    }
}

/// Reads the trailing fields shared by both variants.
fn read_common<R: Read>(
    r: &mut R,
    namespace: u8,
    revision: u32,
    parameter_len: u8,
) -> Result<EntryCommon> {
    let url = read_nul_string(r, "entry URL")?;
    let title = read_nul_string(r, "entry title")?;
    let mut parameter = vec![0u8; parameter_len as usize];
    r.read_exact(&mut parameter)
        .map_err(|e| ZimError::from_read(e, "entry parameter"))?;

    Ok(EntryCommon {
        namespace,
        revision,
        url,
        title,
        parameter,
    })
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    r.read_u16::<LittleEndian>()
        .map_err(|e| ZimError::from_read(e, "directory entry"))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    r.read_u32::<LittleEndian>()
        .map_err(|e| ZimError::from_read(e, "directory entry"))
}
