//! Decompression dispatch for cluster payloads.
//!
//! ZIM clusters can be stored raw or compressed with one of three codecs:
//! - Bzip2 (tag 3) via the bzip2 crate
//! - LZMA (tag 4) via lzma-rs
//! - Zstandard (tag 5) via the zstd crate
//!
//! The legacy zip tag (2) is no longer supported and fails fatally. Each
//! codec is an opaque byte transform: compressed bytes in, a fully
//! materialized decompressed buffer out.

use std::io::{Cursor, Read};

use bzip2::read::BzDecoder;
use log::trace;

use super::error::{Result, ZimError};
use super::models::CompressionType;

/// Decompresses a whole cluster payload into memory.
///
/// `CompressionType::None` payloads are handled by positioned reads in the
/// cluster store and never reach this function.
pub fn decompress(compression: CompressionType, payload: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(payload.to_vec()),
        CompressionType::Zip => Err(ZimError::UnsupportedCompression(2)),
        CompressionType::Bzip2 => {
            trace!("decompressing {} bytes with bzip2", payload.len());
            let mut out = Vec::new();
            BzDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|e| ZimError::Decompression(format!("bzip2: {}", e)))?;
            Ok(out)
        }
        CompressionType::Lzma => {
            trace!("decompressing {} bytes with lzma", payload.len());
            let mut out = Vec::new();
            lzma_rs::lzma_decompress(&mut Cursor::new(payload), &mut out)
                .map_err(|e| ZimError::Decompression(format!("lzma: {}", e)))?;
            Ok(out)
        }
        CompressionType::Zstd => {
            trace!("decompressing {} bytes with zstd", payload.len());
            zstd::decode_all(payload).map_err(|e| ZimError::Decompression(format!("zstd: {}", e)))
        }
    }
}
