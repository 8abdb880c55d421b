//! Core data structures for the ZIM container format.
//!
//! This module defines the fundamental types used throughout the library:
//! - The fixed archive header
//! - Directory entries (content and redirect variants)
//! - The resolved article item returned by lookups
//! - The cluster compression tag enumeration

use super::error::{Result, ZimError};

/// Magic number at offset 0 of every ZIM file ("ZIM\x04" little-endian).
pub const ZIM_MAGIC: u32 = 0x044D_495A;

/// Sentinel in the directory entry's leading 16-bit field selecting the
/// redirect variant.
pub const REDIRECT_MIME: u16 = 0xFFFF;

/// Sentinel in the header's `main_page`/`layout_page` fields meaning
/// "no such page".
pub const NO_PAGE: u32 = 0xFFFF_FFFF;

/// The fixed-layout archive header.
///
/// Parsed once at open time and immutable for the archive's lifetime. All
/// fields are stored little-endian on disk.
#[derive(Debug, Clone)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
    pub uuid: [u8; 16],
    pub article_count: u32,
    pub cluster_count: u32,
    /// Byte offset of the URL pointer table (`article_count` u64 entries).
    pub url_ptr_pos: u64,
    /// Byte offset of the title pointer table (`article_count` u32 entries).
    pub title_ptr_pos: u64,
    /// Byte offset of the cluster pointer table (`cluster_count` u64 entries).
    pub cluster_ptr_pos: u64,
    /// Byte offset of the MIME type list.
    pub mime_list_pos: u64,
    pub main_page: u32,
    pub layout_page: u32,
    /// Byte offset of the trailing checksum section. Doubles as the implicit
    /// end pointer of the last cluster.
    pub checksum_pos: u64,
}

impl Header {
    /// Index of the archive's main page, if one is declared.
    pub fn main_page(&self) -> Option<u32> {
        (self.main_page != NO_PAGE).then_some(self.main_page)
    }

    /// Index of the archive's layout page, if one is declared.
    pub fn layout_page(&self) -> Option<u32> {
        (self.layout_page != NO_PAGE).then_some(self.layout_page)
    }
}

/// Fields shared by both directory entry variants.
#[derive(Debug, Clone)]
pub struct EntryCommon {
    /// Single-byte namespace partitioning the key space ('A', 'I', 'M', ...).
    pub namespace: u8,
    pub revision: u32,
    pub url: String,
    pub title: String,
    /// Length-prefixed extra bytes; semantics are opaque to the reader.
    pub parameter: Vec<u8>,
}

/// A single directory record.
///
/// The variant is selected at parse time by the leading 16-bit field:
/// [`REDIRECT_MIME`] means a redirect, anything else is a real MIME index
/// on a content entry.
#[derive(Debug, Clone)]
pub enum DirectoryEntry {
    Content {
        mime_index: u16,
        cluster_number: u32,
        blob_number: u32,
        common: EntryCommon,
    },
    Redirect {
        target_index: u32,
        common: EntryCommon,
    },
}

impl DirectoryEntry {
    pub fn common(&self) -> &EntryCommon {
        match self {
            DirectoryEntry::Content { common, .. } => common,
            DirectoryEntry::Redirect { common, .. } => common,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, DirectoryEntry::Redirect { .. })
    }

    pub fn namespace(&self) -> u8 {
        self.common().namespace
    }

    pub fn url(&self) -> &str {
        &self.common().url
    }

    pub fn title(&self) -> &str {
        &self.common().title
    }
}

/// A resolved archive item as returned by the lookup operations.
///
/// For a content entry (or a followed redirect) `data` and `mime` are
/// populated and `index` is the index of the entry the payload came from.
/// For an unfollowed redirect `is_redirect` is set and both are `None`.
#[derive(Debug, Clone)]
pub struct Article {
    pub index: u32,
    pub is_redirect: bool,
    pub data: Option<Vec<u8>>,
    pub mime: Option<String>,
    /// The directory entry the item was resolved from.
    pub entry: DirectoryEntry,
}

/// Cluster compression tags.
///
/// Tag 0 is the legacy "default" alias for uncompressed data and decodes the
/// same as tag 1. Tag 2 (zip) is no longer supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Zip,
    Bzip2,
    Lzma,
    Zstd,
}

impl TryFrom<u8> for CompressionType {
    type Error = ZimError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 | 1 => Ok(Self::None),
            2 => Ok(Self::Zip),
            3 => Ok(Self::Bzip2),
            4 => Ok(Self::Lzma),
            5 => Ok(Self::Zstd),
            other => Err(ZimError::UnsupportedCompression(other)),
        }
    }
}
