//! # zim-reader
//!
//! A read-only reader for ZIM container archives: open a `.zim` file (or
//! any seekable byte source), look up items by index or by
//! `(namespace, URL)` key with redirect resolution, and iterate all content
//! entries. Compressed clusters are decoded on demand and cached under a
//! bounded LRU policy.

pub mod zim;

// Re-export the main types for convenience
pub use zim::{
    models::{Article, CompressionType, DirectoryEntry, EntryCommon, Header},
    Result, ZimArchive, ZimError,
};
