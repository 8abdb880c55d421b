//! The main archive reader: open, lookup by index or URL, iteration.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info};

use super::cluster::ClusterStore;
use super::error::{Result, ZimError};
use super::format;
use super::iter::ArticleIter;
use super::models::{Article, DirectoryEntry, Header};

/// Default number of decoded clusters kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Upper bound on followed redirect hops before the chain is declared
/// cyclic.
const MAX_REDIRECT_HOPS: u32 = 64;

/// A read-only ZIM archive over any seekable byte source.
///
/// Items are retrieved by sequential index or by `(namespace, URL)` key;
/// redirect entries can be followed through to their final content.
/// Decompressed clusters are cached under a bounded LRU policy, so random
/// access to neighbouring blobs stays cheap.
///
/// All operations are synchronous and block for the duration of their I/O
/// and decompression work. The underlying source is shared behind a mutex,
/// making a single archive value safe to use from several threads.
pub struct ZimArchive<R> {
    source: Arc<Mutex<R>>,
    header: Header,
    mime_types: Vec<String>,
    clusters: ClusterStore<R>,
}

impl<R> std::fmt::Debug for ZimArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZimArchive")
            .field("header", &self.header)
            .field("mime_types", &self.mime_types)
            .finish_non_exhaustive()
    }
}

impl ZimArchive<File> {
    /// Opens the ZIM file at `path` with the default cluster cache.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening ZIM archive: {}", path.display());
        Self::open(File::open(path)?)
    }
}

impl<R: Read + Seek> ZimArchive<R> {
    /// Opens an archive from any seekable byte source with the default
    /// cluster cache capacity.
    pub fn open(source: R) -> Result<Self> {
        Self::open_with_cache(source, DEFAULT_CACHE_CAPACITY)
    }

    /// Opens an archive keeping at most `cache_capacity` decoded clusters
    /// in memory (a zero capacity is clamped to one).
    pub fn open_with_cache(mut source: R, cache_capacity: usize) -> Result<Self> {
        let header = format::header::parse(&mut source)?;
        let mime_types = format::mime::parse(&mut source, header.mime_list_pos)?;

        info!(
            "ZIM archive opened: {} articles, {} clusters, {} MIME types",
            header.article_count,
            header.cluster_count,
            mime_types.len()
        );

        let source = Arc::new(Mutex::new(source));
        let clusters = ClusterStore::new(Arc::clone(&source), cache_capacity);

        Ok(ZimArchive {
            source,
            header,
            mime_types,
            clusters,
        })
    }

    /// Total number of directory entries (content and redirects alike).
    pub fn total_articles(&self) -> u32 {
        self.header.article_count
    }

    /// The parsed archive header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The archive's 16-byte unique id.
    pub fn uuid(&self) -> &[u8; 16] {
        &self.header.uuid
    }

    /// The ordered MIME name list entries reference by index.
    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    /// Index of the archive's main page, if one is declared.
    pub fn main_page(&self) -> Option<u32> {
        self.header.main_page()
    }

    /// Index of the archive's layout page, if one is declared.
    pub fn layout_page(&self) -> Option<u32> {
        self.header.layout_page()
    }

    /// Looks up an article by its directory index.
    ///
    /// A redirect entry is either followed through to its final content
    /// (`follow_redirect`), or returned as-is with no payload and no MIME
    /// name. Redirect chains are bounded; a chain longer than the bound is
    /// reported as [`ZimError::RedirectLoop`].
    pub fn get_by_index(&self, index: u32, follow_redirect: bool) -> Result<Article> {
        self.check_index(index)?;

        let mut current = index;
        let mut hops = 0u32;
        loop {
            let entry = self.read_entry(current)?;
            match entry {
                DirectoryEntry::Redirect { target_index, .. } if follow_redirect => {
                    hops += 1;
                    if hops > MAX_REDIRECT_HOPS {
                        return Err(ZimError::RedirectLoop { index });
                    }
                    debug!("entry {} redirects to {}", current, target_index);
                    self.check_index(target_index)?;
                    current = target_index;
                }
                DirectoryEntry::Redirect { .. } => {
                    return Ok(Article {
                        index: current,
                        is_redirect: true,
                        data: None,
                        mime: None,
                        entry,
                    });
                }
                DirectoryEntry::Content {
                    mime_index,
                    cluster_number,
                    blob_number,
                    ..
                } => {
                    let data = self.read_blob(cluster_number, blob_number)?;
                    let mime = self.mime_name(mime_index)?.to_owned();
                    return Ok(Article {
                        index: current,
                        is_redirect: false,
                        data: Some(data),
                        mime: Some(mime),
                        entry,
                    });
                }
            }
        }
    }

    /// Looks up an article by its `(namespace, URL)` key via binary search
    /// over the URL pointer table. Returns `Ok(None)` when no entry matches
    /// exactly.
    pub fn get_by_url(
        &self,
        namespace: u8,
        url: &str,
        follow_redirect: bool,
    ) -> Result<Option<Article>> {
        let key = format!("{}/{}", namespace as char, url);
        match self.find_index_by_key(&key)? {
            Some(index) => self.get_by_index(index, follow_redirect).map(Some),
            None => Ok(None),
        }
    }

    /// Iterates `(index, MIME name)` for every non-redirect entry in index
    /// order. Each call starts a fresh scan from index 0.
    pub fn iter_articles(&self) -> ArticleIter<'_, R> {
        ArticleIter::new(self)
    }

    /// Binary search over `[0, article_count)`; the probe key for entry `m`
    /// is rebuilt from that entry's own namespace and URL.
    fn find_index_by_key(&self, key: &str) -> Result<Option<u32>> {
        if self.header.article_count == 0 {
            return Ok(None);
        }

        let mut low: i64 = 0;
        let mut high: i64 = i64::from(self.header.article_count) - 1;
        while low <= high {
            let middle = (low + high) / 2;
            let entry = self.read_entry(middle as u32)?;
            let common = entry.common();
            let probe = format!("{}/{}", common.namespace as char, common.url);
            match probe.as_str().cmp(key) {
                Ordering::Less => low = middle + 1,
                Ordering::Greater => high = middle - 1,
                Ordering::Equal => return Ok(Some(middle as u32)),
            }
        }
        Ok(None)
    }

    /// Resolves the directory entry at `index` through the URL pointer
    /// table. One critical section on the shared source covers the pointer
    /// read and the entry parse.
    pub(crate) fn read_entry(&self, index: u32) -> Result<DirectoryEntry> {
        let mut source = self.source.lock().map_err(|_| ZimError::LockPoisoned)?;
        source.seek(SeekFrom::Start(
            self.header.url_ptr_pos + 8 * u64::from(index),
        ))?;
        let offset = source
            .read_u64::<LittleEndian>()
            .map_err(|e| ZimError::from_read(e, "URL pointer table"))?;
        format::entry::parse(&mut *source, offset)
    }

    /// Fetches blob `blob_number` out of cluster `cluster_number`, decoding
    /// the cluster through the cache.
    fn read_blob(&self, cluster_number: u32, blob_number: u32) -> Result<Vec<u8>> {
        if cluster_number >= self.header.cluster_count {
            return Err(ZimError::IndexOutOfRange {
                index: cluster_number,
                count: self.header.cluster_count,
            });
        }

        let start = self.read_cluster_pointer(cluster_number)?;
        let end = self.read_cluster_pointer(cluster_number + 1)?;
        let cluster = self.clusters.get(start, end)?;
        self.clusters.read_blob(&cluster, blob_number)
    }

    /// Start offset of cluster `index`. The `cluster_count`-th pointer is
    /// implicit: it equals the checksum section offset, which closes the
    /// last cluster.
    fn read_cluster_pointer(&self, index: u32) -> Result<u64> {
        if index == self.header.cluster_count {
            return Ok(self.header.checksum_pos);
        }

        let mut source = self.source.lock().map_err(|_| ZimError::LockPoisoned)?;
        source.seek(SeekFrom::Start(
            self.header.cluster_ptr_pos + 8 * u64::from(index),
        ))?;
        source
            .read_u64::<LittleEndian>()
            .map_err(|e| ZimError::from_read(e, "cluster pointer table"))
    }

    /// MIME name for `index`, bounds-checked against the parsed table.
    pub(crate) fn mime_name(&self, index: u16) -> Result<&str> {
        self.mime_types
            .get(index as usize)
            .map(String::as_str)
            .ok_or_else(|| {
                ZimError::InvalidFormat(format!(
                    "MIME index {} outside table of {} entries",
                    index,
                    self.mime_types.len()
                ))
            })
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.header.article_count {
            return Err(ZimError::IndexOutOfRange {
                index,
                count: self.header.article_count,
            });
        }
        Ok(())
    }
}
