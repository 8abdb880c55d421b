//! On-demand cluster decoding, blob extraction and the bounded LRU cache.
//!
//! A cluster occupies `[start, end)` in the file: one compression tag byte
//! followed by the payload. The payload opens with an offset table of
//! `(N + 1)` little-endian u32 values; value `i` is the byte distance from
//! the start of the payload to blob `i`, and the last value marks the end
//! of the last blob. Uncompressed clusters are served by positioned reads
//! against the file; compressed clusters are materialized in memory as a
//! whole and cached.

use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use byteorder::{LittleEndian, ReadBytesExt};
use lru::LruCache;
use log::{debug, trace};

use super::codec;
use super::error::{Result, ZimError};
use super::models::CompressionType;

/// A decoded cluster: its blob offset table plus payload access.
#[derive(Debug)]
pub(crate) struct Cluster {
    payload: Payload,
    offsets: Vec<u32>,
}

#[derive(Debug)]
enum Payload {
    /// Uncompressed cluster. Blobs are read straight from the file;
    /// `start` is the byte after the compression tag.
    Raw { start: u64 },
    /// Decompressed cluster materialized in memory.
    Decoded(Vec<u8>),
}

impl Cluster {
    /// Number of blobs the cluster holds (one less than the table length).
    pub(crate) fn blob_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Decodes clusters on demand and caches the results under a bounded LRU
/// policy keyed by the cluster's start offset in the file.
///
/// The cache is a pure performance layer: eviction only ever causes a
/// re-decode, never an error.
pub(crate) struct ClusterStore<R> {
    source: Arc<Mutex<R>>,
    cache: Mutex<LruCache<u64, Arc<Cluster>>>,
}

impl<R: Read + Seek> ClusterStore<R> {
    /// Creates a store sharing `source` with the archive. A zero capacity
    /// is clamped to one entry.
    pub(crate) fn new(source: Arc<Mutex<R>>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ClusterStore {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the decoded cluster occupying `[start, end)`, decoding and
    /// inserting it on a miss (evicting the least-recently-used entry at
    /// capacity).
    ///
    /// The cache lock is held across the decode, so concurrent misses for
    /// the same cluster decode it exactly once.
    pub(crate) fn get(&self, start: u64, end: u64) -> Result<Arc<Cluster>> {
        let mut cache = self.cache.lock().map_err(|_| ZimError::LockPoisoned)?;
        if let Some(cluster) = cache.get(&start) {
            trace!("cluster @{}: cache hit", start);
            return Ok(Arc::clone(cluster));
        }

        let cluster = Arc::new(self.decode(start, end)?);
        cache.put(start, Arc::clone(&cluster));
        Ok(cluster)
    }

    /// Decodes the cluster at `[start, end)`: reads the compression tag,
    /// obtains the payload (raw or decompressed) and builds the blob
    /// offset table.
    fn decode(&self, start: u64, end: u64) -> Result<Cluster> {
        let mut source = self.source.lock().map_err(|_| ZimError::LockPoisoned)?;
        source.seek(SeekFrom::Start(start))?;
        let tag = source
            .read_u8()
            .map_err(|e| ZimError::from_read(e, "cluster header"))?;
        let compression = CompressionType::try_from(tag)?;

        let payload = match compression {
            CompressionType::None => Payload::Raw { start: start + 1 },
            CompressionType::Zip => return Err(ZimError::UnsupportedCompression(tag)),
            _ => {
                let len = end.checked_sub(start + 1).ok_or_else(|| {
                    ZimError::InvalidFormat(format!(
                        "cluster range [{}, {}) leaves no payload",
                        start, end
                    ))
                })?;
                let mut raw = vec![0u8; len as usize];
                source
                    .read_exact(&mut raw)
                    .map_err(|e| ZimError::from_read(e, "cluster payload"))?;
                debug!(
                    "cluster @{}: decoding {} {:?}-compressed bytes",
                    start, len, compression
                );
                Payload::Decoded(codec::decompress(compression, &raw)?)
            }
        };

        let offsets = match &payload {
            Payload::Raw { start } => {
                source.seek(SeekFrom::Start(*start))?;
                read_offset_table(&mut *source)?
            }
            Payload::Decoded(buf) => read_offset_table(&mut &buf[..])?,
        };

        Ok(Cluster { payload, offsets })
    }

    /// Extracts blob `index` from a decoded cluster.
    ///
    /// Valid indices are `0 <= index < blob_count`; anything else is an
    /// [`ZimError::IndexOutOfRange`].
    pub(crate) fn read_blob(&self, cluster: &Cluster, index: u32) -> Result<Vec<u8>> {
        let count = cluster.blob_count();
        if index as usize >= count {
            return Err(ZimError::IndexOutOfRange {
                index,
                count: count as u32,
            });
        }

        let begin = cluster.offsets[index as usize];
        let finish = cluster.offsets[index as usize + 1];
        let size = finish.checked_sub(begin).ok_or_else(|| {
            ZimError::InvalidFormat(format!(
                "cluster offset table not monotonic at blob {}",
                index
            ))
        })?;

        match &cluster.payload {
            Payload::Decoded(buf) => buf
                .get(begin as usize..finish as usize)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| {
                    ZimError::InvalidFormat(format!(
                        "blob {} spans [{}, {}) but the decoded cluster holds {} bytes",
                        index,
                        begin,
                        finish,
                        buf.len()
                    ))
                }),
            Payload::Raw { start } => {
                let mut source = self.source.lock().map_err(|_| ZimError::LockPoisoned)?;
                source.seek(SeekFrom::Start(start + u64::from(begin)))?;
                let mut data = vec![0u8; size as usize];
                source
                    .read_exact(&mut data)
                    .map_err(|e| ZimError::from_read(e, "blob data"))?;
                Ok(data)
            }
        }
    }
}

/// Reads the leading blob offset table. The first u32 doubles as the table
/// size: `offset0 / 4` is the number of entries, `offset0` itself being
/// entry zero.
fn read_offset_table<R: Read>(r: &mut R) -> Result<Vec<u32>> {
    let first = r
        .read_u32::<LittleEndian>()
        .map_err(|e| ZimError::from_read(e, "cluster offset table"))?;
    let table_len = (first / 4) as usize;

    let mut offsets = Vec::with_capacity(table_len.max(1));
    offsets.push(first);
    for _ in 1..table_len {
        offsets.push(
            r.read_u32::<LittleEndian>()
                .map_err(|e| ZimError::from_read(e, "cluster offset table"))?,
        );
    }
    Ok(offsets)
}
