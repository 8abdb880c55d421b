//! End-to-end scenarios against archives assembled in memory.
//!
//! The builder lays out a complete file image (header, MIME list,
//! directory, pointer tables, clusters) into a `Cursor<Vec<u8>>`, using the
//! same codec crates on the encode side that the reader uses to decode.
//! Entries must be pushed in `(namespace, URL)` sorted order; the binary
//! search relies on it just like it does on a real archive.

use std::io::{Cursor, Read, Write};

use zim_reader::{ZimArchive, ZimError};

const ZIM_MAGIC: u32 = 0x044D_495A;

const TAG_DEFAULT: u8 = 0;
const TAG_NONE: u8 = 1;
const TAG_ZIP: u8 = 2;
const TAG_BZIP2: u8 = 3;
const TAG_LZMA: u8 = 4;
const TAG_ZSTD: u8 = 5;

enum Kind {
    Content { mime: u16, cluster: u32, blob: u32 },
    Redirect { target: u32 },
}

struct EntryRecord {
    namespace: u8,
    url: String,
    kind: Kind,
}

struct ArchiveBuilder {
    mimes: Vec<&'static str>,
    entries: Vec<EntryRecord>,
    clusters: Vec<(u8, Vec<Vec<u8>>)>,
}

impl ArchiveBuilder {
    fn new(mimes: &[&'static str]) -> Self {
        ArchiveBuilder {
            mimes: mimes.to_vec(),
            entries: Vec::new(),
            clusters: Vec::new(),
        }
    }

    fn content(mut self, namespace: u8, url: &str, mime: u16, cluster: u32, blob: u32) -> Self {
        self.entries.push(EntryRecord {
            namespace,
            url: url.to_string(),
            kind: Kind::Content { mime, cluster, blob },
        });
        self
    }

    fn redirect(mut self, namespace: u8, url: &str, target: u32) -> Self {
        self.entries.push(EntryRecord {
            namespace,
            url: url.to_string(),
            kind: Kind::Redirect { target },
        });
        self
    }

    fn cluster(mut self, tag: u8, blobs: &[&[u8]]) -> Self {
        self.clusters
            .push((tag, blobs.iter().map(|b| b.to_vec()).collect()));
        self
    }

    fn build_bytes(self) -> Vec<u8> {
        let mut buf = vec![0u8; 80];

        let mime_list_pos = buf.len() as u64;
        for mime in &self.mimes {
            buf.extend_from_slice(mime.as_bytes());
            buf.push(0);
        }
        buf.push(0); // empty-string sentinel

        let mut entry_offsets = Vec::new();
        for entry in &self.entries {
            entry_offsets.push(buf.len() as u64);
            buf.extend_from_slice(&serialize_entry(entry));
        }

        let url_ptr_pos = buf.len() as u64;
        for offset in &entry_offsets {
            buf.extend_from_slice(&offset.to_le_bytes());
        }

        let title_ptr_pos = buf.len() as u64;
        for i in 0..self.entries.len() as u32 {
            buf.extend_from_slice(&i.to_le_bytes());
        }

        let serialized: Vec<Vec<u8>> = self
            .clusters
            .iter()
            .map(|(tag, blobs)| serialize_cluster(*tag, blobs))
            .collect();
        let cluster_ptr_pos = buf.len() as u64;
        let mut cluster_start = cluster_ptr_pos + 8 * serialized.len() as u64;
        for cluster in &serialized {
            buf.extend_from_slice(&cluster_start.to_le_bytes());
            cluster_start += cluster.len() as u64;
        }
        for cluster in &serialized {
            buf.extend_from_slice(cluster);
        }
        let checksum_pos = buf.len() as u64;

        let mut header = Vec::with_capacity(80);
        header.extend_from_slice(&ZIM_MAGIC.to_le_bytes());
        header.extend_from_slice(&5u32.to_le_bytes()); // version
        header.extend_from_slice(&[0x42; 16]); // uuid
        header.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        header.extend_from_slice(&(self.clusters.len() as u32).to_le_bytes());
        header.extend_from_slice(&url_ptr_pos.to_le_bytes());
        header.extend_from_slice(&title_ptr_pos.to_le_bytes());
        header.extend_from_slice(&cluster_ptr_pos.to_le_bytes());
        header.extend_from_slice(&mime_list_pos.to_le_bytes());
        header.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // main page
        header.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // layout page
        header.extend_from_slice(&checksum_pos.to_le_bytes());
        buf[..80].copy_from_slice(&header);

        buf
    }

    fn build(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build_bytes())
    }
}

fn serialize_entry(entry: &EntryRecord) -> Vec<u8> {
    let mut buf = Vec::new();
    match entry.kind {
        Kind::Content { mime, cluster, blob } => {
            buf.extend_from_slice(&mime.to_le_bytes());
            buf.push(0); // parameter length
            buf.push(entry.namespace);
            buf.extend_from_slice(&0u32.to_le_bytes()); // revision
            buf.extend_from_slice(&cluster.to_le_bytes());
            buf.extend_from_slice(&blob.to_le_bytes());
        }
        Kind::Redirect { target } => {
            buf.extend_from_slice(&0xFFFFu16.to_le_bytes());
            buf.push(0);
            buf.push(entry.namespace);
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&target.to_le_bytes());
        }
    }
    buf.extend_from_slice(entry.url.as_bytes());
    buf.push(0);
    buf.extend_from_slice(entry.url.to_uppercase().as_bytes()); // title
    buf.push(0);
    buf
}

fn serialize_cluster(tag: u8, blobs: &[Vec<u8>]) -> Vec<u8> {
    let mut offsets = vec![4 * (blobs.len() as u32 + 1)];
    for blob in blobs {
        offsets.push(offsets[offsets.len() - 1] + blob.len() as u32);
    }

    let mut payload = Vec::new();
    for offset in &offsets {
        payload.extend_from_slice(&offset.to_le_bytes());
    }
    for blob in blobs {
        payload.extend_from_slice(blob);
    }

    let mut out = vec![tag];
    out.extend_from_slice(&compress(tag, &payload));
    out
}

fn compress(tag: u8, payload: &[u8]) -> Vec<u8> {
    match tag {
        TAG_BZIP2 => {
            let mut out = Vec::new();
            bzip2::read::BzEncoder::new(payload, bzip2::Compression::default())
                .read_to_end(&mut out)
                .unwrap();
            out
        }
        TAG_LZMA => {
            let mut out = Vec::new();
            lzma_rs::lzma_compress(&mut Cursor::new(payload), &mut out).unwrap();
            out
        }
        TAG_ZSTD => zstd::encode_all(payload, 0).unwrap(),
        // uncompressed tags, and deliberately-opaque bytes for
        // unsupported-tag scenarios
        _ => payload.to_vec(),
    }
}

#[test]
fn three_sorted_articles_resolve_by_url() {
    let pages: [&[u8]; 3] = [b"<h1>a</h1>", b"<h1>b</h1>", b"<h1>c</h1>"];
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/html", "text/plain"])
            .content(b'A', "a", 0, 0, 0)
            .content(b'A', "b", 0, 0, 1)
            .content(b'A', "c", 0, 0, 2)
            .cluster(TAG_ZSTD, &pages)
            .build(),
    )
    .unwrap();

    assert_eq!(archive.total_articles(), 3);

    let article = archive.get_by_url(b'A', "b", true).unwrap().unwrap();
    assert_eq!(article.index, 1);
    assert!(!article.is_redirect);
    assert_eq!(article.data.as_deref(), Some(&b"<h1>b</h1>"[..]));
    assert_eq!(article.mime.as_deref(), Some("text/html"));
    assert_eq!(article.entry.url(), "b");
}

#[test]
fn content_round_trips_for_every_codec() {
    let body = "the quick brown fox jumps over the lazy dog ".repeat(64);
    for tag in [TAG_DEFAULT, TAG_NONE, TAG_BZIP2, TAG_LZMA, TAG_ZSTD] {
        let archive = ZimArchive::open(
            ArchiveBuilder::new(&["text/plain"])
                .content(b'A', "doc", 0, 0, 0)
                .cluster(tag, &[body.as_bytes()])
                .build(),
        )
        .unwrap();

        let article = archive.get_by_index(0, true).unwrap();
        assert_eq!(
            article.data.as_deref(),
            Some(body.as_bytes()),
            "payload mismatch for tag {}",
            tag
        );
        assert_eq!(article.mime.as_deref(), Some("text/plain"));
    }
}

#[test]
fn url_lookup_on_empty_archive_is_none() {
    let archive = ZimArchive::open(ArchiveBuilder::new(&["text/plain"]).build()).unwrap();
    assert_eq!(archive.total_articles(), 0);
    assert!(archive.get_by_url(b'A', "anything", true).unwrap().is_none());
}

#[test]
fn url_lookup_single_entry_hit_and_miss() {
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/plain"])
            .content(b'A', "only", 0, 0, 0)
            .cluster(TAG_NONE, &[b"payload"])
            .build(),
    )
    .unwrap();

    let hit = archive.get_by_url(b'A', "only", true).unwrap().unwrap();
    assert_eq!(hit.index, 0);

    assert!(archive.get_by_url(b'A', "a", true).unwrap().is_none());
    assert!(archive.get_by_url(b'A', "zzz", true).unwrap().is_none());
    assert!(archive.get_by_url(b'B', "only", true).unwrap().is_none());
}

#[test]
fn url_lookup_finds_every_entry_and_rejects_absent_keys() {
    let urls = ["apple", "banana", "cherry", "date", "elderberry"];
    let blobs: Vec<Vec<u8>> = urls.iter().map(|u| u.as_bytes().to_vec()).collect();
    let blob_refs: Vec<&[u8]> = blobs.iter().map(Vec::as_slice).collect();

    let mut builder = ArchiveBuilder::new(&["text/plain"]);
    for (i, url) in urls.iter().enumerate() {
        builder = builder.content(b'A', url, 0, 0, i as u32);
    }
    let archive = ZimArchive::open(builder.cluster(TAG_NONE, &blob_refs).build()).unwrap();

    for (i, url) in urls.iter().enumerate() {
        let article = archive.get_by_url(b'A', url, true).unwrap().unwrap();
        assert_eq!(article.index, i as u32, "wrong index for {}", url);
        assert_eq!(article.data.as_deref(), Some(url.as_bytes()));
    }

    for absent in ["aardvark", "blueberry", "zucchini", ""] {
        assert!(
            archive.get_by_url(b'A', absent, true).unwrap().is_none(),
            "unexpected hit for {:?}",
            absent
        );
    }
}

#[test]
fn redirect_depth_one_follows_and_reports() {
    // sorted: "real" < "redir"
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/html"])
            .content(b'A', "real", 0, 0, 0)
            .redirect(b'A', "redir", 0)
            .cluster(TAG_NONE, &[b"target content"])
            .build(),
    )
    .unwrap();

    let followed = archive.get_by_index(1, true).unwrap();
    let target = archive.get_by_index(0, true).unwrap();
    assert_eq!(followed.index, target.index);
    assert_eq!(followed.data, target.data);
    assert_eq!(followed.mime, target.mime);
    assert!(!followed.is_redirect);

    let unfollowed = archive.get_by_index(1, false).unwrap();
    assert!(unfollowed.is_redirect);
    assert_eq!(unfollowed.index, 1);
    assert!(unfollowed.data.is_none());
    assert!(unfollowed.mime.is_none());
    assert!(unfollowed.entry.is_redirect());
}

#[test]
fn redirect_cycle_is_bounded() {
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/html"])
            .redirect(b'A', "a", 1)
            .redirect(b'A', "b", 0)
            .build(),
    )
    .unwrap();

    let err = archive.get_by_index(0, true).unwrap_err();
    assert!(matches!(err, ZimError::RedirectLoop { index: 0 }));

    // Unfollowed lookups on the same entries still succeed.
    assert!(archive.get_by_index(0, false).unwrap().is_redirect);
}

#[test]
fn evicted_cluster_redecodes_identically() {
    let bodies: Vec<String> = (0..4).map(|i| format!("cluster {} body", i).repeat(16)).collect();
    let mut builder = ArchiveBuilder::new(&["text/plain"]);
    for i in 0..bodies.len() {
        builder = builder.content(b'A', &format!("c{}", i), 0, i as u32, 0);
    }
    for body in &bodies {
        builder = builder.cluster(TAG_ZSTD, &[body.as_bytes()]);
    }

    // Capacity two: touching four distinct clusters forces eviction.
    let archive = ZimArchive::open_with_cache(builder.build(), 2).unwrap();

    let first_pass: Vec<Vec<u8>> = (0..4)
        .map(|i| archive.get_by_index(i, true).unwrap().data.unwrap())
        .collect();
    for (body, data) in bodies.iter().zip(&first_pass) {
        assert_eq!(data, body.as_bytes());
    }

    // Cluster 0 was evicted by now; the re-decode must be byte-identical.
    let again = archive.get_by_index(0, true).unwrap().data.unwrap();
    assert_eq!(again, first_pass[0]);
}

#[test]
fn blob_number_one_past_end_is_out_of_range() {
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/plain"])
            .content(b'A', "bad", 0, 0, 2)
            .content(b'A', "ok", 0, 0, 1)
            .cluster(TAG_NONE, &[b"first", b"second"])
            .build(),
    )
    .unwrap();

    let ok = archive.get_by_index(1, true).unwrap();
    assert_eq!(ok.data.as_deref(), Some(&b"second"[..]));

    let err = archive.get_by_index(0, true).unwrap_err();
    assert!(matches!(
        err,
        ZimError::IndexOutOfRange { index: 2, count: 2 }
    ));
}

#[test]
fn unsupported_compression_tags_fail() {
    for tag in [TAG_ZIP, 9] {
        let archive = ZimArchive::open(
            ArchiveBuilder::new(&["text/plain"])
                .content(b'A', "doc", 0, 0, 0)
                .cluster(tag, &[b"opaque"])
                .build(),
        )
        .unwrap();

        let err = archive.get_by_index(0, true).unwrap_err();
        match err {
            ZimError::UnsupportedCompression(t) => assert_eq!(t, tag),
            other => panic!("expected UnsupportedCompression, got {:?}", other),
        }
    }
}

#[test]
fn article_index_out_of_range() {
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/plain"])
            .content(b'A', "doc", 0, 0, 0)
            .cluster(TAG_NONE, &[b"payload"])
            .build(),
    )
    .unwrap();

    let err = archive.get_by_index(5, true).unwrap_err();
    assert!(matches!(
        err,
        ZimError::IndexOutOfRange { index: 5, count: 1 }
    ));
}

#[test]
fn iteration_skips_redirects_and_restarts() {
    let archive = ZimArchive::open(
        ArchiveBuilder::new(&["text/html", "text/plain"])
            .content(b'A', "a", 0, 0, 0)
            .redirect(b'A', "b", 0)
            .content(b'A', "c", 1, 0, 1)
            .redirect(b'A', "d", 2)
            .cluster(TAG_NONE, &[b"one", b"two"])
            .build(),
    )
    .unwrap();

    let collected: Vec<(u32, String)> = archive
        .iter_articles()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        collected,
        vec![(0, "text/html".to_string()), (2, "text/plain".to_string())]
    );

    // A second call produces a fresh scan with the same results.
    let again: Vec<(u32, String)> = archive
        .iter_articles()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(again, collected);
}

#[test]
fn open_rejects_bad_magic_and_truncation() {
    let good = ArchiveBuilder::new(&["text/plain"]).build_bytes();

    let mut bad_magic = good.clone();
    bad_magic[0] ^= 0xFF;
    let err = ZimArchive::open(Cursor::new(bad_magic)).unwrap_err();
    assert!(matches!(err, ZimError::InvalidFormat(_)));

    let err = ZimArchive::open(Cursor::new(good[..40].to_vec())).unwrap_err();
    assert!(matches!(err, ZimError::Truncated { .. }));
}

#[test]
fn open_path_reads_from_disk() {
    let bytes = ArchiveBuilder::new(&["text/plain"])
        .content(b'A', "doc", 0, 0, 0)
        .cluster(TAG_BZIP2, &[b"on-disk payload"])
        .build_bytes();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let archive = ZimArchive::open_path(file.path()).unwrap();
    let article = archive.get_by_url(b'A', "doc", true).unwrap().unwrap();
    assert_eq!(article.data.as_deref(), Some(&b"on-disk payload"[..]));
}
