//! Lazy iteration over an archive's content entries.

use std::io::{Read, Seek};

use super::archive::ZimArchive;
use super::error::Result;
use super::models::DirectoryEntry;

/// Iterator over `(index, MIME name)` pairs for every non-redirect entry,
/// in index order.
///
/// Redirect entries are skipped without resolving their targets; the
/// redirected-to content is reached at its own index. Each entry is parsed
/// lazily as the iterator advances, and a parse failure is yielded as an
/// `Err` item for that index.
///
/// Created by [`ZimArchive::iter_articles()`].
pub struct ArticleIter<'a, R> {
    archive: &'a ZimArchive<R>,
    index: u32,
}

impl<'a, R> ArticleIter<'a, R> {
    pub(super) fn new(archive: &'a ZimArchive<R>) -> Self {
        ArticleIter { archive, index: 0 }
    }
}

impl<'a, R: Read + Seek> Iterator for ArticleIter<'a, R> {
    type Item = Result<(u32, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.archive.total_articles() {
            let index = self.index;
            self.index += 1;

            match self.archive.read_entry(index) {
                Ok(DirectoryEntry::Redirect { .. }) => continue,
                Ok(DirectoryEntry::Content { mime_index, .. }) => {
                    return Some(
                        self.archive
                            .mime_name(mime_index)
                            .map(|mime| (index, mime.to_owned())),
                    );
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
