//! Custom error types for the zim-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum ZimError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a fixed-layout record.
    #[error("truncated {context}")]
    Truncated { context: &'static str },

    /// The file is structurally invalid or does not conform to the ZIM format.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A URL or title field contained bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A cluster carries a compression tag this reader does not decode
    /// (the legacy zip tag, or an unknown value).
    #[error("unsupported cluster compression tag: {0}")]
    UnsupportedCompression(u8),

    /// An error occurred during decompression, usually due to corrupted data.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// An article index or blob number outside the valid range.
    #[error("index {index} out of range (valid count: {count})")]
    IndexOutOfRange { index: u32, count: u32 },

    /// A redirect chain did not reach a content entry within the hop bound.
    #[error("redirect chain starting at entry {index} exceeded the hop bound")]
    RedirectLoop { index: u32 },

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("a mutex lock was poisoned, indicating a panic in another thread holding the lock")]
    LockPoisoned,
}

impl ZimError {
    /// Remap an `UnexpectedEof` from `read_exact`-style calls into a
    /// truncation error carrying the record being parsed; other I/O
    /// failures pass through unchanged.
    pub(crate) fn from_read(err: std::io::Error, context: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ZimError::Truncated { context }
        } else {
            ZimError::Io(err)
        }
    }
}

/// A convenience `Result` type alias using the crate's `ZimError` type.
pub type Result<T> = std::result::Result<T, ZimError>;
