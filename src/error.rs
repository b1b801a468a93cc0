//! Error types for the object-graph core.
//!
//! Three families of failure matter to callers:
//!
//! - [`Error::StreamTruncated`]: input ended in the middle of a token. Never recovered.
//! - [`Error::ReadError`]: the file structure is wrong (header, cross-reference data,
//!   object headers, encryption state). Permissive parsing turns most of these into
//!   warnings; strict parsing raises them.
//! - [`Error::StreamError`]: a malformed token sequence inside an object.

/// Result type alias for object-graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading or writing documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input ended while a value was still being read.
    #[error("Stream has ended unexpectedly: {0}")]
    StreamTruncated(String),

    /// Structural violation in the file.
    #[error("Read error: {0}")]
    ReadError(String),

    /// Malformed token sequence at a byte offset.
    #[error("Malformed content at byte {offset}: {reason}")]
    StreamError {
        /// Byte offset where the problem was detected
        offset: usize,
        /// What was wrong
        reason: String,
    },

    /// An output object number was registered twice.
    #[error("Object {0} registered twice in the output table")]
    DuplicateObject(u32),

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),
}

impl Error {
    /// Shorthand for a [`Error::StreamError`].
    pub(crate) fn stream(offset: usize, reason: impl Into<String>) -> Self {
        Error::StreamError {
            offset,
            reason: reason.into(),
        }
    }

    /// True for errors that no recovery path may swallow.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StreamTruncated(_) | Error::DuplicateObject(_))
    }
}
