//! Error types for MARC operations.
//!
//! This module provides the [`MarcError`] type for all MARC library operations
//! and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all MARC library operations.
///
/// Stream-level errors (`TruncatedLeader`, `UnexpectedEof`, `IoError`) end
/// iteration; the remaining kinds are scoped to a single record and the
/// reader resynchronizes past them.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The stream ended inside the 24-byte leader of a record.
    #[error("Truncated leader: {0}")]
    TruncatedLeader(String),

    /// The stream ended before the current record could be framed.
    #[error("Unexpected end of stream: {0}")]
    UnexpectedEof(String),

    /// The leader's record length or base address is not ASCII decimal.
    #[error("Malformed leader: {0}")]
    MalformedLeader(String),

    /// The stated record length runs past the actual record terminator.
    #[error("Stated record length too long: {0}")]
    StatedLengthTooLong(String),

    /// The record terminator lies beyond the stated record length.
    #[error("Stated record length too short: {0}")]
    StatedLengthTooShort(String),

    /// No record terminator was found before the stream ended.
    #[error("Record terminator missing: {0}")]
    MissingTerminator(String),

    /// Error indicating an invalid or malformed MARC record.
    #[error("Invalid MARC record: {0}")]
    InvalidRecord(String),

    /// Error indicating an invalid field structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Error related to character encoding conversion.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// A mark/reset operation on the byte stream could not be honored.
    #[error("Invalid stream mark: {0}")]
    InvalidMark(String),

    /// `next` was called on a drained reader.
    #[error("No such record: the reader is exhausted")]
    NoSuchRecord,

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MarcError {
    /// Whether this error ends the stream rather than just the current record.
    #[must_use]
    pub fn is_stream_fatal(&self) -> bool {
        matches!(
            self,
            MarcError::TruncatedLeader(_)
                | MarcError::UnexpectedEof(_)
                | MarcError::MissingTerminator(_)
                | MarcError::IoError(_)
        )
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
