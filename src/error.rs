//! Error types for reducepdf.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for reducepdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while listing, fetching, compressing or
/// writing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing local files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bucket does not exist.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// The bucket exists but the credentials may not read it.
    #[error("Access denied to bucket '{bucket}': {message}")]
    AccessDenied { bucket: String, message: String },

    /// Listing the bucket failed for another reason.
    #[error("Failed to list bucket '{bucket}': {message}")]
    Listing { bucket: String, message: String },

    /// Downloading an object failed.
    #[error("Failed to download '{key}': {message}")]
    Transfer { key: String, message: String },

    /// The object exceeds the configured size threshold.
    #[error("Object '{key}' is {size} bytes, above the {limit} byte limit")]
    TooLarge { key: String, size: u64, limit: u64 },

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure could not be parsed or serialized.
    #[error("Corrupted PDF structure: {0}")]
    CorruptDocument(String),

    /// Writing the compressed document failed.
    #[error("Failed to write '{location}': {message}")]
    Write { location: String, message: String },

    /// A compression policy or pipeline option is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidPolicy(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify the error for reports and exit codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BucketNotFound(_) => ErrorKind::NotFound,
            Error::AccessDenied { .. } => ErrorKind::AccessDenied,
            Error::Listing { .. } => ErrorKind::Listing,
            Error::Transfer { .. } => ErrorKind::Transfer,
            Error::TooLarge { .. } => ErrorKind::TooLarge,
            Error::UnknownFormat
            | Error::UnsupportedVersion(_)
            | Error::Encrypted
            | Error::CorruptDocument(_) => ErrorKind::CorruptDocument,
            Error::Write { .. } => ErrorKind::Write,
            Error::InvalidPolicy(_) => ErrorKind::InvalidConfig,
            Error::Io(_) | Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Bucket-level errors abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::AccessDenied | ErrorKind::InvalidConfig
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::CorruptDocument(err.to_string()),
        }
    }
}

/// Coarse error classification, stable across releases and serialized into
/// run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AccessDenied,
    Listing,
    Transfer,
    TooLarge,
    CorruptDocument,
    Write,
    InvalidConfig,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::Listing => "listing error",
            ErrorKind::Transfer => "transfer error",
            ErrorKind::TooLarge => "too large",
            ErrorKind::CorruptDocument => "corrupt document",
            ErrorKind::Write => "write error",
            ErrorKind::InvalidConfig => "invalid configuration",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}
