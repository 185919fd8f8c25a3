//! Error taxonomy for the download engine.
//!
//! Designed to be serializable across process boundaries (status polling,
//! run reports) without depending on non-serializable types like
//! `std::io::Error`. For I/O errors, we capture the kind and message as
//! strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for catalog and image download operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// Fetching or decoding the card catalog failed. Fatal to the run;
    /// the catalog layer never retries.
    #[error("Catalog fetch failed: {message}")]
    CatalogFetch {
        /// Detailed error message.
        message: String,
    },

    /// The configured output directory could not be resolved to a pics
    /// folder. Fatal, detected before any image I/O starts.
    #[error("Invalid pics directory {path}: {reason}")]
    InvalidPicsDir {
        /// The path as given by the caller.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The server answered with something that is not a JPEG.
    #[error("Unsupported content type: {content_type}")]
    UnsupportedContentType {
        /// The `Content-Type` header value received.
        content_type: String,
    },

    /// A downloaded file failed the structural integrity check.
    #[error("Truncated or corrupt image: {path}")]
    TruncatedOrCorrupt {
        /// Path of the offending file.
        path: String,
    },

    /// Network/HTTP error during a fetch.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// A request exceeded its per-task timeout.
    #[error("Timed out after {seconds}s")]
    Timeout {
        /// The timeout that was exceeded.
        seconds: u64,
    },

    /// All retry attempts for one task were used up.
    #[error("After {attempts} attempts: {message}")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The last failure, as a message.
        message: String,
    },

    /// The run (and with it this task) was cancelled by the user.
    /// Terminal for the task, never counted as an error.
    #[error("Cancelled by user")]
    Cancelled,

    /// A start request arrived while a run was active. No state change.
    #[error("A download run is already in progress")]
    AlreadyRunning,

    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g. "NotFound", "PermissionDenied").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl DownloadError {
    /// Create a catalog fetch error.
    pub fn catalog_fetch(message: impl Into<String>) -> Self {
        Self::CatalogFetch {
            message: message.into(),
        }
    }

    /// Create an invalid pics directory error.
    pub fn invalid_pics_dir(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPicsDir {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported content type error.
    pub fn unsupported_content_type(content_type: impl Into<String>) -> Self {
        Self::UnsupportedContentType {
            content_type: content_type.into(),
        }
    }

    /// Create a truncated/corrupt file error.
    pub fn corrupt(path: impl Into<String>) -> Self {
        Self::TruncatedOrCorrupt { path: path.into() }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a network error with an HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create a retries-exhausted error wrapping the last failure.
    pub fn retries_exhausted(attempts: u32, last: &Self) -> Self {
        Self::RetriesExhausted {
            attempts,
            message: last.to_string(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    ///
    /// Captures the error kind name and message so the error stays
    /// serializable.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::Io {
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether the fetch layer may retry after this error.
    ///
    /// Content-type mismatches and failed integrity checks are retryable:
    /// both are routinely transient on CDN edges serving error pages or
    /// truncated bodies.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout { .. }
                | Self::UnsupportedContentType { .. }
                | Self::TruncatedOrCorrupt { .. }
                | Self::Io { .. }
        )
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

/// Convenience result type for engine operations.
pub type DownloadResult<T> = Result<T, DownloadError>;
