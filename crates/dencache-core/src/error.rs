//! Error types for dencache operations
//!
//! Only two conditions surface as errors at the public boundary: a malformed
//! key and a programmer-visible state violation. Everything else — stub mode,
//! missing entries, failed file opens — degrades to an absent result, and
//! maintenance I/O failures are absorbed internally.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Dencache error types with context for debugging
#[derive(Debug, Clone)]
pub enum CacheError {
    /// Key does not match `[a-z0-9_-]{1,120}`
    InvalidKey {
        /// The offending key (may be truncated for display)
        key: String,
    },

    /// An operation was attempted in a state that forbids it
    /// (second editor for a key, remove during an edit, write after
    /// commit/abort, construction or close on the UI thread)
    IllegalState {
        /// What the caller did wrong
        reason: String,
    },

    /// I/O operation failed in a context where it cannot be absorbed
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidKey { key } => {
                write!(f, "invalid cache key {:?}: must match [a-z0-9_-]{{1,120}}", key)
            }

            CacheError::IllegalState { reason } => {
                write!(f, "illegal state: {}", reason)
            }

            CacheError::Io { path, kind, message } => {
                if let Some(path) = path {
                    write!(f, "I/O error in {}: {} ({})", path.display(), message, kind)
                } else {
                    write!(f, "I/O error: {} ({})", message, kind)
                }
            }
        }
    }
}

impl Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for dencache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_display() {
        let err = CacheError::InvalidKey { key: "Bad Key!".to_string() };
        let display = format!("{}", err);
        assert!(display.contains("Bad Key!"));
        assert!(display.contains("[a-z0-9_-]"));
    }

    #[test]
    fn test_illegal_state_display() {
        let err = CacheError::IllegalState { reason: "another edit is in progress for k1".to_string() };
        assert!(format!("{}", err).contains("another edit is in progress"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cache_err: CacheError = io_err.into();

        match cache_err {
            CacheError::Io { kind, .. } => assert_eq!(kind, std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io error"),
        }
    }
}
