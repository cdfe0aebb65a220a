//! Error types surfaced to notification sinks.
//!
//! All errors are terminal for the request that produced them. The engine
//! never retries; callers may issue a fresh request.

use std::path::PathBuf;

use thiserror::Error;

/// Transport-level failure while fetching a remote asset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Server responded with status {code}")]
    Status { code: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Local storage failure while writing, reading or purging cached assets
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create cache directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to purge {}: {source}", path.display())]
    Purge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Path of the file or directory the failed operation touched
    pub fn path(&self) -> &std::path::Path {
        match self {
            StorageError::CreateDir { path, .. }
            | StorageError::Write { path, .. }
            | StorageError::Read { path, .. }
            | StorageError::Purge { path, .. } => path,
        }
    }
}

/// Bytes could not be interpreted as an image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to decode image: {reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure delivered to a sink's `on_failure` callback
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The fetch or decode task panicked or was cancelled
    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, FetchError::Storage(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display_carries_url() {
        let err = FetchError::Network {
            url: "http://host/a.png".to_string(),
            source: NetworkError::Status { code: 404 },
        };

        let msg = err.to_string();
        assert!(msg.contains("http://host/a.png"));
        assert!(msg.contains("404"));
        assert!(err.is_network());
    }

    #[test]
    fn test_storage_error_path() {
        let err = StorageError::Write {
            path: PathBuf::from("/cache/a.png"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        assert_eq!(err.path(), std::path::Path::new("/cache/a.png"));
        assert!(FetchError::from(err).is_storage());
    }

    #[test]
    fn test_decode_error_conversion() {
        let err: FetchError = DecodeError::new("bad header").into();
        assert!(err.is_decode());
        assert_eq!(err.to_string(), "Failed to decode image: bad header");
    }

    #[test]
    fn test_aborted_is_its_own_kind() {
        let err = FetchError::Aborted("task panicked".to_string());
        assert!(err.is_aborted());
        assert!(!err.is_decode() && !err.is_network() && !err.is_storage());
        assert_eq!(err.to_string(), "Fetch task aborted: task panicked");
    }
}
