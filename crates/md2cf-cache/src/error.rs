//! Error types for the artifact cache.

use std::path::PathBuf;

/// Error from cache operations.
///
/// Only [`Invalid`](CacheError::Invalid) is a per-artifact problem; the I/O
/// variants mean the cache directory itself is unusable.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Creating the cache directory or a scratch file failed.
    #[error("cannot prepare cache directory {}", path.display())]
    Prepare {
        /// Directory that could not be prepared.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Renaming a committed artifact into place failed.
    #[error("cannot store cache entry {}", path.display())]
    Persist {
        /// Final entry path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The produced artifact failed validation and was discarded.
    #[error("artifact for key {key} failed validation")]
    Invalid {
        /// Cache key of the rejected artifact.
        key: String,
    },
}

impl CacheError {
    /// Whether this error means the cache directory is unusable.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Prepare { .. } | Self::Persist { .. })
    }
}
