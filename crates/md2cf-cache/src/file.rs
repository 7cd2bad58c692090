//! File-based content-addressed cache.
//!
//! [`FileCache`] stores one file per key directly in its directory:
//!
//! ```text
//! {dir}/
//! +-- 3f5a...e1.png        # committed entry for key "3f5a...e1"
//! +-- .pending-Xy12ab.png  # scratch file of an in-flight insert
//! ```
//!
//! Entries are never edited in place. A scratch file is renamed over the final
//! path only after it passes validation, so concurrent writers of the same key
//! each publish a complete file and readers never see a partial one.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::CacheError;
use crate::{ArtifactValidator, NonEmptyFile};

/// A validated cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Content key of the entry.
    pub key: String,
    /// Path of the entry file.
    pub path: PathBuf,
    /// Whether the entry was already present (cache hit) rather than just
    /// committed.
    pub cached: bool,
}

/// An insert in progress.
///
/// Write the artifact to [`path`](Self::path), then hand the entry back to
/// [`FileCache::commit`]. Dropping it deletes the scratch file.
#[derive(Debug)]
pub struct PendingEntry {
    key: String,
    scratch: TempPath,
}

impl PendingEntry {
    /// Scratch path the producer must write to.
    ///
    /// The path carries the cache's extension, so tools that infer the output
    /// format from the file name behave as they would for the final path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.scratch
    }

    /// Key this entry will be committed under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Directory of content-addressed artifact files.
pub struct FileCache {
    dir: PathBuf,
    extension: String,
    validator: Box<dyn ArtifactValidator>,
}

impl FileCache {
    /// Create a cache rooted at `dir` storing `{key}.{extension}` files.
    ///
    /// The directory is created lazily on the first insert. The default
    /// validator only requires a non-empty file; use
    /// [`with_validator`](Self::with_validator) for a signature check.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_owned(),
            validator: Box::new(NonEmptyFile),
        }
    }

    /// Replace the artifact validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl ArtifactValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path where the entry for `key` lives once committed.
    #[must_use]
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.extension))
    }

    /// Look up a validated entry.
    ///
    /// An existing file that fails validation is deleted and reported as a
    /// miss, so the next insert replaces it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }

        if self.validator.is_valid(&path) {
            tracing::debug!(key, "cache hit");
            return Some(CacheEntry {
                key: key.to_owned(),
                path,
                cached: true,
            });
        }

        tracing::warn!(path = %path.display(), "discarding corrupted cache entry");
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), "failed to remove corrupted cache entry: {e}");
        }
        None
    }

    /// Start an insert for `key`.
    ///
    /// Creates the cache directory if needed and reserves a unique scratch
    /// file inside it.
    pub fn reserve(&self, key: &str) -> Result<PendingEntry, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Prepare {
            path: self.dir.clone(),
            source,
        })?;

        let suffix = format!(".{}", self.extension);
        let scratch = tempfile::Builder::new()
            .prefix(".pending-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .map_err(|source| CacheError::Prepare {
                path: self.dir.clone(),
                source,
            })?
            .into_temp_path();

        Ok(PendingEntry {
            key: key.to_owned(),
            scratch,
        })
    }

    /// Validate a pending entry and publish it under its key.
    ///
    /// An invalid artifact is deleted and reported as
    /// [`CacheError::Invalid`]; nothing is left at the entry path.
    pub fn commit(&self, pending: PendingEntry) -> Result<CacheEntry, CacheError> {
        let PendingEntry { key, scratch } = pending;

        if !self.validator.is_valid(&scratch) {
            // Dropping the TempPath removes the partial output.
            drop(scratch);
            return Err(CacheError::Invalid { key });
        }

        let path = self.entry_path(&key);
        scratch
            .persist(&path)
            .map_err(|e| CacheError::Persist {
                path: path.clone(),
                source: e.error,
            })?;

        tracing::debug!(key, path = %path.display(), "cache entry stored");
        Ok(CacheEntry {
            key,
            path,
            cached: false,
        })
    }
}
