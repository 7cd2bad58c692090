//! Content-addressed artifact cache for md2cf.
//!
//! This crate stores rendered artifacts (diagram images) as plain files named
//! after their content key. Two pieces form the API:
//!
//! - [`FileCache`]: a directory of `{key}.{extension}` files with validated
//!   lookups and atomic inserts
//! - [`ArtifactValidator`]: a signature check applied on every read and before
//!   every insert, so a corrupted file is never handed out
//!
//! # Inserting
//!
//! Inserts are two-phase. [`FileCache::reserve`] hands out a [`PendingEntry`]
//! whose path lives inside the cache directory under a unique scratch name.
//! The producer (usually an external process) writes to that path, then
//! [`FileCache::commit`] validates the file and renames it into place. Dropping
//! a pending entry removes whatever partial output it holds.
//!
//! # Example
//!
//! ```
//! use md2cf_cache::FileCache;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let cache = FileCache::new(dir.path().join("cache"), "txt");
//!
//! assert!(cache.get("abc").is_none());
//!
//! let pending = cache.reserve("abc")?;
//! std::fs::write(pending.path(), b"hello")?;
//! let entry = cache.commit(pending)?;
//!
//! assert_eq!(cache.get("abc").map(|e| e.path), Some(entry.path));
//! # Ok(())
//! # }
//! ```

mod error;
mod file;

use std::path::Path;

pub use error::CacheError;
pub use file::{CacheEntry, FileCache, PendingEntry};

/// Validates an artifact file before it is served from or committed to a cache.
///
/// Implemented for any `Fn(&Path) -> bool`, so a plain function works as a
/// validator.
pub trait ArtifactValidator: Send + Sync {
    /// Returns `true` if the file at `path` is a well-formed artifact.
    fn is_valid(&self, path: &Path) -> bool;
}

impl<F> ArtifactValidator for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_valid(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Validator that accepts any existing, non-empty file.
pub struct NonEmptyFile;

impl ArtifactValidator for NonEmptyFile {
    fn is_valid(&self, path: &Path) -> bool {
        path.metadata().is_ok_and(|m| m.is_file() && m.len() > 0)
    }
}
