//! Attachment materializer.
//!
//! Places cached images into the output asset directory, once per run.
//! Sources never share storage with a target that is later replaced:
//! existing targets are swapped out through a staged copy, never written in
//! place.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::MaterializeError;

/// Hex digits of the content hash appended to a colliding filename.
const HASH_SUFFIX_LEN: usize = 8;

/// Per-run context tracking which assets are already in the output directory.
#[derive(Debug)]
pub struct AttachmentMaterializer {
    dir: PathBuf,
    handled: HashMap<PathBuf, String>,
    /// Source claiming each filename in this run.
    names: HashMap<String, PathBuf>,
    /// Filenames in first-materialized order.
    attachments: Vec<String>,
    transfers: usize,
}

impl AttachmentMaterializer {
    /// Materializer writing into `dir`, created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            handled: HashMap::new(),
            names: HashMap::new(),
            attachments: Vec::new(),
            transfers: 0,
        }
    }

    /// Make `source` available in the asset directory and return its filename.
    ///
    /// The filename is the source's own name unless another source already
    /// claimed it in this run; then the first hex digits of the content hash
    /// are appended to the stem. A missing target is hard-linked, falling
    /// back to a copy. An existing target with identical content is kept,
    /// any other is replaced. Later calls for the same path return the same
    /// filename without touching the filesystem.
    pub fn ensure_available(&mut self, source: &Path) -> Result<String, MaterializeError> {
        if let Some(filename) = self.handled.get(source) {
            return Ok(filename.clone());
        }

        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| MaterializeError::NoFileName {
                path: source.to_path_buf(),
            })?;
        let filename = self.claim_name(source, name)?;

        fs::create_dir_all(&self.dir).map_err(|e| MaterializeError::CreateDir {
            path: self.dir.clone(),
            source: e,
        })?;

        let target = self.dir.join(&filename);
        self.place(source, &target)?;
        self.transfers += 1;

        self.names.insert(filename.clone(), source.to_path_buf());
        self.handled.insert(source.to_path_buf(), filename.clone());
        self.attachments.push(filename.clone());
        Ok(filename)
    }

    /// `name`, or a content-hashed variant when a different source holds it.
    fn claim_name(&self, source: &Path, name: String) -> Result<String, MaterializeError> {
        if !self.names.contains_key(&name) {
            return Ok(name);
        }

        let digest = content_hash(source).map_err(|e| MaterializeError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;
        let (stem, extension) = split_extension(&name);
        let short = &digest[..HASH_SUFFIX_LEN];
        let mut candidate = format!("{stem}-{short}{extension}");
        let mut n = 2;
        while self.names.contains_key(&candidate) {
            candidate = format!("{stem}-{short}-{n}{extension}");
            n += 1;
        }
        tracing::debug!(source = %source.display(), filename = %candidate, "Asset name taken, renamed");
        Ok(candidate)
    }

    fn place(&self, source: &Path, target: &Path) -> Result<(), MaterializeError> {
        if fs::symlink_metadata(target).is_ok() {
            if same_content(source, target).unwrap_or(false) {
                tracing::debug!(path = %target.display(), "Asset already present");
                return Ok(());
            }
            self.replace(source, target)?;
            tracing::debug!(path = %target.display(), "Replaced stale asset");
            return Ok(());
        }

        match fs::hard_link(source, target) {
            Ok(()) => {
                tracing::debug!(from = %source.display(), to = %target.display(), "Linked asset");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Hard link failed, copying");
                self.replace(source, target)
            }
        }
    }

    /// Copy `source` next to `target`, then rename it over `target`.
    ///
    /// Whatever `target` pointed to, including a hard link shared with
    /// another file, is left untouched.
    fn replace(&self, source: &Path, target: &Path) -> Result<(), MaterializeError> {
        let copy_err = |e| MaterializeError::Copy {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
            source: e,
        };

        let staged = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(&self.dir)
            .map_err(copy_err)?;
        fs::copy(source, staged.path()).map_err(copy_err)?;
        staged.persist(target).map_err(|e| copy_err(e.error))?;
        Ok(())
    }

    /// Number of link or copy operations performed.
    #[must_use]
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Filenames materialized in this run, in first-use order.
    #[must_use]
    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    /// Consume the context and return the materialized filenames.
    #[must_use]
    pub fn into_attachments(self) -> Vec<String> {
        self.attachments
    }
}

/// Split `name` into stem and extension, keeping the dot with the extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}

fn content_hash(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(fs::read(path)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Byte-for-byte comparison, sizes first.
fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = io::BufReader::new(fs::File::open(a)?);
    let mut right = io::BufReader::new(fs::File::open(b)?);
    let mut left_buf = [0u8; 8192];
    let mut right_buf = [0u8; 8192];
    loop {
        let n = left.read(&mut left_buf)?;
        if n == 0 {
            return Ok(true);
        }
        right.read_exact(&mut right_buf[..n])?;
        if left_buf[..n] != right_buf[..n] {
            return Ok(false);
        }
    }
}
