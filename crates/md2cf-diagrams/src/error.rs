//! Error types for diagram rendering.

use std::path::PathBuf;
use std::time::Duration;

use md2cf_cache::CacheError;

/// Failure of a single renderer invocation.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Backend is disabled or its tooling could not be located.
    #[error("{renderer} renderer unavailable: {reason}")]
    Unavailable {
        /// Backend name.
        renderer: &'static str,
        /// Why the backend cannot run.
        reason: String,
    },

    /// The renderer process could not be started.
    #[error("failed to start {program}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The renderer process exited unsuccessfully.
    #[error("{renderer} exited with {status}")]
    Exit {
        /// Backend name.
        renderer: &'static str,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured stderr (empty in debug mode).
        stderr: String,
    },

    /// The renderer process did not finish in time and was killed.
    #[error("{renderer} timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Backend name.
        renderer: &'static str,
        /// Configured timeout.
        timeout: Duration,
    },

    /// The renderer exited successfully but produced no image.
    #[error("{renderer} produced no output at {}", path.display())]
    MissingOutput {
        /// Backend name.
        renderer: &'static str,
        /// Expected output path.
        path: PathBuf,
    },

    /// Scratch file handling around the renderer failed.
    #[error("{renderer} I/O error")]
    Io {
        /// Backend name.
        renderer: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Whether the backend could not run at all, as opposed to failing on this diagram.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Text for the diagnostic log, including captured stderr.
    #[must_use]
    pub fn log_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        if let Self::Exit { stderr, .. } = self
            && !stderr.trim().is_empty()
        {
            message.push('\n');
            message.push_str(stderr.trim_end());
        }
        message
    }
}

/// Error from [`DiagramCache::ensure_rendered`](crate::DiagramCache::ensure_rendered).
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// Rendering failed or the backend is unavailable.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The renderer produced a file that is not a complete PNG.
    #[error("rendered image for {key} is not a valid PNG")]
    InvalidImage {
        /// Cache key of the rejected image.
        key: String,
    },

    /// The cache directory cannot be used.
    #[error(transparent)]
    Cache(CacheError),
}

impl DiagramError {
    /// Whether the error must abort the conversion.
    ///
    /// Everything except cache directory I/O degrades a single diagram.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}

impl From<CacheError> for DiagramError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Invalid { key } => Self::InvalidImage { key },
            other => Self::Cache(other),
        }
    }
}
