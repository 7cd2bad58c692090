//! Content-addressed render cache.
//!
//! [`DiagramCache::ensure_rendered`] maps a [`DiagramSource`] to a validated
//! PNG file, running a renderer only on a cache miss.

use std::path::{Path, PathBuf};

use md2cf_cache::{CacheError, FileCache};
use md2cf_config::Config;

use crate::backend::Renderers;
use crate::consts::IMAGE_EXTENSION;
use crate::diagnostics::DiagnosticLog;
use crate::error::{DiagramError, RenderError};
use crate::language::DiagramSource;
use crate::options::RenderOptions;
use crate::plantuml::prepare_source;
use crate::png::is_valid_png_file;

/// A rendered diagram in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    /// Content-address key.
    pub key: String,
    /// Validated PNG file inside the cache directory.
    pub path: PathBuf,
    /// Whether the image was already cached.
    pub cached: bool,
    /// Non-fatal problems found while preparing the source.
    pub warnings: Vec<String>,
}

impl RenderedDiagram {
    /// Filename of the cached image (`{key}.png`).
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.{IMAGE_EXTENSION}", self.key)
    }
}

/// Render cache over a directory of `{hash}.png` files.
pub struct DiagramCache {
    store: FileCache,
    renderers: Renderers,
    options: RenderOptions,
    include_dirs: Vec<PathBuf>,
    log: DiagnosticLog,
}

impl DiagramCache {
    /// Create a cache in `dir` using `renderers`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, renderers: Renderers, log: DiagnosticLog) -> Self {
        Self {
            store: FileCache::new(dir, IMAGE_EXTENSION).with_validator(is_valid_png_file),
            renderers,
            options: RenderOptions::default(),
            include_dirs: Vec::new(),
            log,
        }
    }

    /// Build the cache, backends and diagnostic log from configuration.
    #[must_use]
    pub fn from_config(config: &Config, project_dir: &Path) -> Self {
        Self::new(
            config.cache_dir.clone(),
            Renderers::from_config(config, project_dir),
            DiagnosticLog::new(config.diagnostic_log_path()),
        )
        .with_options(RenderOptions::from(&config.mermaid))
        .with_include_dirs(config.plantuml.include_dirs.clone())
    }

    /// Set renderer options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Set directories searched for `PlantUML` `!include` files.
    #[must_use]
    pub fn with_include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    /// Diagnostic log receiving renderer failures.
    #[must_use]
    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    /// Return a validated PNG for `source`, rendering it on a miss.
    ///
    /// A cached file that fails validation is discarded and re-rendered.
    /// Partial output of a failed render never reaches the cache directory
    /// under its final name. Every failure is recorded in the diagnostic log.
    pub fn ensure_rendered(&self, source: &DiagramSource) -> Result<RenderedDiagram, DiagramError> {
        let language = source.language;
        let (prepared, warnings) = if language.needs_plantuml_preprocessing() {
            let result = prepare_source(&source.code, &self.include_dirs);
            (DiagramSource::new(language, result.source), result.warnings)
        } else {
            (source.clone(), Vec::new())
        };
        let key = prepared.cache_key();

        if let Some(entry) = self.store.get(&key) {
            tracing::debug!(%language, key = %key, "Diagram cache hit");
            return Ok(RenderedDiagram {
                key,
                path: entry.path,
                cached: true,
                warnings,
            });
        }

        let renderer = match self.renderers.get(language) {
            Ok(renderer) => renderer,
            Err(err) => return Err(self.fail(language.as_str(), err)),
        };

        let pending = match self.store.reserve(&key) {
            Ok(pending) => pending,
            Err(err) => return Err(self.fail_cache(language.as_str(), err)),
        };
        if let Err(err) = renderer.render(&prepared.code, &self.options, pending.path()) {
            return Err(self.fail(language.as_str(), err));
        }

        let entry = match self.store.commit(pending) {
            Ok(entry) => entry,
            Err(err) => return Err(self.fail_cache(language.as_str(), err)),
        };

        tracing::info!(%language, key = %key, "Rendered diagram");
        Ok(RenderedDiagram {
            key,
            path: entry.path,
            cached: false,
            warnings,
        })
    }

    fn fail(&self, context: &str, err: RenderError) -> DiagramError {
        self.log.record(context, &err.log_message());
        DiagramError::Render(err)
    }

    fn fail_cache(&self, context: &str, err: CacheError) -> DiagramError {
        let err = DiagramError::from(err);
        self.log.record(context, &error_chain(&err));
        err
    }
}

/// `err` followed by its sources, separated by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl std::fmt::Debug for DiagramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramCache")
            .field("dir", &self.store.dir())
            .field("renderers", &self.renderers)
            .field("options", &self.options)
            .field("include_dirs", &self.include_dirs)
            .finish_non_exhaustive()
    }
}
