//! Markdown to Confluence storage XHTML conversion pipeline.

use std::path::{Path, PathBuf};

use md2cf_config::Config;
use md2cf_diagrams::DiagramCache;

use crate::assets::AttachmentMaterializer;
use crate::error::ConvertError;
use crate::resolver::PlaceholderResolver;
use crate::tree::Node;
use crate::walker::{TreeWalker, WalkReport};
use crate::xhtml;

/// Result of converting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertResult {
    /// Namespaced XHTML fragment.
    pub xhtml: String,
    /// Filenames placed into the asset directory, in first-use order.
    pub attachments: Vec<String>,
    /// Counters and warnings from the tree walk.
    pub report: WalkReport,
}

impl ConvertResult {
    /// Whether any diagram was left as a code block.
    pub fn has_degraded_diagrams(&self) -> bool {
        self.report.degraded > 0
    }
}

/// Converts Markdown documents, sharing one render cache across documents.
///
/// Each [`Converter::convert`] call is a separate run with its own set of
/// materialized attachments.
#[derive(Debug)]
pub struct Converter {
    diagrams: DiagramCache,
    image_dir: PathBuf,
    base_dir: Option<PathBuf>,
}

impl Converter {
    #[must_use]
    pub fn new(diagrams: DiagramCache, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            diagrams,
            image_dir: image_dir.into(),
            base_dir: None,
        }
    }

    /// Build a converter with renderers resolved against `project_dir`.
    #[must_use]
    pub fn from_config(config: &Config, project_dir: &Path) -> Self {
        Self::new(
            DiagramCache::from_config(config, project_dir),
            config.image_dir.clone(),
        )
    }

    /// Directory that relative image paths are resolved against.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Convert `markdown` into Confluence storage XHTML.
    ///
    /// Diagrams that cannot be rendered stay code blocks and are reported in
    /// [`ConvertResult::report`]. Only I/O failures on the cache or asset
    /// directories return an error.
    pub fn convert(&self, markdown: &str) -> Result<ConvertResult, ConvertError> {
        let mut root = Node::parse(markdown);
        let mut assets = AttachmentMaterializer::new(&self.image_dir);

        let mut walker =
            TreeWalker::new(&self.diagrams, &mut assets).with_base_dir(self.base_dir.clone());
        walker.transform(&mut root)?;
        let report = walker.finish();

        let html = root.to_html();
        let html = PlaceholderResolver::new(&self.image_dir).resolve(&html);
        let xhtml = xhtml::normalize(&html);

        tracing::debug!(
            diagrams = report.diagrams,
            degraded = report.degraded,
            images = report.images,
            "Converted document"
        );

        Ok(ConvertResult {
            xhtml,
            attachments: assets.into_attachments(),
            report,
        })
    }
}
