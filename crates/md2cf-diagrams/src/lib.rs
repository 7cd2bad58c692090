//! Diagram rendering for md2cf.
//!
//! This crate turns Mermaid and `PlantUML` code blocks into PNG images by
//! running external renderers, and caches the images by content:
//! - [`DiagramCache`] computes the content key, serves validated cache hits,
//!   and renders on a miss
//! - [`Renderers`] holds one [`DiagramRenderer`] backend per
//!   [`DiagramLanguage`] ([`MermaidCli`], [`PlantUmlJar`])
//! - [`DiagnosticLog`] records every renderer failure with a timestamp
//!
//! # Architecture
//!
//! - [`language`]: `DiagramLanguage` and `DiagramSource` with its cache key
//! - [`backend`]: renderer trait, registry, and the subprocess backends
//! - [`plantuml`]: `!include` resolution applied before hashing
//! - [`png`]: signature checks used to validate cache entries
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use md2cf_config::Config;
//! use md2cf_diagrams::{DiagramCache, DiagramLanguage, DiagramSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let cache = DiagramCache::from_config(&config, Path::new("."));
//!
//! let source = DiagramSource::new(DiagramLanguage::Mermaid, "graph TD; A-->B;");
//! let rendered = cache.ensure_rendered(&source)?;
//! assert!(rendered.path.ends_with(rendered.filename()));
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod cache;
mod consts;
mod diagnostics;
mod error;
pub mod language;
mod options;
pub mod plantuml;
pub mod png;
mod process;

pub use backend::{DiagramRenderer, MermaidCli, PlantUmlJar, Renderers};
pub use cache::{DiagramCache, RenderedDiagram};
pub use diagnostics::DiagnosticLog;
pub use error::{DiagramError, RenderError};
pub use language::{DiagramLanguage, DiagramSource};
pub use options::RenderOptions;
pub use process::ProcessRunner;
