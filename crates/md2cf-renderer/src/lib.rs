//! Markdown to Confluence storage XHTML conversion.
//!
//! The pipeline runs in four stages:
//! 1. [`Node::parse`] folds pulldown-cmark events into a mutable tree
//! 2. [`TreeWalker`] renders diagram code blocks through
//!    [`md2cf_diagrams::DiagramCache`] and replaces them, together with
//!    images, by [`Placeholder`] nodes. Files are placed into the asset
//!    directory by the [`AttachmentMaterializer`]
//! 3. The tree is serialized to HTML and [`PlaceholderResolver`] turns every
//!    placeholder token into an `<ac:image>` macro
//! 4. [`xhtml::normalize`] makes the result well-formed XHTML
//!
//! [`Converter`] wires the stages together.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use md2cf_config::Config;
//! use md2cf_renderer::Converter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let converter = Converter::from_config(&config, Path::new(".")).with_base_dir("docs");
//!
//! let result = converter.convert("```mermaid\ngraph TD; A-->B;\n```\n")?;
//! for warning in &result.report.warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok(())
//! # }
//! ```

mod assets;
mod converter;
mod error;
pub mod placeholder;
mod resolver;
pub mod tree;
mod walker;
pub mod xhtml;

pub use assets::AttachmentMaterializer;
pub use converter::{ConvertResult, Converter};
pub use error::{ConvertError, MaterializeError};
pub use placeholder::{Placeholder, PlaceholderKind};
pub use resolver::PlaceholderResolver;
pub use tree::{Node, NodeKind};
pub use walker::{TreeWalker, WalkReport, document_dir};
