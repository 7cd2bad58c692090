//! Renderer backends.
//!
//! Every backend implements [`DiagramRenderer`]. [`Renderers`] holds one slot
//! per [`DiagramLanguage`]; a slot is either a ready backend or the reason it
//! cannot run, which is resolved once when the registry is built.

mod mermaid;
mod plantuml;

use std::path::Path;

use md2cf_config::Config;

pub use self::mermaid::MermaidCli;
pub use self::plantuml::{PlantUmlJar, resolve_jar};
use crate::error::RenderError;
use crate::language::DiagramLanguage;
use crate::options::RenderOptions;
use crate::process::ProcessRunner;

/// A backend that turns diagram source into a PNG file.
pub trait DiagramRenderer: Send + Sync {
    /// Render `source` into `out_file`.
    ///
    /// On error, `out_file` may hold partial output; the caller discards it.
    fn render(
        &self,
        source: &str,
        options: &RenderOptions,
        out_file: &Path,
    ) -> Result<(), RenderError>;
}

enum Slot {
    Ready(Box<dyn DiagramRenderer>),
    Unavailable(String),
}

/// Backend registry keyed by diagram language.
pub struct Renderers {
    mermaid: Slot,
    plantuml: Slot,
}

impl Renderers {
    /// Registry with every backend unavailable.
    #[must_use]
    pub fn none() -> Self {
        Self {
            mermaid: Slot::Unavailable("no renderer configured".to_owned()),
            plantuml: Slot::Unavailable("no renderer configured".to_owned()),
        }
    }

    /// Locate the configured backends.
    ///
    /// `project_dir` is where `./plantuml.jar` is looked up. Disabled backends
    /// are not located at all.
    #[must_use]
    pub fn from_config(config: &Config, project_dir: &Path) -> Self {
        let runner = ProcessRunner {
            debug: config.debug,
            timeout: config.render_timeout,
        };
        let scratch_dir = config.scratch_dir();

        let mermaid = if config.mermaid.enabled {
            match MermaidCli::locate(&config.mermaid.command, &scratch_dir, runner) {
                Ok(cli) => Slot::Ready(Box::new(cli)),
                Err(reason) => Slot::Unavailable(reason),
            }
        } else {
            Slot::Unavailable("disabled by MD2CF_MERMAID".to_owned())
        };

        let plantuml = if config.plantuml.enabled {
            match PlantUmlJar::locate(&config.plantuml, project_dir, &scratch_dir, runner) {
                Ok(jar) => Slot::Ready(Box::new(jar)),
                Err(reason) => Slot::Unavailable(reason),
            }
        } else {
            Slot::Unavailable("disabled by MD2CF_PLANTUML".to_owned())
        };

        Self { mermaid, plantuml }
    }

    /// Install `renderer` for `language`, replacing the current slot.
    #[must_use]
    pub fn with_renderer(
        mut self,
        language: DiagramLanguage,
        renderer: impl DiagramRenderer + 'static,
    ) -> Self {
        *self.slot_mut(language) = Slot::Ready(Box::new(renderer));
        self
    }

    /// Mark `language` as unavailable.
    #[must_use]
    pub fn without_renderer(mut self, language: DiagramLanguage, reason: impl Into<String>) -> Self {
        *self.slot_mut(language) = Slot::Unavailable(reason.into());
        self
    }

    /// Backend for `language`, or [`RenderError::Unavailable`].
    pub fn get(&self, language: DiagramLanguage) -> Result<&dyn DiagramRenderer, RenderError> {
        let slot = match language {
            DiagramLanguage::Mermaid => &self.mermaid,
            DiagramLanguage::PlantUml => &self.plantuml,
        };
        match slot {
            Slot::Ready(renderer) => Ok(renderer.as_ref()),
            Slot::Unavailable(reason) => Err(RenderError::Unavailable {
                renderer: language.as_str(),
                reason: reason.clone(),
            }),
        }
    }

    /// Whether a backend is ready for `language`.
    #[must_use]
    pub fn is_available(&self, language: DiagramLanguage) -> bool {
        self.get(language).is_ok()
    }

    fn slot_mut(&mut self, language: DiagramLanguage) -> &mut Slot {
        match language {
            DiagramLanguage::Mermaid => &mut self.mermaid,
            DiagramLanguage::PlantUml => &mut self.plantuml,
        }
    }
}

impl std::fmt::Debug for Renderers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderers")
            .field("mermaid", &self.is_available(DiagramLanguage::Mermaid))
            .field("plantuml", &self.is_available(DiagramLanguage::PlantUml))
            .finish()
    }
}
