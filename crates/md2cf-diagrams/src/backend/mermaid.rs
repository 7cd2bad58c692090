//! Mermaid CLI (`mmdc`) backend.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::DiagramRenderer;
use crate::error::RenderError;
use crate::options::RenderOptions;
use crate::process::ProcessRunner;

const NAME: &str = "mermaid";

/// Renders Mermaid definitions by running the Mermaid CLI.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: PathBuf,
    scratch_dir: PathBuf,
    runner: ProcessRunner,
}

impl MermaidCli {
    /// Backend running `program` directly.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>, runner: ProcessRunner) -> Self {
        Self {
            program: program.into(),
            scratch_dir: scratch_dir.into(),
            runner,
        }
    }

    /// Find `command` on `PATH` (or as a path).
    ///
    /// Returns the reason as an error when it cannot be found.
    pub fn locate(command: &str, scratch_dir: &Path, runner: ProcessRunner) -> Result<Self, String> {
        let program = which::which(command)
            .map_err(|e| format!("'{command}' not found ({e}); install @mermaid-js/mermaid-cli"))?;
        tracing::debug!(program = %program.display(), "Found Mermaid CLI");
        Ok(Self::new(program, scratch_dir, runner))
    }
}

impl DiagramRenderer for MermaidCli {
    fn render(
        &self,
        source: &str,
        options: &RenderOptions,
        out_file: &Path,
    ) -> Result<(), RenderError> {
        let io_err = |source| RenderError::Io {
            renderer: NAME,
            source,
        };

        std::fs::create_dir_all(&self.scratch_dir).map_err(io_err)?;
        let mut input = tempfile::Builder::new()
            .prefix("mermaid-")
            .suffix(".mmd")
            .tempfile_in(&self.scratch_dir)
            .map_err(io_err)?;
        input.write_all(source.as_bytes()).map_err(io_err)?;
        input.flush().map_err(io_err)?;

        let mut command = Command::new(&self.program);
        command
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(out_file)
            .args(options.mermaid_args());
        self.runner.run(command, NAME)?;

        // The cache hands over an existing empty file
        let written = std::fs::metadata(out_file).is_ok_and(|meta| meta.is_file() && meta.len() > 0);
        if !written {
            return Err(RenderError::MissingOutput {
                renderer: NAME,
                path: out_file.to_path_buf(),
            });
        }
        Ok(())
    }
}
