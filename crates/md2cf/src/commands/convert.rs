//! `md2cf convert` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use md2cf_config::{CliSettings, Config};
use md2cf_diagrams::DiagnosticLog;
use md2cf_renderer::{ConvertResult, Converter, document_dir};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Path to the markdown file.
    file: PathBuf,

    /// Write the XHTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory receiving attachments (overrides MD2CF_IMAGE_DIR).
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Directory relative image paths are resolved against (default: the file's directory).
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Let renderers write to the terminal (overrides MD2CF_DEBUG).
    #[arg(long)]
    debug: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let mut config = Config::from_env()?;
        config.apply_cli_settings(&self.cli_settings());
        let project_dir = std::env::current_dir()?;

        output.info(&format!("Converting {}...", self.file.display()));
        let result = self.convert(&config, &project_dir)?;

        match &self.output {
            Some(path) => {
                write_document(path, &result.xhtml)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            None => output.document(&result.xhtml)?,
        }

        let log = DiagnosticLog::new(config.diagnostic_log_path());
        print_report(&output, &result, &config.image_dir, &log, config.log_tail);
        Ok(())
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            image_dir: self.image_dir.clone(),
            debug: self.debug.then_some(true),
        }
    }

    fn convert(&self, config: &Config, project_dir: &Path) -> Result<ConvertResult, CliError> {
        let markdown = std::fs::read_to_string(&self.file).map_err(|source| CliError::Read {
            path: self.file.clone(),
            source,
        })?;

        let mut converter = Converter::from_config(config, project_dir);
        if let Some(dir) = self.base_dir.clone().or_else(|| document_dir(&self.file)) {
            converter = converter.with_base_dir(dir);
        }
        Ok(converter.convert(&markdown)?)
    }
}

fn write_document(path: &Path, content: &str) -> Result<(), CliError> {
    let write_err = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, content).map_err(write_err)
}

fn print_report(
    output: &Output,
    result: &ConvertResult,
    image_dir: &Path,
    log: &DiagnosticLog,
    log_tail: usize,
) {
    let report = &result.report;
    output.info(&format!(
        "Diagrams: {} rendered, {} left as code. Images: {}.",
        report.diagrams, report.degraded, report.images
    ));

    if !result.attachments.is_empty() {
        output.info(&format!(
            "\nAttachments in {} ({}):",
            image_dir.display(),
            result.attachments.len()
        ));
        for name in &result.attachments {
            output.info(&format!("  -> {name}"));
        }
    }

    if !report.warnings.is_empty() {
        output.warning(&format!("\nWarnings ({}):", report.warnings.len()));
        for warning in &report.warnings {
            output.warning(&format!("  - {warning}"));
        }
    }

    if result.has_degraded_diagrams() && log_tail > 0 {
        match log.tail(log_tail) {
            Ok(lines) if !lines.is_empty() => {
                output.info(&format!("\nLast lines of {}:", log.path().display()));
                for line in &lines {
                    output.log_line(line);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read diagnostic log"),
        }
    }
}
