//! `md2cf log` command implementation.

use clap::Args;
use md2cf_config::Config;
use md2cf_diagrams::DiagnosticLog;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the log command.
#[derive(Args)]
pub(crate) struct LogArgs {
    /// Number of lines to show (default: MD2CF_LOG_TAIL).
    #[arg(short = 'n', long)]
    lines: Option<usize>,
}

impl LogArgs {
    /// Execute the log command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::from_env()?;
        let log = DiagnosticLog::new(config.diagnostic_log_path());

        let lines = log.tail(self.lines.unwrap_or(config.log_tail))?;
        if lines.is_empty() {
            output.success(&format!("No diagnostics in {}", log.path().display()));
            return Ok(());
        }

        output.info(&format!("{}:", log.path().display()));
        for line in &lines {
            output.document(line)?;
        }
        Ok(())
    }
}
