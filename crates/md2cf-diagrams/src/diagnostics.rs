//! Append-only diagnostic log for renderer failures.
//!
//! Lines look like `[2026-01-05T10:00:00Z] mermaid: exit status: 1`.
//! Continuation lines of multi-line messages are indented by four spaces.
//! The file is never truncated by md2cf.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

/// Persistent, timestamped log of renderer failures.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: PathBuf,
}

impl DiagnosticLog {
    /// Create a log writing to `path`. Nothing is created until the first record.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry.
    ///
    /// Logging never interrupts a conversion, so write failures are only
    /// reported through `tracing`.
    pub fn record(&self, context: &str, message: &str) {
        if let Err(e) = self.append(context, message) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write diagnostic log");
        }
    }

    fn append(&self, context: &str, message: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut lines = message.trim_end().lines();
        let mut entry = format!("[{timestamp}] {context}: {}\n", lines.next().unwrap_or(""));
        for line in lines {
            entry.push_str("    ");
            entry.push_str(line);
            entry.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Entries are written with a single call.
        file.write_all(entry.as_bytes())
    }

    /// Last `lines` lines of the log, oldest first.
    ///
    /// A log that does not exist yet is empty.
    pub fn tail(&self, lines: usize) -> io::Result<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|line| (*line).to_owned()).collect())
    }
}
