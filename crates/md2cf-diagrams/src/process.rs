//! Subprocess execution shared by the renderer backends.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::consts::{MAX_STDERR_BYTES, PROCESS_POLL_INTERVAL};
use crate::error::RenderError;

/// Runs renderer commands with the configured stdio and timeout policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    /// Inherit stdio instead of discarding stdout and capturing stderr.
    pub debug: bool,
    /// Kill the process after this long.
    pub timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Run `command` to completion.
    ///
    /// In non-debug mode stdout is discarded and stderr is captured into an
    /// anonymous temp file, which is attached to [`RenderError::Exit`].
    pub(crate) fn run(&self, mut command: Command, renderer: &'static str) -> Result<(), RenderError> {
        let program = command.get_program().to_string_lossy().into_owned();
        let io_err = |source| RenderError::Io { renderer, source };

        command.stdin(Stdio::null());
        let mut stderr_file = None;
        if self.debug {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            let file = tempfile::tempfile().map_err(io_err)?;
            command
                .stdout(Stdio::null())
                .stderr(Stdio::from(file.try_clone().map_err(io_err)?));
            stderr_file = Some(file);
        }

        tracing::debug!(?command, "Running renderer");
        let mut child = command
            .spawn()
            .map_err(|source| RenderError::Spawn { program, source })?;

        let status = match self.timeout {
            Some(timeout) => match wait_with_timeout(&mut child, timeout).map_err(io_err)? {
                Some(status) => status,
                None => return Err(RenderError::Timeout { renderer, timeout }),
            },
            None => child.wait().map_err(io_err)?,
        };

        if status.success() {
            return Ok(());
        }

        let stderr = stderr_file
            .map(|mut file| read_captured(&mut file))
            .unwrap_or_default();
        Err(RenderError::Exit {
            renderer,
            status: status.to_string(),
            stderr,
        })
    }
}

/// Wait for `child`, killing it once `timeout` elapses.
///
/// Returns `None` if the process was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // The process may exit between try_wait and kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(PROCESS_POLL_INTERVAL);
    }
}

/// Read captured stderr, keeping only the last [`MAX_STDERR_BYTES`].
fn read_captured(file: &mut File) -> String {
    let mut bytes = Vec::new();
    if file.seek(SeekFrom::Start(0)).is_err() || file.read_to_end(&mut bytes).is_err() {
        return String::new();
    }
    let start = bytes.len().saturating_sub(MAX_STDERR_BYTES);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

/// Move `from` to `to`, copying when the rename crosses filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
