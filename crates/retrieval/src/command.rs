//! Command runner abstraction for invoking the external record reader.
//!
//! Provides a trait-based interface for running the reader, with a real
//! implementation (`SystemCommandRunner`) and a scripted one in
//! [`crate::testing`].

use chronolog_common::{ChronologError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output from a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output, decoded lossily
    pub stdout: String,
    /// Standard error, decoded lossily
    pub stderr: String,
    /// Exit code (None if the process was killed by a signal)
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running external commands. Mockable for testing.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `working_dir`, waiting at most `timeout`.
    ///
    /// Fails only when the process could not be run to completion; a
    /// non-zero exit code is reported through [`CommandOutput::exit_code`].
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

/// Real command runner that spawns system processes.
pub struct SystemCommandRunner;

/// Anchor a relative program path with a directory part to the current
/// directory, since the child's working directory changes how it resolves.
/// Bare names are left alone for `PATH` lookup.
pub fn program_path(program: &Path) -> Result<PathBuf> {
    let has_dir = program
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty());
    if program.is_relative() && has_dir {
        Ok(std::path::absolute(program)?)
    } else {
        Ok(program.to_path_buf())
    }
}

#[async_trait::async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!(
            program = %program.display(),
            args = ?args,
            dir = %working_dir.display(),
            "Running command"
        );

        let resolved = program_path(program)?;
        let program = resolved.as_path();
        let child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(program = %program.display(), error = %e, "Command failed to execute");
                ChronologError::ReaderInvocationFailed(format!(
                    "failed to execute {}: {}",
                    program.display(),
                    e
                ))
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                ChronologError::ReaderInvocationFailed(format!(
                    "failed to collect output of {}: {}",
                    program.display(),
                    e
                ))
            })?,
            Err(_) => {
                warn!(
                    program = %program.display(),
                    timeout_secs = timeout.as_secs(),
                    "Command timed out"
                );
                return Err(ChronologError::ReaderTimedOut(timeout.as_secs()));
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}
