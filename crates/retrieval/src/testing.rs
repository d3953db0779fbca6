//! Scripted command runner for tests.

use crate::command::{CommandOutput, CommandRunner};
use chronolog_common::{ChronologError, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// Mock command runner that replays queued responses in order.
pub struct MockCommandRunner {
    responses: Mutex<Vec<Result<CommandOutput>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl MockCommandRunner {
    /// Create a mock that returns the given responses in order.
    pub fn new(responses: Vec<Result<CommandOutput>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// A mock whose single run exits 0 with `stdout`.
    pub fn stdout(stdout: &str) -> Self {
        Self::new(vec![Ok(CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        })])
    }

    /// A mock whose single run cannot be started.
    pub fn unavailable(detail: &str) -> Self {
        Self::new(vec![Err(ChronologError::ReaderInvocationFailed(
            detail.to_string(),
        ))])
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        self.invocations.lock().unwrap().push(Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
            working_dir: working_dir.to_path_buf(),
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(ChronologError::ReaderInvocationFailed(
                "No more mock responses".to_string(),
            ))
        } else {
            responses.remove(0)
        }
    }
}
