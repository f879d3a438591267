//! Model process execution
//!
//! [`ProcessRunner`] is the seam between the bridge and the operating system.
//! [`CommandRunner`] spawns one process per call; [`BoundedRunner`] gates any
//! runner behind a semaphore so concurrent requests cannot spawn an unbounded
//! number of model processes.

use super::BridgeError;
use async_trait::async_trait;
use carerisk_common::config::ModelConfig;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// The three pieces of data handed to the model for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInvocation {
    /// Canonical input serialized as a single JSON document
    pub canonical_json: String,
    /// Request or patient identifier
    pub request_id: String,
    /// Whether the model should persist its results to the store
    pub persist: bool,
}

impl ModelInvocation {
    /// Command-line form understood by the model script
    pub fn to_args(&self) -> [String; 6] {
        [
            "--json-input".to_string(),
            self.canonical_json.clone(),
            "--patient-id".to_string(),
            self.request_id.clone(),
            "--save-to-db".to_string(),
            self.persist.to_string(),
        ]
    }
}

/// Everything a finished process produced
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the external model once per invocation
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, collecting stdout and stderr in full
    ///
    /// Implementations report failure to start as [`BridgeError::Spawn`] and
    /// an exceeded time limit as [`BridgeError::Timeout`]. A nonzero exit is
    /// NOT an error at this level; it is returned in [`ProcessOutput`].
    async fn run(&self, invocation: &ModelInvocation) -> Result<ProcessOutput, BridgeError>;
}

#[async_trait]
impl<R: ProcessRunner + ?Sized> ProcessRunner for Arc<R> {
    async fn run(&self, invocation: &ModelInvocation) -> Result<ProcessOutput, BridgeError> {
        (**self).run(invocation).await
    }
}

/// Spawns the configured program with tokio, one process per call
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    script: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: None,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            program: config.program.clone(),
            script: config.script.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout(),
        }
    }

    /// Argument placed before the invocation arguments (script path, `-c` body...)
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_command(&self, invocation: &ModelInvocation) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(script) = &self.script {
            command.arg(script);
        }
        command
            .args(invocation.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the child (timeout or abandoned request) kills it;
            // tokio reaps killed children in the background.
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, invocation: &ModelInvocation) -> Result<ProcessOutput, BridgeError> {
        let child = self
            .build_command(invocation)
            .spawn()
            .map_err(|e| BridgeError::Spawn {
                reason: format!("{}: {}", self.program, e),
            })?;

        debug!(
            program = %self.program,
            request_id = %invocation.request_id,
            pid = ?child.id(),
            "Spawned model process"
        );

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        request_id = %invocation.request_id,
                        timeout_ms = limit.as_millis() as u64,
                        "Model process timed out, killing"
                    );
                    return Err(BridgeError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await?,
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Limits how many invocations of the inner runner execute at once
///
/// Callers beyond the limit wait (asynchronously) for a permit.
#[derive(Debug, Clone)]
pub struct BoundedRunner<R> {
    inner: R,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl<R: ProcessRunner> BoundedRunner<R> {
    pub fn new(inner: R, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits not currently held by a running invocation
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl<R: ProcessRunner> ProcessRunner for BoundedRunner<R> {
    async fn run(&self, invocation: &ModelInvocation) -> Result<ProcessOutput, BridgeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BridgeError::Spawn {
                reason: "model runner is shut down".to_string(),
            })?;
        self.inner.run(invocation).await
    }
}
