//! Bridge error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Failure of a single prediction request
///
/// Every variant is terminal for that request; the bridge never retries.
/// `Display` carries the exit code or parse message but never the raw
/// process output, which stays available through [`BridgeError::diagnostic`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Caller input rejected before the transform ran
    #[error("Invalid assessment: {0}")]
    Validation(String),

    /// Model process could not be started
    #[error("Failed to start model process: {reason}")]
    Spawn { reason: String },

    /// Model process exited unsuccessfully; stdout is discarded
    #[error("Model process exited with {}", describe_exit(.code))]
    Exit { code: Option<i32>, stderr: String },

    /// Output was not JSON, or not the expected document shape
    #[error("Failed to parse model output: {message}")]
    Parse { raw_output: String, message: String },

    /// Model process exceeded its time limit and was killed
    #[error("Model process timed out after {0:?}")]
    Timeout(Duration),

    /// Pipe I/O failed while the process was running
    #[error("I/O error while collecting model output: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl BridgeError {
    /// Stable kind name for logs and API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "ValidationError",
            BridgeError::Spawn { .. } => "BridgeSpawnError",
            BridgeError::Exit { .. } => "BridgeExitError",
            BridgeError::Parse { .. } => "BridgeParseError",
            BridgeError::Timeout(_) => "BridgeTimeoutError",
            BridgeError::Io(_) => "BridgeIoError",
        }
    }

    /// Captured diagnostic text: stderr for exit failures, the raw output
    /// for parse failures. Meant for operators, not end users.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            BridgeError::Exit { stderr, .. } => Some(stderr),
            BridgeError::Parse { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }

    /// Exit code, when the process ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BridgeError::Exit { code, .. } => *code,
            _ => None,
        }
    }
}
