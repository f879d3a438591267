//! Model invocation bridge
//!
//! Turns a nested assessment into the canonical model input, runs the
//! external risk model once, and validates and reshapes what it prints.
//!
//! # Output contract
//! - exit code ≠ 0 → [`BridgeError::Exit`] (stdout discarded)
//! - exit code 0, stdout not JSON → [`BridgeError::Parse`]
//! - JSON missing any of the three windows under `predictions` or
//!   `projection` → [`BridgeError::Parse`]
//!
//! stderr is collected for diagnostics only and never fails a request.
//! Nothing is retried here; retries are the caller's decision.

mod error;
pub mod runner;

pub use error::BridgeError;
pub use runner::{BoundedRunner, CommandRunner, ModelInvocation, ProcessOutput, ProcessRunner};

use crate::transform::{AssessmentResponse, CanonicalAssessmentInput, ModelOutput, RawModelOutput};
use carerisk_common::config::ModelConfig;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a request identifier: process-wide counter plus random suffix
pub fn next_request_id() -> String {
    let sequence = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("WEB_{}_{:08x}", sequence, rand::random::<u32>())
}

/// Per-call options
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Identifier passed to the model; generated when absent
    pub patient_id: Option<String>,
    /// Ask the model to persist predictions and projections to the store
    pub save_to_store: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            patient_id: None,
            save_to_store: true,
        }
    }
}

/// Entry point for single-assessment predictions
#[derive(Clone)]
pub struct Bridge {
    runner: Arc<dyn ProcessRunner>,
}

impl Bridge {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Command runner for the configured model, bounded to
    /// `max_concurrent` simultaneous processes
    pub fn from_config(config: &ModelConfig) -> Self {
        let runner = BoundedRunner::new(CommandRunner::from_config(config), config.max_concurrent);
        Self::new(Arc::new(runner))
    }

    /// Predict risk for one nested assessment
    pub async fn predict(
        &self,
        assessment: &Value,
        options: PredictOptions,
    ) -> Result<AssessmentResponse, BridgeError> {
        let canonical = CanonicalAssessmentInput::from_assessment(assessment);
        let canonical_json = serde_json::to_string(&canonical)
            .map_err(|e| BridgeError::Validation(e.to_string()))?;

        let request_id = options
            .patient_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(next_request_id);

        let invocation = ModelInvocation {
            canonical_json,
            request_id,
            persist: options.save_to_store,
        };

        info!(
            request_id = %invocation.request_id,
            persist = invocation.persist,
            age = canonical.age,
            chronic_conditions = canonical.conditions.count(),
            "Calling risk model"
        );

        let started = Instant::now();
        let output = self.runner.run(&invocation).await.map_err(|e| {
            warn!(
                request_id = %invocation.request_id,
                kind = e.kind(),
                error = %e,
                "Risk model invocation failed"
            );
            e
        })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.stderr.is_empty() {
            debug!(
                request_id = %invocation.request_id,
                stderr = %output.stderr,
                "Risk model stderr"
            );
        }

        let model_output = decode_output(output).map_err(|e| {
            warn!(
                request_id = %invocation.request_id,
                kind = e.kind(),
                exit_code = ?e.exit_code(),
                elapsed_ms,
                error = %e,
                "Risk model returned an unusable result"
            );
            e
        })?;

        let response = AssessmentResponse::from_model_output(model_output, &invocation.request_id);

        info!(
            request_id = %invocation.request_id,
            patient_id_assigned = ?response.patient_id_assigned,
            tiers = %tier_summary(&response),
            elapsed_ms,
            "Risk prediction succeeded"
        );

        Ok(response)
    }
}

/// Interpret a finished process according to the output contract
pub fn decode_output(output: ProcessOutput) -> Result<ModelOutput, BridgeError> {
    if output.exit_code != Some(0) {
        return Err(BridgeError::Exit {
            code: output.exit_code,
            stderr: output.stderr,
        });
    }

    let document: Value = match serde_json::from_str(output.stdout.trim()) {
        Ok(document) => document,
        Err(e) => {
            return Err(BridgeError::Parse {
                message: e.to_string(),
                raw_output: output.stdout,
            })
        }
    };

    let raw: RawModelOutput = match serde_json::from_value(document) {
        Ok(raw) => raw,
        Err(e) => {
            return Err(BridgeError::Parse {
                message: format!("unexpected document shape: {}", e),
                raw_output: output.stdout,
            })
        }
    };

    ModelOutput::from_raw(raw).map_err(|violation| BridgeError::Parse {
        message: format!("contract violation: {}", violation),
        raw_output: output.stdout,
    })
}

fn tier_summary(response: &AssessmentResponse) -> String {
    response
        .predictions
        .iter()
        .map(|(window, report)| format!("{}={}", window, report.risk_tier))
        .collect::<Vec<_>>()
        .join(",")
}
