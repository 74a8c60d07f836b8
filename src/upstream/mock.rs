//! Mock evaluator for unit and integration testing.
//!
//! Counts calls and records every request it sees, so tests can assert that
//! nothing was sent (or exactly what was sent) without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::error::{RelayError, UpstreamError};
use crate::estimator::estimate;
use crate::model::{ComputationResult, ControlRequest};

use super::Evaluator;

/// Configuration for mock evaluator behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail the call with this zero-based index.
    pub fail_at: Option<usize>,
    /// Fail every call.
    pub fail_all: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock evaluator for testing.
#[derive(Debug, Clone, Default)]
pub struct MockEvaluator {
    /// Mock configuration.
    config: MockConfig,
    /// Number of calls made so far.
    calls: Arc<AtomicUsize>,
    /// Requests in call order.
    requests: Arc<Mutex<Vec<ControlRequest>>>,
}

impl MockEvaluator {
    /// Create a mock that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create a mock whose call at `index` fails.
    pub fn failing_at(index: usize) -> Self {
        Self::with_config(MockConfig {
            fail_at: Some(index),
            ..MockConfig::default()
        })
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<ControlRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, request: &ControlRequest) -> usize {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        index
    }
}

impl Evaluator for MockEvaluator {
    async fn evaluate(&self, request: &ControlRequest) -> Result<ComputationResult, RelayError> {
        let index = self.record(request);

        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.fail_all || self.config.fail_at == Some(index) {
            return Err(UpstreamError::Status {
                status: 503,
                body: format!("mock failure on call {index}"),
            }
            .into());
        }

        let mut result = estimate(request)?.into_result();
        result.insert("call_index".to_string(), json!(index));
        Ok(result)
    }
}
