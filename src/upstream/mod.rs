//! Result-producing backends.
//!
//! This module handles:
//! - The [`Evaluator`] strategy shared by every backend
//! - Relaying to the upstream computation API
//! - The offline estimator backend
//! - Mock evaluator for testing

use std::future::Future;

use crate::error::RelayError;
use crate::estimator::estimate;
use crate::model::{ComputationResult, ControlRequest};

pub mod client;
pub mod mock;

pub use client::{RelayEvaluator, UpstreamClient};
pub use mock::{MockConfig, MockEvaluator};

/// Produces one computation result per request.
pub trait Evaluator {
    /// Evaluate a single, already validated request.
    fn evaluate(
        &self,
        request: &ControlRequest,
    ) -> impl Future<Output = Result<ComputationResult, RelayError>> + Send;
}

/// Evaluator backed by the offline estimator. Fails only on overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEstimator;

impl Evaluator for OfflineEstimator {
    async fn evaluate(&self, request: &ControlRequest) -> Result<ComputationResult, RelayError> {
        Ok(estimate(request)?.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_estimator_matches_estimate() {
        let request = ControlRequest::new(5.0, vec![10.0]).with_previous_h(4.0);
        let result = OfflineEstimator.evaluate(&request).await.unwrap();
        let expected = estimate(&request).unwrap();

        assert_eq!(result["output_gain"].as_f64(), Some(expected.output_gain));
        assert_eq!(result["delta_h"].as_f64(), Some(1.0));
    }

    #[tokio::test]
    async fn offline_estimator_surfaces_overflow() {
        let mut request = ControlRequest::new(5.0, vec![10.0]);
        request.alpha_param = 1e308;

        let err = OfflineEstimator.evaluate(&request).await.unwrap_err();
        assert!(matches!(err, RelayError::Estimate(ref e) if e.field == "processed_output[0]"));
    }
}
