//! Sequential sweep execution.

use strum::{Display, EnumString};
use tracing::{info, instrument, warn};

use super::plan::plan;
use crate::error::RelayError;
use crate::estimator::estimate;
use crate::metrics;
use crate::model::{GraphRequest, SweepResponse};
use crate::upstream::Evaluator;

/// What a sweep does when one point fails to evaluate.
///
/// Chosen once per process; a single sweep never mixes both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Default)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum FailurePolicy {
    /// Abort on the first failure and surface it.
    #[default]
    FailFast,
    /// Answer the failed point with the offline estimator and continue.
    Fallback,
}

/// Evaluate every point of `graph` in order.
///
/// The swept field is resolved before the first evaluation, so an unknown
/// name never reaches the evaluator. `results[i]` always belongs to
/// `parameter_values[i]`.
#[instrument(
    skip(graph, evaluator),
    fields(parameter = %graph.parameter_name, steps = graph.steps)
)]
pub async fn sweep<E: Evaluator>(
    graph: &GraphRequest,
    evaluator: &E,
    policy: FailurePolicy,
) -> Result<SweepResponse, RelayError> {
    let (parameter, points) = plan(graph)?;
    let timer = metrics::timer_sweep();

    let mut parameter_values = Vec::with_capacity(points.len());
    let mut results = Vec::with_capacity(points.len());

    for point in points {
        metrics::inc_sweep_steps();

        let result = match evaluator.evaluate(&point.request).await {
            Ok(result) => result,
            Err(e) => match policy {
                FailurePolicy::FailFast => {
                    metrics::inc_sweeps_aborted();
                    warn!(
                        step = point.index,
                        value = point.value,
                        error = %e,
                        "Sweep aborted on evaluation failure"
                    );
                    return Err(e);
                }
                FailurePolicy::Fallback => {
                    metrics::inc_sweep_fallbacks();
                    warn!(
                        step = point.index,
                        value = point.value,
                        error = %e,
                        "Evaluation failed, using offline estimate for this step"
                    );
                    match estimate(&point.request) {
                        Ok(fallback) => fallback.into_result(),
                        Err(overflow) => {
                            metrics::inc_sweeps_aborted();
                            warn!(
                                step = point.index,
                                value = point.value,
                                error = %overflow,
                                "Sweep aborted, offline estimate overflowed"
                            );
                            return Err(overflow.into());
                        }
                    }
                }
            },
        };

        parameter_values.push(point.value);
        results.push(result);
    }

    metrics::inc_sweeps_completed();
    info!(
        points = results.len(),
        elapsed_ms = timer.elapsed_ms(),
        "Sweep completed"
    );

    Ok(SweepResponse {
        parameter_values,
        results,
        parameter_name: parameter.to_string(),
    })
}
