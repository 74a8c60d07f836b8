//! Sweep point generation.

use crate::error::{RelayError, ValidationError};
use crate::model::{ControlParameter, ControlRequest, GraphRequest};

/// One point of a sweep: the substituted value and the request built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    /// Position in the sweep.
    pub index: usize,
    /// Value written into the swept field.
    pub value: f64,
    /// Independent copy of the base request carrying `value`.
    pub request: ControlRequest,
}

/// Evenly spaced values from `start` to `end`, both included.
///
/// Requires at least two steps. The last value is exactly `end`.
pub fn parameter_values(start: f64, end: f64, steps: u32) -> Result<Vec<f64>, ValidationError> {
    if steps < 2 {
        return Err(ValidationError::single(
            "steps",
            format!("must be at least 2 (got {steps})"),
        ));
    }

    let step_size = (end - start) / f64::from(steps - 1);
    let mut values: Vec<f64> = (0..steps)
        .map(|i| start + f64::from(i) * step_size)
        .collect();

    if let Some(last) = values.last_mut() {
        *last = end;
    }

    Ok(values)
}

/// Build every sweep point for `graph`.
///
/// Resolves the swept field first, so an unknown name fails before anything
/// is evaluated.
pub fn plan(graph: &GraphRequest) -> Result<(ControlParameter, Vec<SweepPoint>), RelayError> {
    let parameter = ControlParameter::resolve(&graph.parameter_name)?;
    let values = parameter_values(graph.start_value, graph.end_value, graph.steps)?;

    let points = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let mut request = graph.base_request.clone();
            parameter.apply(&mut request, value);
            SweepPoint {
                index,
                value,
                request,
            }
        })
        .collect();

    Ok((parameter, points))
}
