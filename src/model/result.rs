//! Computation results and sweep responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An upstream (or estimated) result: an open JSON object relayed as-is.
pub type ComputationResult = Map<String, Value>;

/// Chart-ready output of a parameter sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResponse {
    /// Swept values, evenly spaced from start to end.
    pub parameter_values: Vec<f64>,
    /// One result per value, index-aligned with `parameter_values`.
    pub results: Vec<ComputationResult>,
    /// Name of the swept field.
    pub parameter_name: String,
}

impl SweepResponse {
    /// Number of sweep points.
    pub fn len(&self) -> usize {
        self.parameter_values.len()
    }

    /// Whether the sweep has no points.
    pub fn is_empty(&self) -> bool {
        self.parameter_values.is_empty()
    }

    /// Extract a numeric field from every result as a chart series.
    ///
    /// Results missing the field (or holding a non-number) yield `None`.
    pub fn series(&self, field: &str) -> Vec<Option<f64>> {
        self.results
            .iter()
            .map(|r| r.get(field).and_then(Value::as_f64))
            .collect()
    }
}
