//! Offline estimator producing an approximate result without network access.
//!
//! ```text
//! delta_h            = current_h - previous_h        (0 when previous_h is absent)
//! processing_factor  = 0.4 * (1 + 0.1 * sin(current_h))
//! control_parameter  = beta_0 * (1 + 0.1 * delta_h)
//! output_gain        = alpha_param * lambda_factor * (1 + processing_factor)
//! processed_output_i = base_output_i * output_gain
//! ```
//!
//! Every quantity must be finite; an overflow is an error rather than a
//! `null` in the encoded result.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::EstimateError;
use crate::model::{ComputationResult, ControlRequest};

/// Estimated result for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Echo of `current_h`.
    pub h_value: f64,
    /// Change from the previous input.
    pub delta_h: f64,
    /// Sinusoidal processing factor.
    pub processing_factor: f64,
    /// Adjusted sensitivity.
    pub control_parameter: f64,
    /// Gain applied to every output.
    pub output_gain: f64,
    /// `base_output` scaled by `output_gain`, same order.
    pub processed_output: Vec<f64>,
    /// Label to value pairs, present only when label and output counts agree.
    pub output_mapping: Option<BTreeMap<String, f64>>,
    /// Echo of `system_id`.
    pub system_id: Option<String>,
    /// Time of computation.
    pub timestamp: OffsetDateTime,
}

/// Compute the estimate for `request`.
///
/// Fails when any computed value is infinite or NaN.
pub fn estimate(request: &ControlRequest) -> Result<Estimate, EstimateError> {
    let h_value = request.current_h;
    let delta_h = request
        .previous_h
        .map(|previous| request.current_h - previous)
        .unwrap_or(0.0);

    let processing_factor = 0.4 * (1.0 + 0.1 * h_value.sin());
    let control_parameter = request.beta_0 * (1.0 + delta_h * 0.1);
    let output_gain = request.alpha_param * request.lambda_factor * (1.0 + processing_factor);

    let processed_output: Vec<f64> = request
        .base_output
        .iter()
        .map(|value| value * output_gain)
        .collect();

    for (field, value) in [
        ("h_value", h_value),
        ("delta_h", delta_h),
        ("processing_factor", processing_factor),
        ("control_parameter", control_parameter),
        ("output_gain", output_gain),
    ] {
        ensure_finite(|| field.to_string(), value)?;
    }
    for (i, value) in processed_output.iter().enumerate() {
        ensure_finite(|| format!("processed_output[{i}]"), *value)?;
    }

    // Duplicate labels keep the last value.
    let output_mapping = request
        .output_labels
        .as_ref()
        .filter(|labels| labels.len() == processed_output.len())
        .map(|labels| {
            labels
                .iter()
                .cloned()
                .zip(processed_output.iter().copied())
                .collect()
        });

    Ok(Estimate {
        h_value,
        delta_h,
        processing_factor,
        control_parameter,
        output_gain,
        processed_output,
        output_mapping,
        system_id: request.system_id.clone(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

fn ensure_finite(field: impl FnOnce() -> String, value: f64) -> Result<(), EstimateError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EstimateError {
            field: field(),
            value,
        })
    }
}

impl Estimate {
    /// Convert into the open result shape used for relayed responses.
    pub fn into_result(self) -> ComputationResult {
        let mut result = ComputationResult::new();
        result.insert("h_value".to_string(), json!(self.h_value));
        result.insert("delta_h".to_string(), json!(self.delta_h));
        result.insert("processing_factor".to_string(), json!(self.processing_factor));
        result.insert("control_parameter".to_string(), json!(self.control_parameter));
        result.insert("output_gain".to_string(), json!(self.output_gain));
        result.insert("processed_output".to_string(), json!(self.processed_output));
        result.insert(
            "timestamp".to_string(),
            Value::String(format_timestamp(self.timestamp)),
        );

        if let Some(system_id) = self.system_id {
            result.insert("system_id".to_string(), Value::String(system_id));
        }
        if let Some(mapping) = self.output_mapping {
            result.insert("output_mapping".to_string(), json!(mapping));
        }

        result
    }
}

/// Format an instant as RFC 3339, falling back to the unix timestamp.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
