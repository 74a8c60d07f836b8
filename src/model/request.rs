//! Control computation requests and their validation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{FieldViolation, RelayError, ValidationError};

/// Closed range `[min, max]` for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl Bounds {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check whether `value` lies in the range. NaN never does.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bounds for `current_h` and `previous_h`.
pub const H_BOUNDS: Bounds = Bounds::new(0.1, 100.0);
/// Bounds for `beta_0`.
pub const BETA_0_BOUNDS: Bounds = Bounds::new(0.1, 5.0);
/// Bounds for `lambda_factor`.
pub const LAMBDA_FACTOR_BOUNDS: Bounds = Bounds::new(0.1, 3.0);
/// Bounds for `epsilon`.
pub const EPSILON_BOUNDS: Bounds = Bounds::new(1e-12, 1e-6);
/// Bounds for `alpha_param`.
pub const ALPHA_PARAM_BOUNDS: Bounds = Bounds::new(0.1, 10.0);
/// Bounds for `gamma_param`.
pub const GAMMA_PARAM_BOUNDS: Bounds = Bounds::new(0.1, 5.0);

/// Minimum number of `base_output` values.
pub const MIN_OUTPUTS: usize = 1;
/// Maximum number of `base_output` values.
pub const MAX_OUTPUTS: usize = 20;

/// Minimum sweep steps.
pub const MIN_STEPS: u32 = 5;
/// Maximum sweep steps.
pub const MAX_STEPS: u32 = 100;

/// A single control computation request.
///
/// Optional fields that are absent are omitted on serialization, so the
/// outbound payload never carries `null` for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Current input value.
    pub current_h: f64,
    /// Previous input value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_h: Option<f64>,
    /// Base sensitivity parameter.
    #[serde(default = "default_one")]
    pub beta_0: f64,
    /// Scaling factor.
    #[serde(default = "default_one")]
    pub lambda_factor: f64,
    /// Stability constant.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Base output values.
    pub base_output: Vec<f64>,
    /// System identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    /// Labels for the output values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_labels: Option<Vec<String>>,
    /// Primary system coefficient.
    #[serde(default = "default_one")]
    pub alpha_param: f64,
    /// Secondary system coefficient.
    #[serde(default = "default_one")]
    pub gamma_param: f64,
}

fn default_one() -> f64 {
    1.0
}

fn default_epsilon() -> f64 {
    1e-10
}

fn default_steps() -> u32 {
    20
}

impl ControlRequest {
    /// Create a request with every optional field at its default.
    pub fn new(current_h: f64, base_output: Vec<f64>) -> Self {
        Self {
            current_h,
            previous_h: None,
            beta_0: default_one(),
            lambda_factor: default_one(),
            epsilon: default_epsilon(),
            base_output,
            system_id: None,
            output_labels: None,
            alpha_param: default_one(),
            gamma_param: default_one(),
        }
    }

    /// Set the previous input value.
    pub fn with_previous_h(mut self, previous_h: f64) -> Self {
        self.previous_h = Some(previous_h);
        self
    }

    /// Set the system identifier.
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }

    /// Set the output labels.
    pub fn with_output_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Deserialize and fully validate a JSON body.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| ValidationError::single("body", e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Check every field against its declared constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let violations = self.violations("");
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Collect violations, prefixing each field path with `prefix`.
    fn violations(&self, prefix: &str) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        let mut check = |field: &str, value: f64, bounds: Bounds| {
            if !bounds.contains(value) {
                out.push(FieldViolation {
                    field: format!("{prefix}{field}"),
                    constraint: format!(
                        "must be between {} and {} (got {})",
                        bounds.min, bounds.max, value
                    ),
                });
            }
        };

        check("current_h", self.current_h, H_BOUNDS);
        if let Some(previous_h) = self.previous_h {
            check("previous_h", previous_h, H_BOUNDS);
        }
        check("beta_0", self.beta_0, BETA_0_BOUNDS);
        check("lambda_factor", self.lambda_factor, LAMBDA_FACTOR_BOUNDS);
        check("epsilon", self.epsilon, EPSILON_BOUNDS);
        check("alpha_param", self.alpha_param, ALPHA_PARAM_BOUNDS);
        check("gamma_param", self.gamma_param, GAMMA_PARAM_BOUNDS);

        let len = self.base_output.len();
        if !(MIN_OUTPUTS..=MAX_OUTPUTS).contains(&len) {
            out.push(FieldViolation {
                field: format!("{prefix}base_output"),
                constraint: format!(
                    "must contain between {MIN_OUTPUTS} and {MAX_OUTPUTS} values (got {len})"
                ),
            });
        }

        out
    }
}

/// Numeric fields of [`ControlRequest`] that a sweep may vary.
///
/// Each variant maps to a typed setter, so "set field by name" is a closed
/// lookup rather than dynamic attribute access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum ControlParameter {
    /// `current_h`
    #[strum(to_string = "current_h")]
    CurrentH,
    /// `previous_h`
    #[strum(to_string = "previous_h")]
    PreviousH,
    /// `beta_0`
    #[strum(to_string = "beta_0")]
    Beta0,
    /// `lambda_factor`
    #[strum(to_string = "lambda_factor")]
    LambdaFactor,
    /// `epsilon`
    #[strum(to_string = "epsilon")]
    Epsilon,
    /// `alpha_param`
    #[strum(to_string = "alpha_param")]
    AlphaParam,
    /// `gamma_param`
    #[strum(to_string = "gamma_param")]
    GammaParam,
}

impl ControlParameter {
    /// Resolve a field name, failing with `FieldNotFound` for anything else.
    pub fn resolve(name: &str) -> Result<Self, RelayError> {
        Self::from_str(name).map_err(|_| RelayError::FieldNotFound {
            name: name.to_string(),
            expected: Self::names().join(", "),
        })
    }

    /// All sweepable field names.
    pub fn names() -> Vec<String> {
        Self::iter().map(|p| p.to_string()).collect()
    }

    /// Overwrite this field on `request`.
    pub fn apply(self, request: &mut ControlRequest, value: f64) {
        match self {
            Self::CurrentH => request.current_h = value,
            Self::PreviousH => request.previous_h = Some(value),
            Self::Beta0 => request.beta_0 = value,
            Self::LambdaFactor => request.lambda_factor = value,
            Self::Epsilon => request.epsilon = value,
            Self::AlphaParam => request.alpha_param = value,
            Self::GammaParam => request.gamma_param = value,
        }
    }

    /// Read this field from `request`.
    pub fn get(self, request: &ControlRequest) -> Option<f64> {
        match self {
            Self::CurrentH => Some(request.current_h),
            Self::PreviousH => request.previous_h,
            Self::Beta0 => Some(request.beta_0),
            Self::LambdaFactor => Some(request.lambda_factor),
            Self::Epsilon => Some(request.epsilon),
            Self::AlphaParam => Some(request.alpha_param),
            Self::GammaParam => Some(request.gamma_param),
        }
    }
}

/// Parameter sweep request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRequest {
    /// Field of the base request to vary.
    pub parameter_name: String,
    /// First value of the sweep.
    pub start_value: f64,
    /// Last value of the sweep (may be below `start_value`).
    pub end_value: f64,
    /// Number of points, including both ends.
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Request every sweep point is derived from.
    pub base_request: ControlRequest,
}

impl GraphRequest {
    /// Deserialize and fully validate a JSON body.
    pub fn parse(body: &[u8]) -> Result<Self, RelayError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| ValidationError::single("body", e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Validate every field and check that `parameter_name` is sweepable.
    ///
    /// Range violations are reported before an unknown parameter name.
    pub fn validate(&self) -> Result<(), RelayError> {
        let mut violations = Vec::new();

        if !(MIN_STEPS..=MAX_STEPS).contains(&self.steps) {
            violations.push(FieldViolation {
                field: "steps".to_string(),
                constraint: format!(
                    "must be between {MIN_STEPS} and {MAX_STEPS} (got {})",
                    self.steps
                ),
            });
        }

        if !(self.end_value - self.start_value).is_finite() {
            violations.push(FieldViolation {
                field: "end_value".to_string(),
                constraint: "range from start_value must be finite".to_string(),
            });
        }

        violations.extend(self.base_request.violations("base_request."));

        if !violations.is_empty() {
            return Err(ValidationError { violations }.into());
        }

        ControlParameter::resolve(&self.parameter_name).map(|_| ())
    }
}
