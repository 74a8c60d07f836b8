//! Parameter sweep module.
//!
//! This module handles:
//! - Evenly spaced value generation
//! - Building one independent request per value
//! - Sequential evaluation with an explicit failure policy

pub mod orchestrator;
pub mod plan;

pub use orchestrator::{sweep, FailurePolicy};
pub use plan::{parameter_values, plan, SweepPoint};
