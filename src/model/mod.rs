//! Request, credential and result types.
//!
//! This module handles:
//! - Control and sweep request parsing and validation
//! - Per-call credential extraction
//! - Result and sweep response shapes

pub mod credentials;
pub mod request;
pub mod result;

pub use credentials::CredentialContext;
pub use request::{ControlParameter, ControlRequest, GraphRequest};
pub use result::{ComputationResult, SweepResponse};
