//! HTTP relay for adaptive control computations.
//!
//! This library provides:
//! - Request models with field-level validation
//! - An upstream client that relays requests with per-call credentials
//! - A deterministic offline estimator
//! - Parameter sweeps over any numeric request field
//! - The axum service exposing all of the above

pub mod api;
pub mod config;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod model;
pub mod sweep;
pub mod upstream;
pub mod utils;

pub use config::Config;
pub use error::RelayError;
