//! HTTP API: computation, sweep, health, legacy config, frontend and metrics.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
