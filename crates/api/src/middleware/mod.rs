//! HTTP middleware components.

pub mod auth;
pub mod logging;
pub mod metrics;

pub use auth::require_api_key;
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
