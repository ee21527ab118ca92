//! API layer
//!
//! HTTP handlers for:
//! - HTML pages (home, repositories)
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;

pub use metrics::metrics_router;
pub use pages::pages_router;
