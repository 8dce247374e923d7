//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Whatever metrics recorder the application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging with request IDs as fields
//! - The library never installs a metrics exporter
//! - Metrics recording can be switched off from configuration

pub mod logging;
pub mod metrics;

use crate::config::ObservabilityConfig;

/// Apply observability settings: logging subscriber and metrics switch.
pub fn init(config: &ObservabilityConfig) {
    logging::init_tracing(config);
    metrics::set_enabled(config.metrics_enabled);
}
