//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level
//! - Initializing twice is a no-op, so tests and embedders can both call it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(config: &ObservabilityConfig) -> String {
    if config.log_level.contains('=') {
        config.log_level.clone()
    } else {
        format!("krauter={level},tower_http={level}", level = config.log_level)
    }
}

/// Install the global subscriber (env filter + fmt layer).
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let mut config = ObservabilityConfig::default();
        assert_eq!(default_filter(&config), "krauter=info,tower_http=info");

        config.log_level = "krauter=trace,sqlx=warn".into();
        assert_eq!(default_filter(&config), "krauter=trace,sqlx=warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = ObservabilityConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
