//! Tracing setup
//!
//! The level comes from the `LoggingConfig` handed in by the caller; `RUST_LOG`
//! still takes precedence when set.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

impl LoggingConfig {
    /// Default filter directive for this configuration
    pub fn default_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "warn"
        }
    }

    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Install the global subscriber; a second call is a no-op
pub fn init_tracing(config: &LoggingConfig) {
    let _ = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
