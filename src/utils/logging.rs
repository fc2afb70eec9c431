//! Logging initialization
//!
//! - Respects RUST_LOG, which always wins over a configured filter
//! - Falls back to the config/CLI filter, then to "info"
//! - Respects NO_COLOR
//! - JSON output behind the `json-logging` feature, forced by MODHOST_LOG_JSON

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::utils::env::{env_bool, env_opt, env_present};

/// Set to a truthy value to log JSON regardless of the config file
pub const LOG_JSON_ENV: &str = "MODHOST_LOG_JSON";

/// Pick the filter: RUST_LOG, then `filter`, then "info"
pub fn build_filter(filter: Option<&str>) -> EnvFilter {
    if env_opt("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter.unwrap_or("info"))
}

/// Initialize human-readable logging to stderr
///
/// Uses `try_init`, so calling it twice (e.g. from tests) is harmless.
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(!env_present("NO_COLOR")),
        )
        .with(build_filter(filter))
        .try_init();
}

/// Initialize logging with JSON output
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(build_filter(filter))
        .try_init();
}

/// Initialize logging from the host configuration
///
/// `override_filter` (from the command line) beats the configured filter.
pub fn init_logging_from_config(config: Option<&LoggingConfig>, override_filter: Option<&str>) {
    let filter = override_filter.or_else(|| config.and_then(|c| c.filter.as_deref()));

    let json = env_bool(LOG_JSON_ENV) || config.map(|c| c.json_format).unwrap_or(false);
    if json {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
