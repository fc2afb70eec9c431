//! Utility modules for logging, environment access and graceful degradation

pub mod env;
pub mod error;
pub mod logging;
pub mod signal;
pub mod time;

pub use env::{env_bool, env_opt};
pub use logging::LOG_JSON_ENV;
pub use error::log_error;
pub use logging::{init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use signal::{create_shutdown_receiver, wait_for_shutdown_signal};
pub use time::current_timestamp;
