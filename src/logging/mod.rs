// Logging module for structured logging using the tracing crate

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Error;

/// Build the event filter: `RUST_LOG` wins over the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, Error> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Logging(format!("invalid level '{}': {}", config.level, e))),
    }
}

/// Initialize the tracing subscriber for structured logging
///
/// - JSON formatting for log aggregation, or pretty output for terminals
/// - Filtering from `RUST_LOG`, falling back to `logging.level`
/// - Output to stderr so stdout stays reserved for lookup results
///
/// # Errors
///
/// Returns an error if the level directive is invalid or a global
/// subscriber is already installed.
///
/// # Examples
///
/// ```
/// use streamscout::config::LoggingConfig;
/// use streamscout::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Error> {
    let filter = build_filter(config)?;
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}
