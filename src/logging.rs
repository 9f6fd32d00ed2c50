//! Logging setup.
//!
//! Installs a tracing-subscriber with either human-readable or JSON output.
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system.
pub fn setup_logging(config: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(fmt::layer().json().with_thread_ids(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_thread_ids(true))
            .try_init()?;
    }

    info!("Logging initialized with level: {}", log_level);
    Ok(())
}
