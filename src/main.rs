use clap::Parser;
use tracing::{info, warn};

use memory_session::config::{AppConfig, CliArgs};
use memory_session::logging::setup_logging;
use memory_session::server;
use memory_session::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let loaded = AppConfig::load(&args.config)?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_cli(&args);

    setup_logging(&config.logging).map_err(|err| anyhow::anyhow!("{}", err))?;
    if !found {
        warn!(path = %args.config.display(), "config file not found, using defaults");
    }
    info!(config = %args.config.display(), "starting memory server");

    let state = AppState::new(config);
    server::run(state).await?;
    Ok(())
}
