mod app;
mod config;
mod db;
mod domain;
mod filter;
mod infrastructure;
mod output;
mod pipeline;
mod salary;
mod tasks;
mod telegram;

use anyhow::{Context, Result};
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = dotenvy::dotenv().ok();

    let config = config::load_config().context("invalid job radar configuration")?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;
    if let Some(path) = env_file {
        tracing::info!(target: "lifecycle", env_file = %path.display(), "environment file loaded");
    }

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::JobRadarApp::initialize(config, paths, shutdown.clone()).await?;
    app.run().await
}
