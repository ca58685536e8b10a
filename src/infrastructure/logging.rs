use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

const LOG_FILE_PREFIX: &str = "job-radar.log";
/// Library crates that flood `info` with per-request chatter.
const QUIET_CRATES: &[&str] = &["sqlx", "hyper", "reqwest", "tokio_cron_scheduler"];

static INIT: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// `LOG_LEVEL` for our own targets, with noisy dependencies capped at `warn`.
fn default_directives(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    QUIET_CRATES
        .iter()
        .fold(level.to_string(), |acc, krate| format!("{acc},{krate}=warn"))
}

/// Stdout plus a daily rolling `job-radar.log`. `RUST_LOG` overrides `LOG_LEVEL`.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directives(&config.logging.level)))
            .unwrap_or_else(|_| EnvFilter::new(default_directives("info")));

        let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);

        let console_layer = fmt::layer()
            .with_writer(io::stdout)
            .with_target(true)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!(
            target: "lifecycle",
            logs = %paths.logs_dir.display(),
            db = %paths.db_path.display(),
            exports = %paths.exports_dir.display(),
            level = %config.logging.level,
            timezone = %config.timezone,
            "job radar logging ready"
        );
        Ok(())
    })?;
    Ok(())
}
