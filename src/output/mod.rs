//! Where delivered jobs go: a personal chat, export files, the jobs table.

pub mod database;
pub mod file;
pub mod format;
pub mod telegram;

use std::sync::Arc;

use anyhow::Result;
use teloxide::Bot;

use crate::{
    config::{AppConfig, OutputMethod},
    db::JobRepository,
    domain::FilteredJob,
    infrastructure::directories::ResolvedPaths,
};

pub use database::DatabaseSink;
pub use file::FileSink;
pub use telegram::TelegramSink;

pub enum OutputSink {
    Telegram(TelegramSink),
    File(FileSink),
    Database(DatabaseSink),
}

impl OutputSink {
    pub fn method(&self) -> OutputMethod {
        match self {
            OutputSink::Telegram(_) => OutputMethod::Telegram,
            OutputSink::File(_) => OutputMethod::File,
            OutputSink::Database(_) => OutputMethod::Database,
        }
    }

    pub async fn deliver(&self, jobs: &[FilteredJob]) -> Result<()> {
        match self {
            OutputSink::Telegram(sink) => sink.deliver(jobs).await,
            OutputSink::File(sink) => sink.deliver(jobs).await,
            OutputSink::Database(sink) => sink.deliver(jobs).await,
        }
    }
}

/// One sink per configured output method. Telegram is skipped without a delivery chat.
pub fn build_sinks(
    config: &AppConfig,
    bot: &Bot,
    paths: &ResolvedPaths,
    repository: &Arc<JobRepository>,
) -> Vec<OutputSink> {
    let mut sinks = Vec::with_capacity(config.output.methods.len());
    for method in &config.output.methods {
        match method {
            OutputMethod::Telegram => match config.delivery_chat_id {
                Some(chat_id) => sinks.push(OutputSink::Telegram(TelegramSink::new(
                    bot.clone(),
                    chat_id,
                    config.output.forward_original,
                    config.output.delivery_delay,
                    config.timezone,
                ))),
                None => tracing::warn!(
                    target: "output",
                    "telegram output enabled but neither DELIVERY_CHAT_ID nor ADMIN_USER_ID is set"
                ),
            },
            OutputMethod::File => sinks.push(OutputSink::File(FileSink::new(
                paths.exports_dir.clone(),
                config.timezone,
            ))),
            OutputMethod::Database => {
                sinks.push(OutputSink::Database(DatabaseSink::new(repository.clone())))
            }
        }
    }
    sinks
}
