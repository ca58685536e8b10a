use std::{sync::Arc, time::Instant};

use teloxide::utils::command::BotCommands;

use crate::{
    config::AppConfig,
    db::JobRepository,
    domain::{Message, ProcessingCounters},
    pipeline::JobPipeline,
    tasks::queue::MessageQueue,
};

pub type BotResult<T> = Result<T, teloxide::RequestError>;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Arc<JobRepository>,
    pub queue: Arc<MessageQueue<Arc<Message>>>,
    pub pipeline: Arc<JobPipeline>,
    pub counters: Arc<ProcessingCounters>,
    pub started_at: Instant,
}

impl AppState {
    pub fn is_source_chat(&self, chat_id: i64) -> bool {
        self.config.is_source_chat(chat_id)
    }

    pub fn is_admin_user(&self, user_id: i64) -> bool {
        self.config.is_admin_user(user_id)
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum GeneralCommand {
    #[command(description = "introduction")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "queue and processing status")]
    Status,
    #[command(description = "show the current chat id")]
    Chatid,
    #[command(description = "measure response time")]
    Ping,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Admin commands:")]
pub enum AdminCommand {
    #[command(description = "recent jobs, e.g. /jobs 10")]
    Jobs(String),
    #[command(description = "favorite jobs")]
    Favorites,
    #[command(description = "toggle a job's favorite flag, e.g. /favorite 42")]
    Favorite(String),
    #[command(description = "database statistics")]
    Stats,
    #[command(description = "active filter settings")]
    Filters,
    #[command(description = "re-register the bot command list")]
    SyncCommands,
}
