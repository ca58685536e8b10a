use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use teloxide::{
    dispatching::Dispatcher,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{BotCommandScope, ChatId, Message, ParseMode, Recipient},
    update_listeners,
    utils::command::BotCommands,
};
use tokio::time::Instant;

use crate::{
    config::AppConfig, infrastructure::shutdown::ShutdownListener, output::format::escape_html,
};

use super::{
    types::{AdminCommand, AppState, BotResult, GeneralCommand},
    utils::{
        admin_command_list, format_job_rows, format_statistics, format_status, local_day_start,
        parse_job_limit, split_message, to_domain_message, user_to_i64, MAX_JOB_LIST,
    },
};

const MESSAGE_LIMIT: usize = 4_000;

pub struct TelegramService {
    bot: Bot,
    state: Arc<AppState>,
}

impl TelegramService {
    pub fn new(bot: Bot, state: Arc<AppState>) -> Self {
        Self { bot, state }
    }

    pub async fn run(&self, mut shutdown: ShutdownListener) -> Result<()> {
        self.sync_commands().await?;
        let me = self.bot.get_me().await?;
        if let Some(expected_username) = &self.state.config.bot_username {
            if me.username.as_deref() != Some(expected_username.as_str()) {
                tracing::warn!(
                    target: "telegram",
                    expected = expected_username.as_str(),
                    actual = ?me.username,
                    "BOT_USERNAME does not match the bot account"
                );
            }
        }
        if self.state.config.source_chat_ids.is_empty() {
            tracing::warn!(
                target: "telegram",
                "SOURCE_CHAT_IDS is empty; no posts will be monitored"
            );
        }
        tracing::info!(
            target: "telegram",
            bot_id = me.id.0,
            username = ?me.username,
            sources = self.state.config.source_chat_ids.len(),
            "connected to Telegram"
        );

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .branch(
                        dptree::entry()
                            .filter_command::<GeneralCommand>()
                            .endpoint(Self::on_command),
                    )
                    .branch(
                        dptree::entry()
                            .filter_command::<AdminCommand>()
                            .endpoint(Self::on_admin_command),
                    )
                    .branch(dptree::endpoint(Self::on_source_post)),
            )
            .branch(Update::filter_channel_post().endpoint(Self::on_source_post));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.state.clone()])
            .default_handler(|update| async move {
                tracing::debug!(target: "telegram", ?update, "unhandled update");
            })
            .build();

        let listener = update_listeners::polling_default(self.bot.clone()).await;
        let error_handler = LoggingErrorHandler::with_custom_text("update listener error");

        let shutdown_token = dispatcher.shutdown_token();
        let mut dispatcher_future =
            Box::pin(dispatcher.dispatch_with_listener(listener, error_handler));
        let mut dispatcher_finished = false;

        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!(target: "telegram", "dispatcher shutdown requested");
                if let Ok(wait) = shutdown_token.shutdown() {
                    wait.await;
                }
            }
            _ = &mut dispatcher_future => {
                dispatcher_finished = true;
                tracing::info!(target: "telegram", "dispatcher finished");
            }
        }

        if !dispatcher_finished {
            dispatcher_future.await;
        }

        Ok(())
    }

    async fn on_source_post(msg: Message, state: Arc<AppState>) -> BotResult<()> {
        if !state.is_source_chat(msg.chat.id.0) {
            return Ok(());
        }
        let Some(message) = to_domain_message(&msg) else {
            tracing::debug!(
                target: "telegram",
                chat_id = msg.chat.id.0,
                message_id = msg.id.0,
                "post without text skipped"
            );
            return Ok(());
        };
        tracing::debug!(
            target: "telegram",
            chat_id = message.channel_id,
            message_id = message.message_id,
            "post queued"
        );
        state.queue.push(Arc::new(message));
        Ok(())
    }

    async fn on_command(
        bot: Bot,
        msg: Message,
        cmd: GeneralCommand,
        state: Arc<AppState>,
    ) -> BotResult<()> {
        match cmd {
            GeneralCommand::Start => {
                let monitored = state.is_source_chat(msg.chat.id.0);
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "Hi! I watch job channels and forward matching posts.\n\
                         Monitored chats: {}\n\
                         This chat: {}",
                        state.config.source_chat_ids.len(),
                        if monitored { "monitored" } else { "not monitored" }
                    ),
                )
                .await?
            }
            GeneralCommand::Help => {
                let mut help = GeneralCommand::descriptions().to_string();
                if Self::sender_is_admin(&msg, &state) {
                    help.push_str("\n\n");
                    help.push_str(&AdminCommand::descriptions().to_string());
                }
                bot.send_message(msg.chat.id, help).await?
            }
            GeneralCommand::Status => {
                let uptime = state.started_at.elapsed().as_secs();
                bot.send_message(
                    msg.chat.id,
                    format_status(
                        state.queue.snapshot(),
                        state.counters.snapshot(),
                        state.config.processing.mode.label(),
                        uptime,
                    ),
                )
                .await?
            }
            GeneralCommand::Chatid => {
                bot.send_message(msg.chat.id, format!("Current chat id: {}", msg.chat.id))
                    .await?
            }
            GeneralCommand::Ping => {
                let start = Instant::now();
                let sent = bot.send_message(msg.chat.id, "Measuring...").await?;
                let latency_secs = start.elapsed().as_secs_f64();
                bot.edit_message_text(
                    msg.chat.id,
                    sent.id,
                    format!("Pong! Round trip: {:.3}s", latency_secs),
                )
                .await?
            }
        };
        Ok(())
    }

    async fn on_admin_command(
        bot: Bot,
        msg: Message,
        cmd: AdminCommand,
        state: Arc<AppState>,
    ) -> BotResult<()> {
        if !Self::sender_is_admin(&msg, &state) {
            bot.send_message(msg.chat.id, "This command is for the admin only.")
                .await?;
            return Ok(());
        }

        let tz = state.config.timezone;
        let reply = match cmd {
            AdminCommand::Jobs(arg) => match parse_job_limit(&arg) {
                Some(limit) => match state.repository.recent(limit, false).await {
                    Ok(rows) => format_job_rows("Recent jobs", &rows, tz),
                    Err(err) => Self::storage_error("recent jobs", err),
                },
                None => "Usage: /jobs [count], e.g. /jobs 10".to_string(),
            },
            AdminCommand::Favorites => match state.repository.recent(MAX_JOB_LIST, true).await {
                Ok(rows) => format_job_rows("Favorite jobs", &rows, tz),
                Err(err) => Self::storage_error("favorites", err),
            },
            AdminCommand::Favorite(arg) => match arg.trim().trim_start_matches('#').parse::<i64>() {
                Ok(id) => match state.repository.toggle_favorite(id).await {
                    Ok(Some(true)) => format!("Job #{id} added to favorites."),
                    Ok(Some(false)) => format!("Job #{id} removed from favorites."),
                    Ok(None) => format!("No job with id #{id}."),
                    Err(err) => Self::storage_error("favorite toggle", err),
                },
                Err(_) => "Usage: /favorite &lt;id&gt;, e.g. /favorite 42".to_string(),
            },
            AdminCommand::Stats => {
                match state
                    .repository
                    .statistics(local_day_start(Utc::now(), tz))
                    .await
                {
                    Ok(stats) => format_statistics(&stats),
                    Err(err) => Self::storage_error("statistics", err),
                }
            }
            AdminCommand::Filters => Self::filters_text(&state),
            AdminCommand::SyncCommands => {
                Self::sync_commands_for(&bot, &state.config).await?;
                "Bot commands synchronized.".to_string()
            }
        };

        for chunk in split_message(&reply, MESSAGE_LIMIT) {
            bot.send_message(msg.chat.id, chunk)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Ok(())
    }

    fn sender_is_admin(msg: &Message, state: &AppState) -> bool {
        msg.from
            .as_ref()
            .is_some_and(|user| state.is_admin_user(user_to_i64(user)))
    }

    fn storage_error(action: &str, err: anyhow::Error) -> String {
        tracing::error!(target: "db", error = %err, action, "admin query failed");
        format!("Failed to load {action}; see logs.")
    }

    fn filters_text(state: &AppState) -> String {
        let config = &state.config;
        let window = match state.pipeline.max_age() {
            Some(age) => format!("{}h", age.num_hours()),
            None => "off".to_string(),
        };
        let bounds = state.pipeline.bounds();
        let bound = |value: Option<rust_decimal::Decimal>| {
            value.map_or_else(|| "-".to_string(), |amount| amount.to_string())
        };
        let outputs = config
            .output
            .methods
            .iter()
            .map(|method| method.label())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "<b>Active filters</b>\n<pre>{}</pre>\n\
             date window: {window}\n\
             yearly salary: {} .. {}\n\
             outputs: {}\n\
             mode: {}\n\
             monitored chats: {}",
            escape_html(&state.pipeline.config().summary()),
            bound(bounds.min),
            bound(bounds.max),
            if outputs.is_empty() { "-".to_string() } else { outputs },
            config.processing.mode.label(),
            config.source_chat_ids.len(),
        )
    }

    async fn sync_commands(&self) -> BotResult<()> {
        Self::sync_commands_for(&self.bot, &self.state.config).await
    }

    async fn sync_commands_for(bot: &Bot, config: &AppConfig) -> BotResult<()> {
        bot.set_my_commands(GeneralCommand::bot_commands()).await?;
        if let Some(admin_user_id) = config.admin_user_id {
            bot.set_my_commands(admin_command_list())
                .scope(BotCommandScope::Chat {
                    chat_id: Recipient::Id(ChatId(admin_user_id)),
                })
                .await?;
        }
        tracing::info!(target: "telegram", "bot commands synchronized");
        Ok(())
    }
}
