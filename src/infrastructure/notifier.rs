use teloxide::{prelude::*, types::ParseMode};

use crate::{config::AppConfig, output::format::escape_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Started,
    Stopped,
}

/// Admin-facing summary of what the radar watches and where jobs go.
pub fn lifecycle_notice(config: &AppConfig, event: Lifecycle) -> String {
    let headline = match event {
        Lifecycle::Started => "Job radar started",
        Lifecycle::Stopped => "Job radar stopped",
    };
    let outputs = config
        .output
        .methods
        .iter()
        .map(|method| method.label())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "<b>{headline}</b>\nmode: {}\nmonitored chats: {}\noutputs: {}\n<pre>{}</pre>",
        config.processing.mode.label(),
        config.source_chat_ids.len(),
        if outputs.is_empty() { "-" } else { outputs.as_str() },
        escape_html(&config.filter.rules.summary()),
    )
}

/// Sends an HTML message to the admin chat. Failures are logged, never returned.
pub async fn notify_admin(bot: &Bot, config: &AppConfig, text: &str) {
    let Some(admin_user_id) = config.admin_user_id.filter(|id| *id != 0) else {
        tracing::debug!(target: "telegram", "ADMIN_USER_ID unset; admin notice skipped");
        return;
    };
    if let Err(err) = bot
        .send_message(ChatId(admin_user_id), text)
        .parse_mode(ParseMode::Html)
        .await
    {
        tracing::warn!(
            target: "telegram",
            error = %err,
            admin_user_id,
            "job radar notice not delivered to admin"
        );
    }
}
