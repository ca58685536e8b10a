use std::{future::Future, time::Duration};

use anyhow::{bail, Result};
use chrono_tz::Tz;
use teloxide::{
    prelude::*,
    types::{MessageId, ParseMode},
    RequestError,
};
use tokio::time::sleep;

use super::format::{format_card, format_summary};
use crate::domain::FilteredJob;

/// Delivers matches into a personal chat.
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
    forward_original: bool,
    delay: Duration,
    timezone: Tz,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: i64, forward_original: bool, delay: Duration, timezone: Tz) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
            forward_original,
            delay,
            timezone,
        }
    }

    pub async fn deliver(&self, jobs: &[FilteredJob]) -> Result<()> {
        let mut failed = 0usize;
        for (index, job) in jobs.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if let Err(err) = self.deliver_one(job).await {
                failed += 1;
                tracing::error!(
                    target: "output",
                    error = %err,
                    channel_id = job.message.channel_id,
                    message_id = job.message.message_id,
                    "telegram delivery failed"
                );
            }
        }
        if failed > 0 {
            bail!("{failed} of {} telegram deliveries failed", jobs.len());
        }
        Ok(())
    }

    async fn deliver_one(&self, job: &FilteredJob) -> Result<(), RequestError> {
        if self.forward_original {
            let forwarded = with_retry(|| {
                self.bot
                    .forward_message(
                        self.chat_id,
                        ChatId(job.message.channel_id),
                        MessageId(job.message.message_id),
                    )
                    .send()
            })
            .await;
            match forwarded {
                Ok(_) => {
                    self.send_html(format_summary(job)).await?;
                    tracing::info!(
                        target: "output",
                        message_id = job.message.message_id,
                        "job forwarded"
                    );
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        target: "output",
                        error = %err,
                        channel_id = job.message.channel_id,
                        "forward failed; sending full card instead"
                    );
                }
            }
        }

        self.send_html(format_card(job, self.timezone)).await?;
        tracing::info!(
            target: "output",
            message_id = job.message.message_id,
            "job card sent"
        );
        Ok(())
    }

    async fn send_html(&self, text: String) -> Result<(), RequestError> {
        with_retry(|| {
            self.bot
                .send_message(self.chat_id, text.clone())
                .parse_mode(ParseMode::Html)
                .send()
        })
        .await
        .map(|_| ())
    }
}

/// Runs `request`, and once more after the server-requested pause on flood control.
async fn with_retry<T, F, Fut>(mut request: F) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    match request().await {
        Err(RequestError::RetryAfter(wait)) => {
            tracing::warn!(
                target: "output",
                wait_secs = wait.seconds(),
                "rate limited by telegram; retrying once"
            );
            sleep(wait.duration()).await;
            request().await
        }
        other => other,
    }
}
