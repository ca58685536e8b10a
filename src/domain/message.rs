use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{salary::SalaryMention, verdict::FilterVerdict};

/// A post captured from one of the monitored chats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub channel_id: i64,
    pub channel_title: Option<String>,
    pub message_id: i32,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Link to the post for private (`-100…`) chats.
    pub fn permalink(&self) -> Option<String> {
        let raw = self.channel_id.to_string();
        raw.strip_prefix("-100")
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://t.me/c/{id}/{}", self.message_id))
    }
}

/// Outcome of running one message through the filter and the salary extractor.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredJob {
    pub message: Arc<Message>,
    pub verdict: FilterVerdict,
    pub salaries: Vec<SalaryMention>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(channel_id: i64) -> Message {
        Message {
            channel_id,
            channel_title: None,
            message_id: 42,
            text: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn permalink_only_for_supergroup_ids() {
        assert_eq!(
            message(-1001234567890).permalink().as_deref(),
            Some("https://t.me/c/1234567890/42")
        );
        assert_eq!(message(-42).permalink(), None);
        assert_eq!(message(777).permalink(), None);
    }
}
