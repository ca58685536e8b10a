use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use teloxide::{
    types::{BotCommand, User},
    utils::command::BotCommands,
};

use crate::{
    db::{JobRow, JobStatistics},
    domain::{Message, ProcessingStats, QueueSnapshot},
    output::format::{escape_html, preview},
    telegram::types::{AdminCommand, GeneralCommand},
};

pub const DEFAULT_JOB_LIST: u32 = 5;
pub const MAX_JOB_LIST: u32 = 50;
const ROW_PREVIEW_CHARS: usize = 120;

pub fn user_to_i64(user: &User) -> i64 {
    i64::try_from(user.id.0).unwrap_or(i64::MAX)
}

pub fn admin_command_list() -> Vec<BotCommand> {
    let mut commands = GeneralCommand::bot_commands();
    commands.extend(AdminCommand::bot_commands());
    commands
}

/// Domain message for a post; `None` when it carries no text or caption.
pub fn to_domain_message(msg: &teloxide::types::Message) -> Option<Message> {
    let text = msg
        .text()
        .or_else(|| msg.caption())
        .map(str::trim)
        .filter(|text| !text.is_empty())?;
    Some(Message {
        channel_id: msg.chat.id.0,
        channel_title: msg.chat.title().map(str::to_string),
        message_id: msg.id.0,
        text: text.to_string(),
        timestamp: msg.date,
    })
}

/// `/jobs` argument: empty means the default, anything else is clamped.
pub fn parse_job_limit(arg: &str) -> Option<u32> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Some(DEFAULT_JOB_LIST);
    }
    arg.parse::<u32>()
        .ok()
        .map(|limit| limit.clamp(1, MAX_JOB_LIST))
}

pub fn format_job_rows(title: &str, rows: &[JobRow], tz: Tz) -> String {
    if rows.is_empty() {
        return format!("<b>{}</b>\n\nNothing stored yet.", escape_html(title));
    }
    let mut out = format!("<b>{}</b>\n", escape_html(title));
    for row in rows {
        let star = if row.favorite { "⭐ " } else { "" };
        out.push_str(&format!(
            "\n{star}<b>#{}</b> · {} · {}\n",
            row.id,
            escape_html(
                row.channel_title
                    .as_deref()
                    .unwrap_or("unknown channel")
            ),
            row.posted_at.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
        ));
        if !row.matched_keywords.is_empty() {
            out.push_str(&format!("🔑 {}\n", escape_html(&row.matched_keywords)));
        }
        if !row.salary_summary.is_empty() {
            out.push_str(&format!("💰 {}\n", escape_html(&row.salary_summary)));
        }
        out.push_str(&escape_html(&preview(&row.text, ROW_PREVIEW_CHARS)));
        out.push('\n');
    }
    out
}

pub fn format_statistics(stats: &JobStatistics) -> String {
    let mut out = format!(
        "<b>Job statistics</b>\n\n\
         Total: {}\n\
         Favorites: {}\n\
         Today: {}",
        stats.total, stats.favorites, stats.today
    );
    if !stats.top_channels.is_empty() {
        out.push_str("\n\n<b>Top channels</b>");
        for (index, (channel, count)) in stats.top_channels.iter().enumerate() {
            out.push_str(&format!("\n{}. {} ({count})", index + 1, escape_html(channel)));
        }
    }
    out
}

pub fn format_status(
    queue: QueueSnapshot,
    stats: ProcessingStats,
    mode: &str,
    uptime_secs: u64,
) -> String {
    format!(
        "Bot status\n\
         - mode: {mode}\n\
         - uptime: {}h {}m\n\
         - queued: {} (dropped {})\n\
         - processed: {}\n\
         - delivered: {}\n\
         - not relevant: {}\n\
         - salary out of range: {}\n\
         - stale: {}\n\
         - scheduled runs: {}",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        queue.pending,
        queue.dropped,
        stats.processed,
        stats.delivered,
        stats.not_relevant,
        stats.out_of_range,
        stats.stale,
        stats.runs,
    )
}

/// Splits on line breaks into chunks Telegram accepts; a single overlong line is cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.chars().count() > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Start of the current local day as a UTC instant.
pub fn local_day_start(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    local
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(tz).earliest())
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(id: i64, favorite: bool) -> JobRow {
        JobRow {
            id,
            channel_id: -1001,
            channel_title: Some("Rust <Jobs>".to_string()),
            message_id: 3,
            text: "Rust developer wanted".to_string(),
            posted_at: Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap(),
            matched_keywords: "rust".to_string(),
            salary_summary: "5000 USD (monthly)".to_string(),
            favorite,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn job_limit_parsing() {
        assert_eq!(parse_job_limit(""), Some(DEFAULT_JOB_LIST));
        assert_eq!(parse_job_limit(" 12 "), Some(12));
        assert_eq!(parse_job_limit("0"), Some(1));
        assert_eq!(parse_job_limit("500"), Some(MAX_JOB_LIST));
        assert_eq!(parse_job_limit("many"), None);
    }

    #[test]
    fn job_rows_render_escaped() {
        let text = format_job_rows("Recent jobs", &[row(7, true), row(8, false)], Tz::UTC);
        assert!(text.contains("⭐ <b>#7</b>"));
        assert!(text.contains("<b>#8</b>"));
        assert!(text.contains("Rust &lt;Jobs&gt;"));
        assert!(text.contains("💰 5000 USD (monthly)"));
        assert!(format_job_rows("Favorites", &[], Tz::UTC).contains("Nothing stored yet."));
    }

    #[test]
    fn statistics_render_top_channels() {
        let stats = JobStatistics {
            total: 4,
            favorites: 1,
            today: 2,
            top_channels: vec![("Busy".to_string(), 3), ("Quiet".to_string(), 1)],
        };
        let text = format_statistics(&stats);
        assert!(text.contains("Total: 4"));
        assert!(text.contains("1. Busy (3)"));
        assert!(text.contains("2. Quiet (1)"));
    }

    #[test]
    fn day_start_follows_timezone() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 22, 30, 0).unwrap();
        assert_eq!(
            local_day_start(now, Tz::UTC),
            Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
        );
        // 01:30 on June 4th in Moscow (UTC+3).
        assert_eq!(
            local_day_start(now, chrono_tz::Europe::Moscow),
            Utc.with_ymd_and_hms(2024, 6, 3, 21, 0, 0).unwrap()
        );
    }

    #[test]
    fn long_messages_split_on_lines() {
        let text = "aaaa\nbbbb\ncccc\n";
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb\n", "cccc\n"]);
        assert_eq!(split_message("short", 4096), vec!["short"]);
        assert_eq!(split_message("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn admin_list_extends_general_commands() {
        let commands = admin_command_list();
        let names: Vec<_> = commands
            .iter()
            .map(|command| command.command.trim_start_matches('/'))
            .collect();
        assert!(names.contains(&"status"));
        assert!(names.contains(&"jobs"));
        assert!(names.contains(&"sync_commands"));
    }
}
