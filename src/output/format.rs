use chrono_tz::Tz;

use crate::domain::FilteredJob;

pub const PREVIEW_CHARS: usize = 300;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// First `limit` chars of `text`, with an ellipsis when cut.
pub fn preview(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", trimmed[..cut].trim_end()),
        None => trimmed.to_string(),
    }
}

pub fn channel_label(job: &FilteredJob) -> String {
    job.message
        .channel_title
        .clone()
        .unwrap_or_else(|| job.message.channel_id.to_string())
}

pub fn salary_line(job: &FilteredJob) -> Option<String> {
    if job.salaries.is_empty() {
        return None;
    }
    Some(
        job.salaries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Short note sent after a forwarded post.
pub fn format_summary(job: &FilteredJob) -> String {
    let mut out = format!(
        "<b>Job match</b> · {}",
        escape_html(&job.verdict.matched_keywords.join(", "))
    );
    if let Some(salary) = salary_line(job) {
        out.push_str(&format!("\n<b>Salary:</b> {}", escape_html(&salary)));
    }
    if let Some(link) = job.message.permalink() {
        out.push_str(&format!("\n<a href=\"{link}\">Open post</a>"));
    }
    out
}

/// Self-contained card used when the original is not forwarded.
pub fn format_card(job: &FilteredJob, tz: Tz) -> String {
    let posted = job.message.timestamp.with_timezone(&tz);
    let mut out = format!(
        "<b>💼 New job match</b>\n\n\
         <b>Channel:</b> {}\n\
         <b>Date:</b> {}\n\
         <b>Keywords:</b> {}",
        escape_html(&channel_label(job)),
        posted.format("%Y-%m-%d %H:%M %Z"),
        escape_html(&job.verdict.matched_keywords.join(", ")),
    );
    if let Some(salary) = salary_line(job) {
        out.push_str(&format!("\n<b>Salary:</b> {}", escape_html(&salary)));
    }
    out.push_str(&format!(
        "\n\n{}",
        escape_html(&preview(&job.message.text, PREVIEW_CHARS))
    ));
    if let Some(link) = job.message.permalink() {
        out.push_str(&format!("\n\n<a href=\"{link}\">Open post</a>"));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        domain::{FilterVerdict, Message},
        salary::extract_salaries,
    };

    fn job(channel_id: i64, text: &str) -> FilteredJob {
        FilteredJob {
            message: Arc::new(Message {
                channel_id,
                channel_title: Some("Dev <Jobs>".to_string()),
                message_id: 15,
                text: text.to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap(),
            }),
            verdict: FilterVerdict::matched(vec!["python".to_string(), "django".to_string()]),
            salaries: extract_salaries(text),
        }
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("  short  ", 300), "short");
        assert_eq!(preview("привет мир", 6), "привет…");
        let long = "x".repeat(400);
        assert_eq!(preview(&long, PREVIEW_CHARS).chars().count(), PREVIEW_CHARS + 1);
    }

    #[test]
    fn card_lists_everything() {
        let card = format_card(&job(-1001234567890, "Python dev, $5000 per month"), Tz::UTC);
        assert!(card.contains("Dev &lt;Jobs&gt;"));
        assert!(card.contains("2024-06-03 09:30 UTC"));
        assert!(card.contains("python, django"));
        assert!(card.contains("5000 USD (monthly)"));
        assert!(card.contains("https://t.me/c/1234567890/15"));
    }

    #[test]
    fn card_uses_configured_timezone() {
        let card = format_card(&job(-42, "Python dev"), chrono_tz::Europe::Moscow);
        assert!(card.contains("2024-06-03 12:30 MSK"));
        assert!(!card.contains("Salary"));
        assert!(!card.contains("Open post"));
    }

    #[test]
    fn summary_is_short() {
        let summary = format_summary(&job(-1001234567890, "Python dev $5000"));
        assert!(summary.starts_with("<b>Job match</b>"));
        assert!(summary.contains("5000 USD"));
        assert!(summary.contains("Open post"));
        assert!(!summary.contains("Channel"));
    }
}
