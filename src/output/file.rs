use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use tokio::fs;

use super::format::{channel_label, salary_line};
use crate::domain::FilteredJob;

/// Writes each delivered batch as `jobs_<stamp>.json` and `jobs_<stamp>.csv`.
pub struct FileSink {
    exports_dir: PathBuf,
    timezone: Tz,
}

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    channel: String,
    channel_id: i64,
    message_id: i32,
    posted_at: String,
    keywords: String,
    salaries: String,
    link: String,
    text: &'a str,
}

impl FileSink {
    pub fn new(exports_dir: PathBuf, timezone: Tz) -> Self {
        Self {
            exports_dir,
            timezone,
        }
    }

    pub async fn deliver(&self, jobs: &[FilteredJob]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let json_path = self.exports_dir.join(format!("jobs_{stamp}.json"));
        let csv_path = self.exports_dir.join(format!("jobs_{stamp}.csv"));

        let json = serde_json::to_vec_pretty(jobs)?;
        write(&json_path, json).await?;
        write(&csv_path, self.to_csv(jobs)?).await?;

        tracing::info!(
            target: "output",
            jobs = jobs.len(),
            json = %json_path.display(),
            csv = %csv_path.display(),
            "jobs exported"
        );
        Ok(())
    }

    fn to_csv(&self, jobs: &[FilteredJob]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for job in jobs {
            writer.serialize(CsvRecord {
                channel: channel_label(job),
                channel_id: job.message.channel_id,
                message_id: job.message.message_id,
                posted_at: job
                    .message
                    .timestamp
                    .with_timezone(&self.timezone)
                    .to_rfc3339(),
                keywords: job.verdict.matched_keywords.join(", "),
                salaries: salary_line(job).unwrap_or_default(),
                link: job.message.permalink().unwrap_or_default(),
                text: &job.message.text,
            })?;
        }
        writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("failed to flush csv export: {}", err.error()))
    }
}

async fn write(path: &Path, bytes: Vec<u8>) -> Result<()> {
    fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
