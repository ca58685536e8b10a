use std::{path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    query,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

pub mod jobs;

pub use jobs::{JobRepository, JobRow, JobStatistics};

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id INTEGER NOT NULL,
            channel_title TEXT,
            message_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            posted_at DATETIME NOT NULL,
            matched_keywords TEXT NOT NULL DEFAULT '',
            salary_summary TEXT NOT NULL DEFAULT '',
            salaries_json TEXT NOT NULL DEFAULT '[]',
            favorite INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            UNIQUE(channel_id, message_id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    query(r#"CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs (created_at)"#)
        .execute(&pool)
        .await?;

    Ok(pool)
}
