use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{
    query, query_as,
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};

use crate::domain::FilteredJob;

#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Stores a delivered job. Returns `false` when the post was already recorded.
    pub async fn save(&self, job: &FilteredJob) -> Result<bool> {
        let message = &job.message;
        let salary_summary = job
            .salaries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let salaries_json = serde_json::to_string(&job.salaries)?;

        let affected = query(
            r#"INSERT OR IGNORE INTO jobs
                (channel_id, channel_title, message_id, text, posted_at,
                 matched_keywords, salary_summary, salaries_json, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(message.channel_id)
        .bind(message.channel_title.as_deref())
        .bind(message.message_id)
        .bind(&message.text)
        .bind(message.timestamp)
        .bind(job.verdict.matched_keywords.join(", "))
        .bind(salary_summary)
        .bind(salaries_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    pub async fn recent(&self, limit: u32, favorites_only: bool) -> Result<Vec<JobRow>> {
        let rows = query_as::<_, JobRow>(
            r#"SELECT id, channel_id, channel_title, message_id, text, posted_at,
                      matched_keywords, salary_summary, favorite, created_at
                 FROM jobs
                WHERE (?1 = 0 OR favorite = 1)
                ORDER BY created_at DESC, id DESC
                LIMIT ?2"#,
        )
        .bind(favorites_only)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Flips the favorite flag. `None` when no job has this id.
    pub async fn toggle_favorite(&self, id: i64) -> Result<Option<bool>> {
        let flipped: Option<(bool,)> = query_as(
            r#"UPDATE jobs SET favorite = 1 - favorite WHERE id = ?1 RETURNING favorite"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(flipped.map(|(favorite,)| favorite))
    }

    /// Totals, plus the jobs recorded since `day_start` and the five busiest channels.
    pub async fn statistics(&self, day_start: DateTime<Utc>) -> Result<JobStatistics> {
        let (total, favorites, today): (i64, i64, i64) = query_as(
            r#"SELECT COUNT(*),
                      COALESCE(SUM(favorite), 0),
                      COALESCE(SUM(CASE WHEN created_at >= ?1 THEN 1 ELSE 0 END), 0)
                 FROM jobs"#,
        )
        .bind(day_start)
        .fetch_one(&self.pool)
        .await?;

        let top_channels: Vec<(String, i64)> = query_as(
            r#"SELECT COALESCE(MAX(channel_title), CAST(channel_id AS TEXT)), COUNT(*) AS jobs
                 FROM jobs
                GROUP BY channel_id
                ORDER BY jobs DESC
                LIMIT 5"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(JobStatistics {
            total,
            favorites,
            today,
            top_channels,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRow {
    pub id: i64,
    pub channel_id: i64,
    pub channel_title: Option<String>,
    pub message_id: i32,
    pub text: String,
    pub posted_at: DateTime<Utc>,
    pub matched_keywords: String,
    pub salary_summary: String,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for JobRow {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            channel_id: row.try_get("channel_id")?,
            channel_title: row.try_get("channel_title")?,
            message_id: row.try_get("message_id")?,
            text: row.try_get("text")?,
            posted_at: row.try_get("posted_at")?,
            matched_keywords: row.try_get("matched_keywords")?,
            salary_summary: row.try_get("salary_summary")?,
            favorite: row.try_get("favorite")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStatistics {
    pub total: i64,
    pub favorites: i64,
    pub today: i64,
    pub top_channels: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        db::init_pool,
        domain::{FilterVerdict, Message},
        salary::extract_salaries,
    };

    async fn repository() -> (TempDir, JobRepository) {
        let dir = tempfile::tempdir().expect("temp dir");
        let pool = init_pool(&dir.path().join("jobs.db"))
            .await
            .expect("pool");
        (dir, JobRepository::new(pool))
    }

    fn job(channel_id: i64, message_id: i32, title: &str, text: &str) -> FilteredJob {
        FilteredJob {
            message: Arc::new(Message {
                channel_id,
                channel_title: Some(title.to_string()),
                message_id,
                text: text.to_string(),
                timestamp: Utc::now(),
            }),
            verdict: FilterVerdict::matched(vec!["rust".to_string()]),
            salaries: extract_salaries(text),
        }
    }

    #[tokio::test]
    async fn save_ignores_duplicate_posts() {
        let (_dir, repo) = repository().await;
        let job = job(-1001, 1, "Rust Jobs", "Rust dev $5000 per month");

        assert!(repo.save(&job).await.expect("first save"));
        assert!(!repo.save(&job).await.expect("second save"));

        let rows = repo.recent(10, false).await.expect("recent");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].matched_keywords, "rust");
        assert_eq!(rows[0].salary_summary, "5000 USD (monthly)");
        assert!(!rows[0].favorite);
        repo.close().await;
    }

    #[tokio::test]
    async fn favorites_toggle_and_filter() {
        let (_dir, repo) = repository().await;
        repo.save(&job(-1001, 1, "A", "first")).await.expect("save");
        repo.save(&job(-1001, 2, "A", "second")).await.expect("save");

        let rows = repo.recent(10, false).await.expect("recent");
        let first = rows
            .iter()
            .find(|row| row.message_id == 1)
            .expect("first row");

        assert_eq!(repo.toggle_favorite(first.id).await.expect("toggle"), Some(true));
        let favorites = repo.recent(10, true).await.expect("favorites");
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].message_id, 1);

        assert_eq!(repo.toggle_favorite(first.id).await.expect("toggle"), Some(false));
        assert!(repo.recent(10, true).await.expect("favorites").is_empty());
        assert_eq!(repo.toggle_favorite(9999).await.expect("toggle"), None);
        repo.close().await;
    }

    #[tokio::test]
    async fn statistics_rank_channels() {
        let (_dir, repo) = repository().await;
        for id in 1..=3 {
            repo.save(&job(-1001, id, "Busy", "post")).await.expect("save");
        }
        repo.save(&job(-1002, 1, "Quiet", "post")).await.expect("save");

        let stats = repo
            .statistics(Utc::now() - Duration::hours(1))
            .await
            .expect("stats");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.today, 4);
        assert_eq!(stats.favorites, 0);
        assert_eq!(
            stats.top_channels,
            vec![("Busy".to_string(), 3), ("Quiet".to_string(), 1)]
        );

        let later = repo
            .statistics(Utc::now() + Duration::hours(1))
            .await
            .expect("stats");
        assert_eq!(later.today, 0);
        repo.close().await;
    }

    #[tokio::test]
    async fn recent_respects_limit() {
        let (_dir, repo) = repository().await;
        for id in 1..=5 {
            repo.save(&job(-1001, id, "A", "post")).await.expect("save");
        }
        assert_eq!(repo.recent(3, false).await.expect("recent").len(), 3);
        repo.close().await;
    }
}
