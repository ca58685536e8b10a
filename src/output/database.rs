use std::sync::Arc;

use anyhow::Result;

use crate::{db::JobRepository, domain::FilteredJob};

pub struct DatabaseSink {
    repository: Arc<JobRepository>,
}

impl DatabaseSink {
    pub fn new(repository: Arc<JobRepository>) -> Self {
        Self { repository }
    }

    pub async fn deliver(&self, jobs: &[FilteredJob]) -> Result<()> {
        let mut inserted = 0usize;
        for job in jobs {
            if self.repository.save(job).await? {
                inserted += 1;
            }
        }
        tracing::info!(
            target: "db",
            inserted,
            duplicates = jobs.len() - inserted,
            "jobs recorded"
        );
        Ok(())
    }
}
