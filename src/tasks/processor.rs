use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use tokio::{sync::Notify, task::JoinHandle, time::sleep};

use crate::{
    config::ProcessingMode,
    domain::{FilteredJob, Message, ProcessingCounters},
    infrastructure::shutdown::ShutdownListener,
    output::OutputSink,
    pipeline::{DiscardReason, Disposition, JobPipeline},
    tasks::{queue::MessageQueue, scheduler::RunBudget},
};

const BATCH_SIZE: usize = 50;
const IDLE_POLL: Duration = Duration::from_millis(500);

pub struct MessageProcessor {
    queue: Arc<MessageQueue<Arc<Message>>>,
    pipeline: Arc<JobPipeline>,
    sinks: Vec<OutputSink>,
    counters: Arc<ProcessingCounters>,
    mode: ProcessingMode,
    trigger: Arc<Notify>,
    budget: RunBudget,
    timezone: Tz,
}

impl MessageProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<MessageQueue<Arc<Message>>>,
        pipeline: Arc<JobPipeline>,
        sinks: Vec<OutputSink>,
        counters: Arc<ProcessingCounters>,
        mode: ProcessingMode,
        trigger: Arc<Notify>,
        budget: RunBudget,
        timezone: Tz,
    ) -> Self {
        Self {
            queue,
            pipeline,
            sinks,
            counters,
            mode,
            trigger,
            budget,
            timezone,
        }
    }

    pub fn spawn(self: Arc<Self>, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.run_loop(&mut shutdown).await {
                tracing::error!(target: "processor", error = %err, "message processor crashed");
            }
        })
    }

    async fn run_loop(&self, shutdown: &mut ShutdownListener) -> Result<()> {
        tracing::info!(
            target: "processor",
            mode = ?self.mode,
            sinks = ?self.sinks.iter().map(|sink| sink.method().label()).collect::<Vec<_>>(),
            "message processor started"
        );
        match self.mode {
            ProcessingMode::Continuous => self.run_continuous(shutdown).await,
            ProcessingMode::Scheduled => self.run_scheduled(shutdown).await,
        }
        tracing::info!(target: "processor", "message processor stopped");
        Ok(())
    }

    async fn run_continuous(&self, shutdown: &mut ShutdownListener) {
        loop {
            if shutdown.is_triggered() {
                break;
            }
            let batch = self.queue.drain_batch(BATCH_SIZE);
            if batch.is_empty() {
                tokio::select! {
                    _ = sleep(IDLE_POLL) => {}
                    _ = shutdown.notified() => break,
                }
                continue;
            }
            self.handle_batch(batch).await;
        }
    }

    async fn run_scheduled(&self, shutdown: &mut ShutdownListener) {
        loop {
            tokio::select! {
                _ = self.trigger.notified() => {}
                _ = shutdown.notified() => break,
            }
            let local = Utc::now().with_timezone(&self.timezone).naive_local();
            if !self.budget.try_acquire(local) {
                tracing::info!(
                    target: "scheduler",
                    pending = self.queue.len(),
                    "scan skipped by schedule"
                );
                continue;
            }

            self.counters.add_run();
            tracing::info!(
                target: "scheduler",
                pending = self.queue.len(),
                runs_today = self.budget.runs_today(),
                "scheduled scan started"
            );
            loop {
                if shutdown.is_triggered() {
                    return;
                }
                let batch = self.queue.drain_batch(BATCH_SIZE);
                if batch.is_empty() {
                    break;
                }
                self.handle_batch(batch).await;
            }
        }
    }

    async fn handle_batch(&self, batch: Vec<Arc<Message>>) {
        tracing::debug!(target: "processor", total = batch.len(), "processing batch");
        let deliverable = self.evaluate(batch);
        if deliverable.is_empty() {
            return;
        }

        for sink in &self.sinks {
            if let Err(err) = sink.deliver(&deliverable).await {
                tracing::error!(
                    target: "output",
                    sink = sink.method().label(),
                    error = %err,
                    "delivery failed"
                );
            }
        }
    }

    fn evaluate(&self, batch: Vec<Arc<Message>>) -> Vec<FilteredJob> {
        let now = Utc::now();
        let mut deliverable = Vec::new();
        for message in batch {
            self.counters.add_processed();
            match self.pipeline.process(message, now) {
                Disposition::Deliver(job) => {
                    self.counters.add_delivered();
                    tracing::info!(
                        target: "processor",
                        channel_id = job.message.channel_id,
                        message_id = job.message.message_id,
                        keywords = %job.verdict.matched_keywords.join(", "),
                        salaries = job.salaries.len(),
                        "job matched"
                    );
                    deliverable.push(job);
                }
                Disposition::Discard(_, DiscardReason::NotRelevant) => {
                    self.counters.add_not_relevant();
                }
                Disposition::Discard(job, reason @ DiscardReason::SalaryOutOfRange) => {
                    self.counters.add_out_of_range();
                    tracing::info!(
                        target: "processor",
                        message_id = job.message.message_id,
                        reason = reason.label(),
                        "job discarded"
                    );
                }
                Disposition::Stale => self.counters.add_stale(),
            }
        }
        deliverable
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::{
        db::{init_pool, JobRepository},
        filter::{FilterConfig, KeywordFilter},
        infrastructure::shutdown::Shutdown,
        output::DatabaseSink,
        salary::SalaryExtractor,
        tasks::scheduler::ScheduleWindow,
    };

    fn message(id: i32, text: &str, age_hours: i64) -> Arc<Message> {
        Arc::new(Message {
            channel_id: -1001,
            channel_title: None,
            message_id: id,
            text: text.to_string(),
            timestamp: Utc::now() - ChronoDuration::hours(age_hours),
        })
    }

    async fn processor(
        mode: ProcessingMode,
        budget: RunBudget,
    ) -> (tempfile::TempDir, Arc<JobRepository>, Arc<MessageProcessor>) {
        let dir = tempfile::tempdir().expect("temp dir");
        let pool = init_pool(&dir.path().join("jobs.db")).await.expect("pool");
        let repository = Arc::new(JobRepository::new(pool));
        let pipeline = JobPipeline::new(
            KeywordFilter::default(),
            SalaryExtractor::default(),
            FilterConfig::default().with_include(["rust"]),
        )
        .with_max_age_hours(24);

        let processor = Arc::new(MessageProcessor::new(
            Arc::new(MessageQueue::with_capacity(100)),
            Arc::new(pipeline),
            vec![OutputSink::Database(DatabaseSink::new(repository.clone()))],
            Arc::new(ProcessingCounters::default()),
            mode,
            Arc::new(Notify::new()),
            budget,
            Tz::UTC,
        ));
        (dir, repository, processor)
    }

    fn open_budget() -> RunBudget {
        RunBudget::new(ScheduleWindow::new(None, None, Vec::new()), 0)
    }

    #[tokio::test]
    async fn batch_outcomes_are_counted_and_stored() {
        let (_dir, repository, processor) =
            processor(ProcessingMode::Continuous, open_budget()).await;

        processor
            .handle_batch(vec![
                message(1, "Rust developer wanted", 1),
                message(2, "Java developer wanted", 1),
                message(3, "Rust developer, old post", 48),
            ])
            .await;

        let stats = processor.counters.snapshot();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.not_relevant, 1);
        assert_eq!(stats.stale, 1);

        let rows = repository.recent(10, false).await.expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message_id, 1);
    }

    #[tokio::test]
    async fn continuous_mode_drains_until_shutdown() {
        let (_dir, repository, processor) =
            processor(ProcessingMode::Continuous, open_budget()).await;
        processor.queue.push(message(1, "Rust developer", 0));

        let (shutdown, listener) = Shutdown::new();
        let handle = processor.clone().spawn(listener);

        for _ in 0..50 {
            if processor.queue.is_empty() && processor.counters.snapshot().processed == 1 {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("processor stopped")
            .expect("no panic");

        assert_eq!(repository.recent(10, false).await.expect("rows").len(), 1);
    }

    #[tokio::test]
    async fn scheduled_mode_waits_for_tick_and_budget() {
        let (_dir, _repository, processor) =
            processor(ProcessingMode::Scheduled, RunBudget::new(ScheduleWindow::new(None, None, Vec::new()), 1)).await;
        processor.queue.push(message(1, "Rust developer", 0));

        let (shutdown, listener) = Shutdown::new();
        let handle = processor.clone().spawn(listener);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(processor.queue.len(), 1, "nothing runs before a tick");

        processor.trigger.notify_one();
        for _ in 0..50 {
            if processor.queue.is_empty() {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert!(processor.queue.is_empty());
        assert_eq!(processor.counters.snapshot().runs, 1);

        processor.queue.push(message(2, "Rust developer", 0));
        processor.trigger.notify_one();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(processor.queue.len(), 1, "daily budget exhausted");

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("processor stopped")
            .expect("no panic");
    }
}
