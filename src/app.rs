use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tokio::{sync::Notify, task::JoinHandle, time::timeout};
use tokio_cron_scheduler::JobScheduler;

use crate::{
    config::{AppConfig, ProcessingMode},
    db::{self, JobRepository},
    domain::{Message, ProcessingCounters},
    filter::{KeywordFilter, PhraseTables},
    infrastructure::{
        directories::ResolvedPaths,
        notifier::{lifecycle_notice, notify_admin, Lifecycle},
        shutdown::Shutdown,
    },
    output::build_sinks,
    pipeline::JobPipeline,
    salary::{MarkerRegistry, SalaryExtractor},
    tasks::{
        processor::MessageProcessor,
        queue::MessageQueue,
        scheduler::{configure_scan_jobs, RunBudget, ScheduleWindow},
    },
    telegram::{AppState, TelegramService},
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct JobRadarApp {
    scheduler: Option<JobScheduler>,
    processor_handle: JoinHandle<()>,
    telegram: TelegramService,
    repository: Arc<JobRepository>,
    shutdown: Shutdown,
    config: Arc<AppConfig>,
    bot: Bot,
}

impl JobRadarApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = db::init_pool(&paths.db_path).await?;
        let repository = Arc::new(JobRepository::new(pool));

        let pipeline = Arc::new(build_pipeline(&config)?);
        tracing::info!(
            target: "filter",
            summary = %pipeline.config().summary(),
            "filter configured"
        );

        let bot = Bot::new(&config.telegram_bot_token);
        let queue = Arc::new(MessageQueue::<Arc<Message>>::with_capacity(
            config.processing.queue_capacity,
        ));
        let counters = Arc::new(ProcessingCounters::default());
        let trigger = Arc::new(Notify::new());

        let sinks = build_sinks(&config, &bot, &paths, &repository);
        let budget = RunBudget::new(
            ScheduleWindow::from_config(&config.processing),
            config.processing.max_runs_per_day,
        );
        let processor = Arc::new(MessageProcessor::new(
            queue.clone(),
            pipeline.clone(),
            sinks,
            counters.clone(),
            config.processing.mode,
            trigger.clone(),
            budget,
            config.timezone,
        ));
        let processor_handle = processor.spawn(shutdown.subscribe());

        let scheduler = match config.processing.mode {
            ProcessingMode::Scheduled => {
                Some(configure_scan_jobs(&config.processing.cron_specs, trigger).await?)
            }
            ProcessingMode::Continuous => None,
        };

        let state = Arc::new(AppState {
            config: config.clone(),
            repository: repository.clone(),
            queue,
            pipeline,
            counters,
            started_at: std::time::Instant::now(),
        });
        let telegram = TelegramService::new(bot.clone(), state);

        Ok(Self {
            scheduler,
            processor_handle,
            telegram,
            repository,
            shutdown,
            config,
            bot,
        })
    }

    pub async fn run(self) -> Result<()> {
        let JobRadarApp {
            scheduler,
            mut processor_handle,
            telegram,
            repository,
            shutdown,
            config,
            bot,
        } = self;

        tracing::info!(
            mode = config.processing.mode.label(),
            sources = config.source_chat_ids.len(),
            "job radar started"
        );
        notify_admin(&bot, &config, &lifecycle_notice(&config, Lifecycle::Started)).await;

        let mut shutdown_listener = shutdown.subscribe();
        let mut telegram_future = Box::pin(telegram.run(shutdown.subscribe()));
        let mut telegram_completed = false;

        tokio::select! {
            _ = shutdown_listener.notified() => {
                tracing::info!("shutdown signal received (CTRL+C / SIGTERM)");
            }
            res = &mut telegram_future => {
                telegram_completed = true;
                if let Err(err) = res {
                    tracing::error!(?err, "Telegram dispatcher stopped with an error");
                } else {
                    tracing::info!("Telegram dispatcher stopped");
                }
            }
        }

        shutdown.trigger();

        if !telegram_completed {
            let wait = tokio::time::sleep(SHUTDOWN_TIMEOUT);
            tokio::pin!(wait);
            tokio::select! {
                res = &mut telegram_future => {
                    if let Err(err) = res {
                        tracing::error!(?err, "Telegram dispatcher stopped with an error");
                    }
                }
                _ = &mut wait => {
                    tracing::warn!(
                        target: "telegram",
                        "Telegram dispatcher did not stop within {:?}; forcing exit",
                        SHUTDOWN_TIMEOUT
                    );
                }
            }
        }

        if let Some(mut scheduler) = scheduler {
            match timeout(SHUTDOWN_TIMEOUT, scheduler.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(target: "scheduler", ?err, "scheduler shutdown failed");
                }
                Err(_) => {
                    tracing::warn!(
                        target: "scheduler",
                        "scheduler did not stop within {:?}",
                        SHUTDOWN_TIMEOUT
                    );
                }
            }
        }

        let processor_sleep = tokio::time::sleep(SHUTDOWN_TIMEOUT);
        tokio::pin!(processor_sleep);
        tokio::select! {
            res = &mut processor_handle => {
                if let Err(err) = res {
                    if err.is_panic() {
                        tracing::error!(target: "processor", "message processor panicked");
                    }
                }
            }
            _ = &mut processor_sleep => {
                tracing::warn!(
                    target: "processor",
                    "message processor did not stop within {:?}; aborting",
                    SHUTDOWN_TIMEOUT
                );
                processor_handle.abort();
            }
        }

        if timeout(SHUTDOWN_TIMEOUT, repository.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "database pool did not close within {:?}",
                SHUTDOWN_TIMEOUT
            );
        }

        tracing::info!("job radar stopped");
        notify_admin(&bot, &config, &lifecycle_notice(&config, Lifecycle::Stopped)).await;
        Ok(())
    }
}

/// Filter and extractor tables, extended by the optional JSON override files.
fn build_pipeline(config: &AppConfig) -> Result<JobPipeline> {
    let settings = &config.filter;
    let phrases = PhraseTables::load(settings.phrases_path.as_deref())
        .context("failed to load filter phrases")?;
    let markers = MarkerRegistry::load(settings.markers_path.as_deref())
        .context("failed to load salary markers")?;

    Ok(JobPipeline::new(
        KeywordFilter::new(phrases),
        SalaryExtractor::new(markers),
        settings.rules.clone(),
    )
    .with_max_age_hours(settings.date_filter_hours)
    .with_bounds(settings.salary_bounds))
}
