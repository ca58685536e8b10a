use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::ProcessingConfig;

/// Registers one job per cron spec; each tick wakes the processor through `trigger`.
pub async fn configure_scan_jobs(cron_specs: &[String], trigger: Arc<Notify>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    for spec in cron_specs {
        let label = spec.clone();
        let notify = trigger.clone();
        let job = Job::new_async(spec.as_str(), move |_id, _l| {
            let notify = notify.clone();
            let cron_label = label.clone();
            Box::pin(async move {
                tracing::debug!(target: "scheduler", cron = %cron_label, "scan tick");
                notify.notify_one();
            })
        })
        .with_context(|| format!("invalid cron spec {spec:?}"))?;
        scheduler.add(job).await?;
        tracing::info!(target: "scheduler", cron = %spec, "scan job registered");
    }
    scheduler.start().await?;
    Ok(scheduler)
}

/// Local time-of-day window and weekdays in which scans may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleWindow {
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    days: Vec<Weekday>,
}

impl ScheduleWindow {
    pub fn new(start: Option<NaiveTime>, end: Option<NaiveTime>, days: Vec<Weekday>) -> Self {
        Self { start, end, days }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.start_time, config.end_time, config.days_of_week.clone())
    }

    /// Both bounds are inclusive. A start after the end wraps past midnight.
    pub fn admits(&self, local: NaiveDateTime) -> bool {
        if !self.days.is_empty() && !self.days.contains(&local.weekday()) {
            return false;
        }
        let time = local.time();
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => time >= start || time <= end,
            (start, end) => {
                start.map_or(true, |start| time >= start) && end.map_or(true, |end| time <= end)
            }
        }
    }
}

/// Window plus a per-day run limit; zero means unlimited.
#[derive(Debug)]
pub struct RunBudget {
    window: ScheduleWindow,
    max_runs_per_day: u32,
    today: Mutex<(Option<NaiveDate>, u32)>,
}

impl RunBudget {
    pub fn new(window: ScheduleWindow, max_runs_per_day: u32) -> Self {
        Self {
            window,
            max_runs_per_day,
            today: Mutex::new((None, 0)),
        }
    }

    /// Claims a run at `local` time. The counter resets on a new local date.
    pub fn try_acquire(&self, local: NaiveDateTime) -> bool {
        if !self.window.admits(local) {
            tracing::debug!(target: "scheduler", at = %local, "outside schedule window");
            return false;
        }
        let mut today = self.today.lock();
        if today.0 != Some(local.date()) {
            *today = (Some(local.date()), 0);
        }
        if self.max_runs_per_day > 0 && today.1 >= self.max_runs_per_day {
            tracing::debug!(
                target: "scheduler",
                runs = today.1,
                limit = self.max_runs_per_day,
                "daily run limit reached"
            );
            return false;
        }
        today.1 += 1;
        true
    }

    pub fn runs_today(&self) -> u32 {
        self.today.lock().1
    }
}
