use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{
    domain::{FilteredJob, Message, SalaryBounds},
    filter::{FilterConfig, KeywordFilter},
    salary::SalaryExtractor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NotRelevant,
    SalaryOutOfRange,
}

impl DiscardReason {
    pub fn label(&self) -> &'static str {
        match self {
            DiscardReason::NotRelevant => "not_relevant",
            DiscardReason::SalaryOutOfRange => "salary_out_of_range",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Disposition {
    /// Older than the configured window; nothing was evaluated.
    Stale,
    Deliver(FilteredJob),
    Discard(FilteredJob, DiscardReason),
}

/// Keyword filter, salary extraction and the delivery gates, in that order.
#[derive(Debug, Clone)]
pub struct JobPipeline {
    filter: KeywordFilter,
    extractor: SalaryExtractor,
    config: FilterConfig,
    max_age: Option<Duration>,
    bounds: SalaryBounds,
}

impl JobPipeline {
    pub fn new(filter: KeywordFilter, extractor: SalaryExtractor, config: FilterConfig) -> Self {
        Self {
            filter,
            extractor,
            config,
            max_age: None,
            bounds: SalaryBounds::default(),
        }
    }

    /// Skips posts older than `hours`; zero disables the window.
    pub fn with_max_age_hours(mut self, hours: u32) -> Self {
        self.max_age = (hours > 0).then(|| Duration::hours(i64::from(hours)));
        self
    }

    pub fn with_bounds(mut self, bounds: SalaryBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn bounds(&self) -> SalaryBounds {
        self.bounds
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn process(&self, message: Arc<Message>, now: DateTime<Utc>) -> Disposition {
        if let Some(max_age) = self.max_age {
            if now - message.timestamp > max_age {
                debug!(
                    target: "processor",
                    channel_id = message.channel_id,
                    message_id = message.message_id,
                    "Skipping stale message"
                );
                return Disposition::Stale;
            }
        }

        let verdict = self.filter.evaluate(&message.text, &self.config);
        debug!(
            target: "filter",
            channel_id = message.channel_id,
            message_id = message.message_id,
            matched = verdict.matched,
            reason = verdict.reason.label(),
            trigger = verdict.trigger.as_deref().unwrap_or(""),
            "Message evaluated"
        );

        if !verdict.matched {
            let job = FilteredJob {
                message,
                verdict,
                salaries: Vec::new(),
            };
            return Disposition::Discard(job, DiscardReason::NotRelevant);
        }

        let salaries = self.extractor.extract(&message.text);
        let out_of_range = !self.bounds.is_unbounded()
            && !salaries.is_empty()
            && !salaries.iter().any(|mention| self.bounds.admits(mention));
        let job = FilteredJob {
            message,
            verdict,
            salaries,
        };

        if out_of_range {
            debug!(
                target: "salary",
                message_id = job.message.message_id,
                mentions = job.salaries.len(),
                "Salaries outside configured bounds"
            );
            Disposition::Discard(job, DiscardReason::SalaryOutOfRange)
        } else {
            Disposition::Deliver(job)
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::VerdictReason;

    fn message(text: &str, age_hours: i64, now: DateTime<Utc>) -> Arc<Message> {
        Arc::new(Message {
            channel_id: -1001234567890,
            channel_title: Some("Jobs".to_string()),
            message_id: 7,
            text: text.to_string(),
            timestamp: now - Duration::hours(age_hours),
        })
    }

    fn pipeline(include: &[&str]) -> JobPipeline {
        JobPipeline::new(
            KeywordFilter::default(),
            SalaryExtractor::default(),
            FilterConfig::default().with_include(include),
        )
    }

    #[test]
    fn relevant_posts_are_delivered_with_salaries() {
        let now = Utc::now();
        let disposition = pipeline(&["rust"]).process(
            message("Rust developer, $5000 per month", 1, now),
            now,
        );
        let Disposition::Deliver(job) = disposition else {
            panic!("expected delivery, got {disposition:?}");
        };
        assert_eq!(job.verdict.matched_keywords, vec!["rust"]);
        assert_eq!(job.salaries.len(), 1);
    }

    #[test]
    fn irrelevant_posts_are_discarded() {
        let now = Utc::now();
        let disposition = pipeline(&["rust"]).process(message("Java developer", 1, now), now);
        match disposition {
            Disposition::Discard(job, DiscardReason::NotRelevant) => {
                assert_eq!(job.verdict.reason, VerdictReason::NoMatch);
                assert!(job.salaries.is_empty());
            }
            other => panic!("unexpected disposition {other:?}"),
        }
    }

    #[test]
    fn window_filters_old_posts() {
        let now = Utc::now();
        let pipeline = pipeline(&["rust"]).with_max_age_hours(24);
        assert!(matches!(
            pipeline.process(message("Rust developer", 30, now), now),
            Disposition::Stale
        ));
        assert!(matches!(
            pipeline.process(message("Rust developer", 2, now), now),
            Disposition::Deliver(_)
        ));

        let unbounded = self::pipeline(&["rust"]).with_max_age_hours(0);
        assert!(unbounded.max_age().is_none());
        assert!(matches!(
            unbounded.process(message("Rust developer", 24 * 365, now), now),
            Disposition::Deliver(_)
        ));
    }

    #[test]
    fn salary_bounds_gate_delivery() {
        let now = Utc::now();
        let pipeline = pipeline(&["rust"]).with_bounds(SalaryBounds {
            min: Some(Decimal::from(60_000)),
            max: None,
        });

        assert!(matches!(
            pipeline.process(message("Rust dev, $3000 per month", 1, now), now),
            Disposition::Discard(_, DiscardReason::SalaryOutOfRange)
        ));
        assert!(matches!(
            pipeline.process(message("Rust dev, $6000 per month", 1, now), now),
            Disposition::Deliver(_)
        ));
        assert!(matches!(
            pipeline.process(message("Rust dev, salary negotiable", 1, now), now),
            Disposition::Deliver(_)
        ));
    }
}
