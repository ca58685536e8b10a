use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: usize,
    /// Messages evicted because the queue was full.
    pub dropped: u64,
}

/// Running totals shared between the processor and `/status`.
#[derive(Debug, Default)]
pub struct ProcessingCounters {
    processed: AtomicU64,
    delivered: AtomicU64,
    not_relevant: AtomicU64,
    out_of_range: AtomicU64,
    stale: AtomicU64,
    runs: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub processed: u64,
    pub delivered: u64,
    pub not_relevant: u64,
    pub out_of_range: u64,
    pub stale: u64,
    pub runs: u64,
}

impl ProcessingCounters {
    pub fn add_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_not_relevant(&self) {
        self.not_relevant.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_out_of_range(&self) {
        self.out_of_range.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProcessingStats {
        ProcessingStats {
            processed: self.processed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            not_relevant: self.not_relevant.load(Ordering::Relaxed),
            out_of_range: self.out_of_range.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
        }
    }
}
