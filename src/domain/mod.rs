pub mod message;
pub mod salary;
pub mod types;
pub mod verdict;

pub use message::{FilteredJob, Message};
pub use salary::{dedup_mentions, Currency, SalaryBounds, SalaryMention, SalaryPeriod};
pub use types::{ProcessingCounters, ProcessingStats, QueueSnapshot};
pub use verdict::{FilterVerdict, VerdictReason};
