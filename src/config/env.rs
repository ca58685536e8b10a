use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

use crate::{domain::SalaryBounds, filter::FilterConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub bot_username: Option<String>,
    pub admin_user_id: Option<i64>,
    /// Personal chat receiving matches; falls back to the admin.
    pub delivery_chat_id: Option<i64>,
    pub source_chat_ids: Vec<i64>,
    pub filter: FilterSettings,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: Tz,
}

impl AppConfig {
    pub fn is_source_chat(&self, chat_id: i64) -> bool {
        self.source_chat_ids.contains(&chat_id)
    }

    pub fn is_admin_user(&self, user_id: i64) -> bool {
        self.admin_user_id == Some(user_id)
    }
}

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub rules: FilterConfig,
    /// Posts older than this are skipped; zero disables the check.
    pub date_filter_hours: u32,
    pub salary_bounds: SalaryBounds,
    pub phrases_path: Option<PathBuf>,
    pub markers_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMethod {
    Telegram,
    File,
    Database,
}

impl OutputMethod {
    pub fn label(&self) -> &'static str {
        match self {
            OutputMethod::Telegram => "telegram",
            OutputMethod::File => "file",
            OutputMethod::Database => "database",
        }
    }
}

impl FromStr for OutputMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "telegram" => Ok(OutputMethod::Telegram),
            "file" => Ok(OutputMethod::File),
            "database" | "db" => Ok(OutputMethod::Database),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for OutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub methods: Vec<OutputMethod>,
    pub forward_original: bool,
    pub delivery_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Continuous,
    Scheduled,
}

impl ProcessingMode {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingMode::Continuous => "continuous",
            ProcessingMode::Scheduled => "scheduled",
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "continuous" => Ok(ProcessingMode::Continuous),
            "scheduled" => Ok(ProcessingMode::Scheduled),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub mode: ProcessingMode,
    pub cron_specs: Vec<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub days_of_week: Vec<Weekday>,
    /// Zero means unlimited.
    pub max_runs_per_day: u32,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
