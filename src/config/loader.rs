use std::{env, path::PathBuf, str::FromStr, time::Duration};

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, FilterSettings, LoggingConfig, OutputConfig,
    OutputMethod, ProcessingConfig, ProcessingMode,
};
use crate::{
    domain::SalaryBounds,
    filter::{FilterConfig, Language},
};

const DEFAULT_SCAN_CRON: &str = "0 */30 * * * *";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    /// Builds the config from `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let telegram_bot_token = env
            .string("TELEGRAM_BOT_TOKEN")
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let bot_username = env
            .string("BOT_USERNAME")
            .map(|name| name.trim_start_matches('@').to_string());
        let admin_user_id = env.int("ADMIN_USER_ID");
        let delivery_chat_id = env.int("DELIVERY_CHAT_ID").or(admin_user_id);
        let source_chat_ids = env
            .list("SOURCE_CHAT_IDS", ',')
            .into_iter()
            .filter_map(|part| part.parse::<i64>().ok())
            .collect();

        let languages = match env.string("FILTER_LANGUAGES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<Language>().map_err(|value| ConfigError::Invalid {
                        key: "FILTER_LANGUAGES",
                        value,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => FilterConfig::default().languages,
        };
        let rules = FilterConfig {
            require_junior: env.flag("REQUIRE_JUNIOR", false),
            exclude_senior: env.flag("EXCLUDE_SENIOR", false),
            exclude_resumes: env.flag("EXCLUDE_RESUMES", false),
            languages,
            ..FilterConfig::default()
        }
        .with_include(env.list("FILTER_KEYWORDS", ','))
        .with_exclude(env.list("EXCLUDE_KEYWORDS", ','));

        let filter = FilterSettings {
            rules,
            date_filter_hours: env.number("DATE_FILTER_HOURS", 24),
            salary_bounds: SalaryBounds {
                min: env.decimal("MIN_SALARY"),
                max: env.decimal("MAX_SALARY"),
            },
            phrases_path: env.string("FILTER_PHRASES_PATH").map(PathBuf::from),
            markers_path: env.string("SALARY_MARKERS_PATH").map(PathBuf::from),
        };

        let methods = match env.string("OUTPUT_METHODS") {
            Some(raw) => parse_methods(&raw)?,
            None => vec![OutputMethod::Telegram, OutputMethod::Database],
        };
        let output = OutputConfig {
            methods,
            forward_original: env.flag("FORWARD_ORIGINAL", true),
            delivery_delay: Duration::from_millis(env.number("DELIVERY_DELAY_MS", 1_500)),
        };

        let mode = match env.string("PROCESSING_MODE") {
            Some(raw) => raw.parse().map_err(|value| ConfigError::Invalid {
                key: "PROCESSING_MODE",
                value,
            })?,
            None => ProcessingMode::Continuous,
        };
        let cron_specs = match env.list("SCAN_CRONS", ';') {
            specs if specs.is_empty() => vec![DEFAULT_SCAN_CRON.to_string()],
            specs => specs,
        };
        let days_of_week = match env.string("SCHEDULE_DAYS_OF_WEEK") {
            Some(raw) => parse_weekdays(&raw)?,
            None => ALL_WEEKDAYS.to_vec(),
        };
        let processing = ProcessingConfig {
            mode,
            cron_specs,
            start_time: env.time("SCHEDULE_START_TIME")?,
            end_time: env.time("SCHEDULE_END_TIME")?,
            days_of_week,
            max_runs_per_day: env.number("SCHEDULE_MAX_RUNS_PER_DAY", 0),
            queue_capacity: env.number::<usize>("QUEUE_CAPACITY", 1_000).max(1),
        };

        let directories = DirectoryConfig {
            logs_dir: env.string("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            data_dir: env.string("DATA_DIR").unwrap_or_else(|| "data".to_string()),
            db_filename: env
                .string("DB_FILENAME")
                .unwrap_or_else(|| "jobs.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env.string("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        let timezone = match env.string("BOT_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                key: "BOT_TIMEZONE",
                value: raw,
            })?,
            None => Tz::UTC,
        };

        Ok(Self {
            telegram_bot_token,
            bot_username,
            admin_user_id,
            delivery_chat_id,
            source_chat_ids,
            filter,
            output,
            processing,
            directories,
            logging,
            timezone,
        })
    }
}

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value; blank counts as unset.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn list(&self, key: &str, separator: char) -> Vec<String> {
        self.string(key)
            .map(|value| {
                value
                    .split(separator)
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.string(key).and_then(|value| value.parse::<i64>().ok())
    }

    fn number<T: FromStr>(&self, key: &str, default: T) -> T {
        self.string(key)
            .and_then(|value| value.parse::<T>().ok())
            .unwrap_or(default)
    }

    fn decimal(&self, key: &str) -> Option<Decimal> {
        self.string(key)
            .and_then(|value| Decimal::from_str(&value.replace(['_', ' '], "")).ok())
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.string(key).map(|value| value.to_lowercase()).as_deref() {
            Some("1" | "true" | "yes" | "on") => true,
            Some("0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }

    fn time(&self, key: &'static str) -> Result<Option<NaiveTime>, ConfigError> {
        self.string(key)
            .map(|value| {
                NaiveTime::parse_from_str(&value, "%H:%M")
                    .map_err(|_| ConfigError::Invalid { key, value })
            })
            .transpose()
    }
}

fn parse_methods(raw: &str) -> Result<Vec<OutputMethod>, ConfigError> {
    let mut methods = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let method = part.parse::<OutputMethod>().map_err(|value| ConfigError::Invalid {
            key: "OUTPUT_METHODS",
            value,
        })?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    Ok(methods)
}

/// `0` is Monday, `6` is Sunday.
fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    let mut days = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let day = part
            .parse::<usize>()
            .ok()
            .and_then(|index| ALL_WEEKDAYS.get(index).copied())
            .ok_or_else(|| ConfigError::Invalid {
                key: "SCHEDULE_DAYS_OF_WEEK",
                value: part.to_string(),
            })?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert_eq!(
            config(&[]).err(),
            Some(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
        );
        assert_eq!(
            config(&[("TELEGRAM_BOT_TOKEN", "  ")]).err(),
            Some(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
        );
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("TELEGRAM_BOT_TOKEN", "token"), ("ADMIN_USER_ID", "42")])
            .expect("config");
        assert_eq!(config.delivery_chat_id, Some(42));
        assert!(config.source_chat_ids.is_empty());
        assert_eq!(config.filter.date_filter_hours, 24);
        assert!(config.filter.salary_bounds.is_unbounded());
        assert_eq!(
            config.output.methods,
            vec![OutputMethod::Telegram, OutputMethod::Database]
        );
        assert!(config.output.forward_original);
        assert_eq!(config.output.delivery_delay, Duration::from_millis(1_500));
        assert_eq!(config.processing.mode, ProcessingMode::Continuous);
        assert_eq!(config.processing.cron_specs, vec![DEFAULT_SCAN_CRON]);
        assert_eq!(config.processing.days_of_week.len(), 7);
        assert_eq!(config.processing.queue_capacity, 1_000);
        assert_eq!(config.directories.db_filename, "jobs.db");
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(
            config.filter.rules.languages,
            vec![Language::en(), Language::ru()]
        );
    }

    #[test]
    fn filter_and_schedule_values_parse() {
        let config = config(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("SOURCE_CHAT_IDS", "-1001, -1002, junk"),
            ("FILTER_KEYWORDS", "Python, \"go\", python"),
            ("EXCLUDE_KEYWORDS", "php"),
            ("REQUIRE_JUNIOR", "yes"),
            ("FILTER_LANGUAGES", "en"),
            ("DATE_FILTER_HOURS", "0"),
            ("MIN_SALARY", "60 000"),
            ("OUTPUT_METHODS", "file, telegram, file"),
            ("FORWARD_ORIGINAL", "false"),
            ("PROCESSING_MODE", "Scheduled"),
            ("SCAN_CRONS", "0 0 9 * * *; 0 0 18 * * *"),
            ("SCHEDULE_START_TIME", "09:00"),
            ("SCHEDULE_END_TIME", "18:30"),
            ("SCHEDULE_DAYS_OF_WEEK", "0,1,2,3,4"),
            ("SCHEDULE_MAX_RUNS_PER_DAY", "3"),
            ("BOT_TIMEZONE", "Europe/Moscow"),
        ])
        .expect("config");

        assert_eq!(config.source_chat_ids, vec![-1001, -1002]);
        assert!(config.is_source_chat(-1002));
        let labels: Vec<_> = config
            .filter
            .rules
            .include_keywords
            .iter()
            .map(|keyword| keyword.label().to_string())
            .collect();
        assert_eq!(labels, vec!["python", "go"]);
        assert!(config.filter.rules.require_junior);
        assert_eq!(config.filter.rules.languages, vec![Language::en()]);
        assert_eq!(config.filter.date_filter_hours, 0);
        assert_eq!(config.filter.salary_bounds.min, Some(Decimal::from(60_000)));
        assert_eq!(
            config.output.methods,
            vec![OutputMethod::File, OutputMethod::Telegram]
        );
        assert!(!config.output.forward_original);
        assert_eq!(config.processing.mode, ProcessingMode::Scheduled);
        assert_eq!(config.processing.cron_specs.len(), 2);
        assert_eq!(
            config.processing.start_time,
            NaiveTime::from_hms_opt(9, 0, 0)
        );
        assert_eq!(config.processing.days_of_week.last(), Some(&Weekday::Fri));
        assert_eq!(config.processing.max_runs_per_day, 3);
        assert_eq!(config.timezone, chrono_tz::Europe::Moscow);
    }

    #[test]
    fn strict_values_are_rejected() {
        let invalid = |key: &str, value: &str| {
            config(&[("TELEGRAM_BOT_TOKEN", "token"), (key, value)]).err()
        };
        assert!(matches!(
            invalid("OUTPUT_METHODS", "telegram,email"),
            Some(ConfigError::Invalid { key: "OUTPUT_METHODS", .. })
        ));
        assert!(matches!(
            invalid("PROCESSING_MODE", "sometimes"),
            Some(ConfigError::Invalid { key: "PROCESSING_MODE", .. })
        ));
        assert!(matches!(
            invalid("SCHEDULE_START_TIME", "9am"),
            Some(ConfigError::Invalid { key: "SCHEDULE_START_TIME", .. })
        ));
        assert!(matches!(
            invalid("SCHEDULE_DAYS_OF_WEEK", "0,7"),
            Some(ConfigError::Invalid { key: "SCHEDULE_DAYS_OF_WEEK", .. })
        ));
        assert!(matches!(
            invalid("BOT_TIMEZONE", "Mars/Olympus"),
            Some(ConfigError::Invalid { key: "BOT_TIMEZONE", .. })
        ));
    }

    #[test]
    fn lenient_numbers_fall_back() {
        let config = config(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("DELIVERY_DELAY_MS", "soon"),
            ("QUEUE_CAPACITY", "0"),
            ("REQUIRE_JUNIOR", "maybe"),
        ])
        .expect("config");
        assert_eq!(config.output.delivery_delay, Duration::from_millis(1_500));
        assert_eq!(config.processing.queue_capacity, 1);
        assert!(!config.filter.rules.require_junior);
    }
}
