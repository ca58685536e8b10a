use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Currency, SalaryPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Currency(Currency),
    Period(SalaryPeriod),
    /// Multiplier suffix such as `k` or `тыс`; only meaningful right after a number.
    Magnitude(u32),
    /// `weak` separators (`and`) only join a range after an opener (`between`).
    RangeSeparator { weak: bool },
    RangeOpener,
}

const CURRENCIES: &[(&str, Currency)] = &[
    ("$", Currency::Usd),
    ("us$", Currency::Usd),
    ("usd", Currency::Usd),
    ("dollar", Currency::Usd),
    ("dollars", Currency::Usd),
    ("долларов", Currency::Usd),
    ("доллара", Currency::Usd),
    ("доллар", Currency::Usd),
    ("€", Currency::Eur),
    ("eur", Currency::Eur),
    ("euro", Currency::Eur),
    ("euros", Currency::Eur),
    ("евро", Currency::Eur),
    ("£", Currency::Gbp),
    ("gbp", Currency::Gbp),
    ("pound", Currency::Gbp),
    ("pounds", Currency::Gbp),
    ("фунтов", Currency::Gbp),
    ("₽", Currency::Rub),
    ("rub", Currency::Rub),
    ("rur", Currency::Rub),
    ("руб", Currency::Rub),
    ("руб.", Currency::Rub),
    ("рубль", Currency::Rub),
    ("рубля", Currency::Rub),
    ("рублей", Currency::Rub),
    ("₴", Currency::Uah),
    ("uah", Currency::Uah),
    ("грн", Currency::Uah),
    ("грн.", Currency::Uah),
    ("гривна", Currency::Uah),
    ("гривны", Currency::Uah),
    ("гривен", Currency::Uah),
    ("гривень", Currency::Uah),
    ("₸", Currency::Kzt),
    ("kzt", Currency::Kzt),
    ("тенге", Currency::Kzt),
    ("¥", Currency::Jpy),
    ("jpy", Currency::Jpy),
    ("yen", Currency::Jpy),
    ("₹", Currency::Inr),
    ("inr", Currency::Inr),
    ("rupees", Currency::Inr),
];

const PERIODS: &[(&str, SalaryPeriod)] = &[
    ("/hour", SalaryPeriod::Hour),
    ("/hr", SalaryPeriod::Hour),
    ("/h", SalaryPeriod::Hour),
    ("per hour", SalaryPeriod::Hour),
    ("an hour", SalaryPeriod::Hour),
    ("hourly", SalaryPeriod::Hour),
    ("в час", SalaryPeriod::Hour),
    ("/час", SalaryPeriod::Hour),
    ("/day", SalaryPeriod::Day),
    ("per day", SalaryPeriod::Day),
    ("a day", SalaryPeriod::Day),
    ("daily", SalaryPeriod::Day),
    ("в день", SalaryPeriod::Day),
    ("/день", SalaryPeriod::Day),
    ("/week", SalaryPeriod::Week),
    ("per week", SalaryPeriod::Week),
    ("a week", SalaryPeriod::Week),
    ("weekly", SalaryPeriod::Week),
    ("в неделю", SalaryPeriod::Week),
    ("/month", SalaryPeriod::Month),
    ("/mo", SalaryPeriod::Month),
    ("per month", SalaryPeriod::Month),
    ("a month", SalaryPeriod::Month),
    ("monthly", SalaryPeriod::Month),
    ("в месяц", SalaryPeriod::Month),
    ("/мес", SalaryPeriod::Month),
    ("/мес.", SalaryPeriod::Month),
    ("в мес", SalaryPeriod::Month),
    ("в мес.", SalaryPeriod::Month),
    ("ежемесячно", SalaryPeriod::Month),
    ("/year", SalaryPeriod::Year),
    ("/yr", SalaryPeriod::Year),
    ("per year", SalaryPeriod::Year),
    ("per annum", SalaryPeriod::Year),
    ("a year", SalaryPeriod::Year),
    ("annually", SalaryPeriod::Year),
    ("annual", SalaryPeriod::Year),
    ("yearly", SalaryPeriod::Year),
    ("pa", SalaryPeriod::Year),
    ("p.a.", SalaryPeriod::Year),
    ("в год", SalaryPeriod::Year),
    ("/год", SalaryPeriod::Year),
];

const MAGNITUDES: &[(&str, u32)] = &[
    ("k", 1_000),
    ("к", 1_000),
    ("thousand", 1_000),
    ("тыс", 1_000),
    ("тыс.", 1_000),
    ("тысяч", 1_000),
    ("mln", 1_000_000),
    ("млн", 1_000_000),
    ("млн.", 1_000_000),
];

const RANGE_SEPARATORS: &[&str] = &["-", "–", "—", "~", "to", "до", "по"];
const WEAK_RANGE_SEPARATORS: &[&str] = &["and", "и"];
const RANGE_OPENERS: &[&str] = &["between", "from", "от", "между", "с"];
/// Number-led terms that never denote pay.
const NOISE_TERMS: &[&str] = &["401k", "401(k)", "403b", "403(b)", "457b", "457(b)"];

#[derive(Debug, Error)]
pub enum MarkerLoadError {
    #[error("failed to read salary marker file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid salary marker file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Marker tables as data. The JSON override file has the same shape:
/// `{"currencies": {"бакс": "USD"}, "periods": {"per shift": "day"}}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerTables {
    pub currencies: BTreeMap<String, Currency>,
    pub periods: BTreeMap<String, SalaryPeriod>,
    pub magnitudes: BTreeMap<String, u32>,
    pub range_separators: Vec<String>,
    pub weak_range_separators: Vec<String>,
    pub range_openers: Vec<String>,
    pub noise_terms: Vec<String>,
}

impl MarkerTables {
    pub fn builtin() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            currencies: CURRENCIES
                .iter()
                .map(|(marker, currency)| (marker.to_string(), *currency))
                .collect(),
            periods: PERIODS
                .iter()
                .map(|(marker, period)| (marker.to_string(), *period))
                .collect(),
            magnitudes: MAGNITUDES
                .iter()
                .map(|(marker, factor)| (marker.to_string(), *factor))
                .collect(),
            range_separators: owned(RANGE_SEPARATORS),
            weak_range_separators: owned(WEAK_RANGE_SEPARATORS),
            range_openers: owned(RANGE_OPENERS),
            noise_terms: owned(NOISE_TERMS),
        }
    }

    pub fn merge(&mut self, other: MarkerTables) {
        self.currencies.extend(other.currencies);
        self.periods.extend(other.periods);
        self.magnitudes.extend(other.magnitudes);
        self.range_separators.extend(other.range_separators);
        self.weak_range_separators
            .extend(other.weak_range_separators);
        self.range_openers.extend(other.range_openers);
        self.noise_terms.extend(other.noise_terms);
    }
}

#[derive(Debug, Clone)]
struct Marker {
    chars: Vec<char>,
    kind: MarkerKind,
}

/// Compiled marker tables, longest marker first so `per annum` wins over `pa`.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    markers: Vec<Marker>,
    noise: Vec<Vec<char>>,
}

impl Default for MarkerRegistry {
    fn default() -> Self {
        Self::from_tables(MarkerTables::builtin())
    }
}

impl MarkerRegistry {
    pub fn from_tables(tables: MarkerTables) -> Self {
        let mut markers = Vec::new();
        let mut push = |raw: &str, kind: MarkerKind| {
            let chars: Vec<char> = crate::filter::text::normalize(raw.trim()).chars().collect();
            if !chars.is_empty() {
                markers.push(Marker { chars, kind });
            }
        };
        for (raw, currency) in &tables.currencies {
            push(raw, MarkerKind::Currency(*currency));
        }
        for (raw, period) in &tables.periods {
            push(raw, MarkerKind::Period(*period));
        }
        for (raw, factor) in &tables.magnitudes {
            push(raw, MarkerKind::Magnitude(*factor));
        }
        for raw in &tables.range_separators {
            push(raw, MarkerKind::RangeSeparator { weak: false });
        }
        for raw in &tables.weak_range_separators {
            push(raw, MarkerKind::RangeSeparator { weak: true });
        }
        for raw in &tables.range_openers {
            push(raw, MarkerKind::RangeOpener);
        }
        markers.sort_by(|a, b| b.chars.len().cmp(&a.chars.len()));

        let mut noise: Vec<Vec<char>> = tables
            .noise_terms
            .iter()
            .map(|raw| crate::filter::text::normalize(raw.trim()).chars().collect::<Vec<_>>())
            .filter(|chars| !chars.is_empty())
            .collect();
        noise.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { markers, noise }
    }

    /// Built-in tables, extended by the JSON file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, MarkerLoadError> {
        let mut tables = MarkerTables::builtin();
        if let Some(path) = path {
            let display = path.display().to_string();
            let raw = fs::read_to_string(path).map_err(|source| MarkerLoadError::Io {
                path: display.clone(),
                source,
            })?;
            let extra: MarkerTables =
                serde_json::from_str(&raw).map_err(|source| MarkerLoadError::Parse {
                    path: display,
                    source,
                })?;
            tables.merge(extra);
        }
        Ok(Self::from_tables(tables))
    }

    /// Longest marker starting at `pos` in lower-cased `chars`.
    ///
    /// Alphabetic edges of a marker must not run into other letters; digits are
    /// allowed so `50k` and `50usd` still resolve. `after_number` enables magnitude
    /// suffixes, which are ignored elsewhere.
    pub fn match_at(&self, chars: &[char], pos: usize, after_number: bool) -> Option<(MarkerKind, usize)> {
        self.markers
            .iter()
            .filter(|marker| after_number || !matches!(marker.kind, MarkerKind::Magnitude(_)))
            .find(|marker| {
                let end = pos + marker.chars.len();
                end <= chars.len()
                    && chars[pos..end] == marker.chars[..]
                    && left_edge_ok(chars, pos, &marker.chars)
                    && right_edge_ok(chars, end, &marker.chars)
            })
            .map(|marker| (marker.kind, pos + marker.chars.len()))
    }

    /// End of a noise term such as `401k` starting at `pos`, as a standalone word.
    pub fn noise_end(&self, chars: &[char], pos: usize) -> Option<usize> {
        if pos > 0 && chars[pos - 1].is_alphanumeric() {
            return None;
        }
        self.noise
            .iter()
            .find(|term| {
                let end = pos + term.len();
                end <= chars.len()
                    && chars[pos..end] == term[..]
                    && chars.get(end).map_or(true, |ch| !ch.is_alphanumeric())
            })
            .map(|term| pos + term.len())
    }
}

fn left_edge_ok(chars: &[char], pos: usize, marker: &[char]) -> bool {
    if !marker.first().is_some_and(|ch| ch.is_alphabetic()) || pos == 0 {
        return true;
    }
    !chars[pos - 1].is_alphabetic()
}

fn right_edge_ok(chars: &[char], end: usize, marker: &[char]) -> bool {
    if !marker.last().is_some_and(|ch| ch.is_alphabetic()) {
        return true;
    }
    chars.get(end).map_or(true, |ch| !ch.is_alphabetic())
}
