use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Rub,
    Uah,
    Kzt,
    Jpy,
    Inr,
    Unknown,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Rub => "RUB",
            Currency::Uah => "UAH",
            Currency::Kzt => "KZT",
            Currency::Jpy => "JPY",
            Currency::Inr => "INR",
            Currency::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hour,
    Day,
    Week,
    Month,
    Year,
    Unspecified,
}

impl SalaryPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            SalaryPeriod::Hour => "hourly",
            SalaryPeriod::Day => "daily",
            SalaryPeriod::Week => "weekly",
            SalaryPeriod::Month => "monthly",
            SalaryPeriod::Year => "yearly",
            SalaryPeriod::Unspecified => "unspecified",
        }
    }

    /// Multiplier that turns an amount for this period into a yearly one.
    pub fn yearly_factor(&self) -> u32 {
        match self {
            SalaryPeriod::Hour => 2080,
            SalaryPeriod::Day => 260,
            SalaryPeriod::Week => 52,
            SalaryPeriod::Month => 12,
            SalaryPeriod::Year | SalaryPeriod::Unspecified => 1,
        }
    }
}

/// One salary statement found in free text.
///
/// `max_amount` equals `min_amount` for single values and is never below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryMention {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub is_range: bool,
    pub currency: Currency,
    pub period: SalaryPeriod,
    pub raw_text: String,
}

impl SalaryMention {
    pub fn to_yearly(&self) -> SalaryMention {
        let factor = Decimal::from(self.period.yearly_factor());
        let period = match self.period {
            SalaryPeriod::Unspecified => SalaryPeriod::Unspecified,
            _ => SalaryPeriod::Year,
        };
        SalaryMention {
            min_amount: self.min_amount.saturating_mul(factor),
            max_amount: self.max_amount.saturating_mul(factor),
            period,
            ..self.clone()
        }
    }

    fn same_statement(&self, other: &SalaryMention) -> bool {
        self.min_amount == other.min_amount
            && self.max_amount == other.max_amount
            && self.is_range == other.is_range
            && self.currency == other.currency
            && self.period == other.period
    }
}

pub fn dedup_mentions(mentions: Vec<SalaryMention>) -> Vec<SalaryMention> {
    let mut unique: Vec<SalaryMention> = Vec::with_capacity(mentions.len());
    for mention in mentions {
        if !unique.iter().any(|seen| seen.same_statement(&mention)) {
            unique.push(mention);
        }
    }
    unique
}

impl fmt::Display for SalaryMention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_range {
            write!(
                f,
                "{}-{}",
                self.min_amount.normalize(),
                self.max_amount.normalize()
            )?;
        } else {
            write!(f, "{}", self.min_amount.normalize())?;
        }
        if self.currency != Currency::Unknown {
            write!(f, " {}", self.currency.code())?;
        }
        if self.period != SalaryPeriod::Unspecified {
            write!(f, " ({})", self.period.label())?;
        }
        Ok(())
    }
}

/// Yearly salary bounds a job has to overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalaryBounds {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl SalaryBounds {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn admits(&self, mention: &SalaryMention) -> bool {
        let yearly = mention.to_yearly();
        if let Some(min) = self.min {
            if yearly.max_amount < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if yearly.min_amount > max {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(amount: i64, period: SalaryPeriod) -> SalaryMention {
        SalaryMention {
            min_amount: Decimal::from(amount),
            max_amount: Decimal::from(amount),
            is_range: false,
            currency: Currency::Usd,
            period,
            raw_text: String::new(),
        }
    }

    #[test]
    fn yearly_normalization_factors() {
        let cases = [
            (25, SalaryPeriod::Hour, 52_000),
            (200, SalaryPeriod::Day, 52_000),
            (1000, SalaryPeriod::Week, 52_000),
            (4000, SalaryPeriod::Month, 48_000),
            (50_000, SalaryPeriod::Year, 50_000),
        ];
        for (amount, period, expected) in cases {
            let yearly = single(amount, period).to_yearly();
            assert_eq!(yearly.min_amount, Decimal::from(expected), "{period:?}");
            assert_eq!(yearly.period, SalaryPeriod::Year);
        }
    }

    #[test]
    fn bounds_compare_yearly_amounts() {
        let salaries = [
            single(30_000, SalaryPeriod::Year),
            single(50_000, SalaryPeriod::Year),
            single(80_000, SalaryPeriod::Year),
        ];
        let min_only = SalaryBounds {
            min: Some(Decimal::from(40_000)),
            max: None,
        };
        let max_only = SalaryBounds {
            min: None,
            max: Some(Decimal::from(60_000)),
        };
        let both = SalaryBounds {
            min: Some(Decimal::from(40_000)),
            max: Some(Decimal::from(60_000)),
        };
        assert_eq!(salaries.iter().filter(|s| min_only.admits(s)).count(), 2);
        assert_eq!(salaries.iter().filter(|s| max_only.admits(s)).count(), 2);
        assert_eq!(salaries.iter().filter(|s| both.admits(s)).count(), 1);
        assert!(both.admits(&single(4_000, SalaryPeriod::Month)));
    }

    #[test]
    fn display_formats_ranges_and_singles() {
        let mut range = single(50_000, SalaryPeriod::Year);
        range.max_amount = Decimal::from(80_000);
        range.is_range = true;
        assert_eq!(range.to_string(), "50000-80000 USD (yearly)");

        let mut bare = single(120_000, SalaryPeriod::Unspecified);
        bare.currency = Currency::Unknown;
        assert_eq!(bare.to_string(), "120000");
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let a = single(50_000, SalaryPeriod::Year);
        let b = single(60_000, SalaryPeriod::Year);
        let deduped = dedup_mentions(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(deduped, vec![a, b]);
    }
}
