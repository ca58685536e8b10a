//! Salary extraction over free-form posting text.
//!
//! Text is tokenized into numbers, currency/period/magnitude markers and breaks,
//! then numbers are paired into ranges or kept as single amounts and annotated with
//! the nearest currency and period in scope.

pub mod markers;
pub mod tokenizer;

use std::iter;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tracing::trace;

use crate::domain::{dedup_mentions, Currency, SalaryMention, SalaryPeriod};

pub use markers::{MarkerKind, MarkerLoadError, MarkerRegistry, MarkerTables};
use tokenizer::{lowercase_chars, tokenize, Amount, Token, TokenKind};

/// Bare numbers below this are counts, not pay.
const MIN_BARE_AMOUNT: u32 = 100;
/// A currency closer than this many chars belongs to the number.
const ADJACENT_GAP: usize = 2;
/// How far back a weak separator looks for `between`/`from`.
const OPENER_LOOKBEHIND: usize = 4;
/// A one-sided magnitude carries over to a bound written below this.
const MAGNITUDE_CARRY_CEILING: u32 = 1_000;

static BUILTIN: Lazy<SalaryExtractor> = Lazy::new(SalaryExtractor::default);

/// Extracts salary mentions with the built-in marker tables.
pub fn extract_salaries(text: &str) -> Vec<SalaryMention> {
    BUILTIN.extract(text)
}

#[derive(Debug, Clone, Default)]
pub struct SalaryExtractor {
    registry: MarkerRegistry,
}

impl SalaryExtractor {
    pub fn new(registry: MarkerRegistry) -> Self {
        Self { registry }
    }

    /// All salary mentions in `text`, in order of appearance, without exact duplicates.
    pub fn extract(&self, text: &str) -> Vec<SalaryMention> {
        if !text.chars().any(|ch| ch.is_ascii_digit()) {
            return Vec::new();
        }

        let chars = lowercase_chars(text);
        let scan = Scan {
            tokens: tokenize(&chars, &self.registry),
            text,
            offsets: text
                .char_indices()
                .map(|(offset, _)| offset)
                .chain(iter::once(text.len()))
                .collect(),
        };

        let mut consumed = vec![false; scan.tokens.len()];
        let mut mentions = Vec::new();
        for index in 0..scan.tokens.len() {
            if consumed[index] || scan.amount(index).is_none() {
                continue;
            }
            if let Some((mention, last)) = scan.range_at(index, &consumed) {
                consumed[index] = true;
                consumed[last] = true;
                mentions.push(mention);
            } else if let Some(mention) = scan.single_at(index) {
                consumed[index] = true;
                mentions.push(mention);
            }
        }

        trace!(
            target: "salary",
            found = mentions.len(),
            "Salary scan finished"
        );
        dedup_mentions(mentions)
    }
}

struct Scan<'a> {
    tokens: Vec<Token>,
    text: &'a str,
    /// Byte offset of every char index, plus one past the end.
    offsets: Vec<usize>,
}

impl Scan<'_> {
    fn amount(&self, index: usize) -> Option<&Amount> {
        match &self.tokens.get(index)?.kind {
            TokenKind::Number(amount) => Some(amount),
            _ => None,
        }
    }

    fn currency(&self, index: usize) -> Option<Currency> {
        match self.tokens.get(index)?.kind {
            TokenKind::Marker(MarkerKind::Currency(currency)) => Some(currency),
            _ => None,
        }
    }

    fn period(&self, index: usize) -> Option<SalaryPeriod> {
        match self.tokens.get(index)?.kind {
            TokenKind::Marker(MarkerKind::Period(period)) => Some(period),
            _ => None,
        }
    }

    fn gap(&self, left: usize, right: usize) -> usize {
        self.tokens[right]
            .start
            .saturating_sub(self.tokens[left].end)
    }

    /// Currency written right before the number at `index`, unless it trails an
    /// earlier number.
    fn leading_currency(&self, index: usize) -> Option<(Currency, usize, usize)> {
        let prev = index.checked_sub(1)?;
        let gap = self.gap(prev, index);
        if gap > ADJACENT_GAP {
            return None;
        }
        let currency = self.currency(prev)?;
        let claimed = prev
            .checked_sub(1)
            .is_some_and(|owner| self.amount(owner).is_some() && self.gap(owner, prev) <= ADJACENT_GAP);
        (!claimed).then_some((currency, prev, gap))
    }

    fn trailing_currency(&self, index: usize) -> Option<(Currency, usize, usize)> {
        let next = index + 1;
        if next >= self.tokens.len() {
            return None;
        }
        let gap = self.gap(index, next);
        if gap > ADJACENT_GAP {
            return None;
        }
        self.currency(next).map(|currency| (currency, next, gap))
    }

    /// Currency token written directly before or after the number at `index`.
    /// The closer side wins; on a tie the trailing marker does.
    fn adjacent_currency(&self, index: usize) -> Option<(Currency, usize)> {
        let chosen = match (self.leading_currency(index), self.trailing_currency(index)) {
            (Some(before), Some(after)) if before.2 < after.2 => before,
            (_, Some(after)) => after,
            (Some(before), None) => before,
            (None, None) => return None,
        };
        Some((chosen.0, chosen.1))
    }

    /// Nearest currency in the sentence holding tokens `first..=last`.
    fn sentence_currency(&self, first: usize, last: usize) -> Option<Currency> {
        let is_sentence_end = |token: &Token| token.kind == TokenKind::SentenceBreak;
        let from = self.tokens[..first]
            .iter()
            .rposition(is_sentence_end)
            .map_or(0, |pos| pos + 1);
        let to = self.tokens[last + 1..]
            .iter()
            .position(is_sentence_end)
            .map_or(self.tokens.len(), |pos| last + 1 + pos);

        let (start, end) = (self.tokens[first].start, self.tokens[last].end);
        (from..to)
            .filter(|&index| index < first || index > last)
            .filter_map(|index| {
                let currency = self.currency(index)?;
                let token = &self.tokens[index];
                let distance = if token.end <= start {
                    start - token.end
                } else {
                    token.start.saturating_sub(end)
                };
                Some((distance, currency))
            })
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, currency)| currency)
    }

    /// First period after the mention in its clause, else the closest one before it.
    fn clause_period(&self, first: usize, last: usize) -> SalaryPeriod {
        let after = self.tokens[last + 1..]
            .iter()
            .take_while(|token| !token.is_break())
            .count();
        let forward = (last + 1..last + 1 + after).find_map(|index| self.period(index));
        forward
            .or_else(|| {
                (0..first)
                    .rev()
                    .take_while(|&index| !self.tokens[index].is_break())
                    .find_map(|index| self.period(index))
            })
            .unwrap_or(SalaryPeriod::Unspecified)
    }

    fn opener_before(&self, index: usize) -> bool {
        (0..index)
            .rev()
            .take(OPENER_LOOKBEHIND)
            .take_while(|&prev| !self.tokens[prev].is_break())
            .any(|prev| self.tokens[prev].kind == TokenKind::Marker(MarkerKind::RangeOpener))
    }

    fn raw_text(&self, first: usize, last: usize) -> String {
        let start = self.offsets[self.tokens[first].start];
        let end = self.offsets[self.tokens[last].end];
        self.text[start..end].trim().to_string()
    }

    /// Token span of a mention widened to the currency written next to it.
    fn span(&self, first: usize, last: usize) -> (usize, usize) {
        let start = self
            .leading_currency(first)
            .map_or(first, |(_, prev, _)| prev);
        let end = self
            .trailing_currency(last)
            .map_or(last, |(_, next, _)| next);
        (start, end)
    }

    fn range_at(&self, index: usize, consumed: &[bool]) -> Option<(SalaryMention, usize)> {
        let low = self.amount(index)?;

        let mut separator = index + 1;
        if self.currency(separator).is_some() && self.gap(index, separator) <= ADJACENT_GAP {
            separator += 1;
        }
        let weak = match self.tokens.get(separator)?.kind {
            TokenKind::Marker(MarkerKind::RangeSeparator { weak }) => weak,
            _ => return None,
        };
        if weak && !self.opener_before(index) {
            return None;
        }

        let mut upper = separator + 1;
        if self.currency(upper).is_some() {
            upper += 1;
        }
        let high = self.amount(upper)?;
        if consumed.get(upper).copied().unwrap_or(true) {
            return None;
        }

        let ceiling = Decimal::from(MAGNITUDE_CARRY_CEILING);
        let (low_magnitude, high_magnitude) = match (low.has_magnitude(), high.has_magnitude()) {
            (true, false) if high.raw < ceiling => (low.magnitude, low.magnitude),
            (false, true) if low.raw < ceiling => (high.magnitude, high.magnitude),
            _ => (low.magnitude, high.magnitude),
        };
        let first = low.scaled(low_magnitude)?;
        let second = high.scaled(high_magnitude)?;

        let explicit = self
            .adjacent_currency(index)
            .or_else(|| self.adjacent_currency(upper))
            .map(|(currency, _)| currency);
        let suffixed = low_magnitude > 1 || high_magnitude > 1;
        if explicit.is_none() && !suffixed && !(plausible_bare(low) && plausible_bare(high)) {
            return None;
        }

        let (min_amount, max_amount) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        let (start, end) = self.span(index, upper);
        let mention = SalaryMention {
            min_amount: min_amount.normalize(),
            max_amount: max_amount.normalize(),
            is_range: true,
            currency: explicit
                .or_else(|| self.sentence_currency(index, upper))
                .unwrap_or(Currency::Unknown),
            period: self.clause_period(index, upper),
            raw_text: self.raw_text(start, end),
        };
        Some((mention, upper))
    }

    fn single_at(&self, index: usize) -> Option<SalaryMention> {
        let amount = self.amount(index)?;
        let explicit = self.adjacent_currency(index).map(|(currency, _)| currency);
        if explicit.is_none() && !amount.has_magnitude() && !plausible_bare(amount) {
            return None;
        }
        let value = amount.value()?.normalize();
        let (start, end) = self.span(index, index);
        Some(SalaryMention {
            min_amount: value,
            max_amount: value,
            is_range: false,
            currency: explicit
                .or_else(|| self.sentence_currency(index, index))
                .unwrap_or(Currency::Unknown),
            period: self.clause_period(index, index),
            raw_text: self.raw_text(start, end),
        })
    }
}

fn plausible_bare(amount: &Amount) -> bool {
    !amount.year_like && amount.raw >= Decimal::from(MIN_BARE_AMOUNT)
}
