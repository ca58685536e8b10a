use std::str::FromStr;

use rust_decimal::Decimal;

use super::markers::{MarkerKind, MarkerRegistry};

const CLAUSE_BREAKS: &[char] = &[',', ';', '(', ')', '|', '•'];
const SENTENCE_BREAKS: &[char] = &['.', '!', '?', '\n'];
const GROUP_SEPARATORS: &[char] = &[',', '.', ' ', '\u{a0}', '\u{202f}', '\u{2009}', '\''];
/// A number glued to one of these is an id, handle, path or similar, not an amount.
const NOISE_PREFIXES: &[char] = &['/', '_', '#', '@', '\\', '№'];
const PHONE_JOINERS: &[char] = &[' ', '-', '(', ')', '.'];

/// A number as written, before any magnitude suffix is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub raw: Decimal,
    pub magnitude: u32,
    /// Four bare digits between 1900 and 2100.
    pub year_like: bool,
}

impl Amount {
    pub fn has_magnitude(&self) -> bool {
        self.magnitude > 1
    }

    pub fn scaled(&self, magnitude: u32) -> Option<Decimal> {
        self.raw.checked_mul(Decimal::from(magnitude))
    }

    pub fn value(&self) -> Option<Decimal> {
        self.scaled(self.magnitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Number(Amount),
    Marker(MarkerKind),
    Word,
    ClauseBreak,
    SentenceBreak,
}

/// Token over a char index range of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_break(&self) -> bool {
        matches!(self.kind, TokenKind::ClauseBreak | TokenKind::SentenceBreak)
    }
}

/// Lower-cases char by char so indices stay aligned with the source text.
pub fn lowercase_chars(text: &str) -> Vec<char> {
    text.chars()
        .map(|ch| {
            let lower = ch.to_lowercase().next().unwrap_or(ch);
            if lower == 'ё' {
                'е'
            } else {
                lower
            }
        })
        .collect()
}

pub fn tokenize(chars: &[char], registry: &MarkerRegistry) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let start = pos;

        let kind = if ch == '\n' {
            pos += 1;
            TokenKind::SentenceBreak
        } else if ch.is_whitespace() {
            pos += 1;
            continue;
        } else if ch.is_ascii_digit() {
            let glued = tokens
                .last()
                .is_some_and(|t| matches!(t.kind, TokenKind::Marker(_)) && t.end == pos);
            match registry.noise_end(chars, pos).filter(|_| !glued) {
                Some(end) => {
                    pos = end;
                    TokenKind::Word
                }
                None => {
                    let (kind, end) = read_number(chars, pos, registry, glued);
                    pos = end;
                    kind
                }
            }
        } else if let Some((marker, end)) = registry.match_at(chars, pos, false) {
            pos = end;
            TokenKind::Marker(marker)
        } else if SENTENCE_BREAKS.contains(&ch) {
            pos += 1;
            TokenKind::SentenceBreak
        } else if CLAUSE_BREAKS.contains(&ch) {
            pos += 1;
            TokenKind::ClauseBreak
        } else if ch.is_alphanumeric() {
            pos = run_end(chars, pos, char::is_alphanumeric);
            TokenKind::Word
        } else {
            pos += 1;
            continue;
        };

        tokens.push(Token {
            kind,
            start,
            end: pos,
        });
    }
    tokens
}

fn run_end(chars: &[char], from: usize, keep: impl Fn(char) -> bool) -> usize {
    chars[from..]
        .iter()
        .position(|ch| !keep(*ch))
        .map_or(chars.len(), |offset| from + offset)
}

fn digits_end(chars: &[char], from: usize) -> usize {
    run_end(chars, from, |ch| ch.is_ascii_digit())
}

fn read_number(
    chars: &[char],
    start: usize,
    registry: &MarkerRegistry,
    glued_to_marker: bool,
) -> (TokenKind, usize) {
    let prev = start.checked_sub(1).map(|i| chars[i]);
    if prev == Some('+') {
        return (TokenKind::Word, phone_end(chars, start));
    }
    let mut noise = prev.is_some_and(|ch| {
        NOISE_PREFIXES.contains(&ch) || (ch.is_alphabetic() && !glued_to_marker)
    });

    let mut pos = digits_end(chars, start);
    let mut integer: String = chars[start..pos].iter().collect();
    let first_group = integer.len();
    let mut grouped_by: Option<char> = None;
    let mut fraction: Option<String> = None;

    while let Some(&sep) = chars.get(pos) {
        if !GROUP_SEPARATORS.contains(&sep) {
            break;
        }
        let group_start = pos + 1;
        let group_end = digits_end(chars, group_start.min(chars.len()));
        let group_len = group_end.saturating_sub(group_start);
        if group_len == 0 {
            break;
        }
        if group_len == 3 && first_group <= 3 && grouped_by.map_or(true, |g| g == sep) {
            grouped_by = Some(sep);
            integer.extend(&chars[group_start..group_end]);
            pos = group_end;
            continue;
        }
        if matches!(sep, ',' | '.') && grouped_by != Some(sep) {
            fraction = Some(chars[group_start..group_end].iter().collect());
            pos = group_end;
        }
        break;
    }

    let mut magnitude = 1;
    let probe = if chars.get(pos) == Some(&' ') { pos + 1 } else { pos };
    if let Some((MarkerKind::Magnitude(factor), end)) = registry.match_at(chars, probe, true) {
        magnitude = factor;
        pos = end;
    }

    match chars.get(pos) {
        Some('%') => {
            noise = true;
            pos += 1;
        }
        Some(ch) if ch.is_alphabetic() && registry.match_at(chars, pos, false).is_none() => {
            noise = true;
            pos = run_end(chars, pos, char::is_alphanumeric);
        }
        _ => {}
    }

    if noise {
        return (TokenKind::Word, pos);
    }

    let literal = match &fraction {
        Some(fraction) => format!("{integer}.{fraction}"),
        None => integer.clone(),
    };
    let Ok(raw) = Decimal::from_str(&literal) else {
        return (TokenKind::Word, pos);
    };
    let year_like = grouped_by.is_none()
        && fraction.is_none()
        && magnitude == 1
        && integer.len() == 4
        && (Decimal::from(1900)..=Decimal::from(2100)).contains(&raw);

    (
        TokenKind::Number(Amount {
            raw,
            magnitude,
            year_like,
        }),
        pos,
    )
}

/// Swallows `+7 (999) 123-45-67` style sequences whole.
fn phone_end(chars: &[char], start: usize) -> usize {
    let mut pos = digits_end(chars, start);
    loop {
        let mut probe = pos;
        while probe < chars.len() && PHONE_JOINERS.contains(&chars[probe]) && probe - pos < 2 {
            probe += 1;
        }
        if probe > pos && chars.get(probe).is_some_and(|ch| ch.is_ascii_digit()) {
            pos = digits_end(chars, probe);
        } else {
            return pos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, SalaryPeriod};

    fn scan(text: &str) -> Vec<TokenKind> {
        let chars = lowercase_chars(text);
        tokenize(&chars, &MarkerRegistry::default())
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn numbers(text: &str) -> Vec<Decimal> {
        scan(text)
            .into_iter()
            .filter_map(|kind| match kind {
                TokenKind::Number(amount) => amount.value(),
                _ => None,
            })
            .collect()
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("decimal literal")
    }

    #[test]
    fn thousands_separators_by_group_width() {
        assert_eq!(numbers("50,000"), vec![dec("50000")]);
        assert_eq!(numbers("50.000"), vec![dec("50000")]);
        assert_eq!(numbers("100 000 000"), vec![dec("100000000")]);
        assert_eq!(numbers("1,500.50"), vec![dec("1500.50")]);
        assert_eq!(numbers("3.14"), vec![dec("3.14")]);
        assert_eq!(numbers("1,5"), vec![dec("1.5")]);
        assert_eq!(numbers("12345.678"), vec![dec("12345.678")]);
    }

    #[test]
    fn space_grouping_needs_short_leading_group() {
        assert_eq!(numbers("in 2024 500 people"), vec![dec("2024"), dec("500")]);
    }

    #[test]
    fn magnitude_suffixes() {
        assert_eq!(numbers("50k"), vec![dec("50000")]);
        assert_eq!(numbers("1.5k"), vec![dec("1500")]);
        assert_eq!(numbers("150 тыс."), vec![dec("150000")]);
        assert_eq!(numbers("200к"), vec![dec("200000")]);
        assert_eq!(numbers("2 млн"), vec![dec("2000000")]);
    }

    #[test]
    fn glued_numbers_are_noise() {
        assert!(numbers("python3 and web3").is_empty());
        assert!(numbers("t.me/c/2485256729/1/205").is_empty());
        assert!(numbers("call +7 (999) 123-45-67").is_empty());
        assert!(numbers("growth 50%").is_empty());
        assert!(numbers("3years, 2nd floor").is_empty());
    }

    #[test]
    fn markers_glued_to_numbers_still_resolve() {
        assert_eq!(
            scan("100руб"),
            vec![
                TokenKind::Number(Amount {
                    raw: dec("100"),
                    magnitude: 1,
                    year_like: false,
                }),
                TokenKind::Marker(MarkerKind::Currency(Currency::Rub)),
            ]
        );
        assert_eq!(numbers("usd100"), vec![dec("100")]);
    }

    #[test]
    fn breaks_and_periods() {
        let kinds = scan("$50/hour, remote.\nNext");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Marker(MarkerKind::Currency(Currency::Usd)),
                TokenKind::Number(Amount {
                    raw: dec("50"),
                    magnitude: 1,
                    year_like: false,
                }),
                TokenKind::Marker(MarkerKind::Period(SalaryPeriod::Hour)),
                TokenKind::ClauseBreak,
                TokenKind::Word,
                TokenKind::SentenceBreak,
                TokenKind::SentenceBreak,
                TokenKind::Word,
            ]
        );
    }

    #[test]
    fn years_are_flagged() {
        let kinds = scan("since 2019");
        assert!(matches!(
            &kinds[1],
            TokenKind::Number(Amount { year_like: true, .. })
        ));
        let kinds = scan("2,019");
        assert!(matches!(
            &kinds[0],
            TokenKind::Number(Amount { year_like: false, .. })
        ));
    }

    #[test]
    fn oversized_numbers_degrade_to_words() {
        assert!(numbers("123456789012345678901234567890123").is_empty());
        assert_eq!(numbers("$999999999999999"), vec![dec("999999999999999")]);
    }

    #[test]
    fn retirement_plan_names_are_words() {
        assert!(numbers("dental, 401k, gym").is_empty());
        assert!(numbers("401(k) match").is_empty());
        assert_eq!(numbers("$401k"), vec![dec("401000")]);
    }
}
