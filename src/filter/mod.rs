//! Decides whether a post is a relevant job advert.

pub mod config;
pub mod phrases;
pub mod text;

use once_cell::sync::Lazy;

use crate::domain::{FilterVerdict, VerdictReason};

pub use config::{FilterConfig, Keyword, Language};
pub use phrases::{PhraseGroup, PhraseLoadError, PhraseTables};

/// How far (in chars of normalized text) a role word may sit from a junior marker.
const JUNIOR_CONTEXT_WINDOW: usize = 40;
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '\n', ';'];

static BUILTIN: Lazy<KeywordFilter> = Lazy::new(KeywordFilter::default);

/// Evaluates `text` against `config` with the built-in phrase tables.
pub fn evaluate(text: &str, config: &FilterConfig) -> FilterVerdict {
    BUILTIN.evaluate(text, config)
}

#[derive(Debug, Clone)]
pub struct KeywordFilter {
    phrases: PhraseTables,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(PhraseTables::builtin())
    }
}

impl KeywordFilter {
    pub fn new(phrases: PhraseTables) -> Self {
        Self { phrases }
    }

    pub fn evaluate(&self, text: &str, config: &FilterConfig) -> FilterVerdict {
        let normalized = text::normalize(text);
        let languages = config.languages.as_slice();

        if config.exclude_resumes {
            if let Some(phrase) =
                self.phrases
                    .first_match(PhraseGroup::Resume, languages, &normalized)
            {
                return FilterVerdict::rejected(
                    VerdictReason::ExcludedResume,
                    Some(phrase.term().to_string()),
                );
            }
        }

        if config.exclude_senior {
            if let Some(phrase) =
                self.phrases
                    .first_match(PhraseGroup::Senior, languages, &normalized)
            {
                return FilterVerdict::rejected(
                    VerdictReason::ExcludedSenior,
                    Some(phrase.term().to_string()),
                );
            }
        }

        let junior = if config.require_junior {
            match self.junior_role(&normalized, config) {
                Some(found) => Some(found),
                None => return FilterVerdict::no_match(),
            }
        } else {
            None
        };

        if let Some(keyword) = config
            .exclude_keywords
            .iter()
            .find(|keyword| keyword.phrase().is_in(&normalized))
        {
            return FilterVerdict::rejected(
                VerdictReason::ExcludedKeyword,
                Some(keyword.label().to_string()),
            );
        }

        if config.include_keywords.is_empty() {
            return match junior {
                Some(found) => FilterVerdict::matched(vec![found]),
                None => FilterVerdict::no_match(),
            };
        }

        let has_role = self
            .phrases
            .first_match(PhraseGroup::Role, languages, &normalized)
            .is_some();
        let matched: Vec<String> = config
            .include_keywords
            .iter()
            .filter(|keyword| keyword.phrase().is_in(&normalized))
            .filter(|keyword| has_role || !self.is_gated(keyword, languages))
            .map(|keyword| keyword.label().to_string())
            .collect();

        if matched.is_empty() {
            FilterVerdict::no_match()
        } else {
            FilterVerdict::matched(matched)
        }
    }

    /// Junior marker with a developer/engineer word close by in the same sentence,
    /// rendered as the text between (and including) the two.
    fn junior_role(&self, normalized: &str, config: &FilterConfig) -> Option<String> {
        let languages = config.languages.as_slice();
        let juniors = self
            .phrases
            .spans(PhraseGroup::Junior, languages, normalized);
        if juniors.is_empty() {
            return None;
        }
        let roles = self.phrases.spans(PhraseGroup::Role, languages, normalized);

        juniors.iter().find_map(|(junior, _)| {
            roles.iter().find_map(|(role, _)| {
                let (gap, whole) = if role.start >= junior.end {
                    (junior.end..role.start, junior.start..role.end)
                } else if junior.start >= role.end {
                    (role.end..junior.start, role.start..junior.end)
                } else {
                    return None;
                };
                let between = &normalized[gap];
                if between.chars().count() > JUNIOR_CONTEXT_WINDOW
                    || between.contains(SENTENCE_TERMINATORS)
                {
                    return None;
                }
                Some(normalized[whole].to_string())
            })
        })
    }

    fn is_gated(&self, keyword: &Keyword, languages: &[Language]) -> bool {
        self.phrases
            .first_match(PhraseGroup::Gated, languages, keyword.phrase().term())
            .is_some()
    }
}
