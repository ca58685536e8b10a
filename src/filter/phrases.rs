use std::{collections::BTreeMap, fs, ops::Range, path::Path};

use serde::Deserialize;
use thiserror::Error;

use super::{config::Language, text::Phrase};

/// Phrase lists the keyword filter consults, keyed by language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhraseGroup {
    /// The post is somebody's CV rather than a vacancy.
    Resume,
    Senior,
    Junior,
    /// Developer/engineer context words.
    Role,
    /// Terms only relevant next to a role word (web3, blockchain, ...).
    Gated,
}

const DEFAULT_PHRASES: &[(PhraseGroup, &str, &[&str])] = &[
    (
        PhraseGroup::Resume,
        "en",
        &[
            "resume",
            "résumé",
            "cv",
            "curriculum vitae",
            "looking for a job",
            "looking for work",
            "open to work",
            "seeking a position",
        ],
    ),
    (
        PhraseGroup::Resume,
        "ru",
        &["резюме", "ищу работу", "рассмотрю предложения", "соискатель"],
    ),
    (
        PhraseGroup::Senior,
        "en",
        &[
            "senior",
            "sr",
            "sr.",
            "lead",
            "tech lead",
            "team lead",
            "principal",
            "staff engineer",
            "head of",
            "architect",
        ],
    ),
    (
        PhraseGroup::Senior,
        "ru",
        &[
            "сеньор*",
            "синьор*",
            "старший",
            "старшего",
            "ведущий",
            "ведущего",
            "лид",
            "тимлид*",
            "техлид*",
            "принципал*",
            "архитектор*",
        ],
    ),
    (
        PhraseGroup::Junior,
        "en",
        &[
            "junior",
            "jr",
            "jr.",
            "entry level",
            "entry-level",
            "intern",
            "internship",
            "trainee",
            "graduate",
        ],
    ),
    (
        PhraseGroup::Junior,
        "ru",
        &["джун*", "джуниор*", "младший", "младшего", "стажер*", "начинающ*"],
    ),
    (
        PhraseGroup::Role,
        "en",
        &[
            "developer*",
            "engineer*",
            "programmer*",
            "dev",
            "devs",
            "swe",
            "coder*",
        ],
    ),
    (
        PhraseGroup::Role,
        "ru",
        &["разработчик*", "программист*", "инженер*", "девелопер*"],
    ),
    (
        PhraseGroup::Gated,
        "en",
        &[
            "web3",
            "blockchain",
            "crypto*",
            "defi",
            "nft*",
            "dapp*",
            "smart contract*",
            "token*",
        ],
    ),
    (
        PhraseGroup::Gated,
        "ru",
        &["блокчейн*", "крипт*", "смарт-контракт*", "токен*"],
    ),
];

#[derive(Debug, Error)]
pub enum PhraseLoadError {
    #[error("failed to read phrase file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid phrase file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON shape of a phrase override file:
/// `{"senior": {"en": ["director"]}, "role": {"de": ["entwickler*"]}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PhraseFile {
    resume: BTreeMap<Language, Vec<String>>,
    senior: BTreeMap<Language, Vec<String>>,
    junior: BTreeMap<Language, Vec<String>>,
    role: BTreeMap<Language, Vec<String>>,
    gated: BTreeMap<Language, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct PhraseTables {
    groups: BTreeMap<(PhraseGroup, Language), Vec<Phrase>>,
}

impl PhraseTables {
    pub fn builtin() -> Self {
        let mut tables = Self::default();
        for (group, language, phrases) in DEFAULT_PHRASES {
            let language: Language = language.parse().unwrap_or_else(|_| Language::en());
            tables.extend(*group, language, phrases.iter().copied());
        }
        tables
    }

    /// Built-in tables, extended by the JSON file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, PhraseLoadError> {
        let mut tables = Self::builtin();
        if let Some(path) = path {
            let display = path.display().to_string();
            let raw = fs::read_to_string(path).map_err(|source| PhraseLoadError::Io {
                path: display.clone(),
                source,
            })?;
            tables
                .merge_json(&raw)
                .map_err(|source| PhraseLoadError::Parse {
                    path: display,
                    source,
                })?;
        }
        Ok(tables)
    }

    pub fn merge_json(&mut self, raw: &str) -> Result<(), serde_json::Error> {
        let file: PhraseFile = serde_json::from_str(raw)?;
        let sections = [
            (PhraseGroup::Resume, file.resume),
            (PhraseGroup::Senior, file.senior),
            (PhraseGroup::Junior, file.junior),
            (PhraseGroup::Role, file.role),
            (PhraseGroup::Gated, file.gated),
        ];
        for (group, by_language) in sections {
            for (language, phrases) in by_language {
                self.extend(group, language, phrases.iter().map(String::as_str));
            }
        }
        Ok(())
    }

    fn extend<'a>(
        &mut self,
        group: PhraseGroup,
        language: Language,
        phrases: impl IntoIterator<Item = &'a str>,
    ) {
        let entry = self.groups.entry((group, language)).or_default();
        for phrase in phrases.into_iter().map(Phrase::from_table) {
            if !phrase.is_empty() && !entry.contains(&phrase) {
                entry.push(phrase);
            }
        }
    }

    pub fn phrases<'a>(
        &'a self,
        group: PhraseGroup,
        languages: &'a [Language],
    ) -> impl Iterator<Item = &'a Phrase> + 'a {
        languages
            .iter()
            .filter_map(move |language| self.groups.get(&(group, language.clone())))
            .flatten()
    }

    /// First phrase of `group` (table order) present in `haystack`.
    pub fn first_match<'a>(
        &'a self,
        group: PhraseGroup,
        languages: &'a [Language],
        haystack: &str,
    ) -> Option<&'a Phrase> {
        self.phrases(group, languages)
            .find(|phrase| phrase.is_in(haystack))
    }

    /// Every occurrence of every phrase of `group`, sorted by position.
    pub fn spans(
        &self,
        group: PhraseGroup,
        languages: &[Language],
        haystack: &str,
    ) -> Vec<(Range<usize>, String)> {
        let mut spans: Vec<(Range<usize>, String)> = self
            .phrases(group, languages)
            .flat_map(|phrase| {
                phrase
                    .find_all(haystack)
                    .map(|span| (span, phrase.term().to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();
        spans.sort_by_key(|(span, _)| (span.start, span.end));
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> Vec<Language> {
        vec![Language::en(), Language::ru()]
    }

    #[test]
    fn builtin_tables_cover_both_languages() {
        let tables = PhraseTables::builtin();
        let langs = both();
        assert!(tables.first_match(PhraseGroup::Resume, &langs, "отправьте резюме").is_some());
        assert!(tables.first_match(PhraseGroup::Resume, &langs, "send your cv").is_some());
        assert!(tables
            .first_match(PhraseGroup::Senior, &langs, "ищем ведущий разработчик")
            .is_some());
    }

    #[test]
    fn disabled_language_contributes_nothing() {
        let tables = PhraseTables::builtin();
        let english = vec![Language::en()];
        assert!(tables
            .first_match(PhraseGroup::Resume, &english, "присылайте резюме")
            .is_none());
    }

    #[test]
    fn json_overrides_are_additive() {
        let mut tables = PhraseTables::builtin();
        tables
            .merge_json(r#"{"role": {"de": ["entwickler*"]}, "senior": {"en": ["director"]}}"#)
            .expect("valid json");
        let german: Vec<Language> = vec!["de".parse().expect("code")];
        assert!(tables
            .first_match(PhraseGroup::Role, &german, "wir suchen entwicklerinnen")
            .is_some());
        let english = vec![Language::en()];
        assert!(tables
            .first_match(PhraseGroup::Senior, &english, "engineering director")
            .is_some());
        assert!(tables
            .first_match(PhraseGroup::Senior, &english, "senior")
            .is_some());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let mut tables = PhraseTables::builtin();
        assert!(tables.merge_json(r#"{"bogus": {}}"#).is_err());
    }

    #[test]
    fn spans_are_sorted_by_position() {
        let tables = PhraseTables::builtin();
        let spans = tables.spans(
            PhraseGroup::Role,
            &[Language::en()],
            "engineer wanted, developers too",
        );
        let terms: Vec<_> = spans.iter().map(|(_, term)| term.as_str()).collect();
        assert_eq!(terms, vec!["engineer", "developer"]);
    }
}
