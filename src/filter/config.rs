use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::text::{MatchMode, Phrase};

/// Language code a phrase table is keyed by (`en`, `ru`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn en() -> Self {
        Self("en".to_string())
    }

    pub fn ru() -> Self {
        Self("ru".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_lowercase();
        let code = match value.as_str() {
            "eng" | "english" => "en",
            "rus" | "russian" => "ru",
            "ukr" | "ukrainian" => "uk",
            other => other,
        };
        if code.is_empty() || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(value);
        }
        Ok(Self(code.to_string()))
    }
}

/// A configured include or exclude keyword.
///
/// Plain keywords match as substrings; `"go"` (quoted) only matches the whole word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    label: String,
    phrase: Phrase,
}

impl Keyword {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let quoted = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'));
        let phrase = match quoted {
            Some(inner) => Phrase::new(inner, MatchMode::Word),
            None => Phrase::new(raw, MatchMode::Substring),
        };
        if phrase.is_empty() {
            return None;
        }
        Some(Self {
            label: phrase.term().to_string(),
            phrase,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Rules a message is judged by. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub include_keywords: Vec<Keyword>,
    pub exclude_keywords: Vec<Keyword>,
    pub require_junior: bool,
    pub exclude_senior: bool,
    pub exclude_resumes: bool,
    pub languages: Vec<Language>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            require_junior: false,
            exclude_senior: false,
            exclude_resumes: false,
            languages: vec![Language::en(), Language::ru()],
        }
    }
}

impl FilterConfig {
    pub fn with_include<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_keywords = parse_keywords(keywords);
        self
    }

    pub fn with_exclude<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_keywords = parse_keywords(keywords);
        self
    }

    pub fn summary(&self) -> String {
        let join = |keywords: &[Keyword]| {
            if keywords.is_empty() {
                "-".to_string()
            } else {
                keywords
                    .iter()
                    .map(Keyword::label)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };
        let languages = self
            .languages
            .iter()
            .map(Language::code)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "include: {}\nexclude: {}\nrequire junior: {}\nexclude senior: {}\nexclude resumes: {}\nlanguages: {}",
            join(&self.include_keywords),
            join(&self.exclude_keywords),
            self.require_junior,
            self.exclude_senior,
            self.exclude_resumes,
            if languages.is_empty() { "-".to_string() } else { languages },
        )
    }
}

/// Parses keywords, dropping blanks and duplicates while keeping the first position.
pub fn parse_keywords<I, S>(raw: I) -> Vec<Keyword>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keywords: Vec<Keyword> = Vec::new();
    for keyword in raw.into_iter().filter_map(|item| Keyword::parse(item.as_ref())) {
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_normalized_and_deduplicated() {
        let keywords = parse_keywords(["Python", " python ", "", "REACT", "\"Go\""]);
        let labels: Vec<_> = keywords.iter().map(Keyword::label).collect();
        assert_eq!(labels, vec!["python", "react", "go"]);
    }

    #[test]
    fn quoted_keyword_needs_whole_word() {
        let go = Keyword::parse("\"go\"").expect("keyword");
        assert!(go.phrase().is_in("backend in go and rust"));
        assert!(!go.phrase().is_in("good django skills"));

        let plain = Keyword::parse("go").expect("keyword");
        assert!(plain.phrase().is_in("good django skills"));
    }

    #[test]
    fn language_codes_parse_leniently() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::en()));
        assert_eq!("russian".parse::<Language>(), Ok(Language::ru()));
        assert_eq!("de".parse::<Language>().map(|l| l.code().to_string()), Ok("de".into()));
        assert!("en-GB".parse::<Language>().is_err());
    }
}
