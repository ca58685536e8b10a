use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    KeywordMatch,
    ExcludedKeyword,
    ExcludedResume,
    ExcludedSenior,
    NoMatch,
}

impl VerdictReason {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictReason::KeywordMatch => "keyword_match",
            VerdictReason::ExcludedKeyword => "excluded_keyword",
            VerdictReason::ExcludedResume => "excluded_resume",
            VerdictReason::ExcludedSenior => "excluded_senior",
            VerdictReason::NoMatch => "no_match",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterVerdict {
    pub matched: bool,
    /// Matched include keywords, in configuration order.
    pub matched_keywords: Vec<String>,
    pub reason: VerdictReason,
    /// Phrase or keyword that caused an exclusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl FilterVerdict {
    pub fn matched(keywords: Vec<String>) -> Self {
        Self {
            matched: true,
            matched_keywords: keywords,
            reason: VerdictReason::KeywordMatch,
            trigger: None,
        }
    }

    pub fn rejected(reason: VerdictReason, trigger: Option<String>) -> Self {
        Self {
            matched: false,
            matched_keywords: Vec::new(),
            reason,
            trigger,
        }
    }

    pub fn no_match() -> Self {
        Self::rejected(VerdictReason::NoMatch, None)
    }
}
