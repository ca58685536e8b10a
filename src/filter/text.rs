use std::{iter, ops::Range};

/// Lower-cases text and folds `ё` so Russian spelling variants compare equal.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|ch| if ch == 'ё' { 'е' } else { ch })
        .collect()
}

/// A phrase from a phrase table or a configured keyword, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    term: String,
    mode: MatchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Anywhere in the text.
    Substring,
    /// Word boundaries on both sides.
    Word,
    /// Word boundary on the left only; `developer*` matches `developers`.
    Prefix,
}

impl Phrase {
    pub fn new(term: &str, mode: MatchMode) -> Self {
        Self {
            term: normalize(term.trim()),
            mode,
        }
    }

    /// Table syntax: a trailing `*` marks a prefix, anything else is a whole word.
    pub fn from_table(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_suffix('*') {
            Some(stem) => Self::new(stem, MatchMode::Prefix),
            None => Self::new(raw, MatchMode::Word),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// First occurrence in already-normalized text, as a byte range.
    pub fn find_in(&self, haystack: &str) -> Option<Range<usize>> {
        self.find_all(haystack).next()
    }

    pub fn is_in(&self, haystack: &str) -> bool {
        self.find_in(haystack).is_some()
    }

    /// Every occurrence whose boundaries hold, overlapping ones included.
    pub fn find_all<'a>(&'a self, haystack: &'a str) -> impl Iterator<Item = Range<usize>> + 'a {
        let term = self.term.as_str();
        let mut from = 0;
        iter::from_fn(move || {
            if term.is_empty() {
                return None;
            }
            loop {
                let start = from + haystack.get(from..)?.find(term)?;
                from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
                let span = start..start + term.len();
                if self.boundaries_hold(haystack, &span) {
                    return Some(span);
                }
            }
        })
    }

    fn boundaries_hold(&self, haystack: &str, span: &Range<usize>) -> bool {
        let (check_left, check_right) = match self.mode {
            MatchMode::Substring => return true,
            MatchMode::Word => (true, true),
            MatchMode::Prefix => (true, false),
        };
        let first = self.term.chars().next();
        let last = self.term.chars().next_back();

        if check_left && first.is_some_and(char::is_alphanumeric) {
            if haystack[..span.start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric)
            {
                return false;
            }
        }
        if check_right && last.is_some_and(char::is_alphanumeric) {
            if haystack[span.end..]
                .chars()
                .next()
                .is_some_and(char::is_alphanumeric)
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_yo() {
        assert_eq!(normalize("Стажёр PYTHON"), "стажер python");
    }

    #[test]
    fn word_mode_respects_boundaries() {
        let cv = Phrase::from_table("cv");
        assert!(cv.is_in("send your cv, please"));
        assert!(cv.is_in("cv"));
        assert!(!cv.is_in("cvs and other tools"));
        assert!(!cv.is_in("opencv developer"));
    }

    #[test]
    fn prefix_mode_allows_inflections() {
        let dev = Phrase::from_table("разработчик*");
        assert!(dev.is_in("ищем разработчика в команду"));
        assert!(!dev.is_in("суперразработчик"));
    }

    #[test]
    fn punctuation_edges_need_no_boundary() {
        let sr = Phrase::from_table("sr.");
        assert!(sr.is_in("sr.engineer"));
    }

    #[test]
    fn substring_mode_matches_inside_words() {
        let rust = Phrase::new("rust", MatchMode::Substring);
        assert!(rust.is_in("rustacean wanted"));
    }

    #[test]
    fn later_occurrence_found_when_first_fails_boundary() {
        let lead = Phrase::from_table("lead");
        assert_eq!(lead.find_in("leading role, team lead"), Some(19..23));
    }

    #[test]
    fn overlapping_occurrence_found_after_failed_boundary() {
        let phrase = Phrase::from_table("a-a");
        assert_eq!(phrase.find_in("xa-a-a"), Some(3..6));

        let dev = Phrase::from_table("дев*");
        let spans: Vec<_> = dev.find_all("суб девдев дев").collect();
        assert_eq!(spans, vec![7..13, 20..26]);
    }
}
