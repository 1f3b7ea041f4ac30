//! Language allow-list over search results.

use std::collections::HashSet;

use crate::search::SearchResultItem;

/// Pure predicate accepting items whose declared language is allowed.
///
/// Matching is trimmed and case-insensitive. Items with no language are
/// rejected.
#[derive(Debug, Clone)]
pub struct LanguageFilter {
    allowed: HashSet<String>,
}

impl LanguageFilter {
    /// Builds a filter from the configured language names or codes.
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = languages
            .into_iter()
            .map(|l| normalize(l.as_ref()))
            .filter(|l| !l.is_empty())
            .collect();
        Self { allowed }
    }

    /// Returns whether any of `item`'s language values is in the allow-set.
    #[must_use]
    pub fn is_accepted_language(&self, item: &SearchResultItem) -> bool {
        self.accepts_any(item.languages.iter().map(String::as_str))
    }

    /// Returns whether any value in `languages` is allowed.
    pub fn accepts_any<'a>(&self, languages: impl IntoIterator<Item = &'a str>) -> bool {
        languages
            .into_iter()
            .any(|l| self.allowed.contains(&normalize(l)))
    }
}

fn normalize(language: &str) -> String {
    language.trim().to_lowercase()
}
