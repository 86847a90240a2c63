//! Wildcard term matching
//!
//! Supports:
//! - `*` - matches any sequence of characters, including none
//! - `?` - matches exactly one character

use regex::Regex;

use super::multi_term_query::{TermMatch, TermMatcher};
use crate::index::Term;
use crate::{Result, SearchError};

/// Longest part of `pattern` before the first wildcard character
pub fn literal_prefix(pattern: &str) -> &str {
    let end = pattern.find(['*', '?']).unwrap_or(pattern.len());
    &pattern[..end]
}

/// Compile a wildcard pattern into an anchored regex
pub fn pattern_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex_pattern = String::from("(?s)^");
    let mut literal = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            _ => regex_pattern.push_str(&regex::escape(ch.encode_utf8(&mut literal))),
        }
    }
    regex_pattern.push('$');

    Regex::new(&regex_pattern)
        .map_err(|e| SearchError::invalid(format!("invalid wildcard pattern {}: {}", pattern, e)))
}

/// Matches the terms of one field against a wildcard pattern
pub(crate) struct WildcardMatcher {
    field: String,
    prefix: String,
    regex: Regex,
}

impl WildcardMatcher {
    pub(crate) fn new(pattern: &Term) -> Result<Self> {
        Ok(Self {
            field: pattern.field().to_string(),
            prefix: literal_prefix(pattern.text()).to_string(),
            regex: pattern_to_regex(pattern.text())?,
        })
    }
}

impl TermMatcher for WildcardMatcher {
    fn seed(&self) -> Term {
        Term::new(self.field.as_str(), self.prefix.as_str())
    }

    fn classify(&self, term: &Term) -> TermMatch {
        if term.field() != self.field || !term.text().starts_with(&self.prefix) {
            return TermMatch::End;
        }
        if self.regex.is_match(term.text()) {
            TermMatch::Match(1.0)
        } else {
            TermMatch::Skip
        }
    }
}
