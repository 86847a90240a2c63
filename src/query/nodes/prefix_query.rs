//! Prefix term matching
//!
//! A specialized form of wildcard matching for patterns like `prefix*`:
//! every term carrying the prefix matches, and enumeration stops at the
//! first term that does not.

use super::multi_term_query::{TermMatch, TermMatcher};
use crate::index::Term;

pub(crate) struct PrefixMatcher {
    prefix: Term,
}

impl PrefixMatcher {
    pub(crate) fn new(prefix: &Term) -> Self {
        Self {
            prefix: prefix.clone(),
        }
    }
}

impl TermMatcher for PrefixMatcher {
    fn seed(&self) -> Term {
        self.prefix.clone()
    }

    fn classify(&self, term: &Term) -> TermMatch {
        if term.field() == self.prefix.field() && term.text().starts_with(self.prefix.text()) {
            TermMatch::Match(1.0)
        } else {
            TermMatch::End
        }
    }
}
