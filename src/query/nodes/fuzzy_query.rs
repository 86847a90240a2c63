//! Fuzzy term matching
//!
//! Uses Levenshtein distance to find terms similar to the query term. The
//! similarity of a candidate is
//!
//! ```text
//! 1 - distance / (prefix_length + min(len(query suffix), len(candidate suffix)))
//! ```
//!
//! where the first `prefix_length` characters must match exactly and only
//! the remaining suffixes are compared.

use super::multi_term_query::{TermMatch, TermMatcher};
use crate::index::Term;

/// Default minimum similarity for a fuzzy match
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// Calculate Levenshtein distance between two character sequences
///
/// Uses dynamic programming with O(m*n) time and O(min(m,n)) space.
pub fn levenshtein_distance(s1: &[char], s2: &[char]) -> usize {
    let (shorter, longer) = if s1.len() <= s2.len() {
        (s1, s2)
    } else {
        (s2, s1)
    };
    if shorter.is_empty() {
        return longer.len();
    }

    // Two rows for DP
    let mut prev_row: Vec<usize> = (0..=shorter.len()).collect();
    let mut curr_row = vec![0; shorter.len() + 1];

    for (i, long_ch) in longer.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, short_ch) in shorter.iter().enumerate() {
            let cost = usize::from(long_ch != short_ch);
            curr_row[j + 1] = (prev_row[j + 1] + 1) // deletion
                .min(curr_row[j] + 1) // insertion
                .min(prev_row[j] + cost); // substitution
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[shorter.len()]
}

pub(crate) struct FuzzyMatcher {
    field: String,
    prefix: String,
    prefix_len: usize,
    /// Query term after the exact prefix
    suffix: Vec<char>,
    min_similarity: f32,
    scale: f32,
}

impl FuzzyMatcher {
    /// `min_similarity` must already be validated to lie in [0, 1)
    pub(crate) fn new(term: &Term, min_similarity: f32, prefix_length: usize) -> Self {
        let chars: Vec<char> = term.text().chars().collect();
        let prefix_len = prefix_length.min(chars.len());
        Self {
            field: term.field().to_string(),
            prefix: chars[..prefix_len].iter().collect(),
            prefix_len,
            suffix: chars[prefix_len..].to_vec(),
            min_similarity,
            scale: 1.0 / (1.0 - min_similarity),
        }
    }

    fn similarity(&self, target: &[char]) -> f32 {
        let n = self.suffix.len();
        let m = target.len();
        if n == 0 || m == 0 {
            if self.prefix_len == 0 {
                return 0.0;
            }
            return 1.0 - n.max(m) as f32 / self.prefix_len as f32;
        }
        let distance = levenshtein_distance(&self.suffix, target);
        1.0 - distance as f32 / (self.prefix_len + n.min(m)) as f32
    }
}

impl TermMatcher for FuzzyMatcher {
    fn seed(&self) -> Term {
        Term::new(self.field.as_str(), self.prefix.as_str())
    }

    fn classify(&self, term: &Term) -> TermMatch {
        let Some(rest) = term
            .text()
            .strip_prefix(self.prefix.as_str())
            .filter(|_| term.field() == self.field)
        else {
            return TermMatch::End;
        };
        let target: Vec<char> = rest.chars().collect();
        let similarity = self.similarity(&target);
        if similarity > self.min_similarity {
            TermMatch::Match((similarity - self.min_similarity) * self.scale)
        } else {
            TermMatch::Skip
        }
    }
}
