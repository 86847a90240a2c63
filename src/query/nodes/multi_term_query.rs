//! Multi-term query - expands a pattern over the term dictionary
//!
//! A multi-term query never scores directly. Rewriting enumerates the term
//! dictionary from a seed term, keeps every term the pattern accepts and
//! produces a boolean query of optional term clauses, each boosted by the
//! query boost times how well the term matched.
//!
//! # Example
//!
//! ```rust
//! use ranksmith::index::Term;
//! use ranksmith::query::MultiTermQuery;
//!
//! let query = MultiTermQuery::wildcard(Term::new("title", "prog*"));
//! assert_eq!(query.to_string(), "title:prog*");
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::bool_query::{BooleanQuery, Occur};
use super::fuzzy_query::{FuzzyMatcher, DEFAULT_MIN_SIMILARITY};
use super::prefix_query::PrefixMatcher;
use super::term_query::{default_boost, TermQuery};
use super::wildcard_query::WildcardMatcher;
use crate::index::{IndexReader, ReaderId, Term};
use crate::query::ast::{boost_suffix, field_prefix, Query, QueryNode};
use crate::search::{IndexSearcher, Weight};
use crate::{Result, SearchError};

/// Verdict on one enumerated term
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TermMatch {
    /// Accepted, with a match weight in (0, 1]
    Match(f32),
    /// Rejected; keep enumerating
    Skip,
    /// No later term can match; stop enumerating
    End,
}

/// Pattern test applied to the sorted term dictionary
pub(crate) trait TermMatcher {
    /// First term to enumerate from
    fn seed(&self) -> Term;

    fn classify(&self, term: &Term) -> TermMatch;
}

/// Pattern flavour of a [`MultiTermQuery`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MultiTermKind {
    /// `*` and `?` wildcards
    Wildcard,
    /// Every term starting with the pattern text
    Prefix,
    /// Terms within an edit-distance similarity of the pattern text
    Fuzzy {
        min_similarity: f32,
        prefix_length: usize,
    },
}

type Expansion = Arc<[(Term, f32)]>;

/// Last expansion, keyed by the reader it was computed against
#[derive(Default)]
struct ExpansionCache(Mutex<Option<(ReaderId, Expansion)>>);

impl Clone for ExpansionCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for ExpansionCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for ExpansionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.0.lock().as_ref().map(|(id, terms)| (*id, terms.len()));
        f.debug_tuple("ExpansionCache").field(&cached).finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiTermQuery {
    pattern: Term,
    kind: MultiTermKind,
    #[serde(default = "default_boost")]
    pub boost: f32,
    #[serde(skip)]
    expansions: ExpansionCache,
}

impl MultiTermQuery {
    fn with_kind(pattern: Term, kind: MultiTermKind) -> Self {
        Self {
            pattern,
            kind,
            boost: 1.0,
            expansions: ExpansionCache::default(),
        }
    }

    pub fn wildcard(pattern: Term) -> Self {
        Self::with_kind(pattern, MultiTermKind::Wildcard)
    }

    pub fn prefix(prefix: Term) -> Self {
        Self::with_kind(prefix, MultiTermKind::Prefix)
    }

    /// Fuzzy query with the default minimum similarity and no exact prefix
    pub fn fuzzy(term: Term) -> Self {
        Self::with_kind(
            term,
            MultiTermKind::Fuzzy {
                min_similarity: DEFAULT_MIN_SIMILARITY,
                prefix_length: 0,
            },
        )
    }

    /// Fuzzy query requiring `min_similarity` in [0, 1) and an exact match
    /// on the first `prefix_length` characters
    pub fn fuzzy_with(term: Term, min_similarity: f32, prefix_length: usize) -> Result<Self> {
        if !(0.0..1.0).contains(&min_similarity) {
            return Err(SearchError::invalid(format!(
                "min_similarity must be in [0, 1), got {}",
                min_similarity
            )));
        }
        Ok(Self::with_kind(
            term,
            MultiTermKind::Fuzzy {
                min_similarity,
                prefix_length,
            },
        ))
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn pattern(&self) -> &Term {
        &self.pattern
    }

    pub fn kind(&self) -> &MultiTermKind {
        &self.kind
    }

    fn matcher(&self) -> Result<Box<dyn TermMatcher>> {
        Ok(match &self.kind {
            MultiTermKind::Wildcard => Box::new(WildcardMatcher::new(&self.pattern)?),
            MultiTermKind::Prefix => Box::new(PrefixMatcher::new(&self.pattern)),
            MultiTermKind::Fuzzy {
                min_similarity,
                prefix_length,
            } => {
                if !(0.0..1.0).contains(min_similarity) {
                    return Err(SearchError::invalid(format!(
                        "min_similarity must be in [0, 1), got {}",
                        min_similarity
                    )));
                }
                Box::new(FuzzyMatcher::new(
                    &self.pattern,
                    *min_similarity,
                    *prefix_length,
                ))
            }
        })
    }

    /// Accepted terms and their match weights, in dictionary order
    pub fn expand(&self, reader: &dyn IndexReader) -> Result<Vec<(Term, f32)>> {
        Ok(self.cached_expansion(reader)?.to_vec())
    }

    fn cached_expansion(&self, reader: &dyn IndexReader) -> Result<Expansion> {
        let reader_id = reader.reader_id();
        if let Some((cached_id, expansion)) = self.expansions.0.lock().as_ref() {
            if *cached_id == reader_id {
                return Ok(expansion.clone());
            }
        }

        let matcher = self.matcher()?;
        let mut terms = reader.terms_from(&matcher.seed())?;
        let mut accepted = Vec::new();
        while let Some(term) = terms.term() {
            match matcher.classify(term) {
                TermMatch::Match(difference) => accepted.push((term.clone(), difference)),
                TermMatch::Skip => {}
                TermMatch::End => break,
            }
            if !terms.next()? {
                break;
            }
        }

        let expansion: Expansion = accepted.into();
        debug!(
            query = %self,
            reader_id,
            terms = expansion.len(),
            "expanded multi-term query"
        );
        *self.expansions.0.lock() = Some((reader_id, expansion.clone()));
        Ok(expansion)
    }
}

impl QueryNode for MultiTermQuery {
    fn query_type(&self) -> &'static str {
        match self.kind {
            MultiTermKind::Wildcard => "wildcard",
            MultiTermKind::Prefix => "prefix",
            MultiTermKind::Fuzzy { .. } => "fuzzy",
        }
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite_step(&self, reader: &dyn IndexReader) -> Result<Option<Query>> {
        let expansion = self.cached_expansion(reader)?;
        let mut query = BooleanQuery::new();
        for (term, difference) in expansion.iter() {
            query.add(
                TermQuery::new(term.clone()).with_boost(self.boost * difference),
                Occur::Optional,
            );
        }
        Ok(Some(query.into()))
    }

    fn create_weight(&self, _searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        Err(SearchError::unsupported(format!(
            "{} queries must be rewritten before weighting",
            self.query_type()
        )))
    }

    fn to_query_string(&self, default_field: &str) -> String {
        let mut out = field_prefix(self.pattern.field(), default_field);
        out.push_str(self.pattern.text());
        match self.kind {
            MultiTermKind::Wildcard => {}
            MultiTermKind::Prefix => out.push('*'),
            MultiTermKind::Fuzzy { min_similarity, .. } => {
                out.push('~');
                if min_similarity != DEFAULT_MIN_SIMILARITY {
                    out.push_str(&format!("{:?}", min_similarity));
                }
            }
        }
        out.push_str(&boost_suffix(self.boost));
        out
    }
}

impl fmt::Display for MultiTermQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string(""))
    }
}
