//! Query tree
//!
//! [`Query`] is a closed tagged union over the supported node types. Each
//! variant struct implements [`QueryNode`], the per-node dispatch table for
//! rewriting, weight creation and rendering.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::nodes::{
    BooleanClause, BooleanQuery, MultiPhraseQuery, MultiTermQuery, PhraseQuery, RangeQuery,
    TermQuery,
};
use crate::index::IndexReader;
use crate::search::{IndexSearcher, Weight};
use crate::{Result, SearchError};

/// Behaviour every query node provides
pub trait QueryNode {
    /// Node type name for logging
    fn query_type(&self) -> &'static str;

    fn boost(&self) -> f32;

    /// One rewrite pass against `reader`. `None` means the node is already
    /// in primitive form.
    fn rewrite_step(&self, reader: &dyn IndexReader) -> Result<Option<Query>>;

    /// Compile the scoring state for one search
    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>>;

    /// Render in query syntax, omitting `field:` where it equals
    /// `default_field`
    fn to_query_string(&self, default_field: &str) -> String;
}

/// A query tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    Term(TermQuery),
    Boolean(BooleanQuery),
    Phrase(PhraseQuery),
    MultiPhrase(MultiPhraseQuery),
    MultiTerm(MultiTermQuery),
    Range(RangeQuery),
}

impl Query {
    fn node(&self) -> &dyn QueryNode {
        match self {
            Query::Term(q) => q,
            Query::Boolean(q) => q,
            Query::Phrase(q) => q,
            Query::MultiPhrase(q) => q,
            Query::MultiTerm(q) => q,
            Query::Range(q) => q,
        }
    }

    pub fn query_type(&self) -> &'static str {
        self.node().query_type()
    }

    pub fn boost(&self) -> f32 {
        self.node().boost()
    }

    pub fn set_boost(&mut self, boost: f32) {
        match self {
            Query::Term(q) => q.boost = boost,
            Query::Boolean(q) => q.boost = boost,
            Query::Phrase(q) => q.boost = boost,
            Query::MultiPhrase(q) => q.boost = boost,
            Query::MultiTerm(q) => q.boost = boost,
            Query::Range(q) => q.boost = boost,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.set_boost(boost);
        self
    }

    /// One rewrite pass; `None` when nothing changed
    pub fn rewrite_step(&self, reader: &dyn IndexReader) -> Result<Option<Query>> {
        self.node().rewrite_step(reader)
    }

    /// One rewrite pass
    pub fn rewrite(&self, reader: &dyn IndexReader) -> Result<Query> {
        Ok(self.rewrite_step(reader)?.unwrap_or_else(|| self.clone()))
    }

    pub fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        self.node().create_weight(searcher)
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        self.node().to_query_string(default_field)
    }

    /// Merge the rewritten forms of this query (one per reader) into one
    /// boolean query.
    ///
    /// Only expanding queries (multi-term and range) support this. Every
    /// input must be a boolean query; structurally identical clauses are
    /// kept once, in first-seen order.
    pub fn combine(&self, queries: &[Query]) -> Result<Query> {
        match self {
            Query::MultiTerm(_) | Query::Range(_) => merge_boolean_queries(queries),
            other => Err(SearchError::unsupported(format!(
                "combine is not supported for {} queries",
                other.query_type()
            ))),
        }
    }
}

fn merge_boolean_queries(queries: &[Query]) -> Result<Query> {
    let mut merged: Vec<BooleanClause> = Vec::new();
    for query in queries {
        let Query::Boolean(boolean) = query else {
            return Err(SearchError::unsupported(format!(
                "cannot merge a {} query as a boolean query",
                query.query_type()
            )));
        };
        for clause in boolean.clauses() {
            if !merged.contains(clause) {
                merged.push(clause.clone());
            }
        }
    }
    Ok(Query::Boolean(BooleanQuery::from_clauses(merged)))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string(""))
    }
}

/// `^boost` suffix, empty for the neutral boost
pub(crate) fn boost_suffix(boost: f32) -> String {
    if boost == 1.0 {
        String::new()
    } else {
        format!("^{:?}", boost)
    }
}

/// `field:` prefix, empty when `field` is the default
pub(crate) fn field_prefix(field: &str, default_field: &str) -> String {
    if field == default_field {
        String::new()
    } else {
        format!("{}:", field)
    }
}

impl From<TermQuery> for Query {
    fn from(query: TermQuery) -> Self {
        Query::Term(query)
    }
}

impl From<BooleanQuery> for Query {
    fn from(query: BooleanQuery) -> Self {
        Query::Boolean(query)
    }
}

impl From<PhraseQuery> for Query {
    fn from(query: PhraseQuery) -> Self {
        Query::Phrase(query)
    }
}

impl From<MultiPhraseQuery> for Query {
    fn from(query: MultiPhraseQuery) -> Self {
        Query::MultiPhrase(query)
    }
}

impl From<MultiTermQuery> for Query {
    fn from(query: MultiTermQuery) -> Self {
        Query::MultiTerm(query)
    }
}

impl From<RangeQuery> for Query {
    fn from(query: RangeQuery) -> Self {
        Query::Range(query)
    }
}
