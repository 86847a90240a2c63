//! Range query - matches terms lexically between two bounds

use serde::{Deserialize, Serialize};

use super::bool_query::{BooleanQuery, Occur};
use super::term_query::{default_boost, TermQuery};
use crate::index::{IndexReader, Term};
use crate::query::ast::{boost_suffix, field_prefix, Query, QueryNode};
use crate::search::{IndexSearcher, Weight};
use crate::{Result, SearchError};

/// Query matching every term of one field in a lexical range
///
/// A missing bound leaves that side open. `inclusive` applies to both
/// bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeQueryFields")]
pub struct RangeQuery {
    lower: Option<Term>,
    upper: Option<Term>,
    inclusive: bool,
    pub boost: f32,
}

/// Wire form of [`RangeQuery`], checked through [`RangeQuery::new`]
#[derive(Deserialize)]
struct RangeQueryFields {
    #[serde(default)]
    lower: Option<Term>,
    #[serde(default)]
    upper: Option<Term>,
    #[serde(default)]
    inclusive: bool,
    #[serde(default = "default_boost")]
    boost: f32,
}

impl TryFrom<RangeQueryFields> for RangeQuery {
    type Error = SearchError;

    fn try_from(fields: RangeQueryFields) -> Result<Self> {
        Ok(RangeQuery::new(fields.lower, fields.upper, fields.inclusive)?.with_boost(fields.boost))
    }
}

impl RangeQuery {
    pub fn new(lower: Option<Term>, upper: Option<Term>, inclusive: bool) -> Result<Self> {
        match (&lower, &upper) {
            (None, None) => {
                return Err(SearchError::invalid("a range query needs at least one bound"));
            }
            (Some(lo), Some(hi)) if lo.field() != hi.field() => {
                return Err(SearchError::invalid(format!(
                    "range bounds must share a field, got {} and {}",
                    lo, hi
                )));
            }
            _ => {}
        }
        Ok(Self {
            lower,
            upper,
            inclusive,
            boost: 1.0,
        })
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn lower(&self) -> Option<&Term> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Term> {
        self.upper.as_ref()
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn field(&self) -> &str {
        self.lower
            .as_ref()
            .or(self.upper.as_ref())
            .map(Term::field)
            .unwrap_or("")
    }

    /// Terms inside the range, in dictionary order
    pub fn matching_terms(&self, reader: &dyn IndexReader) -> Result<Vec<Term>> {
        let field = self.field();
        let seed = self
            .lower
            .clone()
            .unwrap_or_else(|| Term::new(field, ""));
        let mut terms = reader.terms_from(&seed)?;
        let mut matches = Vec::new();

        // skip the lower bound itself when exclusive
        let mut check_lower = !self.inclusive && self.lower.is_some();
        while let Some(term) = terms.term() {
            if term.field() != field {
                break;
            }
            let skip = check_lower && Some(term) == self.lower.as_ref();
            if !skip {
                check_lower = false;
                if let Some(upper) = &self.upper {
                    if upper.text() < term.text() || (!self.inclusive && term.text() == upper.text()) {
                        break;
                    }
                }
                matches.push(term.clone());
            }
            if !terms.next()? {
                break;
            }
        }
        Ok(matches)
    }
}

impl QueryNode for RangeQuery {
    fn query_type(&self) -> &'static str {
        "range"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite_step(&self, reader: &dyn IndexReader) -> Result<Option<Query>> {
        let mut query = BooleanQuery::new();
        for term in self.matching_terms(reader)? {
            query.add(TermQuery::new(term).with_boost(self.boost), Occur::Optional);
        }
        Ok(Some(query.into()))
    }

    fn create_weight(&self, _searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        Err(SearchError::unsupported(
            "range queries must be rewritten before weighting",
        ))
    }

    fn to_query_string(&self, default_field: &str) -> String {
        let (open, close) = if self.inclusive { ('[', ']') } else { ('{', '}') };
        format!(
            "{}{}{} TO {}{}{}",
            field_prefix(self.field(), default_field),
            open,
            self.lower.as_ref().map(Term::text).unwrap_or("null"),
            self.upper.as_ref().map(Term::text).unwrap_or("null"),
            close,
            boost_suffix(self.boost)
        )
    }
}
