//! Multi-phrase query - a phrase whose positions accept alternative terms
//!
//! `"(quick fast) fox"` matches both "quick fox" and "fast fox". Each
//! position reads the union of its terms' postings, so the phrase is
//! scored the same way as a plain phrase. Slop works as in
//! [`PhraseQuery`](super::PhraseQuery).

use serde::{Deserialize, Serialize};

use super::bool_query::{BooleanQuery, Occur};
use super::phrase_query::{PhraseDescriptions, PhraseWeight};
use super::term_query::{default_boost, TermQuery};
use crate::index::{IndexReader, Term};
use crate::query::ast::{boost_suffix, field_prefix, Query, QueryNode};
use crate::search::{IndexSearcher, Weight};
use crate::{Result, SearchError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MultiPhraseQueryFields")]
pub struct MultiPhraseQuery {
    positions: Vec<Vec<Term>>,
    pub slop: u32,
    pub boost: f32,
}

#[derive(Deserialize)]
struct MultiPhraseQueryFields {
    positions: Vec<Vec<Term>>,
    #[serde(default)]
    slop: u32,
    #[serde(default = "default_boost")]
    boost: f32,
}

impl TryFrom<MultiPhraseQueryFields> for MultiPhraseQuery {
    type Error = SearchError;

    fn try_from(fields: MultiPhraseQueryFields) -> Result<Self> {
        let mut query = MultiPhraseQuery::new()
            .with_slop(fields.slop)
            .with_boost(fields.boost);
        for terms in fields.positions {
            query.add_position(terms)?;
        }
        Ok(query)
    }
}

impl Default for MultiPhraseQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiPhraseQuery {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            slop: 0,
            boost: 1.0,
        }
    }

    /// Append a position matched by a single term
    pub fn add(&mut self, term: Term) -> Result<()> {
        self.add_position(vec![term])
    }

    /// Append a position matched by any of `terms`
    ///
    /// Every term of the query must share one field, and a position needs
    /// at least one term.
    pub fn add_position(&mut self, terms: Vec<Term>) -> Result<()> {
        let Some(first) = terms.first() else {
            return Err(SearchError::invalid("a phrase position needs at least one term"));
        };
        let field = self.field().unwrap_or(first.field()).to_string();
        if let Some(stray) = terms.iter().find(|term| term.field() != field) {
            return Err(SearchError::invalid(format!(
                "all phrase terms must be in field {}, got {}",
                field, stray
            )));
        }
        self.positions.push(terms);
        Ok(())
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn positions(&self) -> &[Vec<Term>] {
        &self.positions
    }

    pub fn field(&self) -> Option<&str> {
        self.positions.iter().flatten().next().map(Term::field)
    }

    fn render_positions(&self) -> String {
        let rendered: Vec<String> = self
            .positions
            .iter()
            .map(|terms| match terms.as_slice() {
                [only] => only.text().to_string(),
                _ => {
                    let texts: Vec<&str> = terms.iter().map(Term::text).collect();
                    format!("({})", texts.join(" "))
                }
            })
            .collect();
        rendered.join(" ")
    }
}

impl QueryNode for MultiPhraseQuery {
    fn query_type(&self) -> &'static str {
        "multi_phrase"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite_step(&self, _reader: &dyn IndexReader) -> Result<Option<Query>> {
        Ok(None)
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        // a lone position is any of its terms
        if let [terms] = self.positions.as_slice() {
            let mut query = BooleanQuery::new().with_boost(self.boost);
            for term in terms {
                query.add(TermQuery::new(term.clone()), Occur::Optional);
            }
            return query.create_weight(searcher);
        }
        let described = format!(
            "{}:\"{}\"",
            self.field().unwrap_or(""),
            self.render_positions()
        );
        let weight = PhraseWeight::new(
            self.positions.clone(),
            self.slop,
            self.boost,
            PhraseDescriptions {
                query: self.to_query_string(""),
                idf: format!("idf({})", described),
                field: described,
            },
            searcher,
        )?;
        Ok(Box::new(weight))
    }

    fn to_query_string(&self, default_field: &str) -> String {
        let mut out = String::new();
        if let Some(field) = self.field() {
            out.push_str(&field_prefix(field, default_field));
        }
        out.push('"');
        out.push_str(&self.render_positions());
        out.push('"');
        if self.slop != 0 {
            out.push_str(&format!("~{}", self.slop));
        }
        out.push_str(&boost_suffix(self.boost));
        out
    }
}
