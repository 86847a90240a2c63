//! Boolean query - combines clauses with required, optional and prohibited
//! semantics
//!
//! A document matches when it matches every required clause and no
//! prohibited clause. Optional clauses only add to the score, except in a
//! query without required clauses, where at least one of them must match.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::index::{DocId, IndexReader};
use crate::query::ast::{boost_suffix, Query, QueryNode};
use crate::search::{
    BooleanScorer, Explanation, IndexSearcher, Scorer, Similarity, Weight, WeightState,
};
use crate::{Result, SearchError};

use super::term_query::default_boost;

/// How a clause takes part in matching
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// Must match (`+`)
    Required,
    /// May match, raising the score (no prefix)
    Optional,
    /// Must not match (`-`)
    Prohibited,
}

impl Occur {
    pub fn is_required(self) -> bool {
        self == Occur::Required
    }

    pub fn is_prohibited(self) -> bool {
        self == Occur::Prohibited
    }

    fn prefix(self) -> &'static str {
        match self {
            Occur::Required => "+",
            Occur::Optional => "",
            Occur::Prohibited => "-",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BooleanClause {
    pub query: Query,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: impl Into<Query>, occur: Occur) -> Self {
        Self {
            query: query.into(),
            occur,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            boost: 1.0,
        }
    }

    pub fn from_clauses(clauses: Vec<BooleanClause>) -> Self {
        Self {
            clauses,
            boost: 1.0,
        }
    }

    pub fn add(&mut self, query: impl Into<Query>, occur: Occur) {
        self.clauses.push(BooleanClause::new(query, occur));
    }

    /// Builder form of [`add`](Self::add)
    pub fn with_clause(mut self, query: impl Into<Query>, occur: Occur) -> Self {
        self.add(query, occur);
        self
    }

    pub fn must(self, query: impl Into<Query>) -> Self {
        self.with_clause(query, Occur::Required)
    }

    pub fn should(self, query: impl Into<Query>) -> Self {
        self.with_clause(query, Occur::Optional)
    }

    pub fn must_not(self, query: impl Into<Query>) -> Self {
        self.with_clause(query, Occur::Prohibited)
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl QueryNode for BooleanQuery {
    fn query_type(&self) -> &'static str {
        "boolean"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite_step(&self, reader: &dyn IndexReader) -> Result<Option<Query>> {
        if let [only] = self.clauses.as_slice() {
            if !only.occur.is_prohibited() {
                let mut query = only.query.rewrite(reader)?;
                if self.boost != 1.0 {
                    query.set_boost(query.boost() * self.boost);
                }
                return Ok(Some(query));
            }
        }

        let mut rewritten: Option<Vec<BooleanClause>> = None;
        for (index, clause) in self.clauses.iter().enumerate() {
            if let Some(query) = clause.query.rewrite_step(reader)? {
                let clauses = rewritten.get_or_insert_with(|| self.clauses.clone());
                clauses[index] = BooleanClause::new(query, clause.occur);
            }
        }
        Ok(rewritten.map(|clauses| {
            Query::Boolean(BooleanQuery {
                clauses,
                boost: self.boost,
            })
        }))
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        let limit = searcher.config().max_clause_count;
        if self.clauses.len() > limit {
            return Err(SearchError::TooManyClauses {
                count: self.clauses.len(),
                limit,
            });
        }
        let clauses = self
            .clauses
            .iter()
            .map(|clause| Ok((clause.query.create_weight(searcher)?, clause.occur)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(BooleanWeight {
            clauses,
            boost: self.boost,
            similarity: searcher.similarity().clone(),
            state: WeightState::default(),
        }))
    }

    fn to_query_string(&self, default_field: &str) -> String {
        let mut out = String::new();
        let boosted = self.boost != 1.0;
        if boosted {
            out.push('(');
        }
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            out.push_str(clause.occur.prefix());
            match &clause.query {
                Query::Boolean(nested) => {
                    out.push('(');
                    out.push_str(&nested.to_query_string(default_field));
                    out.push(')');
                }
                other => out.push_str(&other.to_query_string(default_field)),
            }
        }
        if boosted {
            out.push(')');
            out.push_str(&boost_suffix(self.boost));
        }
        out
    }
}

struct BooleanWeight {
    clauses: Vec<(Box<dyn Weight>, Occur)>,
    boost: f32,
    similarity: Arc<dyn Similarity>,
    state: WeightState,
}

impl Weight for BooleanWeight {
    fn value(&self) -> f32 {
        self.boost
    }

    fn sum_of_squared_weights(&mut self) -> Result<f32> {
        self.state.begin_sum()?;
        let mut sum = 0.0f32;
        for (weight, occur) in &mut self.clauses {
            // Prohibited clauses are summed for their lifecycle only.
            let clause_sum = weight.sum_of_squared_weights()?;
            if !occur.is_prohibited() {
                sum += clause_sum;
            }
        }
        Ok(sum * self.boost * self.boost)
    }

    fn normalize(&mut self, norm: f32) -> Result<()> {
        self.state.begin_normalize()?;
        let norm = norm * self.boost;
        for (weight, _) in &mut self.clauses {
            weight.normalize(norm)?;
        }
        Ok(())
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        self.state.ensure_normalized("scorer")?;
        let mut scorer = BooleanScorer::new(self.similarity.clone());
        for (weight, occur) in &self.clauses {
            let sub_scorer = weight.scorer(reader)?;
            if sub_scorer.is_none() && occur.is_required() {
                return Ok(None);
            }
            scorer.add(sub_scorer, occur.is_required(), occur.is_prohibited())?;
        }
        Ok(Some(Box::new(scorer)))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        self.state.ensure_normalized("explain")?;
        let mut sum_expl = Explanation::new(0.0, "sum of:");
        let mut sum = 0.0f32;
        let mut coord = 0usize;
        let mut max_coord = 0usize;

        for (weight, occur) in &self.clauses {
            let explanation = weight.explain(reader, doc)?;
            if !occur.is_prohibited() {
                max_coord += 1;
            }
            if explanation.value() > 0.0 {
                if occur.is_prohibited() {
                    return Ok(Explanation::new(0.0, "match prohibited"));
                }
                sum += explanation.value();
                coord += 1;
                sum_expl.add_detail(explanation);
            } else if occur.is_required() {
                return Ok(Explanation::new(0.0, "match required"));
            }
        }
        sum_expl.set_value(sum);
        if coord == 1 {
            sum_expl = sum_expl.into_first_detail();
        }

        let coord_factor = self.similarity.coord(coord, max_coord);
        if coord_factor == 1.0 {
            return Ok(sum_expl);
        }
        Ok(Explanation::new(sum_expl.value() * coord_factor, "product of:")
            .with_detail(sum_expl)
            .with_detail(Explanation::new(
                coord_factor,
                format!("coord({}/{})", coord, max_coord),
            )))
    }
}
