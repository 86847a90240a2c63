//! Term query - exact match on a single term

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::index::{DocId, IndexReader, Term};
use crate::query::ast::{boost_suffix, field_prefix, Query, QueryNode};
use crate::search::scorer::{field_norms, norm_at};
use crate::search::{Explanation, IndexSearcher, Scorer, Similarity, TermScorer, Weight, WeightState};
use crate::Result;

/// Query that matches documents containing a term
///
/// This is the leaf every expanding query rewrites into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub term: Term,
    #[serde(default = "default_boost")]
    pub boost: f32,
}

pub(crate) fn default_boost() -> f32 {
    1.0
}

impl TermQuery {
    pub fn new(term: Term) -> Self {
        Self { term, boost: 1.0 }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl QueryNode for TermQuery {
    fn query_type(&self) -> &'static str {
        "term"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite_step(&self, _reader: &dyn IndexReader) -> Result<Option<Query>> {
        Ok(None)
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        Ok(Box::new(TermWeight::new(self, searcher)?))
    }

    fn to_query_string(&self, default_field: &str) -> String {
        format!(
            "{}{}{}",
            field_prefix(self.term.field(), default_field),
            self.term.text(),
            boost_suffix(self.boost)
        )
    }
}

/// Weight of a single term: `idf * boost`, normalized
pub(crate) struct TermWeight {
    term: Term,
    boost: f32,
    description: String,
    similarity: Arc<dyn Similarity>,
    doc_freq: u32,
    idf: f32,
    query_norm: f32,
    query_weight: f32,
    value: f32,
    state: WeightState,
}

impl TermWeight {
    pub(crate) fn new(query: &TermQuery, searcher: &IndexSearcher) -> Result<Self> {
        let similarity = searcher.similarity().clone();
        let doc_freq = searcher.doc_freq(&query.term)?;
        let idf = similarity.idf(doc_freq, searcher.max_doc());
        Ok(Self {
            term: query.term.clone(),
            boost: query.boost,
            description: query.to_query_string(""),
            similarity,
            doc_freq,
            idf,
            query_norm: 0.0,
            query_weight: 0.0,
            value: 0.0,
            state: WeightState::default(),
        })
    }
}

impl Weight for TermWeight {
    fn value(&self) -> f32 {
        self.value
    }

    fn sum_of_squared_weights(&mut self) -> Result<f32> {
        self.state.begin_sum()?;
        self.query_weight = self.idf * self.boost;
        Ok(self.query_weight * self.query_weight)
    }

    fn normalize(&mut self, norm: f32) -> Result<()> {
        self.state.begin_normalize()?;
        self.query_norm = norm;
        self.query_weight *= norm;
        self.value = self.query_weight * self.idf;
        Ok(())
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        self.state.ensure_normalized("scorer")?;
        let Some(postings) = reader.term_positions(&self.term)? else {
            return Ok(None);
        };
        let norms = field_norms(reader, self.term.field())?;
        let scorer = TermScorer::new(
            self.term.clone(),
            postings,
            self.similarity.clone(),
            self.value,
            norms,
        )?;
        Ok(Some(Box::new(scorer)))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        self.state.ensure_normalized("explain")?;
        let idf = Explanation::new(self.idf, format!("idf(docFreq={})", self.doc_freq));

        let mut query_expl = Explanation::new(
            self.boost * self.idf * self.query_norm,
            format!("queryWeight({}), product of:", self.description),
        );
        if self.boost != 1.0 {
            query_expl.add_detail(Explanation::new(self.boost, "boost"));
        }
        query_expl.add_detail(idf.clone());
        query_expl.add_detail(Explanation::new(self.query_norm, "queryNorm"));

        let tf = match self.scorer(reader)? {
            Some(mut scorer) => scorer.explain(doc)?,
            None => Explanation::new(0.0, format!("tf(termFreq({})=0)", self.term)),
        };
        let field = self.term.field();
        let norms = field_norms(reader, field)?;
        let field_norm = Explanation::new(
            self.similarity.decode_norm(norm_at(&norms, doc)),
            format!("fieldNorm(field={}, doc={})", field, doc),
        );
        let field_expl = Explanation::new(
            tf.value() * self.idf * field_norm.value(),
            format!("fieldWeight({} in {}), product of:", self.term, doc),
        )
        .with_detail(tf)
        .with_detail(idf)
        .with_detail(field_norm);

        if query_expl.value() == 1.0 {
            return Ok(field_expl);
        }
        Ok(Explanation::new(
            query_expl.value() * field_expl.value(),
            format!("weight({} in {}), product of:", self.description, doc),
        )
        .with_detail(query_expl)
        .with_detail(field_expl))
    }
}
