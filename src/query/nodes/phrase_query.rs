//! Phrase query - matches terms at nearby positions
//!
//! With a slop of zero the terms must appear adjacent and in order. A
//! positive slop admits occurrences whose total positional displacement
//! from the exact phrase is at most the slop; a transposed pair of terms
//! needs a slop of two.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::index::{DocId, IndexReader, Term, TermPositions, UnionTermPositions};
use crate::query::ast::{boost_suffix, field_prefix, Query, QueryNode};
use crate::search::scorer::{field_norms, norm_at};
use crate::search::{
    Explanation, IndexSearcher, PhraseMatch, PhraseScorer, Scorer, Similarity, Weight,
    WeightState,
};
use crate::{Result, SearchError};

use super::term_query::{default_boost, TermQuery, TermWeight};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PhraseQueryFields")]
pub struct PhraseQuery {
    terms: Vec<Term>,
    /// Maximum total displacement; 0 requires an exact phrase
    pub slop: u32,
    pub boost: f32,
}

/// Wire form of [`PhraseQuery`], checked through [`PhraseQuery::add`]
#[derive(Deserialize)]
struct PhraseQueryFields {
    terms: Vec<Term>,
    #[serde(default)]
    slop: u32,
    #[serde(default = "default_boost")]
    boost: f32,
}

impl TryFrom<PhraseQueryFields> for PhraseQuery {
    type Error = SearchError;

    fn try_from(fields: PhraseQueryFields) -> Result<Self> {
        let mut query = PhraseQuery::new().with_slop(fields.slop).with_boost(fields.boost);
        for term in fields.terms {
            query.add(term)?;
        }
        Ok(query)
    }
}

impl Default for PhraseQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseQuery {
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            slop: 0,
            boost: 1.0,
        }
    }

    /// Append a term. All terms of a phrase must share one field.
    pub fn add(&mut self, term: Term) -> Result<()> {
        if let Some(first) = self.terms.first() {
            if first.field() != term.field() {
                return Err(SearchError::invalid(format!(
                    "all phrase terms must be in field {}, got {}",
                    first.field(),
                    term
                )));
            }
        }
        self.terms.push(term);
        Ok(())
    }

    /// Phrase of whitespace-separated `text` in `field`
    pub fn from_text(field: &str, text: &str) -> Self {
        Self {
            terms: text.split_whitespace().map(|t| Term::new(field, t)).collect(),
            slop: 0,
            boost: 1.0,
        }
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn field(&self) -> Option<&str> {
        self.terms.first().map(Term::field)
    }
}

impl QueryNode for PhraseQuery {
    fn query_type(&self) -> &'static str {
        "phrase"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite_step(&self, _reader: &dyn IndexReader) -> Result<Option<Query>> {
        Ok(None)
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        if let [only] = self.terms.as_slice() {
            let query = TermQuery::new(only.clone()).with_boost(self.boost);
            return Ok(Box::new(TermWeight::new(&query, searcher)?));
        }
        let field = self.field().unwrap_or("");
        let mut doc_freqs = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            doc_freqs.push(format!("{}={}", term.text(), searcher.doc_freq(term)?));
        }
        let texts: Vec<&str> = self.terms.iter().map(Term::text).collect();
        let weight = PhraseWeight::new(
            self.terms.iter().map(|term| vec![term.clone()]).collect(),
            self.slop,
            self.boost,
            PhraseDescriptions {
                query: self.to_query_string(""),
                idf: format!("idf({}: {})", field, doc_freqs.join(" ")),
                field: format!("{}:\"{}\"", field, texts.join(" ")),
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
        let texts: Vec<&str> = self.terms.iter().map(Term::text).collect();
        out.push_str(&texts.join(" "));
        out.push('"');
        if self.slop != 0 {
            out.push_str(&format!("~{}", self.slop));
        }
        out.push_str(&boost_suffix(self.boost));
        out
    }
}

/// Labels used in phrase explanations
pub(crate) struct PhraseDescriptions {
    /// The query as a whole
    pub query: String,
    pub idf: String,
    /// `field:"..."` part of the fieldWeight line
    pub field: String,
}

/// Weight of a phrase whose positions each accept one or more terms
pub(crate) struct PhraseWeight {
    positions: Vec<Vec<Term>>,
    slop: u32,
    boost: f32,
    descriptions: PhraseDescriptions,
    similarity: Arc<dyn Similarity>,
    idf: f32,
    query_norm: f32,
    query_weight: f32,
    value: f32,
    state: WeightState,
}

impl PhraseWeight {
    pub(crate) fn new(
        positions: Vec<Vec<Term>>,
        slop: u32,
        boost: f32,
        descriptions: PhraseDescriptions,
        searcher: &IndexSearcher,
    ) -> Result<Self> {
        let similarity = searcher.similarity().clone();
        let terms: Vec<Term> = positions.iter().flatten().cloned().collect();
        let idf = similarity.idf_terms(&terms, searcher)?;
        Ok(Self {
            positions,
            slop,
            boost,
            descriptions,
            similarity,
            idf,
            query_norm: 0.0,
            query_weight: 0.0,
            value: 0.0,
            state: WeightState::default(),
        })
    }

    fn field(&self) -> &str {
        self.positions
            .iter()
            .flatten()
            .next()
            .map(Term::field)
            .unwrap_or("")
    }

    /// Postings for one position, or `None` if none of its terms occur
    fn position_postings(
        reader: &dyn IndexReader,
        terms: &[Term],
    ) -> Result<Option<Box<dyn TermPositions>>> {
        if let [only] = terms {
            return reader.term_positions(only);
        }
        let mut members = Vec::with_capacity(terms.len());
        for term in terms {
            if let Some(postings) = reader.term_positions(term)? {
                members.push(postings);
            }
        }
        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(UnionTermPositions::new(members)?)))
    }
}

impl Weight for PhraseWeight {
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
        if self.positions.is_empty() {
            return Ok(None);
        }
        let mut postings = Vec::with_capacity(self.positions.len());
        for terms in &self.positions {
            match Self::position_postings(reader, terms)? {
                Some(p) => postings.push(p),
                None => return Ok(None),
            }
        }
        let scorer = PhraseScorer::new(
            postings,
            PhraseMatch::from_slop(self.slop),
            self.similarity.clone(),
            self.value,
            field_norms(reader, self.field())?,
        )?;
        Ok(Some(Box::new(scorer)))
    }

    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation> {
        self.state.ensure_normalized("explain")?;
        let field = self.field();
        let idf = Explanation::new(self.idf, self.descriptions.idf.clone());

        let mut query_expl = Explanation::new(
            self.boost * self.idf * self.query_norm,
            format!("queryWeight({}), product of:", self.descriptions.query),
        );
        if self.boost != 1.0 {
            query_expl.add_detail(Explanation::new(self.boost, "boost"));
        }
        query_expl.add_detail(idf.clone());
        query_expl.add_detail(Explanation::new(self.query_norm, "queryNorm"));

        let tf = match self.scorer(reader)? {
            Some(mut scorer) => scorer.explain(doc)?,
            None => Explanation::new(0.0, "tf(phraseFreq=0.0)"),
        };
        let norms = field_norms(reader, field)?;
        let field_norm = Explanation::new(
            self.similarity.decode_norm(norm_at(&norms, doc)),
            format!("fieldNorm(field={}, doc={})", field, doc),
        );
        let field_expl = Explanation::new(
            tf.value() * self.idf * field_norm.value(),
            format!(
                "fieldWeight({} in {}), product of:",
                self.descriptions.field, doc
            ),
        )
        .with_detail(tf)
        .with_detail(idf)
        .with_detail(field_norm);

        if query_expl.value() == 1.0 {
            return Ok(field_expl);
        }
        Ok(Explanation::new(
            query_expl.value() * field_expl.value(),
            format!("weight({} in {}), product of:", self.descriptions.query, doc),
        )
        .with_detail(query_expl)
        .with_detail(field_expl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::search::{DefaultSimilarity, TopDocs};

    fn create_searcher() -> IndexSearcher {
        let mut builder = MemoryIndex::builder();
        builder.add_document([("body", "the quick brown fox")]);
        builder.add_document([("body", "the brown quick fox")]);
        builder.add_document([("body", "quick as a very brown fox")]);
        builder.add_document([("title", "quick brown")]);
        IndexSearcher::new(Arc::new(builder.build()), Arc::new(DefaultSimilarity))
    }

    fn hits(searcher: &IndexSearcher, query: PhraseQuery) -> Vec<DocId> {
        let mut docs: Vec<DocId> = searcher
            .search(&query.into(), None, 10)
            .unwrap()
            .score_docs
            .iter()
            .map(|sd| sd.doc)
            .collect();
        docs.sort_unstable();
        docs
    }

    #[test]
    fn test_add_rejects_mixed_fields() {
        let mut query = PhraseQuery::new();
        query.add(Term::new("body", "quick")).unwrap();
        let err = query.add(Term::new("title", "brown")).unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
        assert_eq!(query.terms().len(), 1);
    }

    #[test]
    fn test_deserialize_validates_fields() {
        let json = serde_json::json!({
            "type": "phrase",
            "terms": [
                { "field": "body", "text": "quick" },
                { "field": "title", "text": "brown" }
            ]
        });
        let err = serde_json::from_value::<Query>(json).unwrap_err();
        assert!(err.to_string().contains("all phrase terms must be in field body"));

        let json = serde_json::json!({
            "type": "phrase",
            "terms": [
                { "field": "body", "text": "quick" },
                { "field": "body", "text": "brown" }
            ],
            "slop": 2
        });
        let query: Query = serde_json::from_value(json).unwrap();
        assert_eq!(
            query,
            Query::from(PhraseQuery::from_text("body", "quick brown").with_slop(2))
        );
        let back: Query = serde_json::from_str(&serde_json::to_string(&query).unwrap()).unwrap();
        assert_eq!(back, query);
    }

    #[test]
    fn test_display() {
        let query = PhraseQuery::from_text("body", "quick brown").with_slop(2);
        assert_eq!(query.to_query_string("body"), "\"quick brown\"~2");
        assert_eq!(
            query.with_boost(1.5).to_query_string("title"),
            "body:\"quick brown\"~2^1.5"
        );
    }

    #[test]
    fn test_exact_and_sloppy() {
        let searcher = create_searcher();
        assert_eq!(hits(&searcher, PhraseQuery::from_text("body", "quick brown")), vec![0]);
        assert_eq!(
            hits(&searcher, PhraseQuery::from_text("body", "quick brown").with_slop(2)),
            vec![0, 1]
        );
        assert_eq!(
            hits(&searcher, PhraseQuery::from_text("body", "quick brown").with_slop(3)),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_absent_term_has_no_scorer() {
        let searcher = create_searcher();
        let query = Query::from(PhraseQuery::from_text("body", "quick zebra"));
        let weight = searcher.create_normalized_weight(&query).unwrap();
        assert!(weight.scorer(searcher.reader().as_ref()).unwrap().is_none());
        assert_eq!(searcher.search(&query, None, 10).unwrap(), TopDocs::empty());
    }

    #[test]
    fn test_zero_and_one_term_phrases() {
        let searcher = create_searcher();
        assert!(hits(&searcher, PhraseQuery::new()).is_empty());
        assert_eq!(hits(&searcher, PhraseQuery::from_text("title", "brown")), vec![3]);
    }

    #[test]
    fn test_explain_matches_score() {
        let searcher = create_searcher();
        let query = Query::from(PhraseQuery::from_text("body", "quick brown").with_slop(2));
        let top = searcher.search(&query, None, 10).unwrap();
        assert_eq!(top.total_hits, 2);
        for hit in &top.score_docs {
            let explanation = searcher.explain(&query, hit.doc).unwrap();
            assert!((explanation.value() - hit.score).abs() < 1e-5);
        }
        assert_eq!(searcher.explain(&query, 3).unwrap().value(), 0.0);
    }

    #[test]
    fn test_explain_descriptions() {
        let searcher = create_searcher();
        let query = PhraseQuery::from_text("body", "quick brown");
        let mut weight = query.create_weight(&searcher).unwrap();
        weight.sum_of_squared_weights().unwrap();
        weight.normalize(0.25).unwrap();
        let explanation = weight.explain(searcher.reader().as_ref(), 0).unwrap();
        assert_eq!(
            explanation.description(),
            "weight(body:\"quick brown\" in 0), product of:"
        );
        let field_weight = &explanation.details()[1];
        assert_eq!(
            field_weight.description(),
            "fieldWeight(body:\"quick brown\" in 0), product of:"
        );
        assert_eq!(field_weight.details()[0].description(), "tf(phraseFreq=1.0)");
        assert_eq!(
            field_weight.details()[1].description(),
            "idf(body: quick=3 brown=3)"
        );
    }
}
