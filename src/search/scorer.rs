//! Forward document scorers

use std::sync::Arc;

use crate::index::{DocId, IndexReader, Term, TermPositions};
use crate::search::similarity::{encode_norm, Similarity};
use crate::search::{Explanation, HitCollector};
use crate::Result;

/// Document number used once a postings cursor is exhausted
pub const NO_MORE_DOCS: DocId = DocId::MAX;

/// Stateful, single-use scorer over increasing document numbers
///
/// `score` is resumable: each call reports the matching documents below
/// `end` that were not reported by a previous call.
pub trait Scorer {
    /// Report every remaining matching document `< end` to `collector`
    fn score(&mut self, collector: &mut dyn HitCollector, end: DocId) -> Result<()>;

    /// Explain the frequency component of `doc`'s score
    fn explain(&mut self, doc: DocId) -> Result<Explanation>;
}

/// Norms of `field`, or a uniform norm of 1.0 when the field carries none
pub(crate) fn field_norms(reader: &dyn IndexReader, field: &str) -> Result<Arc<[u8]>> {
    match reader.norms(field)? {
        Some(norms) => Ok(norms),
        None => Ok(Arc::from(vec![encode_norm(1.0); reader.max_doc() as usize])),
    }
}

pub(crate) fn norm_at(norms: &[u8], doc: DocId) -> u8 {
    norms.get(doc as usize).copied().unwrap_or(0)
}

const SCORE_CACHE_SIZE: usize = 32;

/// Scorer for a single term
pub struct TermScorer {
    term: Term,
    postings: Box<dyn TermPositions>,
    doc: DocId,
    norms: Arc<[u8]>,
    weight_value: f32,
    similarity: Arc<dyn Similarity>,
    /// `tf(f) * weight_value` for small frequencies
    score_cache: [f32; SCORE_CACHE_SIZE],
}

impl TermScorer {
    pub fn new(
        term: Term,
        mut postings: Box<dyn TermPositions>,
        similarity: Arc<dyn Similarity>,
        weight_value: f32,
        norms: Arc<[u8]>,
    ) -> Result<Self> {
        let doc = if postings.next()? {
            postings.doc()
        } else {
            NO_MORE_DOCS
        };
        let mut score_cache = [0.0f32; SCORE_CACHE_SIZE];
        for (freq, slot) in score_cache.iter_mut().enumerate() {
            *slot = similarity.tf(freq as f32) * weight_value;
        }
        Ok(Self {
            term,
            postings,
            doc,
            norms,
            weight_value,
            similarity,
            score_cache,
        })
    }

    fn advance(&mut self) -> Result<()> {
        self.doc = if self.postings.next()? {
            self.postings.doc()
        } else {
            NO_MORE_DOCS
        };
        Ok(())
    }
}

impl Scorer for TermScorer {
    fn score(&mut self, collector: &mut dyn HitCollector, end: DocId) -> Result<()> {
        while self.doc < end {
            let freq = self.postings.freq() as usize;
            let raw = match self.score_cache.get(freq) {
                Some(cached) => *cached,
                None => self.similarity.tf(freq as f32) * self.weight_value,
            };
            let score = raw * self.similarity.decode_norm(norm_at(&self.norms, self.doc));
            collector.collect(self.doc, score);
            self.advance()?;
        }
        Ok(())
    }

    fn explain(&mut self, doc: DocId) -> Result<Explanation> {
        while self.doc < doc {
            self.advance()?;
        }
        let freq = if self.doc == doc {
            self.postings.freq()
        } else {
            0
        };
        Ok(Explanation::new(
            self.similarity.tf(freq as f32),
            format!("tf(termFreq({})={})", self.term, freq),
        ))
    }
}
