//! Positional phrase scoring
//!
//! Every phrase term gets a cursor whose positions are shifted back by the
//! term's index in the phrase, so an exact occurrence of the phrase shows up
//! as all cursors sitting on the same shifted position. A sloppy match is a
//! window whose shifted positions span at most `slop`.

use std::sync::Arc;

use crate::index::{DocId, TermPositions};
use crate::search::scorer::{norm_at, NO_MORE_DOCS};
use crate::search::similarity::Similarity;
use crate::search::{Explanation, HitCollector, Scorer};
use crate::Result;

/// Postings cursor of one phrase term
struct PhrasePositions {
    postings: Box<dyn TermPositions>,
    /// Index of the term within the phrase
    offset: i64,
    doc: DocId,
    /// Current position minus `offset`
    position: i64,
    remaining: u32,
}

impl PhrasePositions {
    fn new(mut postings: Box<dyn TermPositions>, offset: usize) -> Result<Self> {
        let doc = if postings.next()? {
            postings.doc()
        } else {
            NO_MORE_DOCS
        };
        Ok(Self {
            postings,
            offset: offset as i64,
            doc,
            position: 0,
            remaining: 0,
        })
    }

    fn next_doc(&mut self) -> Result<()> {
        self.doc = if self.postings.next()? {
            self.postings.doc()
        } else {
            NO_MORE_DOCS
        };
        self.position = 0;
        self.remaining = 0;
        Ok(())
    }

    fn first_position(&mut self) -> Result<bool> {
        self.remaining = self.postings.freq();
        self.next_position()
    }

    fn next_position(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            return Ok(false);
        }
        self.remaining -= 1;
        self.position = self.postings.next_position()? as i64 - self.offset;
        Ok(true)
    }
}

/// How positions within a document are matched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhraseMatch {
    /// All terms adjacent and in order
    Exact,
    /// Terms within a total displacement of `slop` positions
    Sloppy(u32),
}

impl PhraseMatch {
    pub fn from_slop(slop: u32) -> Self {
        if slop == 0 {
            PhraseMatch::Exact
        } else {
            PhraseMatch::Sloppy(slop)
        }
    }
}

/// Scorer for a multi-term phrase
pub struct PhraseScorer {
    positions: Vec<PhrasePositions>,
    mode: PhraseMatch,
    similarity: Arc<dyn Similarity>,
    norms: Arc<[u8]>,
    weight_value: f32,
    /// Document and frequency of the last fully aligned document
    last_aligned: Option<(DocId, f32)>,
}

impl PhraseScorer {
    /// `postings` holds one cursor per phrase term, in phrase order
    pub fn new(
        postings: Vec<Box<dyn TermPositions>>,
        mode: PhraseMatch,
        similarity: Arc<dyn Similarity>,
        weight_value: f32,
        norms: Arc<[u8]>,
    ) -> Result<Self> {
        let positions = postings
            .into_iter()
            .enumerate()
            .map(|(offset, postings)| PhrasePositions::new(postings, offset))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            positions,
            mode,
            similarity,
            norms,
            weight_value,
            last_aligned: None,
        })
    }

    fn max_doc(&self) -> DocId {
        self.positions.iter().map(|pp| pp.doc).max().unwrap_or(NO_MORE_DOCS)
    }

    fn phrase_freq(&mut self) -> Result<f32> {
        match self.mode {
            PhraseMatch::Exact => self.exact_freq(),
            PhraseMatch::Sloppy(slop) => self.sloppy_freq(slop),
        }
    }

    /// Count the positions where every cursor lines up
    fn exact_freq(&mut self) -> Result<f32> {
        for pp in &mut self.positions {
            if !pp.first_position()? {
                return Ok(0.0);
            }
        }
        let mut freq = 0u32;
        loop {
            let target = self.positions.iter().map(|pp| pp.position).max().unwrap_or(0);
            let mut aligned = true;
            for pp in &mut self.positions {
                while pp.position < target {
                    if !pp.next_position()? {
                        return Ok(freq as f32);
                    }
                }
                if pp.position > target {
                    aligned = false;
                }
            }
            if aligned {
                freq += 1;
                if !self.positions[0].next_position()? {
                    return Ok(freq as f32);
                }
            }
        }
    }

    /// Sum `sloppy_freq(length)` over the minimal windows of length <= slop
    ///
    /// Repeatedly takes the cursor with the smallest position, advances it
    /// as far as it can go while staying at or below the next-smallest
    /// position, and scores the window from its last such position to the
    /// largest position. Stops once any cursor runs out of positions.
    fn sloppy_freq(&mut self, slop: u32) -> Result<f32> {
        let mut end = i64::MIN;
        for pp in &mut self.positions {
            if !pp.first_position()? {
                return Ok(0.0);
            }
            end = end.max(pp.position);
        }

        let mut freq = 0.0f32;
        loop {
            let (min_index, next) = self.min_and_runner_up();
            let pp = &mut self.positions[min_index];
            let mut start = pp.position;
            let mut done = false;
            while pp.position <= next {
                start = pp.position;
                if !pp.next_position()? {
                    done = true;
                    break;
                }
            }

            let match_length = end - start;
            if match_length <= slop as i64 {
                freq += self.similarity.sloppy_freq(match_length.max(0) as u32);
            }
            end = end.max(self.positions[min_index].position);
            if done {
                return Ok(freq);
            }
        }
    }

    /// Index of the smallest position and the smallest position among the
    /// remaining cursors (its own position when it is alone)
    fn min_and_runner_up(&self) -> (usize, i64) {
        let mut min_index = 0;
        for (index, pp) in self.positions.iter().enumerate() {
            if pp.position < self.positions[min_index].position {
                min_index = index;
            }
        }
        let next = self
            .positions
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != min_index)
            .map(|(_, pp)| pp.position)
            .min()
            .unwrap_or(self.positions[min_index].position);
        (min_index, next)
    }
}

impl Scorer for PhraseScorer {
    fn score(&mut self, collector: &mut dyn HitCollector, end: DocId) -> Result<()> {
        if self.positions.is_empty() {
            return Ok(());
        }
        loop {
            let target = self.max_doc();
            if target >= end {
                return Ok(());
            }
            let mut aligned = true;
            for pp in &mut self.positions {
                while pp.doc < target {
                    pp.next_doc()?;
                }
                if pp.doc != target {
                    aligned = false;
                }
            }
            if !aligned {
                continue;
            }

            let freq = self.phrase_freq()?;
            self.last_aligned = Some((target, freq));
            if freq > 0.0 {
                let score = self.similarity.tf(freq)
                    * self.weight_value
                    * self.similarity.decode_norm(norm_at(&self.norms, target));
                collector.collect(target, score);
            }
            self.positions[0].next_doc()?;
        }
    }

    fn explain(&mut self, doc: DocId) -> Result<Explanation> {
        let mut ignore = |_: DocId, _: f32| {};
        self.score(&mut ignore, doc.saturating_add(1))?;
        let freq = match self.last_aligned {
            Some((aligned, freq)) if aligned == doc => freq,
            _ => 0.0,
        };
        Ok(Explanation::new(
            self.similarity.tf(freq),
            format!("tf(phraseFreq={:?})", freq),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexReader, MemoryIndex, Term};
    use crate::search::scorer::field_norms;
    use crate::search::similarity::DefaultSimilarity;

    fn create_test_index() -> MemoryIndex {
        let mut builder = MemoryIndex::builder();
        builder.add_document([("body", "quick brown fox")]);
        builder.add_document([("body", "brown quick fox")]);
        builder.add_document([("body", "quick red brown fox")]);
        builder.add_document([("body", "quick brown quick brown")]);
        builder.build()
    }

    fn phrase_hits(index: &MemoryIndex, words: &[&str], slop: u32) -> Vec<(DocId, f32)> {
        let postings = words
            .iter()
            .map(|w| index.term_positions(&Term::new("body", *w)).unwrap().unwrap())
            .collect();
        let mut scorer = PhraseScorer::new(
            postings,
            PhraseMatch::from_slop(slop),
            Arc::new(DefaultSimilarity),
            1.0,
            field_norms(index, "body").unwrap(),
        )
        .unwrap();
        let mut hits = Vec::new();
        scorer
            .score(&mut |doc: DocId, score: f32| hits.push((doc, score)), index.max_doc())
            .unwrap();
        hits
    }

    fn docs(hits: &[(DocId, f32)]) -> Vec<DocId> {
        hits.iter().map(|h| h.0).collect()
    }

    #[test]
    fn test_exact_phrase() {
        let index = create_test_index();
        let hits = phrase_hits(&index, &["quick", "brown"], 0);
        assert_eq!(docs(&hits), vec![0, 3]);
        // two occurrences in doc 3: tf(2) * norm(4 tokens)
        assert!((hits[1].1 - 2f32.sqrt() * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sloppy_phrase_allows_gap() {
        let index = create_test_index();
        assert_eq!(docs(&phrase_hits(&index, &["quick", "brown"], 1)), vec![0, 2, 3]);
    }

    #[test]
    fn test_sloppy_phrase_transposition_needs_two() {
        let index = create_test_index();
        assert!(!docs(&phrase_hits(&index, &["quick", "brown"], 1)).contains(&1));
        assert!(docs(&phrase_hits(&index, &["quick", "brown"], 2)).contains(&1));
    }

    #[test]
    fn test_sloppy_exact_match_scores_full_frequency() {
        let index = create_test_index();
        let hits = phrase_hits(&index, &["quick", "brown"], 1);
        // doc 0 is an exact match: sloppy_freq(0) = 1
        let norm = DefaultSimilarity.decode_norm(crate::search::similarity::encode_norm(
            DefaultSimilarity.length_norm("body", 3),
        ));
        assert!((hits[0].1 - norm).abs() < 1e-6);
    }

    #[test]
    fn test_explain_reports_phrase_freq() {
        let index = create_test_index();
        let postings = ["quick", "brown"]
            .iter()
            .map(|w| index.term_positions(&Term::new("body", *w)).unwrap().unwrap())
            .collect();
        let mut scorer = PhraseScorer::new(
            postings,
            PhraseMatch::Exact,
            Arc::new(DefaultSimilarity),
            1.0,
            field_norms(&index, "body").unwrap(),
        )
        .unwrap();
        let explanation = scorer.explain(3).unwrap();
        assert_eq!(explanation.description(), "tf(phraseFreq=2.0)");
    }
}
