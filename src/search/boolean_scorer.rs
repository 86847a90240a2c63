//! Bucket-accumulation scorer for boolean queries
//!
//! Documents are scored in windows of [`WINDOW_SIZE`] consecutive numbers.
//! Within a window every clause scorer pushes its hits into a shared table
//! of buckets indexed by `doc % WINDOW_SIZE`; each bucket accumulates the
//! summed score, the bitmask of required/prohibited clauses that matched
//! and the count of matching clauses. After all clauses have reported, the
//! touched buckets are swept: a bucket qualifies when every required bit is
//! set and no prohibited bit is, and its score is scaled by the coordination
//! factor for its clause count.
//!
//! Each clause is scored independently, so no document space larger than
//! one window is ever materialized.

use std::sync::Arc;

use tracing::trace;

use crate::index::DocId;
use crate::search::similarity::Similarity;
use crate::search::{Explanation, HitCollector, Scorer};
use crate::{Result, SearchError};

/// Number of consecutive documents scored per window
pub const WINDOW_SIZE: usize = 1024;

const WINDOW_MASK: DocId = (WINDOW_SIZE - 1) as DocId;

/// Maximum number of required plus prohibited clauses
pub const MAX_MASKED_CLAUSES: usize = 32;

#[derive(Clone, Copy, Debug, Default)]
struct Bucket {
    /// Document this slot currently holds, `None` when free
    doc: Option<DocId>,
    score: f32,
    bits: u32,
    coord: usize,
}

/// Fixed table of buckets plus the list of slots touched this window
struct BucketTable {
    buckets: Vec<Bucket>,
    valid: Vec<usize>,
}

impl BucketTable {
    fn new() -> Self {
        Self {
            buckets: vec![Bucket::default(); WINDOW_SIZE],
            valid: Vec::with_capacity(WINDOW_SIZE),
        }
    }

    fn clear(&mut self) {
        for &slot in &self.valid {
            self.buckets[slot] = Bucket::default();
        }
        self.valid.clear();
    }
}

/// Collector handed to one clause scorer
struct BucketCollector<'a> {
    table: &'a mut BucketTable,
    mask: u32,
}

impl HitCollector for BucketCollector<'_> {
    fn collect(&mut self, doc: DocId, score: f32) {
        let slot = (doc & WINDOW_MASK) as usize;
        let bucket = &mut self.table.buckets[slot];
        if bucket.doc == Some(doc) {
            bucket.score += score;
            bucket.bits |= self.mask;
            bucket.coord += 1;
        } else {
            *bucket = Bucket {
                doc: Some(doc),
                score,
                bits: self.mask,
                coord: 1,
            };
            self.table.valid.push(slot);
        }
    }
}

struct SubScorer {
    scorer: Box<dyn Scorer>,
    mask: u32,
}

/// Scorer combining required, optional and prohibited clause scorers
pub struct BooleanScorer {
    similarity: Arc<dyn Similarity>,
    sub_scorers: Vec<SubScorer>,
    table: BucketTable,
    current_doc: DocId,
    /// Non-prohibited clause count plus one
    max_coord: usize,
    /// `coord(i, max_coord - 1)`, computed on the first call to `score`
    coord_factors: Option<Vec<f32>>,
    required_mask: u32,
    prohibited_mask: u32,
    next_mask: u32,
    /// Required and prohibited clauses offered so far, rejected ones included
    masked_clauses: usize,
}

impl BooleanScorer {
    pub fn new(similarity: Arc<dyn Similarity>) -> Self {
        Self {
            similarity,
            sub_scorers: Vec::new(),
            table: BucketTable::new(),
            current_doc: 0,
            max_coord: 1,
            coord_factors: None,
            required_mask: 0,
            prohibited_mask: 0,
            next_mask: 1,
            masked_clauses: 0,
        }
    }

    /// Add a clause scorer.
    ///
    /// An absent scorer contributes no hits but, unless prohibited, still
    /// counts towards the coordination denominator.
    pub fn add(
        &mut self,
        scorer: Option<Box<dyn Scorer>>,
        required: bool,
        prohibited: bool,
    ) -> Result<()> {
        if self.coord_factors.is_some() {
            return Err(SearchError::illegal_state(
                "cannot add a clause to a boolean scorer that has started scoring",
            ));
        }
        let masked = scorer.is_some() && (required || prohibited);
        if masked {
            self.masked_clauses += 1;
            if self.next_mask == 0 {
                return Err(SearchError::TooManyClauses {
                    count: self.masked_clauses,
                    limit: MAX_MASKED_CLAUSES,
                });
            }
        }
        if !prohibited {
            self.max_coord += 1;
        }
        let Some(scorer) = scorer else {
            return Ok(());
        };

        let mask = if masked {
            let mask = self.next_mask;
            self.next_mask <<= 1;
            mask
        } else {
            0
        };

        if prohibited {
            self.prohibited_mask |= mask;
        } else if required {
            self.required_mask |= mask;
        }
        self.sub_scorers.push(SubScorer { scorer, mask });
        Ok(())
    }

    fn compute_coord_factors(&self) -> Vec<f32> {
        (0..self.max_coord)
            .map(|overlap| self.similarity.coord(overlap, self.max_coord - 1))
            .collect()
    }

    fn collect_hits(&mut self, collector: &mut dyn HitCollector) {
        let coord_factors = self.coord_factors.as_deref().unwrap_or(&[]);
        let mut emitted = 0usize;
        for &slot in &self.table.valid {
            let bucket = &self.table.buckets[slot];
            let Some(doc) = bucket.doc else { continue };
            if bucket.bits & self.prohibited_mask == 0
                && bucket.bits & self.required_mask == self.required_mask
            {
                let coord = coord_factors.get(bucket.coord).copied().unwrap_or(0.0);
                collector.collect(doc, bucket.score * coord);
                emitted += 1;
            }
        }
        trace!(
            window_end = self.current_doc,
            touched = self.table.valid.len(),
            emitted,
            "swept boolean window"
        );
        self.table.clear();
    }
}

impl Scorer for BooleanScorer {
    fn score(&mut self, collector: &mut dyn HitCollector, end: DocId) -> Result<()> {
        if self.coord_factors.is_none() {
            self.coord_factors = Some(self.compute_coord_factors());
        }
        if self.sub_scorers.is_empty() {
            return Ok(());
        }
        while self.current_doc < end {
            self.current_doc = self
                .current_doc
                .saturating_add(WINDOW_SIZE as DocId)
                .min(end);
            for sub in &mut self.sub_scorers {
                let mut bucket_collector = BucketCollector {
                    table: &mut self.table,
                    mask: sub.mask,
                };
                sub.scorer.score(&mut bucket_collector, self.current_doc)?;
            }
            self.collect_hits(collector);
        }
        Ok(())
    }

    fn explain(&mut self, _doc: DocId) -> Result<Explanation> {
        Err(SearchError::unsupported(
            "boolean scorers cannot explain; explain through the boolean weight",
        ))
    }
}
