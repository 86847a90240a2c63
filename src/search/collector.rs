//! Hit collection
//!
//! Every scorer reports `(doc, score)` pairs into a [`HitCollector`]. The
//! searcher's own collectors keep the top-N in a bounded min-heap, build
//! filter bitsets, or drop documents a filter excludes.

use ordered_float::OrderedFloat;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::index::DocId;

/// Sink for scored documents
///
/// Calls arrive in increasing document order per scorer; a boolean scorer
/// merging many clauses only guarantees increasing order per window.
pub trait HitCollector {
    fn collect(&mut self, doc: DocId, score: f32);
}

impl<F> HitCollector for F
where
    F: FnMut(DocId, f32),
{
    fn collect(&mut self, doc: DocId, score: f32) {
        self(doc, score)
    }
}

/// A scored document
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    pub doc: DocId,
    pub score: f32,
}

impl ScoreDoc {
    pub fn new(doc: DocId, score: f32) -> Self {
        Self { doc, score }
    }

    /// Rank key: higher score first, then lower document number
    fn rank(&self) -> (OrderedFloat<f32>, Reverse<DocId>) {
        (OrderedFloat(self.score), Reverse(self.doc))
    }
}

impl Eq for ScoreDoc {}

impl PartialOrd for ScoreDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greater means better ranked
impl Ord for ScoreDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Ranked result of a search
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Count of all qualifying matches, regardless of how many were kept
    pub total_hits: usize,
    /// Best matches, sorted by descending score
    pub score_docs: Vec<ScoreDoc>,
}

impl TopDocs {
    pub fn new(total_hits: usize, score_docs: Vec<ScoreDoc>) -> Self {
        Self {
            total_hits,
            score_docs,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.score_docs.is_empty()
    }
}

/// Bounded min-heap holding the best `capacity` hits seen so far
///
/// The weakest kept hit sits at the root, so deciding whether a new hit
/// makes the cut is O(1) and replacing the root is O(log N).
#[derive(Debug)]
pub struct HitQueue {
    heap: BinaryHeap<Reverse<ScoreDoc>>,
    capacity: usize,
}

impl HitQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.min(4096) + 1),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The weakest kept hit
    pub fn top(&self) -> Option<&ScoreDoc> {
        self.heap.peek().map(|Reverse(sd)| sd)
    }

    /// Offer a hit. Returns true if it was kept.
    pub fn insert(&mut self, hit: ScoreDoc) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(hit));
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut weakest) if hit > weakest.0 => {
                *weakest = Reverse(hit);
                true
            }
            _ => false,
        }
    }

    /// Drain into best-first order
    pub fn into_sorted_vec(self) -> Vec<ScoreDoc> {
        // Ascending order of Reverse<_> is best-first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(sd)| sd)
            .collect()
    }
}

/// Collector behind `IndexSearcher::search`: counts and keeps the top hits
#[derive(Debug)]
pub struct TopDocsCollector {
    queue: HitQueue,
    total_hits: usize,
}

impl TopDocsCollector {
    pub fn new(n: usize) -> Self {
        Self {
            queue: HitQueue::new(n),
            total_hits: 0,
        }
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    pub fn into_top_docs(self) -> TopDocs {
        TopDocs::new(self.total_hits, self.queue.into_sorted_vec())
    }
}

impl HitCollector for TopDocsCollector {
    fn collect(&mut self, doc: DocId, score: f32) {
        // zeroed buckets are not hits
        if score > 0.0 {
            self.total_hits += 1;
            self.queue.insert(ScoreDoc::new(doc, score));
        }
    }
}

/// Sets one bit per collected document, whatever its score
#[derive(Debug, Default)]
pub struct BitSetCollector {
    bits: RoaringBitmap,
}

impl BitSetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bits(self) -> RoaringBitmap {
        self.bits
    }
}

impl HitCollector for BitSetCollector {
    fn collect(&mut self, doc: DocId, _score: f32) {
        self.bits.insert(doc);
    }
}

/// Forwards only documents whose bit is set
pub struct FilteredCollector<'a> {
    bits: &'a RoaringBitmap,
    inner: &'a mut dyn HitCollector,
}

impl<'a> FilteredCollector<'a> {
    pub fn new(bits: &'a RoaringBitmap, inner: &'a mut dyn HitCollector) -> Self {
        Self { bits, inner }
    }
}

impl HitCollector for FilteredCollector<'_> {
    fn collect(&mut self, doc: DocId, score: f32) {
        if self.bits.contains(doc) {
            self.inner.collect(doc, score);
        }
    }
}
