//! Document filters
//!
//! A filter restricts a search to a set of documents without affecting
//! scores. [`QueryFilter`] caches the match set of a query per reader;
//! [`RangeFilter`] walks the term dictionary directly and never scores.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use roaring::RoaringBitmap;
use tracing::debug;

use crate::index::{IndexReader, ReaderId, Term};
use crate::query::Query;
use crate::search::{BitSetCollector, IndexSearcher, Similarity};
use crate::{Result, SearchError};

/// Restricts search results to a set of documents
pub trait Filter: Send + Sync {
    /// One bit per allowed document of `reader`
    fn bits(&self, reader: &Arc<dyn IndexReader>) -> Result<Arc<RoaringBitmap>>;
}

/// Filter allowing the documents matching a query
///
/// The match set is computed once per reader and cached; repeated calls for
/// the same reader return the same bitset. Entries live until
/// [`evict`](QueryFilter::evict) or [`clear`](QueryFilter::clear) drops them,
/// so callers that retire readers should evict them.
pub struct QueryFilter {
    query: Query,
    similarity: Arc<dyn Similarity>,
    cache: Mutex<HashMap<ReaderId, Arc<RoaringBitmap>>>,
}

impl QueryFilter {
    pub fn new(query: impl Into<Query>, similarity: Arc<dyn Similarity>) -> Self {
        Self {
            query: query.into(),
            similarity,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Number of readers with a cached bitset
    pub fn cached_readers(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop the bitset cached for `reader_id`. Returns whether one was cached.
    pub fn evict(&self, reader_id: ReaderId) -> bool {
        let evicted = self.cache.lock().remove(&reader_id).is_some();
        if evicted {
            debug!(reader_id, "evicted query filter bitset");
        }
        evicted
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl Filter for QueryFilter {
    fn bits(&self, reader: &Arc<dyn IndexReader>) -> Result<Arc<RoaringBitmap>> {
        let reader_id = reader.reader_id();
        if let Some(cached) = self.cache.lock().get(&reader_id) {
            debug!(reader_id, "query filter cache hit");
            return Ok(cached.clone());
        }

        // The lock is not held while searching.
        let searcher = IndexSearcher::new(reader.clone(), self.similarity.clone());
        let mut collector = BitSetCollector::new();
        searcher.search_with_collector(&self.query, None, &mut collector)?;
        let bits = Arc::new(collector.into_bits());
        debug!(reader_id, matches = bits.len(), "query filter cache miss");

        let mut cache = self.cache.lock();
        Ok(cache.entry(reader_id).or_insert(bits).clone())
    }
}

impl fmt::Debug for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryFilter({})", self.query)
    }
}

/// Filter allowing documents with a term of `field` inside a range
#[derive(Clone, Debug, PartialEq)]
pub struct RangeFilter {
    field: String,
    lower: Option<String>,
    upper: Option<String>,
    include_lower: bool,
    include_upper: bool,
}

impl RangeFilter {
    pub fn new(
        field: impl Into<String>,
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        if lower.is_none() && upper.is_none() {
            return Err(SearchError::invalid("at least one bound must be present"));
        }
        if include_lower && lower.is_none() {
            return Err(SearchError::invalid(
                "the lower bound must be present to be inclusive",
            ));
        }
        if include_upper && upper.is_none() {
            return Err(SearchError::invalid(
                "the upper bound must be present to be inclusive",
            ));
        }
        Ok(Self {
            field: field.into(),
            lower,
            upper,
            include_lower,
            include_upper,
        })
    }

    /// Terms up to and including `upper`
    pub fn less(field: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            lower: None,
            upper: Some(upper.into()),
            include_lower: false,
            include_upper: true,
        }
    }

    /// Terms from `lower` upwards, inclusive
    pub fn more(field: impl Into<String>, lower: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            lower: Some(lower.into()),
            upper: None,
            include_lower: true,
            include_upper: false,
        }
    }

    fn above_lower(&self, text: &str) -> bool {
        match &self.lower {
            Some(lower) if !self.include_lower => text > lower.as_str(),
            Some(lower) => text >= lower.as_str(),
            None => true,
        }
    }

    fn past_upper(&self, text: &str) -> bool {
        match &self.upper {
            Some(upper) if self.include_upper => text > upper.as_str(),
            Some(upper) => text >= upper.as_str(),
            None => false,
        }
    }
}

impl Filter for RangeFilter {
    fn bits(&self, reader: &Arc<dyn IndexReader>) -> Result<Arc<RoaringBitmap>> {
        let seed = Term::new(self.field.as_str(), self.lower.as_deref().unwrap_or(""));
        let mut terms = reader.terms_from(&seed)?;
        let mut bits = RoaringBitmap::new();

        while let Some(term) = terms.term() {
            if term.field() != self.field || self.past_upper(term.text()) {
                break;
            }
            if self.above_lower(term.text()) {
                if let Some(mut postings) = reader.term_positions(term)? {
                    while postings.next()? {
                        bits.insert(postings.doc());
                    }
                }
            }
            if !terms.next()? {
                break;
            }
        }
        Ok(Arc::new(bits))
    }
}
