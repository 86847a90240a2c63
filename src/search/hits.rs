//! Lazily fetched result list
//!
//! [`Hits`] exposes every match of a query by rank without collecting them
//! all up front. The first fetch gathers the top 100; asking for a rank past
//! what has been gathered reruns the search for at least twice as many.
//! Scores are divided by the top score whenever it exceeds 1, so they fall
//! in (0, 1].

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use crate::index::{DocId, StoredDocument};
use crate::query::Query;
use crate::search::{Filter, IndexSearcher, ScoreDoc};
use crate::{Result, SearchError};

/// Ranks gathered by the first fetch are twice this
const INITIAL_FETCH: usize = 50;

/// Stored documents kept in memory
const DOC_CACHE_SIZE: usize = 200;

/// Ranked matches of one query, fetched on demand
pub struct Hits<'a> {
    searcher: &'a IndexSearcher,
    query: Query,
    filter: Option<&'a dyn Filter>,
    length: usize,
    fetched: Vec<ScoreDoc>,
    docs: LruCache<DocId, StoredDocument>,
}

impl<'a> Hits<'a> {
    pub(crate) fn new(
        searcher: &'a IndexSearcher,
        query: &Query,
        filter: Option<&'a dyn Filter>,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(DOC_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        let mut hits = Self {
            searcher,
            query: query.clone(),
            filter,
            length: 0,
            fetched: Vec::new(),
            docs: LruCache::new(capacity),
        };
        hits.fetch(INITIAL_FETCH)?;
        Ok(hits)
    }

    /// Rerun the search for at least `min` ranks (twice the larger of `min`
    /// and what is already held)
    fn fetch(&mut self, min: usize) -> Result<()> {
        let n = min.max(self.fetched.len()) * 2;
        let top = self.searcher.search(&self.query, self.filter, n)?;
        self.length = top.total_hits;

        let score_norm = match top.score_docs.first() {
            Some(best) if best.score > 1.0 => 1.0 / best.score,
            _ => 1.0,
        };
        let end = top.score_docs.len().min(self.length);
        let start = self.fetched.len().min(end);
        self.fetched.extend(
            top.score_docs[start..end]
                .iter()
                .map(|sd| ScoreDoc::new(sd.doc, sd.score * score_norm)),
        );
        debug!(
            requested = n,
            fetched = self.fetched.len(),
            total_hits = self.length,
            "fetched hits"
        );
        Ok(())
    }

    fn hit(&mut self, n: usize) -> Result<ScoreDoc> {
        if n >= self.length {
            return Err(SearchError::invalid(format!(
                "hit {} out of range, {} hits",
                n, self.length
            )));
        }
        if n >= self.fetched.len() {
            self.fetch(n)?;
        }
        self.fetched.get(n).copied().ok_or_else(|| {
            SearchError::illegal_state(format!("hit {} missing after fetch", n))
        })
    }

    /// Total number of matches
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Normalized score of the `n`th ranked match
    pub fn score(&mut self, n: usize) -> Result<f32> {
        Ok(self.hit(n)?.score)
    }

    /// Document number of the `n`th ranked match
    pub fn id(&mut self, n: usize) -> Result<DocId> {
        Ok(self.hit(n)?.doc)
    }

    /// Stored fields of the `n`th ranked match
    pub fn doc(&mut self, n: usize) -> Result<StoredDocument> {
        let id = self.id(n)?;
        if let Some(doc) = self.docs.get(&id) {
            return Ok(doc.clone());
        }
        let doc = self.searcher.doc(id)?;
        self.docs.put(id, doc.clone());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, Term};
    use crate::query::TermQuery;
    use crate::search::DefaultSimilarity;
    use std::sync::Arc;

    fn searcher_of(texts: impl IntoIterator<Item = String>) -> IndexSearcher {
        let mut builder = MemoryIndex::builder();
        for text in texts {
            builder.add_document([("body", text)]);
        }
        IndexSearcher::new(Arc::new(builder.build()), Arc::new(DefaultSimilarity))
    }

    fn term(text: &str) -> Query {
        TermQuery::new(Term::new("body", text)).into()
    }

    /// `count` documents containing `x`, with lengths cycling 1..=4
    fn uniform_searcher(count: usize) -> IndexSearcher {
        searcher_of((0..count).map(|i| vec!["x"; 1 + i % 4].join(" ")))
    }

    fn rare_searcher() -> IndexSearcher {
        let mut texts = vec!["rare rare rare rare".to_string(), "rare x x x".to_string()];
        texts.extend((0..20).map(|_| "x y".to_string()));
        searcher_of(texts)
    }

    #[test]
    fn test_scores_rescaled_when_top_exceeds_one() {
        let searcher = rare_searcher();
        let raw = searcher.search(&term("rare"), None, 10).unwrap();
        assert!(raw.score_docs[0].score > 1.0);

        let mut hits = searcher.hits(&term("rare"), None).unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits.score(0).unwrap() - 1.0).abs() < 1e-6);
        let expected = raw.score_docs[1].score / raw.score_docs[0].score;
        assert!((hits.score(1).unwrap() - expected).abs() < 1e-6);
        assert_eq!(hits.id(0).unwrap(), raw.score_docs[0].doc);
    }

    #[test]
    fn test_scores_kept_when_top_at_most_one() {
        let searcher = rare_searcher();
        let raw = searcher.search(&term("x"), None, 100).unwrap();
        assert!(raw.score_docs[0].score <= 1.0);

        let mut hits = searcher.hits(&term("x"), None).unwrap();
        assert_eq!(hits.len(), raw.total_hits);
        for (rank, expected) in raw.score_docs.iter().enumerate() {
            assert_eq!(hits.id(rank).unwrap(), expected.doc);
            assert_eq!(hits.score(rank).unwrap(), expected.score);
        }
    }

    #[test]
    fn test_fetches_lazily() {
        let searcher = uniform_searcher(150);
        let mut hits = searcher.hits(&term("x"), None).unwrap();
        assert_eq!(hits.len(), 150);
        assert_eq!(hits.fetched.len(), 2 * INITIAL_FETCH);

        let all = searcher.search(&term("x"), None, 150).unwrap();
        assert_eq!(hits.id(120).unwrap(), all.score_docs[120].doc);
        assert_eq!(hits.fetched.len(), 150);
        let ranked: Vec<DocId> = (0..150).map(|n| hits.id(n).unwrap()).collect();
        let expected: Vec<DocId> = all.score_docs.iter().map(|sd| sd.doc).collect();
        assert_eq!(ranked, expected);
    }

    #[test]
    fn test_out_of_range() {
        let searcher = uniform_searcher(5);
        let mut hits = searcher.hits(&term("x"), None).unwrap();
        assert!(matches!(hits.score(5), Err(SearchError::InvalidArgument(_))));

        let mut none = searcher.hits(&term("missing"), None).unwrap();
        assert!(none.is_empty());
        assert!(matches!(none.id(0), Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_document_cache_is_bounded() {
        let searcher = uniform_searcher(250);
        let mut hits = searcher.hits(&term("x"), None).unwrap();
        for n in 0..hits.len() {
            let id = hits.id(n).unwrap();
            assert_eq!(hits.doc(n).unwrap(), searcher.doc(id).unwrap());
        }
        assert_eq!(hits.docs.len(), DOC_CACHE_SIZE);

        let id = hits.id(249).unwrap();
        assert!(hits.docs.contains(&id));
        assert_eq!(hits.doc(249).unwrap(), searcher.doc(id).unwrap());
    }
}
