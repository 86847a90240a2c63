//! Search orchestration
//!
//! [`IndexSearcher`] drives a query through rewrite, weight creation and
//! normalization, then scores the whole reader into a collector.

use std::sync::Arc;

use tracing::debug;

use crate::config::SearchConfig;
use crate::index::{DocId, IndexReader, StoredDocument, Term};
use crate::query::Query;
use crate::search::collector::{FilteredCollector, HitCollector, TopDocs, TopDocsCollector};
use crate::search::{Explanation, Filter, Hits, Similarity, Weight};
use crate::{Result, SearchError};

/// Runs queries against one reader
///
/// Cloning is cheap: the reader, similarity and configuration are shared.
#[derive(Clone)]
pub struct IndexSearcher {
    reader: Arc<dyn IndexReader>,
    similarity: Arc<dyn Similarity>,
    config: Arc<SearchConfig>,
}

impl IndexSearcher {
    /// Create a searcher with the default configuration
    pub fn new(reader: Arc<dyn IndexReader>, similarity: Arc<dyn Similarity>) -> Self {
        Self {
            reader,
            similarity,
            config: Arc::new(SearchConfig::default()),
        }
    }

    /// Replace the configuration after validating it
    pub fn with_config(mut self, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        self.config = Arc::new(config);
        Ok(self)
    }

    pub fn reader(&self) -> &Arc<dyn IndexReader> {
        &self.reader
    }

    pub fn similarity(&self) -> &Arc<dyn Similarity> {
        &self.similarity
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn max_doc(&self) -> u32 {
        self.reader.max_doc()
    }

    pub fn doc_freq(&self, term: &Term) -> Result<u32> {
        self.reader.doc_freq(term)
    }

    /// Stored fields of `doc`
    pub fn doc(&self, doc: DocId) -> Result<StoredDocument> {
        self.reader
            .document(doc)?
            .ok_or_else(|| SearchError::invalid(format!("document {} out of range", doc)))
    }

    /// Rewrite `query` until it stops changing
    pub fn rewrite(&self, query: &Query) -> Result<Query> {
        let mut current = query.clone();
        for pass in 0..self.config.max_rewrite_passes {
            match current.rewrite_step(self.reader.as_ref())? {
                Some(rewritten) => current = rewritten,
                None => {
                    debug!(passes = pass, query = %current, "rewrote query");
                    return Ok(current);
                }
            }
        }
        Err(SearchError::RewriteLimitExceeded(
            self.config.max_rewrite_passes,
        ))
    }

    /// Rewrite, create the weight, and run the normalization protocol
    pub fn create_normalized_weight(&self, query: &Query) -> Result<Box<dyn Weight>> {
        let rewritten = self.rewrite(query)?;
        let mut weight = rewritten.create_weight(self)?;
        let sum = weight.sum_of_squared_weights()?;
        let norm = self.similarity.query_norm(sum);
        weight.normalize(norm)?;
        debug!(
            query_type = rewritten.query_type(),
            sum_of_squared_weights = sum,
            query_norm = norm,
            "normalized weight"
        );
        Ok(weight)
    }

    /// Return the `n` best-scoring documents matching `query` that pass
    /// `filter`
    pub fn search(&self, query: &Query, filter: Option<&dyn Filter>, n: usize) -> Result<TopDocs> {
        let weight = self.create_normalized_weight(query)?;
        let Some(mut scorer) = weight.scorer(self.reader.as_ref())? else {
            debug!("query cannot match, skipping scoring");
            return Ok(TopDocs::empty());
        };
        let bits = filter.map(|f| f.bits(&self.reader)).transpose()?;

        let mut collector = TopDocsCollector::new(n);
        let end = self.reader.max_doc();
        match &bits {
            Some(bits) => {
                scorer.score(&mut FilteredCollector::new(bits, &mut collector), end)?
            }
            None => scorer.score(&mut collector, end)?,
        }

        let top_docs = collector.into_top_docs();
        debug!(
            total_hits = top_docs.total_hits,
            returned = top_docs.score_docs.len(),
            "search complete"
        );
        Ok(top_docs)
    }

    /// Lazily fetched, score-normalized view of every match of `query`
    pub fn hits<'a>(&'a self, query: &Query, filter: Option<&'a dyn Filter>) -> Result<Hits<'a>> {
        Hits::new(self, query, filter)
    }

    /// Report every match of `query` passing `filter` to `collector`, in no
    /// particular score order
    pub fn search_with_collector(
        &self,
        query: &Query,
        filter: Option<&dyn Filter>,
        collector: &mut dyn HitCollector,
    ) -> Result<()> {
        let weight = self.create_normalized_weight(query)?;
        let Some(mut scorer) = weight.scorer(self.reader.as_ref())? else {
            return Ok(());
        };
        let end = self.reader.max_doc();
        match filter {
            Some(filter) => {
                let bits = filter.bits(&self.reader)?;
                scorer.score(&mut FilteredCollector::new(&bits, collector), end)
            }
            None => scorer.score(collector, end),
        }
    }

    /// Explain how `doc` scores against `query`
    pub fn explain(&self, query: &Query, doc: DocId) -> Result<Explanation> {
        let weight = self.create_normalized_weight(query)?;
        weight.explain(self.reader.as_ref(), doc)
    }
}

impl std::fmt::Debug for IndexSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSearcher")
            .field("reader_id", &self.reader.reader_id())
            .field("max_doc", &self.reader.max_doc())
            .field("similarity", &self.similarity)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::query::{BooleanQuery, Occur, RangeQuery, TermQuery};
    use crate::search::DefaultSimilarity;

    fn create_searcher() -> IndexSearcher {
        let mut builder = MemoryIndex::builder();
        builder.add_document([("body", "rust is fast"), ("tag", "lang")]);
        builder.add_document([("body", "rust rust rust"), ("tag", "lang")]);
        builder.add_document([("body", "python is slow"), ("tag", "lang")]);
        builder.add_document([("body", "coffee")]);
        IndexSearcher::new(Arc::new(builder.build()), Arc::new(DefaultSimilarity))
    }

    #[test]
    fn test_search_term_ranks_by_score() {
        let searcher = create_searcher();
        let query = Query::from(TermQuery::new(Term::new("body", "rust")));
        let top = searcher.search(&query, None, 10).unwrap();
        assert_eq!(top.total_hits, 2);
        assert_eq!(top.score_docs[0].doc, 1);
        assert!(top.score_docs[0].score > top.score_docs[1].score);
    }

    #[test]
    fn test_search_absent_term_is_empty() {
        let searcher = create_searcher();
        let query = Query::from(TermQuery::new(Term::new("body", "java")));
        assert_eq!(searcher.search(&query, None, 10).unwrap(), TopDocs::empty());
    }

    #[test]
    fn test_search_limits_results_but_counts_all() {
        let searcher = create_searcher();
        let query = Query::from(TermQuery::new(Term::new("tag", "lang")));
        let top = searcher.search(&query, None, 1).unwrap();
        assert_eq!(top.total_hits, 3);
        assert_eq!(top.score_docs.len(), 1);
    }

    #[test]
    fn test_rewrite_reaches_fixed_point() {
        let searcher = create_searcher();
        let range = RangeQuery::new(
            Some(Term::new("body", "fast")),
            Some(Term::new("body", "python")),
            true,
        )
        .unwrap();
        let rewritten = searcher.rewrite(&Query::from(range)).unwrap();
        match rewritten {
            Query::Boolean(boolean) => assert_eq!(boolean.clauses().len(), 3),
            other => panic!("unexpected rewrite: {}", other),
        }
    }

    #[test]
    fn test_rewrite_limit() {
        let searcher = create_searcher()
            .with_config(SearchConfig::default().with_max_rewrite_passes(1))
            .unwrap();
        let inner = BooleanQuery::new()
            .with_clause(TermQuery::new(Term::new("body", "rust")), Occur::Required);
        let nested = BooleanQuery::new().with_clause(inner, Occur::Required);
        let err = searcher.rewrite(&Query::from(nested)).unwrap_err();
        assert!(matches!(err, SearchError::RewriteLimitExceeded(1)));
    }

    #[test]
    fn test_search_with_collector_reports_every_match() {
        let searcher = create_searcher();
        let query = Query::from(TermQuery::new(Term::new("body", "is")));
        let mut docs = Vec::new();
        searcher
            .search_with_collector(&query, None, &mut |doc: DocId, _: f32| docs.push(doc))
            .unwrap();
        docs.sort_unstable();
        assert_eq!(docs, vec![0, 2]);
    }

    #[test]
    fn test_doc_and_doc_freq() {
        let searcher = create_searcher();
        assert_eq!(searcher.max_doc(), 4);
        assert_eq!(searcher.doc_freq(&Term::new("body", "rust")).unwrap(), 2);
        assert_eq!(searcher.doc(3).unwrap().get("body"), Some("coffee"));
        assert!(searcher.doc(9).is_err());
    }

    #[test]
    fn test_with_config_validates() {
        let err = create_searcher()
            .with_config(SearchConfig::default().with_max_clause_count(0))
            .unwrap_err();
        assert!(err.is_usage_error());
    }
}
