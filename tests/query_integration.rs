//! Integration tests for query execution
//!
//! Builds a small in-memory corpus and runs every query type end to end
//! through the searcher.

use std::sync::Arc;

use ranksmith::index::MemoryIndex;
use ranksmith::query::{
    BooleanQuery, MultiPhraseQuery, MultiTermQuery, PhraseQuery, Query, RangeQuery, TermQuery,
};
use ranksmith::search::{DefaultSimilarity, Filter, IndexSearcher, QueryFilter, RangeFilter};
use ranksmith::{DocId, SearchConfig, SearchError, Term};

fn setup_test_index() -> IndexSearcher {
    // RUST_LOG=ranksmith=debug shows rewrite and normalization steps
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut builder = MemoryIndex::builder();
    let docs = [
        ("rust programming language systems", "2019"),
        ("python programming scripting language", "2020"),
        ("rust systems programming performance", "2021"),
        ("javascript web programming frontend", "2022"),
        ("rust cargo package manager", "2023"),
    ];
    for (content, year) in docs {
        builder.add_document([("content", content), ("year", year)]);
    }
    IndexSearcher::new(Arc::new(builder.build()), Arc::new(DefaultSimilarity))
}

fn term(text: &str) -> TermQuery {
    TermQuery::new(Term::new("content", text))
}

fn matching_docs(searcher: &IndexSearcher, query: &Query, filter: Option<&dyn Filter>) -> Vec<DocId> {
    let mut docs: Vec<DocId> = searcher
        .search(query, filter, 100)
        .unwrap()
        .score_docs
        .iter()
        .map(|hit| hit.doc)
        .collect();
    docs.sort_unstable();
    docs
}

#[test]
fn test_term_query() {
    let searcher = setup_test_index();
    let top = searcher.search(&term("rust").into(), None, 10).unwrap();
    assert_eq!(top.total_hits, 3);
    assert_eq!(matching_docs(&searcher, &term("rust").into(), None), vec![0, 2, 4]);
}

#[test]
fn test_bool_must_and_must_not() {
    let searcher = setup_test_index();
    let query = BooleanQuery::new().must(term("rust")).must_not(term("cargo"));
    assert_eq!(matching_docs(&searcher, &query.into(), None), vec![0, 2]);
}

#[test]
fn test_bool_should() {
    let searcher = setup_test_index();
    let query = BooleanQuery::new().should(term("python")).should(term("javascript"));
    assert_eq!(matching_docs(&searcher, &query.into(), None), vec![1, 3]);
}

#[test]
fn test_nested_bool() {
    let searcher = setup_test_index();
    let inner = BooleanQuery::new().should(term("python")).should(term("cargo"));
    let query = BooleanQuery::new().must(inner).must_not(term("scripting"));
    assert_eq!(matching_docs(&searcher, &query.into(), None), vec![4]);
}

#[test]
fn test_phrase_query() {
    let searcher = setup_test_index();
    let exact = PhraseQuery::from_text("content", "systems programming");
    assert_eq!(matching_docs(&searcher, &exact.into(), None), vec![2]);

    let swapped = PhraseQuery::from_text("content", "programming systems");
    assert!(matching_docs(&searcher, &swapped.clone().into(), None).is_empty());
    assert_eq!(
        matching_docs(&searcher, &swapped.clone().with_slop(1).into(), None),
        vec![0]
    );
    assert_eq!(
        matching_docs(&searcher, &swapped.with_slop(2).into(), None),
        vec![0, 2]
    );
}

#[test]
fn test_multi_phrase_query() {
    let searcher = setup_test_index();
    let mut query = MultiPhraseQuery::new();
    query
        .add_position(vec![
            Term::new("content", "rust"),
            Term::new("content", "python"),
        ])
        .unwrap();
    query.add(Term::new("content", "programming")).unwrap();
    assert_eq!(matching_docs(&searcher, &query.clone().into(), None), vec![0, 1]);
    assert_eq!(
        matching_docs(&searcher, &query.with_slop(1).into(), None),
        vec![0, 1, 2]
    );
}

#[test]
fn test_multi_term_queries() {
    let searcher = setup_test_index();
    let wildcard = MultiTermQuery::wildcard(Term::new("content", "p*"));
    assert_eq!(matching_docs(&searcher, &wildcard.into(), None), vec![0, 1, 2, 3, 4]);

    let prefix = MultiTermQuery::prefix(Term::new("content", "prog"));
    assert_eq!(matching_docs(&searcher, &prefix.into(), None), vec![0, 1, 2, 3]);

    let fuzzy = MultiTermQuery::fuzzy(Term::new("content", "rusty"));
    assert_eq!(matching_docs(&searcher, &fuzzy.into(), None), vec![0, 2, 4]);
}

#[test]
fn test_range_query() {
    let searcher = setup_test_index();
    let range = RangeQuery::new(
        Some(Term::new("year", "2020")),
        Some(Term::new("year", "2022")),
        true,
    )
    .unwrap();
    assert_eq!(matching_docs(&searcher, &range.into(), None), vec![1, 2, 3]);
}

#[test]
fn test_range_filter() {
    let searcher = setup_test_index();
    let filter = RangeFilter::more("year", "2021");
    assert_eq!(
        matching_docs(&searcher, &term("programming").into(), Some(&filter)),
        vec![2, 3]
    );
    let filter = RangeFilter::less("year", "2020");
    assert_eq!(
        matching_docs(&searcher, &term("programming").into(), Some(&filter)),
        vec![0, 1]
    );
}

#[test]
fn test_hits_with_filter() {
    let searcher = setup_test_index();
    let filter = RangeFilter::more("year", "2021");
    let query: Query = term("programming").into();
    let mut hits = searcher.hits(&query, Some(&filter)).unwrap();
    assert_eq!(hits.len(), 2);

    let top = searcher.search(&query, Some(&filter), 10).unwrap();
    for (rank, expected) in top.score_docs.iter().enumerate() {
        assert_eq!(hits.id(rank).unwrap(), expected.doc);
        assert!(hits.score(rank).unwrap() <= 1.0);
    }
    let first = hits.doc(0).unwrap();
    assert!(first.get("content").unwrap().contains("programming"));
    assert!(hits.doc(2).is_err());
}

#[test]
fn test_query_filter_keeps_scores() {
    let searcher = setup_test_index();
    let query: Query = term("programming").into();
    let filter = QueryFilter::new(term("rust"), searcher.similarity().clone());

    let unfiltered = searcher.search(&query, None, 10).unwrap();
    let filtered = searcher.search(&query, Some(&filter), 10).unwrap();
    assert_eq!(filtered.total_hits, 2);
    for hit in &filtered.score_docs {
        let original = unfiltered
            .score_docs
            .iter()
            .find(|h| h.doc == hit.doc)
            .unwrap();
        assert_eq!(original.score, hit.score);
    }
}

#[test]
fn test_json_query() {
    let searcher = setup_test_index();
    let dsl = serde_json::json!({
        "type": "boolean",
        "clauses": [
            {
                "query": { "type": "term", "term": { "field": "content", "text": "rust" } },
                "occur": "required"
            },
            {
                "query": {
                    "type": "multi_term",
                    "pattern": { "field": "content", "text": "pack" },
                    "kind": { "kind": "prefix" }
                },
                "occur": "prohibited"
            }
        ]
    });
    let query: Query = serde_json::from_value(dsl).unwrap();
    assert_eq!(query.to_query_string("content"), "+rust -pack*");
    assert_eq!(matching_docs(&searcher, &query, None), vec![0, 2]);
}

#[test]
fn test_explain_complex_query() {
    let searcher = setup_test_index();
    let query: Query = BooleanQuery::new()
        .must(term("programming"))
        .should(PhraseQuery::from_text("content", "rust systems"))
        .should(MultiTermQuery::prefix(Term::new("content", "lang")).with_boost(2.0))
        .into();
    let top = searcher.search(&query, None, 10).unwrap();
    assert_eq!(top.total_hits, 4);
    for hit in &top.score_docs {
        let explanation = searcher.explain(&query, hit.doc).unwrap();
        assert!(
            (explanation.value() - hit.score).abs() < 1e-5,
            "doc {} explained {} but scored {}\n{}",
            hit.doc,
            explanation.value(),
            hit.score,
            explanation
        );
    }
    assert!(!searcher.explain(&query, 4).unwrap().is_match());
}

#[test]
fn test_clause_limit_from_config() {
    let searcher = setup_test_index()
        .with_config(SearchConfig::default().with_max_clause_count(2))
        .unwrap();
    let wide = MultiTermQuery::prefix(Term::new("content", "p"));
    let err = searcher.search(&wide.into(), None, 10).unwrap_err();
    assert!(matches!(err, SearchError::TooManyClauses { limit: 2, .. }));
    assert!(err.is_usage_error());

    let narrow = MultiTermQuery::prefix(Term::new("content", "py"));
    assert_eq!(searcher.search(&narrow.into(), None, 10).unwrap().total_hits, 1);
}

#[test]
fn test_stored_documents() {
    let searcher = setup_test_index();
    let doc = searcher.doc(3).unwrap();
    assert_eq!(doc.get("content"), Some("javascript web programming frontend"));
    assert_eq!(doc.get("year"), Some("2022"));
    assert!(matches!(
        searcher.doc(searcher.max_doc()).unwrap_err(),
        SearchError::InvalidArgument(_)
    ));
}
