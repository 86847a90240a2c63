use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ranksmith::index::MemoryIndex;
use ranksmith::query::{BooleanQuery, MultiTermQuery, PhraseQuery, Query, TermQuery};
use ranksmith::search::{DefaultSimilarity, IndexSearcher};
use ranksmith::Term;

const VOCABULARY: &[&str] = &[
    "rust", "programming", "language", "systems", "memory", "safety", "async", "cargo",
    "compiler", "borrow", "checker", "trait", "generic", "lifetime", "macro", "search",
];

fn make_content(id: usize, len: usize) -> String {
    (0..len)
        .map(|i| VOCABULARY[(id * 7 + i * 3 + i * i) % VOCABULARY.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_searcher(doc_count: usize) -> IndexSearcher {
    let mut builder = MemoryIndex::builder();
    for id in 0..doc_count {
        builder.add_document([("body", make_content(id, 12 + id % 20))]);
    }
    IndexSearcher::new(Arc::new(builder.build()), Arc::new(DefaultSimilarity))
}

fn term(text: &str) -> TermQuery {
    TermQuery::new(Term::new("body", text))
}

fn bench_query(c: &mut Criterion, group_name: &str, query: Query) {
    let counts = [1_000usize, 5_000, 10_000];
    let searchers: Vec<(usize, IndexSearcher)> =
        counts.iter().map(|&count| (count, build_searcher(count))).collect();

    let mut group = c.benchmark_group(group_name);
    for (count, searcher) in searchers.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), searcher, |b, searcher| {
            b.iter(|| {
                black_box(searcher.search(&query, None, 10).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_term_search(c: &mut Criterion) {
    bench_query(c, "term_search", term("rust").into());
}

fn bench_boolean_search(c: &mut Criterion) {
    let query = BooleanQuery::new()
        .must(term("rust"))
        .should(term("memory"))
        .should(term("safety"))
        .must_not(term("macro"));
    bench_query(c, "boolean_search", query.into());
}

fn bench_phrase_search(c: &mut Criterion) {
    bench_query(
        c,
        "phrase_search",
        PhraseQuery::from_text("body", "rust programming").into(),
    );
    bench_query(
        c,
        "sloppy_phrase_search",
        PhraseQuery::from_text("body", "memory safety").with_slop(3).into(),
    );
}

fn bench_expanding_search(c: &mut Criterion) {
    bench_query(
        c,
        "fuzzy_search",
        MultiTermQuery::fuzzy(Term::new("body", "trate")).into(),
    );
}

criterion_group!(
    benches,
    bench_term_search,
    bench_boolean_search,
    bench_phrase_search,
    bench_expanding_search
);
criterion_main!(benches);
