pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod search;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use index::{DocId, IndexReader, MemoryIndex, StoredDocument, Term};
pub use query::{
    BooleanClause, BooleanQuery, MultiPhraseQuery, MultiTermQuery, Occur, PhraseQuery, Query,
    QueryNode, RangeQuery, TermQuery,
};
pub use search::{
    DefaultSimilarity, Explanation, Filter, Hits, IndexSearcher, QueryFilter, RangeFilter, ScoreDoc,
    Similarity, TopDocs,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
