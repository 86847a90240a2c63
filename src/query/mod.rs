//! Query algebra
//!
//! A [`Query`] tree is built by the caller (or deserialized from JSON),
//! rewritten against a reader until only primitive nodes remain, and then
//! compiled into a [`Weight`](crate::search::Weight) by the searcher.
//!
//! # Example
//!
//! ```json
//! {
//!   "type": "boolean",
//!   "clauses": [
//!     { "query": { "type": "term", "term": { "field": "body", "text": "rust" } }, "occur": "required" },
//!     { "query": { "type": "phrase", "terms": [
//!         { "field": "body", "text": "memory" },
//!         { "field": "body", "text": "safety" } ], "slop": 1 }, "occur": "optional" }
//!   ]
//! }
//! ```

pub mod ast;
pub mod nodes;

pub use ast::{Query, QueryNode};
pub use nodes::{
    BooleanClause, BooleanQuery, MultiPhraseQuery, MultiTermKind, MultiTermQuery, Occur,
    PhraseQuery, RangeQuery, TermMatch, TermQuery,
};
