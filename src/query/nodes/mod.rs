//! Concrete query node implementations
//!
//! Term, boolean and phrase queries (including phrases with alternative
//! terms per position) are primitive and create weights directly.
//! Multi-term (wildcard, prefix, fuzzy) and range queries only rewrite into
//! booleans of term queries.

mod bool_query;
mod fuzzy_query;
mod multi_phrase_query;
mod multi_term_query;
mod phrase_query;
mod prefix_query;
mod range_query;
mod term_query;
mod wildcard_query;

pub use bool_query::{BooleanClause, BooleanQuery, Occur};
pub use fuzzy_query::{levenshtein_distance, DEFAULT_MIN_SIMILARITY};
pub use multi_phrase_query::MultiPhraseQuery;
pub use multi_term_query::{MultiTermKind, MultiTermQuery, TermMatch};
pub use phrase_query::PhraseQuery;
pub use range_query::RangeQuery;
pub use term_query::TermQuery;
pub use wildcard_query::{literal_prefix, pattern_to_regex};
