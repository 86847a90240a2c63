//! Scoring engine: weights, scorers, collectors, the searcher and filters

pub mod boolean_scorer;
pub mod collector;
pub mod explanation;
pub mod filter;
pub mod hits;
pub mod phrase_scorer;
pub mod scorer;
pub mod searcher;
pub mod similarity;
pub mod weight;

pub use boolean_scorer::BooleanScorer;
pub use collector::{
    BitSetCollector, FilteredCollector, HitCollector, HitQueue, ScoreDoc, TopDocs,
    TopDocsCollector,
};
pub use explanation::Explanation;
pub use filter::{Filter, QueryFilter, RangeFilter};
pub use hits::Hits;
pub use phrase_scorer::{PhraseMatch, PhraseScorer};
pub use scorer::{Scorer, TermScorer, NO_MORE_DOCS};
pub use searcher::IndexSearcher;
pub use similarity::{decode_norm, encode_norm, DefaultSimilarity, Similarity};
pub use weight::{Weight, WeightState};
