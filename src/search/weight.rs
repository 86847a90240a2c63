//! Compiled per-search scoring state

use crate::index::{DocId, IndexReader};
use crate::search::{Explanation, Scorer};
use crate::{Result, SearchError};

/// Scoring state of one query node for one search
///
/// A weight is driven through a fixed lifecycle by the searcher:
/// [`sum_of_squared_weights`](Weight::sum_of_squared_weights) once,
/// [`normalize`](Weight::normalize) once, then any number of
/// [`scorer`](Weight::scorer) / [`explain`](Weight::explain) calls.
pub trait Weight {
    /// Normalized weight value; meaningful once normalized
    fn value(&self) -> f32;

    /// Squared, boosted raw weight of this node and its scoring children
    fn sum_of_squared_weights(&mut self) -> Result<f32>;

    /// Apply the query normalization factor
    fn normalize(&mut self, norm: f32) -> Result<()>;

    /// Build a scorer over `reader`. `None` means no document can match.
    fn scorer(&self, reader: &dyn IndexReader) -> Result<Option<Box<dyn Scorer>>>;

    /// Break down the score of `doc`
    fn explain(&self, reader: &dyn IndexReader, doc: DocId) -> Result<Explanation>;
}

/// Lifecycle guard shared by every weight implementation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WeightState {
    #[default]
    Created,
    Summed,
    Normalized,
}

impl WeightState {
    pub fn begin_sum(&mut self) -> Result<()> {
        if *self != WeightState::Created {
            return Err(SearchError::illegal_state(format!(
                "sum_of_squared_weights called on a {:?} weight",
                self
            )));
        }
        *self = WeightState::Summed;
        Ok(())
    }

    pub fn begin_normalize(&mut self) -> Result<()> {
        if *self != WeightState::Summed {
            return Err(SearchError::illegal_state(format!(
                "normalize called on a {:?} weight",
                self
            )));
        }
        *self = WeightState::Normalized;
        Ok(())
    }

    pub fn ensure_normalized(&self, operation: &str) -> Result<()> {
        if *self != WeightState::Normalized {
            return Err(SearchError::illegal_state(format!(
                "{} requires a normalized weight",
                operation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_in_order() {
        let mut state = WeightState::default();
        assert!(state.ensure_normalized("scorer").is_err());
        state.begin_sum().unwrap();
        state.begin_normalize().unwrap();
        assert!(state.ensure_normalized("scorer").is_ok());
    }

    #[test]
    fn test_lifecycle_rejects_repeats() {
        let mut state = WeightState::default();
        assert!(matches!(
            state.begin_normalize(),
            Err(SearchError::IllegalState(_))
        ));
        state.begin_sum().unwrap();
        assert!(state.begin_sum().is_err());
        state.begin_normalize().unwrap();
        assert!(state.begin_normalize().is_err());
        assert!(state.begin_sum().is_err());
    }
}
