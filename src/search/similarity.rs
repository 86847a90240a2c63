//! Scoring formulas
//!
//! A [`Similarity`] supplies every numeric ingredient of a score: term
//! frequency and inverse document frequency factors, field length norms,
//! the query normalization factor and the coordination factor that rewards
//! documents matching more clauses of a disjunction.
//!
//! The searcher receives its similarity explicitly at construction; there is
//! no process-wide default.

use std::fmt::Debug;

use crate::index::Term;
use crate::search::IndexSearcher;
use crate::Result;

/// Relevance formula strategy
pub trait Similarity: Send + Sync + Debug {
    /// Normalization factor for a field of `num_tokens` tokens, encoded into
    /// the index norms at build time
    fn length_norm(&self, field: &str, num_tokens: u32) -> f32;

    /// Factor that rescales the query's sum of squared weights so that
    /// scores from differently shaped queries are comparable.
    /// Must be strictly positive and non-increasing in its argument.
    fn query_norm(&self, sum_of_squared_weights: f32) -> f32;

    /// Score factor for a term (or phrase) frequency within a document
    fn tf(&self, freq: f32) -> f32;

    /// Frequency contribution of one sloppy phrase match of the given edit
    /// distance
    fn sloppy_freq(&self, distance: u32) -> f32;

    /// Inverse document frequency factor
    fn idf(&self, doc_freq: u32, num_docs: u32) -> f32;

    /// Score factor for a document matching `overlap` of `max_overlap`
    /// clauses
    fn coord(&self, overlap: usize, max_overlap: usize) -> f32;

    fn idf_term(&self, term: &Term, searcher: &IndexSearcher) -> Result<f32> {
        Ok(self.idf(searcher.doc_freq(term)?, searcher.max_doc()))
    }

    /// Combined rarity of a set of terms (sum of the individual idfs)
    fn idf_terms(&self, terms: &[Term], searcher: &IndexSearcher) -> Result<f32> {
        let mut idf = 0.0f32;
        for term in terms {
            idf += self.idf_term(term, searcher)?;
        }
        Ok(idf)
    }

    fn decode_norm(&self, norm: u8) -> f32 {
        decode_norm(norm)
    }
}

/// Classic vector-space TF-IDF
///
/// - `tf(f) = sqrt(f)`
/// - `idf(df, n) = ln(n / (df + 1)) + 1`
/// - `length_norm(len) = 1 / sqrt(len)`
/// - `query_norm(s) = 1 / sqrt(s)`
/// - `coord(o, m) = o / m`
/// - `sloppy_freq(d) = 1 / (d + 1)`
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSimilarity;

impl Similarity for DefaultSimilarity {
    fn length_norm(&self, _field: &str, num_tokens: u32) -> f32 {
        if num_tokens == 0 {
            return 0.0;
        }
        (1.0 / (num_tokens as f64).sqrt()) as f32
    }

    fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        // zero boosts and empty booleans sum to zero
        if !sum_of_squared_weights.is_finite() || sum_of_squared_weights <= 0.0 {
            return 1.0;
        }
        (1.0 / (sum_of_squared_weights as f64).sqrt()) as f32
    }

    fn tf(&self, freq: f32) -> f32 {
        freq.sqrt()
    }

    fn sloppy_freq(&self, distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }

    fn idf(&self, doc_freq: u32, num_docs: u32) -> f32 {
        let num_docs = num_docs.max(1) as f64;
        ((num_docs / (doc_freq as f64 + 1.0)).ln() + 1.0) as f32
    }

    fn coord(&self, overlap: usize, max_overlap: usize) -> f32 {
        if max_overlap == 0 {
            return 0.0;
        }
        overlap as f32 / max_overlap as f32
    }
}

/// Encode a norm into one byte: 3-bit mantissa, 5-bit exponent.
///
/// Zero and negatives encode to 0. Values past the range clamp to the
/// largest/smallest representable positive norm.
pub fn encode_norm(value: f32) -> u8 {
    if !(value > 0.0) {
        return 0;
    }
    let bits = value.to_bits() as i32;
    let mut mantissa = (bits & 0x00ff_ffff) >> 21;
    let mut exponent = (((bits >> 24) & 0x7f) - 63) + 15;
    if exponent > 31 {
        exponent = 31;
        mantissa = 7;
    }
    if exponent < 0 {
        exponent = 0;
        mantissa = 1;
    }
    ((exponent << 3) | mantissa) as u8
}

/// Decode a byte produced by [`encode_norm`]
pub fn decode_norm(norm: u8) -> f32 {
    if norm == 0 {
        return 0.0;
    }
    let mantissa = (norm & 7) as u32;
    let exponent = ((norm >> 3) & 31) as u32;
    let bits = ((exponent + (63 - 15)) << 24) | (mantissa << 21);
    f32::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_encoding_roundtrip_exact_values() {
        assert_eq!(decode_norm(encode_norm(1.0)), 1.0);
        assert_eq!(decode_norm(encode_norm(0.5)), 0.5);
        assert_eq!(decode_norm(encode_norm(0.25)), 0.25);
        assert_eq!(encode_norm(0.0), 0);
        assert_eq!(encode_norm(-3.0), 0);
        assert_eq!(decode_norm(0), 0.0);
    }

    #[test]
    fn test_norm_encoding_is_lossy_but_monotonic() {
        let mut previous = 0.0f32;
        for len in (1..200u32).rev() {
            let norm = decode_norm(encode_norm(DefaultSimilarity.length_norm("f", len)));
            assert!(norm >= previous);
            previous = norm;
        }
        // 1/sqrt(3) loses precision in three mantissa bits
        let approx = decode_norm(encode_norm(1.0 / 3f32.sqrt()));
        assert!(approx < 1.0 / 3f32.sqrt());
        assert!(approx > 0.5);
    }

    #[test]
    fn test_norm_encoding_clamps() {
        assert_eq!(encode_norm(f32::MAX), 0xff);
        assert_eq!(encode_norm(1e-30), 1);
    }

    #[test]
    fn test_idf_prefers_rare_terms() {
        let sim = DefaultSimilarity;
        assert!(sim.idf(1, 1000) > sim.idf(999, 1000));
        assert!(sim.idf(0, 0) > 0.0);
        assert!(sim.idf(10, 10) > 0.0);
    }

    #[test]
    fn test_query_norm_is_positive_and_non_increasing() {
        let sim = DefaultSimilarity;
        assert_eq!(sim.query_norm(0.0), 1.0);
        assert_eq!(sim.query_norm(4.0), 0.5);
        let mut previous = f32::INFINITY;
        for s in [0.01f32, 0.5, 1.0, 2.0, 10.0, 1e6] {
            let norm = sim.query_norm(s);
            assert!(norm > 0.0);
            assert!(norm <= previous);
            previous = norm;
        }
    }

    #[test]
    fn test_coord_and_sloppy_freq() {
        let sim = DefaultSimilarity;
        assert_eq!(sim.coord(1, 2), 0.5);
        assert_eq!(sim.coord(0, 0), 0.0);
        assert_eq!(sim.sloppy_freq(0), 1.0);
        assert_eq!(sim.sloppy_freq(1), 0.5);
        assert_eq!(sim.tf(4.0), 2.0);
    }
}
