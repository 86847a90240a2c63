//! Read-only index collaborator
//!
//! The scoring engine never touches storage directly. Everything it needs
//! (term statistics, the sorted term dictionary, positional postings, field
//! norms and stored fields) comes through the [`IndexReader`] trait.
//!
//! [`MemoryIndex`] is a complete in-memory implementation, used by the tests
//! and benches and handy for small embedded corpora.

mod memory;
mod union_positions;

pub use memory::{MemoryIndex, MemoryIndexBuilder};
pub use union_positions::UnionTermPositions;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Result;

/// Dense document number within a reader (0..max_doc)
pub type DocId = u32;

/// Identity of a reader instance, used to key per-reader caches
pub type ReaderId = u64;

/// A (field, text) pair identifying one indexed token value
///
/// Terms order by field first, then by text, which is the order of the term
/// dictionary.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    field: String,
    text: String,
}

impl Term {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Same field, different text
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            field: self.field.clone(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// Stored fields of one document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub fields: BTreeMap<String, String>,
}

impl StoredDocument {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Positional postings for one term
///
/// Starts positioned before the first document; `next` must be called
/// before `doc`/`freq` are meaningful. Within a document, `next_position`
/// may be called at most `freq` times and yields increasing positions.
pub trait TermPositions {
    /// Advance to the next document. Returns false once exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Current document
    fn doc(&self) -> DocId;

    /// Occurrences of the term in the current document
    fn freq(&self) -> u32;

    /// Next occurrence position within the current document
    fn next_position(&mut self) -> Result<u32>;
}

/// Cursor over the sorted term dictionary
///
/// Starts positioned on its seed term (or the first term after it).
/// `term` returns `None` once the dictionary is exhausted.
pub trait TermEnum {
    fn term(&self) -> Option<&Term>;

    /// Document frequency of the current term
    fn doc_freq(&self) -> u32;

    /// Advance to the next term. Returns false once exhausted.
    fn next(&mut self) -> Result<bool>;
}

/// Read access to an inverted index
///
/// Implementations must be safe for concurrent reads: many searches may
/// share one reader across threads.
pub trait IndexReader: Send + Sync {
    /// Stable identity of this reader instance
    fn reader_id(&self) -> ReaderId;

    /// One greater than the largest document number
    fn max_doc(&self) -> u32;

    /// Number of documents containing the term
    fn doc_freq(&self, term: &Term) -> Result<u32>;

    /// Postings with positions, or `None` if the term is absent
    fn term_positions(&self, term: &Term) -> Result<Option<Box<dyn TermPositions>>>;

    /// Encoded length norms for a field (one byte per document), or `None`
    /// if the field carries no norms
    fn norms(&self, field: &str) -> Result<Option<Arc<[u8]>>>;

    /// Term dictionary cursor positioned at the first term >= `term`
    fn terms_from(&self, term: &Term) -> Result<Box<dyn TermEnum>>;

    /// Stored fields of a document
    fn document(&self, doc: DocId) -> Result<Option<StoredDocument>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_ordering() {
        let a = Term::new("body", "zebra");
        let b = Term::new("title", "apple");
        let c = Term::new("body", "apple");
        assert!(c < a);
        assert!(a < b);
        assert_eq!(c, Term::new("body", "apple"));
    }

    #[test]
    fn test_term_display() {
        let term = Term::new("body", "rust");
        assert_eq!(term.to_string(), "body:rust");
        assert_eq!(term.with_text("cargo").text(), "cargo");
        assert_eq!(term.with_text("cargo").field(), "body");
    }
}
