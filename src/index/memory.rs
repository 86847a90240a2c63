//! In-memory index reader
//!
//! Documents arrive pre-analyzed: each field value is a whitespace-separated
//! token stream. Token positions are assigned in order, so repeating a field
//! within one document continues its positions.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{DocId, IndexReader, ReaderId, StoredDocument, Term, TermEnum, TermPositions};
use crate::search::similarity::{encode_norm, DefaultSimilarity, Similarity};
use crate::{Result, SearchError};

static NEXT_READER_ID: AtomicU64 = AtomicU64::new(1);

/// A term's occurrences in a single document
#[derive(Clone, Debug, PartialEq)]
struct Posting {
    doc: DocId,
    positions: Vec<u32>,
}

type Dictionary = Arc<Vec<(Term, Arc<[Posting]>)>>;

/// Immutable in-memory inverted index
#[derive(Debug)]
pub struct MemoryIndex {
    id: ReaderId,
    max_doc: u32,
    /// Sorted by term
    dictionary: Dictionary,
    norms: HashMap<String, Arc<[u8]>>,
    documents: Vec<StoredDocument>,
}

impl MemoryIndex {
    /// Create an index builder
    pub fn builder() -> MemoryIndexBuilder {
        MemoryIndexBuilder::new()
    }

    /// Number of distinct terms across all fields
    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    fn lookup(&self, term: &Term) -> Option<&Arc<[Posting]>> {
        self.dictionary
            .binary_search_by(|(t, _)| t.cmp(term))
            .ok()
            .map(|idx| &self.dictionary[idx].1)
    }
}

impl IndexReader for MemoryIndex {
    fn reader_id(&self) -> ReaderId {
        self.id
    }

    fn max_doc(&self) -> u32 {
        self.max_doc
    }

    fn doc_freq(&self, term: &Term) -> Result<u32> {
        Ok(self.lookup(term).map(|p| p.len() as u32).unwrap_or(0))
    }

    fn term_positions(&self, term: &Term) -> Result<Option<Box<dyn TermPositions>>> {
        Ok(self.lookup(term).map(|postings| {
            Box::new(MemoryTermPositions::new(postings.clone())) as Box<dyn TermPositions>
        }))
    }

    fn norms(&self, field: &str) -> Result<Option<Arc<[u8]>>> {
        Ok(self.norms.get(field).cloned())
    }

    fn terms_from(&self, term: &Term) -> Result<Box<dyn TermEnum>> {
        let start = self.dictionary.partition_point(|(t, _)| t < term);
        Ok(Box::new(MemoryTermEnum {
            dictionary: self.dictionary.clone(),
            cursor: start,
        }))
    }

    fn document(&self, doc: DocId) -> Result<Option<StoredDocument>> {
        Ok(self.documents.get(doc as usize).cloned())
    }
}

/// Cursor over one posting list
struct MemoryTermPositions {
    postings: Arc<[Posting]>,
    /// Index of the current posting; `None` before the first `next`
    cursor: Option<usize>,
    position_cursor: usize,
}

impl MemoryTermPositions {
    fn new(postings: Arc<[Posting]>) -> Self {
        Self {
            postings,
            cursor: None,
            position_cursor: 0,
        }
    }

    fn current(&self) -> Option<&Posting> {
        self.cursor.and_then(|c| self.postings.get(c))
    }
}

impl TermPositions for MemoryTermPositions {
    fn next(&mut self) -> Result<bool> {
        let next = self.cursor.map_or(0, |c| c + 1).min(self.postings.len());
        self.cursor = Some(next);
        self.position_cursor = 0;
        Ok(next < self.postings.len())
    }

    fn doc(&self) -> DocId {
        self.current().map(|p| p.doc).unwrap_or(DocId::MAX)
    }

    fn freq(&self) -> u32 {
        self.current().map(|p| p.positions.len() as u32).unwrap_or(0)
    }

    fn next_position(&mut self) -> Result<u32> {
        let position = self
            .current()
            .and_then(|p| p.positions.get(self.position_cursor).copied())
            .ok_or_else(|| SearchError::Index("read past the last position".to_string()))?;
        self.position_cursor += 1;
        Ok(position)
    }
}

/// Cursor over the sorted dictionary
struct MemoryTermEnum {
    dictionary: Dictionary,
    cursor: usize,
}

impl TermEnum for MemoryTermEnum {
    fn term(&self) -> Option<&Term> {
        self.dictionary.get(self.cursor).map(|(t, _)| t)
    }

    fn doc_freq(&self) -> u32 {
        self.dictionary
            .get(self.cursor)
            .map(|(_, p)| p.len() as u32)
            .unwrap_or(0)
    }

    fn next(&mut self) -> Result<bool> {
        if self.cursor < self.dictionary.len() {
            self.cursor += 1;
        }
        Ok(self.cursor < self.dictionary.len())
    }
}

/// Builder for [`MemoryIndex`]
pub struct MemoryIndexBuilder {
    similarity: Arc<dyn Similarity>,
    postings: BTreeMap<Term, Vec<Posting>>,
    /// Field -> per-document token counts
    field_lengths: HashMap<String, Vec<u32>>,
    documents: Vec<StoredDocument>,
}

impl Default for MemoryIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndexBuilder {
    pub fn new() -> Self {
        Self {
            similarity: Arc::new(DefaultSimilarity),
            postings: BTreeMap::new(),
            field_lengths: HashMap::new(),
            documents: Vec::new(),
        }
    }

    /// Similarity whose `length_norm` encodes the field norms
    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Add a document made of (field, whitespace-separated tokens) pairs.
    ///
    /// Returns the assigned document number.
    pub fn add_document<I, K, V>(&mut self, fields: I) -> DocId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let doc = self.documents.len() as DocId;
        let mut stored = StoredDocument::default();

        for (field, value) in fields {
            let field = field.into();
            let value = value.as_ref();

            let lengths = self.field_lengths.entry(field.clone()).or_default();
            lengths.resize(doc as usize + 1, 0);
            let first_position = lengths[doc as usize];

            let mut count = 0u32;
            for (offset, token) in value.split_whitespace().enumerate() {
                let position = first_position + offset as u32;
                let list = self
                    .postings
                    .entry(Term::new(field.clone(), token))
                    .or_default();
                match list.last_mut() {
                    Some(last) if last.doc == doc => last.positions.push(position),
                    _ => list.push(Posting {
                        doc,
                        positions: vec![position],
                    }),
                }
                count += 1;
            }
            lengths[doc as usize] += count;

            stored
                .fields
                .entry(field)
                .and_modify(|existing| {
                    existing.push(' ');
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        self.documents.push(stored);
        doc
    }

    /// Freeze the builder into a reader
    pub fn build(self) -> MemoryIndex {
        let max_doc = self.documents.len() as u32;

        let norms = self
            .field_lengths
            .into_iter()
            .map(|(field, lengths)| {
                let mut encoded = vec![0u8; max_doc as usize];
                for (doc, &len) in lengths.iter().enumerate() {
                    if len > 0 {
                        encoded[doc] = encode_norm(self.similarity.length_norm(&field, len));
                    }
                }
                (field, Arc::<[u8]>::from(encoded))
            })
            .collect();

        let dictionary: Vec<(Term, Arc<[Posting]>)> = self
            .postings
            .into_iter()
            .map(|(term, postings)| (term, Arc::<[Posting]>::from(postings)))
            .collect();

        let id = NEXT_READER_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            reader_id = id,
            max_doc,
            terms = dictionary.len(),
            "built in-memory index"
        );

        MemoryIndex {
            id,
            max_doc,
            dictionary: Arc::new(dictionary),
            norms,
            documents: self.documents,
        }
    }
}
