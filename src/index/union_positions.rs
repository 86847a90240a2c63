//! Union of several postings lists read as one

use super::{DocId, TermPositions};
use crate::{Result, SearchError};

/// Postings matching any of several terms
///
/// Each document is visited once. Its frequency is the sum of the member
/// frequencies and its positions are merged in increasing order.
pub struct UnionTermPositions {
    members: Vec<Box<dyn TermPositions>>,
    /// Current document of each member, `None` once exhausted
    heads: Vec<Option<DocId>>,
    doc: DocId,
    positions: Vec<u32>,
    position_cursor: usize,
}

impl UnionTermPositions {
    pub fn new(mut members: Vec<Box<dyn TermPositions>>) -> Result<Self> {
        let mut heads = Vec::with_capacity(members.len());
        for member in members.iter_mut() {
            heads.push(if member.next()? { Some(member.doc()) } else { None });
        }
        Ok(Self {
            members,
            heads,
            doc: 0,
            positions: Vec::new(),
            position_cursor: 0,
        })
    }
}

impl TermPositions for UnionTermPositions {
    fn next(&mut self) -> Result<bool> {
        let Some(doc) = self.heads.iter().flatten().min().copied() else {
            return Ok(false);
        };
        self.doc = doc;
        self.positions.clear();
        self.position_cursor = 0;

        for (member, head) in self.members.iter_mut().zip(self.heads.iter_mut()) {
            if *head != Some(doc) {
                continue;
            }
            for _ in 0..member.freq() {
                self.positions.push(member.next_position()?);
            }
            *head = if member.next()? { Some(member.doc()) } else { None };
        }
        self.positions.sort_unstable();
        Ok(true)
    }

    fn doc(&self) -> DocId {
        self.doc
    }

    fn freq(&self) -> u32 {
        self.positions.len() as u32
    }

    fn next_position(&mut self) -> Result<u32> {
        let position = self
            .positions
            .get(self.position_cursor)
            .copied()
            .ok_or_else(|| SearchError::Index("read past the last position".to_string()))?;
        self.position_cursor += 1;
        Ok(position)
    }
}
