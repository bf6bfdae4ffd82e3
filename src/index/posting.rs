use serde::{Deserialize, Serialize};
use crate::core::types::DocId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub token_refs: Vec<u64>,  // Object store refs, ordered by (min, max) position
}

/// Posting list for a term
/// Note: Sorted by doc_id for efficient merging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    pub postings: Vec<Posting>,  // Sorted by doc_id
    pub multi_position: bool,    // Some token covers more than one position
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
            multi_position: false,
        }
    }

    pub fn add_posting(&mut self, posting: Posting) {
        // Keep sorted by doc_id for efficient merging
        match self.postings.binary_search_by_key(&posting.doc_id, |p| p.doc_id) {
            Ok(pos) => self.postings[pos] = posting,
            Err(pos) => self.postings.insert(pos, posting),
        }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Posting> {
        self.postings.get(index)
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn total_freq(&self) -> u64 {
        self.postings.iter().map(|p| p.token_refs.len() as u64).sum()
    }

    /// Index of the first posting at or after `from` whose doc is `>= target`,
    /// `len()` when there is none. Gallops forward before bisecting, so
    /// short hops stay cheap.
    pub fn seek(&self, from: usize, target: DocId) -> usize {
        let len = self.postings.len();
        if from >= len || self.postings[from].doc_id >= target {
            return from.min(len);
        }

        let mut lo = from;
        let mut step = 1;
        let mut hi = from + step;
        while hi < len && self.postings[hi].doc_id < target {
            lo = hi;
            step *= 2;
            hi = lo + step;
        }
        let hi = hi.min(len);

        // postings[lo] < target, answer in (lo, hi]
        lo + 1 + self.postings[lo + 1..hi].partition_point(|p| p.doc_id < target)
    }
}
