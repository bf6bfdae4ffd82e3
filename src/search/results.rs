use serde::{Deserialize, Serialize};
use crate::core::types::{DocId, SegmentId, Span};

/// Matches of one document, ordered by `(start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMatches {
    pub doc_id: DocId,
    pub matches: Vec<Span>,
}

/// Search results of one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMatches {
    pub segment_id: SegmentId,
    pub docs: Vec<DocMatches>,
    pub total_matches: usize,
    pub took_ms: u64,
}

impl SegmentMatches {
    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.iter().map(|d| d.doc_id)
    }
}

/// Groups streamed matches by document.
#[derive(Debug, Default)]
pub struct MatchCollector {
    pub docs: Vec<DocMatches>,
    pub total_matches: usize,
}

impl MatchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches must arrive grouped by document in increasing id order.
    pub fn collect(&mut self, doc_id: DocId, span: Span) {
        match self.docs.last_mut() {
            Some(last) if last.doc_id == doc_id => last.matches.push(span),
            _ => self.docs.push(DocMatches { doc_id, matches: vec![span] }),
        }
        self.total_matches += 1;
    }

    pub fn into_docs(self) -> Vec<DocMatches> {
        self.docs
    }
}
