use tracing::trace;
use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use super::{check_advance, check_positioned, DocCursor, Spans};

/// Per-document match generation for iterators that combine children.
pub trait DocMatcher {
    /// First document `>= target` where the required children all sit.
    /// Such a document may still produce no match.
    fn candidate(&mut self, target: DocId) -> Result<Option<DocId>>;

    /// Prepares state for `doc`, which `candidate` just returned.
    fn start_doc(&mut self, doc: DocId) -> Result<()>;

    /// Next match in the current document, in `(start, end)` order.
    fn next_match(&mut self) -> Result<Option<Span>>;

    fn cost(&self) -> u64;
}

/// Drives a [`DocMatcher`], prefetching the first match of every candidate
/// so that only documents with a match are reported.
pub struct ConjunctionSpans<M> {
    matcher: M,
    doc: DocCursor,
    pending: Option<Span>,
    current: Option<Span>,
}

impl<M: DocMatcher> ConjunctionSpans<M> {
    pub fn new(matcher: M) -> Self {
        ConjunctionSpans {
            matcher,
            doc: DocCursor::Unpositioned,
            pending: None,
            current: None,
        }
    }

    fn exhaust(&mut self) -> Result<Option<DocId>> {
        self.doc = DocCursor::Exhausted;
        self.pending = None;
        self.current = None;
        Ok(None)
    }
}

impl<M: DocMatcher> Spans for ConjunctionSpans<M> {
    fn doc(&self) -> DocCursor {
        self.doc
    }

    fn advance_to_doc(&mut self, target: DocId) -> Result<Option<DocId>> {
        check_advance(self.doc, target)?;
        if self.doc == DocCursor::Exhausted {
            return Ok(None);
        }
        let mut target = target;
        loop {
            let Some(doc) = self.matcher.candidate(target).map_err(|e| e.with_doc(target))? else {
                return self.exhaust();
            };
            self.matcher.start_doc(doc).map_err(|e| e.with_doc(doc))?;
            if let Some(first) = self.matcher.next_match().map_err(|e| e.with_doc(doc))? {
                self.doc = DocCursor::At(doc);
                self.pending = Some(first);
                self.current = None;
                return Ok(Some(doc));
            }
            trace!(doc = doc.0, "candidate document has no match");
            match doc.next() {
                Some(next) => target = next,
                None => return self.exhaust(),
            }
        }
    }

    fn next_start_position(&mut self) -> Result<Option<i32>> {
        let doc = check_positioned(self.doc)?;
        self.current = match self.pending.take() {
            Some(first) => Some(first),
            None => self.matcher.next_match().map_err(|e| e.with_doc(doc))?,
        };
        Ok(self.current.map(|s| s.start))
    }

    fn start_position(&self) -> Option<i32> {
        self.current.map(|s| s.start)
    }

    fn end_position(&self) -> Option<i32> {
        self.current.map(|s| s.end)
    }

    fn cost(&self) -> u64 {
        self.matcher.cost()
    }
}
