//! Lazy match iterators.
//!
//! Every iterator walks documents in increasing id order and, inside the
//! current document, produces matches ordered by `(start, end)` with no
//! duplicates. `advance_to_doc` only stops on documents holding at least one
//! match, so callers never see an empty document.

pub mod window;
pub mod conjunction;
pub mod term;
pub mod match_all;
pub mod or;
pub mod and;
pub mod sequence;
pub mod recurrence;
pub mod within;
pub mod intersecting;

use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Span};

pub use and::AndMatcher;
pub use conjunction::{ConjunctionSpans, DocMatcher};
pub use intersecting::IntersectingMatcher;
pub use match_all::{EmptySpans, MatchAllSpans};
pub use or::OrSpans;
pub use recurrence::RecurrenceMatcher;
pub use sequence::SequenceMatcher;
pub use term::TermSpans;
pub use window::SpanWindow;
pub use within::WithinMatcher;

pub type SpansBox<'a> = Box<dyn Spans + 'a>;

pub type AndSpans<'a> = ConjunctionSpans<AndMatcher<'a>>;
pub type SequenceSpans<'a> = ConjunctionSpans<SequenceMatcher<'a>>;
pub type RecurrenceSpans<'a> = ConjunctionSpans<RecurrenceMatcher<'a>>;
pub type WithinSpans<'a> = ConjunctionSpans<WithinMatcher<'a>>;
pub type IntersectingSpans<'a> = ConjunctionSpans<IntersectingMatcher<'a>>;

/// Document position of an iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCursor {
    Unpositioned,
    At(DocId),
    Exhausted,
}

pub trait Spans {
    fn doc(&self) -> DocCursor;

    /// Moves to the first document `>= target` with at least one match.
    /// A target at or before the current document is a contract violation.
    fn advance_to_doc(&mut self, target: DocId) -> Result<Option<DocId>>;

    fn next_doc(&mut self) -> Result<Option<DocId>> {
        match self.doc() {
            DocCursor::Unpositioned => self.advance_to_doc(DocId(0)),
            DocCursor::At(doc) => match doc.next() {
                Some(target) => self.advance_to_doc(target),
                None => Ok(None),
            },
            DocCursor::Exhausted => Ok(None),
        }
    }

    /// Start of the next match in the current document, `None` once the
    /// document has no more matches.
    fn next_start_position(&mut self) -> Result<Option<i32>>;

    /// Bounds of the match last returned by `next_start_position`.
    fn start_position(&self) -> Option<i32>;
    fn end_position(&self) -> Option<i32>;

    /// Rough number of matches, used to order work.
    fn cost(&self) -> u64;
}

/// Enforces the monotonic advance contract.
pub fn check_advance(current: DocCursor, target: DocId) -> Result<()> {
    match current {
        DocCursor::At(doc) if target <= doc => Err(Error::invalid_state(format!(
            "advance_to_doc({}) called while on document {}", target.0, doc.0
        ))),
        _ => Ok(()),
    }
}

/// Position-level calls need a current document.
pub fn check_positioned(current: DocCursor) -> Result<DocId> {
    match current {
        DocCursor::At(doc) => Ok(doc),
        other => Err(Error::invalid_state(format!("Position requested while {:?}", other))),
    }
}

/// Advances a child only when it is behind `target`.
pub fn advance_child(child: &mut dyn Spans, target: DocId) -> Result<Option<DocId>> {
    match child.doc() {
        DocCursor::Exhausted => Ok(None),
        DocCursor::At(doc) if doc >= target => Ok(Some(doc)),
        _ => child.advance_to_doc(target),
    }
}

/// Leapfrogs all children to the first document `>= target` they share.
pub fn align(children: &mut [SpansBox<'_>], target: DocId) -> Result<Option<DocId>> {
    let mut target = target;
    'search: loop {
        for child in children.iter_mut() {
            match advance_child(child.as_mut(), target)? {
                None => return Ok(None),
                Some(doc) if doc > target => {
                    target = doc;
                    continue 'search;
                }
                Some(_) => {}
            }
        }
        return Ok(Some(target));
    }
}

/// Pulls the next match of `spans` as a [`Span`].
pub fn next_span(spans: &mut dyn Spans) -> Result<Option<Span>> {
    Ok(spans
        .next_start_position()?
        .map(|start| Span::new(start, spans.end_position().unwrap_or(start))))
}

/// Drains one document of `spans`.
pub fn collect_doc(spans: &mut dyn Spans) -> Result<Vec<Span>> {
    let mut matches = Vec::new();
    while let Some(span) = next_span(spans)? {
        matches.push(span);
    }
    Ok(matches)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory iterator over fixed per-document matches.
    pub struct VecSpans {
        docs: Vec<(DocId, Vec<Span>)>,
        index: usize,
        position: usize,
        doc: DocCursor,
        current: Option<Span>,
    }

    impl VecSpans {
        pub fn new(docs: &[(u32, &[(i32, i32)])]) -> Self {
            let mut docs: Vec<(DocId, Vec<Span>)> = docs
                .iter()
                .filter(|(_, spans)| !spans.is_empty())
                .map(|(doc, spans)| {
                    let mut spans: Vec<Span> = spans.iter().map(|&(s, e)| Span::new(s, e)).collect();
                    spans.sort();
                    spans.dedup();
                    (DocId(*doc), spans)
                })
                .collect();
            docs.sort();
            VecSpans { docs, index: 0, position: 0, doc: DocCursor::Unpositioned, current: None }
        }

        pub fn boxed(docs: &[(u32, &[(i32, i32)])]) -> SpansBox<'static> {
            Box::new(Self::new(docs))
        }
    }

    impl Spans for VecSpans {
        fn doc(&self) -> DocCursor {
            self.doc
        }

        fn advance_to_doc(&mut self, target: DocId) -> Result<Option<DocId>> {
            check_advance(self.doc, target)?;
            while self.index < self.docs.len() && self.docs[self.index].0 < target {
                self.index += 1;
            }
            self.position = 0;
            self.current = None;
            match self.docs.get(self.index) {
                Some((doc, _)) => {
                    self.doc = DocCursor::At(*doc);
                    Ok(Some(*doc))
                }
                None => {
                    self.doc = DocCursor::Exhausted;
                    Ok(None)
                }
            }
        }

        fn next_start_position(&mut self) -> Result<Option<i32>> {
            check_positioned(self.doc)?;
            self.current = self.docs[self.index].1.get(self.position).copied();
            self.position += 1;
            Ok(self.current.map(|s| s.start))
        }

        fn start_position(&self) -> Option<i32> {
            self.current.map(|s| s.start)
        }

        fn end_position(&self) -> Option<i32> {
            self.current.map(|s| s.end)
        }

        fn cost(&self) -> u64 {
            self.docs.iter().map(|(_, s)| s.len() as u64).sum()
        }
    }

    /// All (doc, start, end) triples of an iterator.
    pub fn drain(spans: &mut dyn Spans) -> Vec<(u32, i32, i32)> {
        let mut out = Vec::new();
        while let Some(doc) = spans.next_doc().unwrap() {
            for span in collect_doc(spans).unwrap() {
                out.push((doc.0, span.start, span.end));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::testing::VecSpans;
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn align_finds_shared_documents() {
        let mut children = vec![
            VecSpans::boxed(&[(1, &[(0, 1)]), (4, &[(0, 1)]), (9, &[(0, 1)])]),
            VecSpans::boxed(&[(2, &[(0, 1)]), (4, &[(0, 1)]), (9, &[(0, 1)])]),
        ];
        assert_eq!(align(&mut children, DocId(0)).unwrap(), Some(DocId(4)));
        assert_eq!(align(&mut children, DocId(5)).unwrap(), Some(DocId(9)));
        assert_eq!(align(&mut children, DocId(10)).unwrap(), None);
    }

    #[test]
    fn advancing_backwards_is_rejected() {
        let mut spans = VecSpans::new(&[(3, &[(0, 1)]), (5, &[(0, 1)])]);
        assert_eq!(spans.advance_to_doc(DocId(2)).unwrap(), Some(DocId(3)));
        let err = spans.advance_to_doc(DocId(3)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[test]
    fn positions_need_a_document() {
        let mut spans = VecSpans::new(&[(3, &[(0, 1)])]);
        assert_eq!(spans.next_start_position().unwrap_err().kind, ErrorKind::InvalidState);
    }
}
