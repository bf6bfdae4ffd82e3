use std::cmp::Reverse;
use std::collections::BinaryHeap;
use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use super::{advance_child, check_advance, check_positioned, next_span, DocCursor, Spans, SpansBox};

/// Union of its children. Positions are merged through a heap keyed on
/// `(start, end)`; a span reported by several children comes out once.
pub struct OrSpans<'a> {
    children: Vec<SpansBox<'a>>,
    heap: BinaryHeap<Reverse<(Span, usize)>>,
    doc: DocCursor,
    current: Option<Span>,
}

impl<'a> OrSpans<'a> {
    pub fn new(children: Vec<SpansBox<'a>>) -> Self {
        OrSpans {
            children,
            heap: BinaryHeap::new(),
            doc: DocCursor::Unpositioned,
            current: None,
        }
    }

    fn refill(&mut self, child: usize) -> Result<()> {
        if let Some(span) = next_span(self.children[child].as_mut())? {
            self.heap.push(Reverse((span, child)));
        }
        Ok(())
    }
}

impl Spans for OrSpans<'_> {
    fn doc(&self) -> DocCursor {
        self.doc
    }

    fn advance_to_doc(&mut self, target: DocId) -> Result<Option<DocId>> {
        check_advance(self.doc, target)?;
        let mut next: Option<DocId> = None;
        for child in self.children.iter_mut() {
            if let Some(doc) = advance_child(child.as_mut(), target)? {
                next = Some(next.map_or(doc, |n| n.min(doc)));
            }
        }

        self.heap.clear();
        self.current = None;
        let Some(doc) = next else {
            self.doc = DocCursor::Exhausted;
            return Ok(None);
        };
        self.doc = DocCursor::At(doc);
        for i in 0..self.children.len() {
            if self.children[i].doc() == DocCursor::At(doc) {
                self.refill(i).map_err(|e| e.with_doc(doc))?;
            }
        }
        Ok(Some(doc))
    }

    fn next_start_position(&mut self) -> Result<Option<i32>> {
        let doc = check_positioned(self.doc)?;
        while let Some(Reverse((span, child))) = self.heap.pop() {
            self.refill(child).map_err(|e| e.with_doc(doc))?;
            if self.current != Some(span) {
                self.current = Some(span);
                return Ok(Some(span.start));
            }
        }
        self.current = None;
        Ok(None)
    }

    fn start_position(&self) -> Option<i32> {
        self.current.map(|s| s.start)
    }

    fn end_position(&self) -> Option<i32> {
        self.current.map(|s| s.end)
    }

    fn cost(&self) -> u64 {
        self.children.iter().map(|c| c.cost()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::spans::testing::{drain, VecSpans};

    #[test]
    fn merges_and_dedupes() {
        let mut or = OrSpans::new(vec![
            VecSpans::boxed(&[(1, &[(0, 1), (2, 4)]), (5, &[(3, 4)])]),
            VecSpans::boxed(&[(1, &[(0, 1), (1, 2), (2, 3)]), (8, &[(0, 2)])]),
        ]);
        assert_eq!(or.cost(), 7);
        assert_eq!(drain(&mut or), vec![
            (1, 0, 1), (1, 1, 2), (1, 2, 3), (1, 2, 4),
            (5, 3, 4),
            (8, 0, 2),
        ]);
    }

    #[test]
    fn skipping_leaves_children_ahead_untouched() {
        let mut or = OrSpans::new(vec![
            VecSpans::boxed(&[(2, &[(0, 1)])]),
            VecSpans::boxed(&[(6, &[(4, 5)])]),
        ]);
        assert_eq!(or.advance_to_doc(DocId(3)).unwrap(), Some(DocId(6)));
        assert_eq!(or.next_start_position().unwrap(), Some(4));
        assert_eq!(or.next_doc().unwrap(), None);
    }
}
