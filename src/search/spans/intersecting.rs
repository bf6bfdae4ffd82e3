use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use super::{align, next_span, DocMatcher, SpanWindow, SpansBox};

const QUERY: usize = 0;
const OTHER: usize = 1;

/// Matches of the query that overlap at least one match of the other query.
pub struct IntersectingMatcher<'a> {
    children: Vec<SpansBox<'a>>,
    others: SpanWindow,
}

impl<'a> IntersectingMatcher<'a> {
    pub fn new(query: SpansBox<'a>, other: SpansBox<'a>) -> Self {
        IntersectingMatcher {
            children: vec![query, other],
            others: SpanWindow::new(),
        }
    }
}

impl DocMatcher for IntersectingMatcher<'_> {
    fn candidate(&mut self, target: DocId) -> Result<Option<DocId>> {
        align(&mut self.children, target)
    }

    fn start_doc(&mut self, _doc: DocId) -> Result<()> {
        self.others.reset(true);
        Ok(())
    }

    fn next_match(&mut self) -> Result<Option<Span>> {
        while let Some(span) = next_span(self.children[QUERY].as_mut())? {
            self.others.fill_through(self.children[OTHER].as_mut(), span.end - 1)?;
            // Query starts never decrease, so these can never overlap again
            self.others.retain(|other| other.end > span.start);
            if self.others.iter().any(|other| other.overlaps(&span)) {
                return Ok(Some(span));
            }
        }
        Ok(None)
    }

    fn cost(&self) -> u64 {
        self.children[QUERY].cost().min(self.children[OTHER].cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::spans::testing::{drain, VecSpans};
    use crate::search::spans::ConjunctionSpans;

    fn intersecting(query: &[(i32, i32)], other: &[(i32, i32)]) -> Vec<(u32, i32, i32)> {
        let mut spans = ConjunctionSpans::new(IntersectingMatcher::new(
            VecSpans::boxed(&[(0, query)]),
            VecSpans::boxed(&[(0, other)]),
        ));
        drain(&mut spans)
    }

    #[test]
    fn end_is_exclusive() {
        assert_eq!(intersecting(&[(0, 5)], &[(4, 6)]), vec![(0, 0, 5)]);
        assert!(intersecting(&[(0, 5)], &[(5, 6)]).is_empty());
    }

    #[test]
    fn long_match_keeps_later_others_reachable() {
        let found = intersecting(&[(0, 10), (1, 2), (3, 4), (8, 9)], &[(1, 2), (7, 8)]);
        assert_eq!(found, vec![(0, 0, 10), (0, 1, 2)]);
    }
}
