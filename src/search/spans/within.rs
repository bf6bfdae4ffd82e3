use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use crate::index::segment::FieldIndex;
use crate::token::position::Tolerance;
use super::{align, next_span, DocMatcher, SpanWindow, SpansBox};

const BIG: usize = 0;
const SMALL: usize = 1;

/// Small matches inside a big match widened by `left` and `right`.
///
/// A big match `[s, e)` is usable only when its minimum widening stays in
/// the document, and then accepts small matches inside
/// `[max(first, s - left.max), min(last + 1, e + right.max))`. Window starts
/// never decrease, so one pass over both children is enough: pull every big
/// whose window opened before the current small start and keep the furthest
/// window end seen.
pub struct WithinMatcher<'a> {
    field: &'a FieldIndex,
    children: Vec<SpansBox<'a>>,
    big_window: SpanWindow,
    left: Tolerance,
    right: Tolerance,
    bounds: Option<(i64, i64)>,
    reach: Option<i64>,
}

impl<'a> WithinMatcher<'a> {
    pub fn new(
        field: &'a FieldIndex,
        big: SpansBox<'a>,
        small: SpansBox<'a>,
        left: Tolerance,
        right: Tolerance,
    ) -> Self {
        WithinMatcher {
            field,
            children: vec![big, small],
            big_window: SpanWindow::new(),
            left,
            right,
            bounds: None,
            reach: None,
        }
    }

    /// Accepting window of a big match, `None` when it is not usable.
    fn window(&self, big: Span, first: i64, last: i64) -> Option<(i64, i64)> {
        let (start, end) = (i64::from(big.start), i64::from(big.end));
        if start - i64::from(self.left.minimum) < first || end - 1 + i64::from(self.right.minimum) > last {
            return None;
        }
        Some((
            first.max(start - i64::from(self.left.maximum)),
            (last + 1).min(end + i64::from(self.right.maximum)),
        ))
    }
}

impl DocMatcher for WithinMatcher<'_> {
    fn candidate(&mut self, target: DocId) -> Result<Option<DocId>> {
        align(&mut self.children, target)
    }

    fn start_doc(&mut self, doc: DocId) -> Result<()> {
        self.bounds = self
            .field
            .doc(doc)
            .map(|d| (i64::from(d.min_position), i64::from(d.max_position)));
        self.big_window.reset(true);
        self.reach = None;
        Ok(())
    }

    fn next_match(&mut self) -> Result<Option<Span>> {
        let Some((first, last)) = self.bounds else {
            return Ok(None);
        };
        while let Some(small) = next_span(self.children[SMALL].as_mut())? {
            while let Some(big) = self.big_window.front(self.children[BIG].as_mut())? {
                match self.window(big, first, last) {
                    None => {
                        self.big_window.pop_front();
                    }
                    Some((opens, _)) if opens > i64::from(small.start) => break,
                    Some((_, closes)) => {
                        self.big_window.pop_front();
                        self.reach = Some(self.reach.map_or(closes, |r| r.max(closes)));
                    }
                }
            }
            if self.reach.is_some_and(|reach| i64::from(small.end) <= reach) {
                return Ok(Some(small));
            }
        }
        Ok(None)
    }

    fn cost(&self) -> u64 {
        self.children[SMALL].cost().min(self.children[BIG].cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::types::SegmentId;
    use crate::index::builder::SegmentBuilder;
    use crate::index::segment::Segment;
    use crate::search::spans::testing::{drain, VecSpans};
    use crate::search::spans::ConjunctionSpans;
    use crate::token::position::PositionSpec;
    use crate::token::record::TokenRecord;

    /// One document covering positions 0..=9.
    fn ten_positions() -> Segment {
        let tokens: Vec<TokenRecord> = (0..10)
            .map(|p| TokenRecord::new(p as u32, "t\u{1}w", PositionSpec::Single(p)))
            .collect();
        let mut builder = SegmentBuilder::new(SegmentId(0), Config::default());
        builder.add_document(DocId(0), "text", &tokens).unwrap();
        builder.build().unwrap()
    }

    fn within(
        field: &FieldIndex,
        big: &[(i32, i32)],
        small: &[(i32, i32)],
        left: Tolerance,
        right: Tolerance,
    ) -> Vec<(u32, i32, i32)> {
        let mut spans = ConjunctionSpans::new(WithinMatcher::new(
            field,
            VecSpans::boxed(&[(0, big)]),
            VecSpans::boxed(&[(0, small)]),
            left,
            right,
        ));
        drain(&mut spans)
    }

    #[test]
    fn plain_containment() {
        let segment = ten_positions();
        let field = segment.field("text").unwrap();
        let found = within(field, &[(2, 6)], &[(1, 3), (2, 3), (3, 6), (5, 7)], Tolerance::ZERO, Tolerance::ZERO);
        assert_eq!(found, vec![(0, 2, 3), (0, 3, 6)]);
    }

    #[test]
    fn tolerance_widens_and_clips_to_document() {
        let segment = ten_positions();
        let field = segment.field("text").unwrap();
        let left = Tolerance::new(0, 3).unwrap();
        let right = Tolerance::new(0, 5).unwrap();
        let found = within(field, &[(1, 2), (8, 9)], &[(0, 1), (4, 6), (6, 10)], left, right);
        assert_eq!(found, vec![(0, 0, 1), (0, 4, 6), (0, 6, 10)]);
    }

    #[test]
    fn minimum_tolerance_must_fit_in_document() {
        let segment = ten_positions();
        let field = segment.field("text").unwrap();
        // Needs two positions left of the big match, only one exists
        let found = within(field, &[(1, 2)], &[(0, 1), (1, 2)], Tolerance::exact(2), Tolerance::ZERO);
        assert!(found.is_empty());

        let found = within(field, &[(1, 2), (4, 5)], &[(1, 2), (2, 3), (3, 4)], Tolerance::exact(2), Tolerance::ZERO);
        assert_eq!(found, vec![(0, 2, 3), (0, 3, 4)]);
    }
}
