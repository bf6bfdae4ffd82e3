use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use crate::index::segment::FieldIndex;
use super::{check_advance, check_positioned, DocCursor, Spans};

/// Every single position between a document's first and last token.
pub struct MatchAllSpans<'a> {
    field: &'a FieldIndex,
    index: usize,
    next_position: i64,
    doc: DocCursor,
    current: Option<Span>,
}

impl<'a> MatchAllSpans<'a> {
    pub fn new(field: &'a FieldIndex) -> Self {
        MatchAllSpans {
            field,
            index: 0,
            next_position: 0,
            doc: DocCursor::Unpositioned,
            current: None,
        }
    }
}

impl Spans for MatchAllSpans<'_> {
    fn doc(&self) -> DocCursor {
        self.doc
    }

    fn advance_to_doc(&mut self, target: DocId) -> Result<Option<DocId>> {
        check_advance(self.doc, target)?;
        self.index = self.field.seek_doc(target);
        self.current = None;
        match self.field.docs().get(self.index) {
            Some(doc) => {
                self.next_position = i64::from(doc.min_position);
                self.doc = DocCursor::At(doc.doc_id);
                Ok(Some(doc.doc_id))
            }
            None => {
                self.doc = DocCursor::Exhausted;
                Ok(None)
            }
        }
    }

    fn next_start_position(&mut self) -> Result<Option<i32>> {
        check_positioned(self.doc)?;
        let max = self.field.docs().get(self.index).map_or(i64::MIN, |d| i64::from(d.max_position));
        if self.next_position > max {
            self.current = None;
            return Ok(None);
        }
        let position = self.next_position as i32;
        self.current = Some(Span::new(position, position.saturating_add(1)));
        self.next_position += 1;
        Ok(Some(position))
    }

    fn start_position(&self) -> Option<i32> {
        self.current.map(|s| s.start)
    }

    fn end_position(&self) -> Option<i32> {
        self.current.map(|s| s.end)
    }

    fn cost(&self) -> u64 {
        self.field.doc_count()
    }
}

/// Matches nothing.
#[derive(Debug, Default)]
pub struct EmptySpans {
    doc: Option<DocCursor>,
}

impl EmptySpans {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Spans for EmptySpans {
    fn doc(&self) -> DocCursor {
        self.doc.unwrap_or(DocCursor::Unpositioned)
    }

    fn advance_to_doc(&mut self, _target: DocId) -> Result<Option<DocId>> {
        self.doc = Some(DocCursor::Exhausted);
        Ok(None)
    }

    fn next_start_position(&mut self) -> Result<Option<i32>> {
        check_positioned(self.doc())?;
        Ok(None)
    }

    fn start_position(&self) -> Option<i32> {
        None
    }

    fn end_position(&self) -> Option<i32> {
        None
    }

    fn cost(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::types::SegmentId;
    use crate::index::builder::SegmentBuilder;
    use crate::search::spans::testing::drain;
    use crate::token::position::PositionSpec;
    use crate::token::record::TokenRecord;

    #[test]
    fn covers_each_document_range() {
        let mut builder = SegmentBuilder::new(SegmentId(0), Config::default());
        builder.add_document(DocId(1), "text", &[
            TokenRecord::new(0, "t\u{1}a", PositionSpec::Single(2)),
            TokenRecord::new(1, "s\u{1}", PositionSpec::Range { start: 2, end: 4 }),
        ]).unwrap();
        builder.add_document(DocId(3), "text", &[TokenRecord::new(0, "t\u{1}b", PositionSpec::Single(0))]).unwrap();
        let segment = builder.build().unwrap();
        let field = segment.field("text").unwrap();

        let mut spans = MatchAllSpans::new(field);
        assert_eq!(spans.cost(), 2);
        assert_eq!(drain(&mut spans), vec![(1, 2, 3), (1, 3, 4), (1, 4, 5), (3, 0, 1)]);
    }

    #[test]
    fn empty_spans_exhaust_immediately() {
        let mut spans = EmptySpans::new();
        assert_eq!(spans.doc(), DocCursor::Unpositioned);
        assert_eq!(spans.next_doc().unwrap(), None);
        assert_eq!(spans.doc(), DocCursor::Exhausted);
    }
}
