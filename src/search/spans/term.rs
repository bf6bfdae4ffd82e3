use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use crate::index::posting::PostingList;
use crate::storage::token_store::TokenCursor;
use super::{check_advance, check_positioned, DocCursor, Spans};

/// Matches of one term: each stored token with that term, as the interval
/// `[min, max + 1)` of its positions. Tokens sharing an interval are
/// reported once.
pub struct TermSpans<'a> {
    postings: &'a PostingList,
    cursor: TokenCursor,
    index: usize,
    next_ref: usize,
    doc: DocCursor,
    current: Option<Span>,
}

impl<'a> TermSpans<'a> {
    pub fn new(postings: &'a PostingList, cursor: TokenCursor) -> Self {
        TermSpans {
            postings,
            cursor,
            index: 0,
            next_ref: 0,
            doc: DocCursor::Unpositioned,
            current: None,
        }
    }
}

impl Spans for TermSpans<'_> {
    fn doc(&self) -> DocCursor {
        self.doc
    }

    fn advance_to_doc(&mut self, target: DocId) -> Result<Option<DocId>> {
        check_advance(self.doc, target)?;
        self.index = self.postings.seek(self.index, target);
        self.next_ref = 0;
        self.current = None;
        match self.postings.get(self.index) {
            Some(posting) => {
                self.doc = DocCursor::At(posting.doc_id);
                Ok(Some(posting.doc_id))
            }
            None => {
                self.doc = DocCursor::Exhausted;
                Ok(None)
            }
        }
    }

    fn next_start_position(&mut self) -> Result<Option<i32>> {
        let doc = check_positioned(self.doc)?;
        let Some(posting) = self.postings.get(self.index) else {
            return Ok(None);
        };

        while let Some(&object_ref) = posting.token_refs.get(self.next_ref) {
            self.next_ref += 1;
            let entry = self.cursor.read_entry(object_ref).map_err(|e| e.with_doc(doc))?;
            let span = Span::new(
                entry.position.min_position(),
                entry.position.max_position().saturating_add(1),
            );
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
        self.postings.total_freq()
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
    fn token_intervals_become_spans() {
        let mut builder = SegmentBuilder::new(SegmentId(0), Config::default());
        builder.add_document(DocId(2), "text", &[
            TokenRecord::new(0, "t\u{1}a", PositionSpec::Single(0)),
            TokenRecord::new(1, "t\u{1}a", PositionSpec::Range { start: 2, end: 4 }),
            TokenRecord::new(2, "t\u{1}a", PositionSpec::Set(vec![2, 4])),
            TokenRecord::new(3, "t\u{1}b", PositionSpec::Single(1)),
        ]).unwrap();
        builder.add_document(DocId(7), "text", &[
            TokenRecord::new(0, "t\u{1}a", PositionSpec::Single(5)),
        ]).unwrap();
        let segment = builder.build().unwrap();
        let field = segment.field("text").unwrap();

        let postings = field.term_postings("t\u{1}a").unwrap();
        let mut spans = TermSpans::new(postings, field.store().cursor());
        assert_eq!(spans.cost(), 4);
        assert_eq!(drain(&mut spans), vec![(2, 0, 1), (2, 2, 5), (7, 5, 6)]);
        assert_eq!(spans.doc(), DocCursor::Exhausted);

        let mut skipping = TermSpans::new(postings, field.store().cursor());
        assert_eq!(skipping.advance_to_doc(DocId(3)).unwrap(), Some(DocId(7)));
        assert_eq!(skipping.next_start_position().unwrap(), Some(5));
        assert_eq!(skipping.end_position(), Some(6));
        assert_eq!(skipping.next_start_position().unwrap(), None);
    }
}
