use std::collections::{BTreeSet, HashSet, VecDeque};
use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use super::{advance_child, DocMatcher, SpanWindow, SpansBox};

/// Between `minimum` and `maximum` adjacent repetitions of one query, with
/// up to `max_ignore` ignore matches between two repetitions.
pub struct RecurrenceMatcher<'a> {
    query: SpansBox<'a>,
    window: SpanWindow,
    ignore: Option<SpansBox<'a>>,
    ignore_window: SpanWindow,
    minimum: u32,
    maximum: u32,
    max_ignore: u32,
    start: Option<i32>,
    ready: VecDeque<Span>,
}

impl<'a> RecurrenceMatcher<'a> {
    pub fn new(
        query: SpansBox<'a>,
        minimum: u32,
        maximum: u32,
        ignore: Option<SpansBox<'a>>,
        max_ignore: u32,
    ) -> Self {
        let minimum = minimum.max(1);
        RecurrenceMatcher {
            query,
            window: SpanWindow::new(),
            ignore: if max_ignore > 0 { ignore } else { None },
            ignore_window: SpanWindow::new(),
            minimum,
            maximum: maximum.max(minimum),
            max_ignore,
            start: None,
            ready: VecDeque::new(),
        }
    }

    fn ends_from(&mut self, start: i32) -> Result<BTreeSet<i32>> {
        let mut ends = BTreeSet::new();
        let mut seen: HashSet<(i32, u32, u32)> = HashSet::new();
        let mut stack = vec![(start, 0u32, 0u32)];

        while let Some(state) = stack.pop() {
            if !seen.insert(state) {
                continue;
            }
            let (position, repetitions, ignores) = state;
            if ignores == 0 && repetitions >= self.minimum {
                ends.insert(position);
            }
            if repetitions == self.maximum {
                continue;
            }

            for span in self.window.starting_at(self.query.as_mut(), position)? {
                stack.push((span.end, repetitions + 1, 0));
            }
            if repetitions > 0 && ignores < self.max_ignore {
                if let Some(ignore) = self.ignore.as_mut() {
                    for gap in self.ignore_window.starting_at(ignore.as_mut(), position)? {
                        stack.push((gap.end, repetitions, ignores + 1));
                    }
                }
            }
        }
        Ok(ends)
    }
}

impl DocMatcher for RecurrenceMatcher<'_> {
    fn candidate(&mut self, target: DocId) -> Result<Option<DocId>> {
        advance_child(self.query.as_mut(), target)
    }

    fn start_doc(&mut self, doc: DocId) -> Result<()> {
        self.window.reset(true);
        let ignore_active = match self.ignore.as_mut() {
            Some(ignore) => advance_child(ignore.as_mut(), doc)? == Some(doc),
            None => false,
        };
        self.ignore_window.reset(ignore_active);
        self.start = None;
        self.ready.clear();
        Ok(())
    }

    fn next_match(&mut self) -> Result<Option<Span>> {
        loop {
            if let Some(span) = self.ready.pop_front() {
                return Ok(Some(span));
            }
            let after = self.start.unwrap_or(i32::MIN);
            let Some(start) = self.window.next_start_after(self.query.as_mut(), after)? else {
                return Ok(None);
            };
            self.start = Some(start);
            self.window.discard_before(start);
            self.ignore_window.discard_before(start);

            let ends = self.ends_from(start)?;
            self.ready.extend(ends.into_iter().map(|end| Span::new(start, end)));
        }
    }

    fn cost(&self) -> u64 {
        self.query.cost()
    }
}
