use std::collections::{BTreeSet, HashSet, VecDeque};
use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use super::{advance_child, DocMatcher, SpanWindow, SpansBox};

/// One step of the expansion: next item to place, where it must start,
/// whether anything was consumed yet and how many ignore matches fill the
/// current gap.
type State = (usize, i32, bool, u32);

/// Items matched back to back, optional ones possibly skipped, with up to
/// `max_ignore` ignore matches allowed between two consumed items.
///
/// Matches are produced one start position at a time. For each start the
/// reachable end positions are collected by a bounded search over the item
/// windows, so nothing left of the current start is kept around.
pub struct SequenceMatcher<'a> {
    items: Vec<SpansBox<'a>>,
    optional: Vec<bool>,
    windows: Vec<SpanWindow>,
    required: Vec<usize>,
    starters: Vec<usize>,
    ignore: Option<SpansBox<'a>>,
    ignore_window: SpanWindow,
    max_ignore: u32,
    start: Option<i32>,
    ready: VecDeque<Span>,
}

impl<'a> SequenceMatcher<'a> {
    pub fn new(items: Vec<(SpansBox<'a>, bool)>, ignore: Option<SpansBox<'a>>, max_ignore: u32) -> Self {
        let optional: Vec<bool> = items.iter().map(|(_, optional)| *optional).collect();
        let required: Vec<usize> = (0..optional.len()).filter(|&i| !optional[i]).collect();
        // A match starts with one of the items up to the first required one
        let starters = match required.first() {
            Some(&first) => (0..=first).collect(),
            None => (0..optional.len()).collect(),
        };
        let windows = items.iter().map(|_| SpanWindow::new()).collect();
        SequenceMatcher {
            items: items.into_iter().map(|(spans, _)| spans).collect(),
            optional,
            windows,
            required,
            starters,
            ignore: if max_ignore > 0 { ignore } else { None },
            ignore_window: SpanWindow::new(),
            max_ignore,
            start: None,
            ready: VecDeque::new(),
        }
    }

    fn next_start(&mut self) -> Result<Option<i32>> {
        let after = self.start.unwrap_or(i32::MIN);
        let mut next: Option<i32> = None;
        for &item in &self.starters {
            if let Some(start) = self.windows[item].next_start_after(self.items[item].as_mut(), after)? {
                next = Some(next.map_or(start, |n| n.min(start)));
            }
        }
        Ok(next)
    }

    /// End positions of all matches beginning at `start`.
    fn ends_from(&mut self, start: i32) -> Result<BTreeSet<i32>> {
        let mut ends = BTreeSet::new();
        let mut seen: HashSet<State> = HashSet::new();
        let mut stack: Vec<State> = vec![(0, start, false, 0)];

        while let Some(state) = stack.pop() {
            if !seen.insert(state) {
                continue;
            }
            let (item, position, consumed, ignores) = state;
            if item == self.items.len() {
                if consumed && ignores == 0 {
                    ends.insert(position);
                }
                continue;
            }

            if self.optional[item] {
                stack.push((item + 1, position, consumed, ignores));
            }
            for span in self.windows[item].starting_at(self.items[item].as_mut(), position)? {
                stack.push((item + 1, span.end, true, 0));
            }
            if consumed && ignores < self.max_ignore {
                if let Some(ignore) = self.ignore.as_mut() {
                    for gap in self.ignore_window.starting_at(ignore.as_mut(), position)? {
                        stack.push((item, gap.end, true, ignores + 1));
                    }
                }
            }
        }
        Ok(ends)
    }
}

impl DocMatcher for SequenceMatcher<'_> {
    fn candidate(&mut self, target: DocId) -> Result<Option<DocId>> {
        if self.required.is_empty() {
            let mut next: Option<DocId> = None;
            for item in self.items.iter_mut() {
                if let Some(doc) = advance_child(item.as_mut(), target)? {
                    next = Some(next.map_or(doc, |n| n.min(doc)));
                }
            }
            return Ok(next);
        }

        let mut target = target;
        'search: loop {
            for &item in &self.required {
                match advance_child(self.items[item].as_mut(), target)? {
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

    fn start_doc(&mut self, doc: DocId) -> Result<()> {
        for item in 0..self.items.len() {
            let active = advance_child(self.items[item].as_mut(), doc)? == Some(doc);
            self.windows[item].reset(active);
        }
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
            let Some(start) = self.next_start()? else {
                return Ok(None);
            };
            self.start = Some(start);
            for window in self.windows.iter_mut() {
                window.discard_before(start);
            }
            self.ignore_window.discard_before(start);

            let ends = self.ends_from(start)?;
            self.ready.extend(ends.into_iter().map(|end| Span::new(start, end)));
        }
    }

    fn cost(&self) -> u64 {
        if self.required.is_empty() {
            self.items.iter().map(|i| i.cost()).sum()
        } else {
            self.required.iter().map(|&i| self.items[i].cost()).min().unwrap_or(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::spans::testing::{drain, VecSpans};
    use crate::search::spans::ConjunctionSpans;

    #[test]
    fn items_follow_each_other() {
        let mut seq = ConjunctionSpans::new(SequenceMatcher::new(vec![
            (VecSpans::boxed(&[(0, &[(0, 1), (4, 5)]), (2, &[(0, 1)])]), false),
            (VecSpans::boxed(&[(0, &[(1, 2), (1, 3), (6, 7)]), (2, &[(2, 3)])]), false),
        ], None, 0));
        // Doc 2 has both items but never adjacent
        assert_eq!(drain(&mut seq), vec![(0, 0, 2), (0, 0, 3)]);
    }

    #[test]
    fn ignore_fills_gaps_between_items_only() {
        let a: &[(i32, i32)] = &[(0, 1)];
        let b: &[(i32, i32)] = &[(1, 2), (2, 3)];
        let x: &[(i32, i32)] = &[(1, 2), (3, 4)];
        let mut seq = ConjunctionSpans::new(SequenceMatcher::new(vec![
            (VecSpans::boxed(&[(0, a)]), false),
            (VecSpans::boxed(&[(0, b)]), false),
        ], Some(VecSpans::boxed(&[(0, x)])), 1));
        // No trailing ignore: (0, 4) is not a match
        assert_eq!(drain(&mut seq), vec![(0, 0, 2), (0, 0, 3)]);
    }

    #[test]
    fn optional_items_may_be_skipped() {
        let a: &[(i32, i32)] = &[(0, 1)];
        let b: &[(i32, i32)] = &[(1, 2), (5, 6)];
        let mut seq = ConjunctionSpans::new(SequenceMatcher::new(vec![
            (VecSpans::boxed(&[(0, a)]), true),
            (VecSpans::boxed(&[(0, b)]), false),
        ], None, 0));
        assert_eq!(drain(&mut seq), vec![(0, 0, 2), (0, 1, 2), (0, 5, 6)]);
    }

    #[test]
    fn all_optional_items_still_consume_something() {
        let a: &[(i32, i32)] = &[(0, 1)];
        let b: &[(i32, i32)] = &[(1, 2)];
        let mut seq = ConjunctionSpans::new(SequenceMatcher::new(vec![
            (VecSpans::boxed(&[(3, a)]), true),
            (VecSpans::boxed(&[(3, b), (5, b)]), true),
        ], None, 0));
        assert_eq!(drain(&mut seq), vec![(3, 0, 1), (3, 0, 2), (3, 1, 2), (5, 1, 2)]);
    }
}
