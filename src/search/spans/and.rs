use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use super::{align, next_span, DocMatcher, SpansBox};

/// Spans matched by every child with exactly the same bounds.
pub struct AndMatcher<'a> {
    children: Vec<SpansBox<'a>>,
    heads: Vec<Option<Span>>,
}

impl<'a> AndMatcher<'a> {
    pub fn new(children: Vec<SpansBox<'a>>) -> Self {
        let heads = vec![None; children.len()];
        AndMatcher { children, heads }
    }

    fn pull(&mut self, child: usize) -> Result<Option<Span>> {
        self.heads[child] = next_span(self.children[child].as_mut())?;
        Ok(self.heads[child])
    }
}

impl DocMatcher for AndMatcher<'_> {
    fn candidate(&mut self, target: DocId) -> Result<Option<DocId>> {
        align(&mut self.children, target)
    }

    fn start_doc(&mut self, _doc: DocId) -> Result<()> {
        for child in 0..self.children.len() {
            self.pull(child)?;
        }
        Ok(())
    }

    fn next_match(&mut self) -> Result<Option<Span>> {
        loop {
            let mut highest: Option<Span> = None;
            for head in &self.heads {
                let Some(span) = *head else {
                    return Ok(None);
                };
                highest = Some(highest.map_or(span, |h| h.max(span)));
            }
            let Some(highest) = highest else {
                return Ok(None);
            };

            let mut agreed = true;
            for child in 0..self.children.len() {
                while let Some(span) = self.heads[child] {
                    if span >= highest {
                        break;
                    }
                    self.pull(child)?;
                }
                match self.heads[child] {
                    None => return Ok(None),
                    Some(span) if span != highest => agreed = false,
                    Some(_) => {}
                }
            }

            if agreed {
                for child in 0..self.children.len() {
                    self.pull(child)?;
                }
                return Ok(Some(highest));
            }
        }
    }

    fn cost(&self) -> u64 {
        self.children.iter().map(|c| c.cost()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::spans::testing::{drain, VecSpans};
    use crate::search::spans::ConjunctionSpans;

    #[test]
    fn keeps_only_identical_spans() {
        let mut and = ConjunctionSpans::new(AndMatcher::new(vec![
            VecSpans::boxed(&[(1, &[(0, 1), (2, 4), (5, 6)]), (3, &[(0, 1)]), (4, &[(1, 2)])]),
            VecSpans::boxed(&[(1, &[(0, 2), (2, 4), (5, 6)]), (3, &[(0, 2)]), (4, &[(1, 2), (3, 4)])]),
        ]));
        // Doc 3 shares no span and is skipped entirely
        assert_eq!(drain(&mut and), vec![(1, 2, 4), (1, 5, 6), (4, 1, 2)]);
    }

    #[test]
    fn cost_is_smallest_child() {
        let and = AndMatcher::new(vec![
            VecSpans::boxed(&[(1, &[(0, 1), (2, 4)])]),
            VecSpans::boxed(&[(1, &[(0, 1)])]),
        ]);
        assert_eq!(and.cost(), 1);
    }
}
