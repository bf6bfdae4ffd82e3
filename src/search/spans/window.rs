use std::collections::VecDeque;
use crate::core::error::Result;
use crate::core::types::Span;
use super::{next_span, Spans};

/// Buffer of one child's matches inside the current document.
///
/// Filled lazily from the child in `(start, end)` order and trimmed from the
/// front as the consumer moves right, so it only ever holds the matches that
/// are still reachable.
#[derive(Debug, Default)]
pub struct SpanWindow {
    spans: VecDeque<Span>,
    exhausted: bool,
}

impl SpanWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new document. `active` is false when the child is not on it.
    pub fn reset(&mut self, active: bool) {
        self.spans.clear();
        self.exhausted = !active;
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter()
    }

    /// Buffers every match starting at or before `position`.
    pub fn fill_through(&mut self, child: &mut dyn Spans, position: i32) -> Result<()> {
        while !self.exhausted && self.spans.back().is_none_or(|s| s.start <= position) {
            match next_span(child)? {
                Some(span) => self.spans.push_back(span),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Buffered matches starting exactly at `position`.
    pub fn starting_at(&mut self, child: &mut dyn Spans, position: i32) -> Result<Vec<Span>> {
        self.fill_through(child, position)?;
        Ok(self.spans
            .iter()
            .skip_while(|s| s.start < position)
            .take_while(|s| s.start == position)
            .copied()
            .collect())
    }

    /// Smallest start strictly after `position`.
    pub fn next_start_after(&mut self, child: &mut dyn Spans, position: i32) -> Result<Option<i32>> {
        self.fill_through(child, position)?;
        Ok(self.spans.iter().map(|s| s.start).find(|&start| start > position))
    }

    /// First unconsumed match, pulling one if the buffer is empty.
    pub fn front(&mut self, child: &mut dyn Spans) -> Result<Option<Span>> {
        if self.spans.is_empty() && !self.exhausted {
            match next_span(child)? {
                Some(span) => self.spans.push_back(span),
                None => self.exhausted = true,
            }
        }
        Ok(self.spans.front().copied())
    }

    pub fn pop_front(&mut self) -> Option<Span> {
        self.spans.pop_front()
    }

    pub fn discard_before(&mut self, position: i32) {
        while self.spans.front().is_some_and(|s| s.start < position) {
            self.spans.pop_front();
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&Span) -> bool) {
        self.spans.retain(keep);
    }
}
