use std::time::Instant;
use rayon::prelude::*;
use tracing::debug;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{DocId, Span};
use crate::index::segment::Segment;
use crate::query::ast::SpanQuery;
use crate::query::rewriter::QueryRewriter;
use crate::query::validator::{QueryValidator, ValidationConfig};
use crate::search::factory::SpanFactory;
use crate::search::results::{DocMatches, MatchCollector, SegmentMatches};
use crate::search::spans::next_span;

/// Execute span queries: validate, rewrite, build iterators, pull matches
pub struct SpanSearcher {
    pub validator: QueryValidator,
    pub rewriter: QueryRewriter,
}

impl SpanSearcher {
    pub fn new(config: &Config) -> Self {
        SpanSearcher {
            validator: QueryValidator::new(ValidationConfig::from(config)),
            rewriter: QueryRewriter::new(config),
        }
    }

    /// Validated and rewritten form of `query`, independent of any segment.
    /// Only leaves marked single-position count as one position wide.
    pub fn prepare(&self, query: &SpanQuery) -> Result<SpanQuery> {
        self.validator.validate(query)?;
        Ok(self.rewriter.rewrite(query.clone()))
    }

    /// Streams every match of `query` in `segment`. The callback returns
    /// `false` to stop early.
    pub fn for_each_match<F>(&self, segment: &Segment, query: &SpanQuery, f: F) -> Result<()>
    where
        F: FnMut(DocId, Span) -> bool,
    {
        self.validator.validate(query)?;
        self.stream_segment(segment, query, f)
    }

    pub fn search_segment(&self, segment: &Segment, query: &SpanQuery) -> Result<Vec<DocMatches>> {
        self.validator.validate(query)?;
        self.collect_segment(segment, query)
    }

    pub fn count_matches(&self, segment: &Segment, query: &SpanQuery) -> Result<usize> {
        let mut count = 0;
        self.for_each_match(segment, query, |_, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// Runs `query` over all segments in parallel, one iterator tree per
    /// segment. Results keep the order of `segments`.
    pub fn search(&self, segments: &[Segment], query: &SpanQuery) -> Result<Vec<SegmentMatches>> {
        self.validator.validate(query)?;
        segments
            .par_iter()
            .map(|segment| {
                let start = Instant::now();
                let docs = self.collect_segment(segment, query)?;
                let total_matches = docs.iter().map(|d| d.matches.len()).sum();
                Ok(SegmentMatches {
                    segment_id: segment.id,
                    docs,
                    total_matches,
                    took_ms: start.elapsed().as_millis() as u64,
                })
            })
            .collect()
    }

    fn collect_segment(&self, segment: &Segment, query: &SpanQuery) -> Result<Vec<DocMatches>> {
        let mut collector = MatchCollector::new();
        self.stream_segment(segment, query, |doc, span| {
            collector.collect(doc, span);
            true
        })?;
        Ok(collector.into_docs())
    }

    /// Leaf widths are resolved against this segment's postings before the
    /// rewrite, so width-based simplifications stay exact.
    fn stream_segment<F>(&self, segment: &Segment, query: &SpanQuery, mut f: F) -> Result<()>
    where
        F: FnMut(DocId, Span) -> bool,
    {
        let factory = SpanFactory::for_segment(segment, query.field())?;
        let prepared = self.rewriter.rewrite(factory.resolve_widths(query));
        let mut spans = factory.build(&prepared)?;
        debug!(segment = segment.id.0, cost = spans.cost(), "span iterators built");

        while let Some(doc) = spans.next_doc()? {
            while let Some(span) = next_span(spans.as_mut())? {
                if !f(doc, span) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
