use tracing::warn;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::posting::PostingList;
use crate::index::segment::{FieldIndex, Segment};
use crate::query::ast::SpanQuery;
use crate::search::spans::{
    AndMatcher, ConjunctionSpans, EmptySpans, IntersectingMatcher, MatchAllSpans, OrSpans,
    RecurrenceMatcher, SequenceMatcher, SpansBox, TermSpans, WithinMatcher,
};

/// Builds match iterators for one field of one segment.
pub struct SpanFactory<'a> {
    field: &'a FieldIndex,
}

impl<'a> SpanFactory<'a> {
    pub fn new(field: &'a FieldIndex) -> Self {
        SpanFactory { field }
    }

    pub fn for_segment(segment: &'a Segment, field: &str) -> Result<Self> {
        segment.field(field).map(Self::new).ok_or_else(|| {
            Error::new(ErrorKind::UnsupportedField, format!(
                "Field {:?} is not indexed in segment {}", field, segment.id.0
            ))
        })
    }

    pub fn build(&self, query: &SpanQuery) -> Result<SpansBox<'a>> {
        if query.field() != self.field.name() {
            return Err(Error::new(ErrorKind::UnsupportedField, format!(
                "Query on field {:?} run against field {:?}", query.field(), self.field.name()
            )));
        }

        match query {
            SpanQuery::Term(_) | SpanQuery::Prefix(_) | SpanQuery::Wildcard(_) | SpanQuery::Regexp(_) => {
                Ok(self.expanded(self.leaf_postings(query)?))
            }

            SpanQuery::Or(q) => {
                if q.clauses.is_empty() {
                    return Err(empty_operands("Or"));
                }
                let children = q.clauses
                    .iter()
                    .map(|clause| self.build_lenient(clause, "or clause"))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(OrSpans::new(children)))
            }
            SpanQuery::And(q) => {
                if q.clauses.is_empty() {
                    return Err(empty_operands("And"));
                }
                let children = q.clauses
                    .iter()
                    .map(|clause| self.build(clause))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(ConjunctionSpans::new(AndMatcher::new(children))))
            }
            SpanQuery::Sequence(q) => {
                if q.items.is_empty() {
                    return Err(empty_operands("Sequence"));
                }
                let mut items = Vec::with_capacity(q.items.len());
                for item in &q.items {
                    let spans = if item.optional {
                        self.build_lenient(&item.query, "optional sequence item")?
                    } else {
                        self.build(&item.query)?
                    };
                    items.push((spans, item.optional));
                }
                let ignore = self.build_ignore(q.ignore.as_deref())?;
                Ok(Box::new(ConjunctionSpans::new(SequenceMatcher::new(items, ignore, q.max_ignore_length))))
            }
            SpanQuery::Within(q) => {
                let big = self.build(&q.big)?;
                let small = self.build(&q.small)?;
                Ok(Box::new(ConjunctionSpans::new(WithinMatcher::new(self.field, big, small, q.left, q.right))))
            }
            SpanQuery::Recurrence(q) => {
                let sub = self.build(&q.query)?;
                let ignore = self.build_ignore(q.ignore.as_deref())?;
                Ok(Box::new(ConjunctionSpans::new(RecurrenceMatcher::new(
                    sub,
                    q.minimum,
                    q.maximum,
                    ignore,
                    q.max_ignore_length,
                ))))
            }
            SpanQuery::Intersecting(q) => {
                let query = self.build(&q.query)?;
                let other = self.build(&q.other)?;
                Ok(Box::new(ConjunctionSpans::new(IntersectingMatcher::new(query, other))))
            }
            SpanQuery::MatchAll(_) => Ok(Box::new(MatchAllSpans::new(self.field))),
            SpanQuery::MatchNone(_) => Ok(Box::new(EmptySpans::new())),
        }
    }

    /// Marks every term leaf whose postings in this field hold only
    /// single-position tokens, so width-based rewrites can use it.
    pub fn resolve_widths(&self, query: &SpanQuery) -> SpanQuery {
        match query {
            SpanQuery::Term(_) | SpanQuery::Prefix(_) | SpanQuery::Wildcard(_) | SpanQuery::Regexp(_) => {
                let single = query.field() == self.field.name()
                    && self
                        .leaf_postings(query)
                        .is_ok_and(|lists| lists.iter().all(|list| !list.multi_position));
                if single {
                    query.clone().with_single_position()
                } else {
                    query.clone()
                }
            }
            _ => query.map_children(|child| self.resolve_widths(child)),
        }
    }

    /// Posting lists a term leaf expands to; empty for other nodes.
    fn leaf_postings(&self, query: &SpanQuery) -> Result<Vec<&'a PostingList>> {
        match query {
            SpanQuery::Term(q) => Ok(self.field.term_postings(&q.term).into_iter().collect()),
            SpanQuery::Prefix(q) => Ok(self.field.expand_prefix(&q.prefix)),
            SpanQuery::Wildcard(q) => self.field.expand_wildcard(&q.pattern),
            SpanQuery::Regexp(q) => self.field.expand_regex(&q.pattern),
            _ => Ok(Vec::new()),
        }
    }

    /// Builds a subtree whose failure only removes its own contribution.
    fn build_lenient(&self, query: &SpanQuery, role: &str) -> Result<SpansBox<'a>> {
        match self.build(query) {
            Ok(spans) => Ok(spans),
            Err(e) if degrades(&e) => {
                warn!(field = self.field.name(), role, error = %e, "subquery dropped");
                Ok(Box::new(EmptySpans::new()))
            }
            Err(e) => Err(e),
        }
    }

    fn build_ignore(&self, ignore: Option<&SpanQuery>) -> Result<Option<SpansBox<'a>>> {
        ignore.map(|q| self.build_lenient(q, "ignore query")).transpose()
    }

    fn term_spans(&self, postings: &'a PostingList) -> SpansBox<'a> {
        Box::new(TermSpans::new(postings, self.field.store().cursor()))
    }

    fn expanded(&self, postings: Vec<&'a PostingList>) -> SpansBox<'a> {
        match postings.len() {
            0 => Box::new(EmptySpans::new()),
            1 => self.term_spans(postings[0]),
            _ => Box::new(OrSpans::new(postings.into_iter().map(|p| self.term_spans(p)).collect())),
        }
    }
}

fn empty_operands(operator: &str) -> Error {
    Error::new(ErrorKind::EmptyOperandSet, format!("{} has no operands", operator))
}

/// Query construction problems; storage failures always propagate.
fn degrades(error: &Error) -> bool {
    matches!(
        error.kind,
        ErrorKind::UnsupportedField | ErrorKind::EmptyOperandSet | ErrorKind::InvalidArgument
    )
}
