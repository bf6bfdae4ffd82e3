use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::token::position::Tolerance;
use crate::token::term::{prefix_key, term_text, DELIMITER};

/// Span query tree. Closed set of operators; every node belongs to one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanQuery {
    Term(TermQuery),                 // Exact stored term
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery),         // `*` and `?` over the stored term
    Regexp(RegexpQuery),
    Or(OrQuery),                     // Union
    And(AndQuery),                   // Same-span intersection
    Sequence(SequenceQuery),         // Ordered concatenation
    Within(WithinQuery),             // Containment with tolerances
    Recurrence(RecurrenceQuery),     // Consecutive repetition
    Intersecting(IntersectingQuery), // Overlap
    MatchAll(MatchAllQuery),         // Every single position
    MatchNone(MatchNoneQuery),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub term: String,  // prefix + DELIMITER + value
    #[serde(default)]
    pub single_position: bool,  // Every matched token covers one position
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
    #[serde(default)]
    pub single_position: bool,  // Every matched token covers one position
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String,
    #[serde(default)]
    pub single_position: bool,  // Every matched token covers one position
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegexpQuery {
    pub field: String,
    pub pattern: String,  // Anchored on both ends at match time
    #[serde(default)]
    pub single_position: bool,  // Every matched token covers one position
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrQuery {
    pub field: String,
    pub clauses: Vec<SpanQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AndQuery {
    pub field: String,
    pub clauses: Vec<SpanQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceItem {
    pub query: SpanQuery,
    pub optional: bool,
}

impl SequenceItem {
    pub fn required(query: SpanQuery) -> Self {
        SequenceItem { query, optional: false }
    }

    pub fn optional(query: SpanQuery) -> Self {
        SequenceItem { query, optional: true }
    }
}

/// A match never consists of skipped optional items alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceQuery {
    pub field: String,
    pub items: Vec<SequenceItem>,
    pub ignore: Option<Box<SpanQuery>>,
    pub max_ignore_length: u32,  // Ignore matches allowed per gap
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithinQuery {
    pub field: String,
    pub big: Box<SpanQuery>,
    pub small: Box<SpanQuery>,
    pub left: Tolerance,
    pub right: Tolerance,
    pub auto_adjust: bool,  // Fold MatchAll boundaries of `big` into the tolerances
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurrenceQuery {
    pub field: String,
    pub query: Box<SpanQuery>,
    pub minimum: u32,
    pub maximum: u32,
    pub ignore: Option<Box<SpanQuery>>,
    pub max_ignore_length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntersectingQuery {
    pub field: String,
    pub query: Box<SpanQuery>,
    pub other: Box<SpanQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchAllQuery {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchNoneQuery {
    pub field: String,
}

impl SpanQuery {
    pub fn field(&self) -> &str {
        match self {
            SpanQuery::Term(q) => &q.field,
            SpanQuery::Prefix(q) => &q.field,
            SpanQuery::Wildcard(q) => &q.field,
            SpanQuery::Regexp(q) => &q.field,
            SpanQuery::Or(q) => &q.field,
            SpanQuery::And(q) => &q.field,
            SpanQuery::Sequence(q) => &q.field,
            SpanQuery::Within(q) => &q.field,
            SpanQuery::Recurrence(q) => &q.field,
            SpanQuery::Intersecting(q) => &q.field,
            SpanQuery::MatchAll(q) => &q.field,
            SpanQuery::MatchNone(q) => &q.field,
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, SpanQuery::MatchAll(_))
    }

    pub fn is_match_none(&self) -> bool {
        matches!(self, SpanQuery::MatchNone(_))
    }

    /// Direct sub-queries, ignore queries included.
    pub fn children(&self) -> Vec<&SpanQuery> {
        match self {
            SpanQuery::Or(q) => q.clauses.iter().collect(),
            SpanQuery::And(q) => q.clauses.iter().collect(),
            SpanQuery::Sequence(q) => q.items.iter().map(|i| &i.query).chain(q.ignore.as_deref()).collect(),
            SpanQuery::Within(q) => vec![&*q.big, &*q.small],
            SpanQuery::Recurrence(q) => std::iter::once(&*q.query).chain(q.ignore.as_deref()).collect(),
            SpanQuery::Intersecting(q) => vec![&*q.query, &*q.other],
            _ => Vec::new(),
        }
    }

    /// Whether every token this leaf can match covers exactly one position.
    /// Always `false` for non-leaves.
    pub fn is_single_position_leaf(&self) -> bool {
        match self {
            SpanQuery::Term(q) => q.single_position,
            SpanQuery::Prefix(q) => q.single_position,
            SpanQuery::Wildcard(q) => q.single_position,
            SpanQuery::Regexp(q) => q.single_position,
            _ => false,
        }
    }

    /// Marks a term leaf as matching single-position tokens only, which
    /// lets width-based rewrites see it as one position wide. Other nodes
    /// are returned unchanged.
    pub fn with_single_position(mut self) -> Self {
        match &mut self {
            SpanQuery::Term(q) => q.single_position = true,
            SpanQuery::Prefix(q) => q.single_position = true,
            SpanQuery::Wildcard(q) => q.single_position = true,
            SpanQuery::Regexp(q) => q.single_position = true,
            _ => {}
        }
        self
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Copy of this node with every direct sub-query replaced by `f(child)`.
    pub fn map_children(&self, mut f: impl FnMut(&SpanQuery) -> SpanQuery) -> SpanQuery {
        match self {
            SpanQuery::Or(q) => SpanQuery::Or(OrQuery {
                field: q.field.clone(),
                clauses: q.clauses.iter().map(&mut f).collect(),
            }),
            SpanQuery::And(q) => SpanQuery::And(AndQuery {
                field: q.field.clone(),
                clauses: q.clauses.iter().map(&mut f).collect(),
            }),
            SpanQuery::Sequence(q) => SpanQuery::Sequence(SequenceQuery {
                field: q.field.clone(),
                items: q.items
                    .iter()
                    .map(|i| SequenceItem { query: f(&i.query), optional: i.optional })
                    .collect(),
                ignore: q.ignore.as_deref().map(|i| Box::new(f(i))),
                max_ignore_length: q.max_ignore_length,
            }),
            SpanQuery::Within(q) => SpanQuery::Within(WithinQuery {
                field: q.field.clone(),
                big: Box::new(f(&*q.big)),
                small: Box::new(f(&*q.small)),
                left: q.left,
                right: q.right,
                auto_adjust: q.auto_adjust,
            }),
            SpanQuery::Recurrence(q) => SpanQuery::Recurrence(RecurrenceQuery {
                field: q.field.clone(),
                query: Box::new(f(&*q.query)),
                minimum: q.minimum,
                maximum: q.maximum,
                ignore: q.ignore.as_deref().map(|i| Box::new(f(i))),
                max_ignore_length: q.max_ignore_length,
            }),
            SpanQuery::Intersecting(q) => SpanQuery::Intersecting(IntersectingQuery {
                field: q.field.clone(),
                query: Box::new(f(&*q.query)),
                other: Box::new(f(&*q.other)),
            }),
            leaf => leaf.clone(),
        }
    }

    // Leaves

    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        SpanQuery::Term(TermQuery { field: field.into(), term: term.into(), single_position: false })
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        SpanQuery::Prefix(PrefixQuery { field: field.into(), prefix: prefix.into(), single_position: false })
    }

    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        SpanQuery::Wildcard(WildcardQuery { field: field.into(), pattern: pattern.into(), single_position: false })
    }

    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        SpanQuery::Regexp(RegexpQuery { field: field.into(), pattern: pattern.into(), single_position: false })
    }

    /// `prefix=value` on one annotation layer.
    pub fn word(field: impl Into<String>, prefix: &str, value: &str) -> Self {
        Self::term(field, term_text(prefix, value))
    }

    /// Any value on an annotation layer.
    pub fn layer(field: impl Into<String>, prefix: &str) -> Self {
        Self::prefix(field, prefix_key(prefix))
    }

    pub fn word_prefix(field: impl Into<String>, prefix: &str, value_prefix: &str) -> Self {
        Self::prefix(field, term_text(prefix, value_prefix))
    }

    /// Wildcard over the value only; the layer name is matched literally.
    pub fn word_wildcard(field: impl Into<String>, prefix: &str, pattern: &str) -> Result<Self> {
        if prefix.contains(['*', '?']) {
            return Err(Error::invalid_argument(format!(
                "Layer prefix {:?} contains wildcard characters", prefix
            )));
        }
        Ok(Self::wildcard(field, term_text(prefix, pattern)))
    }

    /// Regular expression over the value only.
    pub fn word_regexp(field: impl Into<String>, prefix: &str, pattern: &str) -> Self {
        Self::regexp(field, format!("{}{}(?:{})", regex::escape(prefix), DELIMITER, pattern))
    }

    pub fn match_all(field: impl Into<String>) -> Self {
        SpanQuery::MatchAll(MatchAllQuery { field: field.into() })
    }

    pub fn match_none(field: impl Into<String>) -> Self {
        SpanQuery::MatchNone(MatchNoneQuery { field: field.into() })
    }

    // Combinators

    pub fn or(clauses: Vec<SpanQuery>) -> Result<Self> {
        let field = common_field(clauses.iter())?;
        Ok(SpanQuery::Or(OrQuery { field, clauses }))
    }

    pub fn and(clauses: Vec<SpanQuery>) -> Result<Self> {
        let field = common_field(clauses.iter())?;
        Ok(SpanQuery::And(AndQuery { field, clauses }))
    }

    pub fn sequence(items: Vec<SequenceItem>) -> Result<Self> {
        let field = common_field(items.iter().map(|i| &i.query))?;
        Ok(SpanQuery::Sequence(SequenceQuery { field, items, ignore: None, max_ignore_length: 0 }))
    }

    pub fn sequence_with_ignore(items: Vec<SequenceItem>, ignore: SpanQuery, max_ignore_length: u32) -> Result<Self> {
        let field = common_field(items.iter().map(|i| &i.query).chain(std::iter::once(&ignore)))?;
        Ok(SpanQuery::Sequence(SequenceQuery {
            field,
            items,
            ignore: Some(Box::new(ignore)),
            max_ignore_length,
        }))
    }

    pub fn within(big: SpanQuery, small: SpanQuery) -> Result<Self> {
        Self::within_with_tolerance(big, small, Tolerance::ZERO, Tolerance::ZERO)
    }

    pub fn within_with_tolerance(big: SpanQuery, small: SpanQuery, left: Tolerance, right: Tolerance) -> Result<Self> {
        let field = common_field([&big, &small].into_iter())?;
        Tolerance::new(left.minimum, left.maximum)?;
        Tolerance::new(right.minimum, right.maximum)?;
        Ok(SpanQuery::Within(WithinQuery {
            field,
            big: Box::new(big),
            small: Box::new(small),
            left,
            right,
            auto_adjust: true,
        }))
    }

    pub fn recurrence(query: SpanQuery, minimum: u32, maximum: u32) -> Result<Self> {
        check_recurrence_bounds(minimum, maximum)?;
        Ok(SpanQuery::Recurrence(RecurrenceQuery {
            field: query.field().to_string(),
            query: Box::new(query),
            minimum,
            maximum,
            ignore: None,
            max_ignore_length: 0,
        }))
    }

    pub fn recurrence_with_ignore(
        query: SpanQuery,
        minimum: u32,
        maximum: u32,
        ignore: SpanQuery,
        max_ignore_length: u32,
    ) -> Result<Self> {
        check_recurrence_bounds(minimum, maximum)?;
        let field = common_field([&query, &ignore].into_iter())?;
        Ok(SpanQuery::Recurrence(RecurrenceQuery {
            field,
            query: Box::new(query),
            minimum,
            maximum,
            ignore: Some(Box::new(ignore)),
            max_ignore_length,
        }))
    }

    pub fn intersecting(query: SpanQuery, other: SpanQuery) -> Result<Self> {
        let field = common_field([&query, &other].into_iter())?;
        Ok(SpanQuery::Intersecting(IntersectingQuery {
            field,
            query: Box::new(query),
            other: Box::new(other),
        }))
    }
}

fn check_recurrence_bounds(minimum: u32, maximum: u32) -> Result<()> {
    if minimum == 0 || minimum > maximum {
        return Err(Error::invalid_argument(format!(
            "Recurrence bounds [{}, {}] need 1 <= minimum <= maximum", minimum, maximum
        )));
    }
    Ok(())
}

fn common_field<'a>(mut queries: impl Iterator<Item = &'a SpanQuery>) -> Result<String> {
    let first = queries
        .next()
        .ok_or_else(|| Error::new(ErrorKind::EmptyOperandSet, "Combinator without operands".to_string()))?;
    let field = first.field();
    if let Some(other) = queries.find(|q| q.field() != field) {
        return Err(Error::invalid_argument(format!(
            "Mixed fields {:?} and {:?} in one query", field, other.field()
        )));
    }
    Ok(field.to_string())
}
