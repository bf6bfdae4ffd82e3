use std::collections::HashSet;
use crate::query::ast::{
    AndQuery, OrQuery, RecurrenceQuery, SequenceItem, SequenceQuery, SpanQuery, WithinQuery,
};
use crate::token::position::Tolerance;

/// Node-local rewrite. Children are already rewritten when a rule runs;
/// `None` means the rule does not change the node.
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &str;
    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery>;
}

pub fn default_rules() -> Vec<Box<dyn RewriteRule>> {
    vec![
        Box::new(WidthBoundsRule),
        Box::new(OrRule),
        Box::new(AndRule),
        Box::new(SequenceRule),
        Box::new(WithinRule),
        Box::new(RecurrenceRule),
        Box::new(IntersectingRule),
    ]
}

fn changed(original: &SpanQuery, rewritten: SpanQuery) -> Option<SpanQuery> {
    (rewritten != *original).then_some(rewritten)
}

/// Rule: crossed width bounds make a node unsatisfiable
pub struct WidthBoundsRule;

impl RewriteRule for WidthBoundsRule {
    fn name(&self) -> &str {
        "width_bounds"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        if !query.is_match_none() && query.width().is_contradictory() {
            return Some(SpanQuery::match_none(query.field()));
        }
        None
    }
}

/// Rule: flatten, drop MatchNone, dedupe
pub struct OrRule;

impl RewriteRule for OrRule {
    fn name(&self) -> &str {
        "or"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        let SpanQuery::Or(or) = query else {
            return None;
        };

        let mut seen = HashSet::new();
        let mut clauses = Vec::new();
        let mut keep = |clause: &SpanQuery| {
            if !clause.is_match_none() && seen.insert(clause.clone()) {
                clauses.push(clause.clone());
            }
        };
        for clause in &or.clauses {
            match clause {
                SpanQuery::Or(inner) => inner.clauses.iter().for_each(&mut keep),
                _ => keep(clause),
            }
        }

        let rewritten = match clauses.len() {
            0 => SpanQuery::match_none(or.field.clone()),
            1 => clauses.remove(0),
            _ => SpanQuery::Or(OrQuery { field: or.field.clone(), clauses }),
        };
        changed(query, rewritten)
    }
}

/// Rule: same-span conjunction simplification
pub struct AndRule;

impl RewriteRule for AndRule {
    fn name(&self) -> &str {
        "and"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        let SpanQuery::And(and) = query else {
            return None;
        };
        // Left in place so iterator construction reports the empty operand set
        if and.clauses.is_empty() {
            return None;
        }
        if and.clauses.iter().any(SpanQuery::is_match_none) {
            return Some(SpanQuery::match_none(and.field.clone()));
        }

        let mut seen = HashSet::new();
        let mut clauses: Vec<SpanQuery> = Vec::new();
        for clause in &and.clauses {
            let flattened: Vec<&SpanQuery> = match clause {
                SpanQuery::And(inner) => inner.clauses.iter().collect(),
                _ => vec![clause],
            };
            for c in flattened {
                if seen.insert(c.clone()) {
                    clauses.push(c.clone());
                }
            }
        }

        // MatchAll adds nothing next to another single-position clause
        if clauses.iter().any(|c| !c.is_match_all() && c.width().is_single()) {
            clauses.retain(|c| !c.is_match_all());
        }

        let rewritten = match clauses.len() {
            1 => clauses.remove(0),
            _ => SpanQuery::And(AndQuery { field: and.field.clone(), clauses }),
        };
        changed(query, rewritten)
    }
}

/// Rule: normalize ignore, drop unsatisfiable items, flatten nested sequences
pub struct SequenceRule;

impl RewriteRule for SequenceRule {
    fn name(&self) -> &str {
        "sequence"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        let SpanQuery::Sequence(seq) = query else {
            return None;
        };
        if seq.items.is_empty() {
            return None;
        }

        let (ignore, max_ignore_length) = normalize_ignore(&seq.ignore, seq.max_ignore_length);

        let mut items = Vec::with_capacity(seq.items.len());
        for item in &seq.items {
            match &item.query {
                SpanQuery::MatchNone(_) if item.optional => {}
                SpanQuery::MatchNone(_) => return Some(SpanQuery::match_none(seq.field.clone())),
                // A nested group with a required item can never be empty, so
                // its items splice into an ignore-free parent unchanged
                SpanQuery::Sequence(inner)
                    if !item.optional
                        && ignore.is_none()
                        && inner.ignore.is_none()
                        && inner.items.iter().any(|i| !i.optional) =>
                {
                    items.extend(inner.items.iter().cloned());
                }
                _ => items.push(item.clone()),
            }
        }

        let rewritten = match items.len() {
            0 => SpanQuery::match_none(seq.field.clone()),
            // A match is never empty, so a lone optional item is required
            1 => items.remove(0).query,
            _ => SpanQuery::Sequence(SequenceQuery {
                field: seq.field.clone(),
                items,
                ignore,
                max_ignore_length,
            }),
        };
        changed(query, rewritten)
    }
}

/// Rule: repetition bounds and ignore normalization
pub struct RecurrenceRule;

impl RewriteRule for RecurrenceRule {
    fn name(&self) -> &str {
        "recurrence"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        let SpanQuery::Recurrence(rec) = query else {
            return None;
        };
        if rec.query.is_match_none() {
            return Some(SpanQuery::match_none(rec.field.clone()));
        }
        if rec.maximum == 1 {
            return Some((*rec.query).clone());
        }

        let (ignore, max_ignore_length) = normalize_ignore(&rec.ignore, rec.max_ignore_length);
        changed(query, SpanQuery::Recurrence(RecurrenceQuery {
            ignore,
            max_ignore_length,
            ..rec.clone()
        }))
    }
}

/// Rule: overlap with everything or with itself
pub struct IntersectingRule;

impl RewriteRule for IntersectingRule {
    fn name(&self) -> &str {
        "intersecting"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        let SpanQuery::Intersecting(q) = query else {
            return None;
        };
        if q.query.is_match_none() || q.other.is_match_none() {
            return Some(SpanQuery::match_none(q.field.clone()));
        }
        if q.other.is_match_all() || q.query == q.other {
            return Some((*q.query).clone());
        }
        None
    }
}

/// Rule: containment simplification and MatchAll boundary absorption
pub struct WithinRule;

impl RewriteRule for WithinRule {
    fn name(&self) -> &str {
        "within"
    }

    fn rewrite(&self, query: &SpanQuery) -> Option<SpanQuery> {
        let SpanQuery::Within(within) = query else {
            return None;
        };
        if within.big.is_match_none() || within.small.is_match_none() {
            return Some(SpanQuery::match_none(within.field.clone()));
        }

        let reach = within.big.width().maximum
            .map(|m| m as u64 + within.left.maximum as u64 + within.right.maximum as u64);
        if let (Some(small_min), Some(reach)) = (within.small.width().minimum, reach) {
            if small_min as u64 > reach {
                return Some(SpanQuery::match_none(within.field.clone()));
            }
        }

        if within.auto_adjust {
            if let Some(adjusted) = absorb_match_all(within) {
                return Some(SpanQuery::Within(adjusted));
            }
        }

        // Every small match is then its own usable big match
        if within.big == within.small && within.left.minimum == 0 && within.right.minimum == 0 {
            return Some((*within.small).clone());
        }
        None
    }
}

/// Run of unconstrained positions `[minimum, maximum]` long.
fn match_all_run(query: &SpanQuery) -> Option<Tolerance> {
    match query {
        SpanQuery::MatchAll(_) => Some(Tolerance::exact(1)),
        SpanQuery::Recurrence(rec) if rec.ignore.is_none() && rec.query.is_match_all() => {
            Some(Tolerance { minimum: rec.minimum, maximum: rec.maximum })
        }
        _ => None,
    }
}

fn absorbed(item: &SequenceItem) -> Option<Tolerance> {
    match_all_run(&item.query).map(|run| if item.optional { Tolerance { minimum: 0, ..run } } else { run })
}

/// Moves MatchAll runs at the edges of `big` into the tolerances. Each step
/// keeps the set of emitted small matches unchanged.
fn absorb_match_all(within: &WithinQuery) -> Option<WithinQuery> {
    let field = &within.field;
    let (left, right) = (within.left, within.right);

    let folded = |run: Tolerance| WithinQuery {
        big: Box::new(SpanQuery::match_all(field.clone())),
        left: Tolerance::ZERO,
        right: Tolerance {
            minimum: run_tolerance(left.minimum, right.minimum, run.minimum),
            maximum: run_tolerance(left.maximum, right.maximum, run.maximum),
        },
        ..within.clone()
    };

    match &*within.big {
        SpanQuery::MatchAll(_) if left.maximum > 0 => Some(folded(Tolerance::exact(1))),
        big @ SpanQuery::Recurrence(_) => match_all_run(big).map(folded),
        SpanQuery::Sequence(seq) if seq.ignore.is_none() && seq.items.len() > 1 => {
            let first = absorbed(&seq.items[0]);
            let last = absorbed(&seq.items[seq.items.len() - 1]);

            if let (Some(first), Some(last)) = (first, last) {
                if seq.items.len() == 2 {
                    let run = first.plus(last);
                    // All-optional edges could stand for an empty big match
                    return (run.minimum > 0).then(|| folded(run));
                }
            }

            let start = usize::from(first.is_some());
            let end = seq.items.len() - usize::from(last.is_some());
            if start == 0 && end == seq.items.len() {
                return None;
            }
            let rest = &seq.items[start..end];
            // Dropping the edges must leave a group that cannot match empty
            if !rest.iter().any(|i| !i.optional) {
                return None;
            }

            let big = match rest {
                [only] => only.query.clone(),
                _ => SpanQuery::Sequence(SequenceQuery { items: rest.to_vec(), ..seq.clone() }),
            };
            Some(WithinQuery {
                big: Box::new(big),
                left: left.plus(first.unwrap_or(Tolerance::ZERO)),
                right: right.plus(last.unwrap_or(Tolerance::ZERO)),
                ..within.clone()
            })
        }
        _ => None,
    }
}

/// Tolerance left after a run of `run` positions collapses into one MatchAll.
fn run_tolerance(left: u32, right: u32, run: u32) -> u32 {
    left.saturating_add(right).saturating_add(run).saturating_sub(1)
}

fn normalize_ignore(ignore: &Option<Box<SpanQuery>>, max_ignore_length: u32) -> (Option<Box<SpanQuery>>, u32) {
    match ignore {
        Some(q) if !q.is_match_none() && max_ignore_length > 0 => (Some(q.clone()), max_ignore_length),
        _ => (None, 0),
    }
}
