use serde::{Deserialize, Serialize};
use crate::query::ast::SpanQuery;

/// Static bounds on match width (`end - start`). `None` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Width {
    pub minimum: Option<u32>,
    pub maximum: Option<u32>,
}

impl Width {
    pub const SINGLE: Width = Width { minimum: Some(1), maximum: Some(1) };
    pub const UNKNOWN: Width = Width { minimum: None, maximum: None };

    pub fn new(minimum: Option<u32>, maximum: Option<u32>) -> Self {
        Width { minimum, maximum }
    }

    /// Both bounds known and crossed.
    pub fn is_contradictory(&self) -> bool {
        matches!((self.minimum, self.maximum), (Some(min), Some(max)) if min > max)
    }

    pub fn is_single(&self) -> bool {
        *self == Width::SINGLE
    }
}

fn add(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    a?.checked_add(b?)
}

fn mul(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    a?.checked_mul(b?)
}

/// Folds known values; `None` only when no operand is known.
fn fold_known(values: impl Iterator<Item = Option<u32>>, pick: fn(u32, u32) -> u32) -> Option<u32> {
    values.flatten().reduce(pick)
}

/// Folds all values; `None` as soon as one is unknown.
fn fold_all(values: impl Iterator<Item = Option<u32>>, pick: fn(u32, u32) -> u32) -> Option<u32> {
    let mut acc: Option<u32> = None;
    for value in values {
        let value = value?;
        acc = Some(acc.map_or(value, |a| pick(a, value)));
    }
    acc
}

impl SpanQuery {
    /// Width bounds inferred bottom-up.
    pub fn width(&self) -> Width {
        match self {
            // Annotation tokens may cover a range or set of positions
            SpanQuery::Term(_) | SpanQuery::Prefix(_) | SpanQuery::Wildcard(_) | SpanQuery::Regexp(_) => {
                if self.is_single_position_leaf() { Width::SINGLE } else { Width::UNKNOWN }
            }

            SpanQuery::MatchAll(_) => Width::SINGLE,

            SpanQuery::MatchNone(_) => Width::UNKNOWN,

            SpanQuery::Or(q) => {
                let widths: Vec<Width> = q.clauses.iter().map(SpanQuery::width).collect();
                Width::new(
                    fold_all(widths.iter().map(|w| w.minimum), u32::min),
                    fold_all(widths.iter().map(|w| w.maximum), u32::max),
                )
            }

            SpanQuery::And(q) => {
                let widths: Vec<Width> = q.clauses.iter().map(SpanQuery::width).collect();
                Width::new(
                    fold_known(widths.iter().map(|w| w.minimum), u32::max),
                    fold_known(widths.iter().map(|w| w.maximum), u32::min),
                )
            }

            SpanQuery::Sequence(q) => {
                let mut minimum = Some(0);
                let mut maximum = Some(0);
                for item in &q.items {
                    let width = item.query.width();
                    if !item.optional {
                        minimum = add(minimum, width.minimum);
                    }
                    maximum = add(maximum, width.maximum);
                }
                if let Some(ignore) = &q.ignore {
                    let gaps = q.items.len().saturating_sub(1) as u32;
                    let ignored = mul(Some(gaps), mul(Some(q.max_ignore_length), ignore.width().maximum));
                    if gaps > 0 && q.max_ignore_length > 0 {
                        maximum = add(maximum, ignored);
                    }
                }
                Width::new(minimum, maximum)
            }

            SpanQuery::Within(q) => {
                let small = q.small.width();
                let reach = add(q.big.width().maximum, Some(q.left.maximum))
                    .and_then(|m| m.checked_add(q.right.maximum));
                let maximum = match (small.maximum, reach) {
                    (Some(s), Some(r)) => Some(s.min(r)),
                    (s, r) => s.or(r),
                };
                Width::new(small.minimum, maximum)
            }

            SpanQuery::Recurrence(q) => {
                let sub = q.query.width();
                let mut maximum = mul(Some(q.maximum), sub.maximum);
                if let Some(ignore) = &q.ignore {
                    if q.maximum > 1 && q.max_ignore_length > 0 {
                        let ignored = mul(Some(q.maximum - 1), mul(Some(q.max_ignore_length), ignore.width().maximum));
                        maximum = add(maximum, ignored);
                    }
                }
                Width::new(mul(Some(q.minimum), sub.minimum), maximum)
            }

            SpanQuery::Intersecting(q) => q.query.width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::SequenceItem;
    use crate::token::position::Tolerance;

    fn t(value: &str) -> SpanQuery {
        SpanQuery::word("text", "t", value).with_single_position()
    }

    #[test]
    fn leaf_width_follows_single_position_flag() {
        assert!(t("a").width().is_single());
        assert_eq!(SpanQuery::layer("text", "s").width(), Width::UNKNOWN);
        assert!(SpanQuery::match_all("text").width().is_single());
        assert_eq!(SpanQuery::match_none("text").width(), Width::UNKNOWN);
    }

    #[test]
    fn unknown_leaf_width_propagates() {
        let sentence = SpanQuery::layer("text", "s");
        let seq = SpanQuery::sequence(vec![SequenceItem::required(t("a")), SequenceItem::required(sentence.clone())]).unwrap();
        assert_eq!(seq.width(), Width::UNKNOWN);

        let rec = SpanQuery::recurrence(sentence.clone(), 2, 3).unwrap();
        assert_eq!(rec.width(), Width::UNKNOWN);

        // The known clause bounds the shared span
        let both = SpanQuery::and(vec![sentence, t("a")]).unwrap();
        assert!(both.width().is_single());
    }

    #[test]
    fn sequence_counts_optional_items_and_ignore_gaps() {
        let seq = SpanQuery::sequence_with_ignore(
            vec![
                SequenceItem::required(t("a")),
                SequenceItem::optional(SpanQuery::recurrence(t("b"), 1, 3).unwrap()),
                SequenceItem::required(t("c")),
            ],
            t(","),
            2,
        ).unwrap();
        // minimum 1 + 0 + 1, maximum 1 + 3 + 1 + 2 gaps * 2 * 1
        assert_eq!(seq.width(), Width::new(Some(2), Some(9)));
    }

    #[test]
    fn recurrence_width_formula() {
        let rec = SpanQuery::recurrence_with_ignore(t("a"), 2, 4, t(","), 1).unwrap();
        assert_eq!(rec.width(), Width::new(Some(2), Some(7)));
    }

    #[test]
    fn within_is_bounded_by_big_plus_tolerance() {
        let small = SpanQuery::recurrence(t("a"), 1, 10).unwrap();
        let within = SpanQuery::within_with_tolerance(
            SpanQuery::recurrence(t("b"), 1, 2).unwrap(),
            small,
            Tolerance::new(0, 1).unwrap(),
            Tolerance::exact(2),
        ).unwrap();
        assert_eq!(within.width(), Width::new(Some(1), Some(5)));
    }

    #[test]
    fn and_narrows_or_widens() {
        let two = SpanQuery::recurrence(t("a"), 2, 2).unwrap();
        let both = SpanQuery::and(vec![t("a"), two.clone()]).unwrap();
        assert!(both.width().is_contradictory());
        let either = SpanQuery::or(vec![t("a"), two]).unwrap();
        assert_eq!(either.width(), Width::new(Some(1), Some(2)));
        let unknown = SpanQuery::or(vec![t("a"), SpanQuery::match_none("text")]).unwrap();
        assert_eq!(unknown.width(), Width::UNKNOWN);
    }
}
