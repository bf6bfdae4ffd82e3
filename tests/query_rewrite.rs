use proptest::prelude::*;
use spandex::query::{QueryRewriter, SequenceItem, SpanQuery, VariableScope};
use spandex::{Config, ErrorKind, Tolerance};

const FIELD: &str = "text";

fn leaf() -> impl Strategy<Value = SpanQuery> {
    prop_oneof![
        4 => (prop::sample::select(vec!["a", "b", "c"]), any::<bool>()).prop_map(|(v, single)| {
            let word = SpanQuery::word(FIELD, "t", v);
            if single { word.with_single_position() } else { word }
        }),
        1 => Just(SpanQuery::layer(FIELD, "pos")),
        2 => Just(SpanQuery::match_all(FIELD)),
        1 => Just(SpanQuery::match_none(FIELD)),
    ]
}

fn tolerance() -> impl Strategy<Value = Tolerance> {
    (0u32..3, 0u32..3).prop_map(|(min, extra)| Tolerance::new(min, min + extra).unwrap())
}

/// Arbitrary trees built through the public constructors.
fn query() -> impl Strategy<Value = SpanQuery> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|c| SpanQuery::or(c).unwrap()),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|c| SpanQuery::and(c).unwrap()),
            prop::collection::vec((inner.clone(), any::<bool>()), 1..4).prop_map(|items| {
                let items = items
                    .into_iter()
                    .map(|(query, optional)| SequenceItem { query, optional })
                    .collect();
                SpanQuery::sequence(items).unwrap()
            }),
            (prop::collection::vec(inner.clone(), 1..3), inner.clone(), 0u32..3).prop_map(|(items, ignore, max)| {
                SpanQuery::sequence_with_ignore(items.into_iter().map(SequenceItem::required).collect(), ignore, max)
                    .unwrap()
            }),
            (inner.clone(), inner.clone(), tolerance(), tolerance()).prop_map(|(big, small, left, right)| {
                SpanQuery::within_with_tolerance(big, small, left, right).unwrap()
            }),
            (inner.clone(), 1u32..3, 0u32..3).prop_map(|(q, min, extra)| {
                SpanQuery::recurrence(q, min, min + extra).unwrap()
            }),
            (inner.clone(), inner.clone()).prop_map(|(q, other)| SpanQuery::intersecting(q, other).unwrap()),
        ]
    })
}

fn all_nodes<'a>(query: &'a SpanQuery, out: &mut Vec<&'a SpanQuery>) {
    out.push(query);
    for child in query.children() {
        all_nodes(child, out);
    }
}

proptest! {
    #[test]
    fn rewritten_widths_are_consistent(query in query()) {
        let rewritten = QueryRewriter::new(&Config::default()).rewrite(query);
        let mut nodes = Vec::new();
        all_nodes(&rewritten, &mut nodes);
        for node in nodes {
            prop_assert!(
                node.is_match_none() || !node.width().is_contradictory(),
                "contradictory width {:?} on {:?}", node.width(), node
            );
        }
    }

    #[test]
    fn rewrite_is_idempotent(query in query()) {
        let rewriter = QueryRewriter::new(&Config::default());
        let once = rewriter.rewrite(query);
        prop_assert_eq!(rewriter.rewrite(once.clone()), once);
    }
}

#[test]
fn within_absorbs_match_all_edges() {
    let all = SpanQuery::match_all(FIELD);
    let x = SpanQuery::word(FIELD, "t", "x");
    let big = SpanQuery::sequence(vec![
        SequenceItem::required(all.clone()),
        SequenceItem::required(x.clone()),
        SequenceItem::required(all),
    ]).unwrap();
    let query = SpanQuery::within(big, SpanQuery::word(FIELD, "t", "y")).unwrap();

    let SpanQuery::Within(within) = QueryRewriter::new(&Config::default()).rewrite(query) else {
        panic!("expected a Within node");
    };
    assert_eq!(*within.big, x);
    assert_eq!(within.left, Tolerance::exact(1));
    assert_eq!(within.right, Tolerance::exact(1));
}

#[test]
fn contradictory_and_becomes_match_none() {
    let a = SpanQuery::word(FIELD, "t", "a").with_single_position();
    let b = SpanQuery::word(FIELD, "t", "b").with_single_position();
    let two = SpanQuery::recurrence(a, 2, 2).unwrap();
    let query = SpanQuery::and(vec![two, b]).unwrap();
    assert_eq!(QueryRewriter::new(&Config::default()).rewrite(query), SpanQuery::match_none(FIELD));
}

#[test]
fn unflagged_leaves_are_not_pruned_by_width() {
    let sentences = SpanQuery::recurrence(SpanQuery::layer(FIELD, "s"), 2, 2).unwrap();
    let query = SpanQuery::and(vec![sentences, SpanQuery::word(FIELD, "t", "b")]).unwrap();
    let rewritten = QueryRewriter::new(&Config::default()).rewrite(query.clone());
    assert_eq!(rewritten, query);
}

#[test]
fn variables_fail_on_missing_and_reuse() {
    let mut scope = VariableScope::new().with_variable("nouns", vec!["cat".into(), "dog".into()]);
    assert_eq!(scope.resolve(FIELD, "lemma", "verbs").unwrap_err().kind, ErrorKind::UndefinedVariable);

    let nouns = scope.resolve(FIELD, "lemma", "nouns").unwrap();
    assert_eq!(nouns.children().len(), 2);
    assert!(scope.is_used("nouns"));
    assert_eq!(scope.resolve(FIELD, "lemma", "nouns").unwrap_err().kind, ErrorKind::VariableReused);
}

#[test]
fn mixed_fields_are_rejected_at_construction() {
    let err = SpanQuery::or(vec![SpanQuery::word("text", "t", "a"), SpanQuery::word("lemma", "t", "a")]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert_eq!(SpanQuery::and(vec![]).unwrap_err().kind, ErrorKind::EmptyOperandSet);
    assert!(SpanQuery::recurrence(SpanQuery::match_all(FIELD), 3, 2).is_err());
}
