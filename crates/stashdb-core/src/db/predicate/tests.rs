use crate::{
    db::predicate::{FieldFilter, FieldPredicate},
    model::{FieldDefault, FieldKind, FieldModel},
    types::Timestamp,
    value::Value,
};
use proptest::prelude::*;

// ---- helpers -----------------------------------------------------------

const fn field(name: &'static str, kind: FieldKind, nullable: bool) -> FieldModel {
    FieldModel {
        name,
        kind,
        nullable,
        default: FieldDefault::None,
    }
}

fn txt(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn empty_filter_matches_everything() {
    let filter = FieldFilter::new();
    assert!(filter.matches(&txt("anything")));
    assert!(filter.matches(&Value::Null));
    assert!(filter.matches(&Value::Int(0)));
}

#[test]
fn bare_value_is_strict_equality() {
    let filter = FieldFilter::value("a");
    assert!(filter.matches(&txt("a")));
    assert!(!filter.matches(&txt("A")));
    assert!(!filter.matches(&Value::Null));
}

#[test]
fn explicit_null_matches_null_only() {
    let filter = FieldFilter::is_null();
    assert!(filter.matches(&Value::Null));
    assert!(!filter.matches(&txt("")));

    // equals(null) spelled through the operand is the same check
    let filter = FieldFilter::new().equals(Value::Null);
    assert!(filter.matches(&Value::Null));
    assert!(!filter.matches(&Value::Int(0)));
}

#[test]
fn not_null_requires_non_null() {
    let filter = FieldFilter::new().not(Value::Null);
    assert!(filter.matches(&txt("x")));
    assert!(!filter.matches(&Value::Null));
}

#[test]
fn string_predicates_cover_substring_and_range_ops() {
    let filter = FieldFilter::new().contains("ell").starts_with("h").ends_with("o");
    assert!(filter.matches(&txt("hello")));
    assert!(!filter.matches(&txt("help")));
    assert!(!filter.matches(&Value::Null));

    let ci = FieldFilter::new().contains("ELL").insensitive();
    assert!(ci.matches(&txt("Hello")));

    let range = FieldFilter::new().gte("b").lt("d");
    assert!(range.matches(&txt("b")));
    assert!(range.matches(&txt("c")));
    assert!(!range.matches(&txt("d")));
    assert!(!range.matches(&txt("a")));
}

#[test]
fn membership_predicates_reject_null() {
    let filter = FieldFilter::new().in_(vec![txt("a"), txt("b")]);
    assert!(filter.matches(&txt("a")));
    assert!(!filter.matches(&txt("c")));
    assert!(!filter.matches(&Value::Null));

    let not_in = FieldFilter::new().not_in(vec![txt("a")]);
    assert!(not_in.matches(&txt("b")));
    assert!(!not_in.matches(&txt("a")));
    assert!(!not_in.matches(&Value::Null));
}

#[test]
fn numeric_ranges() {
    let filter = FieldFilter::new().gt(1i64).lte(3i64);
    assert!(!filter.matches(&Value::Int(1)));
    assert!(filter.matches(&Value::Int(2)));
    assert!(filter.matches(&Value::Int(3)));
    assert!(!filter.matches(&Value::Int(4)));
}

#[test]
fn bytes_compare_bytewise() {
    let filter = FieldFilter::value(vec![1u8, 2, 3]);
    assert!(filter.matches(&Value::Blob(vec![1, 2, 3])));
    assert!(!filter.matches(&Value::Blob(vec![1, 2])));
}

#[test]
fn validation_rejects_kind_mismatch() {
    let title = field("title", FieldKind::Text, false);
    assert!(FieldFilter::value("ok").validated(&title).is_ok());
    assert!(FieldFilter::value(1i64).validated(&title).is_err());

    let id = field("id", FieldKind::Int, false);
    assert!(FieldFilter::new().contains("x").validated(&id).is_err());

    let done = field("done", FieldKind::Bool, false);
    assert!(FieldFilter::new().lt(true).validated(&done).is_err());
}

#[test]
fn validation_normalizes_text_timestamps() {
    let created = field("created_at", FieldKind::Timestamp, false);
    let filter = FieldFilter::value("1970-01-01T00:00:01Z")
        .validated(&created)
        .unwrap();

    assert_eq!(
        filter.predicates(),
        &[FieldPredicate::Equals(Value::Timestamp(
            Timestamp::from_millis(1_000)
        ))]
    );
    assert!(filter.matches(&Value::Timestamp(Timestamp::from_millis(1_000))));

    assert!(
        FieldFilter::value("not a time")
            .validated(&created)
            .is_err()
    );
}

#[test]
fn pinned_value_is_single_equality_only() {
    assert_eq!(FieldFilter::value("a").pinned_value(), Some(&txt("a")));
    assert_eq!(FieldFilter::new().pinned_value(), None);
    assert_eq!(FieldFilter::is_null().pinned_value(), None);
    assert_eq!(
        FieldFilter::value("a").lt("z").pinned_value(),
        None
    );
}

// ---- properties --------------------------------------------------------

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        ".{0,8}".prop_map(Value::Text),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(Value::Blob),
    ]
}

proptest! {
    // Absence of constraint never excludes.
    #[test]
    fn empty_filter_never_excludes(value in arb_value()) {
        prop_assert!(FieldFilter::new().matches(&value));
    }

    // No value-shaped predicate matches a null record value.
    #[test]
    fn value_predicates_never_match_null(operand in arb_value()) {
        prop_assume!(!operand.is_null());
        let filters = [
            FieldFilter::new().equals(operand.clone()),
            FieldFilter::new().in_(vec![operand.clone()]),
            FieldFilter::new().lt(operand.clone()),
            FieldFilter::new().gte(operand),
        ];
        for filter in filters {
            prop_assert!(!filter.matches(&Value::Null));
        }
    }

    // is_null and its negation partition every value.
    #[test]
    fn null_check_partitions(value in arb_value()) {
        let null = FieldFilter::is_null().matches(&value);
        let not_null = FieldFilter::is_not_null().matches(&value);
        prop_assert!(null != not_null);
        prop_assert_eq!(null, value.is_null());
    }
}
