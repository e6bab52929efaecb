use crate::{
    types::Timestamp,
    value::{TextMode, Value},
};
use std::cmp::Ordering;

// ---- helpers -----------------------------------------------------------

fn v_txt(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn v_ts(ms: u64) -> Value {
    Value::Timestamp(Timestamp::from_millis(ms))
}

#[test]
fn from_impls_cover_field_kinds() {
    assert_eq!(Value::from(7i32), Value::Int(7));
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from("a"), v_txt("a"));
    assert_eq!(Value::from(vec![1u8, 2]), Value::Blob(vec![1, 2]));
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), v_txt("x"));
}

#[test]
fn storage_key_projection_is_keyable_only() {
    assert!(Value::Int(1).as_storage_key().is_some());
    assert!(v_txt("k").as_storage_key().is_some());
    assert!(v_ts(5).as_storage_key().is_some());

    assert!(Value::Null.as_storage_key().is_none());
    assert!(Value::Bool(true).as_storage_key().is_none());
    assert!(Value::Blob(vec![0]).as_storage_key().is_none());
}

#[test]
fn text_ops_respect_mode() {
    let hay = v_txt("Hello World");

    assert_eq!(hay.text_contains(&v_txt("world"), TextMode::Cs), Some(false));
    assert_eq!(hay.text_contains(&v_txt("world"), TextMode::Ci), Some(true));
    assert_eq!(hay.text_starts_with(&v_txt("hello"), TextMode::Ci), Some(true));
    assert_eq!(hay.text_ends_with(&v_txt("WORLD"), TextMode::Ci), Some(true));
    assert_eq!(hay.text_eq(&v_txt("hello world"), TextMode::Ci), Some(true));
    assert_eq!(hay.text_eq(&v_txt("hello world"), TextMode::Cs), Some(false));

    // non-text operands never match a text op
    assert_eq!(Value::Int(1).text_contains(&v_txt("1"), TextMode::Cs), None);
}

#[test]
fn eq_with_mode_folds_text_only() {
    assert!(v_txt("ABC").eq_with_mode(&v_txt("abc"), TextMode::Ci));
    assert!(!v_txt("ABC").eq_with_mode(&v_txt("abc"), TextMode::Cs));

    // non-text kinds ignore the mode
    assert!(Value::Int(3).eq_with_mode(&Value::Int(3), TextMode::Ci));
    assert!(!Value::Bool(true).eq_with_mode(&Value::Bool(false), TextMode::Ci));
}

#[test]
fn in_list_matches_membership() {
    let list = vec![v_txt("a"), v_txt("B")];
    assert!(v_txt("b").in_list(&list, TextMode::Ci));
    assert!(!v_txt("b").in_list(&list, TextMode::Cs));
    assert!(!Value::Null.in_list(&list, TextMode::Cs));
}

#[test]
fn strict_order_cmp_is_same_kind_only() {
    assert_eq!(
        Value::strict_order_cmp(&Value::Int(1), &Value::Int(2)),
        Some(Ordering::Less)
    );
    assert_eq!(
        Value::strict_order_cmp(&v_txt("a"), &v_txt("a")),
        Some(Ordering::Equal)
    );
    assert_eq!(
        Value::strict_order_cmp(&v_ts(2), &v_ts(1)),
        Some(Ordering::Greater)
    );
    assert_eq!(
        Value::strict_order_cmp(&Value::Bool(false), &Value::Bool(true)),
        Some(Ordering::Less)
    );

    // mismatched or non-orderable kinds
    assert_eq!(Value::strict_order_cmp(&Value::Int(1), &v_txt("1")), None);
    assert_eq!(Value::strict_order_cmp(&Value::Null, &Value::Null), None);
    assert_eq!(
        Value::strict_order_cmp(&Value::Blob(vec![1]), &Value::Blob(vec![1])),
        None
    );
}
