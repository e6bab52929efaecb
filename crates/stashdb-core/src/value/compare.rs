use crate::value::Value;
use std::cmp::Ordering;

// Ordering is defined only within one variant; cross-variant comparison is a
// caller error surfaced by the ordering pass, never resolved here.
pub(crate) fn strict_order_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),

        // Blob, Null, and cross-variant pairs: no ordering
        _ => None,
    }
}
