use crate::{error::InternalError, value::Value};
use std::cmp::Ordering;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn reverse(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

///
/// NullsOrder
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NullsOrder {
    First,
    Last,
}

/// Generic two-value comparator for multi-key sorting.
///
/// Null placement resolves before value comparison and is absolute: the
/// direction never flips it. Comparing mismatched or unorderable kinds (or
/// nulls with no configured placement) signals a caller programming error
/// and is a hard failure.
pub(crate) fn compare_values(
    a: &Value,
    b: &Value,
    direction: Direction,
    nulls: Option<NullsOrder>,
) -> Result<Ordering, InternalError> {
    if let Some(placement) = nulls {
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => {
                return Ok(match placement {
                    NullsOrder::First => Ordering::Less,
                    NullsOrder::Last => Ordering::Greater,
                });
            }
            (false, true) => {
                return Ok(match placement {
                    NullsOrder::First => Ordering::Greater,
                    NullsOrder::Last => Ordering::Less,
                });
            }
            (false, false) => {}
        }
    }

    let ordering = Value::strict_order_cmp(a, b).ok_or_else(|| {
        InternalError::query_unsupported(format!(
            "comparison of kinds '{}' and '{}' is not supported",
            a.label(),
            b.label()
        ))
    })?;

    Ok(direction.reverse(ordering))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use proptest::prelude::*;

    fn txt(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn directions_flip_value_comparison() {
        let a = Value::Int(1);
        let b = Value::Int(2);
        assert_eq!(
            compare_values(&a, &b, Direction::Asc, None).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&a, &b, Direction::Desc, None).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn null_placement_is_absolute() {
        for direction in [Direction::Asc, Direction::Desc] {
            assert_eq!(
                compare_values(&Value::Null, &Value::Int(1), direction, Some(NullsOrder::First))
                    .unwrap(),
                Ordering::Less
            );
            assert_eq!(
                compare_values(&Value::Null, &Value::Int(1), direction, Some(NullsOrder::Last))
                    .unwrap(),
                Ordering::Greater
            );
        }
        assert_eq!(
            compare_values(&Value::Null, &Value::Null, Direction::Asc, Some(NullsOrder::First))
                .unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn unsupported_comparison_is_fatal() {
        assert!(compare_values(&Value::Int(1), &txt("1"), Direction::Asc, None).is_err());
        assert!(compare_values(&Value::Null, &Value::Int(1), Direction::Asc, None).is_err());
        assert!(
            compare_values(
                &Value::Blob(vec![1]),
                &Value::Blob(vec![2]),
                Direction::Asc,
                None
            )
            .is_err()
        );
    }

    #[test]
    fn timestamps_order_by_point_in_time() {
        let t1 = Value::Timestamp(Timestamp::from_millis(1));
        let t2 = Value::Timestamp(Timestamp::from_millis(2));
        assert_eq!(
            compare_values(&t2, &t1, Direction::Desc, None).unwrap(),
            Ordering::Less
        );
    }

    // ---- properties ----------------------------------------------------

    fn arb_orderable() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::Int),
            ".{0,6}".prop_map(Value::Text),
        ]
    }

    proptest! {
        // Strict weak ordering over comparable values: reflexive equality,
        // antisymmetry, transitivity.
        #[test]
        fn comparator_is_strict_weak_order(
            a in arb_orderable(),
            b in arb_orderable(),
            c in arb_orderable(),
        ) {
            prop_assume!(a.label() == b.label() && b.label() == c.label());

            let cmp = |x: &Value, y: &Value| {
                compare_values(x, y, Direction::Asc, None).unwrap()
            };

            prop_assert_eq!(cmp(&a, &a), Ordering::Equal);
            prop_assert_eq!(cmp(&a, &b), cmp(&b, &a).reverse());
            if cmp(&a, &b) == Ordering::Less && cmp(&b, &c) == Ordering::Less {
                prop_assert_eq!(cmp(&a, &c), Ordering::Less);
            }
        }

        // Null placement is respected regardless of direction.
        #[test]
        fn nulls_first_sorts_null_ahead(value in arb_orderable(), desc in any::<bool>()) {
            let direction = if desc { Direction::Desc } else { Direction::Asc };
            let ordering = compare_values(
                &Value::Null,
                &value,
                direction,
                Some(NullsOrder::First),
            ).unwrap();
            prop_assert_eq!(ordering, Ordering::Less);
        }
    }
}
