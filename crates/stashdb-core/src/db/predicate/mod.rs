#[cfg(test)]
mod tests;

use crate::{
    error::InternalError,
    model::{FieldKind, FieldModel},
    types::Timestamp,
    value::{TextMode, Value},
};

///
/// Field predicates
///
/// Pure, schema-agnostic representation of one field's filter. Tagged
/// variants make unrecognized predicate shapes unrepresentable; schema-aware
/// validation happens in a separate pass before evaluation.
///

///
/// FieldPredicate
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldPredicate {
    Equals(Value),
    Not(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    IsNull,
    IsNotNull,
}

impl FieldPredicate {
    /// Evaluate against one record value.
    ///
    /// Null handling never throws: any value-shaped predicate against a null
    /// record value is simply false, and `Equals(Null)` / `Not(Null)` are the
    /// explicit null / non-null checks.
    #[must_use]
    pub fn matches(&self, value: &Value, mode: TextMode) -> bool {
        match self {
            Self::Equals(Value::Null) => value.is_null(),
            Self::Equals(operand) => !value.is_null() && value.eq_with_mode(operand, mode),
            Self::Not(Value::Null) => !value.is_null(),
            Self::Not(operand) => !value.is_null() && !value.eq_with_mode(operand, mode),
            Self::In(list) => !value.is_null() && value.in_list(list, mode),
            Self::NotIn(list) => !value.is_null() && !value.in_list(list, mode),
            Self::Lt(operand) => Self::order_op(value, operand, std::cmp::Ordering::is_lt),
            Self::Lte(operand) => Self::order_op(value, operand, std::cmp::Ordering::is_le),
            Self::Gt(operand) => Self::order_op(value, operand, std::cmp::Ordering::is_gt),
            Self::Gte(operand) => Self::order_op(value, operand, std::cmp::Ordering::is_ge),
            Self::Contains(needle) => value
                .text_contains(&Value::Text(needle.clone()), mode)
                .unwrap_or(false),
            Self::StartsWith(needle) => value
                .text_starts_with(&Value::Text(needle.clone()), mode)
                .unwrap_or(false),
            Self::EndsWith(needle) => value
                .text_ends_with(&Value::Text(needle.clone()), mode)
                .unwrap_or(false),
            Self::IsNull => value.is_null(),
            Self::IsNotNull => !value.is_null(),
        }
    }

    // Range predicates compare raw code points; Ci mode applies to equality
    // and substring predicates only.
    fn order_op(value: &Value, operand: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> bool {
        Value::strict_order_cmp(value, operand).is_some_and(test)
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Equals(_) => "equals",
            Self::Not(_) => "not",
            Self::In(_) => "in",
            Self::NotIn(_) => "not_in",
            Self::Lt(_) => "lt",
            Self::Lte(_) => "lte",
            Self::Gt(_) => "gt",
            Self::Gte(_) => "gte",
            Self::Contains(_) => "contains",
            Self::StartsWith(_) => "starts_with",
            Self::EndsWith(_) => "ends_with",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }
}

///
/// FieldFilter
///
/// Conjunction of predicates over one field, with an optional
/// case-insensitive text mode. An empty filter matches everything.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldFilter {
    predicates: Vec<FieldPredicate>,
    mode: TextMode,
}

impl FieldFilter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            predicates: Vec::new(),
            mode: TextMode::Cs,
        }
    }

    /// Bare-scalar shorthand: strict equality.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::new().equals(value)
    }

    /// Explicit-null shorthand: matches exactly the records whose field is null.
    #[must_use]
    pub fn is_null() -> Self {
        Self::new().push(FieldPredicate::IsNull)
    }

    #[must_use]
    pub fn is_not_null() -> Self {
        Self::new().push(FieldPredicate::IsNotNull)
    }

    /// Lowercase both operands before text comparison.
    #[must_use]
    pub const fn insensitive(mut self) -> Self {
        self.mode = TextMode::Ci;
        self
    }

    #[must_use]
    pub fn push(mut self, predicate: FieldPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn equals(self, value: impl Into<Value>) -> Self {
        self.push(FieldPredicate::Equals(value.into()))
    }

    #[must_use]
    pub fn not(self, value: impl Into<Value>) -> Self {
        self.push(FieldPredicate::Not(value.into()))
    }

    #[must_use]
    pub fn in_(self, values: Vec<Value>) -> Self {
        self.push(FieldPredicate::In(values))
    }

    #[must_use]
    pub fn not_in(self, values: Vec<Value>) -> Self {
        self.push(FieldPredicate::NotIn(values))
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.push(FieldPredicate::Lt(value.into()))
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.push(FieldPredicate::Lte(value.into()))
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.push(FieldPredicate::Gt(value.into()))
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.push(FieldPredicate::Gte(value.into()))
    }

    #[must_use]
    pub fn contains(self, needle: impl Into<String>) -> Self {
        self.push(FieldPredicate::Contains(needle.into()))
    }

    #[must_use]
    pub fn starts_with(self, needle: impl Into<String>) -> Self {
        self.push(FieldPredicate::StartsWith(needle.into()))
    }

    #[must_use]
    pub fn ends_with(self, needle: impl Into<String>) -> Self {
        self.push(FieldPredicate::EndsWith(needle.into()))
    }

    #[must_use]
    pub fn predicates(&self) -> &[FieldPredicate] {
        &self.predicates
    }

    #[must_use]
    pub const fn mode(&self) -> TextMode {
        self.mode
    }

    /// Evaluate the conjunction against one record value.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(value, self.mode))
    }

    /// The equality value, when this filter pins its field to one value.
    #[must_use]
    pub fn pinned_value(&self) -> Option<&Value> {
        match self.predicates.as_slice() {
            [FieldPredicate::Equals(value)] if !value.is_null() => Some(value),
            _ => None,
        }
    }

    /// Schema-aware validation and operand normalization.
    ///
    /// Checks each predicate against the declared field kind and normalizes
    /// text operands of timestamp fields to absolute time. Mistyped operands
    /// are rejected here rather than silently ignored at evaluation.
    pub fn validated(&self, field: &FieldModel) -> Result<Self, InternalError> {
        let mut predicates = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            predicates.push(Self::validate_predicate(predicate, field)?);
        }

        Ok(Self {
            predicates,
            mode: self.mode,
        })
    }

    fn validate_predicate(
        predicate: &FieldPredicate,
        field: &FieldModel,
    ) -> Result<FieldPredicate, InternalError> {
        let supported = match field.kind {
            FieldKind::Text => true,
            FieldKind::Int | FieldKind::Timestamp => !matches!(
                predicate,
                FieldPredicate::Contains(_)
                    | FieldPredicate::StartsWith(_)
                    | FieldPredicate::EndsWith(_)
            ),
            FieldKind::Bool => matches!(
                predicate,
                FieldPredicate::Equals(_)
                    | FieldPredicate::Not(_)
                    | FieldPredicate::IsNull
                    | FieldPredicate::IsNotNull
            ),
            FieldKind::Blob => matches!(
                predicate,
                FieldPredicate::Equals(_)
                    | FieldPredicate::Not(_)
                    | FieldPredicate::In(_)
                    | FieldPredicate::NotIn(_)
                    | FieldPredicate::IsNull
                    | FieldPredicate::IsNotNull
            ),
        };
        if !supported {
            return Err(InternalError::query_unsupported(format!(
                "predicate '{}' is not supported on {} field '{}'",
                predicate.label(),
                field.kind.label(),
                field.name
            )));
        }

        let check = |value: &Value| -> Result<Value, InternalError> {
            let normalized = Self::normalize_operand(value, field.kind)?;
            if normalized.is_null() || field.kind.admits(&normalized) {
                Ok(normalized)
            } else {
                Err(InternalError::query_unsupported(format!(
                    "operand kind '{}' does not match {} field '{}'",
                    value.label(),
                    field.kind.label(),
                    field.name
                )))
            }
        };

        let validated = match predicate {
            FieldPredicate::Equals(v) => FieldPredicate::Equals(check(v)?),
            FieldPredicate::Not(v) => FieldPredicate::Not(check(v)?),
            FieldPredicate::Lt(v) => FieldPredicate::Lt(check(v)?),
            FieldPredicate::Lte(v) => FieldPredicate::Lte(check(v)?),
            FieldPredicate::Gt(v) => FieldPredicate::Gt(check(v)?),
            FieldPredicate::Gte(v) => FieldPredicate::Gte(check(v)?),
            FieldPredicate::In(list) => {
                FieldPredicate::In(list.iter().map(check).collect::<Result<_, _>>()?)
            }
            FieldPredicate::NotIn(list) => {
                FieldPredicate::NotIn(list.iter().map(check).collect::<Result<_, _>>()?)
            }
            FieldPredicate::Contains(_)
            | FieldPredicate::StartsWith(_)
            | FieldPredicate::EndsWith(_)
            | FieldPredicate::IsNull
            | FieldPredicate::IsNotNull => predicate.clone(),
        };

        Ok(validated)
    }

    // Timestamp operands may arrive as RFC 3339 text; normalize them to
    // absolute time so comparison is point-in-time, not lexical.
    fn normalize_operand(value: &Value, kind: FieldKind) -> Result<Value, InternalError> {
        match (kind, value) {
            (FieldKind::Timestamp, Value::Text(s)) => Timestamp::parse_rfc3339(s)
                .map(Value::Timestamp)
                .map_err(|e| InternalError::query_unsupported(e.to_string())),
            _ => Ok(value.clone()),
        }
    }
}
