pub mod logical;
pub mod order;

pub use order::{Direction, NullsOrder};

use crate::{db::predicate::FieldFilter, value::Value};

///
/// Query descriptor surface
///
/// The sole contract external callers rely on: `{where, orderBy, select,
/// include}` shaped trees consumed by the entity clients. Descriptors are
/// pure data; all interpretation happens inside a planned transaction.
///

///
/// FindQuery
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub where_clause: Option<WhereClause>,
    pub order_by: Vec<OrderBy>,
    pub select: Option<Select>,
    pub include: Option<Include>,
}

impl FindQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    #[must_use]
    pub fn select(mut self, select: Select) -> Self {
        self.select = Some(select);
        self
    }

    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.include = Some(include);
        self
    }

    /// Relations requested through either projection arm.
    ///
    /// `select` wins over `include` for the same relation name.
    #[must_use]
    pub(crate) fn requested_relations(&self) -> Vec<(&str, &RelationQuery)> {
        let mut requested: Vec<(&str, &RelationQuery)> = Vec::new();
        if let Some(select) = &self.select {
            for (name, query) in &select.relations {
                requested.push((name.as_str(), query));
            }
        }
        if let Some(include) = &self.include {
            for (name, query) in &include.relations {
                if !requested.iter().any(|(n, _)| *n == name.as_str()) {
                    requested.push((name.as_str(), query));
                }
            }
        }

        requested
    }
}

///
/// WhereClause
///
/// A filter tree node: logical children (`and`/`or`/`not`), scalar field
/// filters, and relation filters. Evaluation is referentially transparent
/// except for relation lookups, which read other partitions.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause {
    pub and: Vec<WhereClause>,
    pub or: Vec<WhereClause>,
    pub not: Vec<WhereClause>,
    pub fields: Vec<(String, FieldFilter)>,
    pub relations: Vec<(String, RelationFilter)>,
}

impl WhereClause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality shorthand for one field.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().field(field, FieldFilter::value(value))
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>, filter: FieldFilter) -> Self {
        self.fields.push((field.into(), filter));
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>, filter: RelationFilter) -> Self {
        self.relations.push((relation.into(), filter));
        self
    }

    #[must_use]
    pub fn and(mut self, clause: Self) -> Self {
        self.and.push(clause);
        self
    }

    #[must_use]
    pub fn or(mut self, clause: Self) -> Self {
        self.or.push(clause);
        self
    }

    #[must_use]
    pub fn not(mut self, clause: Self) -> Self {
        self.not.push(clause);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.and.is_empty()
            && self.or.is_empty()
            && self.not.is_empty()
            && self.fields.is_empty()
            && self.relations.is_empty()
    }

    #[must_use]
    pub(crate) fn has_logical(&self) -> bool {
        !self.and.is_empty() || !self.or.is_empty() || !self.not.is_empty()
    }
}

///
/// RelationFilter
///
/// Quantified predicate over a relation: `Any`/`All`/`None` for to-many
/// (existence, universality, absence), `Is`/`IsNot` for to-one.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RelationFilter {
    Any(WhereClause),
    All(WhereClause),
    None(WhereClause),
    Is(WhereClause),
    IsNot(WhereClause),
}

///
/// OrderBy
///

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub target: OrderTarget,
    pub direction: Direction,
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            target: OrderTarget::Field(field.into()),
            direction: Direction::Asc,
            nulls: None,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            target: OrderTarget::Field(field.into()),
            direction: Direction::Desc,
            nulls: None,
        }
    }

    /// Order by a to-one relation's key, resolved through the related record.
    #[must_use]
    pub fn relation(name: impl Into<String>, nested: Self) -> Self {
        Self {
            target: OrderTarget::Relation(name.into(), Box::new(nested)),
            direction: Direction::Asc,
            nulls: None,
        }
    }

    /// Order by a to-many relation's record count.
    #[must_use]
    pub fn relation_count(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            target: OrderTarget::RelationCount(name.into()),
            direction,
            nulls: None,
        }
    }

    #[must_use]
    pub const fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Direction and null placement, resolved through relation nesting.
    ///
    /// A `Relation` target sorts by the innermost clause's settings.
    #[must_use]
    pub fn effective_sort(&self) -> (Direction, Option<NullsOrder>) {
        match &self.target {
            OrderTarget::Relation(_, nested) => nested.effective_sort(),
            OrderTarget::Field(_) | OrderTarget::RelationCount(_) => (self.direction, self.nulls),
        }
    }
}

///
/// OrderTarget
///

#[derive(Clone, Debug, PartialEq)]
pub enum OrderTarget {
    Field(String),
    Relation(String, Box<OrderBy>),
    RelationCount(String),
}

///
/// Select
/// Allow-list projection: scalar fields plus relation requests.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Select {
    pub fields: Vec<String>,
    pub relations: Vec<(String, RelationQuery)>,
}

impl Select {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>, query: RelationQuery) -> Self {
        self.relations.push((relation.into(), query));
        self
    }
}

///
/// Include
/// Relation attachment on top of all scalar fields.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Include {
    pub relations: Vec<(String, RelationQuery)>,
}

impl Include {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>, query: RelationQuery) -> Self {
        self.relations.push((relation.into(), query));
        self
    }
}

///
/// RelationQuery
/// Nested find arguments attached to a relation request.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum RelationQuery {
    /// Attach everything (the `include: { rel: true }` form).
    #[default]
    All,
    /// Attach with nested where/order/select/include honored.
    Query(Box<FindQuery>),
}

impl RelationQuery {
    #[must_use]
    pub fn query(query: FindQuery) -> Self {
        Self::Query(Box::new(query))
    }

    #[must_use]
    pub(crate) fn find_query(&self) -> FindQuery {
        match self {
            Self::All => FindQuery::new(),
            Self::Query(query) => (**query).clone(),
        }
    }
}
