use crate::{
    db::query::{Include, Select, WhereClause},
    value::Value,
};
use std::collections::BTreeMap;

///
/// Mutation descriptor surface
///
/// Pure data consumed by the write paths: scalar values plus nested relation
/// operations. Which operations are meaningful depends on the relation's
/// cardinality; the executor rejects the rest.
///

///
/// CreateData
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateData {
    pub values: BTreeMap<String, Value>,
    pub relations: BTreeMap<String, RelationCreate>,
}

impl CreateData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>, ops: RelationCreate) -> Self {
        self.relations.insert(relation.into(), ops);
        self
    }
}

///
/// RelationCreate
/// Nested writes resolvable during `create`.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationCreate {
    pub create: Vec<CreateData>,
    pub create_many: Vec<CreateData>,
    pub connect: Vec<WhereClause>,
    pub connect_or_create: Vec<ConnectOrCreate>,
}

impl RelationCreate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn create(mut self, data: CreateData) -> Self {
        self.create.push(data);
        self
    }

    #[must_use]
    pub fn create_many(mut self, data: Vec<CreateData>) -> Self {
        self.create_many.extend(data);
        self
    }

    #[must_use]
    pub fn connect(mut self, where_clause: WhereClause) -> Self {
        self.connect.push(where_clause);
        self
    }

    #[must_use]
    pub fn connect_or_create(mut self, entry: ConnectOrCreate) -> Self {
        self.connect_or_create.push(entry);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.create_many.is_empty()
            && self.connect.is_empty()
            && self.connect_or_create.is_empty()
    }
}

///
/// ConnectOrCreate
///

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectOrCreate {
    pub where_clause: WhereClause,
    pub create: CreateData,
}

impl ConnectOrCreate {
    #[must_use]
    pub const fn new(where_clause: WhereClause, create: CreateData) -> Self {
        Self {
            where_clause,
            create,
        }
    }
}

///
/// UpdateData
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateData {
    pub values: BTreeMap<String, Value>,
    pub relations: BTreeMap<String, RelationUpdate>,
}

impl UpdateData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bare-value field update.
    #[must_use]
    pub fn value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Explicit `{set: value}` wrapper; identical to [`value`](Self::value).
    #[must_use]
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.value(field, value)
    }

    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>, ops: RelationUpdate) -> Self {
        self.relations.insert(relation.into(), ops);
        self
    }
}

///
/// RelationUpdate
/// Nested relation operations applicable during `update`.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationUpdate {
    pub create: Vec<CreateData>,
    pub create_many: Vec<CreateData>,
    pub connect: Vec<WhereClause>,
    pub connect_or_create: Vec<ConnectOrCreate>,
    /// Rejected when the relation is structurally required.
    pub disconnect: bool,
    pub update: Vec<NestedUpdate>,
    pub update_many: Vec<NestedUpdate>,
    pub upsert: Vec<NestedUpsert>,
    pub delete: Vec<WhereClause>,
    pub delete_many: Vec<WhereClause>,
    /// Replace the full to-many membership; rejected when the relation is
    /// required and already populated.
    pub set: Option<Vec<WhereClause>>,
}

impl RelationUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn create(mut self, data: CreateData) -> Self {
        self.create.push(data);
        self
    }

    #[must_use]
    pub fn create_many(mut self, data: Vec<CreateData>) -> Self {
        self.create_many.extend(data);
        self
    }

    #[must_use]
    pub fn connect(mut self, where_clause: WhereClause) -> Self {
        self.connect.push(where_clause);
        self
    }

    #[must_use]
    pub fn connect_or_create(mut self, entry: ConnectOrCreate) -> Self {
        self.connect_or_create.push(entry);
        self
    }

    #[must_use]
    pub const fn disconnect(mut self) -> Self {
        self.disconnect = true;
        self
    }

    #[must_use]
    pub fn update(mut self, entry: NestedUpdate) -> Self {
        self.update.push(entry);
        self
    }

    #[must_use]
    pub fn update_many(mut self, entry: NestedUpdate) -> Self {
        self.update_many.push(entry);
        self
    }

    #[must_use]
    pub fn upsert(mut self, entry: NestedUpsert) -> Self {
        self.upsert.push(entry);
        self
    }

    #[must_use]
    pub fn delete(mut self, where_clause: WhereClause) -> Self {
        self.delete.push(where_clause);
        self
    }

    #[must_use]
    pub fn delete_many(mut self, where_clause: WhereClause) -> Self {
        self.delete_many.push(where_clause);
        self
    }

    #[must_use]
    pub fn set(mut self, targets: Vec<WhereClause>) -> Self {
        self.set = Some(targets);
        self
    }
}

///
/// NestedUpdate
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NestedUpdate {
    /// Absent for to-one relations (the FK pins the target).
    pub where_clause: Option<WhereClause>,
    pub data: UpdateData,
}

impl NestedUpdate {
    #[must_use]
    pub const fn new(where_clause: Option<WhereClause>, data: UpdateData) -> Self {
        Self { where_clause, data }
    }
}

///
/// NestedUpsert
///

#[derive(Clone, Debug, PartialEq)]
pub struct NestedUpsert {
    pub where_clause: WhereClause,
    pub create: CreateData,
    pub update: UpdateData,
}

impl NestedUpsert {
    #[must_use]
    pub const fn new(where_clause: WhereClause, create: CreateData, update: UpdateData) -> Self {
        Self {
            where_clause,
            create,
            update,
        }
    }
}

///
/// CreateQuery
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateQuery {
    pub data: CreateData,
    pub select: Option<Select>,
    pub include: Option<Include>,
}

impl CreateQuery {
    #[must_use]
    pub const fn new(data: CreateData) -> Self {
        Self {
            data,
            select: None,
            include: None,
        }
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
}

///
/// UpdateQuery
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateQuery {
    pub where_clause: WhereClause,
    pub data: UpdateData,
    pub select: Option<Select>,
    pub include: Option<Include>,
}

impl UpdateQuery {
    #[must_use]
    pub const fn new(where_clause: WhereClause, data: UpdateData) -> Self {
        Self {
            where_clause,
            data,
            select: None,
            include: None,
        }
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
}

///
/// UpsertQuery
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpsertQuery {
    pub where_clause: WhereClause,
    pub create: CreateData,
    pub update: UpdateData,
    pub select: Option<Select>,
    pub include: Option<Include>,
}

impl UpsertQuery {
    #[must_use]
    pub const fn new(where_clause: WhereClause, create: CreateData, update: UpdateData) -> Self {
        Self {
            where_clause,
            create,
            update,
            select: None,
            include: None,
        }
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
}
