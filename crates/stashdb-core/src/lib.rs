//! Core runtime for StashDB: entity models, values, predicates, the scope
//! planner, scoped transactions, and the generic entity clients.

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod serialize;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No stores, serializers, or internal helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            ChangeEvent, ChangeKind, CreateData, CreateQuery, Database, Direction, EntityClient,
            FieldFilter, FindQuery, Include, NullsOrder, OrderBy, RecordView, RelationCreate,
            RelationFilter, RelationQuery, RelationUpdate, RelationValue, Select, UpdateData,
            UpdateQuery, UpsertQuery, WhereClause,
        },
        error::InternalError,
        model::{
            EntityModel, FieldDefault, FieldKind, FieldModel, RelationKind, RelationModel,
            SchemaModel,
        },
        types::Timestamp,
        value::Value,
    };
}
