//! StashDB — a schema-first typed query engine and persistence runtime over
//! an embedded partitioned key-value store.
//!
//! ## Crate layout
//! - `core`: runtime data model, values, predicates, scope planner, scoped
//!   transactions, entity clients, and change events.
//!
//! The `prelude` module mirrors the runtime surface used by application code.

pub use stashdb_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use stashdb_core::error::{ErrorClass, ErrorOrigin, InternalError as Error};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        db::{
            ChangeEvent, ChangeKind, ConnectOrCreate, CreateData, CreateQuery, Database,
            Direction, EntityClient, FieldFilter, FieldPredicate, FindQuery, Include,
            NestedUpdate, NestedUpsert, NullsOrder, OrderBy, OrderTarget, PartitionScope,
            RecordView, RelationCreate, RelationFilter, RelationQuery, RelationUpdate,
            RelationValue, Select, SubscriptionId, Transaction, TxnMode, UpdateData, UpdateQuery,
            UpsertQuery, WhereClause,
        },
        model::{
            EntityModel, FieldDefault, FieldKind, FieldModel, RelationKind, RelationModel,
            SchemaModel,
        },
        types::Timestamp,
        value::{TextMode, Value},
    };
}
