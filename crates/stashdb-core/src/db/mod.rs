pub mod client;
pub mod data;
pub mod database;
pub mod events;
pub mod predicate;
pub mod query;
pub mod record;
pub mod scope;
pub mod store;
pub mod txn;

pub use client::EntityClient;
pub use data::{
    ConnectOrCreate, CreateData, CreateQuery, NestedUpdate, NestedUpsert, RelationCreate,
    RelationUpdate, UpdateData, UpdateQuery, UpsertQuery,
};
pub use database::Database;
pub use events::{ChangeEvent, ChangeKind, SubscriptionId};
pub use predicate::{FieldFilter, FieldPredicate};
pub use query::{
    Direction, FindQuery, Include, NullsOrder, OrderBy, OrderTarget, RelationFilter,
    RelationQuery, Select, WhereClause,
};
pub use record::{Record, RecordView, RelationValue};
pub use scope::{PartitionScope, ScopePlanner};
pub use store::{KeyTuple, StorageKey};
pub use txn::{Transaction, TxnMode};
