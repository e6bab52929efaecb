pub mod entity;
pub mod field;
pub mod relation;
pub mod schema;

pub use entity::EntityModel;
pub use field::{FieldDefault, FieldKind, FieldModel};
pub use relation::{RelationKind, RelationModel};
pub use schema::{SchemaError, SchemaModel};
