use crate::{
    db::record::Record,
    model::{
        EntityModel, FieldDefault, FieldKind, FieldModel, RelationKind, RelationModel, SchemaModel,
    },
    types::Timestamp,
    value::Value,
};

///
/// Kanban demo schema
///
/// Boards own tasks through a required relation; tasks carry the usual mix
/// of field kinds (text, int, bool, timestamp, blob) so one schema covers
/// every evaluator path.
///

pub(crate) static BOARD: EntityModel = EntityModel {
    name: "Board",
    key_path: &["name"],
    fields: &[FieldModel {
        name: "name",
        kind: FieldKind::Text,
        nullable: false,
        default: FieldDefault::None,
    }],
    relations: &[RelationModel {
        name: "tasks",
        target: "Task",
        kind: RelationKind::ToMany,
        fk_field: "board_name",
        required: true,
    }],
};

pub(crate) static TASK: EntityModel = EntityModel {
    name: "Task",
    key_path: &["id"],
    fields: &[
        FieldModel {
            name: "id",
            kind: FieldKind::Int,
            nullable: false,
            default: FieldDefault::AutoIncrement,
        },
        FieldModel {
            name: "title",
            kind: FieldKind::Text,
            nullable: false,
            default: FieldDefault::None,
        },
        FieldModel {
            name: "description",
            kind: FieldKind::Text,
            nullable: true,
            default: FieldDefault::Null,
        },
        FieldModel {
            name: "is_completed",
            kind: FieldKind::Bool,
            nullable: false,
            default: FieldDefault::False,
        },
        FieldModel {
            name: "created_at",
            kind: FieldKind::Timestamp,
            nullable: false,
            default: FieldDefault::Now,
        },
        FieldModel {
            name: "image",
            kind: FieldKind::Blob,
            nullable: true,
            default: FieldDefault::Null,
        },
        FieldModel {
            name: "board_name",
            kind: FieldKind::Text,
            nullable: false,
            default: FieldDefault::None,
        },
    ],
    relations: &[RelationModel {
        name: "board",
        target: "Board",
        kind: RelationKind::ToOne,
        fk_field: "board_name",
        required: true,
    }],
};

pub(crate) static SCHEMA: SchemaModel = SchemaModel {
    name: "kanban",
    version: 1,
    entities: &[&BOARD, &TASK],
};

///
/// Record builders
///

pub(crate) fn board_record(name: &str) -> Record {
    Record::new().with("name", name)
}

pub(crate) fn task_record(id: i64, title: &str, board: &str) -> Record {
    Record::new()
        .with("id", id)
        .with("title", title)
        .with("description", Value::Null)
        .with("is_completed", false)
        .with("created_at", Timestamp::from_millis(0))
        .with("image", Value::Null)
        .with("board_name", board)
}
