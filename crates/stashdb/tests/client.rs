//! End-to-end tests driving the public client surface against the kanban
//! demo schema (boards owning tasks through a required relation).

use stashdb::prelude::*;
use std::{cell::RefCell, rc::Rc};

///
/// Demo schema
///

static BOARD: EntityModel = EntityModel {
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

static TASK: EntityModel = EntityModel {
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

static SCHEMA: SchemaModel = SchemaModel {
    name: "kanban",
    version: 1,
    entities: &[&BOARD, &TASK],
};

fn open() -> (Database, EntityClient, EntityClient) {
    let db = Database::open(&SCHEMA).expect("schema opens");
    let boards = db.entity("Board").expect("board client");
    let tasks = db.entity("Task").expect("task client");
    (db, boards, tasks)
}

#[test]
fn connect_then_include_returns_the_related_records() {
    let (_db, boards, tasks) = open();

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "A")))
        .unwrap();
    tasks
        .create(&CreateQuery::new(CreateData::new().value("title", "t1").relation(
            "board",
            RelationCreate::new().connect(WhereClause::eq("name", "A")),
        )))
        .unwrap();

    let board = boards
        .find_unique(
            &FindQuery::new()
                .filter(WhereClause::eq("name", "A"))
                .include(Include::new().relation("tasks", RelationQuery::All)),
        )
        .unwrap()
        .expect("board A exists");

    let Some(RelationValue::Many(attached)) = board.relation("tasks") else {
        panic!("tasks relation not attached");
    };
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].get("title"), Some(&Value::Text("t1".to_string())));
    assert_eq!(
        attached[0].get("board_name"),
        Some(&Value::Text("A".to_string()))
    );
}

#[test]
fn delete_many_returns_the_affected_count() {
    let (_db, boards, tasks) = open();

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "A")))
        .unwrap();
    for (title, done) in [("a", true), ("b", true), ("c", true), ("d", false), ("e", false)] {
        tasks
            .create(&CreateQuery::new(
                CreateData::new()
                    .value("title", title)
                    .value("board_name", "A")
                    .value("is_completed", done),
            ))
            .unwrap();
    }

    let count = tasks
        .delete_many(Some(
            &WhereClause::new().field("is_completed", FieldFilter::value(true)),
        ))
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(tasks.count(None).unwrap(), 2);
}

#[test]
fn order_by_created_at_descending() {
    let (_db, boards, tasks) = open();

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "A")))
        .unwrap();
    for (title, ms) in [("t1", 1_000u64), ("t2", 2_000), ("t3", 3_000)] {
        tasks
            .create(&CreateQuery::new(
                CreateData::new()
                    .value("title", title)
                    .value("board_name", "A")
                    .value("created_at", Timestamp::from_millis(ms)),
            ))
            .unwrap();
    }

    let found = tasks
        .find_many(&FindQuery::new().order(OrderBy::desc("created_at")))
        .unwrap();
    let titles: Vec<&str> = found
        .iter()
        .map(|view| view.get("title").unwrap().as_text().unwrap())
        .collect();
    assert_eq!(titles, vec!["t3", "t2", "t1"]);
}

#[test]
fn board_rename_cascades_into_task_foreign_keys() {
    let (_db, boards, tasks) = open();

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "Old").relation(
            "tasks",
            RelationCreate::new().create_many(vec![
                CreateData::new().value("title", "one"),
                CreateData::new().value("title", "two"),
            ]),
        )))
        .unwrap();

    boards
        .update(&UpdateQuery::new(
            WhereClause::eq("name", "Old"),
            UpdateData::new().set("name", "New"),
        ))
        .unwrap();

    assert!(
        boards
            .find_unique(&FindQuery::new().filter(WhereClause::eq("name", "Old")))
            .unwrap()
            .is_none()
    );
    assert_eq!(
        tasks
            .count(Some(&WhereClause::eq("board_name", "New")))
            .unwrap(),
        2
    );
    assert_eq!(
        tasks
            .count(Some(&WhereClause::eq("board_name", "Old")))
            .unwrap(),
        0
    );
}

#[test]
fn subscriptions_observe_the_write_lifecycle() {
    let (_db, boards, tasks) = open();

    let seen: Rc<RefCell<Vec<ChangeKind>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    tasks.subscribe(
        &[ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete],
        move |event: &ChangeEvent| sink.borrow_mut().push(event.kind),
    );

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "A")))
        .unwrap();
    tasks
        .create(&CreateQuery::new(
            CreateData::new().value("title", "t").value("board_name", "A"),
        ))
        .unwrap();
    tasks
        .update(&UpdateQuery::new(
            WhereClause::eq("id", 1i64),
            UpdateData::new().set("title", "renamed"),
        ))
        .unwrap();
    tasks.delete(&WhereClause::eq("id", 1i64)).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete]
    );
}

#[test]
fn explicit_transactions_batch_nested_operations() {
    let (db, boards, tasks) = open();

    let mut scope = PartitionScope::new();
    scope.insert("Board");
    scope.insert("Task");
    let mut tx = db.begin(TxnMode::ReadWrite, scope).unwrap();

    boards
        .create_in(
            &CreateQuery::new(CreateData::new().value("name", "A")),
            &mut tx,
        )
        .unwrap();
    tasks
        .create_in(
            &CreateQuery::new(
                CreateData::new().value("title", "t").value("board_name", "A"),
            ),
            &mut tx,
        )
        .unwrap();

    // nothing is visible until commit
    assert_eq!(boards.count(None).unwrap(), 0);
    tx.commit().unwrap();
    assert_eq!(boards.count(None).unwrap(), 1);
    assert_eq!(tasks.count(None).unwrap(), 1);
}

#[test]
fn upsert_settles_on_a_definite_record() {
    let (_db, boards, tasks) = open();

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "A")))
        .unwrap();

    for expected in ["fresh", "patched"] {
        let view = tasks
            .upsert(&UpsertQuery::new(
                WhereClause::eq("id", 1i64),
                CreateData::new().value("title", "fresh").value("board_name", "A"),
                UpdateData::new().set("title", "patched"),
            ))
            .unwrap();
        assert_eq!(view.get("title"), Some(&Value::Text(expected.to_string())));
    }
}

#[test]
fn case_insensitive_filtering() {
    let (_db, boards, tasks) = open();

    boards
        .create(&CreateQuery::new(CreateData::new().value("name", "A")))
        .unwrap();
    tasks
        .create(&CreateQuery::new(
            CreateData::new().value("title", "Fix The Build").value("board_name", "A"),
        ))
        .unwrap();

    let found = tasks
        .find_many(&FindQuery::new().filter(WhereClause::new().field(
            "title",
            FieldFilter::new().contains("the build").insensitive(),
        )))
        .unwrap();
    assert_eq!(found.len(), 1);
}
