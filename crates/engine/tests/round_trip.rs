#![forbid(unsafe_code)]

use sl_core::{ColumnDef, ColumnType, TableSchema, Value};
use sl_engine::{Document, HistoryEngine};

fn widget_schema() -> TableSchema {
    TableSchema::try_new(
        "widget",
        vec![
            ColumnDef::new("id", ColumnType::Integer).primary_key(),
            ColumnDef::new("label", ColumnType::Text),
        ],
    )
    .expect("widget schema")
}

fn session() -> (Document, HistoryEngine) {
    let doc = Document::open_in_memory().expect("open document");
    let mut engine = HistoryEngine::new();
    let schema = widget_schema();
    doc.create_table(&schema).expect("create widget table");
    engine.track(schema).expect("track widget");
    (doc, engine)
}

#[test]
fn undoing_every_step_restores_the_pre_mutation_state() {
    let (mut doc, mut engine) = session();
    let schema = widget_schema();

    // baseline loaded outside of history
    engine.set_history_enabled(false);
    engine
        .insert(&mut doc, "widget", &[Value::Integer(1), Value::text("A")])
        .expect("load row");
    engine.set_history_enabled(true);
    let baseline = doc.rows(&schema).expect("baseline rows");
    assert_eq!(engine.index_max(), 0);

    engine
        .insert(&mut doc, "widget", &[Value::Integer(2), Value::text("B")])
        .expect("insert");
    engine
        .update(
            &mut doc,
            "widget",
            &[Value::Integer(1)],
            "label",
            Value::text("A2"),
        )
        .expect("update");
    engine
        .delete(&mut doc, "widget", &[Value::Integer(2)])
        .expect("delete");
    assert_eq!(engine.index_max(), 3);

    for _ in 0..3 {
        engine.undo(&mut doc).expect("undo").expect("one step back");
    }
    assert_eq!(engine.index(), 0);
    assert_eq!(doc.rows(&schema).expect("rows after undo"), baseline);

    // nothing further to undo
    assert!(engine.undo(&mut doc).expect("undo at origin").is_none());
}

#[test]
fn redo_after_undo_restores_the_post_mutation_state() {
    let (mut doc, mut engine) = session();
    let schema = widget_schema();

    engine
        .insert(&mut doc, "widget", &[Value::Integer(1), Value::text("A")])
        .expect("insert");
    engine
        .update(
            &mut doc,
            "widget",
            &[Value::Integer(1)],
            "label",
            Value::text("B"),
        )
        .expect("update");
    let after = doc.rows(&schema).expect("rows after edits");

    engine.undo(&mut doc).expect("undo update");
    engine.undo(&mut doc).expect("undo insert");
    assert!(doc.rows(&schema).expect("rows at origin").is_empty());

    engine.redo(&mut doc).expect("redo insert");
    engine.redo(&mut doc).expect("redo update");
    assert_eq!(doc.rows(&schema).expect("rows after redo"), after);
    assert_eq!(engine.index(), engine.index_max());

    assert!(engine.redo(&mut doc).expect("redo at tip").is_none());
}

#[test]
fn insert_update_update_scenario() {
    let (mut doc, mut engine) = session();
    let schema = widget_schema();
    let label = |doc: &Document| {
        let row = doc
            .row(&schema, &[Value::Integer(1)])
            .expect("read widget 1")
            .expect("widget 1 present");
        row[1].clone()
    };

    engine
        .insert(&mut doc, "widget", &[Value::Integer(1), Value::text("A")])
        .expect("insert");
    assert_eq!(engine.index_max(), 1);

    engine
        .update(
            &mut doc,
            "widget",
            &[Value::Integer(1)],
            "label",
            Value::text("B"),
        )
        .expect("update to B");
    assert_eq!(engine.index_max(), 2);

    engine
        .update(
            &mut doc,
            "widget",
            &[Value::Integer(1)],
            "label",
            Value::text("C"),
        )
        .expect("update to C");
    // compressed into the existing update entry
    assert_eq!(engine.index_max(), 2);

    engine.undo(&mut doc).expect("undo").expect("undo update run");
    assert_eq!(label(&doc), Value::text("A"));
    assert_eq!(engine.index_max(), 2);
    assert_eq!(engine.index(), 1);

    engine.redo(&mut doc).expect("redo").expect("redo update run");
    assert_eq!(label(&doc), Value::text("C"));
    assert_eq!(engine.index(), 2);
}

#[test]
fn checkpoint_index_detects_unsaved_changes() {
    let (mut doc, mut engine) = session();

    engine
        .insert(&mut doc, "widget", &[Value::Integer(1), Value::text("A")])
        .expect("insert");
    let saved = engine.index();

    engine
        .update(
            &mut doc,
            "widget",
            &[Value::Integer(1)],
            "label",
            Value::text("B"),
        )
        .expect("update");
    assert_ne!(engine.index(), saved);

    engine.undo(&mut doc).expect("undo");
    assert_eq!(engine.index(), saved);
}
