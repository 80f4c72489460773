#![forbid(unsafe_code)]

use sl_core::{ColumnDef, ColumnType, TableSchema, Value};
use sl_engine::{Document, HistoryEngine};

fn point_schema() -> TableSchema {
    TableSchema::try_new(
        "point",
        vec![
            ColumnDef::new("id", ColumnType::Integer).primary_key(),
            ColumnDef::new("x", ColumnType::Integer),
            ColumnDef::new("y", ColumnType::Integer),
        ],
    )
    .expect("point schema")
}

fn session() -> (Document, HistoryEngine) {
    let doc = Document::open_in_memory().expect("open document");
    let mut engine = HistoryEngine::new();
    let schema = point_schema();
    doc.create_table(&schema).expect("create point table");
    engine.track(schema).expect("track point");
    (doc, engine)
}

fn set_x(doc: &mut Document, engine: &mut HistoryEngine, id: i64, x: i64) {
    engine
        .update(doc, "point", &[Value::Integer(id)], "x", Value::Integer(x))
        .expect("update x");
}

fn set_y(doc: &mut Document, engine: &mut HistoryEngine, id: i64, y: i64) {
    engine
        .update(doc, "point", &[Value::Integer(id)], "y", Value::Integer(y))
        .expect("update y");
}

fn x_of(doc: &Document, id: i64) -> i64 {
    let row = doc
        .row(&point_schema(), &[Value::Integer(id)])
        .expect("read point")
        .expect("point present");
    row[1].as_integer().expect("x is integer")
}

fn load_point(doc: &mut Document, engine: &mut HistoryEngine, id: i64) {
    engine.set_history_enabled(false);
    engine
        .insert(
            doc,
            "point",
            &[Value::Integer(id), Value::Integer(0), Value::Integer(0)],
        )
        .expect("load point");
    engine.set_history_enabled(true);
}

#[test]
fn a_run_of_drag_updates_collapses_into_one_entry() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);

    for x in 1..=50 {
        set_x(&mut doc, &mut engine, 1, x);
    }
    assert_eq!(engine.index_max(), 1);
    assert_eq!(x_of(&doc, 1), 50);

    engine.undo(&mut doc).expect("undo").expect("one step");
    // the before image of the first update, not the 49th
    assert_eq!(x_of(&doc, 1), 0);
    assert_eq!(engine.index(), 0);
}

#[test]
fn alternating_columns_do_not_compress() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);

    set_x(&mut doc, &mut engine, 1, 10);
    set_y(&mut doc, &mut engine, 1, 20);
    set_x(&mut doc, &mut engine, 1, 30);
    assert_eq!(engine.index_max(), 3);

    engine.undo(&mut doc).expect("undo third");
    engine.undo(&mut doc).expect("undo second");
    engine.undo(&mut doc).expect("undo first");
    assert_eq!(x_of(&doc, 1), 0);
    assert_eq!(engine.index(), 0);
}

#[test]
fn alternating_rows_do_not_compress() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);
    load_point(&mut doc, &mut engine, 2);

    set_x(&mut doc, &mut engine, 1, 10);
    set_x(&mut doc, &mut engine, 2, 20);
    set_x(&mut doc, &mut engine, 1, 30);
    assert_eq!(engine.index_max(), 3);
}

#[test]
fn rewriting_the_current_value_is_not_captured() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);

    set_x(&mut doc, &mut engine, 1, 10);
    set_x(&mut doc, &mut engine, 1, 10);
    assert_eq!(engine.index_max(), 1);
}

#[test]
fn a_compound_bracket_breaks_a_compression_run() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);

    set_x(&mut doc, &mut engine, 1, 10);
    engine.begin("align");
    set_y(&mut doc, &mut engine, 1, 5);
    engine.end().expect("end");
    set_x(&mut doc, &mut engine, 1, 20);

    // update, push, update, pop, update
    assert_eq!(engine.index_max(), 5);

    engine.undo(&mut doc).expect("undo x=20");
    assert_eq!(x_of(&doc, 1), 10);
}

#[test]
fn compression_after_truncation_starts_a_fresh_entry() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);

    set_x(&mut doc, &mut engine, 1, 10);
    set_x(&mut doc, &mut engine, 1, 20);
    assert_eq!(engine.index_max(), 1);

    engine.undo(&mut doc).expect("undo the run");
    assert_eq!(x_of(&doc, 1), 0);

    set_x(&mut doc, &mut engine, 1, 99);
    assert_eq!(engine.index_max(), 1);

    engine.undo(&mut doc).expect("undo fresh entry");
    assert_eq!(x_of(&doc, 1), 0);
}

#[test]
fn a_truncating_update_never_folds_into_the_surviving_entry() {
    let (mut doc, mut engine) = session();
    load_point(&mut doc, &mut engine, 1);

    set_x(&mut doc, &mut engine, 1, 10);
    set_y(&mut doc, &mut engine, 1, 5);
    assert_eq!(engine.index_max(), 2);

    engine.undo(&mut doc).expect("undo the y edit");
    assert_eq!(engine.index(), 1);

    // The capture truncates the y entry; the surviving tail is an
    // update of the same row and column, but the undo in between is a
    // user-action boundary so this edit appends instead of folding.
    set_x(&mut doc, &mut engine, 1, 99);
    assert_eq!(engine.index_max(), 2);
    assert_eq!(x_of(&doc, 1), 99);

    engine.undo(&mut doc).expect("undo back to 10");
    assert_eq!(x_of(&doc, 1), 10);
    engine.undo(&mut doc).expect("undo back to baseline");
    assert_eq!(x_of(&doc, 1), 0);
}
