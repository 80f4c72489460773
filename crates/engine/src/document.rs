#![forbid(unsafe_code)]

use crate::error::HistoryError;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use sl_core::{TableSchema, Value};
use std::path::Path;
use std::time::Duration;

/// Handle to the live document: the relational tables the host edits
/// and the engine replays against. The history log itself lives in
/// [`crate::HistoryEngine`], not here.
pub struct Document {
    pub(crate) conn: Connection,
}

impl Document {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        Ok(Self { conn })
    }

    pub fn create_table(&self, schema: &TableSchema) -> Result<(), HistoryError> {
        self.conn.execute_batch(&create_table_sql(schema))?;
        Ok(())
    }

    /// Read one row by primary key, in schema column order.
    pub fn row(
        &self,
        schema: &TableSchema,
        key: &[Value],
    ) -> Result<Option<Vec<Value>>, HistoryError> {
        select_row(&self.conn, schema, key)
    }

    /// Full table dump ordered by primary key.
    pub fn rows(&self, schema: &TableSchema) -> Result<Vec<Vec<Value>>, HistoryError> {
        all_rows(&self.conn, schema)
    }
}

fn configure(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(schema: &TableSchema) -> String {
    schema
        .columns()
        .iter()
        .map(|column| quote(column.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_predicate(schema: &TableSchema, first_param: usize) -> String {
    schema
        .key_columns()
        .enumerate()
        .map(|(index, column)| format!("{} = ?{}", quote(column.name()), first_param + index))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn create_table_sql(schema: &TableSchema) -> String {
    let mut parts = Vec::new();
    for column in schema.columns() {
        let mut line = format!("{} {}", quote(column.name()), column.ty().sql_type());
        if column.is_primary_key() || column.is_not_null() {
            line.push_str(" NOT NULL");
        }
        parts.push(line);
    }
    let keys = schema
        .key_columns()
        .map(|column| quote(column.name()))
        .collect::<Vec<_>>()
        .join(", ");
    parts.push(format!("PRIMARY KEY ({keys})"));
    for column in schema.columns() {
        if let Some(fk) = column.foreign_key() {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote(column.name()),
                quote(&fk.table),
                quote(&fk.column)
            ));
        }
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote(schema.name()),
        parts.join(", ")
    )
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(value) => SqlValue::Integer(*value),
        Value::Real(value) => SqlValue::Real(*value),
        Value::Text(value) => SqlValue::Text(value.clone()),
        Value::Blob(bytes) => SqlValue::Blob(bytes.clone()),
    }
}

fn read_value(value: ValueRef<'_>) -> rusqlite::Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        // A snapshot taken from a corrupted TEXT cell would replay the
        // corruption; refuse it instead of patching over the bytes.
        ValueRef::Text(text) => {
            let text = std::str::from_utf8(text).map_err(rusqlite::Error::Utf8Error)?;
            Value::Text(text.to_owned())
        }
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    let mut values = Vec::with_capacity(width);
    for index in 0..width {
        values.push(read_value(row.get_ref(index)?)?);
    }
    Ok(values)
}

fn check_key(schema: &TableSchema, key: &[Value]) -> Result<(), HistoryError> {
    if key.len() != schema.key_len() {
        return Err(HistoryError::InvalidInput(
            "key arity does not match the table's primary key",
        ));
    }
    Ok(())
}

pub(crate) fn insert_row(
    conn: &Connection,
    schema: &TableSchema,
    values: &[Value],
) -> Result<(), HistoryError> {
    if values.len() != schema.columns().len() {
        return Err(HistoryError::InvalidInput("row arity does not match schema"));
    }
    let placeholders = (1..=values.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(schema.name()),
        column_list(schema),
        placeholders
    );
    conn.execute(&sql, params_from_iter(values.iter().map(sql_value)))?;
    Ok(())
}

pub(crate) fn select_row(
    conn: &Connection,
    schema: &TableSchema,
    key: &[Value],
) -> Result<Option<Vec<Value>>, HistoryError> {
    check_key(schema, key)?;
    let sql = format!(
        "SELECT {} FROM {} WHERE {}",
        column_list(schema),
        quote(schema.name()),
        key_predicate(schema, 1)
    );
    let width = schema.columns().len();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(key.iter().map(sql_value)))?;
    match rows.next()? {
        Some(row) => Ok(Some(read_row(row, width)?)),
        None => Ok(None),
    }
}

pub(crate) fn delete_row(
    conn: &Connection,
    schema: &TableSchema,
    key: &[Value],
) -> Result<usize, HistoryError> {
    check_key(schema, key)?;
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        quote(schema.name()),
        key_predicate(schema, 1)
    );
    Ok(conn.execute(&sql, params_from_iter(key.iter().map(sql_value)))?)
}

pub(crate) fn update_column(
    conn: &Connection,
    schema: &TableSchema,
    key: &[Value],
    column_index: usize,
    value: &Value,
) -> Result<usize, HistoryError> {
    check_key(schema, key)?;
    let column = schema
        .columns()
        .get(column_index)
        .ok_or(HistoryError::InvalidInput("column index out of range"))?;
    let sql = format!(
        "UPDATE {} SET {} = ?1 WHERE {}",
        quote(schema.name()),
        quote(column.name()),
        key_predicate(schema, 2)
    );
    let params = std::iter::once(sql_value(value)).chain(key.iter().map(sql_value));
    Ok(conn.execute(&sql, params_from_iter(params))?)
}

pub(crate) fn all_rows(
    conn: &Connection,
    schema: &TableSchema,
) -> Result<Vec<Vec<Value>>, HistoryError> {
    let keys = schema
        .key_columns()
        .map(|column| quote(column.name()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(schema),
        quote(schema.name()),
        keys
    );
    let width = schema.columns().len();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| read_row(row, width))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
