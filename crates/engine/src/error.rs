#![forbid(unsafe_code)]

use sl_core::SchemaError;

#[derive(Debug)]
pub enum HistoryError {
    Sql(rusqlite::Error),
    Schema(SchemaError),
    InvalidInput(&'static str),
    UnknownTable(String),
    UnknownColumn {
        table: String,
        column: String,
    },
    KeyImmutable {
        table: String,
        column: String,
    },
    UnknownRow {
        table: String,
    },
    IndexOutOfRange {
        index: i64,
        max: i64,
    },
    UnbalancedPop,
    CompoundOpen,
    CursorOnPush {
        history_id: i64,
    },
    CursorOnPop {
        history_id: i64,
    },
    RangeOpen {
        history_id: i64,
    },
    EntryCorrupt {
        history_id: i64,
    },
    ShadowMissing {
        table: String,
        history_id: i64,
    },
    ReplayMismatch {
        table: String,
        history_id: i64,
    },
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::Schema(err) => write!(f, "schema: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownTable(table) => write!(f, "unknown table: {table}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column: {table}.{column}")
            }
            Self::KeyImmutable { table, column } => {
                write!(f, "primary key column is immutable: {table}.{column}")
            }
            Self::UnknownRow { table } => write!(f, "no such row in table {table}"),
            Self::IndexOutOfRange { index, max } => {
                write!(f, "history index {index} out of range 0..={max}")
            }
            Self::UnbalancedPop => f.write_str("end() called with no open begin()"),
            Self::CompoundOpen => {
                f.write_str("undo/redo is not allowed while a compound operation is open")
            }
            Self::CursorOnPush { history_id } => {
                write!(f, "cursor landed on an unmatched push (history id {history_id})")
            }
            Self::CursorOnPop { history_id } => {
                write!(f, "cursor landed on an unmatched pop (history id {history_id})")
            }
            Self::RangeOpen { history_id } => {
                write!(f, "compound range at history id {history_id} has no matching bracket")
            }
            Self::EntryCorrupt { history_id } => {
                write!(f, "history entry {history_id} is missing required fields")
            }
            Self::ShadowMissing { table, history_id } => {
                write!(f, "missing shadow row for {table} at history id {history_id}")
            }
            Self::ReplayMismatch { table, history_id } => {
                write!(
                    f,
                    "live row in {table} does not match shadow data at history id {history_id}"
                )
            }
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<rusqlite::Error> for HistoryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

impl From<SchemaError> for HistoryError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}
