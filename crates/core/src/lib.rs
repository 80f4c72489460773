#![forbid(unsafe_code)]

mod schema;

pub use schema::{ColumnDef, ColumnType, ForeignKey, SchemaError, TableSchema};

pub mod value {
    /// One cell of a tracked row. Mirrors SQLite's storage classes.
    #[derive(Clone, Debug, PartialEq)]
    pub enum Value {
        Null,
        Integer(i64),
        Real(f64),
        Text(String),
        Blob(Vec<u8>),
    }

    impl Value {
        pub fn text(value: impl Into<String>) -> Self {
            Value::Text(value.into())
        }

        pub fn is_null(&self) -> bool {
            matches!(self, Value::Null)
        }

        pub fn as_integer(&self) -> Option<i64> {
            match self {
                Value::Integer(value) => Some(*value),
                _ => None,
            }
        }

        pub fn as_text(&self) -> Option<&str> {
            match self {
                Value::Text(value) => Some(value.as_str()),
                _ => None,
            }
        }
    }

    impl std::fmt::Display for Value {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Value::Null => f.write_str("null"),
                Value::Integer(value) => write!(f, "{value}"),
                Value::Real(value) => write!(f, "{value}"),
                Value::Text(value) => f.write_str(value),
                Value::Blob(bytes) => write!(f, "<blob {} bytes>", bytes.len()),
            }
        }
    }

    impl From<i64> for Value {
        fn from(value: i64) -> Self {
            Value::Integer(value)
        }
    }

    impl From<f64> for Value {
        fn from(value: f64) -> Self {
            Value::Real(value)
        }
    }

    impl From<&str> for Value {
        fn from(value: &str) -> Self {
            Value::Text(value.to_string())
        }
    }

    impl From<String> for Value {
        fn from(value: String) -> Self {
            Value::Text(value)
        }
    }
}

pub mod history {
    /// What a single log entry records: a row mutation, or a bracket
    /// marker delimiting a compound operation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Command {
        Insert,
        Delete,
        Update,
        Push,
        Pop,
    }

    impl Command {
        pub fn as_str(self) -> &'static str {
            match self {
                Command::Insert => "insert",
                Command::Delete => "delete",
                Command::Update => "update",
                Command::Push => "push",
                Command::Pop => "pop",
            }
        }

        pub fn is_marker(self) -> bool {
            matches!(self, Command::Push | Command::Pop)
        }
    }

    /// One record of the append-only history log. Ids are assigned
    /// gapless from 1; `range_id` cross-references a Push with its Pop
    /// once the bracket closes.
    #[derive(Clone, Debug, PartialEq)]
    pub struct HistoryEntry {
        pub history_id: i64,
        pub command: Command,
        pub table_name: Option<String>,
        pub column_name: Option<String>,
        pub range_id: Option<i64>,
        pub message: Option<String>,
    }

    impl HistoryEntry {
        pub fn marker(history_id: i64, command: Command, message: Option<String>) -> Self {
            Self {
                history_id,
                command,
                table_name: None,
                column_name: None,
                range_id: None,
                message,
            }
        }

        pub fn mutation(
            history_id: i64,
            command: Command,
            table_name: &str,
            column_name: Option<&str>,
        ) -> Self {
            Self {
                history_id,
                command,
                table_name: Some(table_name.to_string()),
                column_name: column_name.map(str::to_string),
                range_id: None,
                message: None,
            }
        }
    }
}

pub use history::{Command, HistoryEntry};
pub use value::Value;
