#![forbid(unsafe_code)]

/// Declared type of a tracked column, mapped 1:1 onto SQLite types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    ty: ColumnType,
    primary_key: bool,
    not_null: bool,
    references: Option<ForeignKey>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            not_null: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ColumnType {
        self.ty
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.references.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    EmptyTableName,
    NoColumns,
    NoPrimaryKey,
    DuplicateColumn(String),
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTableName => f.write_str("table name must not be empty"),
            Self::NoColumns => f.write_str("table must declare at least one column"),
            Self::NoPrimaryKey => f.write_str("table must declare at least one primary key column"),
            Self::DuplicateColumn(name) => write!(f, "duplicate column name: {name}"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Identity of a tracked table: name plus ordered column list. Fixed
/// at registration time, immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn try_new(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }
        if columns.is_empty() {
            return Err(SchemaError::NoColumns);
        }
        if !columns.iter().any(ColumnDef::is_primary_key) {
            return Err(SchemaError::NoPrimaryKey);
        }
        for (index, column) in columns.iter().enumerate() {
            if columns[..index].iter().any(|other| other.name() == column.name()) {
                return Err(SchemaError::DuplicateColumn(column.name().to_string()));
            }
        }
        Ok(Self { name, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|column| column.is_primary_key())
    }

    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|column| !column.is_primary_key())
    }

    pub fn key_len(&self) -> usize {
        self.key_columns().count()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }
}
