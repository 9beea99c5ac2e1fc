//! Structure model types.
//!
//! These types describe the desired database structure: tables, their
//! columns, the single-column primary key, user indexes and foreign-key
//! references. A model is built once, frozen with
//! [`StructureModel::set_read_only`], and then only read by the planner.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::naming;

/// Abstract column types understood by every formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Variable-length character string, optionally bounded by `max_length`.
    String,
    /// 32-bit integer.
    Int,
    /// Single-precision floating point.
    Float,
    /// Double-precision floating point.
    Double,
    /// Exact decimal number.
    Decimal,
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// UUID.
    Guid,
    /// Unbounded text.
    Memo,
    /// XML document.
    Xml,
    /// Binary data.
    Binary,
}

impl ColumnType {
    /// Returns whether the type carries a maximum length.
    #[must_use]
    pub const fn is_sized(self) -> bool {
        matches!(self, Self::String)
    }

    /// Returns whether a key column of this type is generated by the server.
    #[must_use]
    pub const fn supports_identity(self) -> bool {
        matches!(self, Self::Int)
    }
}

/// How a reference to a master table behaves when the master row is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefType {
    /// Deleting a referenced row is refused.
    #[default]
    Disallow,
    /// Referencing rows are deleted with the master row.
    Delete,
    /// Referencing values are cleared.
    Clear,
    /// Integrity is maintained by the application; no database constraint.
    Emulation,
}

impl RefType {
    /// Returns whether this reference is materialized as a database constraint.
    #[must_use]
    pub const fn is_materialized(self) -> bool {
        !matches!(self, Self::Emulation)
    }
}

/// Declared default of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Integer(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Date literal.
    Date(NaiveDate),
    /// Timestamp literal.
    DateTime(NaiveDateTime),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

/// Declared column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Abstract type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Maximum length for sized types; `None` means unbounded.
    #[serde(default)]
    pub max_length: Option<u32>,
    /// Whether the column allows NULL values.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Lower numeric bound. Informational only.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Upper numeric bound. Informational only.
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Default value.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Referenced master table, when the column is a foreign key.
    #[serde(default)]
    pub master_table: Option<String>,
    /// Delete behaviour of the reference.
    #[serde(default)]
    pub ref_type: RefType,
}

const fn default_true() -> bool {
    true
}

impl ColumnSpec {
    /// Creates a nullable column without default.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            max_length: None,
            nullable: true,
            min_value: None,
            max_value: None,
            default: None,
            master_table: None,
            ref_type: RefType::Disallow,
        }
    }

    /// Sets the maximum length.
    #[must_use]
    pub const fn max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the informational numeric bounds.
    #[must_use]
    pub const fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Declares the column as a reference to `table`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, ref_type: RefType) -> Self {
        self.master_table = Some(table.into());
        self.ref_type = ref_type;
        self
    }

    /// Returns the referenced table if the reference becomes a database constraint.
    #[must_use]
    pub fn foreign_key_target(&self) -> Option<&str> {
        if self.ref_type.is_materialized() {
            self.master_table.as_deref()
        } else {
            None
        }
    }
}

/// Declared user index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name. Must not start with `PK_` or `FK_`.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Declared table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
    /// Primary key column names. At most one is supported.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// User indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    /// Tables with this flag cleared are never created or altered.
    #[serde(default = "default_true")]
    pub auto_create: bool,
}

impl TableSpec {
    /// Creates an empty auto-created table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            auto_create: true,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a primary key column.
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key.push(column.into());
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Sets the auto-create flag.
    #[must_use]
    pub const fn auto_create(mut self, enabled: bool) -> Self {
        self.auto_create = enabled;
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns the key column: the first declared column matching the primary key.
    ///
    /// # Errors
    ///
    /// Fails for composite keys and for keys naming an undeclared column.
    pub fn key_column(&self) -> Result<Option<&ColumnSpec>, ModelError> {
        match self.primary_key.as_slice() {
            [] => Ok(None),
            [key] => self
                .get_column(key)
                .map(Some)
                .ok_or_else(|| ModelError::UnknownKeyColumn {
                    table: self.name.clone(),
                    column: key.clone(),
                }),
            columns => Err(ModelError::CompositePrimaryKey {
                table: self.name.clone(),
                columns: columns.to_vec(),
            }),
        }
    }

    /// Returns whether `column` is the generated identity key of this table.
    #[must_use]
    pub fn is_identity(&self, column: &ColumnSpec) -> bool {
        column.column_type.supports_identity()
            && self.primary_key.len() == 1
            && self.primary_key[0] == column.name
    }

    /// Effective nullability: the key column is never nullable.
    #[must_use]
    pub fn is_nullable(&self, column: &ColumnSpec) -> bool {
        column.nullable && !self.primary_key.contains(&column.name)
    }

    /// Checks the table's internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ModelError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        self.key_column()?;

        let mut seen = HashSet::new();
        for index in &self.indexes {
            if !seen.insert(index.name.as_str()) {
                return Err(ModelError::DuplicateIndex {
                    table: self.name.clone(),
                    index: index.name.clone(),
                });
            }
            if naming::is_reserved(&index.name) {
                return Err(ModelError::ReservedIndexName {
                    table: self.name.clone(),
                    index: index.name.clone(),
                });
            }
            if index.columns.is_empty() {
                return Err(ModelError::EmptyIndex {
                    table: self.name.clone(),
                    index: index.name.clone(),
                });
            }
            if let Some(missing) = index.columns.iter().find(|c| self.get_column(c).is_none()) {
                return Err(ModelError::UnknownIndexColumn {
                    table: self.name.clone(),
                    index: index.name.clone(),
                    column: missing.clone(),
                });
            }
        }

        Ok(())
    }
}

/// The complete declared model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureModel {
    tables: Vec<TableSpec>,
    #[serde(skip)]
    read_only: bool,
}

impl StructureModel {
    /// Creates an empty, writable model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    ///
    /// # Errors
    ///
    /// Fails once the model is read-only.
    pub fn add_table(&mut self, table: TableSpec) -> Result<(), ModelError> {
        if self.read_only {
            return Err(ModelError::ReadOnly);
        }
        self.tables.push(table);
        Ok(())
    }

    /// Adds a table, builder style.
    ///
    /// Meant for assembling a model before it is frozen. On a read-only
    /// model this panics in debug builds and leaves the model unchanged
    /// otherwise; use [`Self::try_table`] or [`Self::add_table`] there.
    #[must_use]
    pub fn table(mut self, table: TableSpec) -> Self {
        debug_assert!(!self.read_only, "table added to a read-only model");
        if !self.read_only {
            self.tables.push(table);
        }
        self
    }

    /// Adds a table, builder style, failing on a read-only model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ReadOnly`] once the model is frozen.
    pub fn try_table(mut self, table: TableSpec) -> Result<Self, ModelError> {
        self.add_table(table)?;
        Ok(self)
    }

    /// Validates the model and freezes it.
    ///
    /// # Errors
    ///
    /// Returns the first validation problem; the model stays writable then.
    pub fn set_read_only(&mut self) -> Result<(), ModelError> {
        self.validate()?;
        self.read_only = true;
        Ok(())
    }

    /// Returns whether the model has been frozen.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Declared tables in order.
    #[must_use]
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Validates every table and checks table names are unique.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(ModelError::DuplicateTable(table.name.clone()));
            }
            table.validate()?;
        }
        Ok(())
    }
}
