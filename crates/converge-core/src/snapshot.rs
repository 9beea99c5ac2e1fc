//! Live schema snapshot types.
//!
//! A snapshot is what the metadata reader found in the database at the
//! start of a pass. It is never written back and never mutated by the
//! planner; it is only compared against the declared model.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::naming;

static SIZE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("size suffix pattern is valid"));

/// Drops parenthesized size suffixes from a native type name and collapses
/// whitespace, so that type identity and length compare independently.
///
/// `"NCHAR(10)"` becomes `"NCHAR"`, `"timestamp(3) without time zone"`
/// becomes `"timestamp without time zone"`.
#[must_use]
pub fn normalize_type_name(native: &str) -> String {
    let stripped = SIZE_SUFFIX.replace_all(native, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A live column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualColumn {
    /// Column name.
    pub name: String,
    /// Normalized native type name.
    pub native_type: String,
    /// Maximum length for sized types; `None` means unbounded.
    pub max_length: Option<u32>,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default expression text as stored by the server.
    pub default: Option<String>,
    /// Name of the default constraint object, on dialects that have one.
    pub default_constraint: Option<String>,
}

impl ActualColumn {
    /// Creates a nullable column, normalizing `native_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, native_type: &str) -> Self {
        Self {
            name: name.into(),
            native_type: normalize_type_name(native_type),
            max_length: None,
            nullable: true,
            default: None,
            default_constraint: None,
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

    /// Sets the default expression.
    #[must_use]
    pub fn default(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }
}

/// A live index, including constraint-backed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualIndex {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Whether the index backs a primary-key or unique constraint.
    pub constraint_backed: bool,
}

impl ActualIndex {
    /// Returns whether the index belongs to the user, as opposed to a key constraint.
    #[must_use]
    pub fn is_user_index(&self) -> bool {
        !self.constraint_backed && !naming::is_reserved(&self.name)
    }
}

/// Kind of a key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// PRIMARY KEY.
    PrimaryKey,
    /// UNIQUE.
    Unique,
}

/// A live primary-key or unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualConstraint {
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Constrained columns, in order.
    pub columns: Vec<String>,
}

/// ON DELETE behaviour of a live foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeleteAction {
    /// No action.
    #[default]
    NoAction,
    /// Restrict.
    Restrict,
    /// Cascade the delete.
    Cascade,
    /// Set the column to NULL.
    SetNull,
    /// Set the column to its default.
    SetDefault,
}

impl DeleteAction {
    /// Decodes a catalog action code (`a`, `r`, `c`, `n`, `d`).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::NoAction),
            "r" => Some(Self::Restrict),
            "c" => Some(Self::Cascade),
            "n" => Some(Self::SetNull),
            "d" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A live foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualForeignKey {
    /// Constraint name.
    pub name: String,
    /// Owning column.
    pub column: String,
    /// Referenced table.
    pub target_table: String,
    /// ON DELETE behaviour.
    pub on_delete: DeleteAction,
}

/// A live table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualTable {
    /// Table name.
    pub name: String,
    /// Columns in ordinal order.
    pub columns: Vec<ActualColumn>,
    /// Indexes, including constraint-backed ones.
    pub indexes: Vec<ActualIndex>,
    /// Primary-key and unique constraints.
    pub constraints: Vec<ActualConstraint>,
    /// Foreign keys owned by this table.
    pub foreign_keys: Vec<ActualForeignKey>,
}

impl ActualTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ActualColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&ActualIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Looks up a foreign key by name.
    #[must_use]
    pub fn foreign_key(&self, name: &str) -> Option<&ActualForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    /// Indexes owned by the user: no reserved prefix, not backing a constraint.
    pub fn user_indexes(&self) -> impl Iterator<Item = &ActualIndex> {
        self.indexes.iter().filter(|i| i.is_user_index())
    }
}

/// Everything the metadata reader found, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualSchema {
    /// Tables keyed by name, sorted for deterministic iteration.
    pub tables: BTreeMap<String, ActualTable>,
}

impl ActualSchema {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    pub fn add_table(&mut self, table: ActualTable) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Adds a table, builder style.
    #[must_use]
    pub fn with_table(mut self, table: ActualTable) -> Self {
        self.add_table(table);
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&ActualTable> {
        self.tables.get(name)
    }

    /// Returns whether a table exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}
