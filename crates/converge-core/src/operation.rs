//! Reconciliation operations.
//!
//! Each operation is one decision of the planner. A formatter renders it
//! into one or more SQL statements; the executor runs them.

use crate::model::{ColumnSpec, DefaultValue, IndexSpec, TableSpec};
use crate::snapshot::DeleteAction;

/// A single schema change decided by the planner.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a table with all declared columns and its key.
    CreateTable {
        /// Table to create.
        table: TableSpec,
        /// Temporary tables get an unnamed inline key.
        temporary: bool,
    },
    /// Add a missing column.
    AddColumn {
        /// Table name.
        table: String,
        /// Column to add.
        column: ColumnSpec,
        /// Whether the column is the generated identity key.
        identity: bool,
    },
    /// Change the length of a sized column.
    AlterColumnType {
        /// Table name.
        table: String,
        /// Column with its new declared length.
        column: ColumnSpec,
    },
    /// Remove a column default.
    DropDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Introspected default-constraint name, on dialects that name defaults.
        constraint: Option<String>,
    },
    /// Set a column default.
    SetDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// New default.
        default: DefaultValue,
    },
    /// Replace NULLs with the default before tightening a column.
    BackfillNulls {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Value written into NULL cells.
        default: DefaultValue,
    },
    /// Change nullability.
    SetNullable {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// New nullability.
        nullable: bool,
    },
    /// Drop a key constraint.
    DropConstraint {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },
    /// Add the conventional primary key.
    AddPrimaryKey {
        /// Table name.
        table: String,
        /// Key column.
        column: String,
    },
    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },
    /// Create an index.
    CreateIndex {
        /// Table name.
        table: String,
        /// Index definition.
        index: IndexSpec,
    },
    /// Add the conventional foreign key.
    AddForeignKey {
        /// Referencing table.
        table: String,
        /// Referencing column.
        column: String,
        /// Referenced table.
        target_table: String,
        /// ON DELETE behaviour.
        on_delete: DeleteAction,
    },
}

impl Operation {
    /// Returns the table the operation touches.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. } => &table.name,
            Self::AddColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::DropDefault { table, .. }
            | Self::SetDefault { table, .. }
            | Self::BackfillNulls { table, .. }
            | Self::SetNullable { table, .. }
            | Self::DropConstraint { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropIndex { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::AddForeignKey { table, .. } => table,
        }
    }

    /// Returns whether the operation only rewrites data.
    #[must_use]
    pub const fn is_data_only(&self) -> bool {
        matches!(self, Self::BackfillNulls { .. })
    }
}
