//! Error types for the structure model and the reconciliation planner.

/// Errors raised while building or validating a structure model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The model was frozen with `set_read_only` and can no longer change.
    #[error("Structure model is read-only")]
    ReadOnly,

    /// Two tables share a name.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// Two columns of one table share a name.
    #[error("Column '{table}.{column}' is declared more than once")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Two indexes of one table share a name.
    #[error("Index '{index}' on table '{table}' is declared more than once")]
    DuplicateIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// An index name uses a prefix reserved for key constraints.
    #[error("Index '{index}' on table '{table}' uses a reserved prefix (PK_/FK_)")]
    ReservedIndexName {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// An index names a column the table does not declare.
    #[error("Index '{index}' on table '{table}' references unknown column '{column}'")]
    UnknownIndexColumn {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
        /// Column name.
        column: String,
    },

    /// An index has no columns.
    #[error("Index '{index}' on table '{table}' has no columns")]
    EmptyIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// The primary key names a column the table does not declare.
    #[error("Primary key of table '{table}' references unknown column '{column}'")]
    UnknownKeyColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Multi-column primary keys are not implemented.
    #[error("Composite primary key ({}) on table '{table}' is not implemented", .columns.join(", "))]
    CompositePrimaryKey {
        /// Table name.
        table: String,
        /// Declared key columns.
        columns: Vec<String>,
    },
}

/// Fatal errors raised by the reconciliation planner.
///
/// Any of these aborts the pass before a single statement is executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The declared model is invalid.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model must be frozen with `set_read_only` before planning.
    #[error("Structure model must be read-only before reconciliation")]
    ModelNotFrozen,

    /// A foreign key points at a table that is neither declared nor live.
    #[error("Column '{table}.{column}' references table '{target}' which does not exist")]
    UnresolvedReference {
        /// Referencing table.
        table: String,
        /// Referencing column.
        column: String,
        /// Referenced table.
        target: String,
    },

    /// The metadata snapshot contradicts itself.
    #[error("Inconsistent metadata for table '{table}': {message}")]
    InconsistentSnapshot {
        /// Table name.
        table: String,
        /// What was contradictory.
        message: String,
    },
}
