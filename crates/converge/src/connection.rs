//! The narrow database services the executor consumes.

use std::future::Future;

use converge_core::ActualSchema;

use crate::error::Result;

/// Scope of a metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFilter {
    /// Schema (namespace) to read.
    pub schema: String,
    /// Restrict the snapshot to these tables; `None` reads every table.
    pub tables: Option<Vec<String>>,
}

impl Default for SnapshotFilter {
    fn default() -> Self {
        Self::new("public")
    }
}

impl SnapshotFilter {
    /// Reads every table of `schema`.
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: None,
        }
    }

    /// Restricts the snapshot to the given tables.
    #[must_use]
    pub fn tables<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    /// Returns whether `table` is in scope.
    #[must_use]
    pub fn includes(&self, table: &str) -> bool {
        self.tables
            .as_ref()
            .map_or(true, |tables| tables.iter().any(|t| t == table))
    }
}

/// Statement execution and metadata access on one connection.
///
/// All DDL is passed as literal SQL text; nothing here binds identifiers.
pub trait SchemaConnection: Send {
    /// Executes a statement and returns the number of affected rows.
    fn execute_non_query(&mut self, sql: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Executes a query and returns the first column of the first row as text.
    fn execute_scalar(&mut self, sql: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Reads tables, columns, indexes, key constraints and foreign keys.
    fn read_snapshot(
        &mut self,
        filter: &SnapshotFilter,
    ) -> impl Future<Output = Result<ActualSchema>> + Send;
}
