//! Administrative session on one connection.

use converge_core::{
    ActualSchema, ActualTable, DdlFormatter, Plan, Progress, ReconcileOptions,
    ReconciliationResult, Reconciler, StructureModel, TableSpec,
};
use tracing::{debug, info};

use super::PgSchemaConnection;
use crate::connection::{SchemaConnection, SnapshotFilter};
use crate::error::{ConvergeError, Result};
use crate::executor;
use crate::temp::TempTables;

/// Structure of a table, staged or live.
#[derive(Debug, Clone, PartialEq)]
pub enum TableStructure {
    /// A temporary table staged in this session, described by its declaration.
    Staged(TableSpec),
    /// A live table read from the catalog.
    Live(ActualTable),
}

/// A session owning one connection and its staged temporary tables.
pub struct Session {
    connection: PgSchemaConnection,
    temp_tables: TempTables,
    formatter: Box<dyn DdlFormatter>,
    schema: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("formatter", &self.formatter.name())
            .field("schema", &self.schema)
            .field("temp_tables", &self.temp_tables)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(
        connection: PgSchemaConnection,
        formatter: Box<dyn DdlFormatter>,
        schema: String,
    ) -> Self {
        Self {
            connection,
            temp_tables: TempTables::new(),
            formatter,
            schema,
        }
    }

    /// Returns the formatter selected for the server.
    #[must_use]
    pub fn formatter(&self) -> &dyn DdlFormatter {
        self.formatter.as_ref()
    }

    /// Returns the connection.
    pub fn connection(&mut self) -> &mut PgSchemaConnection {
        &mut self.connection
    }

    /// Returns the staged temporary tables.
    #[must_use]
    pub const fn temp_tables(&self) -> &TempTables {
        &self.temp_tables
    }

    fn filter(&self) -> SnapshotFilter {
        SnapshotFilter::new(self.schema.as_str())
    }

    /// Creates a temporary table shaped like `spec` and returns its name.
    ///
    /// # Errors
    ///
    /// Fails for invalid declarations (composite keys included) and when
    /// the CREATE statement fails.
    pub async fn create_temp_table(&mut self, spec: &TableSpec) -> Result<String> {
        spec.validate()?;

        let mut staged = spec.clone();
        staged.name = self.temp_tables.next_name();
        staged.indexes.clear();

        let sql = self.formatter.create_table(&staged, true);
        debug!(sql = %sql, "Executing SQL");
        self.connection
            .execute_non_query(&sql)
            .await
            .map_err(|source| ConvergeError::Statement {
                sql,
                source: Box::new(source),
            })?;

        let name = staged.name.clone();
        info!(table = %name, source = %spec.name, "Temporary table created");
        self.temp_tables.register(staged);
        Ok(name)
    }

    /// Looks up a table, staged temporary tables first.
    pub async fn table_structure(&mut self, name: &str) -> Result<Option<TableStructure>> {
        if let Some(staged) = self.temp_tables.get(name) {
            return Ok(Some(TableStructure::Staged(staged.clone())));
        }
        let filter = self.filter().tables([name]);
        let mut snapshot = self.connection.read_snapshot(&filter).await?;
        Ok(snapshot.tables.remove(name).map(TableStructure::Live))
    }

    /// Reads a snapshot of the session's schema.
    pub async fn snapshot(&mut self) -> Result<ActualSchema> {
        let filter = self.filter();
        self.connection.read_snapshot(&filter).await
    }

    /// Plans a pass without executing it.
    pub async fn plan(&mut self, model: &StructureModel, options: ReconcileOptions) -> Result<Plan> {
        let snapshot = self.snapshot().await?;
        Ok(Reconciler::new(self.formatter.as_ref(), options).plan(model, &snapshot)?)
    }

    /// Runs a reconciliation pass.
    pub async fn reconcile<P: Progress + ?Sized>(
        &mut self,
        model: &StructureModel,
        options: ReconcileOptions,
        dry_run: bool,
        progress: &mut P,
    ) -> Result<ReconciliationResult> {
        let filter = self.filter();
        executor::reconcile(
            &mut self.connection,
            self.formatter.as_ref(),
            model,
            options,
            &filter,
            dry_run,
            progress,
        )
        .await
    }
}
