//! DDL executor.
//!
//! This module runs a reconciliation [`Plan`] against a connection, one
//! statement at a time and in plan order.

use converge_core::{
    DdlFormatter, Diagnostic, DiagnosticSink, Operation, Plan, Progress, ReconcileOptions,
    ReconciliationResult, Reconciler, Severity, Step, StructureModel,
};
use tracing::{debug, error, info, warn};

use crate::connection::{SchemaConnection, SnapshotFilter};
use crate::error::{ConvergeError, Result};

/// Executes reconciliation plans.
pub struct Executor<'a> {
    formatter: &'a dyn DdlFormatter,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    /// Creates an executor rendering SQL through `formatter`.
    #[must_use]
    pub fn new(formatter: &'a dyn DdlFormatter) -> Self {
        Self {
            formatter,
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is collected but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Executes `plan` on `conn`.
    ///
    /// Progress gets the phase text before each unit of table work and one
    /// increment after it.
    ///
    /// # Errors
    ///
    /// Returns [`ConvergeError::Statement`] for the first failing statement.
    /// Statements executed before it are not rolled back.
    pub async fn execute<C, P>(
        &self,
        conn: &mut C,
        plan: &Plan,
        progress: &mut P,
    ) -> Result<ReconciliationResult>
    where
        C: SchemaConnection,
        P: Progress + ?Sized,
    {
        let mut result = ReconciliationResult::default();
        progress.set_percent_max(plan.work.len());

        for work in &plan.work {
            progress.set_phase_text(&work.phase_text());
            debug!(phase = %work.phase, table = %work.table, "Reconciling");

            for step in &work.steps {
                match step {
                    Step::Apply { operation, note } => {
                        self.apply(conn, operation, &mut result).await?;
                        if let Some(note) = note {
                            info!(table = %work.table, "{note}");
                            result.diagnostics.add_info(note.as_str());
                        }
                    }
                    Step::Report(diagnostic) => {
                        log_diagnostic(&work.table, diagnostic);
                        result.diagnostics.push(diagnostic.clone());
                    }
                }
            }

            progress.inc_percent();
        }

        Ok(result)
    }

    async fn apply<C: SchemaConnection>(
        &self,
        conn: &mut C,
        operation: &Operation,
        result: &mut ReconciliationResult,
    ) -> Result<()> {
        if operation.is_data_only() && !self.dry_run {
            let probe = self.formatter.has_rows_query(operation.table());
            debug!(sql = %probe, "Checking for rows");
            let has_rows = conn
                .execute_scalar(&probe)
                .await
                .map_err(|source| statement_error(&probe, source))?;
            if has_rows.as_deref() != Some("1") {
                debug!(table = %operation.table(), "Table is empty, skipping backfill");
                return Ok(());
            }
        }

        for sql in self.formatter.render(operation) {
            if self.dry_run {
                debug!(sql = %sql, "Planned SQL");
            } else {
                debug!(sql = %sql, "Executing SQL");
                let rows = conn
                    .execute_non_query(&sql)
                    .await
                    .map_err(|source| statement_error(&sql, source))?;
                if operation.is_data_only() {
                    debug!(rows, "Rows updated");
                }
                result.modified = true;
            }
            result.statements.push(sql);
        }
        Ok(())
    }
}

fn statement_error(sql: &str, source: ConvergeError) -> ConvergeError {
    ConvergeError::Statement {
        sql: sql.to_string(),
        source: Box::new(source),
    }
}

fn log_diagnostic(table: &str, diagnostic: &Diagnostic) {
    match diagnostic.severity {
        Severity::Info => info!(table = %table, "{}", diagnostic.message),
        Severity::Warning => warn!(table = %table, "{}", diagnostic.message),
        Severity::Error => error!(table = %table, "{}", diagnostic.message),
    }
}

/// Runs one reconciliation pass: snapshot, plan, execute.
///
/// # Errors
///
/// Fails when the snapshot cannot be read, planning rejects the model, or
/// a statement fails.
pub async fn reconcile<C, P>(
    conn: &mut C,
    formatter: &dyn DdlFormatter,
    model: &StructureModel,
    options: ReconcileOptions,
    filter: &SnapshotFilter,
    dry_run: bool,
    progress: &mut P,
) -> Result<ReconciliationResult>
where
    C: SchemaConnection,
    P: Progress + ?Sized,
{
    let snapshot = conn.read_snapshot(filter).await?;
    debug!(tables = snapshot.tables.len(), "Snapshot read");

    let plan = Reconciler::new(formatter, options).plan(model, &snapshot)?;
    info!(
        operations = plan.operations().count(),
        formatter = formatter.name(),
        dry_run,
        "Plan ready"
    );

    let result = Executor::new(formatter)
        .dry_run(dry_run)
        .execute(conn, &plan, progress)
        .await?;
    info!(
        modified = result.modified,
        warnings = result.diagnostics.warnings().count(),
        errors = result.diagnostics.errors().count(),
        "Reconciliation finished"
    );
    Ok(result)
}
