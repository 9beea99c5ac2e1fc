//! Reconciliation planner.
//!
//! The [`Reconciler`] compares a frozen [`StructureModel`] with an
//! [`ActualSchema`] snapshot and decides, without touching the database,
//! which operations converge the live schema toward the model. The result
//! is a [`Plan`]: an ordered list of [`TableWork`] units grouped in three
//! phases.
//!
//! 1. [`Phase::Structure`]: create missing tables; on existing tables drop
//!    stale key constraints, reconcile columns and add the primary key.
//! 2. [`Phase::Indexes`]: sweep live user indexes, then create the
//!    declared ones that were not confirmed.
//! 3. [`Phase::ForeignKeys`]: add missing foreign keys, once every table
//!    exists.
//!
//! Mismatches that would lose data are never planned as operations; they
//! become [`Step::Report`] diagnostics instead.

mod columns;
mod foreign_keys;
mod indexes;
mod primary_key;

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ReconcileError;
use crate::format::DdlFormatter;
use crate::model::{StructureModel, TableSpec};
use crate::operation::Operation;
use crate::snapshot::{ActualIndex, ActualSchema, ActualTable};

/// Options of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Drop live user indexes the model does not declare.
    pub drop_unused_indexes: bool,
    /// Reconcile foreign keys.
    pub foreign_keys: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            drop_unused_indexes: false,
            foreign_keys: true,
        }
    }
}

impl ReconcileOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether undeclared indexes are dropped.
    #[must_use]
    pub const fn drop_unused_indexes(mut self, enabled: bool) -> Self {
        self.drop_unused_indexes = enabled;
        self
    }

    /// Sets whether foreign keys are reconciled.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

/// Phase of a unit of table work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Tables, columns and primary keys.
    Structure,
    /// User indexes.
    Indexes,
    /// Foreign keys.
    ForeignKeys,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structure => "Checking structure",
            Self::Indexes => "Checking indexes",
            Self::ForeignKeys => "Checking foreign keys",
        })
    }
}

/// One planned step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Execute an operation; the note, if any, is recorded as info.
    Apply {
        /// The operation.
        operation: Operation,
        /// Info message describing the change.
        note: Option<String>,
    },
    /// Record a diagnostic without touching the database.
    Report(Diagnostic),
}

impl Step {
    pub(crate) const fn silent(operation: Operation) -> Self {
        Self::Apply {
            operation,
            note: None,
        }
    }

    pub(crate) fn noted(operation: Operation, note: impl Into<String>) -> Self {
        Self::Apply {
            operation,
            note: Some(note.into()),
        }
    }
}

/// Steps for one table in one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct TableWork {
    /// Phase the steps belong to.
    pub phase: Phase,
    /// Table the steps touch.
    pub table: String,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl TableWork {
    fn new(phase: Phase, table: &str) -> Self {
        Self {
            phase,
            table: table.to_string(),
            steps: Vec::new(),
        }
    }

    /// Text shown by progress sinks while this unit runs.
    #[must_use]
    pub fn phase_text(&self) -> String {
        format!("{}: {}", self.phase, self.table)
    }
}

/// Ordered reconciliation plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Units of work in execution order.
    pub work: Vec<TableWork>,
}

impl Plan {
    /// Returns whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations().next().is_none()
    }

    /// All planned operations, in order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.work.iter().flat_map(|w| &w.steps).filter_map(|s| match s {
            Step::Apply { operation, .. } => Some(operation),
            Step::Report(_) => None,
        })
    }

    /// All diagnostics reported without an operation, in order.
    pub fn reports(&self) -> impl Iterator<Item = &Diagnostic> {
        self.work.iter().flat_map(|w| &w.steps).filter_map(|s| match s {
            Step::Report(diagnostic) => Some(diagnostic),
            Step::Apply { .. } => None,
        })
    }
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Whether any statement changed the database.
    pub modified: bool,
    /// Everything reported during the pass.
    pub diagnostics: Diagnostics,
    /// SQL statements in execution order; in dry-run mode, those that would run.
    pub statements: Vec<String>,
}

/// Per-pass bookkeeping shared by the phases.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    /// User indexes dropped as a side effect of a column change, per table.
    purged: HashMap<String, Vec<ActualIndex>>,
    /// Key constraints dropped during the structure phase, per table.
    dropped_constraints: HashMap<String, HashSet<String>>,
}

impl PassState {
    /// Drops every user index of `actual` once per pass.
    pub(crate) fn purge(&mut self, actual: &ActualTable, steps: &mut Vec<Step>) {
        if self.purged.contains_key(&actual.name) {
            return;
        }
        let indexes: Vec<ActualIndex> = actual.user_indexes().cloned().collect();
        for index in &indexes {
            steps.push(Step::silent(Operation::DropIndex {
                table: actual.name.clone(),
                name: index.name.clone(),
            }));
        }
        self.purged.insert(actual.name.clone(), indexes);
    }

    pub(crate) fn purged(&self, table: &str) -> &[ActualIndex] {
        self.purged.get(table).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn record_dropped_constraint(&mut self, table: &str, name: &str) {
        self.dropped_constraints
            .entry(table.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub(crate) fn constraint_dropped(&self, table: &str, name: &str) -> bool {
        self.dropped_constraints
            .get(table)
            .is_some_and(|names| names.contains(name))
    }
}

/// Pure reconciliation planner.
pub struct Reconciler<'a> {
    formatter: &'a dyn DdlFormatter,
    options: ReconcileOptions,
}

impl fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("formatter", &self.formatter.name())
            .field("options", &self.options)
            .finish()
    }
}

impl<'a> Reconciler<'a> {
    /// Creates a planner rendering types through `formatter`.
    #[must_use]
    pub fn new(formatter: &'a dyn DdlFormatter, options: ReconcileOptions) -> Self {
        Self { formatter, options }
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Plans the operations that converge `snapshot` toward `model`.
    ///
    /// # Errors
    ///
    /// Fails before planning anything when the model is not frozen or
    /// invalid, a foreign key targets a table that will not exist, or the
    /// snapshot contradicts itself.
    pub fn plan(
        &self,
        model: &StructureModel,
        snapshot: &ActualSchema,
    ) -> Result<Plan, ReconcileError> {
        if !model.is_read_only() {
            return Err(ReconcileError::ModelNotFrozen);
        }
        model.validate()?;
        check_snapshot(model, snapshot)?;
        if self.options.foreign_keys {
            foreign_keys::check_targets(model, snapshot)?;
        }

        let managed: Vec<&TableSpec> = model.tables().iter().filter(|t| t.auto_create).collect();
        let mut state = PassState::default();
        let mut plan = Plan::default();

        for table in &managed {
            let mut work = TableWork::new(Phase::Structure, &table.name);
            match snapshot.table(&table.name) {
                None => work.steps.push(Step::noted(
                    Operation::CreateTable {
                        table: (*table).clone(),
                        temporary: false,
                    },
                    format!("Table {} created", table.name),
                )),
                Some(actual) => {
                    primary_key::drop_stale(table, actual, &mut state, &mut work.steps)?;
                    columns::reconcile(self.formatter, table, actual, &mut state, &mut work.steps);
                    primary_key::ensure(table, actual, &state, &mut work.steps)?;
                }
            }
            plan.work.push(work);
        }

        for table in &managed {
            let mut work = TableWork::new(Phase::Indexes, &table.name);
            indexes::reconcile(
                &self.options,
                table,
                snapshot.table(&table.name),
                &state,
                &mut work.steps,
            );
            plan.work.push(work);
        }

        if self.options.foreign_keys {
            for table in &managed {
                let mut work = TableWork::new(Phase::ForeignKeys, &table.name);
                foreign_keys::reconcile(table, snapshot.table(&table.name), &mut work.steps);
                plan.work.push(work);
            }
        }

        Ok(plan)
    }
}

/// Rejects snapshots whose key constraints or indexes name missing columns.
fn check_snapshot(model: &StructureModel, snapshot: &ActualSchema) -> Result<(), ReconcileError> {
    for table in model.tables().iter().filter(|t| t.auto_create) {
        let Some(actual) = snapshot.table(&table.name) else {
            continue;
        };
        let inconsistent = |message: String| ReconcileError::InconsistentSnapshot {
            table: table.name.clone(),
            message,
        };
        if actual.name != table.name {
            return Err(inconsistent(format!("listed under the name '{}'", actual.name)));
        }
        let mut seen = HashSet::new();
        for column in &actual.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(inconsistent(format!("column '{}' reported twice", column.name)));
            }
        }
        for constraint in &actual.constraints {
            if constraint.columns.is_empty() {
                return Err(inconsistent(format!("constraint '{}' has no columns", constraint.name)));
            }
            if let Some(missing) = constraint.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(inconsistent(format!(
                    "constraint '{}' references unknown column '{missing}'",
                    constraint.name
                )));
            }
        }
        for index in actual.user_indexes() {
            if let Some(missing) = index.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(inconsistent(format!(
                    "index '{}' references unknown column '{missing}'",
                    index.name
                )));
            }
        }
    }
    Ok(())
}
