//! Column reconciliation on existing tables.
//!
//! Per column the order is fixed: type, length, default, nullability.
//! A default is always in place before the column is tightened to NOT
//! NULL, and NULL cells are backfilled before the constraint is set.

use super::{PassState, Step};
use crate::diagnostics::Diagnostic;
use crate::format::DdlFormatter;
use crate::model::{ColumnSpec, DefaultValue, TableSpec};
use crate::operation::Operation;
use crate::snapshot::{ActualColumn, ActualTable};

fn describe_length(length: Option<u32>) -> String {
    length.map_or_else(|| "unbounded".to_string(), |n| n.to_string())
}

/// Reconciles every declared column of `table` against `actual`.
pub(super) fn reconcile(
    formatter: &dyn DdlFormatter,
    table: &TableSpec,
    actual: &ActualTable,
    state: &mut PassState,
    steps: &mut Vec<Step>,
) {
    for column in &table.columns {
        match actual.column(&column.name) {
            None => add_column(table, column, steps),
            Some(live) => {
                if !formatter.same_type(column.column_type, &live.native_type) {
                    steps.push(Step::Report(Diagnostic::error(format!(
                        "Field {}.{} has type {}, expected {}",
                        table.name,
                        column.name,
                        live.native_type,
                        formatter.canonical_type(column.column_type)
                    ))));
                    continue;
                }
                if column.column_type.is_sized() {
                    reconcile_length(table, column, actual, live, state, steps);
                }
                if table.is_identity(column) {
                    reconcile_identity_default(formatter, table, column, live, steps);
                } else {
                    reconcile_default(formatter, table, column, live, steps);
                }
                reconcile_nullable(table, column, actual, live, state, steps);
            }
        }
    }
}

fn add_column(table: &TableSpec, column: &ColumnSpec, steps: &mut Vec<Step>) {
    let mut column = column.clone();
    column.nullable = table.is_nullable(&column);
    let note = format!("Field {}.{} added", table.name, column.name);
    steps.push(Step::noted(
        Operation::AddColumn {
            table: table.name.clone(),
            identity: table.is_identity(&column),
            column,
        },
        note,
    ));
}

fn reconcile_length(
    table: &TableSpec,
    column: &ColumnSpec,
    actual: &ActualTable,
    live: &ActualColumn,
    state: &mut PassState,
    steps: &mut Vec<Step>,
) {
    let declared = column.max_length;
    let current = live.max_length;
    let widen = match (declared, current) {
        (Some(d), Some(c)) if d == c => return,
        (None, None) => return,
        (Some(d), Some(c)) => d > c,
        (None, Some(_)) => true,
        (Some(_), None) => false,
    };

    if widen {
        state.purge(actual, steps);
        steps.push(Step::noted(
            Operation::AlterColumnType {
                table: table.name.clone(),
                column: column.clone(),
            },
            format!(
                "Field {}.{} length changed from {} to {}",
                table.name,
                column.name,
                describe_length(current),
                describe_length(declared)
            ),
        ));
    } else {
        steps.push(Step::Report(Diagnostic::warning(format!(
            "Field {}.{} has length {}, declared {}; shrinking is not attempted",
            table.name,
            column.name,
            describe_length(current),
            describe_length(declared)
        ))));
    }
}

fn reconcile_default(
    formatter: &dyn DdlFormatter,
    table: &TableSpec,
    column: &ColumnSpec,
    live: &ActualColumn,
    steps: &mut Vec<Step>,
) {
    let declared = column.default.as_ref().filter(|d| **d != DefaultValue::Null);
    if formatter.same_default(column.column_type, declared, live.default.as_deref()) {
        return;
    }

    if live.default.is_some() {
        let drop = Operation::DropDefault {
            table: table.name.clone(),
            column: column.name.clone(),
            constraint: live.default_constraint.clone(),
        };
        if declared.is_some() {
            steps.push(Step::silent(drop));
        } else {
            steps.push(Step::noted(
                drop,
                format!("Default of field {}.{} removed", table.name, column.name),
            ));
        }
    }

    if let Some(default) = declared {
        steps.push(Step::noted(
            Operation::SetDefault {
                table: table.name.clone(),
                column: column.name.clone(),
                default: default.clone(),
            },
            format!(
                "Default of field {}.{} set to {}",
                table.name,
                column.name,
                formatter.default_literal(default)
            ),
        ));
    }
}

/// The server owns the identity key's default; only a default it did not
/// generate is removed.
fn reconcile_identity_default(
    formatter: &dyn DdlFormatter,
    table: &TableSpec,
    column: &ColumnSpec,
    live: &ActualColumn,
    steps: &mut Vec<Step>,
) {
    let Some(expression) = live.default.as_deref() else {
        return;
    };
    if formatter.is_identity_default(expression) {
        return;
    }
    steps.push(Step::noted(
        Operation::DropDefault {
            table: table.name.clone(),
            column: column.name.clone(),
            constraint: live.default_constraint.clone(),
        },
        format!("Default of field {}.{} removed", table.name, column.name),
    ));
}

fn reconcile_nullable(
    table: &TableSpec,
    column: &ColumnSpec,
    actual: &ActualTable,
    live: &ActualColumn,
    state: &mut PassState,
    steps: &mut Vec<Step>,
) {
    let nullable = table.is_nullable(column);
    if nullable == live.nullable {
        return;
    }

    if !nullable {
        if let Some(default) = column.default.as_ref().filter(|d| **d != DefaultValue::Null) {
            steps.push(Step::silent(Operation::BackfillNulls {
                table: table.name.clone(),
                column: column.name.clone(),
                default: default.clone(),
            }));
        }
    }
    state.purge(actual, steps);
    steps.push(Step::noted(
        Operation::SetNullable {
            table: table.name.clone(),
            column: column.name.clone(),
            nullable,
        },
        format!(
            "Field {}.{} changed to {}",
            table.name,
            column.name,
            if nullable { "NULL" } else { "NOT NULL" }
        ),
    ));
}
