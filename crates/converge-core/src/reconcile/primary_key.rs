//! Primary key reconciliation on existing tables.

use super::{PassState, Step};
use crate::error::ReconcileError;
use crate::model::TableSpec;
use crate::naming;
use crate::operation::Operation;
use crate::snapshot::{ActualConstraint, ActualTable, ConstraintKind};

fn is_conventional(constraint: &ActualConstraint, pk_name: &str, key: &str) -> bool {
    constraint.kind == ConstraintKind::PrimaryKey
        && constraint.name == pk_name
        && constraint.columns.len() == 1
        && constraint.columns[0] == key
}

/// Drops key constraints that do not match the `PK_<Table>` convention.
///
/// Runs before column changes so that a column leaving a stale key can
/// have its nullability relaxed.
pub(super) fn drop_stale(
    table: &TableSpec,
    actual: &ActualTable,
    state: &mut PassState,
    steps: &mut Vec<Step>,
) -> Result<(), ReconcileError> {
    let key = table.key_column()?.map(|c| c.name.as_str());
    let pk_name = naming::primary_key_name(&table.name);

    for constraint in &actual.constraints {
        let stale = match (constraint.kind, key) {
            (ConstraintKind::PrimaryKey, None) => true,
            (ConstraintKind::PrimaryKey, Some(key)) => !is_conventional(constraint, &pk_name, key),
            // Multi-column uniques that include the key are user-owned.
            (ConstraintKind::Unique, Some(key)) => {
                constraint.columns.len() == 1
                    && constraint.columns[0] == key
                    && constraint.name != pk_name
            }
            (ConstraintKind::Unique, None) => false,
        };
        if stale {
            steps.push(Step::noted(
                Operation::DropConstraint {
                    table: table.name.clone(),
                    name: constraint.name.clone(),
                },
                format!("Constraint {} on table {} dropped", constraint.name, table.name),
            ));
            state.record_dropped_constraint(&table.name, &constraint.name);
        }
    }
    Ok(())
}

/// Adds `PK_<Table>` when no conventional primary key survives.
pub(super) fn ensure(
    table: &TableSpec,
    actual: &ActualTable,
    state: &PassState,
    steps: &mut Vec<Step>,
) -> Result<(), ReconcileError> {
    let Some(key) = table.key_column()? else {
        return Ok(());
    };
    let pk_name = naming::primary_key_name(&table.name);
    let present = actual.constraints.iter().any(|c| {
        is_conventional(c, &pk_name, &key.name) && !state.constraint_dropped(&table.name, &c.name)
    });
    if !present {
        steps.push(Step::noted(
            Operation::AddPrimaryKey {
                table: table.name.clone(),
                column: key.name.clone(),
            },
            format!("Primary key {pk_name} on table {} created", table.name),
        ));
    }
    Ok(())
}
