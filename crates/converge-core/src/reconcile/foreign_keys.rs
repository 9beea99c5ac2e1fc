//! Foreign key reconciliation.
//!
//! Runs after every table of the model exists. Missing `FK_<Table>_<Column>`
//! constraints are added; existing ones are not examined.

use super::Step;
use crate::diagnostics::Diagnostic;
use crate::error::ReconcileError;
use crate::model::{ColumnSpec, DefaultValue, RefType, StructureModel, TableSpec};
use crate::naming;
use crate::operation::Operation;
use crate::snapshot::{ActualSchema, ActualTable, DeleteAction};

/// Checks that every materialized reference targets a table that will exist.
pub(super) fn check_targets(
    model: &StructureModel,
    snapshot: &ActualSchema,
) -> Result<(), ReconcileError> {
    for table in model.tables().iter().filter(|t| t.auto_create) {
        for column in &table.columns {
            let Some(target) = column.foreign_key_target() else {
                continue;
            };
            let declared = model.get_table(target).is_some_and(|t| t.auto_create);
            if !declared && !snapshot.contains(target) {
                return Err(ReconcileError::UnresolvedReference {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Maps the declared reference type to an ON DELETE action.
///
/// `Clear` on a NOT NULL column needs a default to fall back to.
fn delete_action(table: &TableSpec, column: &ColumnSpec) -> Result<DeleteAction, Diagnostic> {
    match column.ref_type {
        RefType::Disallow | RefType::Emulation => Ok(DeleteAction::NoAction),
        RefType::Delete => Ok(DeleteAction::Cascade),
        RefType::Clear if table.is_nullable(column) => Ok(DeleteAction::SetNull),
        RefType::Clear => match column.default {
            Some(ref default) if *default != DefaultValue::Null => Ok(DeleteAction::SetDefault),
            _ => Err(Diagnostic::warning(format!(
                "Field {}.{} cannot be cleared: it is NOT NULL without default; \
                 deletes of referenced rows are refused instead",
                table.name, column.name
            ))),
        },
    }
}

/// Plans the missing foreign keys of `table`.
pub(super) fn reconcile(table: &TableSpec, actual: Option<&ActualTable>, steps: &mut Vec<Step>) {
    for column in &table.columns {
        let Some(target) = column.foreign_key_target() else {
            continue;
        };
        let name = naming::foreign_key_name(&table.name, &column.name);
        if actual.and_then(|a| a.foreign_key(&name)).is_some() {
            continue;
        }

        let on_delete = delete_action(table, column).unwrap_or_else(|warning| {
            steps.push(Step::Report(warning));
            DeleteAction::NoAction
        });
        steps.push(Step::noted(
            Operation::AddForeignKey {
                table: table.name.clone(),
                column: column.name.clone(),
                target_table: target.to_string(),
                on_delete,
            },
            format!("Foreign key {name} created"),
        ));
    }
}
