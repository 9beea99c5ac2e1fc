//! User index reconciliation.
//!
//! Two passes: the sweep walks live user indexes and marks declared ones
//! that already match as good; the second pass creates every declared
//! index not marked. Indexes purged during the structure phase are
//! re-created here so a column change never loses one.

use std::collections::HashSet;

use super::{PassState, ReconcileOptions, Step};
use crate::diagnostics::Diagnostic;
use crate::model::{IndexSpec, TableSpec};
use crate::operation::Operation;
use crate::snapshot::{ActualIndex, ActualTable};

fn matches_declared(declared: &IndexSpec, actual: &ActualIndex) -> bool {
    declared.columns == actual.columns && declared.unique == actual.unique
}

fn create(table: &str, index: IndexSpec, verb: &str) -> Step {
    let note = format!("Index {} on table {table} {verb}", index.name);
    Step::noted(
        Operation::CreateIndex {
            table: table.to_string(),
            index,
        },
        note,
    )
}

/// Plans index changes for `table`; `actual` is `None` for a table created
/// in this pass.
pub(super) fn reconcile(
    options: &ReconcileOptions,
    table: &TableSpec,
    actual: Option<&ActualTable>,
    state: &PassState,
    steps: &mut Vec<Step>,
) {
    let purged = state.purged(&table.name);
    let mut good: HashSet<&str> = HashSet::new();

    if let Some(actual) = actual {
        for index in actual.user_indexes() {
            if purged.iter().any(|p| p.name == index.name) {
                continue;
            }
            match table.get_index(&index.name) {
                None if options.drop_unused_indexes => steps.push(Step::noted(
                    Operation::DropIndex {
                        table: table.name.clone(),
                        name: index.name.clone(),
                    },
                    format!("Index {} on table {} dropped", index.name, table.name),
                )),
                None => steps.push(Step::Report(Diagnostic::warning(format!(
                    "Index {} on table {} is not declared",
                    index.name, table.name
                )))),
                Some(declared) if matches_declared(declared, index) => {
                    good.insert(declared.name.as_str());
                }
                Some(declared) => {
                    steps.push(Step::silent(Operation::DropIndex {
                        table: table.name.clone(),
                        name: index.name.clone(),
                    }));
                    steps.push(create(&table.name, declared.clone(), "recreated"));
                    good.insert(declared.name.as_str());
                }
            }
        }
    }

    for index in purged {
        match table.get_index(&index.name) {
            Some(declared) => {
                steps.push(create(&table.name, declared.clone(), "recreated"));
                good.insert(declared.name.as_str());
            }
            None if options.drop_unused_indexes => {
                steps.push(Step::Report(Diagnostic::info(format!(
                    "Index {} on table {} dropped",
                    index.name, table.name
                ))));
            }
            None => {
                let restored = IndexSpec {
                    name: index.name.clone(),
                    columns: index.columns.clone(),
                    unique: index.unique,
                };
                steps.push(create(&table.name, restored, "recreated"));
            }
        }
    }

    for declared in &table.indexes {
        if good.contains(declared.name.as_str()) {
            continue;
        }
        let taken = actual.and_then(|a| a.index(&declared.name)).is_some_and(|i| {
            i.constraint_backed && !purged.iter().any(|p| p.name == i.name)
        });
        if taken {
            steps.push(Step::Report(Diagnostic::warning(format!(
                "Index {} on table {} collides with a constraint of the same name",
                declared.name, table.name
            ))));
            continue;
        }
        steps.push(create(&table.name, declared.clone(), "created"));
    }
}
