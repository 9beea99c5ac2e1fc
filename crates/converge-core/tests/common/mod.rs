#![allow(dead_code)]

use std::collections::HashSet;

use converge_core::prelude::*;
use converge_core::{naming, ActualColumn, ActualConstraint, ActualForeignKey, ActualIndex, ConstraintKind};

/// In-memory database: a snapshot plus the columns known to hold NULLs.
///
/// Applying an operation mutates the snapshot the way PostgreSQL would and
/// panics where PostgreSQL would reject the statement.
pub struct Simulated {
    pub schema: ActualSchema,
    pub nulls: HashSet<(String, String)>,
    formatter: PostgresFormatter,
}

impl Simulated {
    pub fn new(schema: ActualSchema) -> Self {
        Self {
            schema,
            nulls: HashSet::new(),
            formatter: PostgresFormatter::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(ActualSchema::new())
    }

    /// Marks `table.column` as holding at least one NULL.
    pub fn with_nulls(mut self, table: &str, column: &str) -> Self {
        self.nulls.insert((table.to_string(), column.to_string()));
        self
    }

    pub fn plan(&self, model: &StructureModel, options: ReconcileOptions) -> Plan {
        Reconciler::new(&self.formatter, options)
            .plan(model, &self.schema)
            .unwrap_or_else(|e| panic!("planning failed: {e}"))
    }

    pub fn apply(&mut self, plan: &Plan) {
        for operation in plan.operations() {
            self.apply_operation(operation);
        }
    }

    fn table_mut(&mut self, name: &str) -> &mut ActualTable {
        self.schema
            .tables
            .get_mut(name)
            .unwrap_or_else(|| panic!("table {name} does not exist"))
    }

    fn column_mut<'a>(table: &'a mut ActualTable, name: &str) -> &'a mut ActualColumn {
        table
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("column {name} does not exist"))
    }

    fn live_column(&self, spec: &TableSpec, column: &ColumnSpec) -> ActualColumn {
        let mut live = ActualColumn::new(&column.name, self.formatter.canonical_type(column.column_type));
        live.max_length = column.max_length;
        live.nullable = spec.is_nullable(column);
        if !spec.is_identity(column) {
            live.default = column.default.as_ref().map(|d| self.formatter.default_literal(d));
        }
        live
    }

    fn add_primary_key(table: &mut ActualTable, column: &str) {
        let name = naming::primary_key_name(&table.name);
        table.constraints.push(ActualConstraint {
            name: name.clone(),
            kind: ConstraintKind::PrimaryKey,
            columns: vec![column.to_string()],
        });
        table.indexes.push(ActualIndex {
            name,
            columns: vec![column.to_string()],
            unique: true,
            constraint_backed: true,
        });
        Self::column_mut(table, column).nullable = false;
    }

    fn apply_operation(&mut self, operation: &Operation) {
        match operation {
            Operation::CreateTable { table, .. } => {
                assert!(!self.schema.contains(&table.name), "table {} exists", table.name);
                let mut live = ActualTable::new(&table.name);
                live.columns = table.columns.iter().map(|c| self.live_column(table, c)).collect();
                if let [key] = table.primary_key.as_slice() {
                    Self::add_primary_key(&mut live, key);
                }
                self.schema.add_table(live);
            }
            Operation::AddColumn { table, column, .. } => {
                let spec = TableSpec::new(table.clone()).column(column.clone());
                let live = self.live_column(&spec, column);
                self.table_mut(table).columns.push(live);
            }
            Operation::AlterColumnType { table, column } => {
                Self::column_mut(self.table_mut(table), &column.name).max_length = column.max_length;
            }
            Operation::DropDefault { table, column, .. } => {
                Self::column_mut(self.table_mut(table), column).default = None;
            }
            Operation::SetDefault { table, column, default } => {
                let literal = self.formatter.default_literal(default);
                let live = Self::column_mut(self.table_mut(table), column);
                assert!(live.default.is_none(), "{table}.{column} already has a default");
                live.default = Some(literal);
            }
            Operation::BackfillNulls { table, column, .. } => {
                self.nulls.remove(&(table.clone(), column.clone()));
            }
            Operation::SetNullable { table, column, nullable } => {
                if !nullable {
                    assert!(
                        !self.nulls.contains(&(table.clone(), column.clone())),
                        "{table}.{column} contains NULL values"
                    );
                }
                Self::column_mut(self.table_mut(table), column).nullable = *nullable;
            }
            Operation::DropConstraint { table, name } => {
                let live = self.table_mut(table);
                let before = live.constraints.len();
                live.constraints.retain(|c| &c.name != name);
                assert_ne!(before, live.constraints.len(), "constraint {name} does not exist");
                live.indexes.retain(|i| &i.name != name);
            }
            Operation::AddPrimaryKey { table, column } => {
                let live = self.table_mut(table);
                assert!(
                    live.constraints.iter().all(|c| c.kind != ConstraintKind::PrimaryKey),
                    "table {table} already has a primary key"
                );
                Self::add_primary_key(live, column);
            }
            Operation::DropIndex { table, name } => {
                let live = self.table_mut(table);
                let before = live.indexes.len();
                live.indexes.retain(|i| &i.name != name);
                assert_ne!(before, live.indexes.len(), "index {name} does not exist");
            }
            Operation::CreateIndex { table, index } => {
                let live = self.table_mut(table);
                assert!(live.index(&index.name).is_none(), "index {} exists", index.name);
                for column in &index.columns {
                    assert!(live.column(column).is_some(), "column {column} does not exist");
                }
                live.indexes.push(ActualIndex {
                    name: index.name.clone(),
                    columns: index.columns.clone(),
                    unique: index.unique,
                    constraint_backed: false,
                });
            }
            Operation::AddForeignKey {
                table,
                column,
                target_table,
                on_delete,
            } => {
                assert!(
                    self.schema.contains(target_table),
                    "referenced table {target_table} does not exist yet"
                );
                let live = self.table_mut(table);
                live.foreign_keys.push(ActualForeignKey {
                    name: naming::foreign_key_name(table, column),
                    column: column.clone(),
                    target_table: target_table.clone(),
                    on_delete: *on_delete,
                });
            }
        }
    }
}

/// Info notes attached to the planned operations, in order.
pub fn notes(plan: &Plan) -> Vec<String> {
    plan.work
        .iter()
        .flat_map(|w| &w.steps)
        .filter_map(|s| match s {
            Step::Apply { note, .. } => note.clone(),
            Step::Report(_) => None,
        })
        .collect()
}

pub fn frozen(mut model: StructureModel) -> StructureModel {
    model.set_read_only().expect("model is valid");
    model
}

pub fn customers() -> TableSpec {
    TableSpec::new("Customers")
        .column(ColumnSpec::new("Id", ColumnType::Int))
        .column(ColumnSpec::new("Name", ColumnType::String).max_length(80).not_null())
        .primary_key("Id")
}

pub fn orders() -> TableSpec {
    TableSpec::new("Orders")
        .column(ColumnSpec::new("Id", ColumnType::Int))
        .column(
            ColumnSpec::new("CustomerId", ColumnType::Int)
                .not_null()
                .references("Customers", RefType::Disallow),
        )
        .primary_key("Id")
        .index(IndexSpec::new("IX_Orders_CustomerId", ["CustomerId"]))
}
