//! End-to-end planner scenarios against an in-memory database.
//!
//! Each test plans a pass, applies it to a simulated snapshot, and plans
//! again to check that the second pass has nothing left to do.

mod common;

use common::{customers, frozen, notes, orders, Simulated};
use converge_core::prelude::*;
use converge_core::{ActualColumn, ActualConstraint, ActualIndex, ConstraintKind, DeleteAction, Phase};

#[test]
fn orders_and_customers_from_scratch() {
    let model = frozen(StructureModel::new().table(customers()).table(orders()));
    let mut db = Simulated::empty();

    let plan = db.plan(&model, ReconcileOptions::default());
    let kinds: Vec<String> = plan
        .operations()
        .map(|op| match op {
            Operation::CreateTable { table, .. } => format!("create {}", table.name),
            Operation::CreateIndex { index, .. } => format!("index {}", index.name),
            Operation::AddForeignKey { table, column, .. } => format!("fk {table}.{column}"),
            other => panic!("unexpected operation {other:?}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "create Customers",
            "create Orders",
            "index IX_Orders_CustomerId",
            "fk Orders.CustomerId",
        ]
    );
    assert_eq!(
        notes(&plan),
        vec![
            "Table Customers created",
            "Table Orders created",
            "Index IX_Orders_CustomerId on table Orders created",
            "Foreign key FK_Orders_CustomerId created",
        ]
    );
    assert_eq!(plan.reports().count(), 0);

    db.apply(&plan);
    let orders = db.schema.table("Orders").unwrap();
    assert!(orders.constraints.iter().any(|c| c.name == "PK_Orders"));
    assert_eq!(
        orders.foreign_key("FK_Orders_CustomerId").map(|fk| fk.on_delete),
        Some(DeleteAction::NoAction)
    );

    let second = db.plan(&model, ReconcileOptions::default());
    assert!(second.is_empty());
    assert_eq!(second.reports().count(), 0);
}

#[test]
fn foreign_key_waits_for_a_target_declared_later() {
    let model = frozen(StructureModel::new().table(orders()).table(customers()));
    let mut db = Simulated::empty();

    let plan = db.plan(&model, ReconcileOptions::default());
    let fk_unit = plan
        .work
        .iter()
        .position(|w| w.phase == Phase::ForeignKeys && !w.steps.is_empty())
        .unwrap();
    let last_create = plan
        .work
        .iter()
        .rposition(|w| w.phase == Phase::Structure)
        .unwrap();
    assert!(fk_unit > last_create);

    // Panics if the foreign key ran before its target existed.
    db.apply(&plan);
    assert!(db.plan(&model, ReconcileOptions::default()).is_empty());
}

fn drifted_orders() -> ActualTable {
    let mut table = ActualTable::new("Orders");
    table.columns = vec![
        ActualColumn::new("Id", "integer").not_null(),
        ActualColumn::new("CustomerId", "integer"),
        ActualColumn::new("Status", "character varying(10)").max_length(10),
        ActualColumn::new("Legacy", "text"),
    ];
    table.constraints.push(ActualConstraint {
        name: "orders_pkey".into(),
        kind: ConstraintKind::PrimaryKey,
        columns: vec!["Id".into()],
    });
    table.indexes = vec![
        ActualIndex {
            name: "orders_pkey".into(),
            columns: vec!["Id".into()],
            unique: true,
            constraint_backed: true,
        },
        ActualIndex {
            name: "IX_Orders_CustomerId".into(),
            columns: vec!["CustomerId".into()],
            unique: false,
            constraint_backed: false,
        },
        ActualIndex {
            name: "IX_Orders_Legacy".into(),
            columns: vec!["Legacy".into()],
            unique: false,
            constraint_backed: false,
        },
    ];
    table
}

fn wanted_orders() -> TableSpec {
    orders()
        .column(
            ColumnSpec::new("Status", ColumnType::String)
                .max_length(40)
                .not_null()
                .default(DefaultValue::String("new".into())),
        )
        .column(ColumnSpec::new("Placed", ColumnType::DateTime))
}

#[test]
fn drifted_table_converges_in_one_pass() {
    let model = frozen(StructureModel::new().table(customers()).table(wanted_orders()));
    let mut db = Simulated::new(ActualSchema::new().with_table(drifted_orders()))
        .with_nulls("Orders", "CustomerId")
        .with_nulls("Orders", "Status");

    // CustomerId is tightened without a default, so its NULLs must be gone first.
    db.nulls.remove(&("Orders".to_string(), "CustomerId".to_string()));

    let plan = db.plan(&model, ReconcileOptions::default());
    db.apply(&plan);

    let live = db.schema.table("Orders").unwrap();
    let status = live.column("Status").unwrap();
    assert_eq!(status.max_length, Some(40));
    assert!(!status.nullable);
    assert!(live.column("Placed").is_some());
    assert!(live.column("Legacy").is_some());
    assert!(live.constraints.iter().any(|c| c.name == "PK_Orders"));
    assert!(live.constraints.iter().all(|c| c.name != "orders_pkey"));
    // Purged by the widening, restored afterwards.
    assert!(live.index("IX_Orders_CustomerId").is_some());
    assert!(live.index("IX_Orders_Legacy").is_some());
    assert!(db.nulls.is_empty());

    let second = db.plan(&model, ReconcileOptions::default());
    assert!(second.is_empty(), "second pass planned {:?}", second.operations().collect::<Vec<_>>());
}

#[test]
fn undeclared_purged_index_stays_dropped_when_asked() {
    let model = frozen(StructureModel::new().table(customers()).table(wanted_orders()));
    let mut db = Simulated::new(ActualSchema::new().with_table(drifted_orders()));
    let options = ReconcileOptions::new().drop_unused_indexes(true);

    let plan = db.plan(&model, options);
    db.apply(&plan);
    let live = db.schema.table("Orders").unwrap();
    assert!(live.index("IX_Orders_Legacy").is_none());
    assert!(live.index("IX_Orders_CustomerId").is_some());
    assert!(db.plan(&model, options).is_empty());
}

#[test]
fn shrinking_a_column_is_never_attempted() {
    let model = frozen(
        StructureModel::new().table(
            TableSpec::new("Notes")
                .column(ColumnSpec::new("Id", ColumnType::Int))
                .column(ColumnSpec::new("Body", ColumnType::String).max_length(100))
                .primary_key("Id"),
        ),
    );
    let mut notes_table = ActualTable::new("Notes");
    notes_table.columns = vec![
        ActualColumn::new("Id", "integer").not_null(),
        ActualColumn::new("Body", "character varying(500)").max_length(500),
    ];
    notes_table.constraints.push(ActualConstraint {
        name: "PK_Notes".into(),
        kind: ConstraintKind::PrimaryKey,
        columns: vec!["Id".into()],
    });
    let db = Simulated::new(ActualSchema::new().with_table(notes_table));

    let plan = db.plan(&model, ReconcileOptions::default());
    assert!(plan.is_empty());
    let warnings: Vec<&Diagnostic> = plan.reports().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert!(warnings[0].message.contains("Notes.Body"));
}

#[test]
fn type_mismatch_is_an_error_and_the_pass_continues() {
    let model = frozen(
        StructureModel::new().table(customers()).table(
            TableSpec::new("Notes")
                .column(ColumnSpec::new("Id", ColumnType::Int))
                .column(ColumnSpec::new("Body", ColumnType::Memo))
                .primary_key("Id"),
        ),
    );
    let mut notes_table = ActualTable::new("Notes");
    notes_table.columns = vec![
        ActualColumn::new("Id", "integer").not_null(),
        ActualColumn::new("Body", "bytea"),
    ];
    let db = Simulated::new(ActualSchema::new().with_table(notes_table));

    let plan = db.plan(&model, ReconcileOptions::default());
    assert!(plan.reports().any(|d| d.severity == Severity::Error));
    assert!(plan
        .operations()
        .any(|op| matches!(op, Operation::CreateTable { table, .. } if table.name == "Customers")));
    assert!(plan
        .operations()
        .any(|op| matches!(op, Operation::AddPrimaryKey { table, .. } if table == "Notes")));
}

#[test]
fn composite_key_fails_before_anything_is_planned() {
    let mut model = StructureModel::new().table(customers());
    model.set_read_only().unwrap();
    let composite = StructureModel::new().table(customers().primary_key("Name"));

    let formatter = PostgresFormatter::new();
    let reconciler = Reconciler::new(&formatter, ReconcileOptions::default());
    assert!(reconciler.plan(&model, &ActualSchema::new()).is_ok());

    let mut composite = composite;
    let err = composite.set_read_only().unwrap_err();
    assert!(matches!(err, ModelError::CompositePrimaryKey { .. }));
    assert_eq!(
        reconciler.plan(&composite, &ActualSchema::new()),
        Err(ReconcileError::ModelNotFrozen)
    );
}

#[test]
fn reference_to_missing_table_is_fatal() {
    let model = frozen(StructureModel::new().table(orders()));
    let formatter = PostgresFormatter::new();
    let reconciler = Reconciler::new(&formatter, ReconcileOptions::default());
    assert!(matches!(
        reconciler.plan(&model, &ActualSchema::new()),
        Err(ReconcileError::UnresolvedReference { .. })
    ));

    let without_fks = Reconciler::new(&formatter, ReconcileOptions::new().foreign_keys(false));
    assert!(without_fks.plan(&model, &ActualSchema::new()).is_ok());
}
