//! Declarative schema model and reconciliation planner.
//!
//! `converge-core` holds everything about schema reconciliation that does
//! not need a database connection:
//!
//! - **Model** - the declared structure: [`StructureModel`], [`TableSpec`],
//!   [`ColumnSpec`], [`IndexSpec`]
//! - **Snapshot** - what the database actually contains: [`ActualSchema`]
//! - **Formatter** - dialect-specific types, defaults and DDL text through
//!   [`DdlFormatter`], one implementation per server version tier
//! - **Reconciler** - the pure diff engine producing a [`Plan`]
//!
//! Executing a plan is the job of the `converge` crate.
//!
//! # Example
//!
//! ```rust
//! use converge_core::prelude::*;
//!
//! let mut model = StructureModel::new()
//!     .table(
//!         TableSpec::new("Customers")
//!             .column(ColumnSpec::new("Id", ColumnType::Int))
//!             .column(ColumnSpec::new("Name", ColumnType::String).max_length(80))
//!             .primary_key("Id"),
//!     )
//!     .table(
//!         TableSpec::new("Orders")
//!             .column(ColumnSpec::new("Id", ColumnType::Int))
//!             .column(
//!                 ColumnSpec::new("CustomerId", ColumnType::Int)
//!                     .not_null()
//!                     .references("Customers", RefType::Disallow),
//!             )
//!             .primary_key("Id")
//!             .index(IndexSpec::new("IX_Orders_CustomerId", ["CustomerId"])),
//!     );
//! model.set_read_only().unwrap();
//!
//! let formatter = PostgresFormatter::new();
//! let plan = Reconciler::new(&formatter, ReconcileOptions::default())
//!     .plan(&model, &ActualSchema::new())
//!     .unwrap();
//!
//! for operation in plan.operations() {
//!     for sql in formatter.render(operation) {
//!         println!("{sql};");
//!     }
//! }
//! ```

pub mod diagnostics;
pub mod error;
pub mod format;
pub mod model;
pub mod naming;
pub mod operation;
pub mod progress;
pub mod reconcile;
pub mod snapshot;

pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
pub use error::{ModelError, ReconcileError};
pub use format::{
    formatter_for, DdlFormatter, LegacyPostgresFormatter, PostgresFormatter, ServerFacts,
};
pub use model::{
    ColumnSpec, ColumnType, DefaultValue, IndexSpec, RefType, StructureModel, TableSpec,
};
pub use operation::Operation;
pub use progress::{NoProgress, Progress};
pub use reconcile::{
    Phase, Plan, ReconcileOptions, ReconciliationResult, Reconciler, Step, TableWork,
};
pub use snapshot::{
    normalize_type_name, ActualColumn, ActualConstraint, ActualForeignKey, ActualIndex,
    ActualSchema, ActualTable, ConstraintKind, DeleteAction,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
    pub use crate::error::{ModelError, ReconcileError};
    pub use crate::format::{formatter_for, DdlFormatter, PostgresFormatter, ServerFacts};
    pub use crate::model::{
        ColumnSpec, ColumnType, DefaultValue, IndexSpec, RefType, StructureModel, TableSpec,
    };
    pub use crate::operation::Operation;
    pub use crate::progress::{NoProgress, Progress};
    pub use crate::reconcile::{Plan, ReconcileOptions, ReconciliationResult, Reconciler, Step};
    pub use crate::snapshot::{ActualSchema, ActualTable};
}
