//! Converges a live PostgreSQL schema toward a declared structure model.
//!
//! `converge` is the side-effecting half of the engine. It reads the live
//! schema, asks [`converge_core::Reconciler`] for a plan, and executes it
//! statement by statement:
//!
//! - **Database** - a pool plus lazily cached server facts that select the
//!   formatter tier
//! - **Session** - one dedicated connection with its staged temporary tables
//! - **Executor** - runs a plan in order, reports progress and diagnostics
//!
//! # Example
//!
//! ```rust,ignore
//! use converge::prelude::*;
//!
//! let model = converge::config::load_model("model.json")?;
//! let db = Database::connect("postgres://localhost/app").await?;
//! let mut session = db.session().await?;
//! let result = session
//!     .reconcile(&model, ReconcileOptions::default(), false, &mut NoProgress)
//!     .await?;
//! for diagnostic in &result.diagnostics {
//!     println!("{diagnostic}");
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod postgres;
pub mod temp;

/// Commonly used types.
pub mod prelude {
    pub use converge_core::prelude::*;

    pub use crate::connection::{SchemaConnection, SnapshotFilter};
    pub use crate::error::ConvergeError;
    pub use crate::executor::Executor;
    pub use crate::postgres::{Database, PgSchemaConnection, Session, TableStructure};
    pub use crate::temp::TempTables;
}
