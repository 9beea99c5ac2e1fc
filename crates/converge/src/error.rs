//! Error types for live reconciliation.

use converge_core::{ModelError, ReconcileError};

/// Errors that can occur while reading or converging a live schema.
#[derive(Debug, thiserror::Error)]
pub enum ConvergeError {
    /// Database error outside of a planned statement.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A planned statement failed; statements before it stay applied.
    #[error("Statement failed: {sql}: {source}")]
    Statement {
        /// The failing SQL.
        sql: String,
        /// Underlying failure.
        source: Box<ConvergeError>,
    },

    /// A table listed by the catalog could not be resolved to an object id.
    #[error("Cannot resolve object id of table '{0}'")]
    ObjectNotFound(String),

    /// The server reported a version number the formatter tiers cannot place.
    #[error("Unexpected server_version_num {0}")]
    ServerVersion(i64),

    /// Planning failed before any statement ran.
    #[error(transparent)]
    Plan(#[from] ReconcileError),

    /// The structure model is invalid.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// IO error (reading model files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for live reconciliation.
pub type Result<T> = std::result::Result<T, ConvergeError>;
