//! PostgreSQL driver.

mod database;
mod introspect;
mod session;

pub use database::Database;
pub use introspect::read_schema;
pub use session::{Session, TableStructure};

use converge_core::ActualSchema;
use sqlx::PgConnection;

use crate::connection::{SchemaConnection, SnapshotFilter};
use crate::error::Result;

/// [`SchemaConnection`] over a single PostgreSQL connection.
#[derive(Debug)]
pub struct PgSchemaConnection {
    conn: PgConnection,
}

impl PgSchemaConnection {
    /// Wraps an open connection.
    #[must_use]
    pub const fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    /// Returns the underlying connection.
    pub fn inner(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

impl SchemaConnection for PgSchemaConnection {
    async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn execute_scalar(&mut self, sql: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> = sqlx::query_scalar(sql)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(value.flatten())
    }

    async fn read_snapshot(&mut self, filter: &SnapshotFilter) -> Result<ActualSchema> {
        read_schema(&mut self.conn, filter).await
    }
}
