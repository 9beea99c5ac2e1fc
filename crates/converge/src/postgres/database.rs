//! Database handle.

use converge_core::{formatter_for, ActualSchema, DdlFormatter, ServerFacts};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{read_schema, PgSchemaConnection, Session};
use crate::connection::SnapshotFilter;
use crate::error::{ConvergeError, Result};

const SERVER_FACTS_SQL: &str =
    "SELECT current_setting('server_version_num')::bigint, version()";

fn parse_server_facts(version_num: i64, version: String) -> Result<ServerFacts> {
    let version_num = u32::try_from(version_num)
        .ok()
        .filter(|n| *n > 0)
        .ok_or(ConvergeError::ServerVersion(version_num))?;
    Ok(ServerFacts {
        version_num,
        version,
    })
}

/// A PostgreSQL database and the facts cached about its server.
///
/// Server facts are fetched on first use and kept for the lifetime of the
/// handle. Concurrent first uses wait on the same fetch.
#[derive(Debug)]
pub struct Database {
    pool: PgPool,
    schema: String,
    facts: OnceCell<ServerFacts>,
}

impl Database {
    /// Connects to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: "public".to_string(),
            facts: OnceCell::new(),
        }
    }

    /// Sets the schema sessions reconcile.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Returns the schema sessions reconcile.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the server facts, fetching them once.
    pub async fn server_facts(&self) -> Result<&ServerFacts> {
        self.facts
            .get_or_try_init(|| async {
                let (version_num, version): (i64, String) = sqlx::query_as(SERVER_FACTS_SQL)
                    .fetch_one(&self.pool)
                    .await?;
                let facts = parse_server_facts(version_num, version)?;
                info!(version = %facts.version, major = facts.major(), "Server facts cached");
                Ok::<_, ConvergeError>(facts)
            })
            .await
    }

    /// Returns the formatter tier matching the server.
    pub async fn formatter(&self) -> Result<Box<dyn DdlFormatter>> {
        let facts = self.server_facts().await?;
        let formatter = formatter_for(facts);
        debug!(formatter = formatter.name(), "Formatter selected");
        Ok(formatter)
    }

    /// Opens an administrative session on a dedicated connection.
    ///
    /// The connection is detached from the pool, so its temporary tables
    /// disappear when the session is dropped. The statement timeout is
    /// disabled and unqualified names resolve in the handle's schema.
    pub async fn session(&self) -> Result<Session> {
        let formatter = self.formatter().await?;
        let mut conn = self.pool.acquire().await?.detach();
        let setup = format!(
            "SET statement_timeout = 0; SET search_path TO {}",
            formatter.quote_identifier(&self.schema)
        );
        sqlx::raw_sql(&setup).execute(&mut conn).await?;
        debug!(schema = %self.schema, "Session opened");
        Ok(Session::new(
            PgSchemaConnection::new(conn),
            formatter,
            self.schema.clone(),
        ))
    }

    /// Reads a snapshot of the whole schema.
    pub async fn snapshot(&self) -> Result<ActualSchema> {
        let mut conn = self.pool.acquire().await?;
        read_schema(&mut conn, &SnapshotFilter::new(self.schema.as_str())).await
    }
}
