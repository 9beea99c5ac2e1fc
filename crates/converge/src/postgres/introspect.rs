//! PostgreSQL metadata snapshot reader.
//!
//! Reads tables, columns, indexes, key constraints and foreign keys from
//! the system catalogs. Every query is read-only.

use converge_core::{
    ActualColumn, ActualConstraint, ActualForeignKey, ActualIndex, ActualSchema, ActualTable,
    ConstraintKind, DeleteAction, ReconcileError,
};
use sqlx::PgConnection;
use tracing::debug;

use crate::connection::SnapshotFilter;
use crate::error::{ConvergeError, Result};

const TABLES_SQL: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name";

const OID_SQL: &str = "SELECT to_regclass(format('%I.%I', $1::text, $2::text))::oid::bigint";

const COLUMNS_SQL: &str = "\
SELECT a.attname::text,
       format_type(a.atttypid, a.atttypmod),
       CASE WHEN a.atttypid IN (1042, 1043) AND a.atttypmod > 4 THEN a.atttypmod - 4 END,
       NOT a.attnotnull,
       pg_get_expr(d.adbin, d.adrelid)
FROM pg_attribute a
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
WHERE a.attrelid = ($1::bigint)::oid AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum";

const INDEXES_SQL: &str = "\
SELECT i.relname::text,
       ARRAY(
           SELECT a.attname::text
           FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
           JOIN pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = k.attnum
           ORDER BY k.ord
       ),
       ix.indisunique,
       EXISTS (
           SELECT 1 FROM pg_constraint c
           WHERE c.conindid = ix.indexrelid AND c.contype IN ('p', 'u', 'x')
       )
FROM pg_index ix
JOIN pg_class i ON i.oid = ix.indexrelid
WHERE ix.indrelid = ($1::bigint)::oid
ORDER BY i.relname";

const CONSTRAINTS_SQL: &str = "\
SELECT c.conname::text,
       c.contype::text,
       ARRAY(
           SELECT a.attname::text
           FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
           JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
           ORDER BY k.ord
       )
FROM pg_constraint c
WHERE c.conrelid = ($1::bigint)::oid AND c.contype IN ('p', 'u')
ORDER BY c.conname";

const FOREIGN_KEYS_SQL: &str = "\
SELECT c.conname::text, a.attname::text, t.relname::text, c.confdeltype::text
FROM pg_constraint c
JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = c.conkey[1]
JOIN pg_class t ON t.oid = c.confrelid
WHERE c.conrelid = ($1::bigint)::oid AND c.contype = 'f'
ORDER BY c.conname";

/// Reads the snapshot of every table in scope.
pub async fn read_schema(conn: &mut PgConnection, filter: &SnapshotFilter) -> Result<ActualSchema> {
    let names: Vec<(String,)> = sqlx::query_as(TABLES_SQL)
        .bind(&filter.schema)
        .fetch_all(&mut *conn)
        .await?;

    let mut schema = ActualSchema::new();
    for (name,) in names {
        if !filter.includes(&name) {
            continue;
        }
        let table = read_table(conn, &filter.schema, &name).await?;
        schema.add_table(table);
    }
    debug!(schema = %filter.schema, tables = schema.tables.len(), "Read schema snapshot");
    Ok(schema)
}

async fn resolve_oid(conn: &mut PgConnection, schema: &str, table: &str) -> Result<i64> {
    let (oid,): (Option<i64>,) = sqlx::query_as(OID_SQL)
        .bind(schema)
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
    oid.ok_or_else(|| ConvergeError::ObjectNotFound(format!("{schema}.{table}")))
}

async fn read_table(conn: &mut PgConnection, schema: &str, name: &str) -> Result<ActualTable> {
    let oid = resolve_oid(conn, schema, name).await?;
    let mut table = ActualTable::new(name);

    let columns: Vec<(String, String, Option<i32>, bool, Option<String>)> =
        sqlx::query_as(COLUMNS_SQL)
            .bind(oid)
            .fetch_all(&mut *conn)
            .await?;
    for (column, native_type, length, nullable, default) in columns {
        let mut live = ActualColumn::new(column, &native_type);
        live.max_length = length.and_then(|n| u32::try_from(n).ok());
        live.nullable = nullable;
        live.default = default;
        table.columns.push(live);
    }

    let indexes: Vec<(String, Vec<String>, bool, bool)> = sqlx::query_as(INDEXES_SQL)
        .bind(oid)
        .fetch_all(&mut *conn)
        .await?;
    table.indexes = indexes
        .into_iter()
        .map(|(name, columns, unique, constraint_backed)| ActualIndex {
            name,
            columns,
            unique,
            constraint_backed,
        })
        .collect();

    let constraints: Vec<(String, String, Vec<String>)> = sqlx::query_as(CONSTRAINTS_SQL)
        .bind(oid)
        .fetch_all(&mut *conn)
        .await?;
    table.constraints = constraints
        .into_iter()
        .map(|(name, kind, columns)| ActualConstraint {
            kind: if kind == "p" {
                ConstraintKind::PrimaryKey
            } else {
                ConstraintKind::Unique
            },
            name,
            columns,
        })
        .collect();

    let foreign_keys: Vec<(String, String, String, String)> = sqlx::query_as(FOREIGN_KEYS_SQL)
        .bind(oid)
        .fetch_all(&mut *conn)
        .await?;
    for (fk_name, column, target_table, code) in foreign_keys {
        let on_delete = DeleteAction::from_code(&code).ok_or_else(|| {
            ReconcileError::InconsistentSnapshot {
                table: name.to_string(),
                message: format!("foreign key '{fk_name}' has unknown delete action '{code}'"),
            }
        })?;
        table.foreign_keys.push(ActualForeignKey {
            name: fk_name,
            column,
            target_table,
            on_delete,
        });
    }

    debug!(
        table = %name,
        columns = table.columns.len(),
        indexes = table.indexes.len(),
        "Read table metadata"
    );
    Ok(table)
}
