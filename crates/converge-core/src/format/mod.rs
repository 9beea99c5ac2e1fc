//! Type and DDL formatting.
//!
//! Every vendor quirk lives behind [`DdlFormatter`]: native type syntax,
//! the canonical type names the snapshot is compared against, default
//! literals and their normalization, and the SQL text of each operation.
//! One implementation exists per dialect version tier; the tier is
//! chosen once from [`ServerFacts`].

mod postgres;

pub use postgres::{LegacyPostgresFormatter, PostgresFormatter};

use crate::model::{ColumnSpec, ColumnType, DefaultValue, IndexSpec, TableSpec};
use crate::naming;
use crate::operation::Operation;
use crate::snapshot::DeleteAction;

/// Server version facts used to pick a formatter tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFacts {
    /// Numeric server version (e.g. `160002`).
    pub version_num: u32,
    /// Human-readable version banner.
    pub version: String,
}

impl ServerFacts {
    /// Major version derived from `version_num`.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.version_num / 10_000
    }
}

/// Picks the formatter tier for a server.
#[must_use]
pub fn formatter_for(facts: &ServerFacts) -> Box<dyn DdlFormatter> {
    if facts.version_num >= 100_000 {
        Box::new(PostgresFormatter::new())
    } else {
        Box::new(LegacyPostgresFormatter::new())
    }
}

/// Dialect-specific type and DDL formatting.
pub trait DdlFormatter: Send + Sync {
    /// Returns the formatter name.
    fn name(&self) -> &'static str;

    /// Native type syntax used in DDL.
    fn native_type(&self, column: &ColumnSpec) -> String;

    /// Canonical type name, as the snapshot reader reports it after normalization.
    fn canonical_type(&self, column_type: ColumnType) -> &'static str;

    /// Column type and modifiers for a generated identity key column.
    fn identity_definition(&self, column: &ColumnSpec) -> String;

    /// Returns whether a live default is the server-generated identity default.
    fn is_identity_default(&self, _expression: &str) -> bool {
        false
    }

    /// Renders a default value as a SQL literal.
    fn default_literal(&self, value: &DefaultValue) -> String;

    /// Normalizes a default expression so declared and live defaults compare.
    ///
    /// Quoted literals are read as values of `column_type`, since the server
    /// stores them in its own canonical spelling.
    fn normalize_default(&self, expression: &str, column_type: ColumnType) -> String;

    /// Renders the statement dropping a column default.
    fn drop_default(&self, table: &str, column: &str, constraint: Option<&str>) -> String;

    /// Renders the statement changing a column's type.
    fn alter_column_type(&self, table: &str, column: &ColumnSpec) -> String;

    /// Renders the statement changing a column's nullability.
    fn set_nullable(&self, table: &str, column: &str, nullable: bool) -> String;

    /// Renders the statement dropping an index.
    fn drop_index(&self, table: &str, name: &str) -> String;

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Returns whether `actual` matches the declared type.
    fn same_type(&self, declared: ColumnType, actual: &str) -> bool {
        self.canonical_type(declared).eq_ignore_ascii_case(actual)
    }

    /// Returns whether a live default matches the declared one.
    fn same_default(
        &self,
        column_type: ColumnType,
        declared: Option<&DefaultValue>,
        actual: Option<&str>,
    ) -> bool {
        let declared =
            declared.map(|d| self.normalize_default(&self.default_literal(d), column_type));
        let actual = actual.map(|a| self.normalize_default(a, column_type));
        declared == actual
    }

    /// Query yielding `'1'` when `table` has at least one row, `'0'` otherwise.
    fn has_rows_query(&self, table: &str) -> String {
        format!(
            "SELECT CASE WHEN EXISTS (SELECT 1 FROM {}) THEN '1' ELSE '0' END",
            self.quote_identifier(table)
        )
    }

    /// Generates SQL for an operation.
    fn render(&self, operation: &Operation) -> Vec<String> {
        match operation {
            Operation::CreateTable { table, temporary } => {
                vec![self.create_table(table, *temporary)]
            }
            Operation::AddColumn {
                table,
                column,
                identity,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.quote_identifier(table),
                self.column_definition(column, *identity, !column.nullable || *identity)
            )],
            Operation::AlterColumnType { table, column } => {
                vec![self.alter_column_type(table, column)]
            }
            Operation::DropDefault {
                table,
                column,
                constraint,
            } => vec![self.drop_default(table, column, constraint.as_deref())],
            Operation::SetDefault {
                table,
                column,
                default,
            } => vec![format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                self.quote_identifier(table),
                self.quote_identifier(column),
                self.default_literal(default)
            )],
            Operation::BackfillNulls {
                table,
                column,
                default,
            } => {
                let column = self.quote_identifier(column);
                vec![format!(
                    "UPDATE {} SET {column} = {} WHERE {column} IS NULL",
                    self.quote_identifier(table),
                    self.default_literal(default)
                )]
            }
            Operation::SetNullable {
                table,
                column,
                nullable,
            } => vec![self.set_nullable(table, column, *nullable)],
            Operation::DropConstraint { table, name } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_identifier(table),
                self.quote_identifier(name)
            )],
            Operation::AddPrimaryKey { table, column } => vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_identifier(table),
                self.quote_identifier(&naming::primary_key_name(table)),
                self.quote_identifier(column)
            )],
            Operation::DropIndex { table, name } => vec![self.drop_index(table, name)],
            Operation::CreateIndex { table, index } => vec![self.create_index(table, index)],
            Operation::AddForeignKey {
                table,
                column,
                target_table,
                on_delete,
            } => vec![self.add_foreign_key(table, column, target_table, *on_delete)],
        }
    }

    /// Generates a column definition.
    ///
    /// `not_null` is the effective nullability; the key column is always NOT NULL.
    fn column_definition(&self, column: &ColumnSpec, identity: bool, not_null: bool) -> String {
        let mut sql = format!("{} ", self.quote_identifier(&column.name));
        if identity {
            sql.push_str(&self.identity_definition(column));
        } else {
            sql.push_str(&self.native_type(column));
        }
        if not_null {
            sql.push_str(" NOT NULL");
        }
        if !identity {
            if let Some(ref default) = column.default {
                sql.push_str(" DEFAULT ");
                sql.push_str(&self.default_literal(default));
            }
        }
        sql
    }

    /// Generates SQL for CREATE TABLE.
    ///
    /// Regular tables get a named `PK_<Table>` constraint; temporary tables
    /// get an unnamed key.
    fn create_table(&self, table: &TableSpec, temporary: bool) -> String {
        let mut sql = String::from(if temporary {
            "CREATE TEMPORARY TABLE "
        } else {
            "CREATE TABLE "
        });
        sql.push_str(&self.quote_identifier(&table.name));
        sql.push_str(" (\n");

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| {
                format!(
                    "    {}",
                    self.column_definition(c, table.is_identity(c), !table.is_nullable(c))
                )
            })
            .collect();

        if let [key] = table.primary_key.as_slice() {
            let key = self.quote_identifier(key);
            if temporary {
                parts.push(format!("    PRIMARY KEY ({key})"));
            } else {
                parts.push(format!(
                    "    CONSTRAINT {} PRIMARY KEY ({key})",
                    self.quote_identifier(&naming::primary_key_name(&table.name))
                ));
            }
        }

        sql.push_str(&parts.join(",\n"));
        sql.push_str("\n)");
        sql
    }

    /// Generates SQL for CREATE INDEX.
    fn create_index(&self, table: &str, index: &IndexSpec) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    /// Generates SQL for the conventional foreign key.
    ///
    /// The referenced column list is omitted so the target's primary key is used.
    fn add_foreign_key(
        &self,
        table: &str,
        column: &str,
        target_table: &str,
        on_delete: DeleteAction,
    ) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}",
            self.quote_identifier(table),
            self.quote_identifier(&naming::foreign_key_name(table, column)),
            self.quote_identifier(column),
            self.quote_identifier(target_table)
        );
        if on_delete != DeleteAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(on_delete.as_sql());
        }
        sql
    }
}
