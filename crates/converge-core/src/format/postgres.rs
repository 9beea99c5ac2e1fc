//! PostgreSQL formatters.
//!
//! Two tiers share the type mapping and default handling and differ in
//! how the identity key column is declared: `serial` before version 10,
//! `GENERATED BY DEFAULT AS IDENTITY` from version 10 on.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::DdlFormatter;
use crate::model::{ColumnSpec, ColumnType, DefaultValue};

static TRAILING_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)::\s*"?[a-z_][a-z0-9_ ]*"?(\([^)]*\))?(\[\])?\s*$"#)
        .expect("cast pattern is valid")
});

/// Precision and scale used for `Decimal` columns.
const DECIMAL_PRECISION: (u8, u8) = (18, 4);

fn native_type(column: &ColumnSpec) -> String {
    match column.column_type {
        ColumnType::String => match column.max_length {
            Some(n) => format!("varchar({n})"),
            None => "varchar".to_string(),
        },
        ColumnType::Int => "integer".to_string(),
        ColumnType::Float => "real".to_string(),
        ColumnType::Double => "double precision".to_string(),
        ColumnType::Decimal => {
            let (p, s) = DECIMAL_PRECISION;
            format!("numeric({p}, {s})")
        }
        ColumnType::Boolean => "boolean".to_string(),
        ColumnType::Date => "date".to_string(),
        ColumnType::DateTime => "timestamp".to_string(),
        ColumnType::Time => "time".to_string(),
        ColumnType::Guid => "uuid".to_string(),
        ColumnType::Memo => "text".to_string(),
        ColumnType::Xml => "xml".to_string(),
        ColumnType::Binary => "bytea".to_string(),
    }
}

const fn canonical_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::String => "character varying",
        ColumnType::Int => "integer",
        ColumnType::Float => "real",
        ColumnType::Double => "double precision",
        ColumnType::Decimal => "numeric",
        ColumnType::Boolean => "boolean",
        ColumnType::Date => "date",
        ColumnType::DateTime => "timestamp without time zone",
        ColumnType::Time => "time without time zone",
        ColumnType::Guid => "uuid",
        ColumnType::Memo => "text",
        ColumnType::Xml => "xml",
        ColumnType::Binary => "bytea",
    }
}

fn default_literal(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Null => "NULL".to_string(),
        DefaultValue::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        DefaultValue::Integer(i) => i.to_string(),
        DefaultValue::Float(f) => {
            let text = f.to_string();
            if text.contains(['.', 'e', 'E']) || !f.is_finite() {
                text
            } else {
                format!("{text}.0")
            }
        }
        DefaultValue::String(s) => quote_literal(s),
        DefaultValue::Date(d) => quote_literal(&d.format("%Y-%m-%d").to_string()),
        DefaultValue::DateTime(dt) => quote_literal(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        DefaultValue::Expression(expr) => expr.clone(),
    }
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Strips one pair of parentheses enclosing the whole expression.
fn strip_outer_parens(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0_i32;
    let mut in_string = false;
    for ch in inner.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Rewrites a quoted literal in the spelling the server stores for `column_type`.
fn canonical_literal(text: &str, column_type: ColumnType) -> Option<String> {
    let text = text.trim();
    match column_type {
        ColumnType::Time => ["%H:%M:%S%.f", "%H:%M"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
            .map(|t| t.format("%H:%M:%S%.f").to_string()),
        ColumnType::DateTime => [
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%dT%H:%M",
        ]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        ColumnType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        ColumnType::Guid => Some(text.to_ascii_lowercase()),
        ColumnType::Boolean => match text.to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Some("true".to_string()),
            "f" | "false" | "n" | "no" | "off" | "0" => Some("false".to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn normalize_default(expression: &str, column_type: ColumnType) -> String {
    let mut expr = expression.trim().to_string();
    loop {
        if let Some(inner) = strip_outer_parens(&expr) {
            expr = inner.trim().to_string();
            continue;
        }
        let stripped = TRAILING_CAST.replace(&expr, "");
        if stripped.len() != expr.len() {
            expr = stripped.trim().to_string();
            continue;
        }
        break;
    }

    if let Some(inner) = expr.strip_prefix('\'').and_then(|e| e.strip_suffix('\'')) {
        if let Some(literal) = canonical_literal(inner, column_type) {
            return quote_literal(&literal);
        }
        if inner.parse::<f64>().is_ok() {
            expr = inner.to_string();
        } else {
            return expr;
        }
    }

    if let Ok(number) = expr.parse::<f64>() {
        return number.to_string();
    }

    expr.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

macro_rules! postgres_formatter_common {
    () => {
        fn native_type(&self, column: &ColumnSpec) -> String {
            native_type(column)
        }

        fn canonical_type(&self, column_type: ColumnType) -> &'static str {
            canonical_type(column_type)
        }

        fn default_literal(&self, value: &DefaultValue) -> String {
            default_literal(value)
        }

        fn normalize_default(&self, expression: &str, column_type: ColumnType) -> String {
            normalize_default(expression, column_type)
        }

        fn is_identity_default(&self, expression: &str) -> bool {
            expression.trim_start().to_ascii_lowercase().starts_with("nextval(")
        }

        fn drop_default(&self, table: &str, column: &str, _constraint: Option<&str>) -> String {
            format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                self.quote_identifier(table),
                self.quote_identifier(column)
            )
        }

        fn alter_column_type(&self, table: &str, column: &ColumnSpec) -> String {
            format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                self.quote_identifier(table),
                self.quote_identifier(&column.name),
                native_type(column)
            )
        }

        fn set_nullable(&self, table: &str, column: &str, nullable: bool) -> String {
            format!(
                "ALTER TABLE {} ALTER COLUMN {} {}",
                self.quote_identifier(table),
                self.quote_identifier(column),
                if nullable { "DROP NOT NULL" } else { "SET NOT NULL" }
            )
        }

        fn drop_index(&self, _table: &str, name: &str) -> String {
            format!("DROP INDEX {}", self.quote_identifier(name))
        }
    };
}

/// Formatter for PostgreSQL 10 and later.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresFormatter;

impl PostgresFormatter {
    /// Creates a new formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DdlFormatter for PostgresFormatter {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn identity_definition(&self, column: &ColumnSpec) -> String {
        format!("{} GENERATED BY DEFAULT AS IDENTITY", native_type(column))
    }

    postgres_formatter_common!();
}

/// Formatter for PostgreSQL servers older than version 10.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyPostgresFormatter;

impl LegacyPostgresFormatter {
    /// Creates a new formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DdlFormatter for LegacyPostgresFormatter {
    fn name(&self) -> &'static str {
        "postgresql-legacy"
    }

    fn identity_definition(&self, _column: &ColumnSpec) -> String {
        "serial".to_string()
    }

    postgres_formatter_common!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{formatter_for, ServerFacts};
    use crate::model::{IndexSpec, RefType, TableSpec};
    use crate::operation::Operation;
    use crate::snapshot::DeleteAction;

    fn orders() -> TableSpec {
        TableSpec::new("Orders")
            .column(ColumnSpec::new("Id", ColumnType::Int))
            .column(
                ColumnSpec::new("CustomerId", ColumnType::Int)
                    .not_null()
                    .references("Customers", RefType::Delete),
            )
            .column(
                ColumnSpec::new("Status", ColumnType::String)
                    .max_length(20)
                    .not_null()
                    .default(DefaultValue::String("new".into())),
            )
            .primary_key("Id")
    }

    #[test]
    fn test_create_table_names_the_primary_key() {
        let sql = PostgresFormatter::new().create_table(&orders(), false);
        assert_eq!(
            sql,
            "CREATE TABLE \"Orders\" (\n    \
             \"Id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n    \
             \"CustomerId\" integer NOT NULL,\n    \
             \"Status\" varchar(20) NOT NULL DEFAULT 'new',\n    \
             CONSTRAINT \"PK_Orders\" PRIMARY KEY (\"Id\")\n)"
        );
    }

    #[test]
    fn test_temporary_table_gets_unnamed_key() {
        let mut table = orders();
        table.name = "#Temp1".into();
        let sql = PostgresFormatter::new().create_table(&table, true);
        assert!(sql.starts_with("CREATE TEMPORARY TABLE \"#Temp1\" ("));
        assert!(sql.contains("    PRIMARY KEY (\"Id\")"));
        assert!(!sql.contains("CONSTRAINT"));
    }

    #[test]
    fn test_legacy_tier_uses_serial() {
        let sql = LegacyPostgresFormatter::new().create_table(&orders(), false);
        assert!(sql.contains("\"Id\" serial NOT NULL"));
        assert!(LegacyPostgresFormatter::new()
            .is_identity_default("nextval('\"Orders_Id_seq\"'::regclass)"));
        assert!(PostgresFormatter::new().is_identity_default("nextval('x'::regclass)"));
        assert!(!PostgresFormatter::new().is_identity_default("0"));
    }

    #[test]
    fn test_tier_selection() {
        let legacy = ServerFacts {
            version_num: 90_624,
            version: "PostgreSQL 9.6.24".into(),
        };
        let modern = ServerFacts {
            version_num: 160_002,
            version: "PostgreSQL 16.2".into(),
        };
        assert_eq!(legacy.major(), 9);
        assert_eq!(modern.major(), 16);
        assert_eq!(formatter_for(&legacy).name(), "postgresql-legacy");
        assert_eq!(formatter_for(&modern).name(), "postgresql");
    }

    #[test]
    fn test_canonical_types_match_format_type_output() {
        let f = PostgresFormatter::new();
        assert!(f.same_type(ColumnType::String, "character varying"));
        assert!(f.same_type(ColumnType::DateTime, "timestamp without time zone"));
        assert!(f.same_type(ColumnType::Decimal, "numeric"));
        assert!(!f.same_type(ColumnType::Int, "bigint"));
        assert!(!f.same_type(ColumnType::Memo, "character varying"));
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(default_literal(&DefaultValue::Bool(true)), "TRUE");
        assert_eq!(default_literal(&DefaultValue::Integer(-5)), "-5");
        assert_eq!(default_literal(&DefaultValue::Float(2.0)), "2.0");
        assert_eq!(default_literal(&DefaultValue::String("it's".into())), "'it''s'");
        assert_eq!(
            default_literal(&DefaultValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
            "'2024-02-29'"
        );
        assert_eq!(
            default_literal(&DefaultValue::Expression("CURRENT_TIMESTAMP".into())),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_server_defaults_normalize_to_declared_form() {
        let f = PostgresFormatter::new();
        assert!(f.same_default(
            ColumnType::String,
            Some(&DefaultValue::String("new".into())),
            Some("'new'::character varying")
        ));
        assert!(f.same_default(
            ColumnType::Int,
            Some(&DefaultValue::Integer(-5)),
            Some("'-5'::integer")
        ));
        assert!(f.same_default(ColumnType::Int, Some(&DefaultValue::Integer(0)), Some("0")));
        assert!(f.same_default(
            ColumnType::Boolean,
            Some(&DefaultValue::Bool(false)),
            Some("false")
        ));
        assert!(f.same_default(ColumnType::Double, Some(&DefaultValue::Float(1.5)), Some("1.5")));
        assert!(f.same_default(
            ColumnType::Date,
            Some(&DefaultValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())),
            Some("'2020-01-01'::date")
        ));
        assert!(f.same_default(
            ColumnType::DateTime,
            Some(&DefaultValue::Expression("now()".into())),
            Some("(now())")
        ));
        assert!(f.same_default(ColumnType::Int, None, None));
        assert!(!f.same_default(
            ColumnType::Memo,
            Some(&DefaultValue::String("New".into())),
            Some("'new'::text")
        ));
        assert!(!f.same_default(ColumnType::Int, Some(&DefaultValue::Integer(1)), None));
    }

    #[test]
    fn test_time_default_matches_server_spelling() {
        let f = PostgresFormatter::new();
        assert!(f.same_default(
            ColumnType::Time,
            Some(&DefaultValue::String("12:00".into())),
            Some("'12:00:00'::time without time zone")
        ));
        assert!(!f.same_default(
            ColumnType::Time,
            Some(&DefaultValue::String("12:00".into())),
            Some("'12:30:00'::time without time zone")
        ));
    }

    #[test]
    fn test_uuid_default_ignores_case() {
        let f = PostgresFormatter::new();
        assert!(f.same_default(
            ColumnType::Guid,
            Some(&DefaultValue::String("A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11".into())),
            Some("'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid")
        ));
    }

    #[test]
    fn test_datetime_default_keeps_fractional_seconds() {
        let f = PostgresFormatter::new();
        let stamp = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(8, 30, 0, 250)
            .unwrap();
        assert_eq!(
            default_literal(&DefaultValue::DateTime(stamp)),
            "'2024-03-01 08:30:00.250'"
        );
        assert!(f.same_default(
            ColumnType::DateTime,
            Some(&DefaultValue::DateTime(stamp)),
            Some("'2024-03-01 08:30:00.25'::timestamp without time zone")
        ));
        assert!(f.same_default(
            ColumnType::DateTime,
            Some(&DefaultValue::String("2024-03-01 08:30".into())),
            Some("'2024-03-01 08:30:00'::timestamp without time zone")
        ));
    }

    #[test]
    fn test_render_column_changes() {
        let f = PostgresFormatter::new();
        let widened = ColumnSpec::new("Status", ColumnType::String).max_length(50);
        assert_eq!(
            f.render(&Operation::AlterColumnType {
                table: "Orders".into(),
                column: widened,
            }),
            vec!["ALTER TABLE \"Orders\" ALTER COLUMN \"Status\" TYPE varchar(50)"]
        );
        assert_eq!(
            f.render(&Operation::DropDefault {
                table: "Orders".into(),
                column: "Status".into(),
                constraint: None,
            }),
            vec!["ALTER TABLE \"Orders\" ALTER COLUMN \"Status\" DROP DEFAULT"]
        );
        assert_eq!(
            f.render(&Operation::BackfillNulls {
                table: "Orders".into(),
                column: "Status".into(),
                default: DefaultValue::String("new".into()),
            }),
            vec!["UPDATE \"Orders\" SET \"Status\" = 'new' WHERE \"Status\" IS NULL"]
        );
        assert_eq!(
            f.render(&Operation::SetNullable {
                table: "Orders".into(),
                column: "Status".into(),
                nullable: false,
            }),
            vec!["ALTER TABLE \"Orders\" ALTER COLUMN \"Status\" SET NOT NULL"]
        );
    }

    #[test]
    fn test_render_keys_and_indexes() {
        let f = PostgresFormatter::new();
        assert_eq!(
            f.render(&Operation::AddPrimaryKey {
                table: "Orders".into(),
                column: "Id".into(),
            }),
            vec!["ALTER TABLE \"Orders\" ADD CONSTRAINT \"PK_Orders\" PRIMARY KEY (\"Id\")"]
        );
        assert_eq!(
            f.render(&Operation::CreateIndex {
                table: "Orders".into(),
                index: IndexSpec::new("IX_Orders_Both", ["CustomerId", "Status"]).unique(),
            }),
            vec!["CREATE UNIQUE INDEX \"IX_Orders_Both\" ON \"Orders\" (\"CustomerId\", \"Status\")"]
        );
        assert_eq!(
            f.render(&Operation::AddForeignKey {
                table: "Orders".into(),
                column: "CustomerId".into(),
                target_table: "Customers".into(),
                on_delete: DeleteAction::Cascade,
            }),
            vec![
                "ALTER TABLE \"Orders\" ADD CONSTRAINT \"FK_Orders_CustomerId\" \
                 FOREIGN KEY (\"CustomerId\") REFERENCES \"Customers\" ON DELETE CASCADE"
            ]
        );
        assert_eq!(
            f.render(&Operation::DropIndex {
                table: "Orders".into(),
                name: "IX_Orders_Both".into(),
            }),
            vec!["DROP INDEX \"IX_Orders_Both\""]
        );
    }
}
