//! Naming conventions shared by the planner and the live side.
//!
//! These names must be reproduced bit-exactly on every pass, otherwise a
//! second pass would not recognize what the first one created.

/// Prefix of primary-key constraint names.
pub const PRIMARY_KEY_PREFIX: &str = "PK_";

/// Prefix of foreign-key constraint names.
pub const FOREIGN_KEY_PREFIX: &str = "FK_";

/// Prefix of staged temporary table names.
pub const TEMP_TABLE_PREFIX: &str = "#Temp";

/// Name of the primary-key constraint of `table`.
#[must_use]
pub fn primary_key_name(table: &str) -> String {
    format!("{PRIMARY_KEY_PREFIX}{table}")
}

/// Name of the foreign-key constraint on `table.column`.
#[must_use]
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("{FOREIGN_KEY_PREFIX}{table}_{column}")
}

/// Name of the `n`-th temporary table of a connection (1-based).
#[must_use]
pub fn temp_table_name(n: usize) -> String {
    format!("{TEMP_TABLE_PREFIX}{n}")
}

/// Returns whether `name` carries a prefix reserved for key constraints.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(PRIMARY_KEY_PREFIX) || name.starts_with(FOREIGN_KEY_PREFIX)
}
