//! Connection-scoped registry of staged temporary tables.

use std::collections::BTreeMap;

use converge_core::naming;
use converge_core::TableSpec;

/// Temporary tables created on one connection, by generated name.
///
/// Names are `#Temp1`, `#Temp2`, ... in creation order. The registry lives
/// as long as its session and is never shared.
#[derive(Debug, Default)]
pub struct TempTables {
    tables: BTreeMap<String, TableSpec>,
    created: usize,
}

impl TempTables {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the next staged table will get.
    #[must_use]
    pub fn next_name(&self) -> String {
        naming::temp_table_name(self.created + 1)
    }

    /// Records a created table under its name, which must be [`Self::next_name`].
    pub fn register(&mut self, table: TableSpec) {
        self.created += 1;
        self.tables.insert(table.name.clone(), table);
    }

    /// Looks up a staged table.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Number of staged tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns whether nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
