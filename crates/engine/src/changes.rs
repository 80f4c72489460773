#![forbid(unsafe_code)]

use sl_core::Value;
use std::collections::BTreeMap;

/// Net effect of one undo/redo step, reported per table so the host
/// can refresh dependent views and selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    pub tables: BTreeMap<String, TableChanges>,
}

/// Rows touched in a single table. `inserted` carries full rows in
/// schema column order; `deleted` and `updated` carry primary keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableChanges {
    pub inserted: Vec<Vec<Value>>,
    pub deleted: Vec<Vec<Value>>,
    pub updated: Vec<Vec<Value>>,
}

impl ChangeSet {
    pub(crate) fn table(&mut self, name: &str) -> &mut TableChanges {
        self.tables.entry(name.to_string()).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|table| {
            table.inserted.is_empty() && table.deleted.is_empty() && table.updated.is_empty()
        })
    }
}
