#![forbid(unsafe_code)]

mod capture;
mod compound;
mod replay;

use crate::changes::ChangeSet;
use crate::error::HistoryError;
use sl_core::{HistoryEntry, TableSchema, Value};
use std::collections::BTreeMap;

pub(crate) struct TrackedTable {
    pub(crate) schema: TableSchema,
    pub(crate) tracked: bool,
    // full row snapshots keyed by (history_id, is_old)
    pub(crate) shadow: BTreeMap<(i64, bool), Vec<Value>>,
}

/// The versioned change log behind a structured-document session.
///
/// Owns the history log, the shadow snapshots and the cursor. The live
/// document is handed in on every call; the engine never holds it.
pub struct HistoryEngine {
    entries: Vec<HistoryEntry>,
    tables: BTreeMap<String, TrackedTable>,
    // None is the tip sentinel: appending entries never rewrites it
    cursor: Option<i64>,
    enabled: bool,
    open_compounds: Vec<i64>,
    observer: Option<Box<dyn FnMut(&ChangeSet)>>,
    formatter: Option<Box<dyn Fn(&HistoryEntry) -> Option<String>>>,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryEngine {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            tables: BTreeMap::new(),
            cursor: None,
            enabled: true,
            open_compounds: Vec::new(),
            observer: None,
            formatter: None,
        }
    }

    /// Register a table for change capture. Must happen before any
    /// mutation against it; the schema is immutable afterwards.
    pub fn track(&mut self, schema: TableSchema) -> Result<(), HistoryError> {
        self.add_table(schema, true)
    }

    /// Register a table the session mutates without capture. Edits go
    /// to the live document but never enter the history log.
    pub fn register(&mut self, schema: TableSchema) -> Result<(), HistoryError> {
        self.add_table(schema, false)
    }

    fn add_table(&mut self, schema: TableSchema, tracked: bool) -> Result<(), HistoryError> {
        if self.tables.contains_key(schema.name()) {
            return Err(HistoryError::InvalidInput("table is already registered"));
        }
        self.tables.insert(
            schema.name().to_string(),
            TrackedTable {
                schema,
                tracked,
                shadow: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn set_history_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn history_enabled(&self) -> bool {
        self.enabled
    }

    /// Id of the last entry the document currently reflects.
    pub fn index(&self) -> i64 {
        self.resolve_index()
    }

    /// Raw cursor write for host bookkeeping (saved-checkpoint
    /// comparison). Does not replay anything.
    pub fn set_index(&mut self, index: i64) -> Result<(), HistoryError> {
        let max = self.index_max();
        if index < 0 || index > max {
            return Err(HistoryError::IndexOutOfRange { index, max });
        }
        self.cursor = if index == max { None } else { Some(index) };
        Ok(())
    }

    /// Id of the most recent history entry, 0 when the log is empty.
    pub fn index_max(&self) -> i64 {
        self.entries.len() as i64
    }

    pub fn entry(&self, history_id: i64) -> Option<&HistoryEntry> {
        if history_id < 1 || history_id > self.index_max() {
            return None;
        }
        self.entries.get((history_id - 1) as usize)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Drop the whole log and every shadow snapshot. Ids restart from
    /// 1 on the next capture.
    pub fn clear_history(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.open_compounds.clear();
        for table in self.tables.values_mut() {
            table.shadow.clear();
        }
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&ChangeSet) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Host-supplied fallback used by `describe_undo`/`describe_redo`
    /// for entries without an explicit message.
    pub fn set_label_formatter(
        &mut self,
        formatter: impl Fn(&HistoryEntry) -> Option<String> + 'static,
    ) {
        self.formatter = Some(Box::new(formatter));
    }

    pub(crate) fn resolve_index(&self) -> i64 {
        self.cursor.unwrap_or_else(|| self.index_max())
    }

    pub(crate) fn next_id(&self) -> i64 {
        self.index_max() + 1
    }

    pub(crate) fn table(&self, name: &str) -> Result<&TrackedTable, HistoryError> {
        self.tables
            .get(name)
            .ok_or_else(|| HistoryError::UnknownTable(name.to_string()))
    }

    pub(crate) fn notify(&mut self, changes: &ChangeSet) {
        if let Some(observer) = self.observer.as_mut() {
            observer(changes);
        }
    }

    /// Branch truncation: a capture while the cursor is off the tip
    /// discards every entry past the cursor before appending. Returns
    /// whether anything was discarded; the undo that moved the cursor
    /// is a user-action boundary, so such a capture must not compress
    /// into the surviving tail entry.
    pub(crate) fn truncate_redo(&mut self) -> bool {
        let Some(cursor) = self.cursor.take() else {
            return false;
        };
        if cursor >= self.index_max() {
            return false;
        }
        self.entries.truncate(cursor as usize);
        for table in self.tables.values_mut() {
            let _ = table.shadow.split_off(&(cursor + 1, false));
        }
        true
    }
}
