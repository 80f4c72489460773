#![forbid(unsafe_code)]

use super::HistoryEngine;
use crate::document::{self, Document};
use crate::error::HistoryError;
use sl_core::{Command, HistoryEntry, Value};

impl HistoryEngine {
    /// Insert a row into the live document and capture it.
    pub fn insert(
        &mut self,
        doc: &mut Document,
        table: &str,
        values: &[Value],
    ) -> Result<(), HistoryError> {
        {
            let tracked = self.table(table)?;
            document::insert_row(&doc.conn, &tracked.schema, values)?;
        }
        if !self.capturing(table) {
            return Ok(());
        }
        self.truncate_redo();
        let id = self.next_id();
        self.entries
            .push(HistoryEntry::mutation(id, Command::Insert, table, None));
        if let Some(tracked) = self.tables.get_mut(table) {
            tracked.shadow.insert((id, false), values.to_vec());
        }
        Ok(())
    }

    /// Delete a row by primary key and capture its before image.
    ///
    /// A cascading deletion (removing a composite entity plus its
    /// dependents) must issue each delete explicitly inside one
    /// `begin`/`end` bracket so the cascade undoes atomically.
    pub fn delete(
        &mut self,
        doc: &mut Document,
        table: &str,
        key: &[Value],
    ) -> Result<(), HistoryError> {
        let old = {
            let tracked = self.table(table)?;
            let old = document::select_row(&doc.conn, &tracked.schema, key)?
                .ok_or_else(|| HistoryError::UnknownRow {
                    table: table.to_string(),
                })?;
            document::delete_row(&doc.conn, &tracked.schema, key)?;
            old
        };
        if !self.capturing(table) {
            return Ok(());
        }
        self.truncate_redo();
        let id = self.next_id();
        self.entries
            .push(HistoryEntry::mutation(id, Command::Delete, table, None));
        if let Some(tracked) = self.tables.get_mut(table) {
            tracked.shadow.insert((id, true), old);
        }
        Ok(())
    }

    /// Write one non-key column and capture before/after images.
    ///
    /// Consecutive updates to the same row and column compress into
    /// the existing entry so continuous edits (dragging, typing) do
    /// not grow the log. Writing the current value back is a no-op.
    pub fn update(
        &mut self,
        doc: &mut Document,
        table: &str,
        key: &[Value],
        column: &str,
        value: Value,
    ) -> Result<(), HistoryError> {
        let (column_index, before) = {
            let tracked = self.table(table)?;
            let column_index = tracked.schema.column_index(column).ok_or_else(|| {
                HistoryError::UnknownColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                }
            })?;
            if tracked.schema.columns()[column_index].is_primary_key() {
                // key changes are modeled as delete + insert
                return Err(HistoryError::KeyImmutable {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
            let before = document::select_row(&doc.conn, &tracked.schema, key)?.ok_or_else(
                || HistoryError::UnknownRow {
                    table: table.to_string(),
                },
            )?;
            if before[column_index] == value {
                return Ok(());
            }
            document::update_column(&doc.conn, &tracked.schema, key, column_index, &value)?;
            (column_index, before)
        };
        if !self.capturing(table) {
            return Ok(());
        }
        let truncated = self.truncate_redo();
        if !truncated && self.compress_update(table, column, column_index, &before, &value) {
            return Ok(());
        }
        let id = self.next_id();
        self.entries
            .push(HistoryEntry::mutation(id, Command::Update, table, Some(column)));
        if let Some(tracked) = self.tables.get_mut(table) {
            let mut after = before.clone();
            after[column_index] = value;
            tracked.shadow.insert((id, true), before);
            tracked.shadow.insert((id, false), after);
        }
        Ok(())
    }

    /// Explicitly label the most recent entry for `describe_undo`.
    pub fn label_last(&mut self, message: impl Into<String>) {
        if !self.enabled {
            return;
        }
        if let Some(entry) = self.entries.last_mut() {
            entry.message = Some(message.into());
        }
    }

    fn capturing(&self, table: &str) -> bool {
        // untracked tables mutate without leaving a trace
        self.enabled
            && self
                .tables
                .get(table)
                .map(|tracked| tracked.tracked)
                .unwrap_or(false)
    }

    /// Compression rule: if the most recent entry is an update of the
    /// same table, column and row, fold the new value into its after
    /// image instead of appending. Evaluated per column, so an
    /// A, B, A update sequence still yields three entries.
    fn compress_update(
        &mut self,
        table: &str,
        column: &str,
        column_index: usize,
        before: &[Value],
        value: &Value,
    ) -> bool {
        let Some(last) = self.entries.last() else {
            return false;
        };
        if last.command != Command::Update
            || last.table_name.as_deref() != Some(table)
            || last.column_name.as_deref() != Some(column)
        {
            return false;
        }
        let last_id = last.history_id;
        let Some(tracked) = self.tables.get_mut(table) else {
            return false;
        };
        let same_row = match tracked.shadow.get(&(last_id, false)) {
            Some(after) => tracked
                .schema
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, column)| column.is_primary_key())
                .all(|(index, _)| after[index] == before[index]),
            None => false,
        };
        if !same_row {
            return false;
        }
        if let Some(after) = tracked.shadow.get_mut(&(last_id, false)) {
            after[column_index] = value.clone();
        }
        true
    }
}
