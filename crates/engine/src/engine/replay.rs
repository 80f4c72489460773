#![forbid(unsafe_code)]

use super::{HistoryEngine, TrackedTable};
use crate::changes::ChangeSet;
use crate::document::{self, Document};
use crate::error::HistoryError;
use sl_core::{Command, HistoryEntry, TableSchema, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl HistoryEngine {
    /// Step the document one logical action backward. A pop at the
    /// cursor unwinds its whole bracketed range as a single step.
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> Result<Option<ChangeSet>, HistoryError> {
        if !self.open_compounds.is_empty() {
            return Err(HistoryError::CompoundOpen);
        }
        let index = self.resolve_index();
        if index == 0 {
            return Ok(None);
        }
        let (first, last) = match self.entries[(index - 1) as usize].command {
            Command::Pop => (self.matching_push(index)?, index),
            Command::Push => {
                return Err(HistoryError::CursorOnPush { history_id: index });
            }
            _ => (index, index),
        };
        let changes = self.replay_range(doc, first, last, Direction::Undo)?;
        self.cursor = Some(first - 1);
        self.notify(&changes);
        Ok(Some(changes))
    }

    /// Step the document one logical action forward along the redo
    /// branch. A push right after the cursor applies through its pop.
    /// Returns `None` when the cursor is already at the tip.
    pub fn redo(&mut self, doc: &mut Document) -> Result<Option<ChangeSet>, HistoryError> {
        if !self.open_compounds.is_empty() {
            return Err(HistoryError::CompoundOpen);
        }
        let index = self.resolve_index();
        let max = self.index_max();
        if index >= max {
            return Ok(None);
        }
        let next = index + 1;
        let (first, last) = match self.entries[(next - 1) as usize].command {
            Command::Push => (next, self.matching_pop(next)?),
            Command::Pop => {
                return Err(HistoryError::CursorOnPop { history_id: next });
            }
            _ => (next, next),
        };
        let changes = self.replay_range(doc, first, last, Direction::Redo)?;
        self.cursor = if last >= max { None } else { Some(last) };
        self.notify(&changes);
        Ok(Some(changes))
    }

    /// Label for the next undo step: the entry's message (a pop
    /// borrows its push's), else the host formatter, else a synthetic
    /// "update widget.label" style fallback.
    pub fn describe_undo(&self) -> Option<String> {
        let index = self.resolve_index();
        if index == 0 {
            return None;
        }
        self.describe_entry(index)
    }

    pub fn describe_redo(&self) -> Option<String> {
        let index = self.resolve_index();
        if index >= self.index_max() {
            return None;
        }
        self.describe_entry(index + 1)
    }

    fn describe_entry(&self, history_id: i64) -> Option<String> {
        let mut entry = self.entry(history_id)?;
        if entry.command == Command::Pop {
            if let Some(push) = entry.range_id.and_then(|id| self.entry(id)) {
                entry = push;
            }
        }
        if let Some(message) = &entry.message {
            return Some(message.clone());
        }
        if let Some(formatter) = &self.formatter {
            if let Some(label) = formatter(entry) {
                return Some(label);
            }
        }
        Some(default_label(entry))
    }

    fn matching_push(&self, pop_id: i64) -> Result<i64, HistoryError> {
        let pop = self
            .entry(pop_id)
            .ok_or(HistoryError::RangeOpen { history_id: pop_id })?;
        let push_id = pop
            .range_id
            .ok_or(HistoryError::RangeOpen { history_id: pop_id })?;
        let intact = self
            .entry(push_id)
            .map(|push| push.command == Command::Push && push.range_id == Some(pop_id))
            .unwrap_or(false);
        if !intact {
            return Err(HistoryError::RangeOpen { history_id: pop_id });
        }
        Ok(push_id)
    }

    fn matching_pop(&self, push_id: i64) -> Result<i64, HistoryError> {
        let push = self
            .entry(push_id)
            .ok_or(HistoryError::RangeOpen { history_id: push_id })?;
        let pop_id = push
            .range_id
            .ok_or(HistoryError::RangeOpen { history_id: push_id })?;
        let intact = self
            .entry(pop_id)
            .map(|pop| pop.command == Command::Pop && pop.range_id == Some(push_id))
            .unwrap_or(false);
        if !intact {
            return Err(HistoryError::RangeOpen { history_id: push_id });
        }
        Ok(pop_id)
    }

    /// Replays `[first, last]` with capture suppressed. On failure the
    /// transaction has already rolled back, so the document is intact;
    /// the log can no longer be trusted and is cleared (undo/redo
    /// degrades to unavailable for the session).
    fn replay_range(
        &mut self,
        doc: &mut Document,
        first: i64,
        last: i64,
        direction: Direction,
    ) -> Result<ChangeSet, HistoryError> {
        let enabled = std::mem::replace(&mut self.enabled, false);
        let result = self.apply_range(doc, first, last, direction);
        self.enabled = enabled;
        match result {
            Ok(changes) => Ok(changes),
            Err(err) => {
                self.clear_history();
                Err(err)
            }
        }
    }

    fn apply_range(
        &self,
        doc: &mut Document,
        first: i64,
        last: i64,
        direction: Direction,
    ) -> Result<ChangeSet, HistoryError> {
        let tx = doc.conn.transaction()?;
        // relaxed until commit/rollback so apply ordering inside the
        // range cannot trip referential integrity transiently
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        let mut changes = ChangeSet::default();
        let ids: Vec<i64> = match direction {
            Direction::Redo => (first..=last).collect(),
            Direction::Undo => (first..=last).rev().collect(),
        };
        for id in ids {
            let entry = &self.entries[(id - 1) as usize];
            match entry.command {
                Command::Push | Command::Pop => continue,
                Command::Insert => {
                    let (tracked, image) = self.shadow_image(entry, false)?;
                    match direction {
                        Direction::Undo => {
                            remove_row(&tx, tracked, image, id, &mut changes)?;
                        }
                        Direction::Redo => {
                            restore_row(&tx, tracked, image, &mut changes)?;
                        }
                    }
                }
                Command::Delete => {
                    let (tracked, image) = self.shadow_image(entry, true)?;
                    match direction {
                        Direction::Undo => {
                            restore_row(&tx, tracked, image, &mut changes)?;
                        }
                        Direction::Redo => {
                            remove_row(&tx, tracked, image, id, &mut changes)?;
                        }
                    }
                }
                Command::Update => {
                    let (tracked, image) =
                        self.shadow_image(entry, direction == Direction::Undo)?;
                    let column = entry
                        .column_name
                        .as_deref()
                        .ok_or(HistoryError::EntryCorrupt { history_id: id })?;
                    let column_index = tracked
                        .schema
                        .column_index(column)
                        .ok_or(HistoryError::EntryCorrupt { history_id: id })?;
                    let key = key_of(&tracked.schema, image);
                    let affected = document::update_column(
                        &tx,
                        &tracked.schema,
                        &key,
                        column_index,
                        &image[column_index],
                    )?;
                    if affected == 0 {
                        return Err(HistoryError::ReplayMismatch {
                            table: tracked.schema.name().to_string(),
                            history_id: id,
                        });
                    }
                    changes.table(tracked.schema.name()).updated.push(key);
                }
            }
        }
        tx.commit()?;
        Ok(changes)
    }

    fn shadow_image(
        &self,
        entry: &HistoryEntry,
        is_old: bool,
    ) -> Result<(&TrackedTable, &Vec<Value>), HistoryError> {
        let table = entry
            .table_name
            .as_deref()
            .ok_or(HistoryError::EntryCorrupt {
                history_id: entry.history_id,
            })?;
        let tracked = self.table(table)?;
        let image = tracked
            .shadow
            .get(&(entry.history_id, is_old))
            .ok_or_else(|| HistoryError::ShadowMissing {
                table: table.to_string(),
                history_id: entry.history_id,
            })?;
        Ok((tracked, image))
    }
}

fn key_of(schema: &TableSchema, row: &[Value]) -> Vec<Value> {
    schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.is_primary_key())
        .map(|(index, _)| row[index].clone())
        .collect()
}

fn remove_row(
    conn: &rusqlite::Connection,
    tracked: &TrackedTable,
    image: &[Value],
    history_id: i64,
    changes: &mut ChangeSet,
) -> Result<(), HistoryError> {
    let key = key_of(&tracked.schema, image);
    let affected = document::delete_row(conn, &tracked.schema, &key)?;
    if affected == 0 {
        return Err(HistoryError::ReplayMismatch {
            table: tracked.schema.name().to_string(),
            history_id,
        });
    }
    changes.table(tracked.schema.name()).deleted.push(key);
    Ok(())
}

fn restore_row(
    conn: &rusqlite::Connection,
    tracked: &TrackedTable,
    image: &[Value],
    changes: &mut ChangeSet,
) -> Result<(), HistoryError> {
    document::insert_row(conn, &tracked.schema, image)?;
    changes
        .table(tracked.schema.name())
        .inserted
        .push(image.to_vec());
    Ok(())
}

fn default_label(entry: &HistoryEntry) -> String {
    match (entry.table_name.as_deref(), entry.column_name.as_deref()) {
        (Some(table), Some(column)) => format!("{} {table}.{column}", entry.command.as_str()),
        (Some(table), None) => format!("{} {table}", entry.command.as_str()),
        _ => entry.command.as_str().to_string(),
    }
}
