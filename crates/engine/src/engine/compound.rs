#![forbid(unsafe_code)]

use super::HistoryEngine;
use crate::error::HistoryError;
use sl_core::{Command, HistoryEntry};

impl HistoryEngine {
    /// Open a compound operation. Everything captured until the
    /// matching `end()` undoes and redoes as one step. Brackets nest.
    pub fn begin(&mut self, message: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.truncate_redo();
        let id = self.next_id();
        self.entries
            .push(HistoryEntry::marker(id, Command::Push, Some(message.into())));
        self.open_compounds.push(id);
    }

    /// Close the innermost open compound operation, cross-referencing
    /// the push and pop markers.
    pub fn end(&mut self) -> Result<(), HistoryError> {
        if !self.enabled {
            return Ok(());
        }
        let push_id = self
            .open_compounds
            .pop()
            .ok_or(HistoryError::UnbalancedPop)?;
        let push_intact = self
            .entry(push_id)
            .map(|entry| entry.command == Command::Push)
            .unwrap_or(false);
        if !push_intact {
            // the opening marker was truncated away under us
            return Err(HistoryError::RangeOpen {
                history_id: push_id,
            });
        }
        let id = self.next_id();
        let mut pop = HistoryEntry::marker(id, Command::Pop, None);
        pop.range_id = Some(push_id);
        self.entries.push(pop);
        self.entries[(push_id - 1) as usize].range_id = Some(id);
        Ok(())
    }
}
