// Rename history for playlist items.
// - Tracks one in-progress text edit plus undo/redo stacks of completed edits.
// - Knows nothing about the filesystem: callers apply `current()` and call
//   `rollback()` when applying it fails or the user abandons the edit.
use std::collections::VecDeque;

use crate::error::RenameError;

/// Oldest editions are dropped once the undo stack grows past this.
pub const HISTORY_LIMIT: usize = 256;

/// One rename. `new_value` is `None` while the edit is still open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub id: String,
    pub old_value: String,
    pub new_value: Option<String>,
}

impl Edition {
    fn is_open(&self) -> bool {
        self.new_value.is_none()
    }

    fn committed_value(&self) -> &str {
        self.new_value.as_deref().unwrap_or(&self.old_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Edit,
    Undo,
    Redo,
}

/// The live value shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameData {
    pub id: String,
    pub name: String,
}

#[derive(Debug)]
pub struct RenameEditor {
    undo_stack: VecDeque<Edition>,
    redo_stack: Vec<Edition>,
    mode: EditMode,
    current: RenameData,
}

impl Default for RenameEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl RenameEditor {
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            mode: EditMode::Edit,
            current: RenameData::default(),
        }
    }

    /// Opens a new edit. An edit that is still open gets committed first.
    pub fn begin(&mut self, id: &str, current_name: &str) {
        if self.has_open_edit() {
            self.end();
        }

        self.mode = EditMode::Edit;
        self.redo_stack.clear();
        self.push_undo(Edition {
            id: id.to_string(),
            old_value: current_name.to_string(),
            new_value: None,
        });
        self.current = RenameData {
            id: id.to_string(),
            name: current_name.to_string(),
        };
    }

    pub fn update(&mut self, new_name: &str) {
        self.current.name = new_name.to_string();
    }

    /// Commits the open edit with the buffered name.
    pub fn end(&mut self) {
        if self.mode != EditMode::Edit {
            return;
        }
        let Some(top) = self.undo_stack.back_mut() else {
            return;
        };
        if !top.is_open() {
            return;
        }

        top.new_value = Some(self.current.name.clone());
        self.current = RenameData {
            id: top.id.clone(),
            name: top.committed_value().to_string(),
        };
    }

    pub fn undo(&mut self) -> Result<&RenameData, RenameError> {
        let edition = self.undo_stack.pop_back().ok_or(RenameError::NothingToUndo)?;

        self.mode = EditMode::Undo;
        self.current = RenameData {
            id: edition.id.clone(),
            name: edition.old_value.clone(),
        };
        self.redo_stack.push(edition);

        Ok(&self.current)
    }

    pub fn redo(&mut self) -> Result<&RenameData, RenameError> {
        let edition = self.redo_stack.pop().ok_or(RenameError::NothingToRedo)?;

        self.mode = EditMode::Redo;
        self.current = RenameData {
            id: edition.id.clone(),
            name: edition.committed_value().to_string(),
        };
        self.push_undo(edition);

        Ok(&self.current)
    }

    /// Reverts whatever the last begin/undo/redo did.
    pub fn rollback(&mut self) {
        let reverted = match self.mode {
            EditMode::Edit => {
                if self.has_open_edit() {
                    self.undo_stack.pop_back()
                } else {
                    None
                }
            }
            EditMode::Undo => self.redo_stack.pop().map(|edition| {
                self.push_undo(edition.clone());
                edition
            }),
            EditMode::Redo => self.undo_stack.pop_back().map(|edition| {
                self.redo_stack.push(edition.clone());
                edition
            }),
        };

        self.mode = EditMode::Edit;
        if let Some(edition) = reverted {
            self.current = RenameData {
                id: edition.id,
                name: edition.old_value,
            };
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn has_open_edit(&self) -> bool {
        self.mode == EditMode::Edit && self.undo_stack.back().is_some_and(Edition::is_open)
    }

    pub fn current(&self) -> &RenameData {
        &self.current
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Undo entries, most recent first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &Edition> {
        self.undo_stack.iter().rev()
    }

    /// Redo entries, most recent first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &Edition> {
        self.redo_stack.iter().rev()
    }

    fn push_undo(&mut self, edition: Edition) {
        self.undo_stack.push_back(edition);
        while self.undo_stack.len() > HISTORY_LIMIT {
            self.undo_stack.pop_front();
        }
    }
}
