// Rename workflow for playlist items.
// - Drives the rename history from the prompt and the u/U keys.
// - Applies each history step to the filesystem; a step that cannot be
//   applied is rolled back so history always matches what is on disk.
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};
use uuid::Uuid;

use super::{
    App, RenamePrompt,
    input::{byte_index_for_char, remove_char_before},
};

impl App {
    pub fn has_rename_prompt(&self) -> bool {
        self.rename_prompt.is_some()
    }

    /// Buffer, cursor, and original name for the prompt modal.
    pub(crate) fn rename_prompt_view(&self) -> Option<(&str, usize, &str)> {
        self.rename_prompt.as_ref().map(|prompt| {
            (
                self.renames.current().name.as_str(),
                prompt.cursor,
                prompt.original_name.as_str(),
            )
        })
    }

    pub fn begin_rename_selected(&mut self) {
        let Some(entry) = self.selected_entry().cloned() else {
            self.status_message = "No entry selected.".to_string();
            return;
        };
        if entry.is_dir {
            self.status_message = "Rename is only supported for files.".to_string();
            return;
        }
        if self.is_converting() {
            self.status_message = "Wait for the running conversion before renaming.".to_string();
            return;
        }

        self.renames.begin(&entry.id.to_string(), &entry.name);
        self.rename_prompt = Some(RenamePrompt {
            entry_id: entry.id,
            path: entry.path,
            cursor: entry.name.chars().count(),
            original_name: entry.name,
        });
    }

    pub fn push_rename_char(&mut self, ch: char) {
        let Some(prompt) = self.rename_prompt.as_mut() else {
            return;
        };

        let mut name = self.renames.current().name.clone();
        name.insert(byte_index_for_char(&name, prompt.cursor), ch);
        prompt.cursor += 1;
        self.renames.update(&name);
    }

    pub fn backspace_rename(&mut self) {
        let Some(prompt) = self.rename_prompt.as_mut() else {
            return;
        };

        let mut name = self.renames.current().name.clone();
        remove_char_before(&mut name, &mut prompt.cursor);
        self.renames.update(&name);
    }

    pub fn move_rename_cursor(&mut self, forward: bool) {
        let len = self.renames.current().name.chars().count();
        if let Some(prompt) = self.rename_prompt.as_mut() {
            prompt.cursor = if forward {
                (prompt.cursor + 1).min(len)
            } else {
                prompt.cursor.saturating_sub(1)
            };
        }
    }

    pub fn cancel_rename(&mut self) {
        if self.rename_prompt.take().is_some() {
            self.renames.rollback();
            self.status_message = "Rename cancelled.".to_string();
        }
    }

    /// Moves the file, then closes the edit. Any failure rolls the edit back.
    pub fn commit_rename(&mut self) {
        let Some(prompt) = self.rename_prompt.take() else {
            return;
        };

        let new_name = self.renames.current().name.trim().to_string();
        if new_name.is_empty() || new_name == prompt.original_name {
            self.renames.rollback();
            self.status_message = "Name unchanged.".to_string();
            return;
        }
        if new_name.contains(['/', '\\']) {
            self.renames.rollback();
            self.status_message = "A file name cannot contain path separators.".to_string();
            return;
        }

        self.renames.update(&new_name);
        match self.move_entry(prompt.entry_id, &prompt.path, &new_name) {
            Ok(target) => {
                self.renames.end();
                self.status_message = format!("Renamed {} to {new_name}", prompt.original_name);
                self.after_move(&target);
            }
            Err(err) => {
                self.renames.rollback();
                self.status_message = format!("Rename failed: {err}");
            }
        }
    }

    pub fn undo_rename(&mut self) {
        let step = self.renames.undo().cloned();
        self.apply_history_step(step, "Undid rename");
    }

    pub fn redo_rename(&mut self) {
        let step = self.renames.redo().cloned();
        self.apply_history_step(step, "Redid rename");
    }

    fn apply_history_step(
        &mut self,
        step: Result<crate::rename::RenameData, crate::error::RenameError>,
        verb: &str,
    ) {
        let step = match step {
            Ok(step) => step,
            Err(err) => {
                self.status_message = err.to_string();
                return;
            }
        };

        let located = Uuid::parse_str(&step.id)
            .ok()
            .and_then(|id| Some((id, self.entry_ids.path_of(&id)?.to_path_buf())));
        let Some((id, path)) = located else {
            self.renames.rollback();
            self.status_message = format!("{verb} failed: the file is no longer tracked");
            return;
        };

        match self.move_entry(id, &path, &step.name) {
            Ok(target) => {
                self.status_message = format!("{verb}: {}", step.name);
                self.after_move(&target);
            }
            Err(err) => {
                self.renames.rollback();
                self.status_message = format!("{verb} failed: {err}");
            }
        }
    }

    /// Renames `path` to `new_name` in the same directory without replacing anything.
    fn move_entry(&mut self, id: Uuid, path: &Path, new_name: &str) -> io::Result<PathBuf> {
        let target = path.with_file_name(new_name);
        if target == path {
            return Ok(target);
        }
        if target.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ));
        }

        if let Err(err) = fs::rename(path, &target) {
            warn!(from = %path.display(), to = %target.display(), %err, "rename failed");
            return Err(err);
        }
        info!(from = %path.display(), to = %target.display(), "renamed");

        self.entry_ids.moved(id, target.clone());
        if let Some(source) = self.source.as_mut()
            && source.path == path
        {
            source.path = target.clone();
        }
        Ok(target)
    }

    fn after_move(&mut self, target: &Path) {
        if let Err(err) = self.reload() {
            self.status_message
                .push_str(&format!(" (browser refresh failed: {err})"));
            return;
        }
        self.select_path(target);
    }
}
