// Playlist behavior for the left pane.
// - Reads/sorts directory entries and manages selection movement.
// - Gives every listed item an id that survives reloads and renames.
// - Handles directory navigation and picks the conversion source.
use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    convert::probe::probe_media,
    media::{default_output_name, is_media_file},
    model::{FileEntry, RightTab, SortOrder, compare_entries},
};

use super::{App, SelectedSource};

/// Path <-> id registry. Ids are handed out on first sight and follow renames.
#[derive(Debug, Default)]
pub(super) struct EntryIds {
    by_path: HashMap<PathBuf, Uuid>,
    by_id: HashMap<Uuid, PathBuf>,
}

impl EntryIds {
    pub(super) fn id_for(&mut self, path: &Path) -> Uuid {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }

        let id = Uuid::new_v4();
        self.by_path.insert(path.to_path_buf(), id);
        self.by_id.insert(id, path.to_path_buf());
        id
    }

    pub(super) fn path_of(&self, id: &Uuid) -> Option<&Path> {
        self.by_id.get(id).map(PathBuf::as_path)
    }

    pub(super) fn moved(&mut self, id: Uuid, new_path: PathBuf) {
        if let Some(old_path) = self.by_id.insert(id, new_path.clone()) {
            self.by_path.remove(&old_path);
        }
        self.by_path.insert(new_path, id);
    }

    /// Forgets every id for which `keep` is false.
    pub(super) fn retain(&mut self, keep: impl Fn(&Uuid) -> bool) {
        self.by_id.retain(|id, _| keep(id));
        self.by_path.retain(|_, id| keep(id));
    }
}

impl App {
    pub fn next(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
        } else {
            self.selected = (self.selected + 1).min(self.entries.len().saturating_sub(1));
        }
    }

    pub fn previous(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    pub fn page_files_down(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
            return;
        }

        let max_index = self.entries.len().saturating_sub(1);
        let step = self.file_browser_page_step();
        self.selected = (self.selected + step).min(max_index);
    }

    pub fn page_files_up(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
            return;
        }

        let step = self.file_browser_page_step();
        self.selected = self.selected.saturating_sub(step);
    }

    pub(crate) fn set_file_browser_visible_rows(&self, rows: usize) {
        self.file_browser_visible_rows.set(rows);
    }

    fn file_browser_page_step(&self) -> usize {
        self.file_browser_visible_rows.get().saturating_sub(1).max(1)
    }

    pub fn reload(&mut self) -> io::Result<()> {
        let selected_id = self.selected_entry().map(|entry| entry.id);
        self.entries = read_entries(&self.cwd, &mut self.entry_ids, self.sort_order)?;
        self.prune_entry_ids();

        if let Some(index) =
            selected_id.and_then(|id| self.entries.iter().position(|entry| entry.id == id))
        {
            self.selected = index;
        } else if self.entries.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }
        Ok(())
    }

    pub fn cycle_sort_order(&mut self) -> io::Result<()> {
        self.sort_order = self.sort_order.next();
        self.reload()?;
        self.status_message = format!("Sorted by {}", self.sort_order.label());
        Ok(())
    }

    pub fn activate_selected_entry(&mut self) -> io::Result<()> {
        let Some(entry) = self.selected_entry().cloned() else {
            return Ok(());
        };

        if entry.is_dir {
            return self.change_dir(entry.path);
        }

        if is_media_file(&entry.path) {
            self.select_source(entry.path);
        } else {
            self.status_message = format!("Not a supported media file: {}", entry.name);
        }
        Ok(())
    }

    pub fn go_parent_dir(&mut self) -> io::Result<()> {
        let Some(parent) = self.cwd.parent() else {
            return Ok(());
        };
        self.change_dir(parent.to_path_buf())
    }

    pub fn go_initial_dir(&mut self) -> io::Result<()> {
        self.change_dir(self.initial_dir.clone())
    }

    pub fn scroll_convert_output_down(&mut self) {
        self.convert_output.scroll_down();
    }

    pub fn scroll_convert_output_up(&mut self) {
        self.convert_output.scroll_up();
    }

    pub fn page_convert_output_down(&mut self) {
        self.convert_output.page_down();
    }

    pub fn page_convert_output_up(&mut self) {
        self.convert_output.page_up();
    }

    fn change_dir(&mut self, new_cwd: PathBuf) -> io::Result<()> {
        let entries = read_entries(&new_cwd, &mut self.entry_ids, self.sort_order)?;
        debug!(dir = %new_cwd.display(), count = entries.len(), "changed directory");
        self.cwd = new_cwd;
        self.entries = entries;
        self.selected = 0;
        self.prune_entry_ids();
        Ok(())
    }

    /// Keeps ids that are listed or still referenced by rename history.
    fn prune_entry_ids(&mut self) {
        let mut keep = self.entries.iter().map(|entry| entry.id).collect::<HashSet<_>>();
        let history_ids = self
            .renames
            .undo_entries()
            .chain(self.renames.redo_entries())
            .map(|edition| edition.id.as_str())
            .chain([self.renames.current().id.as_str()])
            .filter_map(|id| Uuid::parse_str(id).ok());
        keep.extend(history_ids);
        self.entry_ids.retain(|id| keep.contains(id));
    }

    pub(super) fn refresh_file_browser_after_save(&mut self, output_path: &Path) -> io::Result<()> {
        self.reload()?;
        self.select_path(output_path);
        Ok(())
    }

    pub(super) fn select_path(&mut self, path: &Path) {
        if let Some(index) = self.entries.iter().position(|entry| entry.path == path) {
            self.selected = index;
        }
    }

    pub(super) fn select_source(&mut self, path: PathBuf) {
        self.right_tab = RightTab::Convert;

        let (metadata, probe_error) = if self.ffmpeg_available {
            match probe_media(&self.sequencer.tools().ffprobe, &path) {
                Ok(metadata) => (Some(metadata), None),
                Err(err) => {
                    warn!(path = %path.display(), %err, "probe failed");
                    (None, Some(err.to_string()))
                }
            }
        } else {
            (None, Some("ffprobe unavailable".to_string()))
        };

        self.status_message = match &probe_error {
            None => format!("Selected media: {}", path.display()),
            Some(err) => format!("Selected media (metadata unavailable): {} ({err})", path.display()),
        };
        self.output_name = default_output_name(&path, self.format.extension());
        self.sync_output_name_to_available_for_path(&path);
        self.source = Some(SelectedSource {
            path,
            metadata,
            probe_error,
        });
    }

    pub(crate) fn selected_entry(&self) -> Option<&FileEntry> {
        self.entries.get(self.selected)
    }
}

pub(super) fn read_entries(
    dir: &Path,
    ids: &mut EntryIds,
    order: SortOrder,
) -> io::Result<Vec<FileEntry>> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            let metadata = entry.metadata().ok();
            let size_bytes = metadata
                .as_ref()
                .filter(|_| !is_dir)
                .map(|meta| meta.len());
            let modified = metadata.and_then(|meta| meta.modified().ok());

            FileEntry {
                id: ids.id_for(&path),
                name,
                path,
                is_dir,
                size_bytes,
                modified,
            }
        })
        .collect::<Vec<_>>();

    entries.sort_by(|a, b| compare_entries(a, b, order));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::app_in;

    #[test]
    fn ids_are_stable_across_reloads_and_follow_moves() {
        let mut ids = EntryIds::default();
        let first = ids.id_for(Path::new("/m/a.mp3"));
        assert_eq!(ids.id_for(Path::new("/m/a.mp3")), first);

        ids.moved(first, PathBuf::from("/m/b.mp3"));
        assert_eq!(ids.path_of(&first), Some(Path::new("/m/b.mp3")));
        assert_eq!(ids.id_for(Path::new("/m/b.mp3")), first);
        assert_ne!(ids.id_for(Path::new("/m/a.mp3")), first);
    }

    #[test]
    fn listing_puts_directories_first_and_keeps_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.mp4"), b"").unwrap();
        fs::create_dir(dir.path().join("zz")).unwrap();

        let mut ids = EntryIds::default();
        let first = read_entries(dir.path(), &mut ids, SortOrder::NameAsc).unwrap();
        let names = first.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["zz", "a.mp4", "b.mp3"]);

        let second = read_entries(dir.path(), &mut ids, SortOrder::NameDesc).unwrap();
        let names = second.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["zz", "b.mp3", "a.mp4"]);
        assert_eq!(first[1].id, second[2].id);
    }

    #[test]
    fn selecting_media_sets_numbered_default_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip.mov"), b"").unwrap();
        fs::write(dir.path().join("clip.mp4"), b"").unwrap();
        let mut app = app_in(&dir);

        app.select_path(&dir.path().join("clip.mov"));
        app.activate_selected_entry().unwrap();

        let source = app.source.as_ref().unwrap();
        assert_eq!(source.path, dir.path().join("clip.mov"));
        assert!(source.metadata.is_none());
        assert_eq!(app.output_name, "clip (1).mp4");
    }

    #[test]
    fn non_media_files_are_not_selectable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let mut app = app_in(&dir);

        app.activate_selected_entry().unwrap();
        assert!(app.source.is_none());
        assert!(app.status_message.contains("notes.txt"));
    }

    #[test]
    fn ids_of_unlisted_items_are_dropped_unless_in_rename_history() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("music")).unwrap();
        fs::write(dir.path().join("music").join("song.mp3"), b"").unwrap();
        fs::write(dir.path().join("take.mp3"), b"").unwrap();
        let mut app = app_in(&dir);

        app.select_path(&dir.path().join("take.mp3"));
        app.begin_rename_selected();
        app.push_rename_char('2');
        app.commit_rename();
        let renamed = app.selected_entry().unwrap().id;

        app.select_path(&dir.path().join("music"));
        app.activate_selected_entry().unwrap();
        let song = app.entries[0].id;
        app.go_parent_dir().unwrap();

        assert_eq!(app.entry_ids.path_of(&song), None);
        assert_eq!(
            app.entry_ids.path_of(&renamed),
            Some(dir.path().join("take.mp32").as_path())
        );

        app.undo_rename();
        assert!(dir.path().join("take.mp3").exists());
    }

    #[test]
    fn entering_a_directory_lists_its_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("music")).unwrap();
        fs::write(dir.path().join("music").join("song.mp3"), b"").unwrap();
        let mut app = app_in(&dir);

        app.activate_selected_entry().unwrap();
        assert_eq!(app.cwd, dir.path().join("music"));
        assert_eq!(app.entries.len(), 1);

        app.go_initial_dir().unwrap();
        assert_eq!(app.cwd, dir.path());
    }
}
