// Central application state shared by the app submodules.
// - Stores playlist state, convert form inputs, tab/focus state, and output logs.
// - Owns the conversion sequencer and the rename history.
// - Exposes cross-cutting helpers used by event handling and rendering code.
mod convert;
mod files;
mod input;
mod renames;
mod tool_output;

use std::{
    cell::Cell,
    io,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::{
    config::Config,
    convert::{ConvertFormat, ConvertOptions, MediaMetadata, Sequencer, StdFs, SystemLauncher},
    model::{ConvertField, FileEntry, Focus, RightTab, SortOrder},
    rename::RenameEditor,
};

use self::files::{EntryIds, read_entries};
use self::tool_output::ToolOutput;

const RUN_LOG_FILE: &str = "convert_runs.log";
const KEYBINDS_PAGE_STEP: usize = 10;

pub struct App {
    pub(crate) cwd: PathBuf,
    initial_dir: PathBuf,
    pub(crate) entries: Vec<FileEntry>,
    pub(crate) selected: usize,
    pub(crate) sort_order: SortOrder,
    entry_ids: EntryIds,
    file_browser_visible_rows: Cell<usize>,
    pub(crate) source: Option<SelectedSource>,
    pub(crate) format: ConvertFormat,
    pub(crate) options: ConvertOptions,
    pub(crate) volume_cursor: usize,
    pub(crate) output_name: String,
    pub(crate) output_cursor: usize,
    pub(crate) active_field: ConvertField,
    pub(crate) status_message: String,
    pub(crate) convert_output: ToolOutput,
    pub(crate) renames: RenameEditor,
    rename_prompt: Option<RenamePrompt>,
    ffmpeg_available: bool,
    run_log_path: PathBuf,
    pub(crate) show_keybinds: bool,
    keybinds_scroll: Cell<usize>,
    pub(crate) spinner_frame: usize,
    right_tab: RightTab,
    pending_cancel: bool,
    sequencer: Sequencer<SystemLauncher, StdFs>,
}

/// The media file chosen as conversion input.
pub(crate) struct SelectedSource {
    pub(crate) path: PathBuf,
    pub(crate) metadata: Option<MediaMetadata>,
    pub(crate) probe_error: Option<String>,
}

struct RenamePrompt {
    entry_id: Uuid,
    path: PathBuf,
    original_name: String,
    cursor: usize,
}

impl App {
    pub fn new(config: &Config, ffmpeg_available: bool) -> io::Result<Self> {
        let cwd = config.start_dir.clone();
        let sort_order = SortOrder::NameAsc;
        let mut entry_ids = EntryIds::default();
        let entries = read_entries(&cwd, &mut entry_ids, sort_order)?;
        let status_message = if ffmpeg_available {
            "Select a media file in the left pane.".to_string()
        } else {
            format!(
                "{} was not found. Conversion is disabled.",
                config.tools.ffmpeg.display()
            )
        };

        Ok(Self {
            cwd: cwd.clone(),
            initial_dir: cwd,
            entries,
            selected: 0,
            sort_order,
            entry_ids,
            file_browser_visible_rows: Cell::new(0),
            source: None,
            format: ConvertFormat::Mp4,
            options: ConvertOptions::default(),
            volume_cursor: 1,
            output_name: String::new(),
            output_cursor: 0,
            active_field: ConvertField::Format,
            status_message,
            convert_output: ToolOutput::empty(),
            renames: RenameEditor::new(),
            rename_prompt: None,
            ffmpeg_available,
            run_log_path: config.log_dir.join(RUN_LOG_FILE),
            show_keybinds: false,
            keybinds_scroll: Cell::new(0),
            spinner_frame: 0,
            right_tab: RightTab::Convert,
            pending_cancel: false,
            sequencer: Sequencer::new(SystemLauncher, StdFs, config.tools.clone()),
        })
    }

    pub fn toggle_keybinds(&mut self) {
        self.show_keybinds = !self.show_keybinds;
        self.keybinds_scroll.set(0);
    }

    pub fn hide_keybinds(&mut self) {
        self.show_keybinds = false;
    }

    pub fn scroll_keybinds_down(&mut self) {
        self.keybinds_scroll.set(self.keybinds_scroll.get().saturating_add(1));
    }

    pub fn scroll_keybinds_up(&mut self) {
        self.keybinds_scroll.set(self.keybinds_scroll.get().saturating_sub(1));
    }

    pub fn page_keybinds_down(&mut self) {
        self.keybinds_scroll
            .set(self.keybinds_scroll.get().saturating_add(KEYBINDS_PAGE_STEP));
    }

    pub fn page_keybinds_up(&mut self) {
        self.keybinds_scroll
            .set(self.keybinds_scroll.get().saturating_sub(KEYBINDS_PAGE_STEP));
    }

    pub(crate) fn clamp_keybinds_scroll(&self, max_scroll_top: usize) -> usize {
        let clamped = self.keybinds_scroll.get().min(max_scroll_top);
        self.keybinds_scroll.set(clamped);
        clamped
    }

    pub fn tick(&mut self) {
        if !self.sequencer.is_busy() {
            return;
        }

        self.spinner_frame = (self.spinner_frame + 1) % spinner_frames().len();
        for event in self.sequencer.poll() {
            self.handle_sequencer_event(event);
        }
    }

    pub fn ffmpeg_available(&self) -> bool {
        self.ffmpeg_available
    }

    pub fn is_converting(&self) -> bool {
        self.sequencer.is_busy()
    }

    pub(crate) fn conversion_stage_label(&self) -> Option<&'static str> {
        self.sequencer.stage().map(|stage| stage.label())
    }

    pub(crate) fn spinner(&self) -> char {
        spinner_frames()[self.spinner_frame % spinner_frames().len()]
    }

    pub(crate) fn run_log_path(&self) -> &Path {
        &self.run_log_path
    }

    pub fn right_tab(&self) -> RightTab {
        self.right_tab
    }

    pub fn select_next_right_tab(&mut self) {
        self.right_tab = self.right_tab.next();
    }

    pub fn select_right_tab_by_number(&mut self, number: usize) -> bool {
        let Some(tab) = RightTab::from_number(number) else {
            return false;
        };
        self.right_tab = tab;
        true
    }

    pub fn should_treat_char_as_form_input(&self, focus: Focus) -> bool {
        focus == Focus::RightTop
            && self.right_tab == RightTab::Convert
            && matches!(self.active_field, ConvertField::Volume | ConvertField::Output)
    }

    pub fn can_focus_right_bottom(&self) -> bool {
        self.right_tab == RightTab::Convert
    }

    pub fn normalize_focus(&self, focus: &mut Focus) {
        if !self.can_focus_right_bottom() && *focus == Focus::RightBottom {
            *focus = Focus::RightTop;
        }
    }

    pub fn next_focus(&self, current: Focus) -> Focus {
        if self.can_focus_right_bottom() {
            current.next_window()
        } else {
            match current {
                Focus::Left => Focus::RightTop,
                Focus::RightTop | Focus::RightBottom => Focus::Left,
            }
        }
    }

    pub fn previous_focus(&self, current: Focus) -> Focus {
        if self.can_focus_right_bottom() {
            current.previous_window()
        } else {
            match current {
                Focus::Left => Focus::RightTop,
                Focus::RightTop | Focus::RightBottom => Focus::Left,
            }
        }
    }

    pub fn has_pending_cancel(&self) -> bool {
        self.pending_cancel
    }

    pub fn request_cancel(&mut self) {
        if self.sequencer.is_busy() {
            self.pending_cancel = true;
        } else {
            self.status_message = "No running conversion to cancel.".to_string();
        }
    }

    pub fn cancel_pending_cancel(&mut self) {
        self.pending_cancel = false;
    }

    pub fn confirm_pending_cancel(&mut self) {
        if std::mem::take(&mut self.pending_cancel) {
            self.cancel_conversion();
        }
    }
}

fn spinner_frames() -> &'static [char] {
    &['|', '/', '-', '\\']
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use crate::{config::Config, convert::ToolPaths};

    use super::App;

    /// App rooted in a fresh temp dir with ffmpeg reported missing.
    pub(crate) fn app_in(dir: &TempDir) -> App {
        let config = Config {
            start_dir: dir.path().to_path_buf(),
            tools: ToolPaths {
                ffmpeg: "ffmpeg".into(),
                ffprobe: "ffprobe".into(),
            },
            log_dir: dir.path().join("logs"),
        };
        App::new(&config, false).unwrap()
    }
}
