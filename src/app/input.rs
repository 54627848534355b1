// Convert-form input editing logic.
// - Implements Tab/Shift+Tab traversal, skipping video-only fields for audio output.
// - Left/Right cycles choice fields and moves the cursor in text fields.
// - Keeps output names/extensions normalized and collision-safe.
use std::path::Path;

use crate::{
    convert::{AudioBitrate, ConvertFormat, FrameSize, Rotation, options::cycle},
    media::{
        enforce_output_extension, next_available_output_path,
        output_path_without_numbered_suffix, resolve_output_path,
    },
    model::ConvertField,
};

use super::App;

impl App {
    pub fn next_input(&mut self) {
        self.step_field(true);
    }

    pub fn previous_input(&mut self) {
        self.step_field(false);
    }

    pub(crate) fn field_enabled(&self, field: ConvertField) -> bool {
        !(field.is_video_only() && self.format.is_audio())
    }

    fn step_field(&mut self, forward: bool) {
        let mut field = self.active_field;
        loop {
            field = cycle(&ConvertField::ALL, field, forward);
            if self.field_enabled(field) {
                break;
            }
        }

        self.active_field = field;
        match field {
            ConvertField::Volume => self.volume_cursor = self.options.audio_volume.chars().count(),
            ConvertField::Output => self.output_cursor = self.output_name.chars().count(),
            _ => {}
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.adjust_active_field(false);
    }

    pub fn move_cursor_right(&mut self) {
        self.adjust_active_field(true);
    }

    fn adjust_active_field(&mut self, forward: bool) {
        match self.active_field {
            ConvertField::Format => {
                self.format = cycle(&ConvertFormat::ALL, self.format, forward);
                self.sync_output_extension_to_selected_format();
            }
            ConvertField::FrameSize => {
                self.options.frame_size = cycle(&FrameSize::ALL, self.options.frame_size, forward);
            }
            ConvertField::Rotation => {
                self.options.rotation = cycle(&Rotation::ALL, self.options.rotation, forward);
            }
            ConvertField::AudioBitrate => {
                self.options.audio_bitrate =
                    cycle(&AudioBitrate::ALL, self.options.audio_bitrate, forward);
            }
            ConvertField::Normalize => self.toggle_normalize(),
            ConvertField::Volume => {
                self.volume_cursor =
                    move_cursor(self.volume_cursor, &self.options.audio_volume, forward);
            }
            ConvertField::Output => {
                self.output_cursor = move_cursor(self.output_cursor, &self.output_name, forward);
            }
        }
    }

    pub fn toggle_normalize(&mut self) {
        self.options.normalize_volume = !self.options.normalize_volume;
    }

    pub fn push_active_input_char(&mut self, ch: char) {
        match self.active_field {
            ConvertField::Volume => {
                let volume = &mut self.options.audio_volume;
                if ch.is_ascii_digit() || (ch == '.' && !volume.contains('.')) {
                    let byte_index = byte_index_for_char(volume, self.volume_cursor);
                    volume.insert(byte_index, ch);
                    self.volume_cursor += 1;
                }
            }
            ConvertField::Output => {
                let byte_index = byte_index_for_char(&self.output_name, self.output_cursor);
                self.output_name.insert(byte_index, ch);
                self.output_cursor += 1;
            }
            ConvertField::Normalize if ch == ' ' => self.toggle_normalize(),
            _ => {}
        }
    }

    pub fn backspace_active_input(&mut self) {
        match self.active_field {
            ConvertField::Volume => {
                remove_char_before(&mut self.options.audio_volume, &mut self.volume_cursor);
            }
            ConvertField::Output => {
                remove_char_before(&mut self.output_name, &mut self.output_cursor);
            }
            _ => {}
        }
    }

    fn sync_output_extension_to_selected_format(&mut self) {
        if self.output_name.trim().is_empty() {
            return;
        }

        if let Some(input_path) = self.source.as_ref().map(|source| source.path.clone()) {
            self.sync_output_name_to_available_for_path(&input_path);
            return;
        }

        self.output_name = enforce_output_extension(&self.output_name, self.format.extension());
        self.output_cursor = self.output_cursor.min(self.output_name.chars().count());
    }

    pub(super) fn sync_output_name_to_available_for_path(&mut self, input_path: &Path) {
        let requested_output_name =
            enforce_output_extension(&self.output_name, self.format.extension());
        let requested_output_path = resolve_output_path(input_path, &requested_output_name);
        let normalized_output_path = output_path_without_numbered_suffix(&requested_output_path);
        let available_output_path = next_available_output_path(&normalized_output_path);
        self.sync_output_name_with_path(&requested_output_name, &available_output_path);
    }

    pub(super) fn sync_output_name_with_path(
        &mut self,
        requested_output_name: &str,
        resolved_path: &Path,
    ) {
        let requested = Path::new(requested_output_name);
        let requested_has_path = requested.is_absolute()
            || requested_output_name.contains('/')
            || requested_output_name.contains('\\');

        self.output_name = if requested_has_path {
            resolved_path.display().to_string()
        } else {
            resolved_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| resolved_path.display().to_string())
        };
        self.output_cursor = self.output_name.chars().count();
    }
}

fn move_cursor(cursor: usize, value: &str, forward: bool) -> usize {
    if forward {
        (cursor + 1).min(value.chars().count())
    } else {
        cursor.saturating_sub(1)
    }
}

pub(super) fn remove_char_before(value: &mut String, cursor: &mut usize) {
    if *cursor == 0 {
        return;
    }

    let remove_char_index = *cursor - 1;
    let start = byte_index_for_char(value, remove_char_index);
    let end = byte_index_for_char(value, remove_char_index + 1);
    value.replace_range(start..end, "");
    *cursor -= 1;
}

pub(super) fn byte_index_for_char(input: &str, char_index: usize) -> usize {
    if char_index == 0 {
        return 0;
    }

    input
        .char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(input.len())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::app::test_support::app_in;

    #[test]
    fn audio_output_skips_video_only_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        app.next_input();
        assert_eq!(app.active_field, ConvertField::FrameSize);

        app.active_field = ConvertField::Format;
        app.move_cursor_right();
        assert_eq!(app.format, ConvertFormat::Mp3);
        app.next_input();
        assert_eq!(app.active_field, ConvertField::AudioBitrate);
        app.previous_input();
        assert_eq!(app.active_field, ConvertField::Format);
    }

    #[test]
    fn choice_fields_cycle_with_left_and_right() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        app.active_field = ConvertField::FrameSize;
        app.move_cursor_left();
        assert_eq!(app.options.frame_size, FrameSize::P1080);

        app.active_field = ConvertField::Normalize;
        app.push_active_input_char(' ');
        assert!(app.options.normalize_volume);
    }

    #[test]
    fn volume_accepts_only_a_decimal_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.active_field = ConvertField::Volume;
        app.volume_cursor = app.options.audio_volume.chars().count();

        for ch in ".5x.2".chars() {
            app.push_active_input_char(ch);
        }
        assert_eq!(app.options.audio_volume, "1.52");

        app.backspace_active_input();
        assert_eq!(app.options.audio_volume, "1.5");
    }

    #[test]
    fn switching_format_rewrites_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("talk.mov"), b"").unwrap();
        fs::write(dir.path().join("talk.mp3"), b"").unwrap();
        let mut app = app_in(&dir);
        app.select_path(&dir.path().join("talk.mov"));
        app.activate_selected_entry().unwrap();
        assert_eq!(app.output_name, "talk.mp4");

        app.active_field = ConvertField::Format;
        app.move_cursor_right();
        assert_eq!(app.output_name, "talk (1).mp3");
    }

    #[test]
    fn byte_index_handles_multibyte_chars() {
        assert_eq!(byte_index_for_char("héllo", 2), 3);
        assert_eq!(byte_index_for_char("abc", 10), 3);
    }
}
