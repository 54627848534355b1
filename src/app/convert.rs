// Conversion workflow for the Convert tab.
// - Validates the form and turns it into a conversion request.
// - Feeds sequencer events into the log panel and the status line.
// - Appends a transcript of every external process run to convert_runs.log.
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::warn;

use crate::{
    convert::{ConvertRequest, SequencerEvent, options::parse_volume_multiplier},
    error::ConvertError,
    media::{enforce_output_extension, next_available_output_path, resolve_output_path},
};

use super::App;

const SHUTDOWN_POLLS: usize = 100;

impl App {
    pub fn run_conversion(&mut self) {
        if !self.ffmpeg_available() {
            self.status_message =
                "ffmpeg was not found. Install ffmpeg to enable conversion.".to_string();
            return;
        }

        let Some(source_path) = self.source.as_ref().map(|source| source.path.clone()) else {
            self.status_message = "No media selected. Choose one in the left pane.".to_string();
            return;
        };

        let Some(volume) = parse_volume_multiplier(&self.options.audio_volume) else {
            self.status_message = "Volume must be a positive number (1 keeps the level).".to_string();
            return;
        };

        let output_name = enforce_output_extension(&self.output_name, self.format.extension());
        if output_name.is_empty() {
            self.status_message = "Output file name is required.".to_string();
            return;
        }

        let requested_path = resolve_output_path(&source_path, &output_name);
        if requested_path == source_path {
            self.status_message = "Output would overwrite the source file.".to_string();
            return;
        }
        let destination = next_available_output_path(&requested_path);
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            self.status_message = format!("Output folder does not exist: {}", parent.display());
            return;
        }
        self.sync_output_name_with_path(&output_name, &destination);

        let mut options = self.options.clone();
        options.audio_volume = volume;
        let request = ConvertRequest {
            source_path: source_path.clone(),
            destination_path: destination.clone(),
            format: self.format,
            options,
        };

        match self.sequencer.start(request) {
            Ok(events) => {
                self.spinner_frame = 0;
                self.convert_output.begin_run(format!(
                    "{} -> {} ({})",
                    source_path.display(),
                    destination.display(),
                    self.format.label()
                ));
                for event in events {
                    self.handle_sequencer_event(event);
                }
            }
            Err(err) => {
                self.status_message = err.to_string();
            }
        }
    }

    pub(super) fn cancel_conversion(&mut self) {
        if self.sequencer.cancel() {
            self.status_message = "Cancelling conversion...".to_string();
        } else {
            self.status_message = "No running conversion to cancel.".to_string();
        }
    }

    /// Stops a running conversion before exit so no partial output is left behind.
    pub fn shutdown(&mut self) {
        if !self.sequencer.cancel() {
            return;
        }
        for _ in 0..SHUTDOWN_POLLS {
            for event in self.sequencer.poll() {
                self.handle_sequencer_event(event);
            }
            if !self.sequencer.is_busy() {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
        warn!("conversion still running at exit");
    }

    pub(super) fn handle_sequencer_event(&mut self, event: SequencerEvent) {
        match event {
            SequencerEvent::StageStarted {
                stage,
                command_line,
            } => {
                self.convert_output.begin_stage(stage.label(), &command_line);
                self.status_message = format!("{}...", stage.label());
            }
            SequencerEvent::Output(line) => {
                self.convert_output
                    .append_prefixed(line.stream.prefix(), &line.text);
            }
            SequencerEvent::StageFinished {
                command_line, exit, ..
            } => {
                if let Err(err) =
                    self.append_run_log(&command_line, exit.code, &exit.stdout, &exit.stderr)
                {
                    warn!(%err, "failed to write run log");
                    self.convert_output
                        .append_line(format!("(run log write failed: {err})"));
                }
            }
            SequencerEvent::Finished(outcome) => self.finish_conversion(outcome),
        }
    }

    fn finish_conversion(&mut self, outcome: Result<PathBuf, ConvertError>) {
        let log = self.run_log_path().display().to_string();
        match outcome {
            Ok(path) => {
                self.convert_output.append_line(format!("Done: {}", path.display()));
                let mut status_message = format!("Created {} (log: {log})", path.display());
                if let Err(err) = self.refresh_file_browser_after_save(&path) {
                    status_message.push_str(&format!(" (browser refresh failed: {err})"));
                }
                self.status_message = status_message;
            }
            Err(ConvertError::Cancelled) => {
                self.convert_output.append_line("Cancelled.".to_string());
                self.status_message = "Conversion cancelled; partial output removed.".to_string();
                let _ = self.reload();
            }
            Err(err) => {
                self.convert_output.append_line(format!("Failed: {err}"));
                self.status_message = format!("{err} (log: {log})");
                let _ = self.reload();
            }
        }
    }

    fn append_run_log(
        &self,
        command_line: &str,
        exit_code: Option<i32>,
        stdout: &[u8],
        stderr: &[u8],
    ) -> io::Result<()> {
        let log_path = self.run_log_path();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);

        writeln!(file, "=== run @ {timestamp} ===")?;
        writeln!(file, "command: {command_line}")?;
        match exit_code {
            Some(code) => writeln!(file, "exit_code: {code}")?,
            None => writeln!(file, "exit_code: <none>")?,
        }

        for (label, bytes) in [("stderr", stderr), ("stdout", stdout)] {
            writeln!(file, "--- {label} ---")?;
            file.write_all(bytes)?;
            if !bytes.ends_with(b"\n") {
                writeln!(file)?;
            }
        }

        writeln!(file, "=== end ===")?;
        writeln!(file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{
        app::test_support::app_in,
        convert::{
            process::{ToolExit, ToolLine, ToolStream},
            sequencer::ConvertStage,
        },
    };

    #[test]
    fn conversion_is_refused_without_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        app.run_conversion();
        assert!(app.status_message.contains("ffmpeg was not found"));
        assert!(!app.is_converting());
    }

    #[test]
    fn sequencer_events_reach_output_panel_and_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        app.handle_sequencer_event(SequencerEvent::StageStarted {
            stage: ConvertStage::Transcode,
            command_line: "ffmpeg -i a.mov a.mp4".to_string(),
        });
        app.handle_sequencer_event(SequencerEvent::Output(ToolLine {
            stream: ToolStream::Stderr,
            text: "frame=10".to_string(),
        }));
        app.handle_sequencer_event(SequencerEvent::StageFinished {
            stage: ConvertStage::Transcode,
            command_line: "ffmpeg -i a.mov a.mp4".to_string(),
            exit: ToolExit {
                success: false,
                code: Some(1),
                stdout: Vec::new(),
                stderr: b"boom\n".to_vec(),
            },
        });
        app.handle_sequencer_event(SequencerEvent::Finished(Err(ConvertError::process(
            "ffmpeg", "boom",
        ))));

        let lines = app.convert_output.lines();
        assert!(lines.contains(&"$ ffmpeg -i a.mov a.mp4".to_string()));
        assert!(lines.contains(&"stderr: frame=10".to_string()));
        assert!(app.status_message.starts_with("ffmpeg failed: boom"));

        let log = fs::read_to_string(app.run_log_path()).unwrap();
        assert!(log.contains("command: ffmpeg -i a.mov a.mp4"));
        assert!(log.contains("exit_code: 1"));
        assert!(log.contains("--- stderr ---\nboom\n"));
    }

    #[test]
    fn successful_finish_selects_the_new_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mov"), b"").unwrap();
        let mut app = app_in(&dir);
        fs::write(dir.path().join("a.mp4"), b"").unwrap();

        app.handle_sequencer_event(SequencerEvent::Finished(Ok(dir.path().join("a.mp4"))));

        assert_eq!(app.entries.len(), 2);
        assert_eq!(app.entries[app.selected].name, "a.mp4");
        assert!(app.status_message.starts_with("Created"));
    }
}
