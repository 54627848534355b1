// Conversion sequencing.
// - Runs probe -> (volume scan) -> transcode as one child process at a time.
// - Rejects a second request while any stage is running.
// - Driven by `poll` from the UI tick; reports progress as events.
// - Removes the partial destination file on failure or cancellation.
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::{error::ConvertError, media::summarize_ffmpeg_error};

use super::{
    args::{command_line, probe_args, transcode_args, volume_scan_args},
    options::{ConvertFormat, ConvertOptions, ConvertRequest},
    probe::{MediaMetadata, extract_volume_info},
    process::{OutputFs, ToolExit, ToolLauncher, ToolLine, ToolProcess},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertStage {
    Probe,
    VolumeScan,
    Transcode,
}

impl ConvertStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Probe => "Reading metadata",
            Self::VolumeScan => "Measuring volume",
            Self::Transcode => "Converting",
        }
    }
}

#[derive(Debug)]
pub enum SequencerEvent {
    StageStarted {
        stage: ConvertStage,
        command_line: String,
    },
    Output(ToolLine),
    StageFinished {
        stage: ConvertStage,
        command_line: String,
        exit: ToolExit,
    },
    Finished(Result<PathBuf, ConvertError>),
}

struct ActiveStage {
    stage: ConvertStage,
    program: String,
    command_line: String,
    process: Box<dyn ToolProcess>,
}

struct Job {
    request: ConvertRequest,
    metadata: Option<MediaMetadata>,
    active: ActiveStage,
    cancel_requested: bool,
}

pub struct Sequencer<L, F> {
    launcher: L,
    fs: F,
    tools: ToolPaths,
    job: Option<Job>,
    destination: Option<PathBuf>,
}

impl<L: ToolLauncher, F: OutputFs> Sequencer<L, F> {
    pub fn new(launcher: L, fs: F, tools: ToolPaths) -> Self {
        Self {
            launcher,
            fs,
            tools,
            job: None,
            destination: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn stage(&self) -> Option<ConvertStage> {
        self.job.as_ref().map(|job| job.active.stage)
    }

    /// Destination that will be removed if the running conversion fails.
    pub fn tracked_destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    pub fn convert_audio(
        &mut self,
        source: &Path,
        destination: &Path,
        options: ConvertOptions,
    ) -> Result<Vec<SequencerEvent>, ConvertError> {
        self.start(ConvertRequest {
            source_path: source.to_path_buf(),
            destination_path: destination.to_path_buf(),
            format: ConvertFormat::Mp3,
            options,
        })
    }

    pub fn convert_video(
        &mut self,
        source: &Path,
        destination: &Path,
        options: ConvertOptions,
    ) -> Result<Vec<SequencerEvent>, ConvertError> {
        self.start(ConvertRequest {
            source_path: source.to_path_buf(),
            destination_path: destination.to_path_buf(),
            format: ConvertFormat::Mp4,
            options,
        })
    }

    /// Launches the probe stage. Fails fast with `ProcessBusy` while a job runs.
    pub fn start(&mut self, request: ConvertRequest) -> Result<Vec<SequencerEvent>, ConvertError> {
        if self.job.is_some() {
            return Err(ConvertError::ProcessBusy);
        }

        info!(
            source = %request.source_path.display(),
            destination = %request.destination_path.display(),
            format = request.format.label(),
            "conversion requested"
        );
        self.destination = Some(request.destination_path.clone());

        let args = probe_args(&request.source_path);
        let program = self.tools.ffprobe.clone();
        match self.launch(ConvertStage::Probe, &program, &args) {
            Ok(active) => {
                let event = started_event(&active);
                self.job = Some(Job {
                    request,
                    metadata: None,
                    active,
                    cancel_requested: false,
                });
                Ok(vec![event])
            }
            Err(err) => {
                self.clean_up();
                Err(ConvertError::ProbeFailure(format!("failed to start ffprobe: {err}")))
            }
        }
    }

    /// Asks the running child to terminate. The next `poll` reports `Cancelled`.
    pub fn cancel(&mut self) -> bool {
        let Some(job) = self.job.as_mut() else {
            return false;
        };

        job.cancel_requested = true;
        match job.active.process.kill() {
            Ok(()) => info!(stage = job.active.stage.label(), "cancellation requested"),
            Err(err) => warn!(%err, "failed to kill {}", job.active.program),
        }
        true
    }

    pub fn poll(&mut self) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        let Some(job) = self.job.as_mut() else {
            return events;
        };

        events.extend(
            job.active
                .process
                .drain_lines()
                .into_iter()
                .map(SequencerEvent::Output),
        );

        let exit = match job.active.process.try_finish() {
            Ok(Some(exit)) => exit,
            Ok(None) => return events,
            Err(err) => {
                let failure = ConvertError::process(&job.active.program, format!("lost track of process: {err}"));
                events.push(self.fail(failure));
                return events;
            }
        };

        events.extend(
            job.active
                .process
                .drain_lines()
                .into_iter()
                .map(SequencerEvent::Output),
        );
        events.push(SequencerEvent::StageFinished {
            stage: job.active.stage,
            command_line: job.active.command_line.clone(),
            exit: exit.clone(),
        });

        if job.cancel_requested {
            events.push(self.fail(ConvertError::Cancelled));
            return events;
        }

        match self.advance(exit) {
            Ok(Some(started)) => events.push(started),
            Ok(None) => events.push(self.succeed()),
            Err(err) => events.push(self.fail(err)),
        }
        events
    }

    /// Moves to the next stage after `exit`. `Ok(None)` means the job is done.
    fn advance(&mut self, exit: ToolExit) -> Result<Option<SequencerEvent>, ConvertError> {
        let Some(job) = self.job.as_mut() else {
            return Ok(None);
        };
        let stderr = String::from_utf8_lossy(&exit.stderr);

        match job.active.stage {
            ConvertStage::Probe => {
                if !exit.success {
                    return Err(ConvertError::ProbeFailure(summarize_ffmpeg_error(&stderr)));
                }
                let metadata = MediaMetadata::from_json(&String::from_utf8_lossy(&exit.stdout))?;
                job.metadata = Some(metadata);

                if job.request.options.normalize_volume {
                    let args = volume_scan_args(&job.request.source_path);
                    self.next_stage(ConvertStage::VolumeScan, args)
                } else {
                    self.start_transcode()
                }
            }
            ConvertStage::VolumeScan => {
                if !exit.success {
                    return Err(ConvertError::ProbeFailure(summarize_ffmpeg_error(&stderr)));
                }
                let volume = extract_volume_info(&stderr);
                debug!(max_volume = %volume.max_volume, mean_volume = %volume.mean_volume, "volume measured");
                if let Some(metadata) = job.metadata.as_mut() {
                    metadata.volume = Some(volume);
                }
                self.start_transcode()
            }
            ConvertStage::Transcode => {
                if !exit.success {
                    return Err(ConvertError::process(
                        &job.active.program,
                        summarize_ffmpeg_error(&stderr),
                    ));
                }
                Ok(None)
            }
        }
    }

    fn start_transcode(&mut self) -> Result<Option<SequencerEvent>, ConvertError> {
        let Some(job) = self.job.as_ref() else {
            return Ok(None);
        };
        let metadata = job.metadata.clone().unwrap_or_default();
        let args = transcode_args(&job.request, &metadata)?;
        self.next_stage(ConvertStage::Transcode, args)
    }

    fn next_stage(
        &mut self,
        stage: ConvertStage,
        args: Vec<String>,
    ) -> Result<Option<SequencerEvent>, ConvertError> {
        let program = self.tools.ffmpeg.clone();
        let active = self.launch(stage, &program, &args).map_err(|err| {
            ConvertError::process(&program_name(&program), format!("failed to start: {err}"))
        })?;
        let event = started_event(&active);
        if let Some(job) = self.job.as_mut() {
            job.active = active;
        }
        Ok(Some(event))
    }

    fn launch(
        &mut self,
        stage: ConvertStage,
        program: &Path,
        args: &[String],
    ) -> std::io::Result<ActiveStage> {
        let command_line = command_line(program, args);
        debug!(stage = stage.label(), command = %command_line, "launching");
        let process = self.launcher.launch(program, args)?;
        Ok(ActiveStage {
            stage,
            program: program_name(program),
            command_line,
            process,
        })
    }

    fn succeed(&mut self) -> SequencerEvent {
        self.job = None;
        let destination = self.destination.take().unwrap_or_default();
        info!(destination = %destination.display(), "conversion finished");
        SequencerEvent::Finished(Ok(destination))
    }

    fn fail(&mut self, err: ConvertError) -> SequencerEvent {
        if let Some(mut job) = self.job.take()
            && let Err(err) = job.active.process.kill()
        {
            // The child may still be alive when polling it failed.
            warn!(%err, "failed to kill {}", job.active.program);
        }
        self.clean_up();
        match &err {
            ConvertError::Cancelled => info!("conversion cancelled"),
            other => error!(error = %other, "conversion failed"),
        }
        SequencerEvent::Finished(Err(err))
    }

    /// Best-effort removal of the partial output; releases the handle.
    fn clean_up(&mut self) {
        if let Some(destination) = self.destination.take()
            && self.fs.exists(&destination)
        {
            match self.fs.remove(&destination) {
                Ok(()) => info!(path = %destination.display(), "removed partial output"),
                Err(err) => warn!(path = %destination.display(), %err, "failed to remove partial output"),
            }
        }
        self.job = None;
    }
}

fn started_event(active: &ActiveStage) -> SequencerEvent {
    SequencerEvent::StageStarted {
        stage: active.stage,
        command_line: active.command_line.clone(),
    }
}

fn program_name(program: &Path) -> String {
    program
        .file_stem()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::VecDeque,
        io,
        rc::Rc,
    };

    use super::*;

    const PROBE_JSON: &str = r#"{"streams":[
        {"codec_type":"video","width":1280,"height":720},
        {"codec_type":"audio","bit_rate":"192000"}
    ]}"#;

    #[derive(Default)]
    struct Log {
        launches: Vec<(PathBuf, Vec<String>)>,
        kills: usize,
        removed: Vec<PathBuf>,
        fail_kill: bool,
        fail_remove: bool,
    }

    /// Scripted child: reports `exit` after `polls_left` running polls.
    struct FakeProcess {
        log: Rc<RefCell<Log>>,
        exit: ToolExit,
        polls_left: usize,
        killed: bool,
    }

    impl ToolProcess for FakeProcess {
        fn drain_lines(&mut self) -> Vec<ToolLine> {
            Vec::new()
        }

        fn try_finish(&mut self) -> io::Result<Option<ToolExit>> {
            if self.killed {
                return Ok(Some(ToolExit::default()));
            }
            if self.polls_left > 0 {
                self.polls_left -= 1;
                return Ok(None);
            }
            Ok(Some(self.exit.clone()))
        }

        fn kill(&mut self) -> io::Result<()> {
            let mut log = self.log.borrow_mut();
            log.kills += 1;
            if log.fail_kill {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "kill denied"));
            }
            self.killed = true;
            Ok(())
        }
    }

    struct FakeLauncher {
        log: Rc<RefCell<Log>>,
        script: VecDeque<(ToolExit, usize)>,
    }

    impl ToolLauncher for FakeLauncher {
        fn launch(&mut self, program: &Path, args: &[String]) -> io::Result<Box<dyn ToolProcess>> {
            self.log
                .borrow_mut()
                .launches
                .push((program.to_path_buf(), args.to_vec()));
            let (exit, polls_left) = self
                .script
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such program"))?;
            Ok(Box::new(FakeProcess {
                log: Rc::clone(&self.log),
                exit,
                polls_left,
                killed: false,
            }))
        }
    }

    struct FakeFs {
        log: Rc<RefCell<Log>>,
        existing: Vec<PathBuf>,
    }

    impl OutputFs for FakeFs {
        fn exists(&self, path: &Path) -> bool {
            self.existing.iter().any(|existing| existing == path)
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            let mut log = self.log.borrow_mut();
            log.removed.push(path.to_path_buf());
            if log.fail_remove {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "file in use"));
            }
            Ok(())
        }
    }

    fn ok(stdout: &str, stderr: &str) -> ToolExit {
        ToolExit {
            success: true,
            code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    fn failed(stderr: &str) -> ToolExit {
        ToolExit {
            success: false,
            code: Some(1),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    fn sequencer(
        script: Vec<(ToolExit, usize)>,
        existing: &[&str],
    ) -> (Sequencer<FakeLauncher, FakeFs>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let launcher = FakeLauncher {
            log: Rc::clone(&log),
            script: script.into(),
        };
        let fs = FakeFs {
            log: Rc::clone(&log),
            existing: existing.iter().map(PathBuf::from).collect(),
        };
        let tools = ToolPaths {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        };
        (Sequencer::new(launcher, fs, tools), log)
    }

    fn run_to_end(sequencer: &mut Sequencer<FakeLauncher, FakeFs>) -> Result<PathBuf, ConvertError> {
        for _ in 0..32 {
            for event in sequencer.poll() {
                if let SequencerEvent::Finished(outcome) = event {
                    return outcome;
                }
            }
        }
        panic!("conversion never finished");
    }

    #[test]
    fn successful_video_conversion_runs_probe_then_transcode() {
        let (mut seq, log) = sequencer(vec![(ok(PROBE_JSON, ""), 0), (ok("", ""), 2)], &[]);

        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();
        assert!(seq.is_busy());
        assert_eq!(seq.tracked_destination(), Some(Path::new("out.mp4")));

        let outcome = run_to_end(&mut seq).unwrap();
        assert_eq!(outcome, PathBuf::from("out.mp4"));
        assert!(!seq.is_busy());
        assert_eq!(seq.tracked_destination(), None);

        let log = log.borrow();
        assert_eq!(log.launches.len(), 2);
        assert_eq!(log.launches[0].0, PathBuf::from("ffprobe"));
        assert_eq!(log.launches[1].0, PathBuf::from("ffmpeg"));
        assert!(log.launches[1].1.contains(&"scale=1280x720".to_string()));
        assert!(log.launches[1].1.contains(&"192k".to_string()));
        assert!(log.removed.is_empty());
    }

    #[test]
    fn second_request_while_running_is_rejected_without_spawning() {
        let (mut seq, log) = sequencer(vec![(ok(PROBE_JSON, ""), 5), (ok("", ""), 0)], &[]);
        seq.convert_video(Path::new("a.mov"), Path::new("a.mp4"), ConvertOptions::default())
            .unwrap();

        let err = seq
            .convert_video(Path::new("b.mov"), Path::new("b.mp4"), ConvertOptions::default())
            .unwrap_err();

        assert!(matches!(err, ConvertError::ProcessBusy));
        assert_eq!(log.borrow().launches.len(), 1);
        assert_eq!(seq.tracked_destination(), Some(Path::new("a.mp4")));
    }

    #[test]
    fn normalization_runs_volume_scan_before_transcode() {
        let scan = "[Parsed_volumedetect_0 @ 0x1] max_volume: -4.5 dB";
        let (mut seq, log) = sequencer(
            vec![(ok(PROBE_JSON, ""), 0), (ok("", scan), 0), (ok("", ""), 0)],
            &[],
        );
        let options = ConvertOptions {
            normalize_volume: true,
            ..ConvertOptions::default()
        };

        seq.convert_audio(Path::new("in.mov"), Path::new("out.mp3"), options)
            .unwrap();
        run_to_end(&mut seq).unwrap();

        let log = log.borrow();
        assert_eq!(log.launches.len(), 3);
        assert!(log.launches[1].1.contains(&"volumedetect".to_string()));
        assert!(log.launches[2].1.contains(&"volume=4.5dB".to_string()));
    }

    #[test]
    fn peak_at_or_above_zero_fails_with_no_max_volume() {
        let scan = "[Parsed_volumedetect_0 @ 0x1] max_volume: 2.0 dB";
        let (mut seq, log) = sequencer(vec![(ok(PROBE_JSON, ""), 0), (ok("", scan), 0)], &[]);
        let options = ConvertOptions {
            normalize_volume: true,
            ..ConvertOptions::default()
        };

        seq.convert_audio(Path::new("in.mov"), Path::new("out.mp3"), options)
            .unwrap();
        let err = run_to_end(&mut seq).unwrap_err();

        assert!(matches!(err, ConvertError::NoMaxVolume(_)));
        assert_eq!(log.borrow().launches.len(), 2);
        assert!(!seq.is_busy());
    }

    #[test]
    fn process_failure_removes_existing_partial_output() {
        let (mut seq, log) = sequencer(
            vec![(ok(PROBE_JSON, ""), 0), (failed("Error while encoding\nConversion failed!"), 0)],
            &["out.mp4"],
        );
        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();

        let err = run_to_end(&mut seq).unwrap_err();

        match err {
            ConvertError::ProcessFailure { program, detail } => {
                assert_eq!(program, "ffmpeg");
                assert_eq!(detail, "Error while encoding");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(log.borrow().removed, [PathBuf::from("out.mp4")]);
        assert_eq!(seq.tracked_destination(), None);
    }

    #[test]
    fn cleanup_failure_keeps_the_original_error() {
        let (mut seq, log) = sequencer(
            vec![(ok(PROBE_JSON, ""), 0), (failed("Invalid argument"), 0)],
            &["out.mp4"],
        );
        log.borrow_mut().fail_remove = true;
        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();

        let err = run_to_end(&mut seq).unwrap_err();

        assert!(matches!(err, ConvertError::ProcessFailure { .. }));
        assert_eq!(log.borrow().removed, [PathBuf::from("out.mp4")]);
        assert!(!seq.is_busy());
        assert_eq!(seq.tracked_destination(), None);
    }

    #[test]
    fn kill_failure_during_cleanup_still_finishes() {
        let (mut seq, log) = sequencer(
            vec![(ok(PROBE_JSON, ""), 0), (failed("Invalid argument"), 0)],
            &["out.mp4"],
        );
        log.borrow_mut().fail_kill = true;
        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();

        let err = run_to_end(&mut seq).unwrap_err();

        assert!(matches!(err, ConvertError::ProcessFailure { .. }));
        assert_eq!(log.borrow().kills, 1);
        assert_eq!(log.borrow().removed, [PathBuf::from("out.mp4")]);
        assert!(!seq.is_busy());
    }

    #[test]
    fn process_failure_without_output_issues_no_delete() {
        let (mut seq, log) = sequencer(vec![(ok(PROBE_JSON, ""), 0), (failed("boom"), 0)], &[]);
        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();

        assert!(run_to_end(&mut seq).is_err());
        assert!(log.borrow().removed.is_empty());
    }

    #[test]
    fn probe_failure_cleans_up_and_propagates() {
        let (mut seq, log) = sequencer(vec![(failed("in.mov: No such file or directory"), 0)], &["out.mp4"]);
        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();

        let err = run_to_end(&mut seq).unwrap_err();
        assert!(matches!(err, ConvertError::ProbeFailure(_)));
        assert_eq!(log.borrow().removed, [PathBuf::from("out.mp4")]);
        assert_eq!(log.borrow().launches.len(), 1);
    }

    #[test]
    fn probe_launch_failure_is_reported_immediately() {
        let (mut seq, _log) = sequencer(Vec::new(), &[]);

        let err = seq
            .convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap_err();

        assert!(matches!(err, ConvertError::ProbeFailure(_)));
        assert!(!seq.is_busy());
    }

    #[test]
    fn cancel_kills_child_and_cleans_up() {
        let (mut seq, log) = sequencer(vec![(ok(PROBE_JSON, ""), 0), (ok("", ""), 100)], &["out.mp4"]);
        seq.convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();
        seq.poll();
        assert_eq!(seq.stage(), Some(ConvertStage::Transcode));

        assert!(seq.cancel());
        let err = run_to_end(&mut seq).unwrap_err();

        assert!(matches!(err, ConvertError::Cancelled));
        let log = log.borrow();
        assert!(log.kills >= 1);
        assert_eq!(log.removed, [PathBuf::from("out.mp4")]);
    }

    #[test]
    fn cancel_when_idle_does_nothing() {
        let (mut seq, _log) = sequencer(Vec::new(), &[]);
        assert!(!seq.cancel());
        assert!(seq.poll().is_empty());
    }

    #[test]
    fn stage_events_carry_command_lines() {
        let (mut seq, _log) = sequencer(vec![(ok(PROBE_JSON, ""), 0), (ok("", ""), 0)], &[]);
        let started = seq
            .convert_video(Path::new("in.mov"), Path::new("out.mp4"), ConvertOptions::default())
            .unwrap();

        match &started[..] {
            [SequencerEvent::StageStarted { stage, command_line }] => {
                assert_eq!(*stage, ConvertStage::Probe);
                assert!(command_line.starts_with("ffprobe "));
            }
            other => panic!("unexpected events: {other:?}"),
        }

        let events = seq.poll();
        assert!(events.iter().any(|event| matches!(
            event,
            SequencerEvent::StageStarted { stage: ConvertStage::Transcode, .. }
        )));
    }
}
