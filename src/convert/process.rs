// External process and filesystem capabilities used by the sequencer.
// - `ToolLauncher` spawns a program; `ToolProcess` is the running child,
//   polled without blocking and killable at any time.
// - The system launcher pipes stdout/stderr through reader threads and
//   splits the byte stream into lines as it arrives.
use std::{
    fs,
    io::{self, BufReader, Read},
    path::Path,
    process::{Child, Command, Stdio},
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStream {
    Stdout,
    Stderr,
}

impl ToolStream {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLine {
    pub stream: ToolStream,
    pub text: String,
}

/// Exit status plus everything the process wrote.
#[derive(Debug, Clone, Default)]
pub struct ToolExit {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

pub trait ToolProcess {
    /// Lines completed since the previous call.
    fn drain_lines(&mut self) -> Vec<ToolLine>;

    /// `Ok(None)` while the process is still running.
    fn try_finish(&mut self) -> io::Result<Option<ToolExit>>;

    fn kill(&mut self) -> io::Result<()>;
}

pub trait ToolLauncher {
    fn launch(&mut self, program: &Path, args: &[String]) -> io::Result<Box<dyn ToolProcess>>;
}

pub trait OutputFs {
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl OutputFs for StdFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ToolLauncher for SystemLauncher {
    fn launch(&mut self, program: &Path, args: &[String]) -> io::Result<Box<dyn ToolProcess>> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stderr"))?;

        let (tx, rx) = mpsc::channel();
        spawn_reader(stdout, ToolStream::Stdout, tx.clone());
        spawn_reader(stderr, ToolStream::Stderr, tx);

        Ok(Box::new(SystemProcess {
            child,
            rx,
            stdout: StreamBuffer::default(),
            stderr: StreamBuffer::default(),
            lines: Vec::new(),
        }))
    }
}

enum ReaderEvent {
    Chunk { stream: ToolStream, data: Vec<u8> },
    Failed { stream: ToolStream, error: String },
}

#[derive(Default)]
struct StreamBuffer {
    raw: Vec<u8>,
    pending: Vec<u8>,
}

struct SystemProcess {
    child: Child,
    rx: Receiver<ReaderEvent>,
    stdout: StreamBuffer,
    stderr: StreamBuffer,
    lines: Vec<ToolLine>,
}

impl SystemProcess {
    fn handle(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::Chunk { stream, data } => {
                let buffer = match stream {
                    ToolStream::Stdout => &mut self.stdout,
                    ToolStream::Stderr => &mut self.stderr,
                };
                for text in consume_chunk(buffer, &data) {
                    self.lines.push(ToolLine { stream, text });
                }
            }
            ReaderEvent::Failed { stream, error } => self.lines.push(ToolLine {
                stream,
                text: format!("reader error: {error}"),
            }),
        }
    }

    fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
        }
    }
}

impl ToolProcess for SystemProcess {
    fn drain_lines(&mut self) -> Vec<ToolLine> {
        self.pump();
        std::mem::take(&mut self.lines)
    }

    fn try_finish(&mut self) -> io::Result<Option<ToolExit>> {
        let Some(status) = self.child.try_wait()? else {
            return Ok(None);
        };

        // The readers hang up once both pipes hit EOF, so this ends.
        while let Ok(event) = self.rx.recv() {
            self.handle(event);
        }
        for stream in [ToolStream::Stderr, ToolStream::Stdout] {
            let buffer = match stream {
                ToolStream::Stdout => &mut self.stdout,
                ToolStream::Stderr => &mut self.stderr,
            };
            if let Some(text) = flush_pending_line(&mut buffer.pending) {
                self.lines.push(ToolLine { stream, text });
            }
        }

        Ok(Some(ToolExit {
            success: status.success(),
            code: status.code(),
            stdout: std::mem::take(&mut self.stdout.raw),
            stderr: std::mem::take(&mut self.stderr.raw),
        }))
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.try_wait()? {
            Some(_) => Ok(()),
            None => self.child.kill(),
        }
    }
}

fn spawn_reader<R>(reader: R, stream: ToolStream, tx: Sender<ReaderEvent>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = [0_u8; 4096];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => {
                    let chunk = ReaderEvent::Chunk {
                        stream,
                        data: buf[..read].to_vec(),
                    };
                    if tx.send(chunk).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(ReaderEvent::Failed {
                        stream,
                        error: err.to_string(),
                    });
                    break;
                }
            }
        }
    });
}

// ffmpeg redraws its progress line with '\r', so both break lines.
fn consume_chunk(buffer: &mut StreamBuffer, data: &[u8]) -> Vec<String> {
    buffer.raw.extend_from_slice(data);

    let mut lines = Vec::new();
    for &byte in data {
        if byte == b'\n' || byte == b'\r' {
            if let Some(line) = flush_pending_line(&mut buffer.pending) {
                lines.push(line);
            }
        } else {
            buffer.pending.push(byte);
        }
    }
    lines
}

fn flush_pending_line(pending: &mut Vec<u8>) -> Option<String> {
    if pending.is_empty() {
        return None;
    }

    let line = String::from_utf8_lossy(pending).trim_end().to_string();
    pending.clear();

    if line.is_empty() { None } else { Some(line) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_split_on_newlines_and_carriage_returns() {
        let mut buffer = StreamBuffer::default();

        let first = consume_chunk(&mut buffer, b"frame=1\rframe=2\nsize=");
        assert_eq!(first, ["frame=1", "frame=2"]);

        let second = consume_chunk(&mut buffer, b"10kB\n\n");
        assert_eq!(second, ["size=10kB"]);
        assert_eq!(buffer.raw, b"frame=1\rframe=2\nsize=10kB\n\n");
    }

    #[test]
    fn partial_line_is_kept_until_flushed() {
        let mut buffer = StreamBuffer::default();
        assert!(consume_chunk(&mut buffer, b"tail").is_empty());
        assert_eq!(flush_pending_line(&mut buffer.pending).as_deref(), Some("tail"));
        assert_eq!(flush_pending_line(&mut buffer.pending), None);
    }

    #[test]
    fn std_fs_removes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.mp4");
        fs::write(&path, b"data").unwrap();

        assert!(StdFs.exists(&path));
        StdFs.remove(&path).unwrap();
        assert!(!StdFs.exists(&path));
    }
}
