// Command-line and environment configuration.
// - Parses the CLI with clap; tool paths and the log dir also read env vars.
// - Resolves the start directory and external tool locations once at startup.
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use clap::Parser;

use crate::convert::ToolPaths;

#[derive(Debug, Parser)]
#[command(name = "altmp", version, about = "Terminal media playlist with rename history and ffmpeg conversion")]
pub struct Args {
    /// Directory to open in the playlist pane (defaults to the current directory).
    pub start_dir: Option<PathBuf>,

    /// ffmpeg executable to use.
    #[arg(long, env = "ALTMP_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable to use.
    #[arg(long, env = "ALTMP_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Where the application log and conversion transcripts are written.
    #[arg(long, env = "ALTMP_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub start_dir: PathBuf,
    pub tools: ToolPaths,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_args(args: Args) -> io::Result<Self> {
        let start_dir = resolve_start_dir(args.start_dir)?;
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let tools = ToolPaths {
            ffmpeg: resolve_tool(args.ffmpeg, "ffmpeg", exe_dir.as_deref()),
            ffprobe: resolve_tool(args.ffprobe, "ffprobe", exe_dir.as_deref()),
        };
        let log_dir = args.log_dir.unwrap_or_else(default_log_dir);

        Ok(Self {
            start_dir,
            tools,
            log_dir,
        })
    }
}

fn resolve_start_dir(start_dir: Option<PathBuf>) -> io::Result<PathBuf> {
    let Some(path) = start_dir else {
        return env::current_dir();
    };

    let absolute = if path.is_absolute() {
        path
    } else {
        env::current_dir()?.join(path)
    };

    let metadata = fs::metadata(&absolute).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid start directory '{}': {err}", absolute.display()),
        )
    })?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Start path is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Explicit path, then a sidecar binary next to the executable, then `PATH`.
pub fn resolve_tool(explicit: Option<PathBuf>, name: &str, exe_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    let file_name = format!("{name}{}", env::consts::EXE_SUFFIX);
    if let Some(sidecar) = exe_dir.map(|dir| dir.join(&file_name))
        && sidecar.is_file()
    {
        return sidecar;
    }

    PathBuf::from(file_name)
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("altmp").join("logs"))
        .unwrap_or_else(|| env::temp_dir().join("altmp-logs"))
}

// Check once at startup so the UI can show a clear warning without spawning
// a process on every draw.
pub fn detect_tool_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
