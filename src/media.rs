// Media helpers shared by the playlist and the convert form.
// - Classifies files as audio/video by extension.
// - Builds collision-safe output paths next to the source file.
// - Formats command lines and ffmpeg diagnostics for display.
use std::path::{Path, PathBuf};

// Still-image formats ffmpeg can also read are left out.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "264", "265", "3g2", "3gp", "amv", "asf", "avi", "avs", "avs2", "avs3", "cavs", "dnxhd",
    "dnxhr", "drc", "dv", "f4v", "flm", "flv", "gxf", "h261", "h263", "h264", "h265", "hevc",
    "ismv", "ivf", "m1v", "m2t", "m2ts", "m2v", "m4a", "m4b", "m4v", "mjpeg", "mjpg", "mkv",
    "mov", "mp4", "mpeg", "mpg", "mts", "mxf", "nut", "obu", "ogg", "ogv", "ra", "rm", "roq",
    "swf", "ts", "vc1", "vob", "webm", "wma", "wmv", "wtv", "y4m",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "302", "aac", "ac3", "adts", "adx", "afc", "aif", "aifc", "aiff", "al", "amr", "apm", "aptx",
    "aptxhd", "ast", "au", "aud", "bit", "c2", "caf", "cvg", "dfpwm", "dts", "eac3", "ec3",
    "flac", "g722", "gsm", "ircam", "latm", "lbc", "loas", "m2a", "mlp", "mmf", "mp2", "mp3",
    "mpa", "msbc", "oga", "oma", "opus", "pcm", "rco", "rso", "sb", "sbc", "sf", "sox", "spdif",
    "spx", "sw", "tco", "thd", "tta", "tun", "ub", "ul", "uw", "vag", "voc", "w64", "wav", "wv",
];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn is_video_file(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_audio_file(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_media_file(path: &Path) -> bool {
    is_video_file(path) || is_audio_file(path)
}

/// `<stem>.<extension>` for the given source.
pub fn default_output_name(source: &Path, extension: &str) -> String {
    let stem = source
        .file_stem()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{stem}.{extension}")
}

pub fn resolve_output_path(input_path: &Path, output_name: &str) -> PathBuf {
    let candidate = PathBuf::from(output_name);
    let has_separator = output_name.contains('/') || output_name.contains('\\');

    if candidate.is_absolute() || has_separator {
        candidate
    } else {
        input_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(candidate)
    }
}

/// Replaces (or appends) the extension so it matches the target format.
pub fn enforce_output_extension(output_name: &str, extension: &str) -> String {
    let trimmed = output_name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let path = Path::new(trimmed);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(extension) => trimmed.to_string(),
        Some(_) => path.with_extension(extension).display().to_string(),
        None => format!("{trimmed}.{extension}"),
    }
}

/// First of `path`, `<stem> (1).<ext>`, `<stem> (2).<ext>`, ... that does not exist.
pub fn next_available_output_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());

    let mut index = 1_u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem} ({index}).{ext}"),
            None => format!("{stem} ({index})"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Strips a trailing ` (n)` from the stem so repeated bumps do not nest.
pub fn output_path_without_numbered_suffix(path: &Path) -> PathBuf {
    let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return path.to_path_buf();
    };

    let base = stem
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once(" ("))
        .filter(|(_, digits)| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()))
        .map(|(base, _)| base);
    let Some(base) = base else {
        return path.to_path_buf();
    };

    let name = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{base}.{ext}"),
        None => base.to_string(),
    };
    path.with_file_name(name)
}

pub fn summarize_ffmpeg_error(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .find(|line| *line != "Conversion failed!")
        .map(str::to_string)
        .unwrap_or_else(|| "unknown ffmpeg error".to_string())
}

pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        "''".to_string()
    } else if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || "-_./:+@=?,".contains(ch))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

pub fn format_bitrate(bits_per_second: u64) -> String {
    let bps = bits_per_second as f64;
    if bps >= 1_000_000.0 {
        format!("{:.2} Mbps", bps / 1_000_000.0)
    } else if bps >= 1_000.0 {
        format!("{:.0} kbps", bps / 1_000.0)
    } else {
        format!("{bits_per_second} bps")
    }
}
