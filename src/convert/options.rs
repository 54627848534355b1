// User-selectable conversion options and their fixed lookup tables.
// - Each option is a closed enum with a display label and the value
//   it contributes to the ffmpeg command line.
// - `cycle` gives Left/Right selection in the form without per-type code.
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertFormat {
    Mp4,
    Mp3,
}

impl ConvertFormat {
    pub const ALL: [Self; 2] = [Self::Mp4, Self::Mp3];

    pub fn label(self) -> &'static str {
        match self {
            Self::Mp4 => "MP4",
            Self::Mp3 => "MP3",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    pub fn is_audio(self) -> bool {
        self == Self::Mp3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    SizeNone,
    P360,
    P480,
    P720,
    P1080,
}

impl FrameSize {
    pub const ALL: [Self; 5] = [Self::SizeNone, Self::P360, Self::P480, Self::P720, Self::P1080];

    pub fn label(self) -> &'static str {
        match self {
            Self::SizeNone => "Source",
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }

    /// `WxH` for named presets; `None` means keep the source dimensions.
    pub fn preset(self) -> Option<&'static str> {
        match self {
            Self::SizeNone => None,
            Self::P360 => Some("480x360"),
            Self::P480 => Some("640x480"),
            Self::P720 => Some("1280x720"),
            Self::P1080 => Some("1920x1080"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    RotationNone,
    Clockwise90,
    CounterClockwise90,
}

impl Rotation {
    pub const ALL: [Self; 3] = [Self::RotationNone, Self::Clockwise90, Self::CounterClockwise90];

    pub fn label(self) -> &'static str {
        match self {
            Self::RotationNone => "None",
            Self::Clockwise90 => "90° clockwise",
            Self::CounterClockwise90 => "90° counter-clockwise",
        }
    }

    /// Argument for ffmpeg's `transpose` filter.
    pub fn transpose(self) -> Option<u8> {
        match self {
            Self::RotationNone => None,
            Self::Clockwise90 => Some(1),
            Self::CounterClockwise90 => Some(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBitrate {
    BitrateNone,
    Kbps128,
    Kbps160,
    Kbps192,
    Kbps320,
}

impl AudioBitrate {
    pub const ALL: [Self; 5] = [
        Self::BitrateNone,
        Self::Kbps128,
        Self::Kbps160,
        Self::Kbps192,
        Self::Kbps320,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::BitrateNone => "Source",
            Self::Kbps128 => "128 kbps",
            Self::Kbps160 => "160 kbps",
            Self::Kbps192 => "192 kbps",
            Self::Kbps320 => "320 kbps",
        }
    }

    pub fn kbps(self) -> Option<u32> {
        match self {
            Self::BitrateNone => None,
            Self::Kbps128 => Some(128),
            Self::Kbps160 => Some(160),
            Self::Kbps192 => Some(192),
            Self::Kbps320 => Some(320),
        }
    }
}

/// Multiplier that leaves the audio level untouched.
pub const NEUTRAL_VOLUME: &str = "1";

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub frame_size: FrameSize,
    pub audio_bitrate: AudioBitrate,
    pub rotation: Rotation,
    pub audio_volume: String,
    pub normalize_volume: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::SizeNone,
            audio_bitrate: AudioBitrate::BitrateNone,
            rotation: Rotation::RotationNone,
            audio_volume: NEUTRAL_VOLUME.to_string(),
            normalize_volume: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub format: ConvertFormat,
    pub options: ConvertOptions,
}

/// Steps through `all` from `current`, wrapping at both ends.
pub fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let Some(index) = all.iter().position(|item| *item == current) else {
        return current;
    };

    let next = if forward {
        (index + 1) % all.len()
    } else if index == 0 {
        all.len() - 1
    } else {
        index - 1
    };
    all[next]
}

/// Accepts blank (neutral) or a positive finite multiplier.
pub fn parse_volume_multiplier(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(NEUTRAL_VOLUME.to_string());
    }

    let parsed = trimmed.parse::<f64>().ok()?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return None;
    }

    Some(trimmed.to_string())
}
