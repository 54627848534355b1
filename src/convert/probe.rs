// Source media metadata.
// - Deserializes ffprobe's JSON report (`-print_format json -show_streams
//   -show_format`); every field is optional and unknown fields are ignored.
// - Scrapes volumedetect statistics out of ffmpeg's diagnostic text.
use std::{
    collections::HashMap,
    path::Path,
    process::Command,
    sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;

use crate::{error::ConvertError, media::summarize_ffmpeg_error};

use super::args::probe_args;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub side_data_list: Vec<SideData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SideData {
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
}

impl ProbeStream {
    fn is(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }
}

/// volumedetect output. Fields that were not found are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeInfo {
    pub n_samples: String,
    pub mean_volume: String,
    pub max_volume: String,
}

#[derive(Debug, Clone, Default)]
pub struct MediaMetadata {
    pub report: ProbeReport,
    pub volume: Option<VolumeInfo>,
}

impl MediaMetadata {
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        let report = serde_json::from_str::<ProbeReport>(json)
            .map_err(|err| ConvertError::ProbeFailure(format!("invalid ffprobe output: {err}")))?;
        Ok(Self {
            report,
            volume: None,
        })
    }

    pub fn video_stream(&self) -> Option<&ProbeStream> {
        self.report.streams.iter().find(|stream| stream.is("video"))
    }

    pub fn audio_stream(&self) -> Option<&ProbeStream> {
        self.report.streams.iter().find(|stream| stream.is("audio"))
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let stream = self.video_stream()?;
        Some((stream.width?, stream.height?))
    }

    /// Display rotation in degrees within (-180, 180], from the display
    /// matrix or the legacy tag.
    pub fn rotation_degrees(&self) -> i32 {
        let Some(stream) = self.video_stream() else {
            return 0;
        };

        stream
            .side_data_list
            .iter()
            .find_map(|side_data| side_data.rotation)
            .map(|degrees| degrees.round() as i32)
            .or_else(|| {
                stream
                    .tags
                    .get("rotate")
                    .and_then(|value| value.trim().parse::<i32>().ok())
            })
            .map(normalize_degrees)
            .unwrap_or(0)
    }

    /// Source audio bitrate in bits per second; 0 when unknown.
    pub fn audio_bit_rate(&self) -> u64 {
        self.audio_stream()
            .and_then(|stream| stream.bit_rate.as_deref())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.report
            .format
            .duration
            .as_deref()
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }
}

fn normalize_degrees(degrees: i32) -> i32 {
    let degrees = degrees.rem_euclid(360);
    if degrees > 180 { degrees - 360 } else { degrees }
}

static N_SAMPLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"n_samples:\s?([0-9]*)\s?").expect("n_samples pattern"));
static MEAN_VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mean_volume:\s?([^ ]*)\s?dB").expect("mean_volume pattern"));
static MAX_VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max_volume:\s?([^ ]*)\s?dB").expect("max_volume pattern"));

pub fn extract_volume_info(text: &str) -> VolumeInfo {
    let capture = |pattern: &Regex| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|value| value.as_str().to_string())
            .unwrap_or_default()
    };

    VolumeInfo {
        n_samples: capture(&N_SAMPLES),
        mean_volume: capture(&MEAN_VOLUME),
        max_volume: capture(&MAX_VOLUME),
    }
}

/// Blocking probe used when a source is selected in the playlist.
pub fn probe_media(ffprobe: &Path, source: &Path) -> Result<MediaMetadata, ConvertError> {
    let output = Command::new(ffprobe)
        .args(probe_args(source))
        .output()
        .map_err(|err| ConvertError::ProbeFailure(format!("failed to run ffprobe: {err}")))?;

    if !output.status.success() {
        return Err(ConvertError::ProbeFailure(summarize_ffmpeg_error(
            &String::from_utf8_lossy(&output.stderr),
        )));
    }

    MediaMetadata::from_json(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "side_data_list": [{ "side_data_type": "Display Matrix", "rotation": -90 }]
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "bit_rate": "192000"
            }
        ],
        "format": { "duration": "12.500000", "bit_rate": "4000000" }
    }"#;

    #[test]
    fn reads_streams_by_type() {
        let metadata = MediaMetadata::from_json(REPORT).unwrap();

        assert_eq!(metadata.dimensions(), Some((1920, 1080)));
        assert_eq!(metadata.audio_bit_rate(), 192_000);
        assert_eq!(metadata.rotation_degrees(), -90);
        assert_eq!(metadata.duration_seconds(), Some(12.5));
    }

    #[test]
    fn legacy_rotate_tag_is_used() {
        let json = r#"{"streams":[{"codec_type":"video","width":10,"height":20,"tags":{"rotate":"90"}}]}"#;
        let metadata = MediaMetadata::from_json(json).unwrap();
        assert_eq!(metadata.rotation_degrees(), 90);
    }

    #[test]
    fn rotation_is_normalized_to_half_turns() {
        for (tag, expected) in [("270", -90), ("-270", 90), ("360", 0), ("180", 180), ("-180", 180)] {
            let json = format!(
                r#"{{"streams":[{{"codec_type":"video","width":10,"height":20,"tags":{{"rotate":"{tag}"}}}}]}}"#
            );
            let metadata = MediaMetadata::from_json(&json).unwrap();
            assert_eq!(metadata.rotation_degrees(), expected, "rotate tag {tag}");
        }
    }

    #[test]
    fn audio_only_source_has_no_dimensions() {
        let json = r#"{"streams":[{"codec_type":"audio"}],"format":{}}"#;
        let metadata = MediaMetadata::from_json(json).unwrap();

        assert_eq!(metadata.dimensions(), None);
        assert_eq!(metadata.audio_bit_rate(), 0);
        assert_eq!(metadata.rotation_degrees(), 0);
    }

    #[test]
    fn malformed_json_is_a_probe_failure() {
        let err = MediaMetadata::from_json("not json").unwrap_err();
        assert!(matches!(err, ConvertError::ProbeFailure(_)));
    }

    #[test]
    fn scrapes_volumedetect_fields() {
        let stderr = "\
[Parsed_volumedetect_0 @ 0x1] n_samples: 2646000
[Parsed_volumedetect_0 @ 0x1] mean_volume: -21.3 dB
[Parsed_volumedetect_0 @ 0x1] max_volume: -4.5 dB
[Parsed_volumedetect_0 @ 0x1] histogram_4db: 12";

        let info = extract_volume_info(stderr);
        assert_eq!(info.n_samples, "2646000");
        assert_eq!(info.mean_volume, "-21.3");
        assert_eq!(info.max_volume, "-4.5");
    }

    #[test]
    fn missing_volume_fields_degrade_to_empty() {
        let info = extract_volume_info("[Parsed_volumedetect_0 @ 0x1] max_volume: 0.0 dB");
        assert_eq!(info.n_samples, "");
        assert_eq!(info.mean_volume, "");
        assert_eq!(info.max_volume, "0.0");
    }
}
