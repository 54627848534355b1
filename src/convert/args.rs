// ffmpeg/ffprobe argument construction.
// - Pure functions from request + metadata to argument lists; nothing here
//   spawns a process or touches the filesystem.
use std::path::Path;

use crate::{error::ConvertError, media::shell_quote};

use super::{
    options::{AudioBitrate, ConvertFormat, ConvertOptions, ConvertRequest, FrameSize, NEUTRAL_VOLUME, Rotation},
    probe::{MediaMetadata, VolumeInfo},
};

pub fn probe_args(source: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_streams".to_string(),
        "-show_format".to_string(),
        "-i".to_string(),
        source.display().to_string(),
    ]
}

pub fn volume_scan_args(source: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        source.display().to_string(),
        "-vn".to_string(),
        "-af".to_string(),
        "volumedetect".to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]
}

/// Explicit preset, or the source audio stream's bitrate in kbps rounded up.
pub fn effective_audio_bitrate(option: AudioBitrate, metadata: &MediaMetadata) -> u32 {
    option
        .kbps()
        .unwrap_or_else(|| metadata.audio_bit_rate().div_ceil(1000) as u32)
}

/// Audio filter for the requested gain, if any.
pub fn audio_gain_filter(
    options: &ConvertOptions,
    volume: Option<&VolumeInfo>,
) -> Result<Option<String>, ConvertError> {
    if options.normalize_volume {
        let max_volume = volume.map(|info| info.max_volume.as_str()).unwrap_or("");
        let peak = max_volume.trim().parse::<f64>().ok().filter(|peak| *peak < 0.0);
        let Some(peak) = peak else {
            return Err(ConvertError::NoMaxVolume(max_volume.to_string()));
        };
        return Ok(Some(format!("volume={}dB", -peak)));
    }

    let multiplier = options.audio_volume.trim();
    if multiplier.is_empty() || multiplier == NEUTRAL_VOLUME {
        return Ok(None);
    }
    Ok(Some(format!("volume={multiplier}")))
}

/// Preset `WxH`, or the source dimensions swapped for ±90° sources.
pub fn target_frame_size(option: FrameSize, metadata: &MediaMetadata) -> Option<String> {
    if let Some(preset) = option.preset() {
        return Some(preset.to_string());
    }

    let (width, height) = metadata.dimensions()?;
    if metadata.rotation_degrees().abs() == 90 {
        Some(format!("{height}x{width}"))
    } else {
        Some(format!("{width}x{height}"))
    }
}

pub fn video_filter(frame_size: Option<&str>, rotation: Rotation) -> Option<String> {
    let mut filters = Vec::new();
    if let Some(size) = frame_size {
        filters.push(format!("scale={size}"));
    }
    if let Some(transpose) = rotation.transpose() {
        filters.push(format!("transpose={transpose}"));
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}

/// Full transcode invocation for `request`.
pub fn transcode_args(
    request: &ConvertRequest,
    metadata: &MediaMetadata,
) -> Result<Vec<String>, ConvertError> {
    let options = &request.options;
    let bitrate = effective_audio_bitrate(options.audio_bitrate, metadata);
    let gain = audio_gain_filter(options, metadata.volume.as_ref())?;

    let mut args = vec![
        "-hide_banner".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        request.source_path.display().to_string(),
    ];

    match request.format {
        ConvertFormat::Mp3 => {
            args.extend(["-vn".to_string(), "-acodec".to_string(), "libmp3lame".to_string()]);
        }
        ConvertFormat::Mp4 => {
            args.extend(["-acodec".to_string(), "aac".to_string()]);
        }
    }

    if bitrate > 0 {
        args.extend(["-b:a".to_string(), format!("{bitrate}k")]);
    }
    if let Some(gain) = gain {
        args.extend(["-filter:a".to_string(), gain]);
    }

    if request.format == ConvertFormat::Mp4 {
        args.extend([
            "-vcodec".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        let size = target_frame_size(options.frame_size, metadata);
        if let Some(filter) = video_filter(size.as_deref(), options.rotation) {
            args.extend(["-filter:v".to_string(), filter]);
        }
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }

    args.extend([
        "-f".to_string(),
        request.format.extension().to_string(),
        request.destination_path.display().to_string(),
    ]);

    Ok(args)
}

pub fn command_line(program: &Path, args: &[String]) -> String {
    let program = program.display().to_string();
    std::iter::once(program.as_str())
        .chain(args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn metadata(json: &str) -> MediaMetadata {
        MediaMetadata::from_json(json).unwrap()
    }

    fn landscape() -> MediaMetadata {
        metadata(
            r#"{"streams":[
                {"codec_type":"video","width":1920,"height":1080},
                {"codec_type":"audio","bit_rate":"192000"}
            ]}"#,
        )
    }

    fn volume(max_volume: &str) -> VolumeInfo {
        VolumeInfo {
            max_volume: max_volume.to_string(),
            ..VolumeInfo::default()
        }
    }

    fn request(format: ConvertFormat, options: ConvertOptions) -> ConvertRequest {
        ConvertRequest {
            source_path: PathBuf::from("/media/in.mov"),
            destination_path: PathBuf::from("/media/out file.mp4"),
            format,
            options,
        }
    }

    #[test]
    fn bitrate_derives_from_source_stream() {
        assert_eq!(effective_audio_bitrate(AudioBitrate::BitrateNone, &landscape()), 192);
        assert_eq!(effective_audio_bitrate(AudioBitrate::Kbps128, &landscape()), 128);
    }

    #[test]
    fn bitrate_rounds_up() {
        let meta = metadata(r#"{"streams":[{"codec_type":"audio","bit_rate":"127001"}]}"#);
        assert_eq!(effective_audio_bitrate(AudioBitrate::BitrateNone, &meta), 128);
    }

    #[test]
    fn normalization_lifts_peak_to_zero() {
        let options = ConvertOptions {
            normalize_volume: true,
            ..ConvertOptions::default()
        };
        let filter = audio_gain_filter(&options, Some(&volume("-4.5"))).unwrap();
        assert_eq!(filter.as_deref(), Some("volume=4.5dB"));
    }

    #[test]
    fn normalization_rejects_peak_at_or_above_zero() {
        let options = ConvertOptions {
            normalize_volume: true,
            ..ConvertOptions::default()
        };

        for peak in ["2.0", "0.0", "", "N/A"] {
            let err = audio_gain_filter(&options, Some(&volume(peak))).unwrap_err();
            assert!(matches!(err, ConvertError::NoMaxVolume(_)), "peak {peak:?}");
        }
    }

    #[test]
    fn neutral_multiplier_adds_no_filter() {
        let options = ConvertOptions::default();
        assert_eq!(audio_gain_filter(&options, None).unwrap(), None);

        let louder = ConvertOptions {
            audio_volume: "1.5".to_string(),
            ..ConvertOptions::default()
        };
        assert_eq!(
            audio_gain_filter(&louder, None).unwrap().as_deref(),
            Some("volume=1.5")
        );
    }

    #[test]
    fn frame_size_prefers_preset_then_rotated_source() {
        assert_eq!(
            target_frame_size(FrameSize::P480, &landscape()).as_deref(),
            Some("640x480")
        );
        assert_eq!(
            target_frame_size(FrameSize::SizeNone, &landscape()).as_deref(),
            Some("1920x1080")
        );

        let portrait = metadata(
            r#"{"streams":[{"codec_type":"video","width":1920,"height":1080,"tags":{"rotate":"-90"}}]}"#,
        );
        assert_eq!(
            target_frame_size(FrameSize::SizeNone, &portrait).as_deref(),
            Some("1080x1920")
        );

        let tagged_270 = metadata(
            r#"{"streams":[{"codec_type":"video","width":1920,"height":1080,"tags":{"rotate":"270"}}]}"#,
        );
        assert_eq!(
            target_frame_size(FrameSize::SizeNone, &tagged_270).as_deref(),
            Some("1080x1920")
        );
    }

    #[test]
    fn video_filter_chains_scale_and_transpose() {
        assert_eq!(
            video_filter(Some("1280x720"), Rotation::Clockwise90).as_deref(),
            Some("scale=1280x720,transpose=1")
        );
        assert_eq!(video_filter(None, Rotation::RotationNone), None);
    }

    #[test]
    fn video_args_are_assembled_in_order() {
        let options = ConvertOptions {
            frame_size: FrameSize::P720,
            rotation: Rotation::CounterClockwise90,
            audio_volume: "2".to_string(),
            ..ConvertOptions::default()
        };
        let args = transcode_args(&request(ConvertFormat::Mp4, options), &landscape()).unwrap();

        assert_eq!(
            args,
            [
                "-hide_banner", "-y", "-i", "/media/in.mov", "-acodec", "aac", "-b:a", "192k",
                "-filter:a", "volume=2", "-vcodec", "libx264", "-pix_fmt", "yuv420p",
                "-filter:v", "scale=1280x720,transpose=2", "-movflags", "+faststart", "-f",
                "mp4", "/media/out file.mp4",
            ]
        );
    }

    #[test]
    fn audio_args_skip_video_options_and_unknown_bitrate() {
        let meta = metadata(r#"{"streams":[{"codec_type":"audio"}]}"#);
        let mut req = request(ConvertFormat::Mp3, ConvertOptions::default());
        req.destination_path = PathBuf::from("/media/out.mp3");

        let args = transcode_args(&req, &meta).unwrap();
        assert_eq!(
            args,
            [
                "-hide_banner", "-y", "-i", "/media/in.mov", "-vn", "-acodec", "libmp3lame",
                "-f", "mp3", "/media/out.mp3",
            ]
        );
    }

    #[test]
    fn command_line_quotes_arguments_with_spaces() {
        let line = command_line(Path::new("ffmpeg"), &["-i".to_string(), "a b.mp4".to_string()]);
        assert_eq!(line, "ffmpeg -i 'a b.mp4'");
    }
}
