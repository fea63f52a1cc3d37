//! FFprobe output parsing and metadata extraction.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use clipdrop_models::VideoMetadata;

use crate::encoder::Encoder;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output (`-show_format -show_streams`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub format: FfprobeFormat,
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfprobeFormat {
    pub format_name: Option<String>,
    pub duration: Option<String>,
    pub size: Option<String>,
    pub bit_rate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfprobeStream {
    #[serde(default)]
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub duration: Option<String>,
}

impl FfprobeOutput {
    pub fn video_stream(&self) -> Option<&FfprobeStream> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == "audio")
    }
}

/// Probe a file and extract its metadata.
pub async fn probe_metadata(encoder: &dyn Encoder, path: &Path) -> MediaResult<VideoMetadata> {
    let on_disk = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;

    let probe = encoder.probe(path).await?;
    let metadata = video_metadata_from_probe(&probe, on_disk.len())?;

    debug!(
        path = %path.display(),
        duration = metadata.duration_exact,
        resolution = %metadata.resolution,
        format = %metadata.format_name,
        "Probed video"
    );
    Ok(metadata)
}

/// Convert probe output to [`VideoMetadata`].
///
/// A missing video stream is an error; a missing audio stream is not.
/// `fallback_size` is used when the format section has no size.
pub fn video_metadata_from_probe(probe: &FfprobeOutput, fallback_size: u64) -> MediaResult<VideoMetadata> {
    let video = probe
        .video_stream()
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    let duration = parse_number::<f64>(probe.format.duration.as_deref())
        .or_else(|| parse_number::<f64>(video.duration.as_deref()))
        .unwrap_or(0.0);

    let size = parse_number::<u64>(probe.format.size.as_deref()).unwrap_or(fallback_size);
    let bitrate = parse_number::<u64>(probe.format.bit_rate.as_deref()).unwrap_or(0);

    let avg = video.avg_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0);
    let fps = if avg > 0.0 {
        avg
    } else {
        video.r_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0)
    };

    Ok(VideoMetadata::new(
        duration,
        video.width.unwrap_or(0),
        video.height.unwrap_or(0),
        fps,
        bitrate,
        video.codec_name.clone().unwrap_or_default(),
        size,
        probe.format.format_name.clone().unwrap_or_default(),
    ))
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Parse a frame rate such as "30000/1001" or "29.97".
///
/// A zero or missing denominator yields the numerator; anything
/// unparseable yields 0.0.
pub fn parse_frame_rate(s: &str) -> f64 {
    let s = s.trim();
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(0.0);
            match den.trim().parse::<f64>() {
                Ok(den) if den != 0.0 => num / den,
                _ => num,
            }
        }
        None => s.parse().unwrap_or(0.0),
    };
    if rate.is_finite() {
        rate
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FakeEncoder;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1") - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97") - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_degenerate() {
        assert_eq!(parse_frame_rate("0/0"), 0.0);
        assert_eq!(parse_frame_rate("25/0"), 25.0);
        assert_eq!(parse_frame_rate("25/"), 25.0);
        assert_eq!(parse_frame_rate("abc"), 0.0);
        assert_eq!(parse_frame_rate(""), 0.0);
    }

    #[test]
    fn test_metadata_from_probe_json() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920,
                 "r_frame_rate": "30/1", "avg_frame_rate": "0/0"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "10.200000",
                       "size": "15728640", "bit_rate": "12336000"}
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let meta = video_metadata_from_probe(&probe, 0).unwrap();

        assert_eq!(meta.duration_secs, 10);
        assert_eq!(meta.resolution, "1080x1920");
        assert!((meta.fps - 30.0).abs() < 0.01);
        assert_eq!(meta.codec, "h264");
        assert_eq!(meta.size_bytes, 15_728_640);
        assert_eq!(meta.bitrate, 12_336_000);
    }

    #[test]
    fn test_missing_video_stream_is_error() {
        let probe: FfprobeOutput =
            serde_json::from_str(r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#).unwrap();
        assert!(matches!(
            video_metadata_from_probe(&probe, 0),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_missing_audio_and_size_fallback() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"streams": [{"codec_type": "video", "width": 720, "height": 720, "duration": "9.6"}],
                "format": {"format_name": "webm"}}"#,
        )
        .unwrap();
        assert!(!probe.has_audio());

        let meta = video_metadata_from_probe(&probe, 4242).unwrap();
        assert_eq!(meta.size_bytes, 4242);
        assert_eq!(meta.duration_secs, 10);
        assert_eq!(meta.fps, 0.0);
    }

    #[tokio::test]
    async fn test_probe_metadata_missing_file() {
        let fake = FakeEncoder::new();
        let err = probe_metadata(&fake, Path::new("/no/such/file.mp4")).await;
        assert!(matches!(err, Err(MediaError::FileNotFound(_))));
    }
}
