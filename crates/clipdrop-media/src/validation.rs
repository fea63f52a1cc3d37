//! Platform acceptance rules for incoming videos.

use serde::{Deserialize, Serialize};
use std::path::Path;

use clipdrop_models::VideoMetadata;

// ===== Constants =====

/// Accepted container formats, matched against any part of the probe's format name.
pub const ALLOWED_CONTAINERS: &[&str] = &["mp4", "mov", "avi", "webm"];

/// Inclusive duration window, in rounded seconds.
pub const MIN_DURATION_SECS: u32 = 9;
pub const MAX_DURATION_SECS: u32 = 11;

pub const MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Both width and height must reach this.
pub const MIN_DIMENSION: u32 = 720;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of validating one file. Every violated rule contributes a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn into_result(self) -> Result<(), Vec<String>> {
        if self.passed {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Evaluate all rules against probed metadata.
pub fn validate_video(path: &Path, metadata: &VideoMetadata) -> ValidationReport {
    let mut errors = Vec::new();

    if !container_allowed(path, metadata) {
        let reported = if metadata.format_name.is_empty() {
            "unknown"
        } else {
            metadata.format_name.as_str()
        };
        errors.push(format!(
            "Unsupported container format '{}' (allowed: {})",
            reported,
            ALLOWED_CONTAINERS.join(", ")
        ));
    }

    if metadata.duration_secs < MIN_DURATION_SECS || metadata.duration_secs > MAX_DURATION_SECS {
        errors.push(format!(
            "Duration {}s ({:.2}s measured) is outside the allowed {}-{}s window",
            metadata.duration_secs, metadata.duration_exact, MIN_DURATION_SECS, MAX_DURATION_SECS
        ));
    }

    if metadata.size_bytes > MAX_SIZE_BYTES {
        errors.push(format!(
            "File size {:.1} MB exceeds the {} MB limit",
            metadata.size_bytes as f64 / BYTES_PER_MB,
            MAX_SIZE_BYTES / (1024 * 1024)
        ));
    }

    if metadata.width < MIN_DIMENSION || metadata.height < MIN_DIMENSION {
        errors.push(format!(
            "Resolution {} is below the minimum of {}x{}",
            metadata.resolution, MIN_DIMENSION, MIN_DIMENSION
        ));
    }

    ValidationReport {
        passed: errors.is_empty(),
        errors,
    }
}

/// The probe's format name decides; the file extension is only consulted
/// when the probe reported nothing, or when the shared matroska demuxer
/// answered, since it reports "matroska,webm" for both .mkv and .webm.
fn container_allowed(path: &Path, metadata: &VideoMetadata) -> bool {
    let extension = path.extension().map(|e| e.to_string_lossy().to_lowercase());
    let parts: Vec<String> = metadata.format_parts().map(str::to_lowercase).collect();

    if parts.is_empty() {
        return extension.is_some_and(|ext| ALLOWED_CONTAINERS.contains(&ext.as_str()));
    }
    if parts.iter().any(|p| p == "matroska") {
        return extension.as_deref() == Some("webm");
    }
    parts.iter().any(|p| ALLOWED_CONTAINERS.contains(&p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn meta(duration: f64, w: u32, h: u32, size: u64, format: &str) -> VideoMetadata {
        VideoMetadata::new(duration, w, h, 30.0, 0, "h264", size, format)
    }

    #[test]
    fn test_valid_portrait_clip_passes() {
        let report = validate_video(
            Path::new("clip.mp4"),
            &meta(10.2, 1080, 1920, 15 * MB, "mov,mp4,m4a,3gp,3g2,mj2"),
        );
        assert!(report.passed, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_oversized_file_fails_with_size_message() {
        let report = validate_video(Path::new("clip.mp4"), &meta(10.2, 1080, 1920, 150 * MB, "mp4"));
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("150.0 MB"), "{}", report.errors[0]);
    }

    #[test]
    fn test_duration_window_is_inclusive_after_rounding() {
        assert!(validate_video(Path::new("a.mp4"), &meta(8.5, 1080, 1920, MB, "mp4")).passed);
        assert!(validate_video(Path::new("a.mp4"), &meta(11.4, 1080, 1920, MB, "mp4")).passed);

        let report = validate_video(Path::new("a.mp4"), &meta(15.0, 1080, 1920, MB, "mp4"));
        assert!(!report.passed);
        assert!(report.errors[0].contains("15s"), "{}", report.errors[0]);
    }

    #[test]
    fn test_two_violations_yield_two_messages() {
        let report = validate_video(Path::new("a.mp4"), &meta(30.0, 640, 360, MB, "mp4"));
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.contains("Duration")));
        assert!(report.errors.iter().any(|e| e.contains("640x360")));
        assert_eq!(report.into_result().unwrap_err().len(), 2);
    }

    #[test]
    fn test_container_whitelist() {
        assert!(validate_video(Path::new("a.webm"), &meta(10.0, 720, 720, MB, "matroska,webm")).passed);
        assert!(validate_video(Path::new("a.avi"), &meta(10.0, 720, 720, MB, "avi")).passed);

        let report = validate_video(Path::new("a.mkv"), &meta(10.0, 720, 720, MB, "matroska"));
        assert!(!report.passed);
        assert!(report.errors[0].contains("matroska"));
    }

    #[test]
    fn test_matroska_demuxer_only_accepts_webm_files() {
        let shared = "matroska,webm";
        assert!(validate_video(Path::new("clip.webm"), &meta(10.0, 720, 720, MB, shared)).passed);
        assert!(validate_video(Path::new("clip.WEBM"), &meta(10.0, 720, 720, MB, shared)).passed);

        let report = validate_video(Path::new("clip.mkv"), &meta(10.0, 720, 720, MB, shared));
        assert!(!report.passed);
        assert!(report.errors[0].contains("matroska,webm"), "{}", report.errors[0]);

        assert!(!validate_video(Path::new("clip"), &meta(10.0, 720, 720, MB, shared)).passed);
    }

    #[test]
    fn test_extension_fallback_when_probe_has_no_format() {
        assert!(validate_video(Path::new("a.MOV"), &meta(10.0, 720, 720, MB, "")).passed);
        assert!(!validate_video(Path::new("a.flv"), &meta(10.0, 720, 720, MB, "")).passed);
    }

    #[test]
    fn test_one_short_side_fails() {
        let report = validate_video(Path::new("a.mp4"), &meta(10.0, 1920, 700, MB, "mp4"));
        assert!(!report.passed);
    }
}
