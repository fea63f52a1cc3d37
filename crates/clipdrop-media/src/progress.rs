//! FFmpeg `-progress` output parsing.

/// Progress snapshot reported by FFmpeg.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (1.5 = 1.5x realtime)
    pub speed: f64,
    /// Set once FFmpeg reports `progress=end`
    pub is_complete: bool,
}

/// Returns true for `key=value` lines emitted by `-progress`.
pub(crate) fn is_progress_line(line: &str) -> bool {
    match line.trim().split_once('=') {
        Some((key, _)) => matches!(
            key,
            "frame"
                | "fps"
                | "stream_0_0_q"
                | "bitrate"
                | "total_size"
                | "out_time_us"
                | "out_time_ms"
                | "out_time"
                | "dup_frames"
                | "drop_frames"
                | "speed"
                | "progress"
        ),
        None => false,
    }
}

/// Fold one `-progress` line into `current`. Returns a snapshot at each
/// `progress=` marker, which ends a block.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is actually microseconds in FFmpeg's output
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut progress = FfmpegProgress::default();
        assert!(parse_progress_line("frame=120", &mut progress).is_none());
        parse_progress_line("out_time_us=5000000", &mut progress);
        parse_progress_line("speed=1.5x", &mut progress);
        parse_progress_line("speed=N/A", &mut progress);

        let snapshot = parse_progress_line("progress=end", &mut progress).unwrap();
        assert_eq!(snapshot.frame, 120);
        assert_eq!(snapshot.out_time_ms, 5000);
        assert!((snapshot.speed - 1.5).abs() < 0.01);
        assert!(snapshot.is_complete);
    }

    #[test]
    fn test_progress_line_detection() {
        assert!(is_progress_line("out_time=00:00:01.000000"));
        assert!(!is_progress_line("[libx264 @ 0x55] error: something"));
        assert!(!is_progress_line("Invalid data found when processing input"));
    }
}
