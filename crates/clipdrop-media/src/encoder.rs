//! The seam between pipeline logic and the external encoder/probe processes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::FfprobeOutput;

/// Runs encoder commands and probes files.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Run an FFmpeg command to completion.
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()>;

    /// Probe a media file.
    async fn probe(&self, path: &Path) -> MediaResult<FfprobeOutput>;
}

/// [`Encoder`] backed by the ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout_secs: Option<u64>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout_secs: None,
        }
    }

    /// Kill any single process running longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Verify both binaries resolve.
    pub fn check(&self) -> MediaResult<(PathBuf, PathBuf)> {
        Ok((check_ffmpeg(&self.ffmpeg)?, check_ffprobe(&self.ffprobe)?))
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let binary = check_ffmpeg(&self.ffmpeg)?;
        let started = Instant::now();

        let result = FfmpegRunner::new(binary)
            .with_timeout(self.timeout_secs)
            .run(cmd)
            .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("clipdrop_ffmpeg_runs_total", "outcome" => outcome).increment(1);
        metrics::histogram!("clipdrop_ffmpeg_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn probe(&self, path: &Path) -> MediaResult<FfprobeOutput> {
        let binary = check_ffprobe(&self.ffprobe)?;
        debug!(path = %path.display(), "Probing media file");

        let child = Command::new(&binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), child)
                .await
                .map_err(|_| MediaError::Timeout(secs))??,
            None => child.await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MediaError::ffprobe_failed(
                format!("FFprobe failed on {}", path.display()),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeEncoder;

#[cfg(any(test, feature = "test-util"))]
mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::probe::{FfprobeFormat, FfprobeStream};

    /// In-memory [`Encoder`] for tests.
    ///
    /// `run` records the command and writes placeholder bytes to its output;
    /// `probe` answers from a per-path table or a default.
    #[derive(Default)]
    pub struct FakeEncoder {
        probes: Mutex<HashMap<PathBuf, FfprobeOutput>>,
        default_probe: Mutex<Option<FfprobeOutput>>,
        fail_outputs_containing: Mutex<Vec<String>>,
        commands: Mutex<Vec<FfmpegCommand>>,
        run_delay: Option<Duration>,
    }

    impl FakeEncoder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Synthetic probe result for an H.264 video.
        pub fn video_probe(duration: f64, width: u32, height: u32, size: u64, format_name: &str) -> FfprobeOutput {
            FfprobeOutput {
                format: FfprobeFormat {
                    format_name: Some(format_name.to_string()),
                    duration: Some(format!("{:.6}", duration)),
                    size: Some(size.to_string()),
                    bit_rate: Some("4000000".to_string()),
                },
                streams: vec![
                    FfprobeStream {
                        codec_type: "video".to_string(),
                        codec_name: Some("h264".to_string()),
                        width: Some(width),
                        height: Some(height),
                        r_frame_rate: Some("30/1".to_string()),
                        avg_frame_rate: Some("30000/1001".to_string()),
                        duration: None,
                    },
                    FfprobeStream {
                        codec_type: "audio".to_string(),
                        codec_name: Some("aac".to_string()),
                        ..Default::default()
                    },
                ],
            }
        }

        pub fn with_probe(self, path: impl Into<PathBuf>, probe: FfprobeOutput) -> Self {
            if let Ok(mut probes) = self.probes.lock() {
                probes.insert(path.into(), probe);
            }
            self
        }

        pub fn with_default_probe(self, probe: FfprobeOutput) -> Self {
            if let Ok(mut default) = self.default_probe.lock() {
                *default = Some(probe);
            }
            self
        }

        /// Make `run` fail for any output path containing `fragment`.
        pub fn fail_outputs_containing(self, fragment: impl Into<String>) -> Self {
            if let Ok(mut fails) = self.fail_outputs_containing.lock() {
                fails.push(fragment.into());
            }
            self
        }

        /// Make every `run` take at least `delay`, like a slow encode.
        pub fn with_run_delay(mut self, delay: Duration) -> Self {
            self.run_delay = Some(delay);
            self
        }

        /// Commands run so far.
        pub fn commands(&self) -> Vec<FfmpegCommand> {
            self.commands.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
            if let Ok(mut commands) = self.commands.lock() {
                commands.push(cmd.clone());
            }
            if let Some(delay) = self.run_delay {
                tokio::time::sleep(delay).await;
            }

            let output = cmd.output_path().to_string_lossy().to_string();
            let should_fail = self
                .fail_outputs_containing
                .lock()
                .map(|f| f.iter().any(|frag| output.contains(frag.as_str())))
                .unwrap_or(false);
            if should_fail {
                return Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with status 1",
                    Some("simulated failure".to_string()),
                    Some(1),
                ));
            }

            if let Some(parent) = cmd.output_path().parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(cmd.output_path(), b"fake-media").await?;
            Ok(())
        }

        async fn probe(&self, path: &Path) -> MediaResult<FfprobeOutput> {
            if let Some(probe) = self.probes.lock().ok().and_then(|p| p.get(path).cloned()) {
                return Ok(probe);
            }
            self.default_probe
                .lock()
                .ok()
                .and_then(|d| d.clone())
                .ok_or_else(|| MediaError::ffprobe_failed(format!("no probe for {}", path.display()), None))
        }
    }
}
