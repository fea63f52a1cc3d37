//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of non-progress stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 12;

/// One `-i` input with the arguments placed before it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInput {
    pub args: Vec<String>,
    pub path: PathBuf,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Primary input first, then any overlays
    inputs: Vec<CommandInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![CommandInput {
                args: Vec::new(),
                path: input.as_ref().to_path_buf(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add another input (watermark image, etc.).
    pub fn add_input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(CommandInput {
            args: Vec::new(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an argument before the primary input's -i.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.inputs[0].args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds.max(0.0)))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, stream: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(stream)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// JPEG quality for image outputs (2 is near-lossless).
    pub fn image_quality(self, q: u8) -> Self {
        self.output_arg("-q:v").output_arg(q.to_string())
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn inputs(&self) -> &[CommandInput] {
        &self.inputs
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push("error".to_string());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with a per-process deadline.
pub struct FfmpegRunner {
    binary: PathBuf,
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a runner for an already resolved ffmpeg binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs: None,
        }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr was not captured"))?;

        // Drain stderr continuously so the child never blocks on a full pipe
        let drain = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut last = None;
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = parse_progress_line(&line, &mut current) {
                        last = Some(snapshot);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }

            (tail.into_iter().collect::<Vec<_>>().join("\n"), last)
        });

        let result = self.wait_for_completion(&mut child).await;
        let (stderr_tail, progress) = drain.await.unwrap_or_default();
        if let Some(p) = &progress {
            debug!(
                frame = p.frame,
                out_time_ms = p.out_time_ms,
                speed = p.speed,
                complete = p.is_complete,
                "FFmpeg progress at exit"
            );
        }

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with status {}", status.code().unwrap_or(-1)),
                (!stderr_tail.is_empty()).then_some(stderr_tail),
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Wait for the child, killing it once the deadline passes.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }
}

/// Resolve a configured binary: bare names go through `PATH`, paths must exist.
pub fn resolve_binary(configured: &Path) -> Option<PathBuf> {
    if configured.components().count() > 1 || configured.is_absolute() {
        configured.exists().then(|| configured.to_path_buf())
    } else {
        which::which(configured).ok()
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg(configured: &Path) -> MediaResult<PathBuf> {
    resolve_binary(configured).ok_or_else(|| MediaError::FfmpegNotFound(configured.display().to_string()))
}

/// Check if FFprobe is available.
pub fn check_ffprobe(configured: &Path) -> MediaResult<PathBuf> {
    resolve_binary(configured).ok_or_else(|| MediaError::FfprobeNotFound(configured.display().to_string()))
}

/// Escape a value for a filter option (`key=value` inside one filter).
pub fn escape_option_value(value: &str) -> String {
    escape_chars(value, &['\\', '\'', ':'])
}

/// Escape a filter description for the filter graph parser.
pub fn escape_graph_value(value: &str) -> String {
    escape_chars(value, &['\\', '\'', '[', ']', ',', ';'])
}

/// Escape an unquoted filter option value for use inside a `-vf` graph.
///
/// ffmpeg unescapes twice: once when splitting the graph into filters and
/// once when splitting a filter's options. Quotes are never emitted since a
/// backslash inside quotes is literal to ffmpeg's tokenizer.
pub fn escape_filter_value(value: &str) -> String {
    escape_graph_value(&escape_option_value(value.trim()))
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.jpg")
            .seek(2.0)
            .single_frame()
            .image_quality(2);

        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must precede the input");
        assert_eq!(args[ss + 1], "2.000");
        assert!(args.windows(2).any(|w| w == ["-frames:v", "1"]));
        assert_eq!(args.last().unwrap(), "output.jpg");
    }

    #[test]
    fn test_multiple_inputs_in_order() {
        let cmd = FfmpegCommand::new("video.mp4", "out.mp4")
            .add_input("logo.png")
            .filter_complex("[0:v][1:v]overlay=0:0[out]")
            .map("[out]");

        let args = cmd.build_args();
        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        assert_eq!(inputs, vec!["video.mp4", "logo.png"]);
        assert_eq!(cmd.output_path(), Path::new("out.mp4"));
    }

    #[test]
    fn test_negative_seek_clamped() {
        let args = FfmpegCommand::new("a.mp4", "b.jpg").seek(-3.0).build_args();
        assert!(args.contains(&"0.000".to_string()));
    }

    #[test]
    fn test_escape_levels() {
        assert_eq!(escape_option_value("it's 5:00"), r"it\'s 5\:00");
        assert_eq!(escape_graph_value(r"a\'b,[c];"), r"a\\\'b\,\[c\]\;");
        // option escaping first, then the graph level on top of it
        assert_eq!(escape_filter_value("Sam's Studio"), r"Sam\\\'s Studio");
        assert_eq!(escape_filter_value("10:30, live"), r"10\\:30\, live");
        assert_eq!(escape_filter_value("100%"), "100%");
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_keeps_stderr_tail_without_progress_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let binary = fake_ffmpeg(
            dir.path(),
            "echo frame=12 >&2\necho progress=continue >&2\necho 'Invalid data found when processing input' >&2\nexit 1",
        );

        let err = FfmpegRunner::new(binary)
            .run(&FfmpegCommand::new("in.mp4", "out.mp4"))
            .await
            .unwrap_err();

        match err {
            MediaError::FfmpegFailed { stderr, exit_code, .. } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr.as_deref(), Some("Invalid data found when processing input"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_kills_process() {
        let dir = tempfile::TempDir::new().unwrap();
        let binary = fake_ffmpeg(dir.path(), "exec sleep 30");

        let err = FfmpegRunner::new(binary)
            .with_timeout(Some(1))
            .run(&FfmpegCommand::new("in.mp4", "out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout(1)), "{err}");
    }

    #[test]
    fn test_resolve_missing_absolute_binary() {
        assert!(resolve_binary(Path::new("/definitely/not/here/ffmpeg")).is_none());
        assert!(check_ffmpeg(Path::new("/definitely/not/here/ffmpeg")).is_err());
    }
}
