//! Low-level ffmpeg/ffprobe command wrapper.
//!
//! [`FfmpegTool`] builds and runs commands against the external binaries,
//! captures their output, and maps failures into [`FfmpegError`]. Every
//! operation except [`convert_audio`](FfmpegTool::convert_audio) requests
//! stream-copy mode, so extraction and container builds stay I/O-bound;
//! re-encoding never touches the video path.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use super::error::{FfmpegError, FfmpegResult};
use super::probe::{parse_probe_json, ProbedStream, ProbeResult};
use crate::models::{first_reference_paths, AudioFormat, MediaContainer, StreamKind};

/// Poll interval while waiting on a child with a deadline.
const WAIT_POLL: Duration = Duration::from_millis(25);

/// Selects one stream out of a container by kind and ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSelector {
    /// Kind of stream to select.
    pub kind: StreamKind,
    /// 0-based ordinal among streams of that kind, in index order.
    pub nth: usize,
}

impl StreamSelector {
    /// Select the nth stream of a kind.
    pub fn new(kind: StreamKind, nth: usize) -> Self {
        Self { kind, nth }
    }

    /// Select the first audio stream.
    pub fn first_audio() -> Self {
        Self::new(StreamKind::Audio, 0)
    }
}

/// Wrapper around the ffmpeg and ffprobe executables.
///
/// The ffmpeg path is supplied once at construction; the ffprobe path is
/// derived as a sibling binary and can be overridden. The binary is not
/// validated at construction - invalid paths surface as
/// [`FfmpegError::ToolNotFound`] on first real use.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegTool {
    /// Create a tool wrapper for the given ffmpeg executable path.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        let ffmpeg = ffmpeg.into();
        let ffprobe = derive_ffprobe_path(&ffmpeg);
        Self {
            ffmpeg,
            ffprobe,
            timeout: None,
        }
    }

    /// Override the derived ffprobe path.
    pub fn with_ffprobe(mut self, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }

    /// Set a per-invocation timeout. On expiry the child process is killed
    /// and the operation fails with [`FfmpegError::ToolTimeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The configured ffmpeg path.
    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    /// Sanity-check the configured binary by running `ffmpeg -version`.
    pub fn verify(&self) -> FfmpegResult<()> {
        let output = self.run(&self.ffmpeg, &[OsString::from("-version")])?;
        if !output.status.success() {
            return Err(FfmpegError::command_failed(
                tool_name(&self.ffmpeg),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.starts_with("ffmpeg") {
            return Err(FfmpegError::command_failed(
                tool_name(&self.ffmpeg),
                0,
                "unexpected -version output, wrong executable?",
            ));
        }
        Ok(())
    }

    /// Probe a container file into parsed stream metadata.
    pub fn probe(&self, path: &Path) -> FfmpegResult<ProbeResult> {
        if !path.is_file() {
            return Err(FfmpegError::FileNotFound(path.to_path_buf()));
        }

        let mut args: Vec<OsString> = ["-v", "error", "-show_streams", "-show_format", "-of", "json"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(path.into());

        let output = self.run(&self.ffprobe, &args)?;
        if !output.status.success() {
            return Err(FfmpegError::probe_failed(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| FfmpegError::probe_failed(path, e.to_string()))?;

        parse_probe_json(&json, path)
    }

    /// Copy one stream (no re-encode) out of a container into `output`.
    ///
    /// `stream` is the probed metadata of the stream to copy, as returned
    /// by [`probe`](Self::probe); the file is not probed again here.
    pub fn extract_stream(
        &self,
        input: &Path,
        stream: &ProbedStream,
        output: &Path,
    ) -> FfmpegResult<()> {
        let mut args: Vec<OsString> = Vec::new();
        args.push("-i".into());
        args.push(input.into());
        args.push("-map".into());
        args.push(format!("0:{}", stream.index).into());
        args.push("-c".into());
        args.push("copy".into());
        args.push("-y".into());
        args.push(output.into());

        let result = self.run(&self.ffmpeg, &args)?;
        if !result.status.success() {
            return Err(FfmpegError::command_failed(
                tool_name(&self.ffmpeg),
                result.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        tracing::info!(
            "Extracted {} stream {} from {} to {}",
            stream.kind,
            stream.index,
            input.display(),
            output.display()
        );
        Ok(())
    }

    /// Re-encode an audio file to the target format at `output`.
    ///
    /// The one CPU-bound step in the library.
    pub fn convert_audio(
        &self,
        input: &Path,
        format: AudioFormat,
        output: &Path,
    ) -> FfmpegResult<()> {
        if !input.is_file() {
            return Err(FfmpegError::FileNotFound(input.to_path_buf()));
        }

        let mut args: Vec<OsString> = Vec::new();
        args.push("-i".into());
        args.push(input.into());
        args.push("-vn".into());
        args.push("-acodec".into());
        args.push(format.codec().into());
        args.push("-y".into());
        args.push(output.into());

        let result = self.run(&self.ffmpeg, &args)?;
        if !result.status.success() {
            return Err(FfmpegError::command_failed(
                tool_name(&self.ffmpeg),
                result.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        tracing::info!(
            "Converted {} to {} at {}",
            input.display(),
            format,
            output.display()
        );
        Ok(())
    }

    /// Multiplex all streams of a container, in ascending index order, into
    /// a single output file. Every stream is stream-copied.
    ///
    /// Streams may originate from multiple distinct source files; inputs
    /// are passed in first-reference order and each stream is mapped from
    /// its own source. Subtitle streams are dropped when the destination is
    /// an `.mp4`, which cannot carry the usual text subtitle codecs.
    pub fn build_container(
        &self,
        output: &Path,
        container: &MediaContainer,
        overwrite_ok: bool,
    ) -> FfmpegResult<()> {
        if output.exists() {
            if !overwrite_ok {
                return Err(FfmpegError::DestinationExists(output.to_path_buf()));
            }
            fs::remove_file(output)
                .map_err(|e| FfmpegError::io_error("removing existing destination", e))?;
        }
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| FfmpegError::io_error("creating destination directory", e))?;
            }
        }

        let drop_subtitles = output
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));

        let streams: Vec<_> = container
            .streams()
            .iter()
            .filter(|s| !(drop_subtitles && s.kind == StreamKind::Subtitle))
            .collect();

        // Inputs in first-reference order over the streams actually kept.
        let inputs = first_reference_paths(streams.iter().copied());

        let mut args: Vec<OsString> = Vec::new();
        for input in &inputs {
            args.push("-i".into());
            args.push((*input).into());
        }
        for stream in &streams {
            let input_index = inputs
                .iter()
                .position(|p| *p == stream.source_path.as_path())
                .unwrap_or(0);
            args.push("-map".into());
            args.push(format!("{}:{}", input_index, stream.source_index).into());
        }
        args.push("-c".into());
        args.push("copy".into());
        args.push("-shortest".into());
        args.push("-y".into());
        args.push(output.into());

        let result = self.run(&self.ffmpeg, &args)?;
        if !result.status.success() {
            return Err(FfmpegError::BuildFailed {
                output: output.to_path_buf(),
                exit_code: result.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        tracing::info!(
            "Built container {} from {} streams across {} inputs",
            output.display(),
            streams.len(),
            inputs.len()
        );
        Ok(())
    }

    /// Run a command to completion, honoring the configured timeout.
    fn run(&self, program: &Path, args: &[OsString]) -> FfmpegResult<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());
        tracing::debug!("Running: {:?}", cmd);

        match self.timeout {
            None => cmd.output().map_err(|e| spawn_error(program, e)),
            Some(timeout) => run_with_deadline(cmd, program, timeout),
        }
    }
}

/// Run a command with a deadline, killing the child on expiry.
///
/// stdout/stderr are drained on separate threads so a chatty child cannot
/// deadlock on a full pipe while we poll its exit status.
fn run_with_deadline(
    mut cmd: Command,
    program: &Path,
    timeout: Duration,
) -> FfmpegResult<Output> {
    use std::io::Read;

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| spawn_error(program, e))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let exit = loop {
        match child
            .try_wait()
            .map_err(|e| FfmpegError::io_error("waiting for tool exit", e))?
        {
            Some(status) => break Some(status),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            None => std::thread::sleep(WAIT_POLL),
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    match exit {
        Some(status) => Ok(Output {
            status,
            stdout,
            stderr,
        }),
        None => Err(FfmpegError::ToolTimeout {
            tool: tool_name(program),
            timeout_secs: timeout.as_secs(),
        }),
    }
}

/// Map a spawn failure: a missing binary is `ToolNotFound`, anything else
/// is an I/O error.
fn spawn_error(program: &Path, e: std::io::Error) -> FfmpegError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FfmpegError::ToolNotFound(program.to_path_buf())
    } else {
        FfmpegError::io_error(format!("spawning {}", tool_name(program)), e)
    }
}

/// Short tool name for error messages.
fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string())
}

/// Derive the ffprobe path from the ffmpeg path (sibling binary).
fn derive_ffprobe_path(ffmpeg: &Path) -> PathBuf {
    let Some(name) = ffmpeg.file_name().and_then(|n| n.to_str()) else {
        return PathBuf::from("ffprobe");
    };
    if !name.contains("ffmpeg") {
        return ffmpeg.with_file_name("ffprobe");
    }
    ffmpeg.with_file_name(name.replace("ffmpeg", "ffprobe"))
}

/// File extension for an extracted stream, from its ffprobe codec name.
pub(crate) fn extension_for_codec(codec: &str) -> &'static str {
    match codec {
        // Audio codecs
        "aac" => "aac",
        "ac3" | "eac3" => "ac3",
        "dts" => "dts",
        "flac" => "flac",
        "opus" => "opus",
        "vorbis" => "ogg",
        "mp3" => "mp3",
        "mp2" => "mp2",
        "truehd" => "thd",

        // Video codecs
        "h264" => "h264",
        "hevc" => "h265",
        "vp8" | "vp9" => "ivf",
        "av1" => "obu",

        // Subtitle codecs
        "subrip" => "srt",
        "ass" | "ssa" => "ass",
        "webvtt" => "vtt",

        _ if codec.starts_with("pcm_") => "wav",
        _ => "bin",
    }
}
