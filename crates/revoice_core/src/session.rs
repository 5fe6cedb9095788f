//! Session-scoped orchestration façade.
//!
//! [`FfmpegSession`] composes probing, extraction, conversion and container
//! rebuilding into the high-level audio-replacement workflow. A session
//! owns a [`TempArtifactRegistry`]; everything it extracts or converts is
//! registered there and deleted when the session closes - on normal close,
//! on operation errors, and when a caller-supplied processing callback
//! fails mid-workflow.
//!
//! Operations are synchronous blocking subprocess calls with no overlap
//! within one session. Sessions are independent (own tool handle, own temp
//! directory), so a batch may run many sessions in parallel, one per file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::ffmpeg::{extension_for_codec, FfmpegError, FfmpegResult, FfmpegTool, StreamSelector};
use crate::models::{AudioFormat, MediaContainer, Stream, StreamKind};
use crate::temp::TempArtifactRegistry;

/// Suffix inserted before the extension of non-replacing edit destinations.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_replaced";

/// A scoped orchestration session around one ffmpeg installation.
///
/// The state machine is `Open -> (operations) -> Closed`. Every operation
/// fails with [`FfmpegError::SessionClosed`] after [`close`](Self::close);
/// none partially executes. Dropping an unclosed session runs the same
/// cleanup.
#[derive(Debug)]
pub struct FfmpegSession {
    tool: FfmpegTool,
    temp: TempArtifactRegistry,
    suffix: String,
    intermediate: AudioFormat,
    closed: bool,
}

impl FfmpegSession {
    /// Open a session for the given ffmpeg executable path.
    ///
    /// The binary path is validated lazily, on first real use; only the
    /// session temp directory is created here.
    pub fn open(ffmpeg: impl Into<PathBuf>) -> FfmpegResult<Self> {
        Self::with_tool(FfmpegTool::new(ffmpeg))
    }

    /// Open a session around a pre-configured tool wrapper.
    pub fn with_tool(tool: FfmpegTool) -> FfmpegResult<Self> {
        let temp = TempArtifactRegistry::new()
            .map_err(|e| FfmpegError::io_error("creating session temp directory", e))?;
        tracing::debug!("Opened session with {}", tool.ffmpeg_path().display());
        Ok(Self {
            tool,
            temp,
            suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            intermediate: AudioFormat::Wav,
            closed: false,
        })
    }

    /// Open a session wired from configuration.
    pub fn from_settings(settings: &Settings) -> FfmpegResult<Self> {
        let mut session = Self::with_tool(settings.tools.build_tool())?;
        if !settings.output.suffix.is_empty() {
            session.suffix = settings.output.suffix.clone();
        }
        session.intermediate = settings.output.intermediate_format;
        Ok(session)
    }

    /// The session's temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp.dir()
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> FfmpegResult<()> {
        if self.closed {
            return Err(FfmpegError::SessionClosed);
        }
        Ok(())
    }

    /// Inspect a container file into an in-memory [`MediaContainer`].
    pub fn get_info(&self, path: &Path) -> FfmpegResult<MediaContainer> {
        self.ensure_open()?;
        let probe = self.tool.probe(path)?;
        Ok(MediaContainer::from_probe(&probe))
    }

    /// Stream-copy the first audio stream out of `path` into a registered
    /// temporary file, returning its path.
    pub fn extract_audio(&mut self, path: &Path) -> FfmpegResult<PathBuf> {
        self.extract_stream(path, StreamSelector::first_audio())
    }

    /// Stream-copy an arbitrary stream out of `path` into a registered
    /// temporary file.
    ///
    /// The default policy everywhere else is "first stream of the kind";
    /// this is the overridable selector variant.
    pub fn extract_stream(
        &mut self,
        path: &Path,
        selector: StreamSelector,
    ) -> FfmpegResult<PathBuf> {
        self.ensure_open()?;

        // One probe resolves both the selector and the codec, which gives
        // the artifact a truthful extension.
        let probe = self.tool.probe(path)?;
        let stream = probe
            .nth_of_kind(selector.kind, selector.nth)
            .ok_or_else(|| FfmpegError::StreamNotFound {
                path: path.to_path_buf(),
                kind: selector.kind,
                nth: selector.nth,
            })?;

        let output = self
            .temp
            .unique_path(&file_stem(path), extension_for_codec(&stream.codec));
        self.tool.extract_stream(path, stream, &output)?;
        Ok(self.temp.register(output))
    }

    /// Re-encode an audio file into `format`, writing to a registered
    /// temporary file and returning its path.
    pub fn convert_audio(&mut self, input: &Path, format: AudioFormat) -> FfmpegResult<PathBuf> {
        self.ensure_open()?;
        let output = self.temp.unique_path(&file_stem(input), format.extension());
        self.tool.convert_audio(input, format, &output)?;
        Ok(self.temp.register(output))
    }

    /// Extract the first audio stream and convert it to the intermediate
    /// uncompressed format, returning the converted file's path.
    ///
    /// Both the extracted and the converted file are registered and live
    /// until session close.
    pub fn extract_audio_wav(&mut self, path: &Path) -> FfmpegResult<PathBuf> {
        let extracted = self.extract_audio(path)?;
        self.convert_audio(&extracted, self.intermediate)
    }

    /// Rebuild `video` with `audio` appended as a new track.
    ///
    /// The destination equals `video` when `replace` is true (the original
    /// bytes are swapped out); otherwise it is `video` with the configured
    /// suffix inserted before the extension, and an existing destination
    /// fails with [`FfmpegError::DestinationExists`]. All streams are
    /// copied, never re-encoded.
    pub fn replace_audio(
        &mut self,
        video: &Path,
        audio: &Path,
        replace: bool,
    ) -> FfmpegResult<PathBuf> {
        self.ensure_open()?;

        let probe = self.tool.probe(video)?;
        let mut container = MediaContainer::from_probe(&probe);

        let audio_probe = self.tool.probe(audio)?;
        let track = audio_probe
            .nth_of_kind(StreamKind::Audio, 0)
            .ok_or_else(|| FfmpegError::StreamNotFound {
                path: audio.to_path_buf(),
                kind: StreamKind::Audio,
                nth: 0,
            })?;

        let index = container.next_index();
        container.add(
            Stream::new(index, StreamKind::Audio, &track.codec, audio)
                .with_source_index(track.index),
        )?;

        let destination = if replace {
            video.to_path_buf()
        } else {
            path_with_suffix(video, &self.suffix)
        };

        if replace {
            // ffmpeg cannot read and write the same file; stage the build
            // in the session directory and swap it into place.
            let staged = self.temp.unique_path(&file_stem(video), &file_extension(video));
            let staged = self.temp.register(staged);
            self.tool.build_container(&staged, &container, true)?;
            fs::remove_file(video)
                .map_err(|e| FfmpegError::io_error("removing original file", e))?;
            move_file(&staged, video)?;
        } else {
            self.tool.build_container(&destination, &container, false)?;
        }

        tracing::info!(
            "Rebuilt {} with audio track {} from {}",
            destination.display(),
            index,
            audio.display()
        );
        Ok(destination)
    }

    /// The full edit workflow: extract audio, convert it to the
    /// intermediate format, hand the intermediate path to `process`, then
    /// rebuild the container with the processed track appended.
    ///
    /// `process` is side-effect only; it is expected to rewrite the file at
    /// the given path (or leave it untouched). Its failure surfaces as
    /// [`FfmpegError::ProcessorFailed`]; intermediate files stay registered
    /// either way and are deleted at session close, not earlier, so callers
    /// may inspect them before closing.
    pub fn edit_video<F>(&mut self, path: &Path, process: F, replace: bool) -> FfmpegResult<PathBuf>
    where
        F: FnOnce(&Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>,
    {
        self.ensure_open()?;
        let intermediate = self.extract_audio_wav(path)?;
        process(&intermediate).map_err(FfmpegError::ProcessorFailed)?;
        self.replace_audio(path, &intermediate, replace)
    }

    /// Probe every file in a directory and summarize the codecs and
    /// languages seen. Files that cannot be probed are skipped.
    pub fn analyze_folder(&self, dir: &Path) -> FfmpegResult<FolderSummary> {
        self.ensure_open()?;

        let mut summary = FolderSummary::default();
        let entries =
            fs::read_dir(dir).map_err(|e| FfmpegError::io_error("reading folder", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| FfmpegError::io_error("reading folder entry", e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match self.tool.probe(&path) {
                Ok(probe) => summary.absorb(&MediaContainer::from_probe(&probe)),
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                }
            }
        }
        Ok(summary)
    }

    /// Close the session: delete every registered temporary artifact and
    /// mark all further operations invalid.
    ///
    /// Returns the artifacts that could not be deleted (normally empty).
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Vec<PathBuf> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;
        let leftover = self.temp.release_all();
        if leftover.is_empty() {
            tracing::debug!("Session closed, all temp artifacts deleted");
        } else {
            tracing::warn!(
                "Session closed with {} undeletable temp artifacts",
                leftover.len()
            );
        }
        leftover
    }
}

impl Drop for FfmpegSession {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

/// Aggregated codec/language information over a folder of media files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    /// Number of files that probed successfully.
    pub files: usize,
    /// Container formats seen.
    pub formats: BTreeSet<String>,
    /// Distinct video codecs.
    pub video_codecs: BTreeSet<String>,
    /// Distinct audio codecs.
    pub audio_codecs: BTreeSet<String>,
    /// Distinct audio languages.
    pub audio_languages: BTreeSet<String>,
    /// Distinct subtitle languages.
    pub subtitle_languages: BTreeSet<String>,
}

impl FolderSummary {
    fn absorb(&mut self, container: &MediaContainer) {
        self.files += 1;
        if let Some(format) = &container.format {
            self.formats.insert(format.clone());
        }
        for stream in container.streams() {
            match stream.kind {
                StreamKind::Video => {
                    self.video_codecs.insert(stream.codec.clone());
                }
                StreamKind::Audio => {
                    self.audio_codecs.insert(stream.codec.clone());
                    if let Some(lang) = &stream.language {
                        self.audio_languages.insert(lang.clone());
                    }
                }
                StreamKind::Subtitle => {
                    if let Some(lang) = &stream.language {
                        self.subtitle_languages.insert(lang.clone());
                    }
                }
                StreamKind::Other => {}
            }
        }
    }
}

impl std::fmt::Display for FolderSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        writeln!(f, "Files: {}", self.files)?;
        writeln!(f, "Formats: {}", join(&self.formats))?;
        writeln!(f, "Video codecs: {}", join(&self.video_codecs))?;
        writeln!(f, "Audio codecs: {}", join(&self.audio_codecs))?;
        writeln!(f, "Audio languages: {}", join(&self.audio_languages))?;
        write!(f, "Subtitle languages: {}", join(&self.subtitle_languages))
    }
}

/// Insert a suffix between a path's stem and extension.
fn path_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = file_stem(path);
    let ext = file_extension(path);
    let name = if ext.is_empty() {
        format!("{}{}", stem, suffix)
    } else {
        format!("{}{}.{}", stem, suffix, ext)
    };
    path.with_file_name(name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string())
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Rename a file, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> FfmpegResult<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| FfmpegError::io_error("copying output into place", e))?;
    fs::remove_file(from).map_err(|e| FfmpegError::io_error("removing staged output", e))?;
    Ok(())
}
