//! In-memory description of a media container and its streams.
//!
//! A [`MediaContainer`] never owns file bytes; each [`Stream`] references
//! the file its bytes currently live in via `source_path`. Materializing a
//! container on disk is a separate build step performed by the ffmpeg
//! wrapper.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::StreamKind;
use crate::ffmpeg::ProbeResult;

/// Error type for container composition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// A stream with this output index already exists in the container.
    #[error("duplicate stream index {0}")]
    DuplicateStreamIndex(usize),
}

/// One media track inside a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Ordinal position in the output container. Unique per container;
    /// ascending index order defines the output stream order.
    pub index: usize,
    /// Kind of stream (video, audio, subtitle).
    pub kind: StreamKind,
    /// Codec identifier as reported by ffprobe (opaque to this library).
    pub codec: String,
    /// Language tag, if the source declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Stream duration in seconds, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// File the stream's bytes currently live in. May differ from the
    /// container's own path before a build step.
    pub source_path: PathBuf,
    /// Ordinal of this stream inside its own source file (ffmpeg `-map`
    /// numbering). Equals `index` for freshly probed containers, 0 for
    /// bare audio files.
    pub source_index: usize,
}

impl Stream {
    /// Create a new stream referencing `source_path`.
    ///
    /// `source_index` defaults to 0, which is correct for single-stream
    /// source files such as extracted or converted audio.
    pub fn new(
        index: usize,
        kind: StreamKind,
        codec: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            kind,
            codec: codec.into(),
            language: None,
            duration_secs: None,
            source_path: source_path.into(),
            source_index: 0,
        }
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the duration in seconds.
    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    /// Set the ordinal within the source file.
    pub fn with_source_index(mut self, source_index: usize) -> Self {
        self.source_index = source_index;
        self
    }
}

/// An ordered, append-only set of streams plus container-level metadata.
///
/// Constructed either empty or from a probe of a real file. The only
/// mutation is [`add`](Self::add); there is no reordering or removal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaContainer {
    streams: Vec<Stream>,
    /// Container format hint (ffprobe `format_name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Overall duration in seconds, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl MediaContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from the inspected metadata of a real file.
    ///
    /// Every probed stream's `source_path` is set to the probed file and
    /// its `source_index` to its probed index.
    pub fn from_probe(probe: &ProbeResult) -> Self {
        let mut streams: Vec<Stream> = probe
            .streams
            .iter()
            .map(|s| {
                let mut stream = Stream::new(s.index, s.kind, &s.codec, &probe.path)
                    .with_source_index(s.index);
                stream.language = s.language.clone();
                stream.duration_secs = s.duration_secs;
                stream
            })
            .collect();
        streams.sort_by_key(|s| s.index);

        Self {
            streams,
            format: Some(probe.format.clone()),
            duration_secs: probe.duration_secs,
        }
    }

    /// Append a stream.
    ///
    /// Fails with [`MediaError::DuplicateStreamIndex`] if a stream with the
    /// same `index` is already present, leaving the container unchanged.
    pub fn add(&mut self, stream: Stream) -> Result<(), MediaError> {
        if self.streams.iter().any(|s| s.index == stream.index) {
            return Err(MediaError::DuplicateStreamIndex(stream.index));
        }
        let pos = self
            .streams
            .iter()
            .position(|s| s.index > stream.index)
            .unwrap_or(self.streams.len());
        self.streams.insert(pos, stream);
        Ok(())
    }

    /// The next unused stream index (max + 1, or 0 for an empty container).
    pub fn next_index(&self) -> usize {
        self.streams.last().map(|s| s.index + 1).unwrap_or(0)
    }

    /// Streams in ascending index order.
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// First stream of the given kind, in index order.
    pub fn first_of(&self, kind: StreamKind) -> Option<&Stream> {
        self.streams.iter().find(|s| s.kind == kind)
    }

    /// Number of streams.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether the container has no streams.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Distinct source files, in first-reference order.
    ///
    /// This is the `-i` input order a build step uses.
    pub fn source_paths(&self) -> Vec<&Path> {
        first_reference_paths(&self.streams)
    }
}

/// Distinct source files over streams in the given order, first reference
/// first. The build step applies this to its kept streams after any
/// destination-format filtering.
pub(crate) fn first_reference_paths<'a>(
    streams: impl IntoIterator<Item = &'a Stream>,
) -> Vec<&'a Path> {
    let mut paths: Vec<&Path> = Vec::new();
    for stream in streams {
        let path = stream.source_path.as_path();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}
