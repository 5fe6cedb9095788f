//! Container probing via ffprobe JSON output.
//!
//! Runs `ffprobe -show_streams -show_format -of json` and parses the
//! result into a [`ProbeResult`] describing every stream in the file.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::{FfmpegError, FfmpegResult};
use crate::models::StreamKind;

/// One stream as reported by ffprobe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedStream {
    /// Stream index within the probed file (ffprobe ordering).
    pub index: usize,
    /// Kind of stream.
    pub kind: StreamKind,
    /// Codec name (e.g. "h264", "aac").
    pub codec: String,
    /// Language tag from stream tags, if present.
    pub language: Option<String>,
    /// Stream duration in seconds, if reported.
    pub duration_secs: Option<f64>,
}

/// Parsed metadata for a probed container file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// The probed file.
    pub path: PathBuf,
    /// Container format name (ffprobe `format_name`).
    pub format: String,
    /// Overall duration in seconds, if reported.
    pub duration_secs: Option<f64>,
    /// Streams in index order.
    pub streams: Vec<ProbedStream>,
}

impl ProbeResult {
    /// Find the nth stream of a kind (0-based, in index order).
    pub fn nth_of_kind(&self, kind: StreamKind, nth: usize) -> Option<&ProbedStream> {
        self.streams.iter().filter(|s| s.kind == kind).nth(nth)
    }
}

/// Parse the JSON output of `ffprobe -show_streams -show_format -of json`.
pub(crate) fn parse_probe_json(json: &Value, path: &Path) -> FfmpegResult<ProbeResult> {
    let mut result = ProbeResult {
        path: path.to_path_buf(),
        format: String::new(),
        duration_secs: None,
        streams: Vec::new(),
    };

    if let Some(format) = json.get("format") {
        result.format = format
            .get("format_name")
            .and_then(|f| f.as_str())
            .unwrap_or("unknown")
            .to_string();

        // ffprobe reports duration as a string
        result.duration_secs = format
            .get("duration")
            .and_then(|d| d.as_str())
            .and_then(|s| s.parse().ok());
    }

    let Some(streams) = json.get("streams").and_then(|s| s.as_array()) else {
        return Err(FfmpegError::probe_failed(path, "no streams in probe output"));
    };

    for stream in streams {
        if let Some(probed) = parse_stream(stream) {
            result.streams.push(probed);
        }
    }
    result.streams.sort_by_key(|s| s.index);

    Ok(result)
}

/// Parse a single entry of the `streams` array.
fn parse_stream(stream: &Value) -> Option<ProbedStream> {
    let index = stream.get("index")?.as_u64()? as usize;

    let kind = stream
        .get("codec_type")
        .and_then(|t| t.as_str())
        .map(StreamKind::from_codec_type)
        .unwrap_or(StreamKind::Other);

    let codec = stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();

    let language = stream
        .get("tags")
        .and_then(|t| t.get("language"))
        .and_then(|l| l.as_str())
        .map(|s| s.to_string());

    let duration_secs = stream
        .get("duration")
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse().ok());

    Some(ProbedStream {
        index,
        kind,
        codec,
        language,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "duration": "120.500000"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "duration": "120.400000",
                "tags": { "language": "rus" }
            },
            {
                "index": 2,
                "codec_name": "subrip",
                "codec_type": "subtitle"
            }
        ],
        "format": {
            "format_name": "matroska,webm",
            "duration": "120.512000"
        }
    }"#;

    #[test]
    fn parses_streams_and_format() {
        let json: Value = serde_json::from_str(SAMPLE).unwrap();
        let probe = parse_probe_json(&json, Path::new("/media/movie.mkv")).unwrap();

        assert_eq!(probe.format, "matroska,webm");
        assert_eq!(probe.duration_secs, Some(120.512));
        assert_eq!(probe.streams.len(), 3);

        let audio = &probe.streams[1];
        assert_eq!(audio.index, 1);
        assert_eq!(audio.kind, StreamKind::Audio);
        assert_eq!(audio.codec, "aac");
        assert_eq!(audio.language.as_deref(), Some("rus"));
    }

    #[test]
    fn nth_of_kind_counts_within_kind() {
        let json: Value = serde_json::from_str(SAMPLE).unwrap();
        let probe = parse_probe_json(&json, Path::new("/media/movie.mkv")).unwrap();

        assert_eq!(probe.nth_of_kind(StreamKind::Audio, 0).unwrap().index, 1);
        assert!(probe.nth_of_kind(StreamKind::Audio, 1).is_none());
        assert_eq!(probe.nth_of_kind(StreamKind::Subtitle, 0).unwrap().index, 2);
    }

    #[test]
    fn missing_streams_is_probe_failure() {
        let json: Value = serde_json::from_str(r#"{"format": {}}"#).unwrap();
        let result = parse_probe_json(&json, Path::new("/media/movie.mkv"));
        assert!(matches!(result, Err(FfmpegError::ProbeFailed { .. })));
    }
}
