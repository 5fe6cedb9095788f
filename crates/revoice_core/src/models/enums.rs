//! Core enums used throughout the library.

use serde::{Deserialize, Serialize};

/// Kind of media stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl StreamKind {
    /// Parse the `codec_type` field reported by ffprobe.
    pub fn from_codec_type(s: &str) -> Self {
        match s {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            "subtitle" => StreamKind::Subtitle,
            _ => StreamKind::Other,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Subtitle => write!(f, "subtitle"),
            StreamKind::Other => write!(f, "other"),
        }
    }
}

/// Container-less audio formats the conversion step can target.
///
/// Conversion is the one genuinely CPU-bound operation; everything else in
/// the library runs in stream-copy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Uncompressed PCM in a WAV container. The intermediate hand-off
    /// format for audio processing callbacks.
    #[default]
    Wav,
    Aac,
    Flac,
    Mp3,
    Opus,
}

impl AudioFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
        }
    }

    /// Encoder name passed to ffmpeg's `-acodec`.
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Opus => "libopus",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_kind_serializes_lowercase() {
        let json = serde_json::to_string(&StreamKind::Audio).unwrap();
        assert_eq!(json, "\"audio\"");
    }

    #[test]
    fn stream_kind_from_codec_type() {
        assert_eq!(StreamKind::from_codec_type("video"), StreamKind::Video);
        assert_eq!(StreamKind::from_codec_type("audio"), StreamKind::Audio);
        assert_eq!(
            StreamKind::from_codec_type("subtitle"),
            StreamKind::Subtitle
        );
        assert_eq!(StreamKind::from_codec_type("data"), StreamKind::Other);
    }

    #[test]
    fn audio_format_codec_mapping() {
        assert_eq!(AudioFormat::Wav.codec(), "pcm_s16le");
        assert_eq!(AudioFormat::Wav.extension(), "wav");
        assert_eq!(AudioFormat::Opus.codec(), "libopus");
    }
}
