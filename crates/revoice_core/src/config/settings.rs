//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default so partial config files load cleanly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ffmpeg::FfmpegTool;
use crate::models::AudioFormat;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// External tool configuration.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Output naming and intermediate-format configuration.
    #[serde(default)]
    pub output: OutputSettings,

    /// Translation routing configuration.
    #[serde(default)]
    pub translate: TranslateSettings,
}

/// Paths and limits for the external transcoding tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Path to the ffmpeg executable.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to the ffprobe executable. Empty means "derive from
    /// ffmpeg_path" (sibling binary).
    #[serde(default)]
    pub ffprobe_path: PathBuf,

    /// Per-invocation timeout in seconds. 0 disables the timeout.
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: PathBuf::new(),
            timeout_secs: 0,
        }
    }
}

impl ToolSettings {
    /// Construct a tool wrapper from these settings.
    pub fn build_tool(&self) -> FfmpegTool {
        let mut tool = FfmpegTool::new(&self.ffmpeg_path);
        if !self.ffprobe_path.as_os_str().is_empty() {
            tool = tool.with_ffprobe(&self.ffprobe_path);
        }
        if self.timeout_secs > 0 {
            tool = tool.with_timeout(Duration::from_secs(self.timeout_secs));
        }
        tool
    }
}

/// Output naming and conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Suffix inserted before the extension when not replacing in place.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Intermediate audio format handed to processing callbacks.
    #[serde(default)]
    pub intermediate_format: AudioFormat,
}

fn default_suffix() -> String {
    "_replaced".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            intermediate_format: AudioFormat::default(),
        }
    }
}

/// Language routing for the translation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateSettings {
    /// Source language code.
    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    /// Pivot language code for indirect translations.
    #[serde(default = "default_pivot_lang")]
    pub pivot_lang: String,
}

fn default_source_lang() -> String {
    "ru".to_string()
}

fn default_pivot_lang() -> String {
    "en".to_string()
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            pivot_lang: default_pivot_lang(),
        }
    }
}
