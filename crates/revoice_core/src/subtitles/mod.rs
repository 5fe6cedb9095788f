//! Subtitle file generation.
//!
//! Currently SRT only, matching what the container build step can carry in
//! both `.mkv` and standalone sidecar form.

mod srt;

pub use srt::{format_srt_time, write_srt_file, SrtWriter, SubtitleEntry, SubtitleError};
