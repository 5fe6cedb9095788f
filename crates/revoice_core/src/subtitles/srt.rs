//! Append-only SRT subtitle writer.
//!
//! Serializes entries to the numbered "index / time-range / text / blank
//! line" format with millisecond `HH:MM:SS,mmm` timestamps. Insertion is
//! append-only and order-preserving: once an entry is written it is
//! immutable, and entries must not start before the previous one.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from subtitle writing.
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// An entry ends before it starts.
    #[error("entry ends at {end_ms}ms before its start at {start_ms}ms")]
    InvalidRange { start_ms: f64, end_ms: f64 },

    /// An entry starts before the previously written one.
    #[error("entry at {start_ms}ms precedes the previous entry at {previous_ms}ms")]
    NonMonotonic { start_ms: f64, previous_ms: f64 },

    /// Underlying I/O failure.
    #[error("subtitle I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One subtitle entry: a time range plus text.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    /// Start time in milliseconds.
    pub start_ms: f64,
    /// End time in milliseconds.
    pub end_ms: f64,
    /// Text content; may span multiple lines.
    pub text: String,
}

impl SubtitleEntry {
    /// Create an entry from millisecond timing.
    pub fn new(start_ms: f64, end_ms: f64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    /// Create an entry from second-based timing.
    pub fn from_secs(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self::new(start_secs * 1000.0, end_secs * 1000.0, text)
    }
}

/// Scoped writer producing an SRT document on any [`Write`] sink.
///
/// Indices are assigned automatically, starting at 1.
#[derive(Debug)]
pub struct SrtWriter<W: Write> {
    out: W,
    next_index: usize,
    last_start_ms: Option<f64>,
}

impl SrtWriter<BufWriter<File>> {
    /// Create a writer over a new file. A missing or wrong extension is
    /// corrected to `.srt`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SubtitleError> {
        let mut path = path.into();
        if path.extension().and_then(|e| e.to_str()) != Some("srt") {
            path.set_extension("srt");
        }
        let file = File::create(&path)?;
        tracing::debug!("Writing subtitles to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SrtWriter<W> {
    /// Wrap an arbitrary sink.
    pub fn new(out: W) -> Self {
        Self {
            out,
            next_index: 1,
            last_start_ms: None,
        }
    }

    /// Index the next entry will receive.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Append one entry, returning the index it was written under.
    pub fn write_entry(&mut self, entry: &SubtitleEntry) -> Result<usize, SubtitleError> {
        if entry.end_ms < entry.start_ms {
            return Err(SubtitleError::InvalidRange {
                start_ms: entry.start_ms,
                end_ms: entry.end_ms,
            });
        }
        if let Some(previous_ms) = self.last_start_ms {
            if entry.start_ms < previous_ms {
                return Err(SubtitleError::NonMonotonic {
                    start_ms: entry.start_ms,
                    previous_ms,
                });
            }
        }

        let index = self.next_index;
        writeln!(self.out, "{}", index)?;
        writeln!(
            self.out,
            "{} --> {}",
            format_srt_time(entry.start_ms),
            format_srt_time(entry.end_ms)
        )?;
        writeln!(self.out, "{}", entry.text)?;
        writeln!(self.out)?;

        self.next_index += 1;
        self.last_start_ms = Some(entry.start_ms);
        Ok(index)
    }

    /// Append an ordered batch of entries, returning the index of the last
    /// one written, or `None` for an empty batch. Stops at the first
    /// invalid entry.
    pub fn write_entries<'a, I>(&mut self, entries: I) -> Result<Option<usize>, SubtitleError>
    where
        I: IntoIterator<Item = &'a SubtitleEntry>,
    {
        let mut last = None;
        for entry in entries {
            last = Some(self.write_entry(entry)?);
        }
        Ok(last)
    }

    /// Flush and release the underlying sink.
    pub fn finish(mut self) -> Result<W, SubtitleError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm).
pub fn format_srt_time(ms: f64) -> String {
    let ms = ms.round().max(0.0) as u64;

    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

/// Convenience: write a full set of entries to a file in one call.
///
/// Returns the index of the last entry written, or `None` for an empty
/// set (the file is still created).
pub fn write_srt_file(
    path: &Path,
    entries: &[SubtitleEntry],
) -> Result<Option<usize>, SubtitleError> {
    let mut writer = SrtWriter::create(path)?;
    let last = writer.write_entries(entries)?;
    writer.finish()?;
    Ok(last)
}
