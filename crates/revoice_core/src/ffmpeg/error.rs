//! Error types for ffmpeg invocation and session orchestration.
//!
//! Every failure is surfaced to the caller of the operation that triggered
//! it; a partially built container or a missing stream is a correctness
//! issue, not a recoverable transient. The one local-recovery case is
//! temp-file cleanup, which collects deletion failures instead of aborting.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::{MediaError, StreamKind};

/// Errors from ffmpeg invocation and the session façade.
#[derive(Error, Debug)]
pub enum FfmpegError {
    /// The configured binary path could not be spawned.
    #[error("external tool not found: {0}")]
    ToolNotFound(PathBuf),

    /// ffprobe exited non-zero or produced unparseable metadata.
    #[error("failed to probe {path}: {message}")]
    ProbeFailed { path: PathBuf, message: String },

    /// No stream in the file matched the selector.
    #[error("no {kind} stream #{nth} in {path}")]
    StreamNotFound {
        path: PathBuf,
        kind: StreamKind,
        nth: usize,
    },

    /// Container build (multiplex) failed.
    #[error("container build of {output} failed with exit code {exit_code}: {message}")]
    BuildFailed {
        output: PathBuf,
        exit_code: i32,
        message: String,
    },

    /// The destination already exists and overwriting was not allowed.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// The tool ran past the configured timeout and was killed.
    #[error("{tool} timed out after {timeout_secs}s")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    /// An operation was called on a closed session.
    #[error("session is closed")]
    SessionClosed,

    /// Container composition failed (duplicate stream index).
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The tool exited non-zero on a non-build operation.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// A required input file was not found.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O error with operation context.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The caller-supplied audio processor failed.
    #[error("audio processor failed: {0}")]
    ProcessorFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FfmpegError {
    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a probe failed error.
    pub fn probe_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for ffmpeg and session operations.
pub type FfmpegResult<T> = Result<T, FfmpegError>;
