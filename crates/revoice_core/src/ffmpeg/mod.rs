//! External transcoding tool invocation.
//!
//! This module wraps the ffmpeg and ffprobe binaries behind a typed
//! interface:
//!
//! - **Probe**: inspect a container into stream metadata
//! - **Extract**: stream-copy one stream out of a container
//! - **Convert**: re-encode audio between bare formats
//! - **Build**: multiplex streams from multiple sources into one file
//!
//! All codec work is delegated to the external process; this library only
//! owns orchestration. Stream-copy mode is requested everywhere rebuilding
//! or extraction is possible, so bulk multi-file workflows scale with data
//! size rather than with video duration times codec complexity.

mod error;
mod probe;
mod tool;

pub use error::{FfmpegError, FfmpegResult};
pub use probe::{ProbedStream, ProbeResult};
pub use tool::{FfmpegTool, StreamSelector};

pub(crate) use tool::extension_for_codec;
