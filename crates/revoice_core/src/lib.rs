//! revoice core - audio track replacement for video containers.
//!
//! This crate orchestrates an external ffmpeg installation to inspect
//! media containers, extract and convert audio tracks, and rebuild
//! containers with processed tracks appended. It performs no codec work
//! itself; every operation except audio conversion runs in stream-copy
//! mode, so bulk workflows stay I/O-bound.
//!
//! The entry point is [`FfmpegSession`], a scoped session that owns its
//! temporary artifacts and guarantees their deletion on close:
//!
//! ```no_run
//! use revoice_core::FfmpegSession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = FfmpegSession::open("ffmpeg")?;
//! let output = session.edit_video(
//!     std::path::Path::new("movie.mp4"),
//!     |_wav| {
//!         // rewrite the intermediate wav in place
//!         Ok(())
//!     },
//!     false,
//! )?;
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ffmpeg;
pub mod logging;
pub mod models;
pub mod session;
pub mod subtitles;
pub mod temp;
pub mod translate;

pub use ffmpeg::{FfmpegError, FfmpegResult, FfmpegTool, StreamSelector};
pub use models::{AudioFormat, MediaContainer, Stream, StreamKind};
pub use session::{FfmpegSession, FolderSummary};
pub use temp::TempArtifactRegistry;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
