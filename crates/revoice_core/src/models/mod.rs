//! Data models for revoice.
//!
//! This module contains the core data structures used throughout the
//! library:
//! - Enums for stream kinds and audio formats
//! - The in-memory media container model (streams + metadata)

mod enums;
mod media;

// Re-export all public types
pub use enums::{AudioFormat, StreamKind};
pub use media::{MediaContainer, MediaError, Stream};

pub(crate) use media::first_reference_paths;
