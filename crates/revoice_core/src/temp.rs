//! Temporary artifact tracking with guaranteed cleanup.
//!
//! Every intermediate file an orchestration session creates is registered
//! here; [`release_all`](TempArtifactRegistry::release_all) deletes all of
//! them when the session ends, on every exit path. Individual deletion
//! failures are collected rather than raised so cleanup of the remaining
//! artifacts always proceeds.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Tracks temporary file paths owned by one session.
///
/// The registry owns a unique temporary directory, so concurrent sessions
/// never share artifact locations and need no cross-session coordination.
#[derive(Debug)]
pub struct TempArtifactRegistry {
    dir: TempDir,
    paths: Vec<PathBuf>,
    counter: u64,
}

impl TempArtifactRegistry {
    /// Create a registry with a fresh, uniquely named temp directory.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("revoice-").tempdir()?;
        tracing::debug!("Session temp directory: {}", dir.path().display());
        Ok(Self {
            dir,
            paths: Vec::new(),
            counter: 0,
        })
    }

    /// The session's temporary directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Hand out a collision-free path inside the session directory.
    ///
    /// The path is not created and not yet registered; register it once
    /// the artifact actually exists.
    pub fn unique_path(&mut self, stem: &str, extension: &str) -> PathBuf {
        self.counter += 1;
        self.dir
            .path()
            .join(format!("{}-{:04}.{}", stem, self.counter, extension))
    }

    /// Record a path for deletion at session end. Returns the path
    /// unchanged for chaining.
    pub fn register(&mut self, path: PathBuf) -> PathBuf {
        tracing::debug!("Registered temp artifact: {}", path.display());
        self.paths.push(path.clone());
        path
    }

    /// Number of registered artifacts.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no artifacts are registered.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every registered path, returning the ones that could not be
    /// deleted. Paths that are already gone are not failures.
    pub fn release_all(&mut self) -> Vec<PathBuf> {
        let mut failed = Vec::new();
        for path in self.paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Deleted temp artifact: {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", path.display(), e);
                    failed.push(path);
                }
            }
        }
        failed
    }
}
