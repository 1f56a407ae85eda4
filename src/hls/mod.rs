//! Live HLS capture and publish.
//!
//! A transcoder writes segments and a playlist into a local directory. A
//! watch session follows that directory, uploads every segment once it has
//! stopped changing, and republishes the playlist at most once per interval.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::metrics;

mod playlist;
mod probe;
mod segment;
mod supervisor;
mod watcher;


pub use playlist::PlaylistThrottler;
pub use probe::{Stability, StabilityProbe};
pub use segment::SegmentUploader;
pub use supervisor::{Supervisor, WatchHandle};
pub use watcher::{Classifier, DirectoryWatcher, FileKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("watch directory {} is not usable: {}", .0.display(), .1)]
    Directory(PathBuf, #[source] std::io::Error),
    #[error("remote prefix {0} is already being published")]
    PrefixInUse(String),
    #[error("no watch session publishing to {0}")]
    NotFound(String),
    #[error("filesystem notification: {0}")]
    Notify(#[from] notify::Error),
}

/// Tuning for one watch session
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Minimum gap between two playlist uploads
    pub playlist_interval: Duration,
    /// A segment is stable once its mtime is older than this
    pub stable_age: Duration,
    pub poll_interval: Duration,
    /// Deadline handed to every single put
    pub upload_timeout: Duration,
    pub segment_extensions: Vec<String>,
    pub playlist_extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            playlist_interval: Duration::from_secs(120),
            stable_age: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            upload_timeout: Duration::from_secs(30),
            segment_extensions: vec!["ts".to_string()],
            playlist_extensions: vec!["m3u8".to_string()],
        }
    }
}

/// One directory published under one remote prefix
#[derive(Debug, Clone)]
pub struct WatchSession {
    pub local_dir: PathBuf,
    pub remote_prefix: String,
    pub config: WatchConfig,
}

impl WatchSession {
    pub fn new(local_dir: impl Into<PathBuf>, remote_prefix: &str, config: WatchConfig) -> Self {
        Self {
            local_dir: local_dir.into(),
            remote_prefix: remote_prefix.trim_matches('/').to_string(),
            config,
        }
    }
}

/// Per-session counters, mirrored into the process-wide prometheus metrics
#[derive(Debug, Default)]
pub struct Stats {
    segments: AtomicU64,
    segment_failures: AtomicU64,
    segments_abandoned: AtomicU64,
    playlists: AtomicU64,
    playlist_failures: AtomicU64,
    watcher_errors: AtomicU64,
}

impl Stats {
    pub(crate) fn segment_uploaded(&self) {
        self.segments.fetch_add(1, Ordering::Relaxed);
        metrics::SEGMENT_UPLOADS.inc();
    }

    pub(crate) fn segment_failed(&self) {
        self.segment_failures.fetch_add(1, Ordering::Relaxed);
        metrics::SEGMENT_UPLOAD_FAILURES.inc();
    }

    pub(crate) fn segment_abandoned(&self) {
        self.segments_abandoned.fetch_add(1, Ordering::Relaxed);
        metrics::SEGMENT_ABANDONED.inc();
    }

    pub(crate) fn playlist_uploaded(&self) {
        self.playlists.fetch_add(1, Ordering::Relaxed);
        metrics::PLAYLIST_UPLOADS.inc();
    }

    pub(crate) fn playlist_failed(&self) {
        self.playlist_failures.fetch_add(1, Ordering::Relaxed);
        metrics::PLAYLIST_UPLOAD_FAILURES.inc();
    }

    pub(crate) fn watcher_error(&self) {
        self.watcher_errors.fetch_add(1, Ordering::Relaxed);
        metrics::WATCHER_ERRORS.inc();
    }

    pub fn snapshot(&self) -> api::response::UploadStats {
        api::response::UploadStats {
            segments: self.segments.load(Ordering::Relaxed),
            segment_failures: self.segment_failures.load(Ordering::Relaxed),
            segments_abandoned: self.segments_abandoned.load(Ordering::Relaxed),
            playlists: self.playlists.load(Ordering::Relaxed),
            playlist_failures: self.playlist_failures.load(Ordering::Relaxed),
            watcher_errors: self.watcher_errors.load(Ordering::Relaxed),
        }
    }
}

// Critical sections never panic mid-update, a poisoned guard is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
