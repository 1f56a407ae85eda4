use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use storage::ObjectStore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace};

use super::{Stats, lock};

#[derive(Debug, Default)]
struct ThrottleState {
    last_success: Option<Instant>,
    in_flight: bool,
}

/// Republishes playlists at most once per interval for the whole session.
///
/// Playlists are rewritten continuously, so there is no stability wait: the
/// snapshot read at upload time is published as is.
pub struct PlaylistThrottler {
    store: Arc<dyn ObjectStore>,
    interval: Duration,
    remote_prefix: String,
    upload_timeout: Duration,
    state: Mutex<ThrottleState>,
    stats: Arc<Stats>,
}

/// Exclusive right to upload; released on drop
struct Reservation {
    throttler: Arc<PlaylistThrottler>,
}

impl Reservation {
    /// Release the slot, starting the interval only after a success
    fn finish(self, uploaded: bool) {
        if uploaded {
            lock(&self.throttler.state).last_success = Some(Instant::now());
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        lock(&self.throttler.state).in_flight = false;
    }
}

impl PlaylistThrottler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        interval: Duration,
        remote_prefix: String,
        upload_timeout: Duration,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            store,
            interval,
            remote_prefix,
            upload_timeout,
            state: Mutex::new(ThrottleState::default()),
            stats,
        }
    }

    /// React to a playlist notification. Returns true if an upload was started.
    pub fn notify(self: &Arc<Self>, path: PathBuf, tracker: &TaskTracker) -> bool {
        let Some(reservation) = self.try_reserve(Instant::now()) else {
            trace!("[playlist] {} throttled", path.display());
            return false;
        };
        tracker.spawn(async move {
            let uploaded = reservation.throttler.upload(&path).await;
            reservation.finish(uploaded);
        });
        true
    }

    /// Publish the closing version of a playlist regardless of the interval.
    /// Callers must have drained every throttled upload first.
    pub async fn flush(&self, path: &Path) -> bool {
        let uploaded = self.upload(path).await;
        if uploaded {
            lock(&self.state).last_success = Some(Instant::now());
        }
        uploaded
    }

    /// Check and take the upload slot in one critical section
    fn try_reserve(self: &Arc<Self>, now: Instant) -> Option<Reservation> {
        let mut state = lock(&self.state);
        if state.in_flight {
            return None;
        }
        if let Some(last) = state.last_success {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        state.in_flight = true;
        Some(Reservation {
            throttler: self.clone(),
        })
    }

    async fn upload(&self, path: &Path) -> bool {
        let Some(key) = storage::remote_key(&self.remote_prefix, path) else {
            return false;
        };
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("[playlist] open {} failed: {}", path.display(), e);
                return false;
            }
        };
        match self.store.put(file, &key, self.upload_timeout).await {
            Ok(()) => {
                info!("[playlist] uploaded {} to {}", path.display(), key);
                self.stats.playlist_uploaded();
                true
            }
            Err(e) => {
                error!("[playlist] upload {} to {} failed: {:#}", path.display(), key, e);
                self.stats.playlist_failed();
                false
            }
        }
    }
}
