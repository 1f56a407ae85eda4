use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storage::ObjectStore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use super::probe::{Stability, StabilityProbe};
use super::{Stats, lock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    Probing,
    Uploaded,
    Failed,
}

/// Uploads each segment file once, after it stabilizes.
pub struct SegmentUploader {
    store: Arc<dyn ObjectStore>,
    probe: StabilityProbe,
    remote_prefix: String,
    upload_timeout: Duration,
    // A path present here is either being probed or done for this session.
    states: Mutex<HashMap<PathBuf, SegmentState>>,
    stats: Arc<Stats>,
}

impl SegmentUploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        probe: StabilityProbe,
        remote_prefix: String,
        upload_timeout: Duration,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            store,
            probe,
            remote_prefix,
            upload_timeout,
            states: Mutex::new(HashMap::new()),
            stats,
        }
    }

    /// React to a create/write notification for `path`.
    ///
    /// Returns true if a probe task was spawned; repeated notifications for a
    /// path that is probing or already handled are no-ops.
    pub fn notify(
        self: &Arc<Self>,
        path: PathBuf,
        tracker: &TaskTracker,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.claim(&path) {
            trace!("[segment] {} already claimed", path.display());
            return false;
        }
        let uploader = self.clone();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            let outcome = uploader.process(&path, &cancel).await;
            uploader.settle(path, outcome);
        });
        true
    }

    /// Number of paths with a probe in progress
    #[cfg(test)]
    pub fn probing(&self) -> usize {
        lock(&self.states)
            .values()
            .filter(|s| **s == SegmentState::Probing)
            .count()
    }

    fn claim(&self, path: &Path) -> bool {
        match lock(&self.states).entry(path.to_path_buf()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(SegmentState::Probing);
                true
            }
        }
    }

    // `None` forgets the path so a re-created file can be picked up again.
    fn settle(&self, path: PathBuf, outcome: Option<SegmentState>) {
        let mut states = lock(&self.states);
        match outcome {
            Some(state) => {
                states.insert(path, state);
            }
            None => {
                states.remove(&path);
            }
        }
    }

    async fn process(&self, path: &Path, cancel: &CancellationToken) -> Option<SegmentState> {
        match self.probe.wait(path, cancel).await {
            Stability::Stable => self.upload(path).await,
            Stability::Gone => {
                debug!("[segment] {} removed before it stabilized", path.display());
                self.stats.segment_abandoned();
                None
            }
            Stability::Cancelled => {
                debug!("[segment] {} probe cancelled", path.display());
                None
            }
        }
    }

    async fn upload(&self, path: &Path) -> Option<SegmentState> {
        let Some(key) = storage::remote_key(&self.remote_prefix, path) else {
            warn!("[segment] {} has no usable file name", path.display());
            self.stats.segment_failed();
            return Some(SegmentState::Failed);
        };

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[segment] {} removed before upload", path.display());
                self.stats.segment_abandoned();
                return None;
            }
            Err(e) => {
                error!("[segment] open {} failed: {}", path.display(), e);
                self.stats.segment_failed();
                return Some(SegmentState::Failed);
            }
        };

        match self.store.put(file, &key, self.upload_timeout).await {
            Ok(()) => {
                info!("[segment] uploaded {} to {}", path.display(), key);
                self.stats.segment_uploaded();
                Some(SegmentState::Uploaded)
            }
            Err(e) => {
                error!("[segment] upload {} to {} failed: {:#}", path.display(), key, e);
                self.stats.segment_failed();
                Some(SegmentState::Failed)
            }
        }
    }
}
