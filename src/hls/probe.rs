use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// Unchanged for at least the configured age, safe to read
    Stable,
    /// Removed (or unreadable) before it settled
    Gone,
    /// The session stopped while waiting
    Cancelled,
}

/// Decides when a file has stopped being written.
///
/// Assumes a writer never resumes after a quiet period, which holds for
/// segments but not for playlists.
#[derive(Debug, Clone, Copy)]
pub struct StabilityProbe {
    min_age: Duration,
    poll_interval: Duration,
}

impl StabilityProbe {
    pub fn new(min_age: Duration, poll_interval: Duration) -> Self {
        Self {
            min_age,
            poll_interval,
        }
    }

    /// Single observation: `None` if the file is gone, otherwise whether it is old enough.
    pub async fn check(&self, path: &Path) -> Option<bool> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) => {
                trace!("[probe] stat {} failed: {}", path.display(), e);
                return None;
            }
        };
        // mtime in the future (clock step) counts as fresh
        let age = meta
            .modified()
            .ok()
            .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default());
        Some(age.is_none_or(|age| age > self.min_age))
    }

    /// Poll until the file is stable or gone. An already settled file
    /// resolves on the first check without sleeping.
    pub async fn wait(&self, path: &Path, cancel: &CancellationToken) -> Stability {
        loop {
            match self.check(path).await {
                None => return Stability::Gone,
                Some(true) => return Stability::Stable,
                Some(false) => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => return Stability::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
