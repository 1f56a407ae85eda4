use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storage::ObjectStore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::playlist::PlaylistThrottler;
use super::probe::StabilityProbe;
use super::segment::SegmentUploader;
use super::watcher::{self, Classifier, DirectoryWatcher, FileKind};
use super::{Error, Stats, WatchSession, lock};
use crate::metrics;

/// Lifecycle of one running watch session.
///
/// The event loop is the only task tracked here; it owns the per-file tasks
/// and drains them before returning, so `wait` returns only once nothing is
/// left touching the directory or the store.
pub struct WatchHandle {
    session: WatchSession,
    stats: Arc<Stats>,
    // `stop` is a child of `abort`: aborting also stops the event loop.
    abort: CancellationToken,
    stop: CancellationToken,
    tracker: TaskTracker,
    started_at: i64,
    #[cfg(test)]
    injector: tokio::sync::mpsc::UnboundedSender<notify::Result<notify::Event>>,
}

struct Dispatcher {
    local_dir: PathBuf,
    classifier: Classifier,
    segments: Arc<SegmentUploader>,
    playlists: Arc<PlaylistThrottler>,
    stats: Arc<Stats>,
    tasks: TaskTracker,
    abort: CancellationToken,
    stop: CancellationToken,
}

impl Dispatcher {
    fn dispatch(&self, path: PathBuf) {
        if path.parent() != Some(self.local_dir.as_path()) {
            return;
        }
        match self.classifier.classify(&path) {
            Some(FileKind::Segment) => {
                self.segments.notify(path, &self.tasks, &self.abort);
            }
            Some(FileKind::Playlist) => {
                self.playlists.notify(path, &self.tasks);
            }
            None => {}
        }
    }

    async fn scan(&self) -> Vec<PathBuf> {
        match watcher::scan_dir(&self.local_dir).await {
            Ok(files) => {
                debug!("[watcher] sweep found {} files in {}", files.len(), self.local_dir.display());
                files
            }
            Err(e) => {
                warn!("[watcher] scan {} failed: {}", self.local_dir.display(), e);
                self.stats.watcher_error();
                Vec::new()
            }
        }
    }

    async fn sweep(&self) {
        for path in self.scan().await {
            self.dispatch(path);
        }
    }

    /// Publish what the writer left behind: segments never notified or still
    /// settling, then one unthrottled upload of each playlist.
    async fn drain(&self) {
        let files = self.scan().await;
        for path in &files {
            if self.classifier.classify(path) == Some(FileKind::Segment) {
                self.segments.notify(path.clone(), &self.tasks, &self.abort);
            }
        }
        self.tasks.close();
        self.tasks.wait().await;
        if self.abort.is_cancelled() {
            return;
        }
        for path in &files {
            if self.classifier.classify(path) == Some(FileKind::Playlist) {
                self.playlists.flush(path).await;
            }
        }
    }

    async fn run(self, mut watcher: DirectoryWatcher) {
        self.sweep().await;
        loop {
            let event = tokio::select! {
                _ = self.stop.cancelled() => break,
                event = watcher.next() => event,
            };
            match event {
                Some(Ok(event)) => {
                    if event.need_rescan() {
                        warn!("[watcher] {} dropped events, rescanning", self.local_dir.display());
                        self.stats.watcher_error();
                        self.sweep().await;
                        continue;
                    }
                    for path in watcher::changed_paths(event) {
                        self.dispatch(path);
                    }
                }
                Some(Err(e)) => {
                    warn!("[watcher] {} notification error: {}", self.local_dir.display(), e);
                    self.stats.watcher_error();
                }
                None => {
                    warn!("[watcher] {} notification channel closed", self.local_dir.display());
                    break;
                }
            }
        }
        drop(watcher);

        if self.abort.is_cancelled() {
            self.tasks.close();
            self.tasks.wait().await;
        } else {
            self.drain().await;
        }
        info!("[watcher] stopped watching {}", self.local_dir.display());
    }
}

impl WatchHandle {
    /// Subscribe to the session directory and start publishing in the
    /// background.
    pub async fn start(session: WatchSession, store: Arc<dyn ObjectStore>) -> Result<Self, Error> {
        let meta = tokio::fs::metadata(&session.local_dir)
            .await
            .map_err(|e| Error::Directory(session.local_dir.clone(), e))?;
        if !meta.is_dir() {
            return Err(Error::Directory(
                session.local_dir.clone(),
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        // Events report canonical paths on some platforms.
        let local_dir = tokio::fs::canonicalize(&session.local_dir)
            .await
            .map_err(|e| Error::Directory(session.local_dir.clone(), e))?;

        let watcher = DirectoryWatcher::subscribe(&local_dir)?;
        #[cfg(test)]
        let injector = watcher.injector();

        let config = &session.config;
        let stats = Arc::new(Stats::default());
        let abort = CancellationToken::new();
        let stop = abort.child_token();
        let tracker = TaskTracker::new();

        let dispatcher = Dispatcher {
            local_dir,
            classifier: Classifier::new(&config.segment_extensions, &config.playlist_extensions),
            segments: Arc::new(SegmentUploader::new(
                store.clone(),
                StabilityProbe::new(config.stable_age, config.poll_interval),
                session.remote_prefix.clone(),
                config.upload_timeout,
                stats.clone(),
            )),
            playlists: Arc::new(PlaylistThrottler::new(
                store,
                config.playlist_interval,
                session.remote_prefix.clone(),
                config.upload_timeout,
                stats.clone(),
            )),
            stats: stats.clone(),
            tasks: TaskTracker::new(),
            abort: abort.clone(),
            stop: stop.clone(),
        };
        tracker.spawn(dispatcher.run(watcher));
        tracker.close();

        info!(
            "[watcher] publishing {} to {}",
            session.local_dir.display(),
            session.remote_prefix
        );

        Ok(Self {
            session,
            stats,
            abort,
            stop,
            tracker,
            started_at: chrono::Utc::now().timestamp_millis(),
            #[cfg(test)]
            injector,
        })
    }

    /// Stop reacting to new events and drain: pending segments are still
    /// published once stable and each playlist gets a final upload.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Stop without draining. Pending probes are dropped, uploads already
    /// started run to completion.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Upper bound on a drain once the writer is gone
    pub fn drain_budget(&self) -> Duration {
        let config = &self.session.config;
        config.stable_age + config.poll_interval + config.upload_timeout * 2
    }

    /// Resolve once the session is stopped and every task has drained.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    pub async fn stop_and_wait(&self) {
        self.stop();
        self.wait().await;
    }

    pub fn stats(&self) -> api::response::UploadStats {
        self.stats.snapshot()
    }

    pub fn local_dir(&self) -> &Path {
        &self.session.local_dir
    }

    pub fn remote_prefix(&self) -> &str {
        &self.session.remote_prefix
    }

    /// Unix milliseconds
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, event: notify::Result<notify::Event>) {
        let _ = self.injector.send(event);
    }
}

/// Registry of running watch sessions, one per remote prefix
#[derive(Clone)]
pub struct Supervisor {
    store: Arc<dyn ObjectStore>,
    sessions: Arc<Mutex<HashMap<String, Arc<WatchHandle>>>>,
}

impl Supervisor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    /// Start a session unless another one still owns its prefix. A session
    /// stopped through its handle is awaited before the prefix is reused.
    pub async fn start(&self, session: WatchSession) -> Result<Arc<WatchHandle>, Error> {
        let prefix = session.remote_prefix.clone();
        let stale = {
            let mut sessions = lock(&self.sessions);
            match sessions.get(&prefix) {
                Some(existing) if !existing.is_stopped() => {
                    return Err(Error::PrefixInUse(prefix));
                }
                Some(_) => {
                    metrics::HLS_SESSIONS.dec();
                    sessions.remove(&prefix)
                }
                None => None,
            }
        };
        if let Some(stale) = stale {
            stale.wait().await;
            debug!("[watcher] session {} drained before restart", prefix);
        }

        let handle = Arc::new(WatchHandle::start(session, self.store.clone()).await?);
        let raced = {
            let mut sessions = lock(&self.sessions);
            if sessions.contains_key(&prefix) {
                true
            } else {
                sessions.insert(prefix.clone(), handle.clone());
                metrics::HLS_SESSIONS.inc();
                false
            }
        };
        if raced {
            handle.abort();
            handle.wait().await;
            return Err(Error::PrefixInUse(prefix));
        }
        Ok(handle)
    }

    pub fn get(&self, remote_prefix: &str) -> Option<Arc<WatchHandle>> {
        lock(&self.sessions).get(remote_prefix.trim_matches('/')).cloned()
    }

    pub fn list(&self) -> Vec<Arc<WatchHandle>> {
        let mut handles: Vec<_> = lock(&self.sessions).values().cloned().collect();
        handles.sort_by_key(|h| h.started_at());
        handles
    }

    /// Stop the session publishing to `remote_prefix` and wait for it to drain.
    /// The prefix stays taken until the drain is over.
    pub async fn stop(&self, remote_prefix: &str) -> Result<Arc<WatchHandle>, Error> {
        let prefix = remote_prefix.trim_matches('/');
        let handle = {
            let sessions = lock(&self.sessions);
            match sessions.get(prefix) {
                Some(handle) if !handle.is_stopped() => {
                    handle.stop();
                    handle.clone()
                }
                _ => return Err(Error::NotFound(prefix.to_string())),
            }
        };
        handle.wait().await;
        self.forget(prefix, &handle);
        info!("[watcher] session {} drained", prefix);
        Ok(handle)
    }

    fn forget(&self, prefix: &str, handle: &Arc<WatchHandle>) {
        let mut sessions = lock(&self.sessions);
        if sessions.get(prefix).is_some_and(|h| Arc::ptr_eq(h, handle)) {
            sessions.remove(prefix);
            metrics::HLS_SESSIONS.dec();
        }
    }

    /// Drain every session, aborting those that overrun their budget
    pub async fn shutdown(&self) {
        let handles: Vec<_> = lock(&self.sessions).drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.stop();
            metrics::HLS_SESSIONS.dec();
        }
        for handle in handles {
            if tokio::time::timeout(handle.drain_budget(), handle.wait())
                .await
                .is_err()
            {
                warn!("[watcher] session {} drain timed out, aborting", handle.remote_prefix());
                handle.abort();
                handle.wait().await;
            }
        }
    }
}
