use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use storage::ObjectStore;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Hls;
use crate::error::AppError;
use crate::hls::{Supervisor, WatchSession};
use crate::result::Result;
use crate::transcoder::{Exit, Transcoder};

/// A stream is one transcoder plus the watch session publishing its output.
///
/// When the transcoder ends on its own the session is drained and the stream
/// freed, so it can be started again.
pub struct RecordingManager {
    cfg: Hls,
    supervisor: Supervisor,
    recordings: Mutex<HashMap<String, Recording>>,
    next_id: AtomicU64,
}

struct Recording {
    id: u64,
    transcoder: Transcoder,
}

fn valid_stream_name(stream: &str) -> bool {
    storage::validate_path(stream)
        && !stream.contains('/')
        && !stream.contains('\\')
        && stream.trim() == stream
}

impl RecordingManager {
    pub fn new(cfg: Hls, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            cfg,
            supervisor: Supervisor::new(store),
            recordings: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub async fn start(self: &Arc<Self>, stream: &str) -> Result<api::response::HlsStarted> {
        if !valid_stream_name(stream) {
            return Err(AppError::bad_request(format!("invalid stream name: {stream}")));
        }
        let mut recordings = self.recordings.lock().await;
        if recordings.contains_key(stream) {
            return Err(AppError::AlreadyExists(format!(
                "stream {stream} is already being recorded"
            )));
        }

        let dir = self.cfg.stream_dir(stream);
        tokio::fs::create_dir_all(&dir).await?;

        let prefix = self.cfg.stream_prefix(stream);
        let session = WatchSession::new(&dir, &prefix, self.cfg.watch_config());
        self.supervisor.start(session).await.map_err(AppError::hls)?;

        let transcoder = match Transcoder::spawn(&self.cfg, stream, &dir) {
            Ok(transcoder) => transcoder,
            Err(e) => {
                error!("[hls] {} transcoder failed: {:#}", stream, e);
                if let Err(e) = self.supervisor.stop(&prefix).await {
                    warn!("[hls] {} rollback: {}", stream, e);
                }
                return Err(AppError::throw(format!("{e:#}")));
            }
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(self.clone().finish_on_exit(stream.to_string(), id, transcoder.exited()));
        recordings.insert(stream.to_string(), Recording { id, transcoder });
        info!("[hls] {} recording into {}", stream, dir.display());

        Ok(api::response::HlsStarted {
            message: "HLS VOD started".to_string(),
            hls_url: self.cfg.playback_url(stream),
        })
    }

    pub fn list(&self) -> Vec<api::response::HlsSession> {
        self.supervisor
            .list()
            .into_iter()
            .map(|handle| api::response::HlsSession {
                stream: handle
                    .remote_prefix()
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                local_dir: handle.local_dir().to_string_lossy().into_owned(),
                remote_prefix: handle.remote_prefix().to_string(),
                started_at: handle.started_at(),
                uploads: handle.stats(),
            })
            .collect()
    }

    /// Stop the transcoder, drain the session and optionally drop what was published
    pub async fn stop(&self, stream: &str, purge: bool) -> Result<api::response::HlsStopped> {
        let prefix = self.cfg.stream_prefix(stream);
        if self.supervisor.get(&prefix).is_none_or(|h| h.is_stopped()) {
            return Err(AppError::not_found(format!("no recording for {stream}")));
        }

        let recording = self.recordings.lock().await.remove(stream);
        if let Some(recording) = recording {
            recording.transcoder.stop().await;
        }
        let handle = self.supervisor.stop(&prefix).await.map_err(AppError::hls)?;

        let purged = if purge {
            let removed = self.supervisor.store().delete_dir(&prefix).await?;
            info!("[hls] {} purged {} objects under {}", stream, removed, prefix);
            removed
        } else {
            0
        };

        Ok(api::response::HlsStopped {
            stream: stream.to_string(),
            uploads: handle.stats(),
            purged,
        })
    }

    /// Drain the session of a transcoder that ended by itself. A recording
    /// stopped or restarted in the meantime is left alone.
    async fn finish_on_exit(
        self: Arc<Self>,
        stream: String,
        id: u64,
        exited: impl Future<Output = Option<Exit>>,
    ) {
        let exit = exited.await;
        let recording = {
            let mut recordings = self.recordings.lock().await;
            match recordings.get(&stream) {
                Some(recording) if recording.id == id => recordings.remove(&stream),
                _ => None,
            }
        };
        let Some(recording) = recording else {
            return;
        };
        info!("[hls] {} transcoder ended ({:?}), finishing recording", stream, exit);
        recording.transcoder.stop().await;
        let prefix = self.cfg.stream_prefix(&stream);
        match self.supervisor.stop(&prefix).await {
            Ok(handle) => info!("[hls] {} finished: {:?}", stream, handle.stats()),
            Err(e) => warn!("[hls] {} finish: {}", stream, e),
        }
    }

    pub async fn shutdown(&self) {
        let recordings: Vec<_> = self.recordings.lock().await.drain().collect();
        for (_, recording) in recordings {
            recording.transcoder.stop().await;
        }
        self.supervisor.shutdown().await;
    }
}
