use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Hls;

/// How the transcoder process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Ended on its own; `None` when terminated by a signal
    Exited(Option<i32>),
    Killed,
}

/// ffmpeg pulling one RTMP stream and writing an event-type HLS playlist
pub struct Transcoder {
    cancel: CancellationToken,
    waiter: JoinHandle<()>,
    exit: watch::Receiver<Option<Exit>>,
}

pub fn args(cfg: &Hls, stream: &str, dir: &Path) -> Vec<String> {
    let segment_pattern: PathBuf = dir.join(format!("{stream}_%03d.ts"));
    let playlist: PathBuf = dir.join(format!("{stream}.m3u8"));
    vec![
        "-y".to_string(),
        "-i".to_string(),
        cfg.rtmp_url(stream),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        cfg.hls_time.to_string(),
        "-hls_list_size".to_string(),
        cfg.hls_list_size.to_string(),
        "-hls_playlist_type".to_string(),
        "event".to_string(),
        "-hls_segment_filename".to_string(),
        segment_pattern.to_string_lossy().into_owned(),
        playlist.to_string_lossy().into_owned(),
    ]
}

impl Transcoder {
    /// Launch the transcoder into `dir`, which must already exist
    pub fn spawn(cfg: &Hls, stream: &str, dir: &Path) -> Result<Self> {
        let mut child = Command::new(&cfg.ffmpeg)
            .args(args(cfg, stream, dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", cfg.ffmpeg))?;
        info!(
            "[transcoder] {} started (pid {:?}) writing to {}",
            stream,
            child.id(),
            dir.display()
        );

        if let Some(stderr) = child.stderr.take() {
            let stream = stream.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[transcoder] {}: {}", stream, line);
                }
            });
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (tx, exit) = watch::channel(None);
        let name = stream.to_string();
        let waiter = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    if let Err(e) = child.kill().await {
                        warn!("[transcoder] {} kill failed: {}", name, e);
                    }
                    info!("[transcoder] {} stopped", name);
                    Exit::Killed
                }
                status = child.wait() => match status {
                    Ok(status) => {
                        if status.success() {
                            info!("[transcoder] {} exited", name);
                        } else {
                            warn!("[transcoder] {} exited with {}", name, status);
                        }
                        Exit::Exited(status.code())
                    }
                    Err(e) => {
                        error!("[transcoder] {} wait failed: {}", name, e);
                        Exit::Exited(None)
                    }
                }
            };
            let _ = tx.send(Some(outcome));
        });

        Ok(Self {
            cancel,
            waiter,
            exit,
        })
    }

    /// Resolves once the process is gone, whoever ended it
    pub fn exited(&self) -> impl Future<Output = Option<Exit>> + Send + 'static {
        let mut exit = self.exit.clone();
        async move {
            match exit.wait_for(Option::is_some).await {
                Ok(exit) => *exit,
                Err(_) => None,
            }
        }
    }

    /// Kill the process if still running and report how it ended
    pub async fn stop(self) -> Option<Exit> {
        self.cancel.cancel();
        if let Err(e) = self.waiter.await {
            error!("[transcoder] waiter failed: {}", e);
        }
        *self.exit.borrow()
    }
}
