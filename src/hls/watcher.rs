use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, trace};

use super::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Segment,
    Playlist,
}

/// Maps file names to segment/playlist by extension
#[derive(Debug, Clone)]
pub struct Classifier {
    segments: Vec<String>,
    playlists: Vec<String>,
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

impl Classifier {
    pub fn new(segments: &[String], playlists: &[String]) -> Self {
        Self {
            segments: segments.iter().map(|e| normalize(e)).collect(),
            playlists: playlists.iter().map(|e| normalize(e)).collect(),
        }
    }

    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if self.segments.contains(&ext) {
            Some(FileKind::Segment)
        } else if self.playlists.contains(&ext) {
            Some(FileKind::Playlist)
        } else {
            None
        }
    }
}

/// Non-recursive subscription to one directory.
///
/// Events from the platform notifier thread are forwarded through an
/// unbounded channel, so the async side never blocks the notifier.
pub struct DirectoryWatcher {
    // Dropping the watcher ends the subscription.
    _watcher: RecommendedWatcher,
    rx: UnboundedReceiver<notify::Result<Event>>,
    #[cfg(test)]
    tx: UnboundedSender<notify::Result<Event>>,
}

impl DirectoryWatcher {
    pub fn subscribe(dir: &Path) -> Result<Self, Error> {
        let (tx, rx) = unbounded_channel();
        let sender: UnboundedSender<_> = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            // Receiver gone means the session is over.
            let _ = sender.send(res);
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!("[watcher] subscribed to {}", dir.display());
        Ok(Self {
            _watcher: watcher,
            rx,
            #[cfg(test)]
            tx,
        })
    }

    pub async fn next(&mut self) -> Option<notify::Result<Event>> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub(crate) fn injector(&self) -> UnboundedSender<notify::Result<Event>> {
        self.tx.clone()
    }
}

/// Paths an event reports as created or written.
///
/// Renames count on their target side, which is how atomic
/// write-then-rename playlist updates show up.
pub fn changed_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.into_iter().skip(1).collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => Vec::new(),
        EventKind::Modify(_) => event.paths,
        kind => {
            trace!("[watcher] ignoring {:?}", kind);
            Vec::new()
        }
    }
}

/// Regular files directly inside `dir`, used to sweep files that existed
/// before the subscription or were missed by the notifier.
pub async fn scan_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
