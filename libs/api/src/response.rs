use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HlsStarted {
    pub message: String,
    pub hls_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HlsSession {
    pub stream: String,
    pub local_dir: String,
    pub remote_prefix: String,
    pub started_at: i64,
    pub uploads: UploadStats,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadStats {
    pub segments: u64,
    pub segment_failures: u64,
    pub segments_abandoned: u64,
    pub playlists: u64,
    pub playlist_failures: u64,
    pub watcher_errors: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HlsStopped {
    pub stream: String,
    pub uploads: UploadStats,
    /// Number of remote objects removed when `purge` was requested
    #[serde(default)]
    pub purged: usize,
}
