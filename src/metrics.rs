use lazy_static::lazy_static;
use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};

lazy_static! {
    pub static ref HLS_SESSIONS: IntGauge =
        IntGauge::new("hls_sessions", "active hls watch sessions").unwrap();
    pub static ref SEGMENT_UPLOADS: IntCounter =
        IntCounter::new("segment_uploads", "segments published").unwrap();
    pub static ref SEGMENT_UPLOAD_FAILURES: IntCounter =
        IntCounter::new("segment_upload_failures", "segments that failed to publish").unwrap();
    pub static ref SEGMENT_ABANDONED: IntCounter = IntCounter::new(
        "segment_abandoned",
        "segments removed before they could be published"
    )
    .unwrap();
    pub static ref PLAYLIST_UPLOADS: IntCounter =
        IntCounter::new("playlist_uploads", "playlists published").unwrap();
    pub static ref PLAYLIST_UPLOAD_FAILURES: IntCounter =
        IntCounter::new("playlist_upload_failures", "playlists that failed to publish").unwrap();
    pub static ref WATCHER_ERRORS: IntCounter =
        IntCounter::new("watcher_errors", "filesystem notification errors").unwrap();
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("livelite".to_string()), None).unwrap();
    pub static ref ENCODER: TextEncoder = TextEncoder::new();
}

/// Register every collector once; repeated calls are harmless.
pub fn register() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HLS_SESSIONS.clone()),
        Box::new(SEGMENT_UPLOADS.clone()),
        Box::new(SEGMENT_UPLOAD_FAILURES.clone()),
        Box::new(SEGMENT_ABANDONED.clone()),
        Box::new(PLAYLIST_UPLOADS.clone()),
        Box::new(PLAYLIST_UPLOAD_FAILURES.clone()),
        Box::new(WATCHER_ERRORS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::trace!("metrics register: {}", e);
        }
    }
}

pub fn gather() -> String {
    ENCODER
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_else(|e| format!("# encode error: {e}\n"))
}
