#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use axum::extract::{Path as UrlPath, State};
use axum::routing::post;
use axum::{Json, Router};
use http::{HeaderMap, StatusCode, header};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use livelite::config::Config;

pub async fn shutdown_signal() {
    signal::shutdown_signal().await;
}

/// Calls received by the mock media service: (method, body)
pub type Calls = Arc<Mutex<Vec<(String, Value)>>>;

/// Twirp endpoint answering the handful of RPCs the gateway issues
pub async fn mock_livekit() -> (SocketAddr, Calls) {
    let calls: Calls = Arc::default();
    let app = Router::new()
        .route("/twirp/{service}/{method}", post(twirp))
        .with_state(calls.clone());
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (addr, calls)
}

async fn twirp(
    State(calls): State<Calls>,
    UrlPath((_service, method)): UrlPath<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": "unauthenticated", "msg": "missing token" })),
        );
    }
    calls.lock().unwrap().push((method.clone(), body.clone()));

    match method.as_str() {
        "ListRooms" => (
            StatusCode::OK,
            Json(json!({
                "rooms": [{ "sid": "RM_demo", "name": "demo", "creation_time": "1700000000", "num_participants": 2 }]
            })),
        ),
        "CreateRoom" => (
            StatusCode::OK,
            Json(json!({ "sid": "RM_new", "name": body["name"], "creation_time": "1700000001" })),
        ),
        "DeleteRoom" => (StatusCode::OK, Json(json!({}))),
        "RemoveParticipant" if body["identity"] == "ghost" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "code": "not_found", "msg": "participant not found" })),
        ),
        "RemoveParticipant" => (StatusCode::OK, Json(json!({}))),
        "CreateIngress" => (
            StatusCode::OK,
            Json(json!({
                "ingress_id": "IN_1",
                "name": body["name"],
                "stream_key": "sk_1",
                "url": "rtmp://ingress.example.com/x",
                "room_name": body["room_name"],
                "participant_identity": body["participant_identity"],
            })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "code": "bad_route", "msg": "no such method" })),
        ),
    }
}

/// Stand-in transcoder that keeps running until killed
#[cfg(unix)]
pub fn long_running_ffmpeg(dir: &Path) -> String {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("ffmpeg.sh");
    std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().into_owned()
}

/// Server config pointed at the mock service and temporary directories
pub fn config(livekit: SocketAddr, local_root: &Path, storage_root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.livekit.url = format!("ws://{livekit}");
    cfg.livekit.api_key = "devkey".to_string();
    cfg.livekit.api_secret = "devsecret-devsecret-devsecret-00".to_string();
    cfg.storage = storage::StorageConfig::Fs {
        root: storage_root.to_string_lossy().into_owned(),
    };
    cfg.hls.local_root = local_root.to_path_buf();
    cfg.hls.public_url = "https://bucket.example.com".to_string();
    #[cfg(unix)]
    {
        cfg.hls.ffmpeg = long_running_ffmpeg(local_root);
    }
    cfg.hls.playlist_interval = 400;
    cfg.hls.stable_age = 300;
    cfg.hls.poll_interval = 100;
    cfg.hls.upload_timeout = 2000;
    cfg
}

/// Start the server on an ephemeral port and return its address
pub async fn serve(cfg: Config) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(livelite::serve(cfg, listener, shutdown_signal()));
    addr
}

/// Write `path` with a modification time far enough in the past to be stable
pub fn write_settled(path: &Path, content: &[u8]) {
    std::fs::write(path, content).unwrap();
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(10))
        .unwrap();
}

pub async fn wait_for_file(path: &Path, deadline: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
