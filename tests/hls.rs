#![cfg(unix)]

mod common;

use std::time::Duration;

use http::StatusCode;

use common::{config, mock_livekit, serve, wait_for_file, write_settled};

#[tokio::test]
async fn test_hls_publish_and_stop() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{addr}{}", api::path::hls("demo")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let started = res.json::<api::response::HlsStarted>().await.unwrap();
    assert_eq!(started.message, "HLS VOD started");
    assert_eq!(
        started.hls_url,
        "https://bucket.example.com/streaming/vod/demo/demo.m3u8"
    );

    // Stand in for the transcoder output.
    let dir = local.path().join("demo");
    assert!(dir.is_dir());
    write_settled(&dir.join("demo_000.ts"), b"segment zero");
    std::fs::write(dir.join("demo.m3u8"), b"#EXTM3U\n#EXTINF:10,\ndemo_000.ts\n").unwrap();

    let published = store.path().join("streaming/vod/demo");
    assert!(wait_for_file(&published.join("demo_000.ts"), Duration::from_secs(5)).await);
    assert!(wait_for_file(&published.join("demo.m3u8"), Duration::from_secs(5)).await);
    assert_eq!(
        std::fs::read(published.join("demo_000.ts")).unwrap(),
        b"segment zero"
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    let res = client
        .get(format!("http://{addr}{}", api::path::HLS))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let sessions = res.json::<Vec<api::response::HlsSession>>().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].stream, "demo");
    assert_eq!(sessions[0].remote_prefix, "streaming/vod/demo");
    assert_eq!(sessions[0].uploads.segments, 1);

    let res = client
        .post(format!("http://{addr}{}", api::path::hls("demo")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = client
        .delete(format!("http://{addr}{}?purge=true", api::path::hls("demo")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let stopped = res.json::<api::response::HlsStopped>().await.unwrap();
    assert_eq!(stopped.stream, "demo");
    assert_eq!(stopped.uploads.segments, 1);
    assert!(stopped.purged >= 2);
    assert!(!published.join("demo_000.ts").exists());

    let res = client
        .delete(format!("http://{addr}{}", api::path::hls("demo")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn test_hls_stop_keeps_published_objects() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;
    let client = reqwest::Client::new();

    let dir = local.path().join("keep");
    std::fs::create_dir_all(&dir).unwrap();
    // Present before the session starts, picked up by the initial sweep.
    write_settled(&dir.join("keep_000.ts"), b"early");

    let res = client
        .post(format!("http://{addr}{}", api::path::hls("keep")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let published = store.path().join("streaming/vod/keep/keep_000.ts");
    assert!(wait_for_file(&published, Duration::from_secs(5)).await);

    let res = client
        .delete(format!("http://{addr}{}", api::path::hls("keep")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let stopped = res.json::<api::response::HlsStopped>().await.unwrap();
    assert_eq!(stopped.purged, 0);
    assert!(published.exists());
}

#[tokio::test]
async fn test_hls_restarts_after_transcoder_exit() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let mut cfg = config(livekit, local.path(), store.path());
    // Ends immediately, like a source that never published.
    cfg.hls.ffmpeg = "true".to_string();
    let addr = serve(cfg).await;
    let client = reqwest::Client::new();

    let dir = local.path().join("short");
    std::fs::create_dir_all(&dir).unwrap();
    write_settled(&dir.join("short_000.ts"), b"only segment");

    let res = client
        .post(format!("http://{addr}{}", api::path::hls("short")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let mut finished = false;
    for _ in 0..200 {
        let sessions = client
            .get(format!("http://{addr}{}", api::path::HLS))
            .send()
            .await
            .unwrap()
            .json::<Vec<api::response::HlsSession>>()
            .await
            .unwrap();
        if sessions.is_empty() {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(finished, "session still listed after the transcoder exited");
    // Listed until drained.
    assert!(store.path().join("streaming/vod/short/short_000.ts").exists());

    let res = client
        .post(format!("http://{addr}{}", api::path::hls("short")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
}

#[tokio::test]
async fn test_hls_transcoder_failure_rolls_back() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let mut cfg = config(livekit, local.path(), store.path());
    cfg.hls.ffmpeg = "/nonexistent/ffmpeg".to_string();
    let addr = serve(cfg).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{addr}{}", api::path::hls("demo")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());

    let sessions = client
        .get(format!("http://{addr}{}", api::path::HLS))
        .send()
        .await
        .unwrap()
        .json::<Vec<api::response::HlsSession>>()
        .await
        .unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_hls_rejects_bad_stream_name() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;

    let res = reqwest::Client::new()
        .post(format!("http://{addr}{}", api::path::hls("a%2Fb")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}
