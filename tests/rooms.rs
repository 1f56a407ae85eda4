mod common;

use http::StatusCode;
use serde_json::Value;

use common::{config, mock_livekit, serve};

#[tokio::test]
async fn test_room_lifecycle() {
    let (livekit, calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{addr}{}", api::path::ROOMS))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let rooms = res.json::<livekit::ListRoomsResponse>().await.unwrap();
    assert_eq!(rooms.rooms.len(), 1);
    assert_eq!(rooms.rooms[0].name, "demo");
    assert_eq!(rooms.rooms[0].creation_time, 1_700_000_000);

    let res = client
        .post(format!("http://{addr}{}", api::path::room("team%20sync")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    let room = res.json::<livekit::Room>().await.unwrap();
    assert_eq!(room.name, "team sync");

    let res = client
        .delete(format!("http://{addr}{}", api::path::room("team%20sync")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let methods: Vec<String> = calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect();
    assert_eq!(methods, vec!["ListRooms", "CreateRoom", "DeleteRoom"]);
}

#[tokio::test]
async fn test_join_token() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;

    let res = reqwest::get(format!("http://{addr}{}", api::path::join("demo", "alice")))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let token = res.json::<String>().await.unwrap();
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_kick_and_rtmp() {
    let (livekit, calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("http://{addr}{}", api::path::kick("demo", "bob")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = client
        .delete(format!("http://{addr}{}", api::path::kick("demo", "ghost")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());
    let body = res.json::<Value>().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("participant not found"));

    let res = client
        .get(format!("http://{addr}{}", api::path::rtmp("demo", "cam", "carol")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let ingress = res.json::<livekit::IngressInfo>().await.unwrap();
    assert_eq!(ingress.stream_key, "sk_1");
    assert_eq!(ingress.room_name, "demo");
    assert_eq!(ingress.participant_identity, "carol");

    let calls = calls.lock().unwrap();
    let (_, body) = calls.iter().find(|(m, _)| m == "CreateIngress").unwrap();
    assert_eq!(body["input_type"], "RTMP_INPUT");
}

#[tokio::test]
async fn test_blank_param_is_bad_request() {
    let (livekit, calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let addr = serve(config(livekit, local.path(), store.path())).await;

    let res = reqwest::Client::new()
        .post(format!("http://{addr}{}", api::path::room("%20")))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bearer_auth() {
    let (livekit, _calls) = mock_livekit().await;
    let local = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let mut cfg = config(livekit, local.path(), store.path());
    cfg.auth.tokens = vec!["live".to_string()];
    let addr = serve(cfg).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{addr}{}", api::path::ROOMS))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = client
        .get(format!("http://{addr}{}", api::path::ROOMS))
        .bearer_auth("live")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = client
        .get(format!("http://{addr}{}", api::path::METRICS))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    assert!(res.text().await.unwrap().contains("livelite_hls_sessions"));
}
