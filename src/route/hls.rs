use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{AppState, param};

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::HLS, get(index))
        .route(&api::path::hls("{stream}"), post(create).delete(destroy))
}

async fn create(
    State(state): State<AppState>,
    Path(stream): Path<String>,
) -> crate::result::Result<Json<api::response::HlsStarted>> {
    let stream = param(stream, "stream")?;
    Ok(Json(state.recordings.start(&stream).await?))
}

async fn index(State(state): State<AppState>) -> Json<Vec<api::response::HlsSession>> {
    Json(state.recordings.list())
}

async fn destroy(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    Query(req): Query<api::request::StopHls>,
) -> crate::result::Result<Json<api::response::HlsStopped>> {
    let stream = param(stream, "stream")?;
    Ok(Json(state.recordings.stop(&stream, req.purge).await?))
}
