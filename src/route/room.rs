use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use tracing::info;

use super::{AppState, param};

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::ROOMS, get(index))
        .route(&api::path::room("{room}"), post(create).delete(destroy))
}

async fn index(
    State(state): State<AppState>,
) -> crate::result::Result<Json<livekit::ListRoomsResponse>> {
    Ok(Json(state.livekit.list_rooms().await?))
}

async fn create(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> crate::result::Result<(StatusCode, Json<livekit::Room>)> {
    let room = param(room, "room")?;
    let created = state.livekit.create_room(&room).await?;
    info!("room {} created ({})", created.name, created.sid);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn destroy(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> crate::result::Result<Json<u16>> {
    let room = param(room, "room")?;
    state.livekit.delete_room(&room).await?;
    info!("room {} deleted", room);
    Ok(Json(StatusCode::OK.as_u16()))
}
