use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use http::StatusCode;
use tracing::info;

use super::{AppState, param};

pub fn route() -> Router<AppState> {
    Router::new()
        .route(&api::path::join("{room}", "{identity}"), get(join))
        .route(&api::path::kick("{room}", "{identity}"), delete(kick))
}

async fn join(
    State(state): State<AppState>,
    Path((room, identity)): Path<(String, String)>,
) -> crate::result::Result<Json<String>> {
    let room = param(room, "room")?;
    let identity = param(identity, "identity")?;
    Ok(Json(state.livekit.join_token(&room, &identity)?))
}

async fn kick(
    State(state): State<AppState>,
    Path((room, identity)): Path<(String, String)>,
) -> crate::result::Result<Json<u16>> {
    let room = param(room, "room")?;
    let identity = param(identity, "identity")?;
    state.livekit.remove_participant(&room, &identity).await?;
    info!("{} removed from room {}", identity, room);
    Ok(Json(StatusCode::OK.as_u16()))
}
