use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use super::{AppState, param};

pub fn route() -> Router<AppState> {
    Router::new().route(&api::path::rtmp("{room}", "{name}", "{identity}"), get(rtmp))
}

async fn rtmp(
    State(state): State<AppState>,
    Path((room, name, identity)): Path<(String, String, String)>,
) -> crate::result::Result<Json<livekit::IngressInfo>> {
    let room = param(room, "room")?;
    let name = param(name, "name")?;
    let identity = param(identity, "identity")?;
    Ok(Json(
        state
            .livekit
            .create_ingress(&room, &name, &identity)
            .await?,
    ))
}
