use std::sync::Arc;

use crate::error::AppError;
use crate::recording::RecordingManager;

pub mod hls;
pub mod ingress;
pub mod participant;
pub mod room;

#[derive(Clone)]
pub struct AppState {
    pub livekit: Arc<livekit::Client>,
    pub recordings: Arc<RecordingManager>,
}

/// Path segments arrive percent-decoded; blank ones are rejected.
pub(crate) fn param(value: String, name: &str) -> crate::result::Result<String> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{name} must not be empty")));
    }
    Ok(value)
}
