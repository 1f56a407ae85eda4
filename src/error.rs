use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;

use crate::hls;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    AlreadyExists(String),
    BadRequest(String),
    Throw(String),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::NotFound(t.to_string())
    }

    pub fn bad_request<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::BadRequest(t.to_string())
    }

    pub fn throw<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Throw(t.to_string())
    }

    /// Session-level failures of the publishing pipeline
    pub fn hls(err: hls::Error) -> Self {
        match err {
            hls::Error::PrefixInUse(_) => AppError::AlreadyExists(err.to_string()),
            hls::Error::NotFound(_) => AppError::NotFound(err.to_string()),
            err => AppError::InternalServerError(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err),
            AppError::AlreadyExists(err) => (StatusCode::CONFLICT, err),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err),
            AppError::Throw(err) => (StatusCode::INTERNAL_SERVER_ERROR, err),
            AppError::InternalServerError(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
