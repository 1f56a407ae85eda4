use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::routing::get;
use storage::{ObjectStore, OpendalStore};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{Level, info, info_span};

use crate::auth::ManyValidate;
use crate::config::Config;
use crate::recording::RecordingManager;
use crate::route::AppState;

pub mod config;
pub mod hls;
pub mod log;
pub mod transcoder;

mod auth;
mod error;
mod metrics;
mod recording;
mod result;
mod route;

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    metrics::register();

    let operator = storage::init_operator(&cfg.storage).await?;
    let store: Arc<dyn ObjectStore> = Arc::new(OpendalStore::new(operator));
    let livekit = livekit::Client::new(
        &cfg.livekit.url,
        &cfg.livekit.api_key,
        &cfg.livekit.api_secret,
        cfg.livekit.token_ttl(),
    )?;

    let app_state = AppState {
        livekit: Arc::new(livekit),
        recordings: Arc::new(RecordingManager::new(cfg.hls.clone(), store)),
    };

    let auth_layer = ValidateRequestHeaderLayer::custom(ManyValidate::new(cfg.auth.tokens.clone()));
    let app = Router::new()
        .merge(
            route::room::route()
                .merge(route::participant::route())
                .merge(route::ingress::route())
                .merge(route::hls::route())
                .layer(auth_layer),
        )
        .route(api::path::METRICS, get(metrics))
        .with_state(app_state.clone())
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        );

    info!("Server listening on {}", listener.local_addr()?);
    let served = axum::serve(listener, app).with_graceful_shutdown(signal).await;
    app_state.recordings.shutdown().await;
    served?;
    Ok(())
}

async fn metrics() -> String {
    metrics::gather()
}
