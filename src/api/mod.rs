//! HTTP API server for the messaging gateway

pub mod analytics;
pub mod audio;
pub mod health;
pub mod preferences;
pub mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::backend::ReportBackend;
use crate::bot::Bot;
use crate::db::{AnalyticsRepo, DbPool, ProfileRepo};
use crate::delivery::DeliveryScheduler;
use crate::tts::SpeechGateway;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub bot: Arc<Bot>,
    pub scheduler: Arc<DeliveryScheduler>,
    pub profiles: ProfileRepo,
    pub analytics: AnalyticsRepo,
    pub speech: Arc<SpeechGateway>,
    pub backend: Arc<dyn ReportBackend>,
    /// Token echoed back during webhook subscription verification
    pub verify_token: String,
    pub audio_dir: PathBuf,
}

/// API server
pub struct ApiServer;

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(state: Arc<ApiState>) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(webhook::router(state.clone()))
            .merge(audio::router(state.clone()))
            .merge(preferences::router(state.clone()))
            .merge(analytics::router(state.clone()))
            .merge(health::router())
            .merge(health::ready_router(state))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }
}
