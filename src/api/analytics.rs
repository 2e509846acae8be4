//! Delivery analytics endpoint

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};

use super::ApiState;
use crate::db::DeliverySummary;

const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Aggregated delivery and synthesis metrics
async fn summary(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<DeliverySummary>, StatusCode> {
    let days = params
        .get("days")
        .and_then(|d| d.parse().ok())
        .unwrap_or(DEFAULT_WINDOW_DAYS);

    state
        .analytics
        .summary(days)
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "analytics summary failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Build the analytics router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/analytics", get(summary))
        .with_state(state)
}
