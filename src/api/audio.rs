//! Audio artifact serving

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use super::ApiState;

/// Serve a synthesized audio artifact by filename
async fn serve(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
) -> Result<Response, StatusCode> {
    // Filenames are cache-generated hex; anything else is rejected
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(StatusCode::BAD_REQUEST);
    }

    let path = state.audio_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let content_type = if filename.ends_with(".mp3") {
        "audio/mpeg"
    } else if filename.ends_with(".wav") {
        "audio/wav"
    } else {
        "application/octet-stream"
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        bytes,
    )
        .into_response())
}

/// Build the audio router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/audio/{filename}", get(serve))
        .with_state(state)
}
