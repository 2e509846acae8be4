//! `WhatsApp` webhook endpoints
//!
//! The POST handler always acknowledges with 200: the platform retries
//! non-2xx responses, and a retried message would be processed twice.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;

use super::ApiState;
use crate::channels::{WhatsAppWebhook, parse_webhook};

/// Webhook acknowledgement
#[derive(Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub handled: usize,
}

/// Subscription verification handshake
///
/// The platform calls this with `hub.mode=subscribe`; echoing the challenge
/// confirms ownership of the endpoint.
async fn verify(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, StatusCode> {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    if mode == Some("subscribe") && token == Some(state.verify_token.as_str()) {
        tracing::info!("webhook subscription verified");
        return challenge.cloned().ok_or(StatusCode::BAD_REQUEST);
    }

    tracing::warn!("webhook verification failed");
    Err(StatusCode::FORBIDDEN)
}

/// Inbound message delivery
async fn receive(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<WhatsAppWebhook>,
) -> Json<WebhookAck> {
    let messages = parse_webhook(&payload);
    let handled = messages.len();

    for message in messages {
        tracing::debug!(from = %message.from, id = %message.id, "processing inbound message");

        let reply = state
            .bot
            .process_message(&message.from, &message.text, &message.media)
            .await;

        let prefs = state
            .profiles
            .find(&message.from)
            .ok()
            .flatten()
            .map(|p| p.prefs)
            .unwrap_or_default();

        if let Err(e) = state.scheduler.deliver(&message.from, reply, &prefs).await {
            tracing::error!(to = %message.from, error = %e, "reply delivery failed");
        }
    }

    Json(WebhookAck {
        status: "received",
        handled,
    })
}

/// Build the webhook router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .with_state(state)
}
