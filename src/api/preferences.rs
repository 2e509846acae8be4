//! Preference management and delivery test endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::db::{DeliveryFormat, MessagingPrefs, VoiceGender};
use crate::delivery::Reply;
use crate::tts::Priority;

/// Preference view returned by the API
#[derive(Serialize)]
pub struct PrefsResponse {
    pub user_id: String,
    pub prefs: MessagingPrefs,
}

/// Partial preference update; absent fields are left unchanged
#[derive(Deserialize)]
pub struct PrefsUpdate {
    pub audio_enabled: Option<bool>,
    pub voice_gender: Option<VoiceGender>,
    pub speech_rate_wpm: Option<u32>,
    pub dual_messaging_enabled: Option<bool>,
    pub voice_for_emergencies: Option<bool>,
    pub voice_for_long_messages: Option<bool>,
    pub audio_delay_secs: Option<u64>,
    pub format: Option<DeliveryFormat>,
}

async fn get_prefs(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PrefsResponse>, StatusCode> {
    let profile = state
        .profiles
        .find(&user_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(PrefsResponse {
        user_id,
        prefs: profile.prefs,
    }))
}

async fn put_prefs(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
    Json(update): Json<PrefsUpdate>,
) -> Result<Json<PrefsResponse>, StatusCode> {
    let profile = state
        .profiles
        .find(&user_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut prefs = profile.prefs;
    apply_update(&mut prefs, update);
    prefs.speech_rate_wpm = prefs
        .speech_rate_wpm
        .clamp(crate::db::profile::MIN_SPEECH_RATE, crate::db::profile::MAX_SPEECH_RATE);

    state
        .profiles
        .set_prefs(&user_id, &prefs)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(PrefsResponse { user_id, prefs }))
}

fn apply_update(prefs: &mut MessagingPrefs, update: PrefsUpdate) {
    if let Some(v) = update.audio_enabled {
        prefs.audio_enabled = v;
    }
    if let Some(v) = update.voice_gender {
        prefs.voice_gender = v;
    }
    if let Some(v) = update.speech_rate_wpm {
        prefs.speech_rate_wpm = v;
    }
    if let Some(v) = update.dual_messaging_enabled {
        prefs.dual_messaging_enabled = v;
    }
    if let Some(v) = update.voice_for_emergencies {
        prefs.voice_for_emergencies = v;
    }
    if let Some(v) = update.voice_for_long_messages {
        prefs.voice_for_long_messages = v;
    }
    if let Some(v) = update.audio_delay_secs {
        prefs.audio_delay_secs = v;
    }
    if let Some(v) = update.format {
        prefs.format = v;
    }
}

const TEST_MESSAGE: &str =
    "This is a test of your dual messaging settings. If voice is enabled, an audio \
     version of this message will follow shortly.";

/// Outcome of a delivery test
#[derive(Serialize)]
pub struct DeliveryTestResponse {
    pub status: &'static str,
    pub audio_scheduled: bool,
}

/// Send a test message through the full delivery pipeline
async fn delivery_test(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
) -> Result<Json<DeliveryTestResponse>, StatusCode> {
    let profile = state
        .profiles
        .find_or_create(&user_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let audio = if profile.prefs.audio_enabled {
        state
            .speech
            .synthesize(TEST_MESSAGE, &profile.prefs, Priority::Normal)
            .await
    } else {
        None
    };
    let audio_scheduled = audio.is_some();

    let reply = Reply {
        text: TEST_MESSAGE.to_string(),
        audio,
    };
    state
        .scheduler
        .deliver(&user_id, reply, &profile.prefs)
        .await
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "delivery test failed");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(DeliveryTestResponse {
        status: "sent",
        audio_scheduled,
    }))
}

/// Build the preferences router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/preferences/{user_id}", get(get_prefs).put(put_prefs))
        .route("/api/delivery/test/{user_id}", post(delivery_test))
        .with_state(state)
}
