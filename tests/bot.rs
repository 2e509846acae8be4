//! End-to-end conversation flows through the bot orchestrator

mod common;

use std::sync::atomic::Ordering;

use aria_gateway::db::{ReportStatus, SessionState};

use common::{attachment, build_bot};

const USER: &str = "5926001234";

#[tokio::test]
async fn first_contact_greeting_shows_menu_and_creates_profile() {
    let t = build_bot(None).await;

    let reply = t.bot.process_message(USER, "hello", &[]).await;

    assert!(reply.text.contains("REPORT"));
    assert!(reply.text.contains("FAQ"));
    // Orientation comes with the prewarmed welcome clip
    assert!(reply.audio.is_some());

    let profile = t.profiles.find(USER).unwrap().unwrap();
    assert!(profile.prefs.audio_enabled);
}

#[tokio::test]
async fn report_flow_end_to_end() {
    let t = build_bot(None).await;

    let reply = t.bot.process_message(USER, "REPORT", &[]).await;
    assert!(reply.text.contains("photos or videos"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::WaitingMedia);

    // Text without attachments re-prompts and stays put
    let reply = t.bot.process_message(USER, "it happened this morning", &[]).await;
    assert!(reply.text.contains("photos or videos"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::WaitingMedia);

    t.bot.process_message(USER, "", &[attachment()]).await;
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::WaitingLocation);

    let reply = t.bot.process_message(USER, "6.8013, -58.1551", &[]).await;
    assert!(reply.text.contains("SUBMIT"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::ConfirmingReport);

    let reply = t.bot.process_message(USER, "SUBMIT", &[]).await;
    assert!(reply.text.contains("HSSE-2000"));
    // Confirmation ships with the canonical submitted clip
    assert!(reply.audio.is_some());

    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::Conversing);
    let saved = t.reports.list_for_user(USER, 10).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status, ReportStatus::Submitted);
    assert_eq!(saved[0].severity, "medium");
    assert_eq!(saved[0].latitude, Some(6.8013));
}

#[tokio::test]
async fn free_form_report_intent_enters_flow() {
    let t = build_bot(None).await;

    let reply = t
        .bot
        .process_message(USER, "I want to report an unsafe ladder", &[])
        .await;
    assert!(reply.text.contains("photos or videos"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::WaitingMedia);
}

#[tokio::test]
async fn incident_type_derived_from_location() {
    let t = build_bot(None).await;

    t.bot.process_message(USER, "REPORT", &[]).await;
    t.bot.process_message(USER, "", &[attachment()]).await;
    t.bot
        .process_message(USER, "chemical storage area, bay 4", &[])
        .await;
    t.bot.process_message(USER, "SUBMIT", &[]).await;

    let saved = t.reports.list_for_user(USER, 10).unwrap();
    assert_eq!(saved[0].incident_type, "chemical_incident");
    // Non-coordinate location falls back to the service-region centroid
    assert!(saved[0].latitude.is_some());
    assert_eq!(saved[0].location_text.as_deref(), Some("chemical storage area, bay 4"));
}

#[tokio::test]
async fn report_submission_failure_keeps_draft_for_retry() {
    let t = build_bot(None).await;
    t.backend.fail.store(true, Ordering::SeqCst);

    t.bot.process_message(USER, "REPORT", &[]).await;
    t.bot.process_message(USER, "", &[attachment()]).await;
    t.bot.process_message(USER, "level 3, north side", &[]).await;

    let reply = t.bot.process_message(USER, "submit", &[]).await;
    assert!(reply.text.contains("saved locally"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::ConfirmingReport);
    assert_eq!(t.reports.list_backup_pending().unwrap().len(), 1);

    // Backend recovers; a manual SUBMIT goes through
    t.backend.fail.store(false, Ordering::SeqCst);
    let reply = t.bot.process_message(USER, "SUBMIT", &[]).await;
    assert!(reply.text.contains("HSSE-2000"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::Conversing);
}

#[tokio::test]
async fn emergency_preempts_active_report_flow() {
    let t = build_bot(None).await;

    t.bot.process_message(USER, "REPORT", &[]).await;
    let reply = t.bot.process_message(USER, "FIRE in the warehouse!", &[]).await;

    assert!(reply.text.contains("912"));
    assert!(reply.text.contains("911"));
    // Canonical emergency clip from the prewarmed cache
    assert!(reply.audio.is_some());
}

#[tokio::test]
async fn emergency_from_unknown_sender_creates_no_profile() {
    let t = build_bot(None).await;

    let reply = t.bot.process_message(USER, "FIRE! the storeroom is on fire", &[]).await;

    assert!(reply.text.contains("912"));
    assert!(reply.text.contains("911"));
    // The short circuit must not leave a profile row behind
    assert!(t.profiles.find(USER).unwrap().is_none());
}

#[tokio::test]
async fn emergency_never_synthesizes_on_cache_miss() {
    let t = build_bot(None).await;
    t.bot.process_message(USER, "hello", &[]).await;

    // Drop every prewarmed artifact so the canonical lookup misses
    for entry in std::fs::read_dir(t.audio_dir.path()).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let reply = t.bot.process_message(USER, "help! there's a fire", &[]).await;
    assert!(reply.text.contains("911"));
    // Text only: the offline engine is reachable but must not be asked
    assert!(reply.audio.is_none());
}

#[tokio::test]
async fn emergency_audio_respects_preference() {
    let t = build_bot(None).await;
    t.bot.process_message(USER, "hello", &[]).await;

    let profile = t.profiles.find(USER).unwrap().unwrap();
    let mut prefs = profile.prefs;
    prefs.voice_for_emergencies = false;
    t.profiles.set_prefs(USER, &prefs).unwrap();

    let reply = t.bot.process_message(USER, "urgent! danger at gate 2", &[]).await;
    assert!(reply.text.contains("911"));
    assert!(reply.audio.is_none());
}

#[tokio::test]
async fn voice_commands_update_preferences() {
    let t = build_bot(None).await;

    let reply = t.bot.process_message(USER, "voice off", &[]).await;
    assert!(reply.text.contains("disabled"));
    assert!(reply.audio.is_none());
    let profile = t.profiles.find(USER).unwrap().unwrap();
    assert!(!profile.prefs.audio_enabled);

    t.bot.process_message(USER, "voice on", &[]).await;
    t.bot.process_message(USER, "voice fast", &[]).await;
    let profile = t.profiles.find(USER).unwrap().unwrap();
    assert!(profile.prefs.audio_enabled);
    assert_eq!(profile.prefs.speech_rate_wpm, 175);
}

#[tokio::test]
async fn faq_navigation_and_exit() {
    let t = build_bot(None).await;

    let reply = t.bot.process_message(USER, "FAQ", &[]).await;
    assert!(reply.text.contains("pick a topic"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::FaqMode);

    let reply = t.bot.process_message(USER, "2", &[]).await;
    assert!(reply.text.contains("Fire Safety"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::FaqMode);

    // Free text exits FAQ mode with a return hint
    let reply = t.bot.process_message(USER, "thanks, that covers it", &[]).await;
    assert!(reply.text.contains("Type FAQ to return"));
    assert_eq!(t.sessions.get(USER).unwrap().state, SessionState::Conversing);
}

#[tokio::test]
async fn status_lists_submitted_reports() {
    let t = build_bot(None).await;

    t.bot.process_message(USER, "REPORT", &[]).await;
    t.bot.process_message(USER, "", &[attachment()]).await;
    t.bot.process_message(USER, "press room", &[]).await;
    t.bot.process_message(USER, "SUBMIT", &[]).await;

    let reply = t.bot.process_message(USER, "STATUS", &[]).await;
    assert!(reply.text.contains("HSSE-2000"));
    assert!(reply.text.contains("submitted"));
}

#[tokio::test]
async fn learns_name_from_conversation() {
    let t = build_bot(Some("Nice to meet you!")).await;

    t.bot.process_message(USER, "hello", &[]).await;
    t.bot
        .process_message(USER, "my name is Maria and I work in the depot", &[])
        .await;

    let profile = t.profiles.find(USER).unwrap().unwrap();
    assert_eq!(profile.name.as_deref(), Some("Maria"));
}

#[tokio::test]
async fn free_form_reply_uses_model_and_carries_audio() {
    let t = build_bot(Some("Hard hats are mandatory in all lifting zones.")).await;
    // A known user skips the orientation menu
    t.profiles.find_or_create(USER).unwrap();
    t.profiles.update_info(USER, Some("Asha"), None, None).unwrap();

    let reply = t
        .bot
        .process_message(USER, "what ppe do I need for the crane area", &[])
        .await;

    assert!(reply.text.contains("Hard hats are mandatory"));
    assert!(reply.audio.is_some());
}

#[tokio::test]
async fn critical_free_form_reply_uses_canned_emergency_clip() {
    let analysis = r#"{"intent": "safety_query", "urgency": "critical",
        "sentiment": "negative", "topics": ["structural"],
        "tts_suitable": true, "confidence": 0.9}"#;
    let t = build_bot(Some(analysis)).await;
    t.profiles.find_or_create(USER).unwrap();
    t.profiles.update_info(USER, Some("Asha"), None, None).unwrap();

    let reply = t
        .bot
        .process_message(USER, "the scaffold on level 2 looks ready to collapse", &[])
        .await;

    // Model-rated critical: pre-cached clip, not a fresh synthesis
    let audio = reply.audio.unwrap();
    assert_eq!(audio.filename, "phrase-emergency_general.mp3");
}

#[tokio::test]
async fn model_failure_still_produces_reply() {
    let t = build_bot(None).await;
    t.profiles.find_or_create(USER).unwrap();
    t.profiles.update_info(USER, Some("Asha"), None, None).unwrap();

    let reply = t
        .bot
        .process_message(USER, "tell me about chemical storage please", &[])
        .await;
    assert!(!reply.text.is_empty());
    assert!(reply.text.contains("MENU"));
}
