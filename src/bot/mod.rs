//! Conversation orchestrator
//!
//! Routes every inbound message through a fixed precedence: emergencies,
//! then voice and menu commands, then an active report flow, then menu and
//! FAQ navigation states, then the orientation heuristic, and finally
//! free-form conversation. Internal failures degrade to a fallback text
//! reply; the user always gets an answer.

pub mod commands;
pub mod emergency;
pub mod faq;
pub mod menus;
pub mod report_flow;

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::Result;
use crate::db::{
    MediaRef, ProfileRepo, ReportRepo, SessionData, SessionRepo, SessionState, UserProfile,
};
use crate::delivery::Reply;
use crate::intent::{Intent, IntentAnalysis, IntentClassifier, Urgency, classify_rules};
use crate::responder::{Responder, fallback_reply};
use crate::tracker::ConversationTracker;
use crate::tts::{Priority, SpeechGateway};

pub use report_flow::ReportFlow;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy name is ([A-Za-z]+)|\bcall me ([A-Za-z]+)").expect("valid regex")
});

/// The conversation orchestrator
pub struct Bot {
    profiles: ProfileRepo,
    sessions: SessionRepo,
    reports: ReportRepo,
    tracker: ConversationTracker,
    classifier: IntentClassifier,
    responder: Responder,
    speech: Arc<SpeechGateway>,
    report_flow: ReportFlow,
}

impl Bot {
    /// Wire up the orchestrator
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: ProfileRepo,
        sessions: SessionRepo,
        reports: ReportRepo,
        tracker: ConversationTracker,
        classifier: IntentClassifier,
        responder: Responder,
        speech: Arc<SpeechGateway>,
        report_flow: ReportFlow,
    ) -> Self {
        Self {
            profiles,
            sessions,
            reports,
            tracker,
            classifier,
            responder,
            speech,
            report_flow,
        }
    }

    /// Process one inbound message into a deliverable reply
    ///
    /// Never fails: internal errors are logged and replaced with the
    /// fallback reply.
    pub async fn process_message(&self, user_id: &str, text: &str, media: &[MediaRef]) -> Reply {
        match self.handle(user_id, text, media).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(user_id, error = %e, "message handling failed");
                Reply::text_only(fallback_reply(None))
            }
        }
    }

    async fn handle(&self, user_id: &str, text: &str, media: &[MediaRef]) -> Result<Reply> {
        // Emergencies preempt everything, including an active report flow.
        // This branch must not create or touch any rows.
        if let Some(kind) = emergency::detect(text) {
            return self.emergency_fast_path(user_id, kind).await;
        }

        let profile = self.profiles.find_or_create(user_id)?;
        self.profiles.touch(user_id)?;

        // Explicit commands beat whatever flow the session is in
        if let Some(cmd) = commands::parse_voice_command(text) {
            return self.handle_voice_command(user_id, &profile, cmd).await;
        }

        if let Some(cmd) = commands::parse_menu_command(text) {
            return self.handle_menu_command(user_id, &profile, cmd).await;
        }

        let session = self.sessions.get(user_id)?;

        if session.state.in_report_flow() {
            let draft = match session.data {
                SessionData::Report(draft) => draft,
                _ => crate::db::ReportDraft::default(),
            };
            let flow = self
                .report_flow
                .advance(user_id, session.state, draft, text, media)
                .await?;
            let audio = match flow.canonical_audio {
                Some(id) => self.speech.canonical(id).await,
                None => None,
            };
            return Ok(Reply {
                text: flow.text,
                audio,
            });
        }

        if session.state == SessionState::FaqMode {
            if let Some(category) = faq::FaqCategory::parse(text) {
                self.sessions.set(
                    user_id,
                    SessionState::FaqMode,
                    &SessionData::Faq {
                        category: Some(category.as_str().to_string()),
                    },
                )?;
                return Ok(Reply::text_only(faq::category_screen(category)));
            }
            // Not a topic; leave FAQ mode and answer in free form
            self.sessions.reset(user_id)?;
            let analysis = self.classifier.classify(text).await;
            let mut reply = self.converse(user_id, &profile, text, analysis).await?;
            reply.text = format!("{}\n\n{}", reply.text, faq::exit_hint());
            return Ok(reply);
        }

        if session.state == SessionState::MenuNavigation {
            self.sessions.reset(user_id)?;
        }

        self.learn_name(user_id, text)?;

        let analysis = self.classifier.classify(text).await;
        match analysis.intent {
            // "I want to report a hazard" in free form enters the flow too
            Intent::ReportIncident => {
                return Ok(Reply::text_only(self.report_flow.start(user_id)?));
            }
            // Model-flagged emergencies that slipped past the keyword scan
            Intent::Emergency => {
                return self
                    .handle_emergency(user_id, &profile, text, emergency::EmergencyKind::General)
                    .await;
            }
            _ => {}
        }

        let snapshot = self.tracker.context(user_id)?;
        if menus::wants_menu(text, &profile, &snapshot) {
            self.sessions.set(
                user_id,
                SessionState::MenuNavigation,
                &SessionData::Menu {
                    last_menu: "main".to_string(),
                },
            )?;
            let audio = if profile.prefs.audio_enabled {
                self.speech.canonical("welcome").await
            } else {
                None
            };
            return Ok(Reply {
                text: menus::main_menu(profile.name.as_deref()),
                audio,
            });
        }

        self.converse(user_id, &profile, text, analysis).await
    }

    /// Keyword-triggered emergency short circuit
    ///
    /// Only a read-only profile lookup is allowed here, and the audio is
    /// strictly the pre-cached clip for the sub-type: a cache miss means
    /// text only, never fresh synthesis.
    async fn emergency_fast_path(
        &self,
        user_id: &str,
        kind: emergency::EmergencyKind,
    ) -> Result<Reply> {
        tracing::warn!(user_id, kind = ?kind, "emergency keyword detected");

        let profile = self.profiles.find(user_id)?;
        let name = profile.as_ref().and_then(|p| p.name.as_deref());
        let voice_ok = profile
            .as_ref()
            .is_none_or(|p| p.prefs.voice_for_emergencies);

        let audio = if voice_ok {
            self.speech.canonical(kind.phrase_id()).await
        } else {
            None
        };

        Ok(Reply {
            text: emergency::response(kind, name),
            audio,
        })
    }

    /// Intent-driven emergency handler for messages without trigger keywords
    async fn handle_emergency(
        &self,
        user_id: &str,
        profile: &UserProfile,
        text: &str,
        kind: emergency::EmergencyKind,
    ) -> Result<Reply> {
        tracing::warn!(user_id, kind = ?kind, "emergency intent detected");

        let reply_text = emergency::response(kind, profile.name.as_deref());

        let analysis = classify_rules(text);
        let thread = self.tracker.resolve_thread(user_id, text, "emergency")?;
        self.tracker
            .record_turn(&thread, user_id, text, &reply_text, &analysis)?;

        // Pre-cached clip first; fall back to dynamic synthesis
        let audio = if profile.prefs.voice_for_emergencies {
            match self.speech.canonical(kind.phrase_id()).await {
                Some(handle) => Some(handle),
                None => {
                    self.speech
                        .synthesize(&reply_text, &profile.prefs, Priority::Emergency)
                        .await
                }
            }
        } else {
            None
        };

        Ok(Reply {
            text: reply_text,
            audio,
        })
    }

    async fn handle_voice_command(
        &self,
        user_id: &str,
        profile: &UserProfile,
        cmd: commands::VoiceCommand,
    ) -> Result<Reply> {
        let mut prefs = profile.prefs.clone();
        let (text, audio_ok) = commands::apply_voice_command(cmd, &mut prefs);
        self.profiles.set_prefs(user_id, &prefs)?;

        let audio = if audio_ok && prefs.audio_enabled {
            match cmd {
                commands::VoiceCommand::Enable => self.speech.canonical("voice_enabled").await,
                _ => self.speech.synthesize(&text, &prefs, Priority::Normal).await,
            }
        } else {
            None
        };

        Ok(Reply { text, audio })
    }

    async fn handle_menu_command(
        &self,
        user_id: &str,
        profile: &UserProfile,
        cmd: commands::MenuCommand,
    ) -> Result<Reply> {
        match cmd {
            commands::MenuCommand::MainMenu => {
                self.sessions.set(
                    user_id,
                    SessionState::MenuNavigation,
                    &SessionData::Menu {
                        last_menu: "main".to_string(),
                    },
                )?;
                let audio = if profile.prefs.audio_enabled {
                    self.speech.canonical("menu").await
                } else {
                    None
                };
                Ok(Reply {
                    text: menus::main_menu(profile.name.as_deref()),
                    audio,
                })
            }
            commands::MenuCommand::Back => {
                self.sessions.reset(user_id)?;
                Ok(Reply::text_only(menus::main_menu(profile.name.as_deref())))
            }
            commands::MenuCommand::Report => {
                Ok(Reply::text_only(self.report_flow.start(user_id)?))
            }
            commands::MenuCommand::Faq => {
                self.sessions.set(
                    user_id,
                    SessionState::FaqMode,
                    &SessionData::Faq { category: None },
                )?;
                Ok(Reply::text_only(faq::category_menu()))
            }
            commands::MenuCommand::Emergency => {
                Ok(Reply::text_only(menus::emergency_contacts()))
            }
            commands::MenuCommand::Status => {
                let reports = self.reports.list_for_user(user_id, 5)?;
                Ok(Reply::text_only(menus::system_status(profile, &reports)))
            }
            commands::MenuCommand::Voice => {
                Ok(Reply::text_only(menus::voice_settings(&profile.prefs)))
            }
        }
    }

    async fn converse(
        &self,
        user_id: &str,
        profile: &UserProfile,
        text: &str,
        analysis: IntentAnalysis,
    ) -> Result<Reply> {
        let snapshot = self.tracker.context(user_id)?;

        let topic = analysis
            .topics
            .first()
            .map_or_else(|| analysis.intent.as_str().to_string(), Clone::clone);
        let thread = self.tracker.resolve_thread(user_id, text, &topic)?;

        let reply_text = self
            .responder
            .generate(profile, &snapshot, &analysis, text)
            .await;
        let reply_text = menus::with_menu_tip(reply_text);

        self.tracker
            .record_turn(&thread, user_id, text, &reply_text, &analysis)?;

        let wants_audio = profile.prefs.audio_enabled
            && analysis.tts_suitable
            && analysis.intent != Intent::VoiceControl;
        let audio = if wants_audio {
            // High-urgency replies prefer the pre-cached emergency clip
            let canned = if analysis.urgency >= Urgency::High {
                let kind = emergency::detect(text).unwrap_or(emergency::EmergencyKind::General);
                self.speech.canonical(kind.phrase_id()).await
            } else {
                None
            };
            match canned {
                Some(handle) => Some(handle),
                None => {
                    self.speech
                        .synthesize(&reply_text, &profile.prefs, Priority::Normal)
                        .await
                }
            }
        } else {
            None
        };

        Ok(Reply {
            text: reply_text,
            audio,
        })
    }

    fn learn_name(&self, user_id: &str, text: &str) -> Result<()> {
        if let Some(captures) = NAME_PATTERN.captures(text) {
            let name = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map(|m| m.as_str());
            if let Some(name) = name {
                self.profiles.update_info(user_id, Some(name), None, None)?;
                tracing::debug!(user_id, name, "learned user name");
            }
        }
        Ok(())
    }
}
