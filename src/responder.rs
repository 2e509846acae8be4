//! Response orchestration
//!
//! Builds the persona and context prompts, calls the chat model, and
//! post-processes the draft reply. Model failure degrades to a fixed
//! friendly fallback; the orchestrator itself never errors.

use std::sync::Arc;
use std::time::Duration;

use crate::db::UserProfile;
use crate::intent::{Intent, IntentAnalysis, Urgency};
use crate::llm::ChatModel;
use crate::tracker::ContextSnapshot;

/// Hard cap on outbound reply length
pub const REPLY_CHAR_LIMIT: usize = 1500;

/// Length replies are cut back to when over the cap
pub const REPLY_TRUNCATE_TO: usize = 1400;

const PERSONA_PROMPT: &str = "You are Aria, a warm and knowledgeable workplace \
health, safety, security and environment assistant for worksites in Guyana. \
Keep replies practical and concise. Prioritize worker safety in every answer. \
If a situation sounds dangerous, say so plainly and point to emergency contacts.";

const EMERGENCY_FOOTER: &str =
    "\n\nIf this is an emergency, call 911 now or type EMERGENCY for contacts.";

const CLARIFY_FOOTER: &str = "\n\nCould you tell me a bit more about what you need?";

const DUAL_MESSAGING_INTRO: &str = "\n\nTip: I send both text and voice messages. \
Say 'voice off' anytime if you'd prefer text only.";

const CONTINUATION_OFFER: &str = "...\n\n(Reply MORE for the rest of this answer.)";

/// Response orchestrator
pub struct Responder {
    model: Option<Arc<dyn ChatModel>>,
    timeout: Duration,
}

impl Responder {
    /// Create a new responder; without a model every reply is the fallback
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(model: Option<Arc<dyn ChatModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Generate a reply for a free-form message
    ///
    /// Infallible: model errors and timeouts produce the fallback reply.
    pub async fn generate(
        &self,
        profile: &UserProfile,
        snapshot: &ContextSnapshot,
        analysis: &IntentAnalysis,
        text: &str,
    ) -> String {
        let draft = match &self.model {
            Some(model) => {
                let prompt = build_context_prompt(profile, snapshot, text);
                match tokio::time::timeout(self.timeout, model.complete(PERSONA_PROMPT, &prompt))
                    .await
                {
                    Ok(Ok(reply)) => reply,
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "model reply failed, using fallback");
                        fallback_reply(profile.name.as_deref())
                    }
                    Err(_) => {
                        tracing::warn!("model reply timed out, using fallback");
                        fallback_reply(profile.name.as_deref())
                    }
                }
            }
            None => fallback_reply(profile.name.as_deref()),
        };

        let first_contact = snapshot.turn_count == 0;
        post_process(&draft, analysis, first_contact)
    }
}

/// Apply reply post-processing rules
///
/// Appends an emergency pointer when urgency is high but the draft lacks
/// emergency language, a clarifying question for bare questions, and the
/// dual-messaging explainer on a first-contact greeting. Over-long replies
/// are cut back with a continuation offer.
#[must_use]
pub fn post_process(draft: &str, analysis: &IntentAnalysis, first_contact: bool) -> String {
    let mut reply = draft.trim().to_string();
    let lower = reply.to_lowercase();

    if matches!(analysis.urgency, Urgency::High | Urgency::Critical)
        && !lower.contains("emergency")
        && !lower.contains("call")
    {
        reply.push_str(EMERGENCY_FOOTER);
    }

    if analysis.intent == Intent::Question && !reply.contains('?') {
        reply.push_str(CLARIFY_FOOTER);
    }

    if analysis.intent == Intent::Greeting && first_contact {
        reply.push_str(DUAL_MESSAGING_INTRO);
    }

    if reply.len() > REPLY_CHAR_LIMIT {
        let cut = floor_char_boundary(&reply, REPLY_TRUNCATE_TO);
        reply.truncate(cut);
        reply.push_str(CONTINUATION_OFFER);
    }

    reply
}

/// Fixed reply used when the generative path is unavailable
#[must_use]
pub fn fallback_reply(name: Option<&str>) -> String {
    name.map_or_else(
        || {
            "I'm having trouble generating a full answer right now. You can type MENU \
             for options, REPORT to report an incident, or EMERGENCY for emergency contacts."
                .to_string()
        },
        |n| {
            format!(
                "Sorry {n}, I'm having trouble generating a full answer right now. You can \
                 type MENU for options, REPORT to report an incident, or EMERGENCY for \
                 emergency contacts."
            )
        },
    )
}

fn build_context_prompt(profile: &UserProfile, snapshot: &ContextSnapshot, text: &str) -> String {
    let mut prompt = String::new();

    if let Some(name) = &profile.name {
        prompt.push_str(&format!("User name: {name}\n"));
    }
    if let Some(role) = &profile.role {
        prompt.push_str(&format!("User role: {role}\n"));
    }
    prompt.push_str(&format!(
        "Preferred style: {}\nSentiment trend: {}\n",
        snapshot.memory.preferred_style, snapshot.sentiment_trend
    ));

    if !snapshot.recent_turns.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for turn in &snapshot.recent_turns {
            prompt.push_str(&format!(
                "User: {}\nAria: {}\n",
                turn.user_input, turn.bot_response
            ));
        }
    }

    if !snapshot.unresolved_questions.is_empty() {
        prompt.push_str(&format!(
            "Open questions: {}\n",
            snapshot.unresolved_questions.join(" | ")
        ));
    }

    prompt.push_str(&format!("\nCurrent message: {text}"));
    prompt
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
