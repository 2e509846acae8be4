//! Menu screens and orientation heuristics

use crate::bot::commands;
use crate::db::{MessagingPrefs, UserProfile};
use crate::tracker::ContextSnapshot;

const MENU_TIP_MAX_REPLY_LEN: usize = 800;

const MENU_TIP: &str = "\n\nType MENU anytime for options.";

const CONFUSION_PHRASES: [&str; 5] = [
    "what can you do",
    "how does this work",
    "i don't understand",
    "i dont understand",
    "what is this",
];

const BARE_GREETINGS: [&str; 5] = ["hi", "hello", "hey", "start", "begin"];

/// The main menu screen
#[must_use]
pub fn main_menu(name: Option<&str>) -> String {
    let greeting = name.map_or_else(
        || "Hello! I'm Aria, your workplace safety assistant.".to_string(),
        |n| format!("Hello {n}! I'm Aria, your workplace safety assistant."),
    );

    format!(
        "{greeting}\n\n\
         Here's what I can help with:\n\n\
         \u{1F4CB} REPORT - Report a safety incident or hazard\n\
         \u{2753} FAQ - Browse safety topics\n\
         \u{1F6A8} EMERGENCY - Emergency contacts\n\
         \u{1F4CA} STATUS - Your recent reports\n\
         \u{1F50A} VOICE - Voice message settings\n\n\
         Or just ask me a safety question in your own words."
    )
}

/// Emergency contacts screen
#[must_use]
pub fn emergency_contacts() -> String {
    "\u{1F6A8} Emergency Contacts (Guyana)\n\n\
     Emergency services: 911\n\
     Fire Service: 912\n\
     Ambulance: 913\n\
     Georgetown Public Hospital: 225-5200\n\n\
     If you're in immediate danger, call 911 now. Type BACK for the main menu."
        .to_string()
}

/// Status screen listing the user's recent reports
#[must_use]
pub fn system_status(profile: &UserProfile, reports: &[crate::db::IncidentReport]) -> String {
    let mut out = String::from("\u{1F4CA} Your status\n\n");

    if let Some(name) = &profile.name {
        out.push_str(&format!("Name: {name}\n"));
    }
    out.push_str(&format!(
        "Voice messages: {}\n\n",
        if profile.prefs.audio_enabled {
            "on"
        } else {
            "off"
        }
    ));

    if reports.is_empty() {
        out.push_str("No reports on file. Type REPORT to file one.");
    } else {
        out.push_str("Recent reports:\n");
        for report in reports {
            let id = report.external_id.as_deref().unwrap_or("pending");
            out.push_str(&format!(
                "\u{2022} [{}] {} - {}\n",
                id,
                report.status.as_str(),
                summarize(&report.description)
            ));
        }
    }

    out.push_str("\n\nType BACK for the main menu.");
    out
}

/// Voice settings screen
#[must_use]
pub fn voice_settings(prefs: &MessagingPrefs) -> String {
    commands::settings_summary(prefs)
}

/// Whether the user looks lost and should be shown the menu
///
/// Triggers on first contact with no profile name, on a bare greeting,
/// or on explicit confusion phrases.
#[must_use]
pub fn wants_menu(text: &str, profile: &UserProfile, snapshot: &ContextSnapshot) -> bool {
    let lower = text.trim().to_lowercase();

    if profile.name.is_none() && snapshot.turn_count == 0 {
        return true;
    }
    if BARE_GREETINGS.contains(&lower.as_str()) {
        return true;
    }
    CONFUSION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Append the menu tip to short replies
#[must_use]
pub fn with_menu_tip(reply: String) -> String {
    if reply.len() < MENU_TIP_MAX_REPLY_LEN && !reply.contains("MENU") {
        format!("{reply}{MENU_TIP}")
    } else {
        reply
    }
}

fn summarize(description: &str) -> &str {
    let end = description
        .char_indices()
        .nth(40)
        .map_or(description.len(), |(i, _)| i);
    &description[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LongTermMemory;

    fn profile(name: Option<&str>) -> UserProfile {
        UserProfile {
            user_id: "u".to_string(),
            name: name.map(String::from),
            role: None,
            department: None,
            language: "en".to_string(),
            safety_interests: Vec::new(),
            prefs: MessagingPrefs::default(),
            created_at: chrono::Utc::now(),
            last_active: chrono::Utc::now(),
        }
    }

    fn snapshot(turn_count: u32) -> ContextSnapshot {
        ContextSnapshot {
            recent_turns: Vec::new(),
            topics: Vec::new(),
            sentiment_trend: "stable",
            engagement: 0.0,
            unresolved_questions: Vec::new(),
            memory: LongTermMemory::default(),
            turn_count,
        }
    }

    #[test]
    fn test_main_menu_personalized() {
        assert!(main_menu(Some("Priya")).contains("Hello Priya!"));
        assert!(main_menu(None).contains("REPORT"));
    }

    #[test]
    fn test_wants_menu_first_contact() {
        assert!(wants_menu("good afternoon, anyone there?", &profile(None), &snapshot(0)));
    }

    #[test]
    fn test_wants_menu_bare_greeting() {
        assert!(wants_menu("hi", &profile(Some("Dev")), &snapshot(12)));
        assert!(wants_menu("Hello ", &profile(Some("Dev")), &snapshot(12)));
    }

    #[test]
    fn test_wants_menu_confusion() {
        assert!(wants_menu(
            "sorry, what can you do exactly?",
            &profile(Some("Dev")),
            &snapshot(12)
        ));
    }

    #[test]
    fn test_known_user_question_skips_menu() {
        assert!(!wants_menu(
            "what gloves for solvent work?",
            &profile(Some("Dev")),
            &snapshot(12)
        ));
    }

    #[test]
    fn test_menu_tip_only_on_short_replies() {
        let short = with_menu_tip("Wear your hard hat.".to_string());
        assert!(short.contains("Type MENU"));

        let long = with_menu_tip("x".repeat(900));
        assert!(!long.contains("Type MENU"));
    }

    #[test]
    fn test_status_lists_reports() {
        let report = crate::db::new_report(
            "u",
            "spilled solvent near loading bay".to_string(),
            Some(6.8),
            Some(-58.1),
            Some("loading bay".to_string()),
            "medium".to_string(),
            "chemical_incident".to_string(),
            Vec::new(),
            crate::db::ReportStatus::Submitted,
        );
        let out = system_status(&profile(Some("Dev")), &[report]);
        assert!(out.contains("submitted"));
        assert!(out.contains("spilled solvent"));
    }
}
