//! Emergency fast path
//!
//! Keyword detection and canned responses. This path runs before any
//! session or profile write and never touches the generative model.

use crate::intent::EMERGENCY_KEYWORDS;

const MEDICAL_WORDS: [&str; 4] = ["injury", "hurt", "accident", "medical"];

/// Emergency sub-type controlling the canned response and audio clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyKind {
    Fire,
    Medical,
    General,
}

impl EmergencyKind {
    /// Canonical phrase ID for the pre-cached audio clip
    #[must_use]
    pub const fn phrase_id(self) -> &'static str {
        match self {
            Self::Fire => "emergency_fire",
            Self::Medical => "emergency_medical",
            Self::General => "emergency_general",
        }
    }
}

/// Detect an emergency in raw input
///
/// Any emergency keyword triggers; the sub-type refines the response.
#[must_use]
pub fn detect(text: &str) -> Option<EmergencyKind> {
    let lower = text.to_lowercase();

    if !EMERGENCY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return None;
    }

    if lower.contains("fire") {
        return Some(EmergencyKind::Fire);
    }
    if MEDICAL_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(EmergencyKind::Medical);
    }
    Some(EmergencyKind::General)
}

/// Canned emergency response, personalized when the name is known
#[must_use]
pub fn response(kind: EmergencyKind, name: Option<&str>) -> String {
    let greeting = name.map_or_else(String::new, |n| format!("{n}, "));

    match kind {
        EmergencyKind::Fire => format!(
            "\u{1F6A8} {greeting}FIRE EMERGENCY\n\n\
             1. Evacuate immediately via the nearest exit\n\
             2. Do NOT use elevators\n\
             3. Call the Fire Service: 912\n\
             4. Assemble at your muster point\n\n\
             Emergency services: 911 | Georgetown Hospital: 225-5200"
        ),
        EmergencyKind::Medical => format!(
            "\u{1F691} {greeting}MEDICAL EMERGENCY\n\n\
             1. Call an ambulance: 913\n\
             2. Do not move the injured person unless they are in danger\n\
             3. Send someone to meet the responders\n\
             4. Notify your supervisor\n\n\
             Emergency services: 911 | Georgetown Hospital: 225-5200"
        ),
        EmergencyKind::General => format!(
            "\u{1F6A8} {greeting}EMERGENCY DETECTED\n\n\
             1. Call emergency services: 911\n\
             2. Move to a safe location\n\
             3. Alert the people around you\n\
             4. Notify your supervisor when safe\n\n\
             Fire: 912 | Ambulance: 913 | Georgetown Hospital: 225-5200"
        ),
    }
}
