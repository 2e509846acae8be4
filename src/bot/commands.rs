//! Voice preference and menu command parsing

use crate::db::{MessagingPrefs, VoiceGender};

/// A recognized voice preference command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    Disable,
    Enable,
    Faster,
    Slower,
    Male,
    Female,
    Settings,
}

/// Parse a voice command from raw input
///
/// Substring match on the lowercased text, mirroring how users actually
/// phrase these ("please turn voice off").
#[must_use]
pub fn parse_voice_command(text: &str) -> Option<VoiceCommand> {
    let lower = text.to_lowercase();

    if lower.contains("voice off")
        || lower.contains("disable voice")
        || lower.contains("no voice")
        || lower.contains("text only")
    {
        return Some(VoiceCommand::Disable);
    }
    if lower.contains("voice on")
        || lower.contains("enable voice")
        || lower.contains("dual messaging")
        || lower.contains("both messages")
    {
        return Some(VoiceCommand::Enable);
    }
    if lower.contains("voice fast") || lower.contains("faster voice") {
        return Some(VoiceCommand::Faster);
    }
    if lower.contains("voice slow") || lower.contains("slower voice") {
        return Some(VoiceCommand::Slower);
    }
    if lower.contains("voice male") || lower.contains("male voice") {
        return Some(VoiceCommand::Male);
    }
    if lower.contains("voice female") || lower.contains("female voice") {
        return Some(VoiceCommand::Female);
    }
    if lower.contains("voice settings") {
        return Some(VoiceCommand::Settings);
    }

    None
}

/// Apply a voice command to preferences, returning the confirmation text
/// and whether the reply may carry audio
pub fn apply_voice_command(cmd: VoiceCommand, prefs: &mut MessagingPrefs) -> (String, bool) {
    match cmd {
        VoiceCommand::Disable => {
            prefs.audio_enabled = false;
            (
                "\u{1F507} Voice messages disabled. You'll receive text only. \
                 Say 'voice on' to re-enable."
                    .to_string(),
                false,
            )
        }
        VoiceCommand::Enable => {
            prefs.audio_enabled = true;
            prefs.dual_messaging_enabled = true;
            (
                "\u{1F50A} Voice messages enabled. You'll receive text plus a voice \
                 version shortly after."
                    .to_string(),
                true,
            )
        }
        VoiceCommand::Faster => {
            prefs.faster();
            (
                format!(
                    "\u{26A1} Speech rate increased to {} words per minute.",
                    prefs.speech_rate_wpm
                ),
                true,
            )
        }
        VoiceCommand::Slower => {
            prefs.slower();
            (
                format!(
                    "\u{1F422} Speech rate decreased to {} words per minute.",
                    prefs.speech_rate_wpm
                ),
                true,
            )
        }
        VoiceCommand::Male => {
            prefs.voice_gender = VoiceGender::Male;
            ("Voice changed to male.".to_string(), true)
        }
        VoiceCommand::Female => {
            prefs.voice_gender = VoiceGender::Female;
            ("Voice changed to female.".to_string(), true)
        }
        VoiceCommand::Settings => (settings_summary(prefs), false),
    }
}

/// Current voice settings, formatted for display
#[must_use]
pub fn settings_summary(prefs: &MessagingPrefs) -> String {
    let status = if prefs.audio_enabled {
        "enabled"
    } else {
        "disabled"
    };
    let gender = match prefs.voice_gender {
        VoiceGender::Female => "female",
        VoiceGender::Male => "male",
    };

    format!(
        "\u{2699} Voice settings\n\n\
         Voice messages: {status}\n\
         Voice: {gender}\n\
         Speech rate: {} words per minute\n\
         Audio delay: {}s\n\n\
         Commands: voice on/off, voice fast/slow, voice male/female",
        prefs.speech_rate_wpm, prefs.audio_delay_secs
    )
}

/// A recognized top-level menu command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    MainMenu,
    Report,
    Faq,
    Emergency,
    Status,
    Voice,
    Back,
}

/// Parse a menu command (exact match on trimmed, uppercased input)
#[must_use]
pub fn parse_menu_command(text: &str) -> Option<MenuCommand> {
    match text.trim().to_uppercase().as_str() {
        "MENU" | "HELP" | "OPTIONS" | "START" => Some(MenuCommand::MainMenu),
        "REPORT" => Some(MenuCommand::Report),
        "FAQ" => Some(MenuCommand::Faq),
        "EMERGENCY" => Some(MenuCommand::Emergency),
        "STATUS" => Some(MenuCommand::Status),
        "VOICE" => Some(MenuCommand::Voice),
        "BACK" | "MAIN" | "HOME" => Some(MenuCommand::Back),
        _ => None,
    }
}
