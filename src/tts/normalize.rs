//! Text normalization for speech synthesis
//!
//! Pure transformations that turn chat-formatted text into something an
//! engine can speak naturally, plus the length policy that keeps audio
//! clips short while preserving safety-critical sentences.

use std::sync::LazyLock;

use regex::Regex;

use crate::intent::EMERGENCY_KEYWORDS;

/// Character cap applied before synthesis
pub const SPEECH_CHAR_LIMIT: usize = 1000;

const TRUNCATION_NOTICE: &str = "For complete information, please read the full message.";

static MARKDOWN_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static MARKDOWN_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_]([^*_]+)[*_]").expect("valid regex"));
static MARKDOWN_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]*)`").expect("valid regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s\-]{6,}\d").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// Spoken expansions for abbreviations the engines would otherwise mangle
const EXPANSIONS: [(&str, &str); 9] = [
    ("ARIA", "Aria"),
    ("HSSE", "H S S E"),
    ("PPE", "P P E"),
    ("FAQ", "F A Q"),
    ("GPS", "G P S"),
    ("API", "A P I"),
    ("URL", "U R L"),
    ("AI", "A I"),
    ("ID", "I D"),
];

/// Normalize chat text into speakable form
///
/// Strips markdown and emoji, replaces URLs and phone numbers with spoken
/// placeholders, expands abbreviations, and collapses whitespace.
#[must_use]
pub fn normalize_for_speech(text: &str) -> String {
    let mut out = MARKDOWN_BOLD.replace_all(text, "$1").into_owned();
    out = MARKDOWN_EMPHASIS.replace_all(&out, "$1").into_owned();
    out = MARKDOWN_CODE.replace_all(&out, "$1").into_owned();
    out = URL.replace_all(&out, "website link").into_owned();
    out = PHONE.replace_all(&out, "phone number").into_owned();

    out = out
        .chars()
        .filter(|c| !is_pictograph(*c))
        .collect::<String>();

    for (abbr, spoken) in EXPANSIONS {
        out = replace_word(&out, abbr, spoken);
    }

    out = out.replace('\n', ". ");
    WHITESPACE.replace_all(&out, " ").trim().to_string()
}

/// Apply the speech length cap
///
/// Sentences containing emergency keywords are retained first, then the
/// remainder in order, until the cap is reached. Truncated text gains a
/// closing notice pointing at the full text message.
#[must_use]
pub fn truncate_for_speech(text: &str) -> String {
    if text.len() <= SPEECH_CHAR_LIMIT {
        return text.to_string();
    }

    let sentences: Vec<&str> = text
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let budget = SPEECH_CHAR_LIMIT.saturating_sub(TRUNCATION_NOTICE.len() + 1);
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0;

    let is_critical = |s: &str| {
        let lower = s.to_lowercase();
        EMERGENCY_KEYWORDS.iter().any(|k| lower.contains(k))
    };

    for sentence in sentences.iter().filter(|s| is_critical(s)) {
        if used + sentence.len() + 1 > budget {
            break;
        }
        used += sentence.len() + 1;
        kept.push(sentence);
    }

    for sentence in sentences.iter().filter(|s| !is_critical(s)) {
        if used + sentence.len() + 1 > budget {
            break;
        }
        used += sentence.len() + 1;
        kept.push(sentence);
    }

    let mut out = kept.join(" ");
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(TRUNCATION_NOTICE);
    out
}

fn is_pictograph(c: char) -> bool {
    matches!(u32::from(c),
        0x1F300..=0x1FAFF // symbols, pictographs, emoticons, transport
        | 0x2600..=0x27BF // misc symbols and dingbats
        | 0xFE00..=0xFE0F // variation selectors
        | 0x1F1E6..=0x1F1FF // regional indicators
    )
}

/// Replace whole-word occurrences only, leaving embedded matches alone
fn replace_word(text: &str, word: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(word) {
        let before_ok = rest[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after = &rest[pos + word.len()..];
        let after_ok = after.chars().next().is_none_or(|c| !c.is_alphanumeric());

        out.push_str(&rest[..pos]);
        if before_ok && after_ok {
            out.push_str(replacement);
        } else {
            out.push_str(word);
        }
        rest = after;
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_stripped() {
        assert_eq!(
            normalize_for_speech("**Always** wear _your_ `helmet`"),
            "Always wear your helmet"
        );
    }

    #[test]
    fn test_urls_and_phones_spoken() {
        let out = normalize_for_speech("See https://hsse.example.com/guide or call 225-5200-123");
        assert!(out.contains("website link"));
        assert!(out.contains("phone number"));
        assert!(!out.contains("https"));
    }

    #[test]
    fn test_abbreviations_expanded_whole_word_only() {
        let out = normalize_for_speech("PPE rules");
        assert!(out.contains("P P E"));

        // Embedded occurrences stay intact
        let out = normalize_for_speech("RAPID response");
        assert_eq!(out, "RAPID response");
    }

    #[test]
    fn test_newlines_become_sentence_breaks() {
        let out = normalize_for_speech("First rule\nSecond rule");
        assert_eq!(out, "First rule. Second rule");
    }

    #[test]
    fn test_emoji_removed() {
        let out = normalize_for_speech("Stay safe \u{1F9BA}\u{2705}");
        assert_eq!(out, "Stay safe");
    }

    #[test]
    fn test_short_text_not_truncated() {
        assert_eq!(truncate_for_speech("short message"), "short message");
    }

    #[test]
    fn test_truncation_prefers_emergency_sentences() {
        let filler = "This is a routine sentence about general workplace tidiness habits. ";
        let mut text = filler.repeat(20);
        text.push_str("In an emergency call 911 immediately.");

        let out = truncate_for_speech(&text);
        assert!(out.len() <= SPEECH_CHAR_LIMIT);
        assert!(out.starts_with("In an emergency call 911 immediately."));
        assert!(out.ends_with(TRUNCATION_NOTICE));
    }
}
