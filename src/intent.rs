//! Intent classification
//!
//! A deterministic rule table runs first and also serves as the fallback
//! when the model is unavailable, so classification is total: every input
//! maps to some analysis.

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::ChatModel;

/// Emergency trigger keywords checked before any other handling
pub const EMERGENCY_KEYWORDS: [&str; 8] = [
    "fire", "emergency", "urgent", "accident", "injury", "help", "danger", "critical",
];

const REPORT_KEYWORDS: [&str; 4] = ["report", "incident", "hazard", "unsafe"];

const SAFETY_KEYWORDS: [&str; 7] = [
    "safety", "ppe", "helmet", "gloves", "chemical", "electrical", "training",
];

const GREETINGS: [&str; 6] = ["hi", "hello", "hey", "good morning", "good afternoon", "start"];

/// Classified user intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Emergency,
    ReportIncident,
    SafetyQuery,
    Question,
    Greeting,
    VoiceControl,
    CasualChat,
}

impl Intent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::ReportIncident => "report_incident",
            Self::SafetyQuery => "safety_query",
            Self::Question => "question",
            Self::Greeting => "greeting",
            Self::VoiceControl => "voice_control",
            Self::CasualChat => "casual_chat",
        }
    }
}

/// Message urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Full analysis of one inbound message
#[derive(Debug, Clone)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub urgency: Urgency,
    pub sentiment: String,
    pub topics: Vec<String>,
    pub tts_suitable: bool,
    pub confidence: f64,
}

/// Deterministic rule-table classification
///
/// Total over all inputs; used directly for commands and as the model
/// fallback.
#[must_use]
pub fn classify_rules(text: &str) -> IntentAnalysis {
    let lower = text.to_lowercase();

    if EMERGENCY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentAnalysis {
            intent: Intent::Emergency,
            urgency: Urgency::Critical,
            sentiment: "distressed".to_string(),
            topics: vec!["emergency".to_string()],
            tts_suitable: true,
            confidence: 0.95,
        };
    }

    if lower.contains("voice") || lower.contains("text only") || lower.contains("both messages") {
        return IntentAnalysis {
            intent: Intent::VoiceControl,
            urgency: Urgency::Low,
            sentiment: "neutral".to_string(),
            topics: vec!["preferences".to_string()],
            tts_suitable: false,
            confidence: 0.9,
        };
    }

    if REPORT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentAnalysis {
            intent: Intent::ReportIncident,
            urgency: Urgency::Medium,
            sentiment: "concerned".to_string(),
            topics: vec!["incident".to_string()],
            tts_suitable: true,
            confidence: 0.8,
        };
    }

    let trimmed = lower.trim();
    if GREETINGS.iter().any(|g| trimmed == *g) {
        return IntentAnalysis {
            intent: Intent::Greeting,
            urgency: Urgency::Low,
            sentiment: "positive".to_string(),
            topics: Vec::new(),
            tts_suitable: true,
            confidence: 0.9,
        };
    }

    let topics: Vec<String> = SAFETY_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| (*k).to_string())
        .collect();

    if !topics.is_empty() {
        return IntentAnalysis {
            intent: Intent::SafetyQuery,
            urgency: Urgency::Low,
            sentiment: "neutral".to_string(),
            topics,
            tts_suitable: true,
            confidence: 0.7,
        };
    }

    if lower.contains('?') {
        return IntentAnalysis {
            intent: Intent::Question,
            urgency: Urgency::Low,
            sentiment: "neutral".to_string(),
            topics: Vec::new(),
            tts_suitable: true,
            confidence: 0.6,
        };
    }

    IntentAnalysis {
        intent: Intent::CasualChat,
        urgency: Urgency::Low,
        sentiment: "neutral".to_string(),
        topics: Vec::new(),
        tts_suitable: true,
        confidence: 0.5,
    }
}

/// Classifier combining the rule table with a model-backed analysis
#[derive(Clone)]
pub struct IntentClassifier {
    model: Option<Arc<dyn ChatModel>>,
}

const ANALYSIS_PROMPT: &str = "You analyze workplace safety chat messages. \
Respond with JSON only: {\"intent\": one of \
[emergency, report_incident, safety_query, question, greeting, casual_chat], \
\"urgency\": one of [low, medium, high, critical], \
\"sentiment\": short word, \"topics\": string array, \
\"tts_suitable\": bool, \"confidence\": 0..1}";

impl IntentClassifier {
    /// Create a classifier; without a model only the rule table is used
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(model: Option<Arc<dyn ChatModel>>) -> Self {
        Self { model }
    }

    /// Classify a message
    ///
    /// Rule-table matches for emergencies and commands short-circuit the
    /// model. Model failures degrade to the rule table.
    pub async fn classify(&self, text: &str) -> IntentAnalysis {
        let ruled = classify_rules(text);
        if matches!(
            ruled.intent,
            Intent::Emergency | Intent::VoiceControl | Intent::ReportIncident
        ) {
            return ruled;
        }

        let Some(model) = &self.model else {
            return ruled;
        };

        match model.complete(ANALYSIS_PROMPT, text).await {
            Ok(raw) => parse_model_analysis(&raw).unwrap_or(ruled),
            Err(e) => {
                tracing::debug!(error = %e, "model classification failed, using rule table");
                ruled
            }
        }
    }
}

#[derive(Deserialize)]
struct ModelAnalysis {
    intent: String,
    urgency: String,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default = "default_tts")]
    tts_suitable: bool,
    #[serde(default)]
    confidence: f64,
}

const fn default_tts() -> bool {
    true
}

fn parse_model_analysis(raw: &str) -> Option<IntentAnalysis> {
    // Models occasionally wrap JSON in a code fence
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed: ModelAnalysis = serde_json::from_str(trimmed).ok()?;

    let intent = match parsed.intent.as_str() {
        "emergency" => Intent::Emergency,
        "report_incident" => Intent::ReportIncident,
        "safety_query" => Intent::SafetyQuery,
        "question" => Intent::Question,
        "greeting" => Intent::Greeting,
        "casual_chat" => Intent::CasualChat,
        _ => return None,
    };

    let urgency = match parsed.urgency.as_str() {
        "critical" => Urgency::Critical,
        "high" => Urgency::High,
        "medium" => Urgency::Medium,
        _ => Urgency::Low,
    };

    Some(IntentAnalysis {
        intent,
        urgency,
        sentiment: parsed.sentiment.unwrap_or_else(|| "neutral".to_string()),
        topics: parsed.topics,
        tts_suitable: parsed.tts_suitable,
        confidence: parsed.confidence.clamp(0.0, 1.0),
    })
}
