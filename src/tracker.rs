//! Conversation thread tracking and quality scoring
//!
//! Decides whether an incoming message continues the user's latest thread
//! or starts a new one, keeps a bounded in-memory window of recent turns,
//! and derives the context snapshot the responder feeds to the model.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::Result;
use crate::db::{ConversationTurn, LongTermMemory, ThreadRepo};
use crate::intent::IntentAnalysis;

const POSITIVE_WORDS: [&str; 7] = [
    "thanks", "helpful", "great", "perfect", "exactly", "awesome", "good",
];

const POSITIVE_SENTIMENTS: [&str; 2] = ["happy", "excited"];
const NEGATIVE_SENTIMENTS: [&str; 3] = ["sad", "frustrated", "angry"];

const CONTINUATION_WORDS: [&str; 5] = ["also", "and", "additionally", "furthermore", "moreover"];

const GREETING_WORDS: [&str; 5] = ["hi", "hello", "hey", "good morning", "good afternoon"];

/// Thresholds governing thread continuation and the turn window
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// A thread older than this can never be continued
    pub recency_window: Duration,
    /// Within this window any message continues the thread
    pub continuation_window: Duration,
    /// Bounded in-memory turn window per user
    pub turn_window: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            recency_window: Duration::from_secs(2 * 3600),
            continuation_window: Duration::from_secs(30 * 60),
            turn_window: 20,
        }
    }
}

/// Lightweight view of a recent turn kept in the in-memory window
#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub user_input: String,
    pub bot_response: String,
    pub intent: String,
    pub sentiment: String,
    pub quality: f64,
}

/// Context snapshot handed to the response orchestrator
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub recent_turns: Vec<TurnSummary>,
    pub topics: Vec<String>,
    pub sentiment_trend: &'static str,
    pub engagement: f64,
    pub unresolved_questions: Vec<String>,
    pub memory: LongTermMemory,
    pub turn_count: u32,
}

/// Conversation tracker
pub struct ConversationTracker {
    threads: ThreadRepo,
    config: TrackerConfig,
    windows: Mutex<HashMap<String, VecDeque<TurnSummary>>>,
}

impl ConversationTracker {
    /// Create a new tracker
    #[must_use]
    pub fn new(threads: ThreadRepo, config: TrackerConfig) -> Self {
        Self {
            threads,
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the thread an incoming message belongs to
    ///
    /// Continues the latest thread when it is recent enough, otherwise
    /// creates a new one. A message inside the continuation window always
    /// continues; between the continuation and recency windows it continues
    /// unless it is a bare greeting without continuation language.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn resolve_thread(&self, user_id: &str, text: &str, topic: &str) -> Result<String> {
        let latest = self.threads.find_latest(user_id)?;

        if let Some(thread) = latest {
            let age = Utc::now().signed_duration_since(thread.last_activity);
            let age = age.to_std().unwrap_or(Duration::ZERO);

            if age < self.config.recency_window {
                let continues = age < self.config.continuation_window
                    || has_continuation_language(text)
                    || !is_greeting(text);

                if continues {
                    return Ok(thread.id);
                }
            }
        }

        let thread = self.threads.create(user_id, topic)?;
        tracing::debug!(user_id, thread_id = %thread.id, topic, "started new conversation thread");
        Ok(thread.id)
    }

    /// Record a completed exchange
    ///
    /// Persists the immutable turn, bumps the thread, and appends to the
    /// bounded in-memory window.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn record_turn(
        &self,
        thread_id: &str,
        user_id: &str,
        user_input: &str,
        bot_response: &str,
        analysis: &IntentAnalysis,
    ) -> Result<f64> {
        let quality = quality_score(user_input);

        self.threads.record_turn(&ConversationTurn {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            user_input: user_input.to_string(),
            bot_response: bot_response.to_string(),
            intent: analysis.intent.as_str().to_string(),
            sentiment: analysis.sentiment.clone(),
            quality,
            created_at: Utc::now(),
        })?;

        let summary = TurnSummary {
            user_input: user_input.to_string(),
            bot_response: bot_response.to_string(),
            intent: analysis.intent.as_str().to_string(),
            sentiment: analysis.sentiment.clone(),
            quality,
        };

        if let Ok(mut windows) = self.windows.lock() {
            let window = windows.entry(user_id.to_string()).or_default();
            window.push_back(summary);
            while window.len() > self.config.turn_window {
                window.pop_front();
            }
        }

        Ok(quality)
    }

    /// Build the context snapshot for a user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn context(&self, user_id: &str) -> Result<ContextSnapshot> {
        let window: Vec<TurnSummary> = self
            .windows
            .lock()
            .map(|w| w.get(user_id).map(|v| v.iter().cloned().collect()))
            .unwrap_or_default()
            .unwrap_or_default();

        // Fall back to persisted turns after a restart
        let window = if window.is_empty() {
            self.threads
                .recent_turns(user_id, self.config.turn_window)?
                .into_iter()
                .rev()
                .map(|t| TurnSummary {
                    user_input: t.user_input,
                    bot_response: t.bot_response,
                    intent: t.intent,
                    sentiment: t.sentiment,
                    quality: t.quality,
                })
                .collect()
        } else {
            window
        };

        let recent_turns: Vec<TurnSummary> =
            window.iter().rev().take(5).rev().cloned().collect();

        let mut topics: Vec<String> = Vec::new();
        for turn in &window {
            if !topics.contains(&turn.intent) {
                topics.push(turn.intent.clone());
            }
        }

        let sentiments: Vec<&str> = window.iter().map(|t| t.sentiment.as_str()).collect();

        Ok(ContextSnapshot {
            sentiment_trend: sentiment_trend(&sentiments),
            engagement: engagement_score(&window),
            unresolved_questions: unresolved_questions(&window),
            memory: self.threads.memory(user_id)?,
            turn_count: self.threads.turn_count(user_id)?,
            recent_turns,
            topics,
        })
    }
}

/// Interaction quality score for one user message
///
/// Base 0.5, bumped for appreciation language, questions, and substance,
/// clamped to [0, 1].
#[must_use]
pub fn quality_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score: f64 = 0.5;

    if POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
        score += 0.2;
    }
    if lower.contains('?') {
        score += 0.1;
    }
    if text.len() > 50 {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Majority sentiment direction over the last three turns
#[must_use]
pub fn sentiment_trend(sentiments: &[&str]) -> &'static str {
    let recent: Vec<&str> = sentiments.iter().rev().take(3).copied().collect();
    if recent.is_empty() {
        return "stable";
    }

    let positive = recent
        .iter()
        .filter(|s| POSITIVE_SENTIMENTS.contains(s))
        .count();
    let negative = recent
        .iter()
        .filter(|s| NEGATIVE_SENTIMENTS.contains(s))
        .count();

    if positive > negative {
        "improving"
    } else if negative > positive {
        "declining"
    } else {
        "stable"
    }
}

/// Average per-turn engagement, clamped to [0, 1]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_score(turns: &[TurnSummary]) -> f64 {
    if turns.is_empty() {
        return 0.0;
    }

    let total: f64 = turns
        .iter()
        .map(|t| {
            let mut s = 0.0;
            if t.user_input.len() > 50 {
                s += 0.2;
            }
            if t.user_input.contains('?') {
                s += 0.1;
            }
            if t.quality > 0.7 {
                s += 0.1;
            }
            s
        })
        .sum();

    (total / turns.len() as f64).clamp(0.0, 1.0)
}

/// The last three question inputs, oldest first
#[must_use]
pub fn unresolved_questions(turns: &[TurnSummary]) -> Vec<String> {
    let mut questions: Vec<String> = turns
        .iter()
        .rev()
        .filter(|t| t.user_input.contains('?'))
        .take(3)
        .map(|t| t.user_input.clone())
        .collect();
    questions.reverse();
    questions
}

/// Whether text is a bare greeting
#[must_use]
pub fn is_greeting(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    GREETING_WORDS
        .iter()
        .any(|g| lower == *g || (lower.starts_with(&format!("{g} ")) && lower.len() < g.len() + 8))
}

/// Whether text references the previous exchange
#[must_use]
pub fn has_continuation_language(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTINUATION_WORDS.iter().any(|w| {
        lower.split(|c: char| !c.is_alphanumeric()).any(|t| t == *w)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;
    use crate::intent::classify_rules;

    fn setup() -> ConversationTracker {
        let pool = init_memory().unwrap();
        ConversationTracker::new(ThreadRepo::new(pool), TrackerConfig::default())
    }

    fn summary(input: &str, sentiment: &str, quality: f64) -> TurnSummary {
        TurnSummary {
            user_input: input.to_string(),
            bot_response: "ok".to_string(),
            intent: "casual_chat".to_string(),
            sentiment: sentiment.to_string(),
            quality,
        }
    }

    #[test]
    fn test_quality_score_components() {
        assert!((quality_score("ok") - 0.5).abs() < 1e-9);
        assert!((quality_score("thanks") - 0.7).abs() < 1e-9);
        assert!((quality_score("what ppe do I need?") - 0.6).abs() < 1e-9);
        let long = "thanks, that was helpful! what about the chemical storage area rules?";
        assert!((quality_score(long) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_sentiment_trend_majority() {
        assert_eq!(sentiment_trend(&["happy", "happy", "sad"]), "improving");
        assert_eq!(sentiment_trend(&["sad", "angry", "neutral"]), "declining");
        assert_eq!(sentiment_trend(&["neutral", "neutral"]), "stable");
        assert_eq!(sentiment_trend(&[]), "stable");
        // Only the last three count
        assert_eq!(
            sentiment_trend(&["happy", "happy", "sad", "angry", "frustrated"]),
            "declining"
        );
    }

    #[test]
    fn test_engagement_score() {
        assert!((engagement_score(&[]) - 0.0).abs() < 1e-9);

        let turns = vec![
            summary("short", "neutral", 0.5),
            summary(
                "a much longer message asking about the new scaffolding procedures?",
                "neutral",
                0.8,
            ),
        ];
        // (0.0 + 0.4) / 2
        assert!((engagement_score(&turns) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_questions_keeps_last_three() {
        let turns = vec![
            summary("q1?", "neutral", 0.5),
            summary("statement", "neutral", 0.5),
            summary("q2?", "neutral", 0.5),
            summary("q3?", "neutral", 0.5),
            summary("q4?", "neutral", 0.5),
        ];
        assert_eq!(unresolved_questions(&turns), vec!["q2?", "q3?", "q4?"]);
    }

    #[test]
    fn test_greeting_and_continuation_detection() {
        assert!(is_greeting("Hi"));
        assert!(is_greeting("good morning"));
        assert!(!is_greeting("hi, I need to report a chemical spill"));
        assert!(has_continuation_language("also, what about gloves"));
        assert!(!has_continuation_language("sandals are not allowed"));
    }

    #[test]
    fn test_recent_thread_is_continued() {
        let tracker = setup();

        let first = tracker.resolve_thread("u1", "hello", "general").unwrap();
        let analysis = classify_rules("what about ppe?");
        tracker
            .record_turn(&first, "u1", "what about ppe?", "here's the ppe guidance", &analysis)
            .unwrap();

        // Immediately after, any message continues the thread
        let second = tracker.resolve_thread("u1", "hi", "general").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_silence_windows_govern_continuation() {
        let pool = init_memory().unwrap();
        let tracker =
            ConversationTracker::new(ThreadRepo::new(pool.clone()), TrackerConfig::default());

        let backdate = |thread_id: &str, age: Duration| {
            let stamp = (Utc::now() - chrono::Duration::from_std(age).unwrap()).to_rfc3339();
            pool.get()
                .unwrap()
                .execute(
                    "UPDATE conversation_threads SET last_activity = ?1 WHERE id = ?2",
                    rusqlite::params![stamp, thread_id],
                )
                .unwrap();
        };

        let first = tracker.resolve_thread("u4", "hello", "general").unwrap();

        // Ten minutes of silence stays inside the same thread
        backdate(&first, Duration::from_secs(10 * 60));
        let same = tracker.resolve_thread("u4", "hello", "general").unwrap();
        assert_eq!(first, same);

        // Three hours of silence starts a fresh one
        backdate(&first, Duration::from_secs(3 * 3600));
        let fresh = tracker.resolve_thread("u4", "hello", "general").unwrap();
        assert_ne!(first, fresh);
    }

    #[test]
    fn test_context_snapshot() {
        let tracker = setup();
        let thread = tracker.resolve_thread("u2", "hello", "general").unwrap();

        let analysis = classify_rules("thanks, that was helpful?");
        tracker
            .record_turn(&thread, "u2", "thanks, that was helpful?", "glad to help", &analysis)
            .unwrap();

        let snapshot = tracker.context("u2").unwrap();
        assert_eq!(snapshot.turn_count, 1);
        assert_eq!(snapshot.recent_turns.len(), 1);
        assert_eq!(snapshot.unresolved_questions.len(), 1);
        assert!((snapshot.memory.trust_level - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_window_is_bounded() {
        let pool = init_memory().unwrap();
        let tracker = ConversationTracker::new(
            ThreadRepo::new(pool),
            TrackerConfig {
                turn_window: 3,
                ..TrackerConfig::default()
            },
        );

        let thread = tracker.resolve_thread("u3", "hello", "general").unwrap();
        let analysis = classify_rules("message");
        for i in 0..6 {
            tracker
                .record_turn(&thread, "u3", &format!("message {i}"), "ok", &analysis)
                .unwrap();
        }

        let windows = tracker.windows.lock().unwrap();
        assert_eq!(windows.get("u3").unwrap().len(), 3);
    }
}
