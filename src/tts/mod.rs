//! Speech synthesis gateway
//!
//! Front door for all audio generation: normalizes and truncates text,
//! consults the artifact cache, then walks the engine chain. Total engine
//! failure yields no audio rather than an error — the text message always
//! stands on its own.

pub mod cache;
pub mod engines;
pub mod normalize;

use std::sync::Arc;
use std::time::Instant;

pub use cache::{CacheEntry, SpeechCache, content_key};
pub use engines::{ElevenLabsEngine, LocalEngine, OpenAiEngine, SpeechEngine, speed_multiplier};
pub use normalize::{SPEECH_CHAR_LIMIT, normalize_for_speech, truncate_for_speech};

use crate::db::{AnalyticsRepo, MessagingPrefs, SynthesisRecord};

/// Synthesis priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    /// Emergency audio prefers the offline engine for resilience
    Emergency,
}

/// Reference to a synthesized audio artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle {
    pub filename: String,
}

impl AudioHandle {
    /// Public URL for the artifact
    #[must_use]
    pub fn url(&self, base: &str) -> String {
        format!("{}/audio/{}", base.trim_end_matches('/'), self.filename)
    }
}

/// Canonical phrases pre-generated at startup
pub const CANONICAL_PHRASES: [(&str, &str); 8] = [
    (
        "welcome",
        "Hello! I'm Aria, your workplace safety assistant. How can I help you today?",
    ),
    (
        "menu",
        "You can say REPORT to report an incident, FAQ for safety information, \
         EMERGENCY for emergency contacts, or just ask me anything.",
    ),
    (
        "emergency_fire",
        "Fire emergency. Evacuate immediately using the nearest exit. \
         Call 912 for the fire service. Do not use elevators.",
    ),
    (
        "emergency_medical",
        "Medical emergency. Call 913 for an ambulance now. \
         Do not move an injured person unless they are in immediate danger.",
    ),
    (
        "emergency_general",
        "Emergency detected. Call 911 now. Move to a safe location and \
         alert the people around you.",
    ),
    ("voice_enabled", "Voice messages are now enabled."),
    ("voice_disabled", "Voice messages are now disabled."),
    (
        "report_submitted",
        "Your incident report has been submitted. Thank you for keeping the workplace safe.",
    ),
];

/// Speech synthesis gateway
pub struct SpeechGateway {
    engines: Vec<Arc<dyn SpeechEngine>>,
    cache: SpeechCache,
    analytics: AnalyticsRepo,
}

impl SpeechGateway {
    /// Create a gateway with engines in normal-precedence order
    #[must_use]
    pub fn new(
        engines: Vec<Arc<dyn SpeechEngine>>,
        cache: SpeechCache,
        analytics: AnalyticsRepo,
    ) -> Self {
        Self {
            engines,
            cache,
            analytics,
        }
    }

    /// The artifact cache
    #[must_use]
    pub const fn cache(&self) -> &SpeechCache {
        &self.cache
    }

    /// Whether any engine is configured
    #[must_use]
    pub fn available(&self) -> bool {
        !self.engines.is_empty()
    }

    /// Synthesize text to an audio artifact
    ///
    /// Returns `None` when no engine is configured, the normalized text is
    /// empty, or every engine fails.
    pub async fn synthesize(
        &self,
        text: &str,
        prefs: &MessagingPrefs,
        priority: Priority,
    ) -> Option<AudioHandle> {
        let speakable = truncate_for_speech(&normalize_for_speech(text));
        if speakable.is_empty() || self.engines.is_empty() {
            return None;
        }

        let key = content_key(&speakable, prefs);
        self.synthesize_keyed(&key, &speakable, prefs, priority).await
    }

    /// Look up a pre-generated canonical phrase artifact
    pub async fn canonical(&self, phrase_id: &str) -> Option<AudioHandle> {
        self.cache
            .get(&format!("phrase-{phrase_id}"))
            .await
            .map(|entry| AudioHandle {
                filename: entry.filename,
            })
    }

    /// Pre-generate the canonical phrase set
    ///
    /// Failures are logged and skipped; a missing canonical artifact only
    /// means that phrase falls back to dynamic synthesis later.
    pub async fn prewarm(&self) {
        let prefs = MessagingPrefs::default();

        for (id, text) in CANONICAL_PHRASES {
            let key = format!("phrase-{id}");
            if self.cache.get(&key).await.is_some() {
                continue;
            }

            let speakable = normalize_for_speech(text);
            let priority = if id.starts_with("emergency") {
                Priority::Emergency
            } else {
                Priority::Normal
            };

            if self
                .synthesize_keyed(&key, &speakable, &prefs, priority)
                .await
                .is_none()
            {
                tracing::warn!(phrase = id, "failed to prewarm canonical phrase");
            }
        }

        tracing::info!(cached = self.cache.len().await, "speech cache prewarmed");
    }

    async fn synthesize_keyed(
        &self,
        key: &str,
        text: &str,
        prefs: &MessagingPrefs,
        priority: Priority,
    ) -> Option<AudioHandle> {
        if let Some(entry) = self.cache.get(key).await {
            self.log(&entry.engine, text.len(), entry.bytes, 0, true);
            return Some(AudioHandle {
                filename: entry.filename,
            });
        }

        for engine in self.chain(priority) {
            let started = Instant::now();
            match engine.synthesize(text, prefs).await {
                Ok(audio) if !audio.is_empty() => {
                    let latency_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                    match self.cache.put(key, &audio, engine.name(), latency_ms).await {
                        Ok(entry) => {
                            self.log(engine.name(), text.len(), audio.len(), latency_ms, false);
                            tracing::debug!(
                                engine = engine.name(),
                                bytes = audio.len(),
                                latency_ms,
                                "synthesized audio"
                            );
                            return Some(AudioHandle {
                                filename: entry.filename,
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to store audio artifact");
                            return None;
                        }
                    }
                }
                Ok(_) => {
                    tracing::warn!(engine = engine.name(), "engine returned empty audio");
                }
                Err(e) => {
                    tracing::warn!(engine = engine.name(), error = %e, "engine failed, trying next");
                }
            }
        }

        tracing::warn!("all synthesis engines failed");
        None
    }

    /// Engine order for a given priority
    fn chain(&self, priority: Priority) -> Vec<Arc<dyn SpeechEngine>> {
        match priority {
            Priority::Normal => self.engines.clone(),
            Priority::Emergency => {
                let (offline, online): (Vec<_>, Vec<_>) = self
                    .engines
                    .iter()
                    .cloned()
                    .partition(|e| e.offline());
                offline.into_iter().chain(online).collect()
            }
        }
    }

    fn log(&self, engine: &str, text_len: usize, bytes: usize, latency_ms: u64, cache_hit: bool) {
        let record = SynthesisRecord {
            engine: engine.to_string(),
            text_len,
            bytes,
            latency_ms,
            cache_hit,
        };
        if let Err(e) = self.analytics.log_synthesis(&record) {
            tracing::debug!(error = %e, "failed to log synthesis record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEngine {
        label: &'static str,
        offline: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FixedEngine {
        fn ok(label: &'static str, offline: bool) -> Arc<Self> {
            Arc::new(Self {
                label,
                offline,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(label: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                offline: false,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpeechEngine for FixedEngine {
        fn name(&self) -> &'static str {
            self.label
        }

        fn offline(&self) -> bool {
            self.offline
        }

        async fn synthesize(&self, _text: &str, _prefs: &MessagingPrefs) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Tts("unavailable".to_string()))
            } else {
                Ok(format!("audio-from-{}", self.label).into_bytes())
            }
        }
    }

    fn gateway(engines: Vec<Arc<dyn SpeechEngine>>) -> (SpeechGateway, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let analytics = AnalyticsRepo::new(init_memory().unwrap());
        let cache = SpeechCache::new(dir.path().to_path_buf());
        (SpeechGateway::new(engines, cache, analytics), dir)
    }

    #[tokio::test]
    async fn test_chain_falls_through_on_failure() {
        let failing = FixedEngine::failing("primary");
        let working = FixedEngine::ok("secondary", false);
        let (gw, _dir) = gateway(vec![failing.clone(), working.clone()]);

        let handle = gw
            .synthesize("wear your helmet", &MessagingPrefs::default(), Priority::Normal)
            .await;
        assert!(handle.is_some());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emergency_priority_prefers_offline() {
        let online = FixedEngine::ok("online", false);
        let offline = FixedEngine::ok("offline", true);
        let (gw, _dir) = gateway(vec![online.clone(), offline.clone()]);

        gw.synthesize("fire drill", &MessagingPrefs::default(), Priority::Emergency)
            .await
            .unwrap();

        assert_eq!(offline.calls.load(Ordering::SeqCst), 1);
        assert_eq!(online.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_engines() {
        let engine = FixedEngine::ok("only", false);
        let (gw, _dir) = gateway(vec![engine.clone()]);
        let prefs = MessagingPrefs::default();

        let first = gw
            .synthesize("repeat after me", &prefs, Priority::Normal)
            .await
            .unwrap();
        let second = gw
            .synthesize("repeat after me", &prefs, Priority::Normal)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_engines_failing_yields_none() {
        let (gw, _dir) = gateway(vec![FixedEngine::failing("a"), FixedEngine::failing("b")]);
        let handle = gw
            .synthesize("anything", &MessagingPrefs::default(), Priority::Normal)
            .await;
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_prewarm_and_canonical_lookup() {
        let (gw, _dir) = gateway(vec![FixedEngine::ok("only", false)]);
        gw.prewarm().await;

        assert!(gw.canonical("emergency_fire").await.is_some());
        assert!(gw.canonical("welcome").await.is_some());
        assert!(gw.canonical("nonexistent").await.is_none());
    }

    #[test]
    fn test_audio_handle_url() {
        let handle = AudioHandle {
            filename: "abc.mp3".to_string(),
        };
        assert_eq!(
            handle.url("http://localhost:8080/"),
            "http://localhost:8080/audio/abc.mp3"
        );
    }
}
