//! Speech synthesis engines
//!
//! Three engines share the [`SpeechEngine`] trait: a hosted high-quality
//! engine (ElevenLabs), a local offline server, and the OpenAI speech API.
//! The gateway chains them; an engine failure just moves on to the next.

use std::time::Duration;

use async_trait::async_trait;

use crate::db::{MessagingPrefs, VoiceGender};
use crate::{Error, Result};

/// A single synthesis engine
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine label used in logs and analytics
    fn name(&self) -> &'static str;

    /// Whether this engine works without internet access
    fn offline(&self) -> bool {
        false
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, prefs: &MessagingPrefs) -> Result<Vec<u8>>;
}

/// Map a words-per-minute preference onto an engine speed multiplier
///
/// 150 WPM is the neutral rate.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn speed_multiplier(wpm: u32) -> f32 {
    (wpm as f32 / 150.0).clamp(0.5, 2.0)
}

/// ElevenLabs hosted synthesis
pub struct ElevenLabsEngine {
    client: reqwest::Client,
    api_key: String,
    voice_female: String,
    voice_male: String,
    model: String,
}

impl ElevenLabsEngine {
    /// Create a new ElevenLabs engine
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        api_key: String,
        voice_female: String,
        voice_male: String,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("ElevenLabs API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            voice_female,
            voice_male,
            model: "eleven_monolingual_v1".to_string(),
        })
    }
}

#[async_trait]
impl SpeechEngine for ElevenLabsEngine {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, prefs: &MessagingPrefs) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let voice = match prefs.voice_gender {
            VoiceGender::Female => &self.voice_female,
            VoiceGender::Male => &self.voice_male,
        };

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{voice}");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&ElevenLabsRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

/// Local offline synthesis server (piper-compatible HTTP endpoint)
pub struct LocalEngine {
    client: reqwest::Client,
    base_url: String,
}

impl LocalEngine {
    /// Create a new local engine
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is missing
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::Config("local TTS URL required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechEngine for LocalEngine {
    fn name(&self) -> &'static str {
        "local"
    }

    fn offline(&self) -> bool {
        true
    }

    async fn synthesize(&self, text: &str, prefs: &MessagingPrefs) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct LocalRequest<'a> {
            text: &'a str,
            voice: &'a str,
            length_scale: f32,
        }

        let voice = match prefs.voice_gender {
            VoiceGender::Female => "female",
            VoiceGender::Male => "male",
        };

        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&LocalRequest {
                text,
                voice,
                // Inverse of speed: a faster rate shortens phoneme length
                length_scale: 1.0 / speed_multiplier(prefs.speech_rate_wpm),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Tts(format!("local TTS error {status}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

/// OpenAI speech API
pub struct OpenAiEngine {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiEngine {
    /// Create a new OpenAI engine
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: "tts-1".to_string(),
        })
    }
}

#[async_trait]
impl SpeechEngine for OpenAiEngine {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, prefs: &MessagingPrefs) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let voice = match prefs.voice_gender {
            VoiceGender::Female => "nova",
            VoiceGender::Male => "onyx",
        };

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: speed_multiplier(prefs.speech_rate_wpm),
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}
