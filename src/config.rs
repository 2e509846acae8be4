//! Gateway configuration
//!
//! Configuration is assembled from environment variables with an optional
//! TOML file overlay. All file fields are optional — the file is a partial
//! overlay on top of built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::{Error, Result};

/// Default delay between the text message and its audio companion
pub const DEFAULT_AUDIO_DELAY_SECS: u64 = 2;

/// Default maximum age of cached audio artifacts before the janitor
/// removes them
pub const DEFAULT_AUDIO_MAX_AGE_HOURS: u64 = 24;

/// Runtime configuration for the gateway
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Directory for the database and audio artifacts
    pub data_dir: PathBuf,
    /// Directory where synthesized audio files are written
    pub audio_dir: PathBuf,
    /// Public base URL used to build audio links sent over the channel
    pub public_base_url: String,
    /// WhatsApp Business Cloud API settings
    pub whatsapp: WhatsAppConfig,
    /// OpenAI API key (chat + premium TTS); optional
    pub openai_api_key: Option<String>,
    /// ElevenLabs API key (primary TTS engine); optional
    pub elevenlabs_api_key: Option<String>,
    /// ElevenLabs voice IDs by gender
    pub elevenlabs_voice_female: String,
    pub elevenlabs_voice_male: String,
    /// Base URL of a local offline synthesis server; optional
    pub local_tts_url: Option<String>,
    /// Chat model identifier
    pub llm_model: String,
    /// Max tokens per chat completion
    pub llm_max_tokens: u32,
    /// Incident management backend
    pub backend: BackendConfig,
    /// Audio artifact max age before janitor cleanup
    pub audio_max_age: Duration,
    /// Timeout applied to outbound collaborator requests
    pub request_timeout: Duration,
}

/// WhatsApp Business Cloud API settings
#[derive(Debug, Clone, Default)]
pub struct WhatsAppConfig {
    /// Access token for the Graph API
    pub access_token: String,
    /// Phone number ID registered with WhatsApp Business
    pub phone_number_id: String,
    /// Token expected during webhook verification handshakes
    pub verify_token: String,
}

/// Incident management backend settings
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Base URL of the backend API; empty disables submission
    pub base_url: String,
    /// Bearer token for backend requests
    pub api_token: String,
}

impl Config {
    /// Load configuration from the environment with an optional TOML overlay
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be resolved or the config
    /// file fails to parse
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let file = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<ConfigFile>(&content)?
            }
            None => Self::default_config_file()
                .filter(|p| p.exists())
                .and_then(|p| std::fs::read_to_string(p).ok())
                .map(|content| toml::from_str::<ConfigFile>(&content))
                .transpose()?
                .unwrap_or_default(),
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| env_var("ARIA_DATA_DIR").map(PathBuf::from))
            .or_else(|| {
                ProjectDirs::from("dev", "aria", "aria-gateway")
                    .map(|dirs| dirs.data_dir().to_path_buf())
            })
            .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?;

        std::fs::create_dir_all(&data_dir)?;
        let audio_dir = data_dir.join("audio");
        std::fs::create_dir_all(&audio_dir)?;

        let port = file
            .port
            .or_else(|| env_var("ARIA_PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(8080);

        let public_base_url = file
            .public_base_url
            .or_else(|| env_var("ARIA_PUBLIC_BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let whatsapp = WhatsAppConfig {
            access_token: file
                .whatsapp
                .access_token
                .or_else(|| env_var("WHATSAPP_ACCESS_TOKEN"))
                .unwrap_or_default(),
            phone_number_id: file
                .whatsapp
                .phone_number_id
                .or_else(|| env_var("WHATSAPP_PHONE_NUMBER_ID"))
                .unwrap_or_default(),
            verify_token: file
                .whatsapp
                .verify_token
                .or_else(|| env_var("WHATSAPP_VERIFY_TOKEN"))
                .unwrap_or_default(),
        };

        let backend = BackendConfig {
            base_url: file
                .backend
                .base_url
                .or_else(|| env_var("INCIDENT_BACKEND_URL"))
                .unwrap_or_default(),
            api_token: file
                .backend
                .api_token
                .or_else(|| env_var("INCIDENT_BACKEND_TOKEN"))
                .unwrap_or_default(),
        };

        let audio_max_age_hours = file
            .audio_max_age_hours
            .or_else(|| env_var("ARIA_AUDIO_MAX_AGE_HOURS").and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_AUDIO_MAX_AGE_HOURS);

        Ok(Self {
            port,
            audio_dir,
            data_dir,
            public_base_url,
            whatsapp,
            openai_api_key: file.api_keys.openai.or_else(|| env_var("OPENAI_API_KEY")),
            elevenlabs_api_key: file
                .api_keys
                .elevenlabs
                .or_else(|| env_var("ELEVENLABS_API_KEY")),
            elevenlabs_voice_female: file
                .voice
                .elevenlabs_voice_female
                .unwrap_or_else(|| "EXAVITQu4vr4xnSDxMaL".to_string()),
            elevenlabs_voice_male: file
                .voice
                .elevenlabs_voice_male
                .unwrap_or_else(|| "pNInz6obpgDQGcFmaJgB".to_string()),
            local_tts_url: file.voice.local_tts_url.or_else(|| env_var("LOCAL_TTS_URL")),
            llm_model: file
                .llm
                .model
                .or_else(|| env_var("ARIA_LLM_MODEL"))
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            llm_max_tokens: file.llm.max_tokens.unwrap_or(600),
            backend,
            audio_max_age: Duration::from_secs(audio_max_age_hours * 3600),
            request_timeout: Duration::from_secs(file.request_timeout_secs.unwrap_or(15)),
        })
    }

    /// Path to the SQLite database file
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("aria.db")
    }

    fn default_config_file() -> Option<PathBuf> {
        ProjectDirs::from("dev", "aria", "aria-gateway")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    port: Option<u16>,
    data_dir: Option<String>,
    public_base_url: Option<String>,
    audio_max_age_hours: Option<u64>,
    request_timeout_secs: Option<u64>,

    #[serde(default)]
    whatsapp: WhatsAppFileConfig,

    #[serde(default)]
    llm: LlmFileConfig,

    #[serde(default)]
    voice: VoiceFileConfig,

    #[serde(default)]
    api_keys: ApiKeysFileConfig,

    #[serde(default)]
    backend: BackendFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppFileConfig {
    access_token: Option<String>,
    phone_number_id: Option<String>,
    verify_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmFileConfig {
    model: Option<String>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceFileConfig {
    elevenlabs_voice_female: Option<String>,
    elevenlabs_voice_male: Option<String>,
    local_tts_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiKeysFileConfig {
    openai: Option<String>,
    elevenlabs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendFileConfig {
    base_url: Option<String>,
    api_token: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
