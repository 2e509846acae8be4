//! Application wiring and lifecycle
//!
//! Builds every collaborator from configuration, pre-warms the speech
//! cache, runs the hourly janitor, and serves the HTTP API until ctrl-c.
//! The janitor task handle is owned here and aborted on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::api::{ApiServer, ApiState};
use crate::backend::{HttpReportBackend, ReportBackend};
use crate::bot::{Bot, ReportFlow};
use crate::channels::{Transport, WhatsAppTransport};
use crate::config::Config;
use crate::db::{AnalyticsRepo, ProfileRepo, ReportRepo, SessionRepo, ThreadRepo};
use crate::delivery::DeliveryScheduler;
use crate::intent::IntentClassifier;
use crate::llm::{ChatModel, OpenAiChat};
use crate::responder::Responder;
use crate::tracker::{ConversationTracker, TrackerConfig};
use crate::tts::{ElevenLabsEngine, LocalEngine, OpenAiEngine, SpeechCache, SpeechEngine, SpeechGateway};
use crate::{Error, Result};

const JANITOR_INTERVAL: Duration = Duration::from_secs(3600);

/// The assembled application
pub struct App {
    state: Arc<ApiState>,
    port: u16,
    janitor: JoinHandle<()>,
}

impl App {
    /// Build the application from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a required collaborator cannot be constructed
    pub async fn build(config: Config) -> Result<Self> {
        let pool = crate::db::init(config.db_path())?;

        let profiles = ProfileRepo::new(pool.clone());
        let sessions = SessionRepo::new(pool.clone());
        let reports = ReportRepo::new(pool.clone());
        let threads = ThreadRepo::new(pool.clone());
        let analytics = AnalyticsRepo::new(pool.clone());

        let model = chat_model(&config);
        let classifier = IntentClassifier::new(model.clone());
        let responder = Responder::new(model, config.request_timeout);

        let backend: Arc<dyn ReportBackend> = Arc::new(HttpReportBackend::new(
            config.backend.base_url.clone(),
            config.backend.api_token.clone(),
            config.request_timeout,
        )?);

        let speech = Arc::new(SpeechGateway::new(
            speech_engines(&config),
            SpeechCache::new(config.audio_dir.clone()),
            analytics.clone(),
        ));
        if speech.available() {
            speech.prewarm().await;
        } else {
            tracing::warn!("no speech engine configured, replies will be text only");
        }

        let transport: Arc<dyn Transport> = Arc::new(WhatsAppTransport::new(
            config.whatsapp.access_token.clone(),
            config.whatsapp.phone_number_id.clone(),
            config.request_timeout,
        )?);

        let scheduler = Arc::new(DeliveryScheduler::new(
            transport,
            analytics.clone(),
            config.public_base_url.clone(),
            config.audio_dir.clone(),
        ));

        let tracker = ConversationTracker::new(threads, TrackerConfig::default());

        let bot = Arc::new(Bot::new(
            profiles.clone(),
            sessions.clone(),
            reports.clone(),
            tracker,
            classifier,
            responder,
            Arc::clone(&speech),
            ReportFlow::new(sessions.clone(), reports.clone(), Arc::clone(&backend)),
        ));

        let janitor = spawn_janitor(
            Arc::clone(&speech),
            ReportFlow::new(sessions, reports, Arc::clone(&backend)),
            config.audio_max_age,
        );

        let state = Arc::new(ApiState {
            db: pool,
            bot,
            scheduler,
            profiles,
            analytics,
            speech,
            backend,
            verify_token: config.whatsapp.verify_token.clone(),
            audio_dir: config.audio_dir.clone(),
        });

        Ok(Self {
            state,
            port: config.port,
            janitor,
        })
    }

    /// Serve the HTTP API until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "gateway listening");

        let router = ApiServer::router(Arc::clone(&self.state));
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            })
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        self.janitor.abort();
        tracing::info!("gateway stopped");
        Ok(())
    }

    /// Shared API state (for embedding the router in tests or other servers)
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }
}

/// Build the chat model when an API key is configured
fn chat_model(config: &Config) -> Option<Arc<dyn ChatModel>> {
    let key = config.openai_api_key.clone()?;
    match OpenAiChat::new(
        key,
        config.llm_model.clone(),
        config.llm_max_tokens,
        config.request_timeout,
    ) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            tracing::warn!(error = %e, "chat model unavailable, using rule-based replies");
            None
        }
    }
}

/// Assemble the engine chain in precedence order
#[must_use]
pub fn speech_engines(config: &Config) -> Vec<Arc<dyn SpeechEngine>> {
    let mut engines: Vec<Arc<dyn SpeechEngine>> = Vec::new();

    if let Some(key) = &config.elevenlabs_api_key {
        match ElevenLabsEngine::new(
            key.clone(),
            config.elevenlabs_voice_female.clone(),
            config.elevenlabs_voice_male.clone(),
            config.request_timeout,
        ) {
            Ok(engine) => engines.push(Arc::new(engine)),
            Err(e) => tracing::warn!(error = %e, "elevenlabs engine disabled"),
        }
    }

    if let Some(url) = &config.local_tts_url {
        match LocalEngine::new(url.clone(), config.request_timeout) {
            Ok(engine) => engines.push(Arc::new(engine)),
            Err(e) => tracing::warn!(error = %e, "local engine disabled"),
        }
    }

    if let Some(key) = &config.openai_api_key {
        match OpenAiEngine::new(key.clone(), config.request_timeout) {
            Ok(engine) => engines.push(Arc::new(engine)),
            Err(e) => tracing::warn!(error = %e, "openai engine disabled"),
        }
    }

    tracing::info!(engines = engines.len(), "speech engine chain assembled");
    engines
}

/// Hourly maintenance: expired audio cleanup and backup report retries
fn spawn_janitor(
    speech: Arc<SpeechGateway>,
    flow: ReportFlow,
    audio_max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(JANITOR_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so startup stays fast
        interval.tick().await;

        loop {
            interval.tick().await;

            let removed = speech.cache().sweep(audio_max_age).await;
            if removed > 0 {
                tracing::info!(removed, "swept expired audio artifacts");
            }

            match flow.retry_pending().await {
                Ok(0) => {}
                Ok(forwarded) => {
                    tracing::info!(forwarded, "forwarded backup reports");
                }
                Err(e) => tracing::warn!(error = %e, "backup report retry failed"),
            }
        }
    })
}
