//! Shared test fixtures: stub collaborators and a fully wired bot

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use aria_gateway::backend::{BackendReport, ReportBackend, ReportSubmission};
use aria_gateway::bot::{Bot, ReportFlow};
use aria_gateway::channels::Transport;
use aria_gateway::db::{
    self, AnalyticsRepo, DbPool, MediaRef, MessagingPrefs, ProfileRepo, ReportRepo, SessionRepo,
    ThreadRepo,
};
use aria_gateway::delivery::DeliveryScheduler;
use aria_gateway::intent::IntentClassifier;
use aria_gateway::llm::ChatModel;
use aria_gateway::responder::Responder;
use aria_gateway::tracker::{ConversationTracker, TrackerConfig};
use aria_gateway::tts::{SpeechCache, SpeechEngine, SpeechGateway};
use aria_gateway::{Error, Result};

/// Chat model returning a fixed reply
pub struct StubModel {
    pub reply: String,
}

#[async_trait]
impl ChatModel for StubModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// Incident backend with a switchable failure mode
#[derive(Default)]
pub struct StubBackend {
    pub fail: AtomicBool,
    pub submissions: AtomicUsize,
}

#[async_trait]
impl ReportBackend for StubBackend {
    async fn submit_report(&self, _submission: &ReportSubmission) -> Result<BackendReport> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Backend("backend down".to_string()));
        }
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(BackendReport {
            id: format!("HSSE-{}", 2000 + n),
        })
    }

    async fn submit_media(&self, _report_id: &str, _media: &MediaRef) -> Result<()> {
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Backend("backend down".to_string()));
        }
        Ok(())
    }
}

/// Transport that records sends in memory
#[derive(Default)]
pub struct RecordingTransport {
    pub texts: Mutex<Vec<(String, String)>>,
    pub audio: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        self.texts
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }

    async fn send_audio(&self, to: &str, audio_url: &str) -> Result<()> {
        self.audio
            .lock()
            .unwrap()
            .push((to.to_string(), audio_url.to_string()));
        Ok(())
    }
}

/// Synthesis engine producing deterministic bytes
pub struct StubEngine;

#[async_trait]
impl SpeechEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn offline(&self) -> bool {
        true
    }

    async fn synthesize(&self, text: &str, _prefs: &MessagingPrefs) -> Result<Vec<u8>> {
        Ok(format!("mp3:{text}").into_bytes())
    }
}

/// A fully wired bot over an in-memory database
pub struct TestBot {
    pub bot: Arc<Bot>,
    pub pool: DbPool,
    pub profiles: ProfileRepo,
    pub sessions: SessionRepo,
    pub reports: ReportRepo,
    pub analytics: AnalyticsRepo,
    pub speech: Arc<SpeechGateway>,
    pub backend: Arc<StubBackend>,
    pub audio_dir: TempDir,
}

/// Build a bot with stub collaborators and a prewarmed speech cache
pub async fn build_bot(model_reply: Option<&str>) -> TestBot {
    let pool = db::init_memory().unwrap();
    let profiles = ProfileRepo::new(pool.clone());
    let sessions = SessionRepo::new(pool.clone());
    let reports = ReportRepo::new(pool.clone());
    let analytics = AnalyticsRepo::new(pool.clone());

    let audio_dir = tempfile::tempdir().unwrap();
    let speech = Arc::new(SpeechGateway::new(
        vec![Arc::new(StubEngine)],
        SpeechCache::new(audio_dir.path().to_path_buf()),
        analytics.clone(),
    ));
    speech.prewarm().await;

    let backend = Arc::new(StubBackend::default());

    let model: Option<Arc<dyn ChatModel>> = model_reply.map(|reply| {
        Arc::new(StubModel {
            reply: reply.to_string(),
        }) as Arc<dyn ChatModel>
    });

    let bot = Arc::new(Bot::new(
        profiles.clone(),
        sessions.clone(),
        reports.clone(),
        ConversationTracker::new(ThreadRepo::new(pool.clone()), TrackerConfig::default()),
        IntentClassifier::new(model.clone()),
        Responder::new(model, std::time::Duration::from_secs(5)),
        Arc::clone(&speech),
        ReportFlow::new(
            sessions.clone(),
            reports.clone(),
            Arc::clone(&backend) as Arc<dyn ReportBackend>,
        ),
    ));

    TestBot {
        bot,
        pool,
        profiles,
        sessions,
        reports,
        analytics,
        speech,
        backend,
        audio_dir,
    }
}

/// A delivery scheduler backed by a recording transport
pub fn build_scheduler(
    analytics: AnalyticsRepo,
    audio_dir: std::path::PathBuf,
) -> (Arc<DeliveryScheduler>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let scheduler = Arc::new(DeliveryScheduler::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        analytics,
        "http://localhost:8080".to_string(),
        audio_dir,
    ));
    (scheduler, transport)
}

/// Image attachment fixture
pub fn attachment() -> MediaRef {
    MediaRef {
        url: "whatsapp://media/test-1".to_string(),
        mime_type: "image/jpeg".to_string(),
        uploaded_at: chrono::Utc::now(),
    }
}
