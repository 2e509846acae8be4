//! Dual-delivery scheduler
//!
//! Text goes out immediately and is the only awaited step. The audio
//! companion is handed to a detached task that sleeps out the configured
//! delay before sending, so the primary reply path never depends on the
//! secondary channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::channels::Transport;
use crate::db::{AnalyticsRepo, DeliveryRecord, MessagingPrefs};
use crate::tts::AudioHandle;

const AUDIO_FALLBACK_NOTICE: &str =
    "(A voice version of this message was generated but couldn't be delivered. \
     Say 'voice off' if you'd prefer text only.)";

/// A reply ready for delivery
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub audio: Option<AudioHandle>,
}

impl Reply {
    /// A text-only reply
    #[must_use]
    pub const fn text_only(text: String) -> Self {
        Self { text, audio: None }
    }
}

/// Dual-delivery scheduler
pub struct DeliveryScheduler {
    transport: Arc<dyn Transport>,
    analytics: AnalyticsRepo,
    public_base_url: String,
    audio_dir: PathBuf,
}

impl DeliveryScheduler {
    /// Create a new scheduler
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        analytics: AnalyticsRepo,
        public_base_url: String,
        audio_dir: PathBuf,
    ) -> Self {
        Self {
            transport,
            analytics,
            public_base_url,
            audio_dir,
        }
    }

    /// Deliver a reply: text now, audio on a delayed background task
    ///
    /// # Errors
    ///
    /// Returns error only if the primary text send fails
    pub async fn deliver(&self, to: &str, reply: Reply, prefs: &MessagingPrefs) -> Result<()> {
        self.transport.send_text(to, &reply.text).await?;

        // The artifact may have been swept between synthesis and delivery
        let audio = reply
            .audio
            .filter(|_| prefs.audio_enabled && prefs.dual_messaging_enabled)
            .filter(|handle| self.audio_dir.join(&handle.filename).exists());

        let Some(handle) = audio else {
            self.log(to, reply.text.len(), false, false, 0, None);
            return Ok(());
        };

        let delay = Duration::from_secs(prefs.audio_delay_secs);
        let url = handle.url(&self.public_base_url);
        let transport = Arc::clone(&self.transport);
        let analytics = self.analytics.clone();
        let to = to.to_string();
        let message_len = reply.text.len();
        let delay_secs = prefs.audio_delay_secs;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let outcome = transport.send_audio(&to, &url).await;
            let (voice_sent, error) = match outcome {
                Ok(()) => {
                    tracing::debug!(to, "audio companion delivered");
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(to, error = %e, "audio delivery failed");
                    // Best-effort notice; a failure here is swallowed
                    if let Err(notice_err) =
                        transport.send_text(&to, AUDIO_FALLBACK_NOTICE).await
                    {
                        tracing::debug!(to, error = %notice_err, "fallback notice failed");
                    }
                    (false, Some(e.to_string()))
                }
            };

            let record = DeliveryRecord {
                user_id: to,
                message_len,
                text_sent: true,
                voice_scheduled: true,
                voice_sent,
                delay_secs,
                error,
            };
            if let Err(e) = analytics.log_delivery(&record) {
                tracing::debug!(error = %e, "failed to log delivery record");
            }
        });

        Ok(())
    }

    fn log(
        &self,
        to: &str,
        message_len: usize,
        voice_scheduled: bool,
        voice_sent: bool,
        delay_secs: u64,
        error: Option<String>,
    ) {
        let record = DeliveryRecord {
            user_id: to.to_string(),
            message_len,
            text_sent: true,
            voice_scheduled,
            voice_sent,
            delay_secs,
            error,
        };
        if let Err(e) = self.analytics.log_delivery(&record) {
            tracing::debug!(error = %e, "failed to log delivery record");
        }
    }
}
