//! Messaging channel adapters

pub mod whatsapp;

use async_trait::async_trait;

pub use whatsapp::{WhatsAppTransport, WhatsAppWebhook, parse_webhook};

use crate::Result;
use crate::db::MediaRef;

/// An inbound message normalized from a channel webhook
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel-assigned message ID
    pub id: String,
    /// Sender identifier (phone number for WhatsApp)
    pub from: String,
    /// Text content, possibly taken from a media caption
    pub text: String,
    /// Attached media references
    pub media: Vec<MediaRef>,
}

/// Outbound messaging transport
///
/// Text and media sends are independent operations: the dual-delivery
/// scheduler awaits the first and schedules the second.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Channel label used in logs
    fn name(&self) -> &'static str;

    /// Send a text message
    ///
    /// # Errors
    ///
    /// Returns error if the channel API rejects the send
    async fn send_text(&self, to: &str, body: &str) -> Result<()>;

    /// Send an audio message by public URL
    ///
    /// # Errors
    ///
    /// Returns error if the channel API rejects the send
    async fn send_audio(&self, to: &str, audio_url: &str) -> Result<()>;
}
