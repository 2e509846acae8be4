//! `WhatsApp` channel adapter
//!
//! Uses the `WhatsApp` Business Cloud API for sending; inbound messages
//! arrive through the webhook endpoint and are normalized here.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{IncomingMessage, Transport};
use crate::db::MediaRef;
use crate::{Error, Result};

/// `WhatsApp` Business Cloud API transport
pub struct WhatsAppTransport {
    access_token: String,
    phone_number_id: String,
    client: reqwest::Client,
}

impl WhatsAppTransport {
    /// Create a new `WhatsApp` transport
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing
    pub fn new(access_token: String, phone_number_id: String, timeout: Duration) -> Result<Self> {
        if access_token.is_empty() {
            return Err(Error::Config("WhatsApp access token required".to_string()));
        }
        if phone_number_id.is_empty() {
            return Err(Error::Config(
                "WhatsApp phone number ID required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            access_token,
            phone_number_id,
            client,
        })
    }

    async fn post_message(&self, body: &serde_json::Value) -> Result<()> {
        let url = format!(
            "https://graph.facebook.com/v18.0/{}/messages",
            self.phone_number_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("WhatsApp API error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "WhatsApp API error: {status} - {body}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        self.post_message(&serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body }
        }))
        .await?;

        tracing::debug!(to, "WhatsApp text sent");
        Ok(())
    }

    async fn send_audio(&self, to: &str, audio_url: &str) -> Result<()> {
        self.post_message(&serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "audio",
            "audio": { "link": audio_url }
        }))
        .await?;

        tracing::debug!(to, "WhatsApp audio sent");
        Ok(())
    }
}

/// Normalize a Cloud API webhook payload into incoming messages
#[must_use]
pub fn parse_webhook(payload: &WhatsAppWebhook) -> Vec<IncomingMessage> {
    let mut incoming = Vec::new();

    for entry in &payload.entry {
        for change in &entry.changes {
            let Some(messages) = &change.value.messages else {
                continue;
            };

            for msg in messages {
                let mut text = msg
                    .text
                    .as_ref()
                    .map(|t| t.body.clone())
                    .unwrap_or_default();

                let mut media = Vec::new();

                if let Some(image) = &msg.image {
                    if text.is_empty() {
                        if let Some(caption) = &image.caption {
                            text.clone_from(caption);
                        }
                    }
                    media.push(media_ref(&image.id, image.mime_type.as_deref(), "image/jpeg"));
                }

                if let Some(doc) = &msg.document {
                    if text.is_empty() {
                        if let Some(caption) = &doc.caption {
                            text.clone_from(caption);
                        }
                    }
                    media.push(media_ref(
                        &doc.id,
                        doc.mime_type.as_deref(),
                        "application/octet-stream",
                    ));
                }

                if let Some(video) = &msg.video {
                    if text.is_empty() {
                        if let Some(caption) = &video.caption {
                            text.clone_from(caption);
                        }
                    }
                    media.push(media_ref(&video.id, video.mime_type.as_deref(), "video/mp4"));
                }

                if let Some(audio) = &msg.audio {
                    media.push(media_ref(&audio.id, audio.mime_type.as_deref(), "audio/ogg"));
                }

                if text.is_empty() && media.is_empty() {
                    continue;
                }

                incoming.push(IncomingMessage {
                    id: msg.id.clone(),
                    from: msg.from.clone(),
                    text,
                    media,
                });
            }
        }
    }

    incoming
}

fn media_ref(id: &str, mime: Option<&str>, default_mime: &str) -> MediaRef {
    MediaRef {
        url: format!("whatsapp://media/{id}"),
        mime_type: mime.unwrap_or(default_mime).to_string(),
        uploaded_at: Utc::now(),
    }
}

/// `WhatsApp` webhook payload from the Cloud API
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhook {
    /// Webhook entries
    pub entry: Vec<WhatsAppWebhookEntry>,
}

/// `WhatsApp` webhook entry
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhookEntry {
    /// Changes in this entry
    pub changes: Vec<WhatsAppWebhookChange>,
}

/// `WhatsApp` webhook change
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhookChange {
    /// The change value
    pub value: WhatsAppWebhookValue,
}

/// `WhatsApp` webhook value containing messages
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhookValue {
    /// Incoming messages (if any)
    pub messages: Option<Vec<WhatsAppMessage>>,
}

/// `WhatsApp` message
#[derive(Debug, Deserialize)]
pub struct WhatsAppMessage {
    /// Sender phone number
    pub from: String,
    /// Message ID
    pub id: String,
    /// Message type
    #[serde(rename = "type")]
    pub message_type: String,
    /// Text content (for text messages)
    pub text: Option<WhatsAppTextContent>,
    /// Image content
    pub image: Option<WhatsAppMedia>,
    /// Document content
    pub document: Option<WhatsAppMedia>,
    /// Audio content
    pub audio: Option<WhatsAppMedia>,
    /// Video content
    pub video: Option<WhatsAppMedia>,
}

/// `WhatsApp` media object
#[derive(Debug, Deserialize)]
pub struct WhatsAppMedia {
    /// Media ID (use to fetch URL)
    pub id: String,
    /// MIME type
    pub mime_type: Option<String>,
    /// Caption
    pub caption: Option<String>,
}

/// `WhatsApp` text message content
#[derive(Debug, Deserialize)]
pub struct WhatsAppTextContent {
    /// Message body
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook_json(messages: &str) -> WhatsAppWebhook {
        let json = format!(
            r#"{{"entry": [{{"changes": [{{"value": {{"messages": {messages}}}}}]}}]}}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_parse_text_message() {
        let payload = webhook_json(
            r#"[{"from": "5926001234", "id": "wamid.1", "type": "text",
                 "text": {"body": "hello"}}]"#,
        );

        let incoming = parse_webhook(&payload);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].from, "5926001234");
        assert_eq!(incoming[0].text, "hello");
        assert!(incoming[0].media.is_empty());
    }

    #[test]
    fn test_parse_image_with_caption() {
        let payload = webhook_json(
            r#"[{"from": "5926001234", "id": "wamid.2", "type": "image",
                 "image": {"id": "media-9", "mime_type": "image/png", "caption": "broken railing"}}]"#,
        );

        let incoming = parse_webhook(&payload);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].text, "broken railing");
        assert_eq!(incoming[0].media.len(), 1);
        assert_eq!(incoming[0].media[0].mime_type, "image/png");
        assert_eq!(incoming[0].media[0].url, "whatsapp://media/media-9");
    }

    #[test]
    fn test_parse_skips_empty_messages() {
        let payload = webhook_json(r#"[{"from": "x", "id": "wamid.3", "type": "unsupported"}]"#);
        assert!(parse_webhook(&payload).is_empty());
    }

    #[test]
    fn test_status_only_webhook_has_no_messages() {
        let payload: WhatsAppWebhook =
            serde_json::from_str(r#"{"entry": [{"changes": [{"value": {}}]}]}"#).unwrap();
        assert!(parse_webhook(&payload).is_empty());
    }
}
