//! Session repository
//!
//! Each user has at most one session row holding the conversation state and
//! a tagged JSON payload. The payload is a tagged union: every state carries
//! exactly the data shape it needs, and writing a state replaces the payload
//! wholesale, so stale fields from a previous state cannot leak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::MediaRef;
use super::{DbPool, parse_datetime};
use crate::{Error, Result};

/// Conversation state for a user session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Conversing,
    CollectingReport,
    WaitingMedia,
    WaitingLocation,
    ConfirmingReport,
    MenuNavigation,
    FaqMode,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conversing => "conversing",
            Self::CollectingReport => "collecting_report",
            Self::WaitingMedia => "waiting_media",
            Self::WaitingLocation => "waiting_location",
            Self::ConfirmingReport => "confirming_report",
            Self::MenuNavigation => "menu_navigation",
            Self::FaqMode => "faq_mode",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "collecting_report" => Self::CollectingReport,
            "waiting_media" => Self::WaitingMedia,
            "waiting_location" => Self::WaitingLocation,
            "confirming_report" => Self::ConfirmingReport,
            "menu_navigation" => Self::MenuNavigation,
            "faq_mode" => Self::FaqMode,
            _ => Self::Conversing,
        }
    }

    /// Whether this state is part of the structured report flow
    #[must_use]
    pub const fn in_report_flow(self) -> bool {
        matches!(
            self,
            Self::CollectingReport
                | Self::WaitingMedia
                | Self::WaitingLocation
                | Self::ConfirmingReport
        )
    }
}

/// An in-progress incident report draft
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportDraft {
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub location_text: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub started_at: DateTime<Utc>,
}

/// State-specific session payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionData {
    /// Free-form conversation, no structured data
    Idle,
    /// An active report draft (collecting/waiting/confirming states)
    Report(ReportDraft),
    /// Menu navigation context
    Menu { last_menu: String },
    /// FAQ browsing context
    Faq { category: Option<String> },
}

impl Default for SessionData {
    fn default() -> Self {
        Self::Idle
    }
}

/// A user session
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub state: SessionState,
    pub data: SessionData,
    pub updated_at: DateTime<Utc>,
}

/// Session repository
#[derive(Clone)]
pub struct SessionRepo {
    pool: DbPool,
}

impl SessionRepo {
    /// Create a new session repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a user's session, defaulting to a fresh conversing session
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, user_id: &str) -> Result<Session> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT state, data, updated_at FROM sessions WHERE user_id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();

        let Some((state, data, updated_at)) = row else {
            return Ok(Session {
                user_id: user_id.to_string(),
                state: SessionState::Conversing,
                data: SessionData::Idle,
                updated_at: Utc::now(),
            });
        };

        Ok(Session {
            user_id: user_id.to_string(),
            state: SessionState::parse(&state),
            data: serde_json::from_str(&data).unwrap_or_default(),
            updated_at: parse_datetime(&updated_at),
        })
    }

    /// Write a user's session state and payload
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set(&self, user_id: &str, state: SessionState, data: &SessionData) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let payload = serde_json::to_string(data)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO sessions (user_id, state, data, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET state = ?2, data = ?3, updated_at = ?4",
            rusqlite::params![user_id, state.as_str(), payload, now],
        )?;

        Ok(())
    }

    /// Reset a user's session to free-form conversation
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn reset(&self, user_id: &str) -> Result<()> {
        self.set(user_id, SessionState::Conversing, &SessionData::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> SessionRepo {
        let pool = init_memory().unwrap();
        SessionRepo::new(pool)
    }

    #[test]
    fn test_missing_session_defaults_to_conversing() {
        let repo = setup();
        let session = repo.get("nobody").unwrap();
        assert_eq!(session.state, SessionState::Conversing);
        assert!(matches!(session.data, SessionData::Idle));
    }

    #[test]
    fn test_report_draft_round_trip() {
        let repo = setup();

        let draft = ReportDraft {
            media: vec![MediaRef {
                url: "https://media.example.com/1.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                uploaded_at: Utc::now(),
            }],
            location_text: Some("warehouse 3".to_string()),
            latitude: Some(6.8),
            longitude: Some(-58.1),
            started_at: Utc::now(),
        };

        repo.set("u1", SessionState::WaitingLocation, &SessionData::Report(draft))
            .unwrap();

        let session = repo.get("u1").unwrap();
        assert_eq!(session.state, SessionState::WaitingLocation);
        let SessionData::Report(restored) = session.data else {
            panic!("expected report payload");
        };
        assert_eq!(restored.media.len(), 1);
        assert_eq!(restored.location_text.as_deref(), Some("warehouse 3"));
    }

    #[test]
    fn test_state_write_replaces_payload() {
        let repo = setup();

        repo.set(
            "u2",
            SessionState::WaitingMedia,
            &SessionData::Report(ReportDraft {
                started_at: Utc::now(),
                ..ReportDraft::default()
            }),
        )
        .unwrap();

        repo.set(
            "u2",
            SessionState::FaqMode,
            &SessionData::Faq { category: None },
        )
        .unwrap();

        let session = repo.get("u2").unwrap();
        assert_eq!(session.state, SessionState::FaqMode);
        assert!(matches!(session.data, SessionData::Faq { .. }));
    }

    #[test]
    fn test_reset() {
        let repo = setup();
        repo.set(
            "u3",
            SessionState::MenuNavigation,
            &SessionData::Menu {
                last_menu: "main".to_string(),
            },
        )
        .unwrap();

        repo.reset("u3").unwrap();
        let session = repo.get("u3").unwrap();
        assert_eq!(session.state, SessionState::Conversing);
    }
}
