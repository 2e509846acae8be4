//! User profile repository
//!
//! Profiles carry a versioned JSON preference blob. Fields absent from an
//! older stored blob deserialize to their defaults, so preference rows never
//! need column-level migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DbPool, parse_datetime};
use crate::{Error, Result};

/// Minimum configurable speech rate in words per minute
pub const MIN_SPEECH_RATE: u32 = 100;

/// Maximum configurable speech rate in words per minute
pub const MAX_SPEECH_RATE: u32 = 250;

/// Step applied by the "voice fast" / "voice slow" commands
pub const SPEECH_RATE_STEP: u32 = 25;

/// Preferred voice gender for synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
}

/// Which delivery channels a user wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFormat {
    TextOnly,
    AudioOnly,
    Both,
}

/// Per-user messaging and voice preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingPrefs {
    #[serde(default = "default_true")]
    pub audio_enabled: bool,
    #[serde(default = "default_gender")]
    pub voice_gender: VoiceGender,
    #[serde(default = "default_rate")]
    pub speech_rate_wpm: u32,
    #[serde(default = "default_true")]
    pub dual_messaging_enabled: bool,
    #[serde(default = "default_true")]
    pub voice_for_emergencies: bool,
    #[serde(default = "default_true")]
    pub voice_for_long_messages: bool,
    #[serde(default = "default_delay")]
    pub audio_delay_secs: u64,
    #[serde(default = "default_format")]
    pub format: DeliveryFormat,
}

const fn default_true() -> bool {
    true
}

const fn default_gender() -> VoiceGender {
    VoiceGender::Female
}

const fn default_rate() -> u32 {
    150
}

const fn default_delay() -> u64 {
    crate::config::DEFAULT_AUDIO_DELAY_SECS
}

const fn default_format() -> DeliveryFormat {
    DeliveryFormat::Both
}

impl Default for MessagingPrefs {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            voice_gender: VoiceGender::Female,
            speech_rate_wpm: 150,
            dual_messaging_enabled: true,
            voice_for_emergencies: true,
            voice_for_long_messages: true,
            audio_delay_secs: crate::config::DEFAULT_AUDIO_DELAY_SECS,
            format: DeliveryFormat::Both,
        }
    }
}

impl MessagingPrefs {
    /// Increase the speech rate by one step, clamped to the valid range
    pub const fn faster(&mut self) {
        self.speech_rate_wpm = if self.speech_rate_wpm + SPEECH_RATE_STEP > MAX_SPEECH_RATE {
            MAX_SPEECH_RATE
        } else {
            self.speech_rate_wpm + SPEECH_RATE_STEP
        };
    }

    /// Decrease the speech rate by one step, clamped to the valid range
    pub const fn slower(&mut self) {
        self.speech_rate_wpm = if self.speech_rate_wpm < MIN_SPEECH_RATE + SPEECH_RATE_STEP {
            MIN_SPEECH_RATE
        } else {
            self.speech_rate_wpm - SPEECH_RATE_STEP
        };
    }
}

/// A user profile
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub language: String,
    pub safety_interests: Vec<String>,
    pub prefs: MessagingPrefs,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// User profile repository
#[derive(Clone)]
pub struct ProfileRepo {
    pool: DbPool,
}

impl ProfileRepo {
    /// Create a new profile repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a profile by user ID (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let profile = conn
            .query_row(
                "SELECT user_id, name, role, department, language, safety_interests, prefs,
                        created_at, last_active
                 FROM user_profiles WHERE user_id = ?1",
                [user_id],
                map_profile,
            )
            .ok();

        Ok(profile)
    }

    /// Find a profile, creating one with default preferences on first contact
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_or_create(&self, user_id: &str) -> Result<UserProfile> {
        if let Some(profile) = self.find(user_id)? {
            return Ok(profile);
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let prefs = MessagingPrefs::default();
        let prefs_json = serde_json::to_string(&prefs)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO user_profiles (user_id, language, safety_interests, prefs, created_at, last_active)
             VALUES (?1, 'en', '[]', ?2, ?3, ?3)",
            rusqlite::params![user_id, prefs_json, now],
        )?;

        tracing::info!(user_id, "created profile with default preferences");

        Ok(UserProfile {
            user_id: user_id.to_string(),
            name: None,
            role: None,
            department: None,
            language: "en".to_string(),
            safety_interests: Vec::new(),
            prefs,
            created_at: Utc::now(),
            last_active: Utc::now(),
        })
    }

    /// Merge extracted personal info into a profile
    ///
    /// Only fills fields that are currently unset or explicitly provided;
    /// never clears previously learned values.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn update_info(
        &self,
        user_id: &str,
        name: Option<&str>,
        role: Option<&str>,
        department: Option<&str>,
    ) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE user_profiles
             SET name = COALESCE(?1, name),
                 role = COALESCE(?2, role),
                 department = COALESCE(?3, department),
                 last_active = ?4
             WHERE user_id = ?5",
            rusqlite::params![name, role, department, now, user_id],
        )?;

        Ok(())
    }

    /// Replace the stored messaging preferences
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set_prefs(&self, user_id: &str, prefs: &MessagingPrefs) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let prefs_json = serde_json::to_string(prefs)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE user_profiles SET prefs = ?1, last_active = ?2 WHERE user_id = ?3",
            rusqlite::params![prefs_json, now, user_id],
        )?;

        Ok(())
    }

    /// Record user activity
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn touch(&self, user_id: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE user_profiles SET last_active = ?1 WHERE user_id = ?2",
            rusqlite::params![now, user_id],
        )?;

        Ok(())
    }
}

fn map_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    let interests: String = row.get(5)?;
    let prefs: String = row.get(6)?;

    Ok(UserProfile {
        user_id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        department: row.get(3)?,
        language: row.get(4)?,
        safety_interests: serde_json::from_str(&interests).unwrap_or_default(),
        prefs: serde_json::from_str(&prefs).unwrap_or_default(),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        last_active: parse_datetime(&row.get::<_, String>(8)?),
    })
}
