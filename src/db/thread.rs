//! Conversation thread and turn repository

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DbPool, parse_datetime};
use crate::{Error, Result};

/// A conversation thread
#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turn_count: u32,
    pub status: String,
}

/// A single conversational exchange
///
/// Turns are immutable once recorded.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub user_input: String,
    pub bot_response: String,
    pub intent: String,
    pub sentiment: String,
    pub quality: f64,
    pub created_at: DateTime<Utc>,
}

/// Long-term relationship metadata for a user
#[derive(Debug, Clone)]
pub struct LongTermMemory {
    pub trust_level: f64,
    pub preferred_style: String,
    pub expertise_areas: Vec<String>,
}

impl Default for LongTermMemory {
    fn default() -> Self {
        Self {
            trust_level: 0.5,
            preferred_style: "professional".to_string(),
            expertise_areas: Vec::new(),
        }
    }
}

/// Thread and turn repository
#[derive(Clone)]
pub struct ThreadRepo {
    pool: DbPool,
}

impl ThreadRepo {
    /// Create a new thread repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a user's most recently active thread
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_latest(&self, user_id: &str) -> Result<Option<ConversationThread>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let thread = conn
            .query_row(
                "SELECT id, user_id, topic, started_at, last_activity, turn_count, status
                 FROM conversation_threads WHERE user_id = ?1
                 ORDER BY last_activity DESC LIMIT 1",
                [user_id],
                map_thread,
            )
            .ok();

        Ok(thread)
    }

    /// Create a new thread
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn create(&self, user_id: &str, topic: &str) -> Result<ConversationThread> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO conversation_threads (id, user_id, topic, started_at, last_activity, turn_count, status)
             VALUES (?1, ?2, ?3, ?4, ?4, 0, 'active')",
            rusqlite::params![id, user_id, topic, now.to_rfc3339()],
        )?;

        Ok(ConversationThread {
            id,
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            started_at: now,
            last_activity: now,
            turn_count: 0,
            status: "active".to_string(),
        })
    }

    /// Record an exchange, bumping the owning thread's activity and count
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn record_turn(&self, turn: &ConversationTurn) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO conversation_turns
                 (id, thread_id, user_id, user_input, bot_response, intent, sentiment, quality, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                turn.id,
                turn.thread_id,
                turn.user_id,
                turn.user_input,
                turn.bot_response,
                turn.intent,
                turn.sentiment,
                turn.quality,
                turn.created_at.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "UPDATE conversation_threads
             SET last_activity = ?1, turn_count = turn_count + 1
             WHERE id = ?2",
            rusqlite::params![turn.created_at.to_rfc3339(), turn.thread_id],
        )?;

        Ok(())
    }

    /// A user's most recent turns, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, thread_id, user_id, user_input, bot_response, intent, sentiment, quality, created_at
             FROM conversation_turns WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;

        let turns = stmt
            .query_map(rusqlite::params![user_id, limit], map_turn)?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(turns)
    }

    /// Total turns ever recorded for a user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn turn_count(&self, user_id: &str) -> Result<u32> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count = conn.query_row(
            "SELECT count(*) FROM conversation_turns WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Long-term relationship metadata, defaulted when absent
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn memory(&self, user_id: &str) -> Result<LongTermMemory> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let row: Option<(f64, String, String)> = conn
            .query_row(
                "SELECT trust_level, preferred_style, expertise_areas
                 FROM long_term_memory WHERE user_id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();

        Ok(row.map_or_else(LongTermMemory::default, |(trust, style, areas)| {
            LongTermMemory {
                trust_level: trust,
                preferred_style: style,
                expertise_areas: serde_json::from_str(&areas).unwrap_or_default(),
            }
        }))
    }

    /// Upsert long-term relationship metadata
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set_memory(&self, user_id: &str, memory: &LongTermMemory) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let areas = serde_json::to_string(&memory.expertise_areas)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO long_term_memory (user_id, trust_level, preferred_style, expertise_areas, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                 trust_level = ?2, preferred_style = ?3, expertise_areas = ?4, updated_at = ?5",
            rusqlite::params![user_id, memory.trust_level, memory.preferred_style, areas, now],
        )?;

        Ok(())
    }
}

fn map_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationThread> {
    Ok(ConversationThread {
        id: row.get(0)?,
        user_id: row.get(1)?,
        topic: row.get(2)?,
        started_at: parse_datetime(&row.get::<_, String>(3)?),
        last_activity: parse_datetime(&row.get::<_, String>(4)?),
        turn_count: row.get(5)?,
        status: row.get(6)?,
    })
}

fn map_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        user_id: row.get(2)?,
        user_input: row.get(3)?,
        bot_response: row.get(4)?,
        intent: row.get(5)?,
        sentiment: row.get(6)?,
        quality: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}
