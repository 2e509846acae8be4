//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 4;

/// Initialize the database schema
///
/// Migrations are ordered and applied exactly once, tracked through
/// `PRAGMA user_version`.
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }
    if version < 3 {
        migrate_v3(conn)?;
    }
    if version < 4 {
        migrate_v4(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- User profiles with messaging preferences (prefs is versioned JSON)
        CREATE TABLE IF NOT EXISTS user_profiles (
            user_id TEXT PRIMARY KEY,
            name TEXT,
            role TEXT,
            department TEXT,
            language TEXT NOT NULL DEFAULT 'en',
            safety_interests TEXT NOT NULL DEFAULT '[]',
            prefs TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            last_active TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One conversation session per user; data is a tagged JSON payload
        CREATE TABLE IF NOT EXISTS sessions (
            user_id TEXT PRIMARY KEY,
            state TEXT NOT NULL DEFAULT 'conversing',
            data TEXT NOT NULL DEFAULT '{"kind":"idle"}',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        PRAGMA user_version = 1;
        "#,
    )?;
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Conversation threads (topic-scoped groupings of turns)
        CREATE TABLE IF NOT EXISTS conversation_threads (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            topic TEXT NOT NULL DEFAULT 'general',
            started_at TEXT NOT NULL DEFAULT (datetime('now')),
            last_activity TEXT NOT NULL DEFAULT (datetime('now')),
            turn_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active'
        );

        CREATE INDEX IF NOT EXISTS idx_threads_user ON conversation_threads(user_id, last_activity);

        -- Immutable per-exchange records
        CREATE TABLE IF NOT EXISTS conversation_turns (
            id TEXT PRIMARY KEY,
            thread_id TEXT NOT NULL REFERENCES conversation_threads(id),
            user_id TEXT NOT NULL,
            user_input TEXT NOT NULL,
            bot_response TEXT NOT NULL,
            intent TEXT NOT NULL,
            sentiment TEXT NOT NULL DEFAULT 'neutral',
            quality REAL NOT NULL DEFAULT 0.5,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_turns_user ON conversation_turns(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_turns_thread ON conversation_turns(thread_id);

        -- Long-term relationship metadata per user
        CREATE TABLE IF NOT EXISTS long_term_memory (
            user_id TEXT PRIMARY KEY,
            trust_level REAL NOT NULL DEFAULT 0.5,
            preferred_style TEXT NOT NULL DEFAULT 'professional',
            expertise_areas TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        PRAGMA user_version = 2;
        ",
    )?;
    Ok(())
}

fn migrate_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Incident reports, including local backup copies of failed submissions
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            external_id TEXT,
            description TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            location_text TEXT,
            severity TEXT NOT NULL DEFAULT 'low',
            incident_type TEXT NOT NULL DEFAULT 'other',
            media TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL CHECK(status IN ('draft', 'submitted', 'backup_pending')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            submitted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);

        PRAGMA user_version = 3;
        ",
    )?;
    Ok(())
}

fn migrate_v4(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Dual delivery outcomes
        CREATE TABLE IF NOT EXISTS delivery_log (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            message_len INTEGER NOT NULL DEFAULT 0,
            text_sent INTEGER NOT NULL DEFAULT 0,
            voice_scheduled INTEGER NOT NULL DEFAULT 0,
            voice_sent INTEGER NOT NULL DEFAULT 0,
            delay_secs INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_delivery_user ON delivery_log(user_id, created_at);

        -- Synthesis outcomes per engine
        CREATE TABLE IF NOT EXISTS synthesis_log (
            id TEXT PRIMARY KEY,
            engine TEXT NOT NULL,
            text_len INTEGER NOT NULL DEFAULT 0,
            bytes INTEGER NOT NULL DEFAULT 0,
            latency_ms INTEGER NOT NULL DEFAULT 0,
            cache_hit INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_synthesis_created ON synthesis_log(created_at);

        PRAGMA user_version = 4;
        ",
    )?;
    Ok(())
}
