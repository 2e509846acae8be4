//! Delivery and synthesis analytics repository

use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// One dual-delivery outcome
#[derive(Debug, Clone)]
pub struct DeliveryRecord {
    pub user_id: String,
    pub message_len: usize,
    pub text_sent: bool,
    pub voice_scheduled: bool,
    pub voice_sent: bool,
    pub delay_secs: u64,
    pub error: Option<String>,
}

/// One synthesis outcome
#[derive(Debug, Clone)]
pub struct SynthesisRecord {
    pub engine: String,
    pub text_len: usize,
    pub bytes: usize,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

/// Aggregated delivery metrics over a window
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeliverySummary {
    pub total_messages: u64,
    pub text_sent: u64,
    pub voice_scheduled: u64,
    pub voice_sent: u64,
    pub voice_failures: u64,
    pub avg_message_len: f64,
    pub synthesis_total: u64,
    pub synthesis_cache_hits: u64,
    pub avg_synthesis_latency_ms: f64,
}

/// Analytics repository
#[derive(Clone)]
pub struct AnalyticsRepo {
    pool: DbPool,
}

impl AnalyticsRepo {
    /// Create a new analytics repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record a delivery outcome
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn log_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO delivery_log
                 (id, user_id, message_len, text_sent, voice_scheduled, voice_sent, delay_secs, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                record.user_id,
                record.message_len,
                i32::from(record.text_sent),
                i32::from(record.voice_scheduled),
                i32::from(record.voice_sent),
                record.delay_secs,
                record.error,
            ],
        )?;

        Ok(())
    }

    /// Record a synthesis outcome
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn log_synthesis(&self, record: &SynthesisRecord) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO synthesis_log (id, engine, text_len, bytes, latency_ms, cache_hit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                record.engine,
                record.text_len,
                record.bytes,
                record.latency_ms,
                i32::from(record.cache_hit),
            ],
        )?;

        Ok(())
    }

    /// Aggregate delivery and synthesis metrics over the last `days` days
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn summary(&self, days: u32) -> Result<DeliverySummary> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let window = format!("-{days} days");

        let (total, text_sent, voice_scheduled, voice_sent, voice_failures, avg_len): (
            u64,
            u64,
            u64,
            u64,
            u64,
            f64,
        ) = conn.query_row(
            "SELECT count(*),
                    coalesce(sum(text_sent), 0),
                    coalesce(sum(voice_scheduled), 0),
                    coalesce(sum(voice_sent), 0),
                    coalesce(sum(CASE WHEN voice_scheduled = 1 AND voice_sent = 0 THEN 1 ELSE 0 END), 0),
                    coalesce(avg(message_len), 0.0)
             FROM delivery_log WHERE created_at >= datetime('now', ?1)",
            [&window],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

        let (synth_total, cache_hits, avg_latency): (u64, u64, f64) = conn.query_row(
            "SELECT count(*),
                    coalesce(sum(cache_hit), 0),
                    coalesce(avg(latency_ms), 0.0)
             FROM synthesis_log WHERE created_at >= datetime('now', ?1)",
            [&window],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(DeliverySummary {
            total_messages: total,
            text_sent,
            voice_scheduled,
            voice_sent,
            voice_failures,
            avg_message_len: avg_len,
            synthesis_total: synth_total,
            synthesis_cache_hits: cache_hits,
            avg_synthesis_latency_ms: avg_latency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> AnalyticsRepo {
        let pool = init_memory().unwrap();
        AnalyticsRepo::new(pool)
    }

    #[test]
    fn test_summary_over_logged_deliveries() {
        let repo = setup();

        repo.log_delivery(&DeliveryRecord {
            user_id: "u1".to_string(),
            message_len: 120,
            text_sent: true,
            voice_scheduled: true,
            voice_sent: true,
            delay_secs: 2,
            error: None,
        })
        .unwrap();

        repo.log_delivery(&DeliveryRecord {
            user_id: "u1".to_string(),
            message_len: 80,
            text_sent: true,
            voice_scheduled: true,
            voice_sent: false,
            delay_secs: 2,
            error: Some("media send failed".to_string()),
        })
        .unwrap();

        repo.log_synthesis(&SynthesisRecord {
            engine: "elevenlabs".to_string(),
            text_len: 120,
            bytes: 9000,
            latency_ms: 340,
            cache_hit: false,
        })
        .unwrap();

        let summary = repo.summary(7).unwrap();
        assert_eq!(summary.total_messages, 2);
        assert_eq!(summary.text_sent, 2);
        assert_eq!(summary.voice_sent, 1);
        assert_eq!(summary.voice_failures, 1);
        assert_eq!(summary.synthesis_total, 1);
        assert_eq!(summary.synthesis_cache_hits, 0);
    }
}
