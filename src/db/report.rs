//! Incident report repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DbPool, parse_datetime};
use crate::{Error, Result};

/// A media attachment reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Lifecycle status of a report
///
/// Transitions are monotonic: a draft becomes submitted or backup-pending,
/// and a backup-pending report becomes submitted once a retry succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Draft,
    Submitted,
    BackupPending,
}

impl ReportStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::BackupPending => "backup_pending",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "submitted" => Self::Submitted,
            "backup_pending" => Self::BackupPending,
            _ => Self::Draft,
        }
    }
}

/// A persisted incident report
#[derive(Debug, Clone)]
pub struct IncidentReport {
    pub id: String,
    pub user_id: String,
    pub external_id: Option<String>,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_text: Option<String>,
    pub severity: String,
    pub incident_type: String,
    pub media: Vec<MediaRef>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Incident report repository
#[derive(Clone)]
pub struct ReportRepo {
    pool: DbPool,
}

impl ReportRepo {
    /// Create a new report repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a report, returning its local ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, report: &IncidentReport) -> Result<String> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let media = serde_json::to_string(&report.media)?;

        conn.execute(
            "INSERT INTO reports (id, user_id, external_id, description, latitude, longitude,
                                  location_text, severity, incident_type, media, status,
                                  created_at, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                report.id,
                report.user_id,
                report.external_id,
                report.description,
                report.latitude,
                report.longitude,
                report.location_text,
                report.severity,
                report.incident_type,
                media,
                report.status.as_str(),
                report.created_at.to_rfc3339(),
                report.submitted_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        Ok(report.id.clone())
    }

    /// Mark a report as submitted with its backend-assigned ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn mark_submitted(&self, id: &str, external_id: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE reports SET status = 'submitted', external_id = ?1, submitted_at = ?2
             WHERE id = ?3",
            rusqlite::params![external_id, now, id],
        )?;

        Ok(())
    }

    /// List a user's reports, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<IncidentReport>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, external_id, description, latitude, longitude, location_text,
                    severity, incident_type, media, status, created_at, submitted_at
             FROM reports WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;

        let reports = stmt
            .query_map(rusqlite::params![user_id, limit], map_report)?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(reports)
    }

    /// List reports awaiting a successful backend submission
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_backup_pending(&self) -> Result<Vec<IncidentReport>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, external_id, description, latitude, longitude, location_text,
                    severity, incident_type, media, status, created_at, submitted_at
             FROM reports WHERE status = 'backup_pending' ORDER BY created_at",
        )?;

        let reports = stmt
            .query_map([], map_report)?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(reports)
    }
}

/// Build a new local report record from draft fields
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn new_report(
    user_id: &str,
    description: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    location_text: Option<String>,
    severity: String,
    incident_type: String,
    media: Vec<MediaRef>,
    status: ReportStatus,
) -> IncidentReport {
    IncidentReport {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        external_id: None,
        description,
        latitude,
        longitude,
        location_text,
        severity,
        incident_type,
        media,
        status,
        created_at: Utc::now(),
        submitted_at: None,
    }
}

fn map_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<IncidentReport> {
    let media: String = row.get(9)?;
    let status: String = row.get(10)?;

    Ok(IncidentReport {
        id: row.get(0)?,
        user_id: row.get(1)?,
        external_id: row.get(2)?,
        description: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        location_text: row.get(6)?,
        severity: row.get(7)?,
        incident_type: row.get(8)?,
        media: serde_json::from_str(&media).unwrap_or_default(),
        status: ReportStatus::parse(&status),
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        submitted_at: row
            .get::<_, Option<String>>(12)?
            .map(|s| parse_datetime(&s)),
    })
}
