//! Incident management backend client
//!
//! Submissions go through the [`ReportBackend`] trait so the report flow
//! can be tested against a stub. Submission failures are recoverable by
//! design: the caller keeps a local backup copy and retries later.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::MediaRef;
use crate::{Error, Result};

/// Payload for a report submission
#[derive(Debug, Clone, Serialize)]
pub struct ReportSubmission {
    pub reporter_id: String,
    pub reporter_name: Option<String>,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_text: Option<String>,
    pub severity: String,
    pub incident_type: String,
    pub media_count: usize,
}

/// Backend acknowledgement of a stored report
#[derive(Debug, Clone, Deserialize)]
pub struct BackendReport {
    pub id: String,
}

/// Incident backend collaborator
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Submit a report, returning the backend-assigned record
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or rejects the report
    async fn submit_report(&self, submission: &ReportSubmission) -> Result<BackendReport>;

    /// Attach a media reference to a submitted report
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or rejects the media
    async fn submit_media(&self, report_id: &str, media: &MediaRef) -> Result<()>;

    /// Probe backend availability
    ///
    /// # Errors
    ///
    /// Returns error if the backend health endpoint is unreachable
    async fn health(&self) -> Result<()>;
}

/// HTTP client for the incident dashboard API
pub struct HttpReportBackend {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpReportBackend {
    /// Create a new backend client
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is missing
    pub fn new(base_url: String, api_token: String, timeout: Duration) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::Config("incident backend URL required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

#[async_trait]
impl ReportBackend for HttpReportBackend {
    async fn submit_report(&self, submission: &ReportSubmission) -> Result<BackendReport> {
        let url = format!("{}/chatbot/reports", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(submission)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!(
                "report submission failed {status}: {body}"
            )));
        }

        let report: BackendReport = response.json().await?;
        tracing::info!(report_id = %report.id, "report submitted to backend");
        Ok(report)
    }

    async fn submit_media(&self, report_id: &str, media: &MediaRef) -> Result<()> {
        #[derive(Serialize)]
        struct MediaRequest<'a> {
            url: &'a str,
            mime_type: &'a str,
        }

        let url = format!("{}/chatbot/reports/{report_id}/media", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&MediaRequest {
                url: &media.url,
                mime_type: &media.mime_type,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Backend(format!("media submission failed {status}")));
        }

        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "backend health check failed: {}",
                response.status()
            )));
        }

        Ok(())
    }
}
