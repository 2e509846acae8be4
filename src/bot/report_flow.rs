//! Structured incident report flow
//!
//! A three-step collection loop (media, location, confirmation) driven by
//! the session state machine. The draft lives in the session payload;
//! nothing is persisted to the reports table until the user confirms.
//! Backend failure downgrades to a local backup-pending record so the
//! report is never lost.

use std::sync::Arc;

use chrono::Utc;

use crate::Result;
use crate::backend::{ReportBackend, ReportSubmission};
use crate::db::{
    MediaRef, ReportDraft, ReportRepo, ReportStatus, SessionData, SessionRepo, SessionState,
    new_report,
};
use crate::location;

/// A reply from the report flow, optionally paired with a canonical audio clip
#[derive(Debug)]
pub struct FlowReply {
    pub text: String,
    pub canonical_audio: Option<&'static str>,
}

impl FlowReply {
    fn text_only(text: String) -> Self {
        Self {
            text,
            canonical_audio: None,
        }
    }
}

/// The structured report collection flow
pub struct ReportFlow {
    sessions: SessionRepo,
    reports: ReportRepo,
    backend: Arc<dyn ReportBackend>,
}

impl ReportFlow {
    /// Create a new report flow
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(sessions: SessionRepo, reports: ReportRepo, backend: Arc<dyn ReportBackend>) -> Self {
        Self {
            sessions,
            reports,
            backend,
        }
    }

    /// Enter the report flow with a fresh draft, starting at the media step
    ///
    /// # Errors
    ///
    /// Returns error if the session write fails
    pub fn start(&self, user_id: &str) -> Result<String> {
        let draft = ReportDraft {
            started_at: Utc::now(),
            ..ReportDraft::default()
        };
        self.sessions.set(
            user_id,
            SessionState::WaitingMedia,
            &SessionData::Report(draft),
        )?;

        Ok("\u{1F4CB} Let's file an incident report.\n\n\
            Step 1 of 2: Send photos or videos of the incident scene, damage, \
            or anything else relevant. You can send several, one after another.\n\n\
            Type CANCEL anytime to stop."
            .to_string())
    }

    /// Advance the flow one step
    ///
    /// # Errors
    ///
    /// Returns error if a session or report write fails
    pub async fn advance(
        &self,
        user_id: &str,
        state: SessionState,
        mut draft: ReportDraft,
        text: &str,
        media: &[MediaRef],
    ) -> Result<FlowReply> {
        let trimmed = text.trim();

        if trimmed.eq_ignore_ascii_case("cancel") {
            self.sessions.reset(user_id)?;
            return Ok(FlowReply::text_only(
                "Report cancelled. Nothing was saved. Type MENU for options.".to_string(),
            ));
        }

        match state {
            SessionState::WaitingMedia => {
                // Media is required; text alone re-prompts without a transition
                if media.is_empty() {
                    return Ok(FlowReply::text_only(
                        "\u{1F4F8} I need photos or videos to complete your report. \
                         Please attach them to your next message, or type CANCEL to stop."
                            .to_string(),
                    ));
                }

                draft.media.extend_from_slice(media);
                let count = draft.media.len();
                self.sessions.set(
                    user_id,
                    SessionState::WaitingLocation,
                    &SessionData::Report(draft),
                )?;

                Ok(FlowReply::text_only(format!(
                    "\u{2705} {count} attachment(s) received.\n\n\
                     Step 2 of 2: Where did this happen? Share GPS coordinates \
                     (e.g. 6.8013, -58.1551) or describe the location."
                )))
            }

            SessionState::WaitingLocation => {
                if let Some((lat, lng)) = location::extract_coordinates(trimmed) {
                    draft.latitude = Some(lat);
                    draft.longitude = Some(lng);
                } else {
                    // Keep the text, fall back to the service-region centroid
                    let (lat, lng) = location::DEFAULT_COORDS;
                    draft.latitude = Some(lat);
                    draft.longitude = Some(lng);
                }
                draft.location_text = Some(trimmed.to_string());

                let summary = confirmation_summary(&draft);
                self.sessions.set(
                    user_id,
                    SessionState::ConfirmingReport,
                    &SessionData::Report(draft),
                )?;

                Ok(FlowReply::text_only(summary))
            }

            SessionState::ConfirmingReport => {
                if trimmed.eq_ignore_ascii_case("submit") {
                    return self.submit(user_id, draft).await;
                }
                Ok(FlowReply::text_only(
                    "Please reply SUBMIT to send the report, or CANCEL to discard it."
                        .to_string(),
                ))
            }

            // Stale or legacy flow state in the session row
            _ => {
                self.sessions.reset(user_id)?;
                Ok(FlowReply::text_only(
                    "Something went wrong with your report session. I've reset it - \
                     type REPORT to start over."
                        .to_string(),
                ))
            }
        }
    }

    async fn submit(&self, user_id: &str, draft: ReportDraft) -> Result<FlowReply> {
        let location_text = draft.location_text.clone().unwrap_or_default();
        let severity = severity_for(draft.media.len());
        let incident_type = incident_type_for(&location_text);
        let description = describe(&draft);

        let (lat, lng) = (
            draft.latitude.unwrap_or(location::DEFAULT_COORDS.0),
            draft.longitude.unwrap_or(location::DEFAULT_COORDS.1),
        );
        let submission = ReportSubmission {
            reporter_id: user_id.to_string(),
            reporter_name: None,
            description: description.clone(),
            latitude: lat,
            longitude: lng,
            location_text: draft.location_text.clone(),
            severity: severity.to_string(),
            incident_type: incident_type.to_string(),
            media_count: draft.media.len(),
        };

        match self.backend.submit_report(&submission).await {
            Ok(backend_report) => {
                for media in &draft.media {
                    // Best-effort; the report itself already landed
                    if let Err(e) = self.backend.submit_media(&backend_report.id, media).await {
                        tracing::warn!(error = %e, report = backend_report.id, "media upload failed");
                    }
                }

                let mut record = new_report(
                    user_id,
                    description,
                    draft.latitude,
                    draft.longitude,
                    draft.location_text,
                    severity.to_string(),
                    incident_type.to_string(),
                    draft.media,
                    ReportStatus::Submitted,
                );
                record.external_id = Some(backend_report.id.clone());
                record.submitted_at = Some(Utc::now());
                self.reports.insert(&record)?;
                self.sessions.reset(user_id)?;

                tracing::info!(user = user_id, report = backend_report.id, "report submitted");

                Ok(FlowReply {
                    text: format!(
                        "\u{2705} Report submitted. Reference: {}\n\n\
                         The HSSE team has been notified. Type STATUS anytime to check \
                         your reports, or MENU for options.",
                        backend_report.id
                    ),
                    canonical_audio: Some("report_submitted"),
                })
            }
            Err(e) => {
                tracing::warn!(user = user_id, error = %e, "backend submission failed");

                let record = new_report(
                    user_id,
                    description,
                    draft.latitude,
                    draft.longitude,
                    draft.location_text.clone(),
                    severity.to_string(),
                    incident_type.to_string(),
                    draft.media.clone(),
                    ReportStatus::BackupPending,
                );
                self.reports.insert(&record)?;
                // Keep the draft so SUBMIT can be retried
                self.sessions.set(
                    user_id,
                    SessionState::ConfirmingReport,
                    &SessionData::Report(draft),
                )?;

                Ok(FlowReply::text_only(
                    "\u{26A0} I couldn't reach the reporting system, but your report is \
                     saved locally and will be forwarded automatically. You can also reply \
                     SUBMIT to retry now, or CANCEL to stop."
                        .to_string(),
                ))
            }
        }
    }

    /// Re-submit locally saved reports that never reached the backend
    ///
    /// # Errors
    ///
    /// Returns error if the pending list cannot be read
    pub async fn retry_pending(&self) -> Result<usize> {
        let pending = self.reports.list_backup_pending()?;
        let mut forwarded = 0;

        for report in pending {
            let submission = ReportSubmission {
                reporter_id: report.user_id.clone(),
                reporter_name: None,
                description: report.description.clone(),
                latitude: report.latitude.unwrap_or(location::DEFAULT_COORDS.0),
                longitude: report.longitude.unwrap_or(location::DEFAULT_COORDS.1),
                location_text: report.location_text.clone(),
                severity: report.severity.clone(),
                incident_type: report.incident_type.clone(),
                media_count: report.media.len(),
            };

            match self.backend.submit_report(&submission).await {
                Ok(backend_report) => {
                    self.reports.mark_submitted(&report.id, &backend_report.id)?;
                    tracing::info!(report = report.id, external = backend_report.id,
                        "backup report forwarded");
                    forwarded += 1;
                }
                Err(e) => {
                    tracing::debug!(report = report.id, error = %e, "backup retry failed");
                }
            }
        }

        Ok(forwarded)
    }
}

/// Severity heuristic: evidence volume stands in for seriousness
#[must_use]
pub const fn severity_for(media_count: usize) -> &'static str {
    if media_count >= 3 {
        "high"
    } else if media_count >= 1 {
        "medium"
    } else {
        "low"
    }
}

/// Coarse incident classification from location-description keywords
#[must_use]
pub fn incident_type_for(location_text: &str) -> &'static str {
    let lower = location_text.to_lowercase();

    if ["office", "desk", "computer"].iter().any(|w| lower.contains(w)) {
        "workplace_injury"
    } else if ["machine", "equipment", "tool"].iter().any(|w| lower.contains(w)) {
        "equipment_failure"
    } else if ["chemical", "spill", "leak"].iter().any(|w| lower.contains(w)) {
        "chemical_incident"
    } else {
        "other"
    }
}

fn describe(draft: &ReportDraft) -> String {
    let location = draft.location_text.as_deref().unwrap_or("not specified");
    format!(
        "Incident reported via WhatsApp chatbot. {} media file(s) submitted. Location: {location}.",
        draft.media.len()
    )
}

fn confirmation_summary(draft: &ReportDraft) -> String {
    let location = draft.location_text.as_deref().unwrap_or("not given");
    let coords = match (draft.latitude, draft.longitude) {
        (Some(lat), Some(lng)) => format!("{lat:.4}, {lng:.4}"),
        _ => "unknown".to_string(),
    };

    format!(
        "\u{1F4C4} Review your report\n\n\
         Attachments: {}\n\
         Location: {location} ({coords})\n\
         Severity: {}\n\
         Type: {}\n\n\
         Reply SUBMIT to send it to the HSSE team, or CANCEL to discard.",
        draft.media.len(),
        severity_for(draft.media.len()),
        incident_type_for(location),
    )
}
