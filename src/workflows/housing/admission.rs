use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{Application, ApplicationId, ApplicationStatus, NotificationKind, Student, StudentId};
use super::notify::{NotificationDraft, NotificationSink};
use super::ranking;
use super::service::{HousingError, HousingService, ValidationError};
use super::store::HousingStore;

/// Parameters for an admission proposal run.
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionRequest {
    pub academic_year: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    Approved,
    Rejected,
}

impl AdmissionDecision {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Recommendation for one candidate, tagged with its 1-based position in the
/// ranked candidate list.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalEntry {
    pub position: u32,
    pub application_id: ApplicationId,
    pub student_id: StudentId,
    pub student_name: String,
    pub total_score: f64,
    pub rank: Option<u32>,
    pub proposed: AdmissionDecision,
}

/// Ordered admission proposal. Producing one writes nothing; an
/// administrator confirms it in a separate step.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionProposal {
    pub academic_year: String,
    pub capacity: u32,
    pub candidates: usize,
    pub approved: usize,
    pub rejected: usize,
    pub entries: Vec<ProposalEntry>,
}

/// One confirmed decision an administrator hands back.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionEntry {
    pub application_id: ApplicationId,
    pub decision: AdmissionDecision,
    pub note: Option<String>,
}

/// Counters from a confirmation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmationSummary {
    pub approved: usize,
    pub rejected: usize,
    pub skipped: usize,
}

impl<S, N> HousingService<S, N>
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    /// Partition the in-flight applications for a year into recommended
    /// approvals (the top `capacity` positions) and recommended rejections.
    pub fn propose_admission(
        &self,
        request: AdmissionRequest,
    ) -> Result<AdmissionProposal, HousingError> {
        if request.capacity == 0 {
            return Err(ValidationError::InvalidCapacity.into());
        }
        let academic_year = request.academic_year.trim();
        if academic_year.is_empty() {
            return Err(ValidationError::MissingAcademicYear.into());
        }

        let mut candidates: Vec<Application> = self
            .store
            .applications()?
            .into_iter()
            .filter(|application| {
                application.status == ApplicationStatus::Processing
                    && application.academic_year == academic_year
            })
            .collect();
        if candidates.is_empty() {
            return Err(HousingError::NoCandidates {
                year: academic_year.to_string(),
            });
        }
        candidates.sort_by(ranking::rank_order);

        let students: HashMap<StudentId, Student> = self
            .store
            .students()?
            .into_iter()
            .map(|student| (student.id, student))
            .collect();

        let entries: Vec<ProposalEntry> = candidates
            .iter()
            .enumerate()
            .map(|(index, application)| {
                let position = index as u32 + 1;
                let proposed = if position <= request.capacity {
                    AdmissionDecision::Approved
                } else {
                    AdmissionDecision::Rejected
                };
                ProposalEntry {
                    position,
                    application_id: application.id,
                    student_id: application.student_id,
                    student_name: students
                        .get(&application.student_id)
                        .map(Student::full_name)
                        .unwrap_or_else(|| "unknown student".to_string()),
                    total_score: application.total_score,
                    rank: application.rank,
                    proposed,
                }
            })
            .collect();

        let approved = entries
            .iter()
            .filter(|entry| entry.proposed == AdmissionDecision::Approved)
            .count();

        Ok(AdmissionProposal {
            academic_year: academic_year.to_string(),
            capacity: request.capacity,
            candidates: entries.len(),
            approved,
            rejected: entries.len() - approved,
            entries,
        })
    }

    /// Apply a batch of admission decisions. The batch does not have to match
    /// a prior proposal; each entry stands on its own, and entries naming
    /// unknown applications are skipped rather than failing the rest.
    pub fn confirm_admission(
        &self,
        decisions: Vec<DecisionEntry>,
    ) -> Result<ConfirmationSummary, HousingError> {
        let mut summary = ConfirmationSummary::default();

        for entry in decisions {
            let Some(mut application) = self.store.application(entry.application_id)? else {
                warn!(
                    application = entry.application_id.0,
                    "skipping decision for unknown application"
                );
                summary.skipped += 1;
                continue;
            };

            application.status = match entry.decision {
                AdmissionDecision::Approved => ApplicationStatus::Approved,
                AdmissionDecision::Rejected => ApplicationStatus::Rejected,
            };
            application.decision_note = entry.note;
            self.store.update_application(application.clone())?;

            let (kind, subject, body) = match entry.decision {
                AdmissionDecision::Approved => {
                    summary.approved += 1;
                    (
                        NotificationKind::ApplicationApproved,
                        "Housing application approved",
                        format!(
                            "Congratulations! Your housing application for {} has been approved.",
                            application.academic_year
                        ),
                    )
                }
                AdmissionDecision::Rejected => {
                    summary.rejected += 1;
                    (
                        NotificationKind::ApplicationRejected,
                        "Housing application rejected",
                        format!(
                            "Your housing application for {} has been rejected. You may file an appeal against this decision.",
                            application.academic_year
                        ),
                    )
                }
            };
            self.notify(NotificationDraft {
                student_id: application.student_id,
                kind,
                subject: subject.to_string(),
                body,
            });
        }

        Ok(summary)
    }
}
