use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{
    Appeal, AppealId, AppealStatus, ApplicationId, ApplicationStatus, NotificationKind,
};
use super::notify::{NotificationDraft, NotificationSink};
use super::service::{HousingError, HousingService, ValidationError};
use super::store::{HousingStore, NewAppeal};

/// Payload for filing an appeal against a rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct AppealRequest {
    pub application_id: ApplicationId,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealDecision {
    Approved,
    Rejected,
}

/// Final ruling on an appeal. The rationale is mandatory and is quoted in
/// the notification sent to the student.
#[derive(Debug, Clone, Deserialize)]
pub struct AppealRuling {
    pub decision: AppealDecision,
    pub rationale: String,
}

impl<S, N> HousingService<S, N>
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    /// File an appeal against a rejected application and move the
    /// application onto the appeal track.
    pub fn submit_appeal(&self, request: AppealRequest) -> Result<Appeal, HousingError> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyAppealReason.into());
        }
        let mut application = self
            .store
            .application(request.application_id)?
            .ok_or(HousingError::ApplicationNotFound {
                application: request.application_id,
            })?;
        if application.status != ApplicationStatus::Rejected {
            return Err(HousingError::InvalidAppealTarget {
                application: application.id,
                status: application.status,
            });
        }

        // Filed as submitted, then moved to processing by the validation
        // step. Both writes are visible to concurrent readers.
        let mut appeal = self.store.insert_appeal(NewAppeal {
            application_id: application.id,
            reason: reason.to_string(),
            submitted_at: Utc::now(),
        })?;
        appeal.status = AppealStatus::Processing;
        self.store.update_appeal(appeal.clone())?;

        application.status = ApplicationStatus::OnAppeal;
        self.store.update_application(application.clone())?;

        self.notify(NotificationDraft {
            student_id: application.student_id,
            kind: NotificationKind::AppealSubmitted,
            subject: "Appeal received".to_string(),
            body: format!(
                "Your appeal against the rejection of your housing application for {} is being reviewed.",
                application.academic_year
            ),
        });

        Ok(appeal)
    }

    /// Decide an open appeal and mirror the outcome onto the parent
    /// application. An approved appeal puts the application back in the
    /// approved pool with its previous rank; a rejected one returns it to
    /// the rejected state.
    pub fn decide_appeal(
        &self,
        id: AppealId,
        ruling: AppealRuling,
    ) -> Result<Appeal, HousingError> {
        let rationale = ruling.rationale.trim();
        if rationale.is_empty() {
            return Err(ValidationError::MissingRationale.into());
        }
        let mut appeal = self
            .store
            .appeal(id)?
            .ok_or(HousingError::AppealNotFound { appeal: id })?;
        if !appeal.status.open() {
            return Err(HousingError::AppealAlreadyDecided {
                appeal: id,
                status: appeal.status,
            });
        }
        let mut application = self
            .store
            .application(appeal.application_id)?
            .ok_or(HousingError::ApplicationNotFound {
                application: appeal.application_id,
            })?;

        appeal.status = match ruling.decision {
            AppealDecision::Approved => AppealStatus::Approved,
            AppealDecision::Rejected => AppealStatus::Rejected,
        };
        appeal.rationale = Some(rationale.to_string());
        appeal.decided_at = Some(Utc::now());
        self.store.update_appeal(appeal.clone())?;

        application.status = match ruling.decision {
            AppealDecision::Approved => ApplicationStatus::Approved,
            AppealDecision::Rejected => ApplicationStatus::Rejected,
        };
        self.store.update_application(application.clone())?;

        self.notify(NotificationDraft {
            student_id: application.student_id,
            kind: NotificationKind::AppealDecided,
            subject: "Appeal decision".to_string(),
            body: format!(
                "Your appeal for the {} housing application has been {}. {}",
                application.academic_year,
                appeal.status.label(),
                rationale
            ),
        });

        Ok(appeal)
    }

    pub fn appeal(&self, id: AppealId) -> Result<Appeal, HousingError> {
        self.store
            .appeal(id)?
            .ok_or(HousingError::AppealNotFound { appeal: id })
    }

    /// List appeals, optionally narrowed to one status.
    pub fn appeals(&self, status: Option<AppealStatus>) -> Result<Vec<Appeal>, HousingError> {
        Ok(self
            .store
            .appeals()?
            .into_iter()
            .filter(|appeal| status.map_or(true, |wanted| appeal.status == wanted))
            .collect())
    }

    pub fn appeals_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Appeal>, HousingError> {
        Ok(self.store.appeals_for_application(application)?)
    }
}
