use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    AppealId, AppealStatus, Application, ApplicationDetailView, ApplicationId, ApplicationStatus,
    ApplicationView, AssignedRoomView, Criterion, CriterionId, Evaluation, NotificationKind,
    RoomType, ScoreLineView, Student, StudentId,
};
use super::notify::{NotificationDraft, NotificationSink};
use super::ranking;
use super::scoring::{score_application, RescoreScope, RescoreSummary};
use super::store::{HousingStore, NewApplication, NewStudent, StoreError};

/// Service composing the store, the scoring rules, and the notification sink
/// behind every housing workflow operation. Admission, allocation, criteria,
/// and appeal operations live in their own modules but hang off this type.
pub struct HousingService<S, N> {
    pub(crate) store: Arc<S>,
    pub(crate) notifications: Arc<N>,
}

/// Payload for a new application submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitApplication {
    pub student_id: StudentId,
    pub academic_year: String,
    pub room_type: Option<RoomType>,
    pub location_preference: Option<String>,
}

/// Editable application fields. Accepted only while the application has not
/// been decided yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationUpdate {
    pub room_type: Option<RoomType>,
    pub location_preference: Option<String>,
}

impl ApplicationUpdate {
    fn is_empty(&self) -> bool {
        self.room_type.is_none() && self.location_preference.is_none()
    }
}

/// Profile fields a student may change after registration. Every change runs
/// the affected applications through scoring again.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub study_program: Option<String>,
    pub year_of_study: Option<u8>,
    pub grade_average: Option<f64>,
    pub distance_km: Option<f64>,
    pub household_income: Option<f64>,
    pub household_size: Option<u32>,
    pub disability: Option<bool>,
    pub social_situation: Option<String>,
}

impl StudentUpdate {
    fn is_empty(&self) -> bool {
        self.study_program.is_none()
            && self.year_of_study.is_none()
            && self.grade_average.is_none()
            && self.distance_km.is_none()
            && self.household_income.is_none()
            && self.household_size.is_none()
            && self.disability.is_none()
            && self.social_situation.is_none()
    }
}

/// Optional filters accepted by the applications index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFilter {
    pub academic_year: Option<String>,
    pub status: Option<ApplicationStatus>,
}

/// Result of a profile update: the stored student plus the rescore fallout.
#[derive(Debug, Clone, Serialize)]
pub struct StudentProfileOutcome {
    pub student: Student,
    pub rescore: RescoreSummary,
}

impl<S, N> HousingService<S, N>
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(store: Arc<S>, notifications: Arc<N>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Submit a new application for a student, score it against the active
    /// criteria, and slot it into the global ranking.
    pub fn submit_application(
        &self,
        submission: SubmitApplication,
    ) -> Result<Application, HousingError> {
        let academic_year = submission.academic_year.trim();
        if academic_year.is_empty() {
            return Err(ValidationError::MissingAcademicYear.into());
        }
        let student = self
            .store
            .student(submission.student_id)?
            .ok_or(HousingError::StudentNotFound {
                student: submission.student_id,
            })?;

        let mut application = self.store.insert_application(NewApplication {
            student_id: student.id,
            academic_year: academic_year.to_string(),
            room_type: submission.room_type.unwrap_or_default(),
            location_preference: submission
                .location_preference
                .filter(|preference| !preference.trim().is_empty()),
            submitted_at: Utc::now(),
        })?;

        application.status = ApplicationStatus::Processing;
        self.store.update_application(application.clone())?;

        self.score_application_record(&mut application)?;
        self.refresh_rankings()?;

        let application = self
            .store
            .application(application.id)?
            .ok_or(StoreError::NotFound)?;

        self.notify(NotificationDraft {
            student_id: student.id,
            kind: NotificationKind::ApplicationReceived,
            subject: "Housing application received".to_string(),
            body: format!(
                "We received your housing application for {}. It is now being processed.",
                application.academic_year
            ),
        });

        Ok(application)
    }

    /// Apply edits to an application that is still in an editable state, then
    /// rescore and rerank it.
    pub fn update_application(
        &self,
        id: ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<Application, HousingError> {
        if update.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }
        let mut application = self
            .store
            .application(id)?
            .ok_or(HousingError::ApplicationNotFound { application: id })?;
        if !application.status.editable() {
            return Err(HousingError::InvalidStateTransition {
                application: id,
                from: application.status,
                to: ApplicationStatus::Processing,
            });
        }

        if let Some(room_type) = update.room_type {
            application.room_type = room_type;
        }
        if let Some(preference) = update.location_preference {
            application.location_preference = if preference.trim().is_empty() {
                None
            } else {
                Some(preference)
            };
        }
        application.status = ApplicationStatus::Processing;
        self.store.update_application(application.clone())?;

        self.score_application_record(&mut application)?;
        self.refresh_rankings()?;

        let application = self.store.application(id)?.ok_or(StoreError::NotFound)?;

        self.notify(NotificationDraft {
            student_id: application.student_id,
            kind: NotificationKind::ApplicationUpdated,
            subject: "Housing application updated".to_string(),
            body: format!(
                "Your housing application for {} was updated and will be evaluated again.",
                application.academic_year
            ),
        });

        Ok(application)
    }

    /// Fetch the raw application record.
    pub fn application(&self, id: ApplicationId) -> Result<Application, HousingError> {
        self.store
            .application(id)?
            .ok_or(HousingError::ApplicationNotFound { application: id })
    }

    /// Full display join of an application with its student, score breakdown,
    /// and room assignment.
    pub fn application_detail(
        &self,
        id: ApplicationId,
    ) -> Result<ApplicationDetailView, HousingError> {
        let application = self
            .store
            .application(id)?
            .ok_or(HousingError::ApplicationNotFound { application: id })?;
        let student = self
            .store
            .student(application.student_id)?
            .ok_or(HousingError::StudentNotFound {
                student: application.student_id,
            })?;

        let criteria: HashMap<CriterionId, Criterion> = self
            .store
            .criteria()?
            .into_iter()
            .map(|criterion| (criterion.id, criterion))
            .collect();
        let score_lines = self
            .store
            .evaluations_for(id)?
            .into_iter()
            .filter_map(|evaluation| {
                criteria
                    .get(&evaluation.criterion_id)
                    .map(|criterion| ScoreLineView {
                        criterion_id: criterion.id,
                        criterion: criterion.name.clone(),
                        kind: criterion.kind,
                        weight_percent: criterion.weight_percent,
                        points: evaluation.points,
                        weighted: evaluation.points * criterion.weight_percent / 100.0,
                    })
            })
            .collect();

        let assigned_room = match application.room_id {
            Some(room_id) => {
                let room = self.store.room(room_id)?.ok_or(StoreError::NotFound)?;
                let dormitory = self
                    .store
                    .dormitory(room.dormitory_id)?
                    .ok_or(StoreError::NotFound)?;
                Some(AssignedRoomView {
                    room_id: room.id,
                    room_number: room.number,
                    dormitory: dormitory.name,
                    allocated_at: application.allocated_at,
                })
            }
            None => None,
        };

        Ok(ApplicationDetailView {
            id: application.id,
            student_id: student.id,
            student_name: student.full_name(),
            student_email: student.email,
            academic_year: application.academic_year,
            room_type: application.room_type,
            room_type_label: application.room_type.label(),
            location_preference: application.location_preference,
            status: application.status,
            status_label: application.status.label(),
            total_score: application.total_score,
            rank: application.rank,
            decision_note: application.decision_note,
            submitted_at: application.submitted_at,
            assigned_room,
            score_lines,
        })
    }

    /// List applications, best rank first, optionally narrowed by year or
    /// status. Unranked applications sort after ranked ones.
    pub fn applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationView>, HousingError> {
        let students: HashMap<StudentId, Student> = self
            .store
            .students()?
            .into_iter()
            .map(|student| (student.id, student))
            .collect();

        let mut views: Vec<ApplicationView> = self
            .store
            .applications()?
            .into_iter()
            .filter(|application| {
                filter
                    .academic_year
                    .as_deref()
                    .map_or(true, |year| application.academic_year == year)
                    && filter
                        .status
                        .map_or(true, |status| application.status == status)
            })
            .map(|application| view_for(&application, &students))
            .collect();

        views.sort_by(|a, b| match (a.rank, b.rank) {
            (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        Ok(views)
    }

    /// List one student's applications in submission order.
    pub fn applications_for_student(
        &self,
        student: StudentId,
    ) -> Result<Vec<ApplicationView>, HousingError> {
        let record = self
            .store
            .student(student)?
            .ok_or(HousingError::StudentNotFound { student })?;
        let mut students = HashMap::new();
        students.insert(record.id, record);

        Ok(self
            .store
            .applications_for_student(student)?
            .iter()
            .map(|application| view_for(application, &students))
            .collect())
    }

    /// Register a student on the roster.
    pub fn register_student(&self, student: NewStudent) -> Result<Student, HousingError> {
        Ok(self.store.insert_student(student)?)
    }

    pub fn student(&self, id: StudentId) -> Result<Student, HousingError> {
        self.store
            .student(id)?
            .ok_or(HousingError::StudentNotFound { student: id })
    }

    pub fn students(&self) -> Result<Vec<Student>, HousingError> {
        Ok(self.store.students()?)
    }

    /// Apply profile changes and push the student's still-competing
    /// applications through scoring again so the ranking reflects them.
    pub fn update_student(
        &self,
        id: StudentId,
        update: StudentUpdate,
    ) -> Result<StudentProfileOutcome, HousingError> {
        if update.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }
        let mut student = self
            .store
            .student(id)?
            .ok_or(HousingError::StudentNotFound { student: id })?;

        if let Some(program) = update.study_program {
            student.study_program = program;
        }
        if let Some(year) = update.year_of_study {
            student.year_of_study = year;
        }
        if let Some(average) = update.grade_average {
            student.grade_average = Some(average);
        }
        if let Some(distance) = update.distance_km {
            student.distance_km = Some(distance);
        }
        if let Some(income) = update.household_income {
            student.household_income = Some(income);
        }
        if let Some(size) = update.household_size {
            student.household_size = size;
        }
        if let Some(disability) = update.disability {
            student.disability = disability;
        }
        if let Some(situation) = update.social_situation {
            student.social_situation = if situation.trim().is_empty() {
                None
            } else {
                Some(situation)
            };
        }
        self.store.update_student(student.clone())?;

        let mut rescore = RescoreSummary::default();
        for mut application in self
            .store
            .applications_for_student(id)?
            .into_iter()
            .filter(|application| application.status.competing())
        {
            match self.score_application_record(&mut application) {
                Ok(()) => rescore.rescored += 1,
                Err(error) => {
                    warn!(
                        application = application.id.0,
                        error = %error,
                        "rescore after profile update failed"
                    );
                    rescore.failed += 1;
                }
            }
        }
        self.refresh_rankings()?;

        Ok(StudentProfileOutcome { student, rescore })
    }

    /// Push every still-competing application in scope through scoring, then
    /// refresh the ranking once at the end. Failures are counted and skipped,
    /// already-written scores stand.
    pub fn rescore(&self, scope: RescoreScope) -> Result<RescoreSummary, HousingError> {
        let mut summary = RescoreSummary::default();
        for mut application in self
            .store
            .applications()?
            .into_iter()
            .filter(|application| application.status.competing())
        {
            if let RescoreScope::Year(year) = &scope {
                if application.academic_year != *year {
                    continue;
                }
            }
            match self.score_application_record(&mut application) {
                Ok(()) => summary.rescored += 1,
                Err(error) => {
                    warn!(
                        application = application.id.0,
                        error = %error,
                        "rescore failed"
                    );
                    summary.failed += 1;
                }
            }
        }
        self.refresh_rankings()?;
        Ok(summary)
    }

    /// Recompute the global ranking across every still-competing application.
    /// Every row is written back, fully overwriting the previous ranking.
    pub fn refresh_rankings(&self) -> Result<usize, HousingError> {
        let competing: Vec<Application> = self
            .store
            .applications()?
            .into_iter()
            .filter(|application| application.status.competing())
            .collect();

        let ranked = ranking::ranked(competing);
        let written = ranked.len();
        for application in ranked {
            self.store.update_application(application)?;
        }
        Ok(written)
    }

    /// Score one application against the current active criteria and persist
    /// both the evaluation rows and the new total.
    pub(crate) fn score_application_record(
        &self,
        application: &mut Application,
    ) -> Result<(), HousingError> {
        let student = self
            .store
            .student(application.student_id)?
            .ok_or(HousingError::StudentNotFound {
                student: application.student_id,
            })?;
        let criteria = self.store.criteria()?;

        let breakdown = score_application(&student, &criteria);
        let rows = breakdown
            .lines
            .iter()
            .map(|line| Evaluation {
                application_id: application.id,
                criterion_id: line.criterion_id,
                points: line.points,
            })
            .collect();
        self.store.replace_evaluations(application.id, rows)?;

        application.total_score = breakdown.total;
        self.store.update_application(application.clone())?;
        Ok(())
    }

    /// Hand a message to the sink. Delivery problems are logged and dropped,
    /// the triggering operation never fails because of them.
    pub(crate) fn notify(&self, draft: NotificationDraft) {
        if let Err(error) = self.notifications.enqueue(draft) {
            warn!(error = %error, "notification delivery failed");
        }
    }
}

fn view_for(application: &Application, students: &HashMap<StudentId, Student>) -> ApplicationView {
    let student_name = students
        .get(&application.student_id)
        .map(Student::full_name)
        .unwrap_or_else(|| "unknown student".to_string());

    ApplicationView {
        id: application.id,
        student_id: application.student_id,
        student_name,
        academic_year: application.academic_year.clone(),
        room_type: application.room_type,
        status: application.status,
        status_label: application.status.label(),
        total_score: application.total_score,
        rank: application.rank,
        submitted_at: application.submitted_at,
    }
}

/// Error raised by the housing service.
#[derive(Debug, thiserror::Error)]
pub enum HousingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("student {} not found", .student.0)]
    StudentNotFound { student: StudentId },
    #[error("application {} not found", .application.0)]
    ApplicationNotFound { application: ApplicationId },
    #[error("criterion {} not found", .criterion.0)]
    CriterionNotFound { criterion: CriterionId },
    #[error("appeal {} not found", .appeal.0)]
    AppealNotFound { appeal: AppealId },
    #[error("active criteria weights total {active_total}%, adding {attempted}% would exceed 100%")]
    WeightBudgetExceeded { active_total: f64, attempted: f64 },
    #[error("application {} is {}, cannot move to {}", .application.0, .from.label(), .to.label())]
    InvalidStateTransition {
        application: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("appeal {} was already decided as {}", .appeal.0, .status.label())]
    AppealAlreadyDecided { appeal: AppealId, status: AppealStatus },
    #[error("application {} is {}, only rejected applications can be appealed", .application.0, .status.label())]
    InvalidAppealTarget {
        application: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("no candidate applications for academic year {year}")]
    NoCandidates { year: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input problems caught before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("academic_year is required")]
    MissingAcademicYear,
    #[error("appeal reason must not be empty")]
    EmptyAppealReason,
    #[error("a decision rationale is required")]
    MissingRationale,
    #[error("capacity must be at least 1")]
    InvalidCapacity,
    #[error("criterion name must not be empty")]
    MissingCriterionName,
    #[error("update contains no fields")]
    EmptyUpdate,
}
