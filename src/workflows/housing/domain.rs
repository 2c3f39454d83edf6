use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for students on the institution roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub u64);

/// Identifier wrapper for housing applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

/// Identifier wrapper for scoring criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CriterionId(pub u64);

/// Identifier wrapper for rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u64);

/// Identifier wrapper for dormitories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DormitoryId(pub u64);

/// Identifier wrapper for appeals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppealId(pub u64);

/// Identifier wrapper for notification log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub u64);

/// Roster entry holding the attributes scoring reads. Scoring never mutates
/// a student; profile edits arrive through the self-service update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub study_program: String,
    pub year_of_study: u8,
    pub grade_average: Option<f64>,
    pub distance_km: Option<f64>,
    pub household_income: Option<f64>,
    /// Zero means unknown; the income sub-score is skipped in that case.
    pub household_size: u32,
    pub disability: bool,
    pub social_situation: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One student's housing request for one academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub academic_year: String,
    pub room_type: RoomType,
    pub location_preference: Option<String>,
    pub status: ApplicationStatus,
    pub total_score: f64,
    pub rank: Option<u32>,
    pub decision_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub room_id: Option<RoomId>,
    pub allocated_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a housing application.
///
/// `new → processing → (evaluated) → approved | rejected → allocated` on the
/// happy path; `rejected → on_appeal → approved | rejected` via the appeal
/// workflow. Approved and rejected are decision states; allocated is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    New,
    Processing,
    Evaluated,
    Approved,
    Rejected,
    OnAppeal,
    Allocated,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::New => "new",
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Evaluated => "evaluated",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::OnAppeal => "on_appeal",
            ApplicationStatus::Allocated => "allocated",
        }
    }

    /// Statuses still competing for a spot; only these are rescored and ranked.
    pub const fn competing(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Processing | ApplicationStatus::Evaluated
        )
    }

    /// Student edits are only permitted before an admission decision.
    pub const fn editable(self) -> bool {
        matches!(self, ApplicationStatus::New | ApplicationStatus::Processing)
    }
}

/// Requested room category. Defaults to a double when the submission leaves
/// the choice open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Single,
    #[default]
    Double,
    Triple,
}

impl RoomType {
    pub const fn label(self) -> &'static str {
        match self {
            RoomType::Single => "single",
            RoomType::Double => "double",
            RoomType::Triple => "triple",
        }
    }
}

/// A named, weighted scoring rule. The sum of `weight_percent` over active
/// criteria never exceeds 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    pub description: Option<String>,
    pub kind: CriterionKind,
    pub max_points: f64,
    pub weight_percent: f64,
    pub status: CriterionStatus,
    pub created_at: DateTime<Utc>,
}

impl Criterion {
    pub fn is_active(&self) -> bool {
        self.status == CriterionStatus::Active
    }
}

/// Closed set of scoring formulas. Unknown tags deserialize to
/// `Unrecognized`, which always scores zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    AcademicPerformance,
    StudyYear,
    Socioeconomic,
    HealthDisadvantage,
    #[serde(other)]
    Unrecognized,
}

impl CriterionKind {
    pub const fn label(self) -> &'static str {
        match self {
            CriterionKind::AcademicPerformance => "academic_performance",
            CriterionKind::StudyYear => "study_year",
            CriterionKind::Socioeconomic => "socioeconomic",
            CriterionKind::HealthDisadvantage => "health_disadvantage",
            CriterionKind::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionStatus {
    Active,
    Inactive,
}

impl CriterionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CriterionStatus::Active => "active",
            CriterionStatus::Inactive => "inactive",
        }
    }
}

/// One criterion's computed points for one application. The stored set
/// reflects exactly the active criteria as of the last scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub application_id: ApplicationId,
    pub criterion_id: CriterionId,
    pub points: f64,
}

/// Room inventory entry. `free_capacity` is decremented by allocation only;
/// no release path exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub dormitory_id: DormitoryId,
    pub number: String,
    pub capacity: u32,
    pub occupied: u32,
    pub free_capacity: u32,
}

/// Dormitory with its aggregate free capacity across rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dormitory {
    pub id: DormitoryId,
    pub name: String,
    pub capacity: u32,
    pub free_capacity: u32,
}

/// A request to re-review a rejected application. The terminal status carries
/// the decision; `rationale` and `decided_at` are filled when it is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appeal {
    pub id: AppealId,
    pub application_id: ApplicationId,
    pub reason: String,
    pub status: AppealStatus,
    pub rationale: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Submitted,
    Processing,
    Approved,
    Rejected,
}

impl AppealStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AppealStatus::Submitted => "submitted",
            AppealStatus::Processing => "processing",
            AppealStatus::Approved => "approved",
            AppealStatus::Rejected => "rejected",
        }
    }

    pub const fn open(self) -> bool {
        matches!(self, AppealStatus::Submitted | AppealStatus::Processing)
    }
}

/// Append-only record of a message sent to a student. Never read back by the
/// scoring, ranking, or allocation logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub student_id: StudentId,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationUpdated,
    ApplicationApproved,
    ApplicationRejected,
    RoomAssigned,
    AppealSubmitted,
    AppealDecided,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::ApplicationUpdated => "application_updated",
            NotificationKind::ApplicationApproved => "application_approved",
            NotificationKind::ApplicationRejected => "application_rejected",
            NotificationKind::RoomAssigned => "room_assigned",
            NotificationKind::AppealSubmitted => "appeal_submitted",
            NotificationKind::AppealDecided => "appeal_decided",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// Compact listing row for admin and student overviews.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub student_name: String,
    pub academic_year: String,
    pub room_type: RoomType,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub total_score: f64,
    pub rank: Option<u32>,
    pub submitted_at: DateTime<Utc>,
}

/// Full display join of an application with its student, score breakdown,
/// and (after allocation) room assignment.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetailView {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub student_name: String,
    pub student_email: String,
    pub academic_year: String,
    pub room_type: RoomType,
    pub room_type_label: &'static str,
    pub location_preference: Option<String>,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub total_score: f64,
    pub rank: Option<u32>,
    pub decision_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_room: Option<AssignedRoomView>,
    pub score_lines: Vec<ScoreLineView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedRoomView {
    pub room_id: RoomId,
    pub room_number: String,
    pub dormitory: String,
    pub allocated_at: Option<DateTime<Utc>>,
}

/// One evaluation row joined with its criterion for display.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreLineView {
    pub criterion_id: CriterionId,
    pub criterion: String,
    pub kind: CriterionKind,
    pub weight_percent: f64,
    pub points: f64,
    pub weighted: f64,
}
