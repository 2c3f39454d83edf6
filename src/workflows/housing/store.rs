use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Appeal, AppealId, Application, ApplicationId, Criterion, CriterionId, CriterionKind,
    CriterionStatus, Dormitory, DormitoryId, Evaluation, Room, RoomId, RoomType, Student,
    StudentId,
};

/// Storage abstraction for the housing pipeline. Implementations guarantee
/// per-call atomicity only; multi-call operations observe intermediate states.
pub trait HousingStore: Send + Sync {
    fn insert_student(&self, student: NewStudent) -> Result<Student, StoreError>;
    fn student(&self, id: StudentId) -> Result<Option<Student>, StoreError>;
    fn students(&self) -> Result<Vec<Student>, StoreError>;
    fn update_student(&self, student: Student) -> Result<(), StoreError>;

    /// Inserts a new application in its initial state. The (student,
    /// academic year) uniqueness constraint is enforced inside this call.
    fn insert_application(&self, application: NewApplication) -> Result<Application, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;
    fn applications(&self) -> Result<Vec<Application>, StoreError>;
    fn applications_for_student(&self, student: StudentId)
        -> Result<Vec<Application>, StoreError>;
    fn update_application(&self, application: Application) -> Result<(), StoreError>;

    fn insert_criterion(&self, criterion: NewCriterion) -> Result<Criterion, StoreError>;
    fn criterion(&self, id: CriterionId) -> Result<Option<Criterion>, StoreError>;
    fn criteria(&self) -> Result<Vec<Criterion>, StoreError>;
    fn update_criterion(&self, criterion: Criterion) -> Result<(), StoreError>;

    /// Swaps in the full evaluation set for an application so the stored rows
    /// always mirror the criteria used by the latest scoring run.
    fn replace_evaluations(
        &self,
        application: ApplicationId,
        rows: Vec<Evaluation>,
    ) -> Result<(), StoreError>;
    fn evaluations_for(&self, application: ApplicationId) -> Result<Vec<Evaluation>, StoreError>;

    fn insert_dormitory(&self, dormitory: NewDormitory) -> Result<Dormitory, StoreError>;
    fn dormitory(&self, id: DormitoryId) -> Result<Option<Dormitory>, StoreError>;
    fn dormitories(&self) -> Result<Vec<Dormitory>, StoreError>;
    fn update_dormitory(&self, dormitory: Dormitory) -> Result<(), StoreError>;

    fn insert_room(&self, room: NewRoom) -> Result<Room, StoreError>;
    fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;
    fn rooms(&self) -> Result<Vec<Room>, StoreError>;
    fn update_room(&self, room: Room) -> Result<(), StoreError>;

    fn insert_appeal(&self, appeal: NewAppeal) -> Result<Appeal, StoreError>;
    fn appeal(&self, id: AppealId) -> Result<Option<Appeal>, StoreError>;
    fn appeals(&self) -> Result<Vec<Appeal>, StoreError>;
    fn appeals_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Appeal>, StoreError>;
    fn update_appeal(&self, appeal: Appeal) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("student {} already has an application for {academic_year}", .student.0)]
    DuplicateApplication {
        student: StudentId,
        academic_year: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Roster entry before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub study_program: String,
    pub year_of_study: u8,
    #[serde(default)]
    pub grade_average: Option<f64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub household_income: Option<f64>,
    #[serde(default)]
    pub household_size: u32,
    #[serde(default)]
    pub disability: bool,
    #[serde(default)]
    pub social_situation: Option<String>,
}

/// Application row before insertion; the store assigns the id and starts the
/// lifecycle in the `new` state with no score or rank.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub student_id: StudentId,
    pub academic_year: String,
    pub room_type: RoomType,
    pub location_preference: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCriterion {
    pub name: String,
    pub description: Option<String>,
    pub kind: CriterionKind,
    pub max_points: f64,
    pub weight_percent: f64,
    pub status: CriterionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDormitory {
    pub name: String,
    pub capacity: u32,
    pub free_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoom {
    pub dormitory_id: DormitoryId,
    pub number: String,
    pub capacity: u32,
    pub occupied: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppeal {
    pub application_id: ApplicationId,
    pub reason: String,
    pub submitted_at: DateTime<Utc>,
}
