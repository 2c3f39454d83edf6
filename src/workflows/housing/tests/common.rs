use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::housing::criteria::CriterionDraft;
use crate::workflows::housing::domain::{
    Appeal, AppealId, Application, ApplicationId, Criterion, CriterionId, CriterionKind,
    Dormitory, DormitoryId, Evaluation, Notification, Room, RoomId, Student, StudentId,
};
use crate::workflows::housing::memory::MemoryStore;
use crate::workflows::housing::notify::{
    MemoryNotifications, NotificationDraft, NotificationSink, NotifyError,
};
use crate::workflows::housing::router::housing_router;
use crate::workflows::housing::service::{HousingService, SubmitApplication};
use crate::workflows::housing::store::{
    HousingStore, NewAppeal, NewApplication, NewCriterion, NewDormitory, NewRoom, NewStudent,
    StoreError,
};

pub(super) type TestService = HousingService<MemoryStore, MemoryNotifications>;

pub(super) const YEAR: &str = "2025/2026";

pub(super) fn build_service() -> (TestService, Arc<MemoryStore>, Arc<MemoryNotifications>) {
    let store = Arc::new(MemoryStore::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = HousingService::new(store.clone(), notifications.clone());
    (service, store, notifications)
}

/// Neutral roster entry: first-year Informatics student with nothing that
/// would earn points. Tests flip exactly the attributes they exercise.
pub(super) fn student_fixture(first_name: &str, last_name: &str) -> NewStudent {
    NewStudent {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!(
            "{}.{}@student.uni.sk",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ),
        study_program: "Informatics".to_string(),
        year_of_study: 1,
        grade_average: None,
        distance_km: None,
        household_income: None,
        household_size: 0,
        disability: false,
        social_situation: None,
    }
}

/// The production rubric: four active criteria filling the whole 100% weight
/// budget.
pub(super) fn seed_standard_criteria<S, N>(service: &HousingService<S, N>) -> Vec<Criterion>
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    [
        ("Academic results", CriterionKind::AcademicPerformance, 25.0),
        ("Year of study", CriterionKind::StudyYear, 25.0),
        ("Socioeconomic situation", CriterionKind::Socioeconomic, 30.0),
        ("Health disadvantage", CriterionKind::HealthDisadvantage, 20.0),
    ]
    .into_iter()
    .map(|(name, kind, weight_percent)| {
        service
            .create_criterion(CriterionDraft {
                name: name.to_string(),
                description: None,
                kind,
                max_points: 100.0,
                weight_percent,
                status: None,
            })
            .expect("criterion accepted")
    })
    .collect()
}

/// Two dormitories, four beds: "Juhas A" with rooms 101 (two free) and 102
/// (one free), "Pavilion B" with room 201 (one free).
pub(super) fn seed_rooms(store: &MemoryStore) -> (Dormitory, Dormitory) {
    let juhas = store
        .insert_dormitory(NewDormitory {
            name: "Juhas A".to_string(),
            capacity: 5,
            free_capacity: 3,
        })
        .expect("dormitory accepted");
    for (number, capacity, occupied) in [("101", 2, 0), ("102", 3, 2)] {
        store
            .insert_room(NewRoom {
                dormitory_id: juhas.id,
                number: number.to_string(),
                capacity,
                occupied,
            })
            .expect("room accepted");
    }

    let pavilion = store
        .insert_dormitory(NewDormitory {
            name: "Pavilion B".to_string(),
            capacity: 2,
            free_capacity: 1,
        })
        .expect("dormitory accepted");
    store
        .insert_room(NewRoom {
            dormitory_id: pavilion.id,
            number: "201".to_string(),
            capacity: 2,
            occupied: 1,
        })
        .expect("room accepted");

    (juhas, pavilion)
}

pub(super) fn submit_for<S, N>(
    service: &HousingService<S, N>,
    student: StudentId,
    academic_year: &str,
) -> Application
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    service
        .submit_application(SubmitApplication {
            student_id: student,
            academic_year: academic_year.to_string(),
            room_type: None,
            location_preference: None,
        })
        .expect("submission accepted")
}

pub(super) fn housing_router_with_service(service: TestService) -> axum::Router {
    housing_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct FailingSink;

impl NotificationSink for FailingSink {
    fn enqueue(&self, _draft: NotificationDraft) -> Result<Notification, NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

impl HousingStore for UnavailableStore {
    fn insert_student(&self, _student: NewStudent) -> Result<Student, StoreError> {
        Err(offline())
    }

    fn student(&self, _id: StudentId) -> Result<Option<Student>, StoreError> {
        Err(offline())
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        Err(offline())
    }

    fn update_student(&self, _student: Student) -> Result<(), StoreError> {
        Err(offline())
    }

    fn insert_application(
        &self,
        _application: NewApplication,
    ) -> Result<Application, StoreError> {
        Err(offline())
    }

    fn application(&self, _id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Err(offline())
    }

    fn applications(&self) -> Result<Vec<Application>, StoreError> {
        Err(offline())
    }

    fn applications_for_student(
        &self,
        _student: StudentId,
    ) -> Result<Vec<Application>, StoreError> {
        Err(offline())
    }

    fn update_application(&self, _application: Application) -> Result<(), StoreError> {
        Err(offline())
    }

    fn insert_criterion(&self, _criterion: NewCriterion) -> Result<Criterion, StoreError> {
        Err(offline())
    }

    fn criterion(&self, _id: CriterionId) -> Result<Option<Criterion>, StoreError> {
        Err(offline())
    }

    fn criteria(&self) -> Result<Vec<Criterion>, StoreError> {
        Err(offline())
    }

    fn update_criterion(&self, _criterion: Criterion) -> Result<(), StoreError> {
        Err(offline())
    }

    fn replace_evaluations(
        &self,
        _application: ApplicationId,
        _rows: Vec<Evaluation>,
    ) -> Result<(), StoreError> {
        Err(offline())
    }

    fn evaluations_for(
        &self,
        _application: ApplicationId,
    ) -> Result<Vec<Evaluation>, StoreError> {
        Err(offline())
    }

    fn insert_dormitory(&self, _dormitory: NewDormitory) -> Result<Dormitory, StoreError> {
        Err(offline())
    }

    fn dormitory(&self, _id: DormitoryId) -> Result<Option<Dormitory>, StoreError> {
        Err(offline())
    }

    fn dormitories(&self) -> Result<Vec<Dormitory>, StoreError> {
        Err(offline())
    }

    fn update_dormitory(&self, _dormitory: Dormitory) -> Result<(), StoreError> {
        Err(offline())
    }

    fn insert_room(&self, _room: NewRoom) -> Result<Room, StoreError> {
        Err(offline())
    }

    fn room(&self, _id: RoomId) -> Result<Option<Room>, StoreError> {
        Err(offline())
    }

    fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        Err(offline())
    }

    fn update_room(&self, _room: Room) -> Result<(), StoreError> {
        Err(offline())
    }

    fn insert_appeal(&self, _appeal: NewAppeal) -> Result<Appeal, StoreError> {
        Err(offline())
    }

    fn appeal(&self, _id: AppealId) -> Result<Option<Appeal>, StoreError> {
        Err(offline())
    }

    fn appeals(&self) -> Result<Vec<Appeal>, StoreError> {
        Err(offline())
    }

    fn appeals_for_application(
        &self,
        _application: ApplicationId,
    ) -> Result<Vec<Appeal>, StoreError> {
        Err(offline())
    }

    fn update_appeal(&self, _appeal: Appeal) -> Result<(), StoreError> {
        Err(offline())
    }
}
