use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    Appeal, AppealId, AppealStatus, Application, ApplicationId, ApplicationStatus, Criterion,
    CriterionId, Dormitory, DormitoryId, Evaluation, Room, RoomId, Student, StudentId,
};
use super::store::{
    HousingStore, NewAppeal, NewApplication, NewCriterion, NewDormitory, NewRoom, NewStudent,
    StoreError,
};

/// In-memory store used by the server, the demo command, and tests. A single
/// mutex keeps every call atomic, matching the per-statement guarantee the
/// trait promises.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    last_id: u64,
    students: HashMap<StudentId, Student>,
    applications: HashMap<ApplicationId, Application>,
    criteria: HashMap<CriterionId, Criterion>,
    evaluations: HashMap<ApplicationId, Vec<Evaluation>>,
    dormitories: HashMap<DormitoryId, Dormitory>,
    rooms: HashMap<RoomId, Room>,
    appeals: HashMap<AppealId, Appeal>,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

impl HousingStore for MemoryStore {
    fn insert_student(&self, student: NewStudent) -> Result<Student, StoreError> {
        let mut inner = self.lock();
        let id = StudentId(inner.next_id());
        let student = Student {
            id,
            first_name: student.first_name,
            last_name: student.last_name,
            email: student.email,
            study_program: student.study_program,
            year_of_study: student.year_of_study,
            grade_average: student.grade_average,
            distance_km: student.distance_km,
            household_income: student.household_income,
            household_size: student.household_size,
            disability: student.disability,
            social_situation: student.social_situation,
        };
        inner.students.insert(id, student.clone());
        Ok(student)
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.lock().students.get(&id).cloned())
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        let inner = self.lock();
        let mut students: Vec<Student> = inner.students.values().cloned().collect();
        students.sort_by_key(|student| student.id);
        Ok(students)
    }

    fn update_student(&self, student: Student) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.students.contains_key(&student.id) {
            return Err(StoreError::NotFound);
        }
        inner.students.insert(student.id, student);
        Ok(())
    }

    fn insert_application(&self, application: NewApplication) -> Result<Application, StoreError> {
        let mut inner = self.lock();
        // Uniqueness for (student, academic year) lives inside the insert
        // critical section so concurrent submissions cannot race past it.
        let duplicate = inner.applications.values().any(|existing| {
            existing.student_id == application.student_id
                && existing.academic_year == application.academic_year
        });
        if duplicate {
            return Err(StoreError::DuplicateApplication {
                student: application.student_id,
                academic_year: application.academic_year,
            });
        }

        let id = ApplicationId(inner.next_id());
        let application = Application {
            id,
            student_id: application.student_id,
            academic_year: application.academic_year,
            room_type: application.room_type,
            location_preference: application.location_preference,
            status: ApplicationStatus::New,
            total_score: 0.0,
            rank: None,
            decision_note: None,
            submitted_at: application.submitted_at,
            room_id: None,
            allocated_at: None,
        };
        inner.applications.insert(id, application.clone());
        Ok(application)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.lock().applications.get(&id).cloned())
    }

    fn applications(&self) -> Result<Vec<Application>, StoreError> {
        let inner = self.lock();
        let mut applications: Vec<Application> = inner.applications.values().cloned().collect();
        applications.sort_by_key(|application| application.id);
        Ok(applications)
    }

    fn applications_for_student(
        &self,
        student: StudentId,
    ) -> Result<Vec<Application>, StoreError> {
        let inner = self.lock();
        let mut applications: Vec<Application> = inner
            .applications
            .values()
            .filter(|application| application.student_id == student)
            .cloned()
            .collect();
        applications.sort_by_key(|application| application.id);
        Ok(applications)
    }

    fn update_application(&self, application: Application) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.applications.contains_key(&application.id) {
            return Err(StoreError::NotFound);
        }
        inner.applications.insert(application.id, application);
        Ok(())
    }

    fn insert_criterion(&self, criterion: NewCriterion) -> Result<Criterion, StoreError> {
        let mut inner = self.lock();
        let id = CriterionId(inner.next_id());
        let criterion = Criterion {
            id,
            name: criterion.name,
            description: criterion.description,
            kind: criterion.kind,
            max_points: criterion.max_points,
            weight_percent: criterion.weight_percent,
            status: criterion.status,
            created_at: criterion.created_at,
        };
        inner.criteria.insert(id, criterion.clone());
        Ok(criterion)
    }

    fn criterion(&self, id: CriterionId) -> Result<Option<Criterion>, StoreError> {
        Ok(self.lock().criteria.get(&id).cloned())
    }

    fn criteria(&self) -> Result<Vec<Criterion>, StoreError> {
        let inner = self.lock();
        let mut criteria: Vec<Criterion> = inner.criteria.values().cloned().collect();
        criteria.sort_by_key(|criterion| criterion.id);
        Ok(criteria)
    }

    fn update_criterion(&self, criterion: Criterion) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.criteria.contains_key(&criterion.id) {
            return Err(StoreError::NotFound);
        }
        inner.criteria.insert(criterion.id, criterion);
        Ok(())
    }

    fn replace_evaluations(
        &self,
        application: ApplicationId,
        rows: Vec<Evaluation>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.applications.contains_key(&application) {
            return Err(StoreError::NotFound);
        }
        inner.evaluations.insert(application, rows);
        Ok(())
    }

    fn evaluations_for(&self, application: ApplicationId) -> Result<Vec<Evaluation>, StoreError> {
        Ok(self
            .lock()
            .evaluations
            .get(&application)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_dormitory(&self, dormitory: NewDormitory) -> Result<Dormitory, StoreError> {
        let mut inner = self.lock();
        let id = DormitoryId(inner.next_id());
        let dormitory = Dormitory {
            id,
            name: dormitory.name,
            capacity: dormitory.capacity,
            free_capacity: dormitory.free_capacity,
        };
        inner.dormitories.insert(id, dormitory.clone());
        Ok(dormitory)
    }

    fn dormitory(&self, id: DormitoryId) -> Result<Option<Dormitory>, StoreError> {
        Ok(self.lock().dormitories.get(&id).cloned())
    }

    fn dormitories(&self) -> Result<Vec<Dormitory>, StoreError> {
        let inner = self.lock();
        let mut dormitories: Vec<Dormitory> = inner.dormitories.values().cloned().collect();
        dormitories.sort_by_key(|dormitory| dormitory.id);
        Ok(dormitories)
    }

    fn update_dormitory(&self, dormitory: Dormitory) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.dormitories.contains_key(&dormitory.id) {
            return Err(StoreError::NotFound);
        }
        inner.dormitories.insert(dormitory.id, dormitory);
        Ok(())
    }

    fn insert_room(&self, room: NewRoom) -> Result<Room, StoreError> {
        let mut inner = self.lock();
        if !inner.dormitories.contains_key(&room.dormitory_id) {
            return Err(StoreError::NotFound);
        }
        let id = RoomId(inner.next_id());
        let room = Room {
            id,
            dormitory_id: room.dormitory_id,
            number: room.number,
            capacity: room.capacity,
            occupied: room.occupied,
            free_capacity: room.capacity.saturating_sub(room.occupied),
        };
        inner.rooms.insert(id, room.clone());
        Ok(room)
    }

    fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.lock().rooms.get(&id).cloned())
    }

    fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        let inner = self.lock();
        let mut rooms: Vec<Room> = inner.rooms.values().cloned().collect();
        rooms.sort_by_key(|room| room.id);
        Ok(rooms)
    }

    fn update_room(&self, room: Room) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.rooms.contains_key(&room.id) {
            return Err(StoreError::NotFound);
        }
        inner.rooms.insert(room.id, room);
        Ok(())
    }

    fn insert_appeal(&self, appeal: NewAppeal) -> Result<Appeal, StoreError> {
        let mut inner = self.lock();
        if !inner.applications.contains_key(&appeal.application_id) {
            return Err(StoreError::NotFound);
        }
        let id = AppealId(inner.next_id());
        let appeal = Appeal {
            id,
            application_id: appeal.application_id,
            reason: appeal.reason,
            status: AppealStatus::Submitted,
            rationale: None,
            submitted_at: appeal.submitted_at,
            decided_at: None,
        };
        inner.appeals.insert(id, appeal.clone());
        Ok(appeal)
    }

    fn appeal(&self, id: AppealId) -> Result<Option<Appeal>, StoreError> {
        Ok(self.lock().appeals.get(&id).cloned())
    }

    fn appeals(&self) -> Result<Vec<Appeal>, StoreError> {
        let inner = self.lock();
        let mut appeals: Vec<Appeal> = inner.appeals.values().cloned().collect();
        appeals.sort_by_key(|appeal| appeal.id);
        Ok(appeals)
    }

    fn appeals_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Appeal>, StoreError> {
        let inner = self.lock();
        let mut appeals: Vec<Appeal> = inner
            .appeals
            .values()
            .filter(|appeal| appeal.application_id == application)
            .cloned()
            .collect();
        appeals.sort_by_key(|appeal| appeal.id);
        Ok(appeals)
    }

    fn update_appeal(&self, appeal: Appeal) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.appeals.contains_key(&appeal.id) {
            return Err(StoreError::NotFound);
        }
        inner.appeals.insert(appeal.id, appeal);
        Ok(())
    }
}
