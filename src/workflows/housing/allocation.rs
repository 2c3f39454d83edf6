use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Dormitory, DormitoryId, NotificationKind, Room,
    RoomId, StudentId,
};
use super::notify::{NotificationDraft, NotificationSink};
use super::service::{HousingError, HousingService, ValidationError};
use super::store::HousingStore;

/// Parameters for an allocation run.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationRequest {
    pub academic_year: String,
}

/// One room assignment made during a run.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    pub application_id: ApplicationId,
    pub student_id: StudentId,
    pub room_id: RoomId,
    pub room_number: String,
    pub dormitory: String,
}

/// Outcome of one allocation run. Candidates without a matching room stay
/// approved and are simply counted.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationSummary {
    pub academic_year: String,
    pub candidates: usize,
    pub allocated: usize,
    pub unallocated: usize,
    pub assignments: Vec<AssignmentView>,
}

impl<S, N> HousingService<S, N>
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    /// Match approved applications to room inventory, best rank first. Each
    /// candidate takes the room with the most free beds among those matching
    /// its dormitory preference. Every assignment changes availability for
    /// the next candidate, so the loop must stay sequential in rank order.
    pub fn allocate_rooms(
        &self,
        request: AllocationRequest,
    ) -> Result<AllocationSummary, HousingError> {
        let academic_year = request.academic_year.trim();
        if academic_year.is_empty() {
            return Err(ValidationError::MissingAcademicYear.into());
        }

        let mut candidates: Vec<Application> = self
            .store
            .applications()?
            .into_iter()
            .filter(|application| {
                application.status == ApplicationStatus::Approved
                    && application.academic_year == academic_year
            })
            .collect();
        if candidates.is_empty() {
            return Err(HousingError::NoCandidates {
                year: academic_year.to_string(),
            });
        }
        candidates.sort_by(|a, b| match (a.rank, b.rank) {
            (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });

        let mut rooms: Vec<Room> = self.store.rooms()?;
        let mut dormitories: HashMap<DormitoryId, Dormitory> = self
            .store
            .dormitories()?
            .into_iter()
            .map(|dormitory| (dormitory.id, dormitory))
            .collect();

        let mut summary = AllocationSummary {
            academic_year: academic_year.to_string(),
            candidates: candidates.len(),
            allocated: 0,
            unallocated: 0,
            assignments: Vec::new(),
        };

        for mut application in candidates {
            let choice = rooms
                .iter()
                .enumerate()
                .filter(|(_, room)| {
                    room.free_capacity > 0
                        && preference_matches(
                            application.location_preference.as_deref(),
                            dormitories.get(&room.dormitory_id),
                        )
                })
                .max_by(|(_, a), (_, b)| {
                    a.free_capacity
                        .cmp(&b.free_capacity)
                        .then_with(|| b.id.cmp(&a.id))
                })
                .map(|(index, _)| index);

            let Some(room_index) = choice else {
                warn!(
                    application = application.id.0,
                    "no room with free capacity matches, candidate left unallocated"
                );
                summary.unallocated += 1;
                continue;
            };

            {
                let room = &mut rooms[room_index];
                room.free_capacity -= 1;
                room.occupied += 1;
            }
            let room = rooms[room_index].clone();
            self.store.update_room(room.clone())?;

            let dormitory_name = match dormitories.get_mut(&room.dormitory_id) {
                Some(dormitory) => {
                    dormitory.free_capacity = dormitory.free_capacity.saturating_sub(1);
                    self.store.update_dormitory(dormitory.clone())?;
                    dormitory.name.clone()
                }
                None => "unknown dormitory".to_string(),
            };

            application.room_id = Some(room.id);
            application.status = ApplicationStatus::Allocated;
            application.allocated_at = Some(Utc::now());
            self.store.update_application(application.clone())?;

            self.notify(NotificationDraft {
                student_id: application.student_id,
                kind: NotificationKind::RoomAssigned,
                subject: "Dormitory room assigned".to_string(),
                body: format!(
                    "You have been assigned room {} in {}.",
                    room.number, dormitory_name
                ),
            });

            summary.assignments.push(AssignmentView {
                application_id: application.id,
                student_id: application.student_id,
                room_id: room.id,
                room_number: room.number,
                dormitory: dormitory_name,
            });
            summary.allocated += 1;
        }

        Ok(summary)
    }
}

fn preference_matches(preference: Option<&str>, dormitory: Option<&Dormitory>) -> bool {
    match preference {
        None => true,
        Some(name) => dormitory.map_or(false, |dormitory| dormitory.name == name),
    }
}
