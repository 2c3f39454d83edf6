use std::sync::Arc;

use housing_desk::workflows::housing::{
    AdmissionDecision, AdmissionRequest, AllocationRequest, AppealDecision, AppealRequest,
    AppealRuling, AppealStatus, Application, ApplicationStatus, CriterionDraft, CriterionKind,
    DecisionEntry, Dormitory, HousingError, HousingService, HousingStore, MemoryNotifications,
    MemoryStore, NewDormitory, NewRoom, NewStudent, NotificationKind, Student, SubmitApplication,
};

type DeskService = HousingService<MemoryStore, MemoryNotifications>;

const YEAR: &str = "2025/2026";

fn desk() -> (DeskService, Arc<MemoryStore>, Arc<MemoryNotifications>) {
    let store = Arc::new(MemoryStore::default());
    let sink = Arc::new(MemoryNotifications::default());
    let service = HousingService::new(Arc::clone(&store), Arc::clone(&sink));
    (service, store, sink)
}

fn rubric(service: &DeskService) {
    let drafts = [
        ("Academic results", CriterionKind::AcademicPerformance, 25.0),
        ("Year of study", CriterionKind::StudyYear, 25.0),
        ("Socioeconomic situation", CriterionKind::Socioeconomic, 30.0),
        ("Health disadvantage", CriterionKind::HealthDisadvantage, 20.0),
    ];
    for (name, kind, weight_percent) in drafts {
        service
            .create_criterion(CriterionDraft {
                name: name.to_string(),
                description: None,
                kind,
                max_points: 100.0,
                weight_percent,
                status: None,
            })
            .expect("criterion accepted");
    }
}

fn enroll(service: &DeskService, first: &str, last: &str, average: f64) -> Student {
    service
        .register_student(NewStudent {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@student.uni.sk", first, last).to_lowercase(),
            study_program: "Informatics".to_string(),
            year_of_study: 1,
            grade_average: Some(average),
            distance_km: None,
            household_income: None,
            household_size: 0,
            disability: false,
            social_situation: None,
        })
        .expect("student accepted")
}

fn apply(service: &DeskService, student: &Student) -> Application {
    service
        .submit_application(SubmitApplication {
            student_id: student.id,
            academic_year: YEAR.to_string(),
            room_type: None,
            location_preference: None,
        })
        .expect("application accepted")
}

fn seed_inventory(store: &MemoryStore, beds: &[u32]) -> Dormitory {
    let capacity: u32 = beds.iter().sum();
    let dormitory = store
        .insert_dormitory(NewDormitory {
            name: "Mladost".to_string(),
            capacity,
            free_capacity: capacity,
        })
        .expect("dormitory seeded");
    for (index, bed_count) in beds.iter().enumerate() {
        store
            .insert_room(NewRoom {
                dormitory_id: dormitory.id,
                number: format!("{}", 101 + index),
                capacity: *bed_count,
                occupied: 0,
            })
            .expect("room seeded");
    }
    dormitory
}

#[test]
fn admission_cycle_scores_ranks_and_allocates_in_order() {
    let (service, store, sink) = desk();
    rubric(&service);
    seed_inventory(&store, &[1, 1]);

    let strong = enroll(&service, "Maria", "Bielikova", 1.0);
    let middle = enroll(&service, "Tomas", "Krajci", 2.0);
    let weak = enroll(&service, "Lucia", "Svecova", 3.0);
    let strong_app = apply(&service, &strong);
    let middle_app = apply(&service, &middle);
    let weak_app = apply(&service, &weak);

    let written = service.refresh_rankings().expect("ranking refresh runs");
    assert_eq!(written, 3, "every competing application gets a rank");

    let ranked = |id| service.application(id).expect("application readable");
    assert_eq!(ranked(strong_app.id).rank, Some(1));
    assert_eq!(ranked(middle_app.id).rank, Some(2));
    assert_eq!(ranked(weak_app.id).rank, Some(3));

    let proposal = service
        .propose_admission(AdmissionRequest {
            academic_year: YEAR.to_string(),
            capacity: 2,
        })
        .expect("proposal computed");
    assert_eq!(proposal.approved, 2);
    assert_eq!(proposal.rejected, 1);
    assert_eq!(proposal.entries[0].student_name, "Maria Bielikova");

    let decisions = proposal
        .entries
        .iter()
        .map(|entry| DecisionEntry {
            application_id: entry.application_id,
            decision: entry.proposed,
            note: None,
        })
        .collect();
    service
        .confirm_admission(decisions)
        .expect("confirmation applied");

    let allocation = service
        .allocate_rooms(AllocationRequest {
            academic_year: YEAR.to_string(),
        })
        .expect("allocation runs");
    assert_eq!(allocation.allocated, 2);
    assert_eq!(allocation.unallocated, 0);
    assert_eq!(allocation.assignments[0].application_id, strong_app.id);
    assert_eq!(allocation.assignments[0].room_number, "101");
    assert_eq!(allocation.assignments[1].application_id, middle_app.id);
    assert_eq!(allocation.assignments[1].room_number, "102");

    assert_eq!(ranked(strong_app.id).status, ApplicationStatus::Allocated);
    assert_eq!(ranked(middle_app.id).status, ApplicationStatus::Allocated);
    assert_eq!(ranked(weak_app.id).status, ApplicationStatus::Rejected);

    let events = sink.events();
    let count = |kind| events.iter().filter(|event| event.kind == kind).count();
    assert_eq!(count(NotificationKind::ApplicationApproved), 2);
    assert_eq!(count(NotificationKind::ApplicationRejected), 1);
    assert_eq!(count(NotificationKind::RoomAssigned), 2);
}

#[test]
fn successful_appeal_returns_the_candidate_to_the_allocation_pool() {
    let (service, store, sink) = desk();
    rubric(&service);
    seed_inventory(&store, &[1, 1]);

    let winner = enroll(&service, "Maria", "Bielikova", 1.5);
    let loser = enroll(&service, "Lucia", "Svecova", 3.5);
    let winner_app = apply(&service, &winner);
    let loser_app = apply(&service, &loser);

    service
        .confirm_admission(vec![
            DecisionEntry {
                application_id: winner_app.id,
                decision: AdmissionDecision::Approved,
                note: None,
            },
            DecisionEntry {
                application_id: loser_app.id,
                decision: AdmissionDecision::Rejected,
                note: Some("Below the capacity cut".to_string()),
            },
        ])
        .expect("confirmation applied");
    service
        .allocate_rooms(AllocationRequest {
            academic_year: YEAR.to_string(),
        })
        .expect("first allocation runs");

    let appeal = service
        .submit_appeal(AppealRequest {
            application_id: loser_app.id,
            reason: "Household income dropped after the deadline.".to_string(),
        })
        .expect("appeal accepted");
    assert_eq!(appeal.status, AppealStatus::Processing);
    assert_eq!(
        service
            .application(loser_app.id)
            .expect("application readable")
            .status,
        ApplicationStatus::OnAppeal
    );

    let rationale = "Documented change in family circumstances.";
    let decided = service
        .decide_appeal(
            appeal.id,
            AppealRuling {
                decision: AppealDecision::Approved,
                rationale: rationale.to_string(),
            },
        )
        .expect("appeal decided");
    assert_eq!(decided.status, AppealStatus::Approved);

    let second_run = service
        .allocate_rooms(AllocationRequest {
            academic_year: YEAR.to_string(),
        })
        .expect("second allocation runs");
    assert_eq!(second_run.allocated, 1);
    assert_eq!(second_run.assignments[0].application_id, loser_app.id);
    assert_eq!(second_run.assignments[0].room_number, "102");
    assert_eq!(
        service
            .application(loser_app.id)
            .expect("application readable")
            .status,
        ApplicationStatus::Allocated
    );

    let appeal_notice = sink
        .events()
        .into_iter()
        .find(|event| event.kind == NotificationKind::AppealDecided)
        .expect("appeal decision notified");
    assert!(
        appeal_notice.body.contains(rationale),
        "decision notice quotes the rationale"
    );
}

#[test]
fn criteria_budget_violations_leave_the_registry_unchanged() {
    let (service, _, _) = desk();
    rubric(&service);

    let rejected = service.create_criterion(CriterionDraft {
        name: "Extra merit".to_string(),
        description: None,
        kind: CriterionKind::AcademicPerformance,
        max_points: 100.0,
        weight_percent: 5.0,
        status: None,
    });
    match rejected {
        Err(HousingError::WeightBudgetExceeded {
            active_total,
            attempted,
        }) => {
            assert_eq!(active_total, 100.0);
            assert_eq!(attempted, 5.0);
        }
        other => panic!("expected a weight budget rejection, got {other:?}"),
    }

    let registry = service.criteria(None).expect("criteria listable");
    assert_eq!(registry.len(), 4, "failed create must not insert a row");
}
