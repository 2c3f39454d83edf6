use std::sync::Arc;

use chrono::Utc;

use super::common::*;

use crate::workflows::housing::admission::{AdmissionDecision, DecisionEntry};
use crate::workflows::housing::domain::{
    ApplicationStatus, CriterionKind, NotificationKind, RoomType, StudentId,
};
use crate::workflows::housing::memory::MemoryStore;
use crate::workflows::housing::scoring::RescoreScope;
use crate::workflows::housing::service::{
    ApplicationFilter, ApplicationUpdate, HousingError, HousingService, StudentUpdate,
    SubmitApplication, ValidationError,
};
use crate::workflows::housing::store::{HousingStore, NewApplication, StoreError};

#[test]
fn submission_scores_ranks_and_notifies() {
    let (service, store, notifications) = build_service();
    seed_standard_criteria(&service);
    let mut student = student_fixture("Maria", "Bielikova");
    student.grade_average = Some(2.0);
    let student = service.register_student(student).expect("student accepted");

    let application = submit_for(&service, student.id, YEAR);

    assert_eq!(application.status, ApplicationStatus::Processing);
    assert_eq!(application.total_score, 17.5);
    assert_eq!(application.rank, Some(1));

    let evaluations = store
        .evaluations_for(application.id)
        .expect("evaluations stored");
    assert_eq!(evaluations.len(), 4);

    let events = notifications.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, NotificationKind::ApplicationReceived);
    assert_eq!(events[0].student_id, student.id);
}

#[test]
fn duplicate_submissions_for_a_year_conflict() {
    let (service, _, _) = build_service();
    seed_standard_criteria(&service);
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");
    submit_for(&service, student.id, YEAR);

    let outcome = service.submit_application(SubmitApplication {
        student_id: student.id,
        academic_year: YEAR.to_string(),
        room_type: None,
        location_preference: None,
    });
    match outcome {
        Err(HousingError::Store(StoreError::DuplicateApplication {
            student: id,
            academic_year,
        })) => {
            assert_eq!(id, student.id);
            assert_eq!(academic_year, YEAR);
        }
        other => panic!("expected duplicate rejection, got {other:?}"),
    }

    // A different year is a fresh request.
    submit_for(&service, student.id, "2026/2027");
}

#[test]
fn submission_requires_a_known_student() {
    let (service, _, _) = build_service();

    match service.submit_application(SubmitApplication {
        student_id: StudentId(77),
        academic_year: YEAR.to_string(),
        room_type: None,
        location_preference: None,
    }) {
        Err(HousingError::StudentNotFound { student }) => assert_eq!(student, StudentId(77)),
        other => panic!("expected student not found, got {other:?}"),
    }
}

#[test]
fn submission_requires_an_academic_year() {
    let (service, _, _) = build_service();
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");

    match service.submit_application(SubmitApplication {
        student_id: student.id,
        academic_year: "   ".to_string(),
        room_type: None,
        location_preference: None,
    }) {
        Err(HousingError::Validation(ValidationError::MissingAcademicYear)) => {}
        other => panic!("expected academic year rejection, got {other:?}"),
    }
}

#[test]
fn application_updates_require_fields_and_an_editable_status() {
    let (service, _, _) = build_service();
    seed_standard_criteria(&service);
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");
    let application = submit_for(&service, student.id, YEAR);

    match service.update_application(application.id, ApplicationUpdate::default()) {
        Err(HousingError::Validation(ValidationError::EmptyUpdate)) => {}
        other => panic!("expected empty update rejection, got {other:?}"),
    }

    service
        .confirm_admission(vec![DecisionEntry {
            application_id: application.id,
            decision: AdmissionDecision::Approved,
            note: None,
        }])
        .expect("confirmation accepted");

    match service.update_application(
        application.id,
        ApplicationUpdate {
            room_type: Some(RoomType::Single),
            ..ApplicationUpdate::default()
        },
    ) {
        Err(HousingError::InvalidStateTransition { from, .. }) => {
            assert_eq!(from, ApplicationStatus::Approved);
        }
        other => panic!("expected state transition rejection, got {other:?}"),
    }
}

#[test]
fn application_updates_apply_fields_and_notify() {
    let (service, _, notifications) = build_service();
    seed_standard_criteria(&service);
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");
    let application = submit_for(&service, student.id, YEAR);

    let updated = service
        .update_application(
            application.id,
            ApplicationUpdate {
                room_type: Some(RoomType::Single),
                location_preference: Some("Juhas A".to_string()),
            },
        )
        .expect("update accepted");

    assert_eq!(updated.room_type, RoomType::Single);
    assert_eq!(updated.location_preference.as_deref(), Some("Juhas A"));
    assert_eq!(updated.status, ApplicationStatus::Processing);
    assert!(notifications
        .events()
        .iter()
        .any(|event| event.kind == NotificationKind::ApplicationUpdated));
}

#[test]
fn blank_location_preferences_clear_the_field() {
    let (service, _, _) = build_service();
    seed_standard_criteria(&service);
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");

    let application = service
        .submit_application(SubmitApplication {
            student_id: student.id,
            academic_year: YEAR.to_string(),
            room_type: None,
            location_preference: Some("Juhas A".to_string()),
        })
        .expect("submission accepted");
    assert_eq!(application.location_preference.as_deref(), Some("Juhas A"));

    let updated = service
        .update_application(
            application.id,
            ApplicationUpdate {
                room_type: None,
                location_preference: Some("   ".to_string()),
            },
        )
        .expect("update accepted");
    assert!(updated.location_preference.is_none());
}

#[test]
fn profile_updates_rescore_competing_applications() {
    let (service, _, _) = build_service();
    seed_standard_criteria(&service);
    let mut student = student_fixture("Maria", "Bielikova");
    student.grade_average = Some(2.0);
    let student = service.register_student(student).expect("student accepted");
    let application = submit_for(&service, student.id, YEAR);
    assert_eq!(application.total_score, 17.5);

    let outcome = service
        .update_student(
            student.id,
            StudentUpdate {
                disability: Some(true),
                ..StudentUpdate::default()
            },
        )
        .expect("profile update accepted");

    assert_eq!(outcome.rescore.rescored, 1);
    assert_eq!(outcome.rescore.failed, 0);
    assert!(outcome.student.disability);
    let rescored = service
        .application(application.id)
        .expect("application present");
    assert_eq!(rescored.total_score, 37.5);
}

#[test]
fn profile_updates_require_fields() {
    let (service, _, _) = build_service();
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");

    match service.update_student(student.id, StudentUpdate::default()) {
        Err(HousingError::Validation(ValidationError::EmptyUpdate)) => {}
        other => panic!("expected empty update rejection, got {other:?}"),
    }
}

#[test]
fn rescore_can_scope_to_one_academic_year() {
    let (service, store, _) = build_service();
    let created = seed_standard_criteria(&service);
    let mut student = student_fixture("Maria", "Bielikova");
    student.grade_average = Some(2.0);
    let student = service.register_student(student).expect("student accepted");
    let this_year = submit_for(&service, student.id, YEAR);
    let next_year = submit_for(&service, student.id, "2026/2027");

    // Change the academic weight behind the service's back so only a rescore
    // can pick it up.
    let mut academic = store
        .criterion(created[0].id)
        .expect("lookup succeeds")
        .expect("criterion present");
    academic.weight_percent = 50.0;
    store.update_criterion(academic).expect("update succeeds");

    let summary = service
        .rescore(RescoreScope::Year(YEAR.to_string()))
        .expect("rescore runs");
    assert_eq!(summary.rescored, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(
        service
            .application(this_year.id)
            .expect("application present")
            .total_score,
        30.0
    );
    assert_eq!(
        service
            .application(next_year.id)
            .expect("application present")
            .total_score,
        17.5
    );
}

#[test]
fn notification_outages_never_fail_the_workflow() {
    let store = Arc::new(MemoryStore::default());
    let service = HousingService::new(store, Arc::new(FailingSink));
    seed_standard_criteria(&service);
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");

    let application = submit_for(&service, student.id, YEAR);
    assert_eq!(application.status, ApplicationStatus::Processing);

    service
        .confirm_admission(vec![DecisionEntry {
            application_id: application.id,
            decision: AdmissionDecision::Rejected,
            note: None,
        }])
        .expect("confirmation accepted");
    assert_eq!(
        service
            .application(application.id)
            .expect("application present")
            .status,
        ApplicationStatus::Rejected
    );
}

#[test]
fn application_detail_joins_student_and_score_lines() {
    let (service, _, _) = build_service();
    seed_standard_criteria(&service);
    let mut student = student_fixture("Maria", "Bielikova");
    student.grade_average = Some(2.0);
    student.disability = true;
    let student = service.register_student(student).expect("student accepted");
    let application = submit_for(&service, student.id, YEAR);

    let detail = service
        .application_detail(application.id)
        .expect("detail present");

    assert_eq!(detail.student_name, "Maria Bielikova");
    assert_eq!(detail.student_email, student.email);
    assert_eq!(detail.status_label, "processing");
    assert_eq!(detail.score_lines.len(), 4);
    assert!(detail.assigned_room.is_none());

    let academic = detail
        .score_lines
        .iter()
        .find(|line| line.kind == CriterionKind::AcademicPerformance)
        .expect("academic line present");
    assert_eq!(academic.points, 50.0);
    assert_eq!(academic.weighted, 12.5);
    assert_eq!(detail.total_score, 37.5);
}

#[test]
fn listings_sort_ranked_rows_first() {
    let (service, store, _) = build_service();
    seed_standard_criteria(&service);
    let mut strong = student_fixture("Maria", "Bielikova");
    strong.grade_average = Some(1.0);
    let strong = service.register_student(strong).expect("student accepted");
    let mut weak = student_fixture("Tomas", "Krajci");
    weak.grade_average = Some(3.0);
    let weak = service.register_student(weak).expect("student accepted");

    let best = submit_for(&service, strong.id, YEAR);
    let second = submit_for(&service, weak.id, YEAR);

    // A row inserted behind the service stays in "new" and never ranks.
    let drafted = store
        .insert_application(NewApplication {
            student_id: strong.id,
            academic_year: "2026/2027".to_string(),
            room_type: RoomType::Double,
            location_preference: None,
            submitted_at: Utc::now(),
        })
        .expect("insert succeeds");

    let views = service
        .applications(ApplicationFilter::default())
        .expect("listing succeeds");
    let order: Vec<u64> = views.iter().map(|view| view.id.0).collect();
    assert_eq!(order, vec![best.id.0, second.id.0, drafted.id.0]);
    assert_eq!(views[0].rank, Some(1));
    assert!(views[2].rank.is_none());
}

#[test]
fn listings_filter_by_year_and_status() {
    let (service, _, _) = build_service();
    seed_standard_criteria(&service);
    let student = service
        .register_student(student_fixture("Maria", "Bielikova"))
        .expect("student accepted");
    let this_year = submit_for(&service, student.id, YEAR);
    submit_for(&service, student.id, "2026/2027");

    service
        .confirm_admission(vec![DecisionEntry {
            application_id: this_year.id,
            decision: AdmissionDecision::Approved,
            note: None,
        }])
        .expect("confirmation accepted");

    let for_year = service
        .applications(ApplicationFilter {
            academic_year: Some(YEAR.to_string()),
            status: None,
        })
        .expect("listing succeeds");
    assert_eq!(for_year.len(), 1);
    assert_eq!(for_year[0].id, this_year.id);

    let approved = service
        .applications(ApplicationFilter {
            academic_year: None,
            status: Some(ApplicationStatus::Approved),
        })
        .expect("listing succeeds");
    assert_eq!(approved.len(), 1);

    let by_student = service
        .applications_for_student(student.id)
        .expect("listing succeeds");
    assert_eq!(by_student.len(), 2);
}

#[test]
fn student_listings_require_a_known_student() {
    let (service, _, _) = build_service();

    match service.applications_for_student(StudentId(12)) {
        Err(HousingError::StudentNotFound { student }) => assert_eq!(student, StudentId(12)),
        other => panic!("expected student not found, got {other:?}"),
    }
}
