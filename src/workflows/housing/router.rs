use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::admission::{AdmissionRequest, DecisionEntry};
use super::allocation::AllocationRequest;
use super::appeals::{AppealRequest, AppealRuling};
use super::criteria::{CriterionDraft, CriterionUpdate};
use super::domain::{
    AppealId, AppealStatus, ApplicationId, CriterionId, CriterionStatus, StudentId,
};
use super::notify::NotificationSink;
use super::scoring::RescoreScope;
use super::service::{
    ApplicationFilter, ApplicationUpdate, HousingError, HousingService, StudentUpdate,
    SubmitApplication,
};
use super::store::{HousingStore, NewStudent, StoreError};

/// Router builder exposing the housing workflow over HTTP.
pub fn housing_router<S, N>(service: Arc<HousingService<S, N>>) -> Router
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/housing/applications",
            get(list_applications_handler::<S, N>).post(submit_application_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/applications/:application_id",
            get(application_detail_handler::<S, N>).put(update_application_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/students",
            get(list_students_handler::<S, N>).post(register_student_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/students/:student_id",
            get(student_handler::<S, N>).put(update_student_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/students/:student_id/applications",
            get(student_applications_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/criteria",
            get(list_criteria_handler::<S, N>).post(create_criterion_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/criteria/:criterion_id",
            put(update_criterion_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/criteria/:criterion_id/status",
            patch(set_criterion_status_handler::<S, N>),
        )
        .route("/api/v1/housing/rescore", post(rescore_handler::<S, N>))
        .route(
            "/api/v1/housing/admission/proposal",
            post(propose_admission_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/admission/confirm",
            post(confirm_admission_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/allocation",
            post(allocate_rooms_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/appeals",
            get(list_appeals_handler::<S, N>).post(submit_appeal_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/appeals/:appeal_id",
            get(appeal_handler::<S, N>),
        )
        .route(
            "/api/v1/housing/appeals/:appeal_id/decision",
            put(decide_appeal_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct RescoreRequest {
    academic_year: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmationRequest {
    decisions: Vec<DecisionEntry>,
}

#[derive(Debug, Deserialize)]
struct CriterionStatusRequest {
    status: CriterionStatus,
}

#[derive(Debug, Default, Deserialize)]
struct CriterionFilter {
    status: Option<CriterionStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct AppealFilter {
    status: Option<AppealStatus>,
}

pub(crate) async fn submit_application_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(submission): axum::Json<SubmitApplication>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.submit_application(submission) {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_applications_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Query(filter): Query<ApplicationFilter>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.applications(filter) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_detail_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(application_id): Path<u64>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.application_detail(ApplicationId(application_id)) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_application_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(application_id): Path<u64>,
    axum::Json(update): axum::Json<ApplicationUpdate>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.update_application(ApplicationId(application_id), update) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_student_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(student): axum::Json<NewStudent>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.register_student(student) {
        Ok(student) => (StatusCode::CREATED, axum::Json(student)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_students_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.students() {
        Ok(students) => (StatusCode::OK, axum::Json(students)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn student_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(student_id): Path<u64>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.student(StudentId(student_id)) {
        Ok(student) => (StatusCode::OK, axum::Json(student)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_student_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(student_id): Path<u64>,
    axum::Json(update): axum::Json<StudentUpdate>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.update_student(StudentId(student_id), update) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn student_applications_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(student_id): Path<u64>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.applications_for_student(StudentId(student_id)) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_criteria_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Query(filter): Query<CriterionFilter>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.criteria(filter.status) {
        Ok(criteria) => (StatusCode::OK, axum::Json(criteria)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_criterion_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(draft): axum::Json<CriterionDraft>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.create_criterion(draft) {
        Ok(criterion) => (StatusCode::CREATED, axum::Json(criterion)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_criterion_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(criterion_id): Path<u64>,
    axum::Json(update): axum::Json<CriterionUpdate>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.update_criterion(CriterionId(criterion_id), update) {
        Ok(change) => (StatusCode::OK, axum::Json(change)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn set_criterion_status_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(criterion_id): Path<u64>,
    axum::Json(request): axum::Json<CriterionStatusRequest>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.set_criterion_status(CriterionId(criterion_id), request.status) {
        Ok(change) => (StatusCode::OK, axum::Json(change)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rescore_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(request): axum::Json<RescoreRequest>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    let scope = match request
        .academic_year
        .filter(|year| !year.trim().is_empty())
    {
        Some(year) => RescoreScope::Year(year),
        None => RescoreScope::AllYears,
    };
    match service.rescore(scope) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn propose_admission_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(request): axum::Json<AdmissionRequest>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.propose_admission(request) {
        Ok(proposal) => (StatusCode::OK, axum::Json(proposal)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn confirm_admission_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(request): axum::Json<ConfirmationRequest>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.confirm_admission(request.decisions) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn allocate_rooms_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(request): axum::Json<AllocationRequest>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.allocate_rooms(request) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_appeal_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    axum::Json(request): axum::Json<AppealRequest>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.submit_appeal(request) {
        Ok(appeal) => (StatusCode::CREATED, axum::Json(appeal)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_appeals_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Query(filter): Query<AppealFilter>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.appeals(filter.status) {
        Ok(appeals) => (StatusCode::OK, axum::Json(appeals)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn appeal_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(appeal_id): Path<u64>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.appeal(AppealId(appeal_id)) {
        Ok(appeal) => (StatusCode::OK, axum::Json(appeal)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decide_appeal_handler<S, N>(
    State(service): State<Arc<HousingService<S, N>>>,
    Path(appeal_id): Path<u64>,
    axum::Json(ruling): axum::Json<AppealRuling>,
) -> Response
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    match service.decide_appeal(AppealId(appeal_id), ruling) {
        Ok(appeal) => (StatusCode::OK, axum::Json(appeal)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Shared error mapping: invariant and validation failures are client
/// errors, missing records are 404, duplicate submissions are 409, and only
/// store outages surface as 500.
fn error_response(error: HousingError) -> Response {
    let status = match &error {
        HousingError::Validation(_)
        | HousingError::WeightBudgetExceeded { .. }
        | HousingError::InvalidStateTransition { .. }
        | HousingError::AppealAlreadyDecided { .. }
        | HousingError::InvalidAppealTarget { .. } => StatusCode::BAD_REQUEST,
        HousingError::StudentNotFound { .. }
        | HousingError::ApplicationNotFound { .. }
        | HousingError::CriterionNotFound { .. }
        | HousingError::AppealNotFound { .. }
        | HousingError::NoCandidates { .. }
        | HousingError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        HousingError::Store(StoreError::DuplicateApplication { .. }) => StatusCode::CONFLICT,
        HousingError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        HousingError::WeightBudgetExceeded {
            active_total,
            attempted,
        } => json!({
            "error": error.to_string(),
            "active_total": active_total,
            "attempted": attempted,
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
