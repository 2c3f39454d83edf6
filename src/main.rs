use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use housing_desk::config::{AppConfig, RosterConfig};
use housing_desk::error::AppError;
use housing_desk::telemetry;
use housing_desk::workflows::housing::{
    housing_router, AdmissionRequest, AllocationRequest, AppealDecision, AppealRequest,
    AppealRuling, ApplicationFilter, ApplicationStatus, CriterionDraft, CriterionKind,
    DecisionEntry, HousingService, MemoryNotifications, MemoryStore, SubmitApplication,
};
use housing_desk::workflows::roster::RosterImporter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

type DeskService = HousingService<MemoryStore, MemoryNotifications>;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    prometheus: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Dormitory Housing Desk",
    about = "Run the dormitory housing desk service and admission demos from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default when no command is given)
    Serve(ServeArgs),
    /// Run an admission round end to end for stakeholder demos
    Admission {
        #[command(subcommand)]
        command: AdmissionCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Bind host, taking precedence over APP_HOST
    #[arg(long)]
    host: Option<String>,
    /// Bind port, taking precedence over APP_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum AdmissionCommand {
    /// Score, rank, admit, allocate, and appeal with sample or exported data
    Demo(AdmissionDemoArgs),
}

#[derive(Args, Debug)]
struct AdmissionDemoArgs {
    /// Academic year the demo round runs for
    #[arg(long, default_value = "2025/2026")]
    academic_year: String,
    /// Number of beds the admission round may fill
    #[arg(long, default_value_t = 2)]
    capacity: u32,
    /// Optional dormitory inventory CSV to seed rooms
    #[arg(long)]
    inventory_csv: Option<PathBuf>,
    /// Optional student roster CSV to seed applicants
    #[arg(long)]
    students_csv: Option<PathBuf>,
    /// Print the notification trail after the round
    #[arg(long)]
    show_notifications: bool,
}

#[derive(Debug, Deserialize)]
struct RosterImportRequest {
    #[serde(default)]
    inventory_csv: Option<String>,
    #[serde(default)]
    students_csv: Option<String>,
}

#[derive(Debug, Serialize)]
struct RosterImportResponse {
    dormitories: usize,
    rooms: usize,
    students: usize,
    skipped: usize,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("housing-desk: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Admission {
            command: AdmissionCommand::Demo(args),
        } => run_admission_demo(args),
    }
}

async fn run_server(args: ServeArgs) -> Result<(), AppError> {
    let ServeArgs { host, port } = args;

    let mut config = AppConfig::load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let state = AppState {
        readiness: Arc::new(AtomicBool::new(false)),
        prometheus: prometheus_handle,
    };
    let ready = state.readiness.clone();

    let store = Arc::new(MemoryStore::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = Arc::new(DeskService::new(store.clone(), notifications));

    seed_from_roster(&config.roster, store.as_ref())?;

    let app = housing_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/housing/roster/import", post(roster_import_endpoint))
        .layer(Extension(state))
        .layer(Extension(store))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    ready.store(true, Ordering::Release);

    info!(?config.environment, %addr, "housing desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn seed_from_roster(roster: &RosterConfig, store: &MemoryStore) -> Result<(), AppError> {
    if let Some(path) = roster.inventory_csv.as_ref() {
        let summary = RosterImporter::inventory_from_path(path, store)?;
        info!(
            dormitories = summary.dormitories,
            rooms = summary.rooms,
            skipped = summary.skipped,
            "seeded dormitory inventory"
        );
    }

    if let Some(path) = roster.students_csv.as_ref() {
        let summary = RosterImporter::students_from_path(path, store)?;
        info!(
            students = summary.students,
            skipped = summary.skipped,
            "seeded student roster"
        );
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let (status, label) = if state.readiness.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
}

async fn roster_import_endpoint(
    Extension(store): Extension<Arc<MemoryStore>>,
    Json(payload): Json<RosterImportRequest>,
) -> Result<Json<RosterImportResponse>, AppError> {
    let RosterImportRequest {
        inventory_csv,
        students_csv,
    } = payload;

    let mut response = RosterImportResponse {
        dormitories: 0,
        rooms: 0,
        students: 0,
        skipped: 0,
    };

    if let Some(csv) = inventory_csv {
        let summary =
            RosterImporter::inventory_from_reader(Cursor::new(csv.into_bytes()), store.as_ref())?;
        response.dormitories = summary.dormitories;
        response.rooms = summary.rooms;
        response.skipped += summary.skipped;
    }

    if let Some(csv) = students_csv {
        let summary =
            RosterImporter::students_from_reader(Cursor::new(csv.into_bytes()), store.as_ref())?;
        response.students = summary.students;
        response.skipped += summary.skipped;
    }

    Ok(Json(response))
}

const SAMPLE_INVENTORY: &str = "\
Dormitory,Room,Capacity,Occupied
Juhas A,101,2,1
Juhas A,102,3,1
Pavilion B,201,2,2
";

const SAMPLE_STUDENTS: &str = "\
First Name,Last Name,Email,Study Program,Year,Grade Average,Distance Km,Household Income,Household Size,Disability,Social Situation
Maria,Bielikova,maria.bielikova@example.sk,Informatics,2,1.20,180,900,4,no,
Tomas,Krajci,tomas.krajci@example.sk,Economics,4,2.80,30,1600,4,no,
Lucia,Svecova,lucia.svecova@example.sk,Architecture,1,3.60,12,2000,2,no,
";

fn run_admission_demo(args: AdmissionDemoArgs) -> Result<(), AppError> {
    let AdmissionDemoArgs {
        academic_year,
        capacity,
        inventory_csv,
        students_csv,
        show_notifications,
    } = args;

    let store = Arc::new(MemoryStore::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = DeskService::new(store.clone(), notifications.clone());

    let inventory = match inventory_csv {
        Some(path) => RosterImporter::inventory_from_path(path, store.as_ref())?,
        None => {
            RosterImporter::inventory_from_reader(Cursor::new(SAMPLE_INVENTORY), store.as_ref())?
        }
    };
    let roster = match students_csv {
        Some(path) => RosterImporter::students_from_path(path, store.as_ref())?,
        None => RosterImporter::students_from_reader(Cursor::new(SAMPLE_STUDENTS), store.as_ref())?,
    };

    seed_demo_criteria(&service)?;

    println!("Housing admission demo");
    println!("Academic year: {academic_year} ({capacity} beds in the round)");
    println!(
        "Seeded {} dormitories, {} rooms, {} students",
        inventory.dormitories, inventory.rooms, roster.students
    );

    for student in service.students()? {
        service.submit_application(SubmitApplication {
            student_id: student.id,
            academic_year: academic_year.clone(),
            room_type: None,
            location_preference: None,
        })?;
    }

    let ranked = service.applications(ApplicationFilter {
        academic_year: Some(academic_year.clone()),
        status: None,
    })?;

    println!("\nRanking");
    for view in &ranked {
        let rank = match view.rank {
            Some(rank) => format!("#{rank}"),
            None => "unranked".to_string(),
        };
        println!(
            "- {} {}: {:.1} points ({})",
            rank, view.student_name, view.total_score, view.status_label
        );
    }

    let proposal = service.propose_admission(AdmissionRequest {
        academic_year: academic_year.clone(),
        capacity,
    })?;

    println!(
        "\nAdmission proposal: {} candidates, {} to approve, {} to reject",
        proposal.candidates, proposal.approved, proposal.rejected
    );
    for entry in &proposal.entries {
        println!(
            "- position {}: {} ({:.1} points) -> {}",
            entry.position,
            entry.student_name,
            entry.total_score,
            entry.proposed.label()
        );
    }

    let decisions = proposal
        .entries
        .iter()
        .map(|entry| DecisionEntry {
            application_id: entry.application_id,
            decision: entry.proposed,
            note: None,
        })
        .collect();
    let confirmation = service.confirm_admission(decisions)?;
    println!(
        "\nConfirmed: {} approved, {} rejected",
        confirmation.approved, confirmation.rejected
    );

    let allocation = service.allocate_rooms(AllocationRequest {
        academic_year: academic_year.clone(),
    })?;
    println!(
        "\nRoom allocation: {} of {} placed",
        allocation.allocated, allocation.candidates
    );
    for assignment in &allocation.assignments {
        println!(
            "- application {} -> room {} in {}",
            assignment.application_id.0, assignment.room_number, assignment.dormitory
        );
    }

    let rejected = service.applications(ApplicationFilter {
        academic_year: Some(academic_year.clone()),
        status: Some(ApplicationStatus::Rejected),
    })?;

    if let Some(view) = rejected.first() {
        let appeal = service.submit_appeal(AppealRequest {
            application_id: view.id,
            reason: "My household income dropped after the application deadline.".to_string(),
        })?;
        let decided = service.decide_appeal(
            appeal.id,
            AppealRuling {
                decision: AppealDecision::Approved,
                rationale: "Documented change in family circumstances.".to_string(),
            },
        )?;
        println!(
            "\nAppeal by {}: {}",
            view.student_name,
            decided.status.label()
        );

        let second_pass = service.allocate_rooms(AllocationRequest {
            academic_year: academic_year.clone(),
        })?;
        println!(
            "Post-appeal allocation: {} of {} placed",
            second_pass.allocated, second_pass.candidates
        );
        for assignment in &second_pass.assignments {
            println!(
                "- application {} -> room {} in {}",
                assignment.application_id.0, assignment.room_number, assignment.dormitory
            );
        }
    }

    if show_notifications {
        println!("\nNotification trail");
        for event in notifications.events() {
            println!(
                "- [{}] student {}: {}",
                event.kind.label(),
                event.student_id.0,
                event.subject
            );
        }
    }

    Ok(())
}

fn seed_demo_criteria(service: &DeskService) -> Result<(), AppError> {
    let drafts = [
        ("Academic results", CriterionKind::AcademicPerformance, 25.0),
        ("Year of study", CriterionKind::StudyYear, 25.0),
        ("Socioeconomic situation", CriterionKind::Socioeconomic, 30.0),
        ("Health disadvantage", CriterionKind::HealthDisadvantage, 20.0),
    ];

    for (name, kind, weight_percent) in drafts {
        service.create_criterion(CriterionDraft {
            name: name.to_string(),
            description: None,
            kind,
            max_points: 100.0,
            weight_percent,
            status: None,
        })?;
    }

    Ok(())
}
