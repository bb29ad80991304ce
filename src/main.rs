use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use hirelink::config::AppConfig;
use hirelink::error::AppError;
use hirelink::telemetry;
use hirelink::workflows::agency::{
    agency_router, AgencyActor, AgencyAuthorizationService, AgencyState, AuthorizationDocuments,
    AuthorizationLifecycle, AuthorizationRequest, CompanyId, ContractWindow, GstLookup,
    GstRegistry, InMemoryAuthorizationRepository, JobAttributionResolver, JobDraft,
    MemoryDispatcher, PermissionGrant, RegistryError, RevocationActor, TracingDispatcher,
    VerificationMethod,
};
use hirelink::workflows::agency::verification::UnconfiguredRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
struct ShellState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "HireLink Agency Authorization Service",
    about = "Run the agency-client authorization core for the HireLink job portal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk the authorization lifecycle end to end on stdout
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
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
        Command::Demo => run_demo(),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let repository = Arc::new(InMemoryAuthorizationRepository::default());
    let dispatcher = Arc::new(TracingDispatcher);
    let lifecycle = AuthorizationLifecycle::new(config.authorization.confirmation_window_days);
    let service = Arc::new(AgencyAuthorizationService::new(
        repository.clone(),
        dispatcher,
        UnconfiguredRegistry,
        lifecycle,
    ));
    let resolver = Arc::new(JobAttributionResolver::new(
        service.clone(),
        repository.clone(),
    ));

    let sweep_service = service.clone();
    let sweep_interval = Duration::from_secs(config.authorization.expiry_sweep_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = sweep_service.run_expiry_sweep() {
                warn!(error = %err, "contract expiry sweep failed");
            }
        }
    });

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let shell = ShellState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(shell)
        .merge(agency_router(AgencyState { service, resolver }))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "agency authorization service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<ShellState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<ShellState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Registry stub for the demo walk-through: every number matches.
struct DemoRegistry;

impl GstRegistry for DemoRegistry {
    fn lookup(&self, _gst_number: &str) -> Result<GstLookup, RegistryError> {
        Ok(GstLookup::Match {
            legal_name: "Clearline Analytics Pvt Ltd".to_string(),
        })
    }
}

fn run_demo() -> Result<(), AppError> {
    let repository = Arc::new(InMemoryAuthorizationRepository::default());
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let service = Arc::new(AgencyAuthorizationService::new(
        repository.clone(),
        dispatcher.clone(),
        DemoRegistry,
        AuthorizationLifecycle::default(),
    ));
    let resolver = JobAttributionResolver::new(service.clone(), repository);

    println!("Agency authorization demo");

    let agency = CompanyId("talent-partners".to_string());
    let client = CompanyId("clearline-analytics".to_string());

    let record = service.request(AuthorizationRequest {
        agency_company_id: agency.clone(),
        client_company_id: client.clone(),
        permissions: PermissionGrant {
            max_active_jobs: Some(2),
            ..PermissionGrant::default()
        },
        contract: ContractWindow::default(),
        documents: AuthorizationDocuments {
            client_gst_number: Some("29ABCDE1234F1Z5".to_string()),
            ..AuthorizationDocuments::default()
        },
        verification_method: VerificationMethod::AutomatedGst,
        client_contact_emails: vec!["hr@clearline.example".to_string()],
    })?;
    println!(
        "- requested: {} ({} -> {}), status {}",
        record.id.0,
        agency.0,
        client.0,
        record.status.label()
    );

    let record = service.confirm_by_client(&record.id, "hr@clearline.example")?;
    println!("- client confirmed, status {}", record.status.label());

    let actor = AgencyActor {
        company_id: agency.clone(),
        user_id: "recruiter-7".to_string(),
    };
    let job = resolver.resolve(
        &actor,
        &client,
        JobDraft {
            title: "Senior Data Engineer".to_string(),
            category: "engineering".to_string(),
            location: "Bengaluru".to_string(),
        },
    )?;
    println!(
        "- job attributed: hiring {} via agency {} under {}",
        job.hiring_company_id.0,
        job.posted_by_agency_id.as_ref().map(|id| id.0.as_str()).unwrap_or("-"),
        job.authorization_id.as_ref().map(|id| id.0.as_str()).unwrap_or("-"),
    );

    let record = service.revoke(
        &record.id,
        RevocationActor::Admin {
            admin_id: "admin-1".to_string(),
        },
        "contract terminated by client",
    )?;
    println!("- revoked, status {}", record.status.label());

    match resolver.resolve(
        &actor,
        &client,
        JobDraft {
            title: "Data Analyst".to_string(),
            category: "engineering".to_string(),
            location: "Bengaluru".to_string(),
        },
    ) {
        Err(err) => println!("- second post rejected: {err}"),
        Ok(_) => println!("- unexpected: second post succeeded"),
    }

    println!("\nDispatched events");
    for event in dispatcher.events() {
        println!("- {event:?}");
    }

    Ok(())
}
