use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::attribution::{AttributionError, JobAttributionResolver};
use super::domain::{
    AgencyActor, AttributedJob, AuthorizationDocuments, AuthorizationId, AuthorizationRecord,
    CompanyId, ContractWindow, JobDraft, PermissionGrant, VerificationMethod,
};
use super::lifecycle::{RevocationActor, TransitionError};
use super::notifications::NotificationDispatcher;
use super::repository::{AuthorizationRepository, RepositoryError};
use super::service::{AgencyAuthorizationService, AuthorizationRequest, AuthorizationServiceError};
use super::verification::GstRegistry;

/// Shared state for the agency authorization routes.
pub struct AgencyState<R, N, G> {
    pub service: Arc<AgencyAuthorizationService<R, N, G>>,
    pub resolver: Arc<JobAttributionResolver<R, N, G>>,
}

impl<R, N, G> Clone for AgencyState<R, N, G> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

/// Router builder exposing the authorization lifecycle and job attribution.
pub fn agency_router<R, N, G>(state: AgencyState<R, N, G>) -> Router
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    Router::new()
        .route(
            "/api/v1/agency/authorizations",
            post(request_handler::<R, N, G>).get(list_handler::<R, N, G>),
        )
        .route(
            "/api/v1/agency/authorizations/:authorization_id",
            get(status_handler::<R, N, G>),
        )
        .route(
            "/api/v1/agency/authorizations/:authorization_id/confirm",
            post(confirm_handler::<R, N, G>),
        )
        .route(
            "/api/v1/agency/authorizations/:authorization_id/decision",
            post(decision_handler::<R, N, G>),
        )
        .route(
            "/api/v1/agency/authorizations/:authorization_id/revoke",
            post(revoke_handler::<R, N, G>),
        )
        .route("/api/v1/agency/jobs", post(post_job_handler::<R, N, G>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RequestAuthorizationBody {
    pub agency_company_id: String,
    pub client_company_id: String,
    #[serde(default)]
    pub permissions: Option<PermissionGrant>,
    #[serde(default)]
    pub contract: ContractWindow,
    #[serde(default)]
    pub documents: AuthorizationDocuments,
    pub verification_method: VerificationMethod,
    #[serde(default)]
    pub client_contact_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmBody {
    email: String,
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    approve: bool,
    admin_id: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActorKind {
    Admin,
    Agency,
}

#[derive(Debug, Deserialize)]
struct RevokeBody {
    actor_kind: ActorKind,
    actor_id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct PostJobBody {
    agency_company_id: String,
    agency_user_id: String,
    client_company_id: String,
    job: JobDraft,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    agency_id: Option<String>,
    client_id: Option<String>,
}

/// Sanitized representation of an authorization for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationView {
    pub authorization_id: String,
    pub agency_company_id: String,
    pub client_company_id: String,
    pub status: &'static str,
    pub verification_method: &'static str,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub auto_renew: bool,
    pub jobs_posted: u32,
    pub total_applications: u32,
    pub last_job_posted_at: Option<DateTime<Utc>>,
    pub rationale: String,
}

impl AuthorizationView {
    pub fn from_record(record: &AuthorizationRecord) -> Self {
        let rationale = record
            .rejection_reason
            .clone()
            .or_else(|| record.verification_note.clone())
            .unwrap_or_else(|| "awaiting verification".to_string());

        Self {
            authorization_id: record.id.0.clone(),
            agency_company_id: record.agency_company_id.0.clone(),
            client_company_id: record.client_company_id.0.clone(),
            status: record.status.label(),
            verification_method: record.verification_method.label(),
            contract_start_date: record.contract.start_date,
            contract_end_date: record.contract.end_date,
            auto_renew: record.contract.auto_renew,
            jobs_posted: record.usage.jobs_posted,
            total_applications: record.usage.total_applications,
            last_job_posted_at: record.usage.last_job_posted_at,
            rationale,
        }
    }
}

async fn request_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    axum::Json(body): axum::Json<RequestAuthorizationBody>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let request = AuthorizationRequest {
        agency_company_id: CompanyId(body.agency_company_id),
        client_company_id: CompanyId(body.client_company_id),
        permissions: body.permissions.unwrap_or_default(),
        contract: body.contract,
        documents: body.documents,
        verification_method: body.verification_method,
        client_contact_emails: body.client_contact_emails,
    };

    match state.service.request(request) {
        Ok(record) => (
            StatusCode::CREATED,
            axum::Json(AuthorizationView::from_record(&record)),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn status_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    Path(authorization_id): Path<String>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let id = AuthorizationId(authorization_id);
    match state.service.get(&id) {
        Ok(record) => (
            StatusCode::OK,
            axum::Json(AuthorizationView::from_record(&record)),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn list_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    Query(params): Query<ListParams>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let result = match (params.agency_id, params.client_id) {
        (Some(agency), _) => state.service.list_by_agency(&CompanyId(agency)),
        (None, Some(client)) => state.service.list_by_client(&CompanyId(client)),
        (None, None) => {
            let payload = json!({ "error": "agency_id or client_id query parameter required" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match result {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(AuthorizationView::from_record).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

async fn confirm_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    Path(authorization_id): Path<String>,
    axum::Json(body): axum::Json<ConfirmBody>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let id = AuthorizationId(authorization_id);
    match state.service.confirm_by_client(&id, &body.email) {
        Ok(record) => (
            StatusCode::OK,
            axum::Json(AuthorizationView::from_record(&record)),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn decision_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    Path(authorization_id): Path<String>,
    axum::Json(body): axum::Json<DecisionBody>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let id = AuthorizationId(authorization_id);
    match state
        .service
        .admin_decide(&id, body.approve, &body.admin_id, body.reason.as_deref())
    {
        Ok(record) => (
            StatusCode::OK,
            axum::Json(AuthorizationView::from_record(&record)),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn revoke_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    Path(authorization_id): Path<String>,
    axum::Json(body): axum::Json<RevokeBody>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let id = AuthorizationId(authorization_id);
    let actor = match body.actor_kind {
        ActorKind::Admin => RevocationActor::Admin {
            admin_id: body.actor_id,
        },
        ActorKind::Agency => RevocationActor::Agency {
            user_id: body.actor_id,
        },
    };

    match state.service.revoke(&id, actor, &body.reason) {
        Ok(record) => (
            StatusCode::OK,
            axum::Json(AuthorizationView::from_record(&record)),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn post_job_handler<R, N, G>(
    State(state): State<AgencyState<R, N, G>>,
    axum::Json(body): axum::Json<PostJobBody>,
) -> Response
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    let actor = AgencyActor {
        company_id: CompanyId(body.agency_company_id),
        user_id: body.agency_user_id,
    };
    let client = CompanyId(body.client_company_id);

    match state.resolver.resolve(&actor, &client, body.job) {
        Ok(job) => (StatusCode::CREATED, axum::Json(attributed_view(&job))).into_response(),
        Err(err) => attribution_error_response(err),
    }
}

fn attributed_view(job: &AttributedJob) -> serde_json::Value {
    json!({
        "hiring_company_id": job.hiring_company_id.0,
        "posted_by_agency_id": job.posted_by_agency_id.as_ref().map(|id| id.0.clone()),
        "is_agency_posted": job.is_agency_posted,
        "authorization_id": job.authorization_id.as_ref().map(|id| id.0.clone()),
        "job": job.draft,
    })
}

fn service_error_response(err: AuthorizationServiceError) -> Response {
    let status = match &err {
        AuthorizationServiceError::Repository(RepositoryError::Duplicate) => StatusCode::CONFLICT,
        AuthorizationServiceError::Transition(TransitionError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
        AuthorizationServiceError::Transition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthorizationServiceError::AgencyIsClient
        | AuthorizationServiceError::InvalidContractWindow => StatusCode::UNPROCESSABLE_ENTITY,
        AuthorizationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn attribution_error_response(err: AttributionError) -> Response {
    let status = match &err {
        AttributionError::NoActiveAuthorization
        | AttributionError::Denied { .. }
        | AttributionError::NotAgencyPosted
        | AttributionError::NotPostedByAgency
        | AttributionError::Evaluation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AttributionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
