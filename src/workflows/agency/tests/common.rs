use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::workflows::agency::attribution::JobAttributionResolver;
use crate::workflows::agency::domain::{
    AgencyActor, AuthorizationDocuments, AuthorizationId, AuthorizationRecord,
    AuthorizationStatus, CompanyId, ContractWindow, JobDraft, PermissionGrant, VerificationMethod,
};
use crate::workflows::agency::lifecycle::AuthorizationLifecycle;
use crate::workflows::agency::notifications::MemoryDispatcher;
use crate::workflows::agency::repository::InMemoryAuthorizationRepository;
use crate::workflows::agency::service::{
    AgencyAuthorizationService, AuthorizationRequest, AuthorizationServiceError,
};
use crate::workflows::agency::verification::{GstLookup, GstRegistry, RegistryError};

pub(super) type TestService =
    AgencyAuthorizationService<InMemoryAuthorizationRepository, MemoryDispatcher, StaticRegistry>;
pub(super) type TestResolver =
    JobAttributionResolver<InMemoryAuthorizationRepository, MemoryDispatcher, StaticRegistry>;

/// Scripted registry collaborator so tests control the automated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StaticRegistry {
    Matches,
    Mismatches,
    Ambiguous,
    Unreachable,
}

impl GstRegistry for StaticRegistry {
    fn lookup(&self, _gst_number: &str) -> Result<GstLookup, RegistryError> {
        match self {
            StaticRegistry::Matches => Ok(GstLookup::Match {
                legal_name: "Clearline Analytics Pvt Ltd".to_string(),
            }),
            StaticRegistry::Mismatches => Ok(GstLookup::NoMatch),
            StaticRegistry::Ambiguous => Ok(GstLookup::Ambiguous),
            StaticRegistry::Unreachable => Err(RegistryError::Unreachable(
                "registry offline".to_string(),
            )),
        }
    }
}

pub(super) fn agency() -> CompanyId {
    CompanyId("talent-partners".to_string())
}

pub(super) fn client() -> CompanyId {
    CompanyId("clearline-analytics".to_string())
}

pub(super) fn actor() -> AgencyActor {
    AgencyActor {
        company_id: agency(),
        user_id: "recruiter-7".to_string(),
    }
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn documents() -> AuthorizationDocuments {
    AuthorizationDocuments {
        authorization_letter_url: Some("s3://hirelink/docs/auth-letter.pdf".to_string()),
        service_agreement_url: Some("s3://hirelink/docs/msa.pdf".to_string()),
        client_gst_number: Some("29ABCDE1234F1Z5".to_string()),
        client_pan_number: Some("ABCDE1234F".to_string()),
        additional_documents: Vec::new(),
    }
}

pub(super) fn draft() -> JobDraft {
    JobDraft {
        title: "Senior Data Engineer".to_string(),
        category: "engineering".to_string(),
        location: "Bengaluru".to_string(),
    }
}

/// Fresh record in `pending` with full default permissions.
pub(super) fn pending_record(method: VerificationMethod) -> AuthorizationRecord {
    AuthorizationRecord::new(
        AuthorizationId("auth-test-001".to_string()),
        agency(),
        client(),
        PermissionGrant::default(),
        ContractWindow::default(),
        documents(),
        method,
        vec!["hr@clearline.example".to_string()],
        at(2026, 1, 5),
    )
}

/// Record forced into an arbitrary status, bypassing the lifecycle, for
/// evaluator and guard tests.
pub(super) fn record_in_status(status: AuthorizationStatus) -> AuthorizationRecord {
    let mut record = pending_record(VerificationMethod::ManualReview);
    record.status = status;
    record
}

pub(super) fn request(method: VerificationMethod) -> AuthorizationRequest {
    AuthorizationRequest {
        agency_company_id: agency(),
        client_company_id: client(),
        permissions: PermissionGrant::default(),
        contract: ContractWindow::default(),
        documents: documents(),
        verification_method: method,
        client_contact_emails: vec!["hr@clearline.example".to_string()],
    }
}

pub(super) fn build_service(
    registry: StaticRegistry,
) -> (
    Arc<TestService>,
    Arc<InMemoryAuthorizationRepository>,
    Arc<MemoryDispatcher>,
) {
    let repository = Arc::new(InMemoryAuthorizationRepository::default());
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let service = Arc::new(AgencyAuthorizationService::new(
        repository.clone(),
        dispatcher.clone(),
        registry,
        AuthorizationLifecycle::default(),
    ));
    (service, repository, dispatcher)
}

pub(super) fn build_resolver(
    registry: StaticRegistry,
) -> (
    Arc<TestService>,
    TestResolver,
    Arc<InMemoryAuthorizationRepository>,
    Arc<MemoryDispatcher>,
) {
    let (service, repository, dispatcher) = build_service(registry);
    let resolver = JobAttributionResolver::new(service.clone(), repository.clone());
    (service, resolver, repository, dispatcher)
}

/// Drive a manual-review request all the way to `active`.
pub(super) fn activate(
    service: &TestService,
    request: AuthorizationRequest,
) -> Result<AuthorizationRecord, AuthorizationServiceError> {
    let record = service.request(request)?;
    service.admin_decide(&record.id, true, "admin-1", None)
}
