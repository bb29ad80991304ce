//! Agency-client authorization workflow: the lifecycle of an agency's scoped,
//! auditable, time-bounded permission to post and manage jobs on behalf of a
//! client company, plus the permission checks and dual attribution consumed
//! by job mutations.

pub mod attribution;
pub mod domain;
pub mod lifecycle;
pub mod notifications;
pub mod permissions;
pub mod repository;
pub mod router;
pub mod service;
pub mod verification;

#[cfg(test)]
mod tests;

pub use attribution::{AttributionError, JobAttributionResolver};
pub use domain::{
    AgencyActor, AttributedJob, AuthorizationDocuments, AuthorizationId, AuthorizationRecord,
    AuthorizationStatus, CompanyId, ContractWindow, DocumentRef, JobAction, JobDraft,
    PermissionGrant, UsageCounters, VerificationMethod,
};
pub use lifecycle::{AuthorizationLifecycle, LifecycleOperation, RevocationActor, TransitionError};
pub use notifications::{
    AuthorizationEvent, MemoryDispatcher, NotificationDispatcher, NotificationError,
    TracingDispatcher,
};
pub use permissions::{Decision, DenialReason, EvaluationError, GrantedConstraints, PermissionEvaluator};
pub use repository::{AuthorizationRepository, InMemoryAuthorizationRepository, RepositoryError};
pub use router::{agency_router, AgencyState, AuthorizationView, RequestAuthorizationBody};
pub use service::{
    AgencyAuthorizationService, AuthorizationRequest, AuthorizationServiceError, SweepOutcome,
};
pub use verification::{
    GstLookup, GstRegistry, RegistryError, VerificationOutcome, VerificationReason,
    VerificationService,
};
