use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{AgencyActor, AttributedJob, AuthorizationRecord, CompanyId, JobAction, JobDraft};
use super::notifications::NotificationDispatcher;
use super::permissions::{Decision, DenialReason, EvaluationError, PermissionEvaluator};
use super::repository::{AuthorizationRepository, RepositoryError};
use super::service::{AgencyAuthorizationService, AuthorizationServiceError};
use super::verification::GstRegistry;

/// Error raised while attributing or re-validating an agency-posted job.
#[derive(Debug, thiserror::Error)]
pub enum AttributionError {
    #[error("no active authorization exists for this agency-client pair")]
    NoActiveAuthorization,
    #[error("{}", .reason.summary())]
    Denied { reason: DenialReason },
    #[error("job is not attributed to an agency authorization")]
    NotAgencyPosted,
    #[error("job was not posted by the acting agency")]
    NotPostedByAgency,
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationServiceError),
}

/// Resolves the dual attribution of a job draft — hiring company and posting
/// agency — against the current authorization state, and maintains the
/// record's usage counters.
pub struct JobAttributionResolver<R, N, G> {
    service: Arc<AgencyAuthorizationService<R, N, G>>,
    repository: Arc<R>,
    evaluator: PermissionEvaluator,
}

impl<R, N, G> JobAttributionResolver<R, N, G>
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    pub fn new(service: Arc<AgencyAuthorizationService<R, N, G>>, repository: Arc<R>) -> Self {
        Self {
            service,
            repository,
            evaluator: PermissionEvaluator,
        }
    }

    /// Attribute a job draft to `(client, agency)` under the active
    /// authorization. The quota increment happens inside the repository's
    /// critical section, atomic with job admission.
    pub fn resolve(
        &self,
        actor: &AgencyActor,
        client: &CompanyId,
        draft: JobDraft,
    ) -> Result<AttributedJob, AttributionError> {
        let record = self
            .service
            .find_active(&actor.company_id, client)?
            .ok_or(AttributionError::NoActiveAuthorization)?;

        self.require_allowed(&record, JobAction::Create, Some(&draft))?;

        let record = self
            .repository
            .record_job_posted(&record.id, Utc::now())
            .map_err(|err| match err {
                RepositoryError::QuotaReached { limit } => AttributionError::Denied {
                    reason: DenialReason::QuotaExceeded { limit },
                },
                RepositoryError::NotActive | RepositoryError::NotFound => {
                    AttributionError::NoActiveAuthorization
                }
                other => AttributionError::Repository(other),
            })?;

        info!(
            authorization = %record.id.0,
            agency = %record.agency_company_id.0,
            client = %record.client_company_id.0,
            jobs_posted = record.usage.jobs_posted,
            "job attributed to agency authorization"
        );

        Ok(AttributedJob {
            hiring_company_id: record.client_company_id.clone(),
            posted_by_agency_id: Some(record.agency_company_id.clone()),
            is_agency_posted: true,
            authorization_id: Some(record.id),
            draft,
        })
    }

    /// Re-validate an edit/delete/view against the *current* authorization
    /// state. A job created while active becomes unmanageable once the
    /// authorization is revoked or expires; the stored snapshot is never
    /// trusted.
    pub fn authorize_mutation(
        &self,
        actor: &AgencyActor,
        job: &AttributedJob,
        action: JobAction,
    ) -> Result<(), AttributionError> {
        let authorization_id = job
            .authorization_id
            .as_ref()
            .ok_or(AttributionError::NotAgencyPosted)?;

        if job.posted_by_agency_id.as_ref() != Some(&actor.company_id) {
            return Err(AttributionError::NotPostedByAgency);
        }

        let record = self.service.get(authorization_id).map_err(|err| match err {
            AuthorizationServiceError::Repository(RepositoryError::NotFound) => {
                AttributionError::NoActiveAuthorization
            }
            other => AttributionError::Authorization(other),
        })?;

        self.require_allowed(&record, action, None)
    }

    /// Count an application received on an agency-posted job against the
    /// governing record.
    pub fn record_application(&self, job: &AttributedJob) -> Result<(), AttributionError> {
        let authorization_id = job
            .authorization_id
            .as_ref()
            .ok_or(AttributionError::NotAgencyPosted)?;
        self.repository.record_application_received(authorization_id)?;
        Ok(())
    }

    fn require_allowed(
        &self,
        record: &AuthorizationRecord,
        action: JobAction,
        draft: Option<&JobDraft>,
    ) -> Result<(), AttributionError> {
        match self.evaluator.can_perform(record, action, draft)? {
            Decision::Allow { .. } => Ok(()),
            Decision::Deny { reason } => Err(AttributionError::Denied { reason }),
        }
    }
}
