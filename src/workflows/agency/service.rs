use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    AuthorizationDocuments, AuthorizationId, AuthorizationRecord, CompanyId, ContractWindow,
    PermissionGrant, VerificationMethod,
};
use super::lifecycle::{AuthorizationLifecycle, RevocationActor, TransitionError};
use super::notifications::{NotificationDispatcher, NotificationError};
use super::repository::{AuthorizationRepository, RepositoryError};
use super::verification::{GstRegistry, VerificationService};

static AUTHORIZATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_authorization_id() -> AuthorizationId {
    let id = AUTHORIZATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AuthorizationId(format!("auth-{id:06}"))
}

/// Inbound shape of an agency's authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub agency_company_id: CompanyId,
    pub client_company_id: CompanyId,
    pub permissions: PermissionGrant,
    pub contract: ContractWindow,
    pub documents: AuthorizationDocuments,
    pub verification_method: VerificationMethod,
    pub client_contact_emails: Vec<String>,
}

/// Tally returned by the periodic contract sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepOutcome {
    pub expired: usize,
    pub renewed: usize,
}

/// Facade composing the repository, verification service, lifecycle, and
/// notification dispatcher. All operations are synchronous and
/// request-scoped; failures return to the caller without internal retries.
pub struct AgencyAuthorizationService<R, N, G> {
    repository: Arc<R>,
    dispatcher: Arc<N>,
    verification: VerificationService<G>,
    lifecycle: AuthorizationLifecycle,
}

impl<R, N, G> AgencyAuthorizationService<R, N, G>
where
    R: AuthorizationRepository + 'static,
    N: NotificationDispatcher + 'static,
    G: GstRegistry + 'static,
{
    pub fn new(
        repository: Arc<R>,
        dispatcher: Arc<N>,
        registry: G,
        lifecycle: AuthorizationLifecycle,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            verification: VerificationService::new(registry),
            lifecycle,
        }
    }

    pub fn lifecycle(&self) -> &AuthorizationLifecycle {
        &self.lifecycle
    }

    /// Create a new authorization in `pending` and immediately route it
    /// through verification toward client confirmation or admin review.
    pub fn request(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationRecord, AuthorizationServiceError> {
        if request.agency_company_id == request.client_company_id {
            return Err(AuthorizationServiceError::AgencyIsClient);
        }
        if !request.contract.is_ordered() {
            return Err(AuthorizationServiceError::InvalidContractWindow);
        }

        let now = Utc::now();
        let record = AuthorizationRecord::new(
            next_authorization_id(),
            request.agency_company_id,
            request.client_company_id,
            request.permissions,
            request.contract,
            request.documents,
            request.verification_method,
            request.client_contact_emails,
            now,
        );

        let mut record = self.repository.insert(record)?;

        let outcome = self.verification.evaluate(&record);
        let event = self.lifecycle.submit(&mut record, &outcome, now)?;
        self.repository.update(record.clone())?;
        self.dispatcher.notify(event)?;

        info!(
            authorization = %record.id.0,
            agency = %record.agency_company_id.0,
            client = %record.client_company_id.0,
            status = record.status.label(),
            "authorization requested"
        );

        Ok(record)
    }

    /// Client confirmation via emailed link. A request whose confirmation
    /// window already elapsed falls back to admin review first, so the
    /// confirm itself then fails `InvalidTransition`.
    pub fn confirm_by_client(
        &self,
        id: &AuthorizationId,
        email: &str,
    ) -> Result<AuthorizationRecord, AuthorizationServiceError> {
        let now = Utc::now();
        let mut record = self.load(id)?;

        if let Some(event) = self.lifecycle.check_confirmation_timeout(&mut record, now) {
            self.repository.update(record.clone())?;
            self.dispatcher.notify(event)?;
        }

        let event = self.lifecycle.confirm_by_client(&mut record, email, now)?;
        self.repository.update(record.clone())?;
        self.dispatcher.notify(event)?;

        info!(authorization = %record.id.0, "client confirmed authorization");
        Ok(record)
    }

    /// Admin approval or rejection out of `pending_admin_review`.
    pub fn admin_decide(
        &self,
        id: &AuthorizationId,
        approve: bool,
        admin_id: &str,
        reason: Option<&str>,
    ) -> Result<AuthorizationRecord, AuthorizationServiceError> {
        let now = Utc::now();
        let mut record = self.load(id)?;

        let event = if approve {
            self.lifecycle.admin_approve(&mut record, admin_id, now)?
        } else {
            self.lifecycle
                .admin_reject(&mut record, admin_id, reason.unwrap_or(""), now)?
        };

        self.repository.update(record.clone())?;
        self.dispatcher.notify(event)?;

        info!(
            authorization = %record.id.0,
            status = record.status.label(),
            "admin decision recorded"
        );
        Ok(record)
    }

    pub fn revoke(
        &self,
        id: &AuthorizationId,
        actor: RevocationActor,
        reason: &str,
    ) -> Result<AuthorizationRecord, AuthorizationServiceError> {
        let now = Utc::now();
        let mut record = self.load(id)?;

        let event = self.lifecycle.revoke(&mut record, &actor, reason, now)?;
        self.repository.update(record.clone())?;
        self.dispatcher.notify(event)?;

        info!(authorization = %record.id.0, "authorization revoked");
        Ok(record)
    }

    /// Fetch with the lazy timeout/expiry refresh applied.
    pub fn get(
        &self,
        id: &AuthorizationId,
    ) -> Result<AuthorizationRecord, AuthorizationServiceError> {
        let record = self.load(id)?;
        Ok(self.refresh(record)?)
    }

    pub fn list_by_agency(
        &self,
        agency: &CompanyId,
    ) -> Result<Vec<AuthorizationRecord>, AuthorizationServiceError> {
        let records = self.repository.list_by_agency(agency)?;
        records
            .into_iter()
            .map(|record| self.refresh(record).map_err(Into::into))
            .collect()
    }

    pub fn list_by_client(
        &self,
        client: &CompanyId,
    ) -> Result<Vec<AuthorizationRecord>, AuthorizationServiceError> {
        let records = self.repository.list_by_client(client)?;
        records
            .into_iter()
            .map(|record| self.refresh(record).map_err(Into::into))
            .collect()
    }

    /// The record governing `(agency, client)`, only if currently `active`.
    /// The lazy expiry refresh runs first so an elapsed contract is reported
    /// as unusable even before the periodic sweep reaches it.
    pub fn find_active(
        &self,
        agency: &CompanyId,
        client: &CompanyId,
    ) -> Result<Option<AuthorizationRecord>, AuthorizationServiceError> {
        let Some(record) = self.repository.find_pair(agency, client)? else {
            return Ok(None);
        };
        let record = self.refresh(record)?;
        Ok(record.is_active().then_some(record))
    }

    /// Periodic sweep forcing `active -> expired` (or renewal) across the
    /// store. Converges on the same guard as the lazy read path.
    pub fn run_expiry_sweep(&self) -> Result<SweepOutcome, AuthorizationServiceError> {
        let now = Utc::now();
        let mut outcome = SweepOutcome::default();

        for mut record in self.repository.list_active()? {
            if let Some(event) = self.lifecycle.check_expiry(&mut record, now) {
                match record.is_active() {
                    true => outcome.renewed += 1,
                    false => outcome.expired += 1,
                }
                self.repository.update(record)?;
                self.dispatcher.notify(event)?;
            }
        }

        if outcome.expired > 0 || outcome.renewed > 0 {
            info!(
                expired = outcome.expired,
                renewed = outcome.renewed,
                "contract expiry sweep applied transitions"
            );
        }

        Ok(outcome)
    }

    fn load(&self, id: &AuthorizationId) -> Result<AuthorizationRecord, RepositoryError> {
        self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)
    }

    /// Apply the lazy confirmation-timeout and contract-expiry checks,
    /// persisting and dispatching whatever transition fires.
    fn refresh(
        &self,
        mut record: AuthorizationRecord,
    ) -> Result<AuthorizationRecord, RefreshError> {
        let now = Utc::now();

        let timeout = self.lifecycle.check_confirmation_timeout(&mut record, now);
        let expiry = self.lifecycle.check_expiry(&mut record, now);

        if timeout.is_some() || expiry.is_some() {
            self.repository.update(record.clone())?;
            for event in [timeout, expiry].into_iter().flatten() {
                self.dispatcher.notify(event)?;
            }
        }

        Ok(record)
    }
}

/// Internal error for the refresh path, flattened into the service error.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RefreshError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// Error raised by the authorization service facade.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationServiceError {
    #[error("an agency cannot request authorization for itself")]
    AgencyIsClient,
    #[error("contract start date must not be after the end date")]
    InvalidContractWindow,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl From<RefreshError> for AuthorizationServiceError {
    fn from(value: RefreshError) -> Self {
        match value {
            RefreshError::Repository(err) => Self::Repository(err),
            RefreshError::Notification(err) => Self::Notification(err),
        }
    }
}
