use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::domain::{AuthorizationId, AuthorizationRecord, AuthorizationStatus, CompanyId};

/// Storage abstraction for authorization records. The repository persists
/// whatever state the lifecycle hands it and enforces only the two storage
/// invariants: pair uniqueness and the atomic quota increment.
pub trait AuthorizationRepository: Send + Sync {
    /// Insert a new record. Fails `Duplicate` while a non-terminal record
    /// exists for the same `(agency, client)` pair; this constraint lives at
    /// the storage boundary to close the concurrent-creation race.
    fn insert(&self, record: AuthorizationRecord) -> Result<AuthorizationRecord, RepositoryError>;

    fn fetch(&self, id: &AuthorizationId) -> Result<Option<AuthorizationRecord>, RepositoryError>;

    /// The non-terminal record for the pair, if any.
    fn find_pair(
        &self,
        agency: &CompanyId,
        client: &CompanyId,
    ) -> Result<Option<AuthorizationRecord>, RepositoryError>;

    fn update(&self, record: AuthorizationRecord) -> Result<(), RepositoryError>;

    fn list_by_agency(&self, agency: &CompanyId)
        -> Result<Vec<AuthorizationRecord>, RepositoryError>;

    fn list_by_client(&self, client: &CompanyId)
        -> Result<Vec<AuthorizationRecord>, RepositoryError>;

    /// Feed for the periodic expiry sweep.
    fn list_active(&self) -> Result<Vec<AuthorizationRecord>, RepositoryError>;

    /// Conditional increment of `jobs_posted`, atomic with the quota check.
    /// Two concurrent posts near `max_active_jobs` must not both succeed;
    /// read-then-write is unsafe here.
    fn record_job_posted(
        &self,
        id: &AuthorizationId,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationRecord, RepositoryError>;

    /// Monotone bump of `total_applications` for an agency-posted job.
    fn record_application_received(
        &self,
        id: &AuthorizationId,
    ) -> Result<AuthorizationRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("an authorization for this agency-client pair already exists")]
    Duplicate,
    #[error("authorization record not found")]
    NotFound,
    #[error("authorization is not active")]
    NotActive,
    #[error("active job quota of {limit} reached")]
    QuotaReached { limit: u32 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// In-memory store backing the server shell, demo command, and tests. The
/// mutex critical section doubles as the row lock the quota check needs.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationRepository {
    records: Mutex<HashMap<AuthorizationId, AuthorizationRecord>>,
}

impl AuthorizationRepository for InMemoryAuthorizationRepository {
    fn insert(&self, record: AuthorizationRecord) -> Result<AuthorizationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");

        let pair_taken = guard.values().any(|existing| {
            existing.agency_company_id == record.agency_company_id
                && existing.client_company_id == record.client_company_id
                && !existing.status.is_terminal()
        });
        if pair_taken || guard.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate);
        }

        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &AuthorizationId) -> Result<Option<AuthorizationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_pair(
        &self,
        agency: &CompanyId,
        client: &CompanyId,
    ) -> Result<Option<AuthorizationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| {
                record.agency_company_id == *agency
                    && record.client_company_id == *client
                    && !record.status.is_terminal()
            })
            .cloned())
    }

    fn update(&self, record: AuthorizationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn list_by_agency(
        &self,
        agency: &CompanyId,
    ) -> Result<Vec<AuthorizationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| record.agency_company_id == *agency)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn list_by_client(
        &self,
        client: &CompanyId,
    ) -> Result<Vec<AuthorizationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| record.client_company_id == *client)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn list_active(&self) -> Result<Vec<AuthorizationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.status == AuthorizationStatus::Active)
            .cloned()
            .collect())
    }

    fn record_job_posted(
        &self,
        id: &AuthorizationId,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;

        if record.status != AuthorizationStatus::Active {
            return Err(RepositoryError::NotActive);
        }
        if let Some(limit) = record.permissions.max_active_jobs {
            if record.usage.jobs_posted >= limit {
                return Err(RepositoryError::QuotaReached { limit });
            }
        }

        record.usage.jobs_posted += 1;
        record.usage.last_job_posted_at = Some(now);
        record.updated_at = now;
        Ok(record.clone())
    }

    fn record_application_received(
        &self,
        id: &AuthorizationId,
    ) -> Result<AuthorizationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.usage.total_applications += 1;
        Ok(record.clone())
    }
}
