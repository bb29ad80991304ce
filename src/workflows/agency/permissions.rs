use serde::{Deserialize, Serialize};

use super::domain::{AuthorizationRecord, AuthorizationStatus, JobAction, JobDraft};

/// Structured denial reasons so callers can surface actionable UI messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    NotActive { status: AuthorizationStatus },
    PostingNotPermitted,
    EditingNotPermitted,
    DeletionNotPermitted,
    ApplicationsNotVisible,
    QuotaExceeded { limit: u32 },
    CategoryNotAuthorized { category: String },
    LocationNotAuthorized { location: String },
}

impl DenialReason {
    pub fn summary(&self) -> String {
        match self {
            DenialReason::NotActive { status } => {
                format!("authorization is not active (status '{}')", status.label())
            }
            DenialReason::PostingNotPermitted => {
                "authorization does not permit posting jobs".to_string()
            }
            DenialReason::EditingNotPermitted => {
                "authorization does not permit editing jobs".to_string()
            }
            DenialReason::DeletionNotPermitted => {
                "authorization does not permit deleting jobs".to_string()
            }
            DenialReason::ApplicationsNotVisible => {
                "authorization does not permit viewing applications".to_string()
            }
            DenialReason::QuotaExceeded { limit } => {
                format!("active job quota of {limit} reached")
            }
            DenialReason::CategoryNotAuthorized { category } => {
                format!("category '{category}' is not in the authorized list")
            }
            DenialReason::LocationNotAuthorized { location } => {
                format!("location '{location}' is not in the authorized list")
            }
        }
    }
}

/// Constraint set narrowed to the evaluated record, returned on allow so the
/// caller can render remaining quota and allow-lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedConstraints {
    pub remaining_quota: Option<u32>,
    pub job_categories: Vec<String>,
    pub allowed_locations: Vec<String>,
}

/// Allow/deny decision for a requested job action. Expected denials are
/// values, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow { constraints: GrantedConstraints },
    Deny { reason: DenialReason },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    fn deny(reason: DenialReason) -> Self {
        Decision::Deny { reason }
    }
}

/// Malformed input is the only error path; denials are part of `Decision`.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("job context is required to evaluate '{}'", .action.label())]
    MissingJobContext { action: JobAction },
}

/// Evaluates the permission matrix of an authorization against a requested
/// job action at mutation time, not just at creation time.
#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn can_perform(
        &self,
        record: &AuthorizationRecord,
        action: JobAction,
        job: Option<&JobDraft>,
    ) -> Result<Decision, EvaluationError> {
        if record.status != AuthorizationStatus::Active {
            return Ok(Decision::deny(DenialReason::NotActive {
                status: record.status,
            }));
        }

        let permissions = &record.permissions;
        let decision = match action {
            JobAction::Create => {
                let job = job.ok_or(EvaluationError::MissingJobContext { action })?;
                self.evaluate_create(record, job)
            }
            JobAction::Edit if !permissions.can_edit_jobs => {
                Decision::deny(DenialReason::EditingNotPermitted)
            }
            JobAction::Delete if !permissions.can_delete_jobs => {
                Decision::deny(DenialReason::DeletionNotPermitted)
            }
            JobAction::ViewApplications if !permissions.can_view_applications => {
                Decision::deny(DenialReason::ApplicationsNotVisible)
            }
            JobAction::Edit | JobAction::Delete | JobAction::ViewApplications => Decision::Allow {
                constraints: self.constraints_for(record),
            },
        };

        Ok(decision)
    }

    fn evaluate_create(&self, record: &AuthorizationRecord, job: &JobDraft) -> Decision {
        let permissions = &record.permissions;

        if !permissions.can_post_jobs {
            return Decision::deny(DenialReason::PostingNotPermitted);
        }

        if let Some(limit) = permissions.max_active_jobs {
            if record.usage.jobs_posted >= limit {
                return Decision::deny(DenialReason::QuotaExceeded { limit });
            }
        }

        // Empty allow-list means unrestricted.
        if !permissions.job_categories.is_empty()
            && !permissions
                .job_categories
                .iter()
                .any(|category| category.eq_ignore_ascii_case(&job.category))
        {
            return Decision::deny(DenialReason::CategoryNotAuthorized {
                category: job.category.clone(),
            });
        }

        if !permissions.allowed_locations.is_empty()
            && !permissions
                .allowed_locations
                .iter()
                .any(|location| location.eq_ignore_ascii_case(&job.location))
        {
            return Decision::deny(DenialReason::LocationNotAuthorized {
                location: job.location.clone(),
            });
        }

        Decision::Allow {
            constraints: self.constraints_for(record),
        }
    }

    fn constraints_for(&self, record: &AuthorizationRecord) -> GrantedConstraints {
        GrantedConstraints {
            remaining_quota: record.remaining_quota(),
            job_categories: record.permissions.job_categories.clone(),
            allowed_locations: record.permissions.allowed_locations.clone(),
        }
    }
}
