use chrono::{DateTime, Duration, Utc};

use super::domain::{AuthorizationRecord, AuthorizationStatus};
use super::notifications::AuthorizationEvent;
use super::verification::VerificationOutcome;

const DEFAULT_CONFIRMATION_WINDOW_DAYS: u32 = 7;

/// Lifecycle operations, named for transition-error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOperation {
    Submit,
    ClientConfirm,
    AdminApprove,
    AdminReject,
    Revoke,
}

impl LifecycleOperation {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::ClientConfirm => "client_confirm",
            Self::AdminApprove => "admin_approve",
            Self::AdminReject => "admin_reject",
            Self::Revoke => "revoke",
        }
    }
}

/// Guard failures raised by the state machine. Re-entrant transitions fail
/// hard rather than silently succeeding so callers cannot mask
/// double-submission bugs.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {} an authorization in status '{}'", .operation.label(), .from.label())]
    InvalidTransition {
        from: AuthorizationStatus,
        operation: LifecycleOperation,
    },
    #[error("confirming email '{email}' is not a registered client contact")]
    ConfirmationEmailNotRecognized { email: String },
    #[error("a reason is required to {}", .operation.label())]
    ReasonRequired { operation: LifecycleOperation },
}

/// Who revoked an active authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationActor {
    Admin { admin_id: String },
    Agency { user_id: String },
}

impl RevocationActor {
    fn description(&self) -> String {
        match self {
            RevocationActor::Admin { admin_id } => format!("admin:{admin_id}"),
            RevocationActor::Agency { user_id } => format!("agency:{user_id}"),
        }
    }
}

/// Owns every valid state transition. Each applied transition stamps the
/// relevant audit fields, bumps `updated_at`, and yields the notification
/// event the caller must dispatch.
#[derive(Debug, Clone)]
pub struct AuthorizationLifecycle {
    confirmation_window: Duration,
}

impl Default for AuthorizationLifecycle {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_WINDOW_DAYS)
    }
}

impl AuthorizationLifecycle {
    pub fn new(confirmation_window_days: u32) -> Self {
        Self {
            confirmation_window: Duration::days(i64::from(confirmation_window_days)),
        }
    }

    pub fn confirmation_window(&self) -> Duration {
        self.confirmation_window
    }

    /// Route a freshly created record out of `pending` using the
    /// verification outcome: auto-approved requests await client
    /// confirmation, everything else queues for admin review.
    pub fn submit(
        &self,
        record: &mut AuthorizationRecord,
        outcome: &VerificationOutcome,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationEvent, TransitionError> {
        if record.status != AuthorizationStatus::Pending {
            return Err(TransitionError::InvalidTransition {
                from: record.status,
                operation: LifecycleOperation::Submit,
            });
        }

        record.verification_note = Some(outcome.reason.summary());

        let event = if outcome.auto_approve {
            record.status = AuthorizationStatus::PendingClientConfirm;
            record.verified_at = Some(now);
            record.confirmation_requested_at = Some(now);
            AuthorizationEvent::ClientConfirmationRequested {
                authorization_id: record.id.clone(),
                client_company_id: record.client_company_id.clone(),
                contacts: record.client_contact_emails.clone(),
            }
        } else {
            record.status = AuthorizationStatus::PendingAdminReview;
            AuthorizationEvent::AdminReviewQueued {
                authorization_id: record.id.clone(),
                reason: outcome.reason.summary(),
            }
        };

        record.updated_at = now;
        Ok(event)
    }

    /// Client confirmation via emailed link. The confirming address must be
    /// one of the contacts registered at creation time.
    pub fn confirm_by_client(
        &self,
        record: &mut AuthorizationRecord,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationEvent, TransitionError> {
        if record.status != AuthorizationStatus::PendingClientConfirm {
            return Err(TransitionError::InvalidTransition {
                from: record.status,
                operation: LifecycleOperation::ClientConfirm,
            });
        }

        let recognized = record
            .client_contact_emails
            .iter()
            .any(|contact| contact.eq_ignore_ascii_case(email.trim()));
        if !recognized {
            return Err(TransitionError::ConfirmationEmailNotRecognized {
                email: email.to_string(),
            });
        }

        record.status = AuthorizationStatus::Active;
        record.client_confirmed_at = Some(now);
        record.client_confirmed_by = Some(email.trim().to_string());
        record.updated_at = now;

        Ok(AuthorizationEvent::Activated {
            authorization_id: record.id.clone(),
        })
    }

    /// Lazy confirmation-timeout check: a request the client never confirmed
    /// falls back to admin review once the policy window elapses. Evaluated
    /// on access, never by a blocking timer.
    pub fn check_confirmation_timeout(
        &self,
        record: &mut AuthorizationRecord,
        now: DateTime<Utc>,
    ) -> Option<AuthorizationEvent> {
        if record.status != AuthorizationStatus::PendingClientConfirm {
            return None;
        }
        let requested_at = record.confirmation_requested_at?;
        if now - requested_at <= self.confirmation_window {
            return None;
        }

        record.status = AuthorizationStatus::PendingAdminReview;
        record.updated_at = now;

        Some(AuthorizationEvent::AdminReviewQueued {
            authorization_id: record.id.clone(),
            reason: format!(
                "client confirmation not received within {} days",
                self.confirmation_window.num_days()
            ),
        })
    }

    pub fn admin_approve(
        &self,
        record: &mut AuthorizationRecord,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationEvent, TransitionError> {
        if record.status != AuthorizationStatus::PendingAdminReview {
            return Err(TransitionError::InvalidTransition {
                from: record.status,
                operation: LifecycleOperation::AdminApprove,
            });
        }

        record.status = AuthorizationStatus::Active;
        record.admin_approved_at = Some(now);
        record.admin_approved_by = Some(admin_id.to_string());
        record.verified_at.get_or_insert(now);
        record.verified_by = Some(admin_id.to_string());
        record.updated_at = now;

        Ok(AuthorizationEvent::Activated {
            authorization_id: record.id.clone(),
        })
    }

    pub fn admin_reject(
        &self,
        record: &mut AuthorizationRecord,
        admin_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationEvent, TransitionError> {
        if record.status != AuthorizationStatus::PendingAdminReview {
            return Err(TransitionError::InvalidTransition {
                from: record.status,
                operation: LifecycleOperation::AdminReject,
            });
        }
        if reason.trim().is_empty() {
            return Err(TransitionError::ReasonRequired {
                operation: LifecycleOperation::AdminReject,
            });
        }

        record.status = AuthorizationStatus::Rejected;
        record.rejection_reason = Some(reason.trim().to_string());
        record.admin_approved_by = Some(admin_id.to_string());
        record.updated_at = now;

        Ok(AuthorizationEvent::Rejected {
            authorization_id: record.id.clone(),
            reason: reason.trim().to_string(),
        })
    }

    /// Revocation by an admin or the agency itself. In-flight jobs are not
    /// deleted but become unmanageable by the agency.
    pub fn revoke(
        &self,
        record: &mut AuthorizationRecord,
        actor: &RevocationActor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationEvent, TransitionError> {
        if record.status != AuthorizationStatus::Active {
            return Err(TransitionError::InvalidTransition {
                from: record.status,
                operation: LifecycleOperation::Revoke,
            });
        }
        if reason.trim().is_empty() {
            return Err(TransitionError::ReasonRequired {
                operation: LifecycleOperation::Revoke,
            });
        }

        record.status = AuthorizationStatus::Revoked;
        record.rejection_reason = Some(reason.trim().to_string());
        record.updated_at = now;

        Ok(AuthorizationEvent::Revoked {
            authorization_id: record.id.clone(),
            revoked_by: actor.description(),
            reason: reason.trim().to_string(),
        })
    }

    /// Contract-expiry guard shared by lazy reads and the periodic sweep:
    /// past `end_date` either renews the window in place (auto_renew,
    /// counters preserved) or expires the record.
    pub fn check_expiry(
        &self,
        record: &mut AuthorizationRecord,
        now: DateTime<Utc>,
    ) -> Option<AuthorizationEvent> {
        if record.status != AuthorizationStatus::Active {
            return None;
        }
        if !record.contract.elapsed(now.date_naive()) {
            return None;
        }

        let renewable = record.contract.auto_renew
            && matches!(
                (record.contract.start_date, record.contract.end_date),
                (Some(start), Some(end)) if start < end
            );

        let event = if renewable {
            // A long-idle window may need several spans to reach the present.
            while record.contract.elapsed(now.date_naive()) {
                record.contract = record.contract.renewed();
            }
            AuthorizationEvent::Renewed {
                authorization_id: record.id.clone(),
                new_end_date: record.contract.end_date,
            }
        } else {
            record.status = AuthorizationStatus::Expired;
            AuthorizationEvent::Expired {
                authorization_id: record.id.clone(),
            }
        };

        record.updated_at = now;
        Some(event)
    }
}
