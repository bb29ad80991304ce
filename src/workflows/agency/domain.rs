use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for authorization records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizationId(pub String);

/// Identifier wrapper for company accounts (agencies and clients alike).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Closed set of lifecycle states for an agency-client authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Pending,
    PendingClientConfirm,
    PendingAdminReview,
    Active,
    Expired,
    Revoked,
    Rejected,
}

impl AuthorizationStatus {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Pending,
            Self::PendingClientConfirm,
            Self::PendingAdminReview,
            Self::Active,
            Self::Expired,
            Self::Revoked,
            Self::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingClientConfirm => "pending_client_confirm",
            Self::PendingAdminReview => "pending_admin_review",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal records are retained for audit and never transition again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Revoked | Self::Rejected)
    }
}

/// Policy determining how much human review an authorization needs before activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    AutomatedGst,
    ManualReview,
    Hybrid,
}

impl VerificationMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AutomatedGst => "automated_gst",
            Self::ManualReview => "manual_review",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Permission matrix granted to an agency for one client.
///
/// `max_active_jobs = None` means unlimited; empty allow-lists mean unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionGrant {
    pub can_post_jobs: bool,
    pub can_edit_jobs: bool,
    pub can_delete_jobs: bool,
    pub can_view_applications: bool,
    pub max_active_jobs: Option<u32>,
    pub job_categories: Vec<String>,
    pub allowed_locations: Vec<String>,
}

impl Default for PermissionGrant {
    fn default() -> Self {
        Self {
            can_post_jobs: true,
            can_edit_jobs: true,
            can_delete_jobs: false,
            can_view_applications: true,
            max_active_jobs: None,
            job_categories: Vec::new(),
            allowed_locations: Vec::new(),
        }
    }
}

/// Optional contract window bounding the authorization in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContractWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_renew: bool,
}

impl ContractWindow {
    /// Both paths that expire a record (lazy read and periodic sweep) share this guard.
    pub fn elapsed(&self, on: NaiveDate) -> bool {
        matches!(self.end_date, Some(end) if on > end)
    }

    pub fn is_ordered(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// Shift the window forward by its original duration for auto-renewal.
    pub fn renewed(&self) -> Self {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                let span = end - start;
                Self {
                    start_date: Some(end),
                    end_date: Some(end + span),
                    auto_renew: self.auto_renew,
                }
            }
            _ => *self,
        }
    }
}

/// Reference to an externally stored supporting document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub name: String,
    pub url: String,
}

/// Document references backing the authorization request; file ownership is external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthorizationDocuments {
    pub authorization_letter_url: Option<String>,
    pub service_agreement_url: Option<String>,
    pub client_gst_number: Option<String>,
    pub client_pan_number: Option<String>,
    pub additional_documents: Vec<DocumentRef>,
}

/// Usage counters maintained by the attribution path, never decremented
/// except by corrective admin action outside this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UsageCounters {
    pub jobs_posted: u32,
    pub total_applications: u32,
    pub last_job_posted_at: Option<DateTime<Utc>>,
}

/// Persisted entity capturing one agency-client delegation: status,
/// permissions, contract window, and the verification/confirmation trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub id: AuthorizationId,
    pub agency_company_id: CompanyId,
    pub client_company_id: CompanyId,
    pub status: AuthorizationStatus,
    pub contract: ContractWindow,
    pub permissions: PermissionGrant,
    pub documents: AuthorizationDocuments,

    pub verification_method: VerificationMethod,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub verification_note: Option<String>,

    /// Emails registered at creation time; only these may confirm on behalf
    /// of the client. The confirming contact may not hold a platform account.
    pub client_contact_emails: Vec<String>,
    pub confirmation_requested_at: Option<DateTime<Utc>>,
    pub client_confirmed_at: Option<DateTime<Utc>>,
    pub client_confirmed_by: Option<String>,

    pub admin_approved_at: Option<DateTime<Utc>>,
    pub admin_approved_by: Option<String>,

    pub usage: UsageCounters,

    pub internal_notes: Option<String>,
    pub rejection_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthorizationRecord {
    /// Fresh record in `pending`, awaiting verification routing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AuthorizationId,
        agency_company_id: CompanyId,
        client_company_id: CompanyId,
        permissions: PermissionGrant,
        contract: ContractWindow,
        documents: AuthorizationDocuments,
        verification_method: VerificationMethod,
        client_contact_emails: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agency_company_id,
            client_company_id,
            status: AuthorizationStatus::Pending,
            contract,
            permissions,
            documents,
            verification_method,
            verified_at: None,
            verified_by: None,
            verification_note: None,
            client_contact_emails,
            confirmation_requested_at: None,
            client_confirmed_at: None,
            client_confirmed_by: None,
            admin_approved_at: None,
            admin_approved_by: None,
            usage: UsageCounters::default(),
            internal_notes: None,
            rejection_reason: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AuthorizationStatus::Active
    }

    /// Remaining quota under `max_active_jobs`, `None` when unlimited.
    pub fn remaining_quota(&self) -> Option<u32> {
        self.permissions
            .max_active_jobs
            .map(|limit| limit.saturating_sub(self.usage.jobs_posted))
    }
}

/// Job actions an agency may request against a client's listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Create,
    Edit,
    Delete,
    ViewApplications,
}

impl JobAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::ViewApplications => "view_applications",
        }
    }
}

/// Minimal slice of a job posting the authorization core needs to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub category: String,
    pub location: String,
}

/// Agency-side actor requesting a job mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyActor {
    pub company_id: CompanyId,
    pub user_id: String,
}

/// Attribution fields attached to a job once the resolver admits it.
///
/// Invariant: `posted_by_agency_id` is set iff `authorization_id` is set iff
/// the hiring company differs from the posting agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedJob {
    pub hiring_company_id: CompanyId,
    pub posted_by_agency_id: Option<CompanyId>,
    pub is_agency_posted: bool,
    pub authorization_id: Option<AuthorizationId>,
    pub draft: JobDraft,
}

impl AttributedJob {
    /// Attribution shape for a company posting its own job directly.
    pub fn direct(company: CompanyId, draft: JobDraft) -> Self {
        Self {
            hiring_company_id: company,
            posted_by_agency_id: None,
            is_agency_posted: false,
            authorization_id: None,
            draft,
        }
    }
}
