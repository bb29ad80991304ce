use serde::{Deserialize, Serialize};

use super::domain::{AuthorizationRecord, VerificationMethod};

/// Result of a GST registry lookup for a client company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GstLookup {
    /// Positive, unambiguous match on the registered entity.
    Match { legal_name: String },
    /// Number is known to the registry but does not match the client.
    NoMatch,
    /// Registry returned conflicting or partial data.
    Ambiguous,
}

/// External tax-registry collaborator consulted by automated verification.
pub trait GstRegistry: Send + Sync {
    fn lookup(&self, gst_number: &str) -> Result<GstLookup, RegistryError>;
}

/// Infrastructure failures from the registry collaborator. The verification
/// service converts these into an inconclusive outcome and never lets them
/// propagate past the workflow boundary.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Unreachable(String),
    #[error("registry lookup timed out after {0}ms")]
    Timeout(u64),
}

/// Why a verification pass did or did not clear the automated gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    RegistryMatched { legal_name: String },
    RegistryMismatch,
    MissingGstNumber,
    ManualPolicy,
    Inconclusive { detail: String },
}

impl VerificationReason {
    pub fn summary(&self) -> String {
        match self {
            VerificationReason::RegistryMatched { legal_name } => {
                format!("GST registry matched '{legal_name}'")
            }
            VerificationReason::RegistryMismatch => {
                "GST registry did not match the client company".to_string()
            }
            VerificationReason::MissingGstNumber => {
                "no GST number supplied; needs manual review".to_string()
            }
            VerificationReason::ManualPolicy => {
                "manual review required by verification method".to_string()
            }
            VerificationReason::Inconclusive { detail } => {
                format!("verification inconclusive, needs manual review: {detail}")
            }
        }
    }
}

/// Outcome handed to the lifecycle: whether the record may advance toward
/// activation without an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub method: VerificationMethod,
    pub auto_approve: bool,
    pub reason: VerificationReason,
}

/// Placeholder registry for deployments without a GST integration wired in.
/// Every lookup fails, so automated verification stays fail-closed and all
/// requests route through manual review.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredRegistry;

impl GstRegistry for UnconfiguredRegistry {
    fn lookup(&self, _gst_number: &str) -> Result<GstLookup, RegistryError> {
        Err(RegistryError::Unreachable(
            "no GST registry integration configured".to_string(),
        ))
    }
}

/// Decides, per verification method, whether a record can move toward
/// `active` automatically or must wait for human action. Pure with respect
/// to the record; the lifecycle applies the outcome.
pub struct VerificationService<G> {
    registry: G,
}

impl<G: GstRegistry> VerificationService<G> {
    pub fn new(registry: G) -> Self {
        Self { registry }
    }

    pub fn evaluate(&self, record: &AuthorizationRecord) -> VerificationOutcome {
        let method = record.verification_method;
        match method {
            VerificationMethod::ManualReview => VerificationOutcome {
                method,
                auto_approve: false,
                reason: VerificationReason::ManualPolicy,
            },
            // Hybrid shortens the path but never skips client confirmation;
            // the lifecycle routes auto-approved records through
            // `pending_client_confirm` for both automated methods.
            VerificationMethod::AutomatedGst | VerificationMethod::Hybrid => {
                self.automated_check(record, method)
            }
        }
    }

    /// Fail-closed: any ambiguity or registry fault demotes to manual review.
    fn automated_check(
        &self,
        record: &AuthorizationRecord,
        method: VerificationMethod,
    ) -> VerificationOutcome {
        let Some(gst_number) = record.documents.client_gst_number.as_deref() else {
            return VerificationOutcome {
                method,
                auto_approve: false,
                reason: VerificationReason::MissingGstNumber,
            };
        };

        match self.registry.lookup(gst_number) {
            Ok(GstLookup::Match { legal_name }) => VerificationOutcome {
                method,
                auto_approve: true,
                reason: VerificationReason::RegistryMatched { legal_name },
            },
            Ok(GstLookup::NoMatch) => VerificationOutcome {
                method,
                auto_approve: false,
                reason: VerificationReason::RegistryMismatch,
            },
            Ok(GstLookup::Ambiguous) => VerificationOutcome {
                method,
                auto_approve: false,
                reason: VerificationReason::Inconclusive {
                    detail: "registry returned ambiguous data".to_string(),
                },
            },
            Err(err) => VerificationOutcome {
                method,
                auto_approve: false,
                reason: VerificationReason::Inconclusive {
                    detail: err.to_string(),
                },
            },
        }
    }
}
