use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::domain::{AuthorizationId, CompanyId};
use chrono::NaiveDate;

/// Lifecycle events handed to the notification boundary. Delivery (email,
/// in-app) is owned by an external collaborator; this core only dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationEvent {
    ClientConfirmationRequested {
        authorization_id: AuthorizationId,
        client_company_id: CompanyId,
        contacts: Vec<String>,
    },
    AdminReviewQueued {
        authorization_id: AuthorizationId,
        reason: String,
    },
    Activated {
        authorization_id: AuthorizationId,
    },
    Rejected {
        authorization_id: AuthorizationId,
        reason: String,
    },
    Revoked {
        authorization_id: AuthorizationId,
        revoked_by: String,
        reason: String,
    },
    Expired {
        authorization_id: AuthorizationId,
    },
    Renewed {
        authorization_id: AuthorizationId,
        new_end_date: Option<NaiveDate>,
    },
}

/// Outbound dispatch hook for authorization lifecycle events.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, event: AuthorizationEvent) -> Result<(), NotificationError>;
}

/// Dispatch failure surfaced by a notification adapter.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Dispatcher that logs events through `tracing`; default for the server
/// shell until a delivery adapter is wired in.
#[derive(Debug, Default, Clone)]
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn notify(&self, event: AuthorizationEvent) -> Result<(), NotificationError> {
        tracing::info!(?event, "authorization event dispatched");
        Ok(())
    }
}

/// Dispatcher that records events in memory so tests and the demo command
/// can assert on what was emitted.
#[derive(Debug, Default, Clone)]
pub struct MemoryDispatcher {
    events: Arc<Mutex<Vec<AuthorizationEvent>>>,
}

impl MemoryDispatcher {
    pub fn events(&self) -> Vec<AuthorizationEvent> {
        self.events.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn notify(&self, event: AuthorizationEvent) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(event);
        Ok(())
    }
}
