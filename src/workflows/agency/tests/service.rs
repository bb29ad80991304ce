use super::common::*;
use crate::workflows::agency::domain::{AuthorizationStatus, VerificationMethod};
use crate::workflows::agency::lifecycle::{RevocationActor, TransitionError};
use crate::workflows::agency::notifications::AuthorizationEvent;
use crate::workflows::agency::repository::{AuthorizationRepository, RepositoryError};
use crate::workflows::agency::service::AuthorizationServiceError;

#[test]
fn request_with_matching_registry_awaits_client_confirmation() {
    let (service, _repository, dispatcher) = build_service(StaticRegistry::Matches);

    let record = service
        .request(request(VerificationMethod::AutomatedGst))
        .expect("request succeeds");

    assert_eq!(record.status, AuthorizationStatus::PendingClientConfirm);
    assert!(record.verified_at.is_some());
    assert!(matches!(
        dispatcher.events().as_slice(),
        [AuthorizationEvent::ClientConfirmationRequested { .. }]
    ));
}

#[test]
fn request_with_unreachable_registry_queues_admin_review() {
    let (service, _repository, dispatcher) = build_service(StaticRegistry::Unreachable);

    let record = service
        .request(request(VerificationMethod::AutomatedGst))
        .expect("registry fault is not a request failure");

    assert_eq!(record.status, AuthorizationStatus::PendingAdminReview);
    assert!(matches!(
        dispatcher.events().as_slice(),
        [AuthorizationEvent::AdminReviewQueued { .. }]
    ));
}

#[test]
fn duplicate_pair_is_rejected_while_non_terminal() {
    let (service, _repository, _dispatcher) = build_service(StaticRegistry::Matches);

    let first = service
        .request(request(VerificationMethod::ManualReview))
        .expect("first request succeeds");

    let result = service.request(request(VerificationMethod::ManualReview));
    assert!(matches!(
        result,
        Err(AuthorizationServiceError::Repository(RepositoryError::Duplicate))
    ));

    // Once the prior record is terminal the pair frees up again.
    service
        .admin_decide(&first.id, false, "admin-1", Some("incomplete documents"))
        .expect("rejection succeeds");
    service
        .request(request(VerificationMethod::ManualReview))
        .expect("pair is reusable after a terminal record");
}

#[test]
fn request_rejects_agency_acting_for_itself() {
    let (service, _repository, _dispatcher) = build_service(StaticRegistry::Matches);

    let mut bad = request(VerificationMethod::ManualReview);
    bad.client_company_id = bad.agency_company_id.clone();

    assert!(matches!(
        service.request(bad),
        Err(AuthorizationServiceError::AgencyIsClient)
    ));
}

#[test]
fn request_rejects_inverted_contract_window() {
    let (service, _repository, _dispatcher) = build_service(StaticRegistry::Matches);

    let mut bad = request(VerificationMethod::ManualReview);
    bad.contract.start_date = Some(date(2026, 6, 1));
    bad.contract.end_date = Some(date(2026, 1, 1));

    assert!(matches!(
        service.request(bad),
        Err(AuthorizationServiceError::InvalidContractWindow)
    ));
}

#[test]
fn client_confirmation_activates_and_notifies() {
    let (service, _repository, dispatcher) = build_service(StaticRegistry::Matches);

    let record = service
        .request(request(VerificationMethod::Hybrid))
        .expect("hybrid with positive registry goes to client confirm");
    assert_eq!(record.status, AuthorizationStatus::PendingClientConfirm);

    let record = service
        .confirm_by_client(&record.id, "hr@clearline.example")
        .expect("registered contact confirms");

    assert_eq!(record.status, AuthorizationStatus::Active);
    assert!(dispatcher
        .events()
        .iter()
        .any(|event| matches!(event, AuthorizationEvent::Activated { .. })));
}

#[test]
fn stale_confirmation_falls_back_to_admin_review() {
    let (service, repository, _dispatcher) = build_service(StaticRegistry::Matches);

    let record = service
        .request(request(VerificationMethod::AutomatedGst))
        .expect("request succeeds");

    // Age the confirmation request past the policy window.
    let mut stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    stored.confirmation_requested_at = Some(at(2020, 1, 1));
    repository.update(stored).expect("update succeeds");

    let result = service.confirm_by_client(&record.id, "hr@clearline.example");
    assert!(matches!(
        result,
        Err(AuthorizationServiceError::Transition(
            TransitionError::InvalidTransition { .. }
        ))
    ));

    let stored = service.get(&record.id).expect("record readable");
    assert_eq!(stored.status, AuthorizationStatus::PendingAdminReview);

    // Admin review remains the recovery path.
    let record = service
        .admin_decide(&record.id, true, "admin-2", None)
        .expect("approval succeeds");
    assert_eq!(record.status, AuthorizationStatus::Active);
}

#[test]
fn admin_rejection_without_reason_is_refused() {
    let (service, _repository, _dispatcher) = build_service(StaticRegistry::Matches);

    let record = service
        .request(request(VerificationMethod::ManualReview))
        .expect("request succeeds");

    let result = service.admin_decide(&record.id, false, "admin-1", None);
    assert!(matches!(
        result,
        Err(AuthorizationServiceError::Transition(
            TransitionError::ReasonRequired { .. }
        ))
    ));
}

#[test]
fn lazy_expiry_hides_elapsed_contract_before_any_sweep() {
    let (service, repository, dispatcher) = build_service(StaticRegistry::Matches);

    let record = activate(&service, request(VerificationMethod::ManualReview))
        .expect("activation succeeds");

    let mut stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    stored.contract.start_date = Some(date(2025, 1, 1));
    stored.contract.end_date = Some(date(2025, 6, 30));
    stored.contract.auto_renew = false;
    repository.update(stored).expect("update succeeds");

    let active = service
        .find_active(&agency(), &client())
        .expect("lookup succeeds");
    assert!(active.is_none(), "elapsed contract must be unusable");

    let stored = service.get(&record.id).expect("record readable");
    assert_eq!(stored.status, AuthorizationStatus::Expired);
    assert!(dispatcher
        .events()
        .iter()
        .any(|event| matches!(event, AuthorizationEvent::Expired { .. })));
}

#[test]
fn sweep_and_lazy_read_converge_on_the_same_guard() {
    let (service, repository, _dispatcher) = build_service(StaticRegistry::Matches);

    let record = activate(&service, request(VerificationMethod::ManualReview))
        .expect("activation succeeds");

    let mut stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    stored.contract.start_date = Some(date(2025, 1, 1));
    stored.contract.end_date = Some(date(2025, 6, 30));
    repository.update(stored).expect("update succeeds");

    let outcome = service.run_expiry_sweep().expect("sweep succeeds");
    assert_eq!(outcome.expired, 1);
    assert_eq!(outcome.renewed, 0);

    // The sweep already expired it; the lazy path agrees and stays silent.
    let active = service
        .find_active(&agency(), &client())
        .expect("lookup succeeds");
    assert!(active.is_none());
}

#[test]
fn sweep_renews_auto_renewing_contracts_and_keeps_counters() {
    let (service, repository, dispatcher) = build_service(StaticRegistry::Matches);

    let record = activate(&service, request(VerificationMethod::ManualReview))
        .expect("activation succeeds");

    let mut stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    stored.contract.start_date = Some(date(2025, 1, 1));
    stored.contract.end_date = Some(date(2025, 6, 30));
    stored.contract.auto_renew = true;
    stored.usage.jobs_posted = 3;
    repository.update(stored).expect("update succeeds");

    let outcome = service.run_expiry_sweep().expect("sweep succeeds");
    assert_eq!(outcome.renewed, 1);
    assert_eq!(outcome.expired, 0);

    let refreshed = service
        .find_active(&agency(), &client())
        .expect("lookup succeeds")
        .expect("still active after renewal");
    assert_eq!(refreshed.usage.jobs_posted, 3);
    assert!(refreshed
        .contract
        .end_date
        .expect("end date present")
        > date(2026, 1, 1));
    assert!(dispatcher
        .events()
        .iter()
        .any(|event| matches!(event, AuthorizationEvent::Renewed { .. })));
}

#[test]
fn listings_are_grouped_per_company() {
    let (service, _repository, _dispatcher) = build_service(StaticRegistry::Matches);

    service
        .request(request(VerificationMethod::ManualReview))
        .expect("request succeeds");

    let by_agency = service.list_by_agency(&agency()).expect("listing succeeds");
    assert_eq!(by_agency.len(), 1);

    let by_client = service.list_by_client(&client()).expect("listing succeeds");
    assert_eq!(by_client.len(), 1);

    let other = service
        .list_by_agency(&crate::workflows::agency::domain::CompanyId("nobody".to_string()))
        .expect("listing succeeds");
    assert!(other.is_empty());
}

#[test]
fn revocation_is_terminal_and_audited() {
    let (service, _repository, dispatcher) = build_service(StaticRegistry::Matches);

    let record = activate(&service, request(VerificationMethod::ManualReview))
        .expect("activation succeeds");

    let record = service
        .revoke(
            &record.id,
            RevocationActor::Admin {
                admin_id: "admin-9".to_string(),
            },
            "client terminated the engagement",
        )
        .expect("revocation succeeds");

    assert_eq!(record.status, AuthorizationStatus::Revoked);
    assert_eq!(
        record.rejection_reason.as_deref(),
        Some("client terminated the engagement")
    );
    assert!(dispatcher.events().iter().any(|event| matches!(
        event,
        AuthorizationEvent::Revoked { revoked_by, .. } if revoked_by == "admin:admin-9"
    )));

    // Terminal for good: the record stays readable for audit but cannot move.
    let result = service.admin_decide(&record.id, true, "admin-9", None);
    assert!(matches!(
        result,
        Err(AuthorizationServiceError::Transition(
            TransitionError::InvalidTransition { .. }
        ))
    ));
}
