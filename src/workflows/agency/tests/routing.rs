use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use super::common::*;
use crate::workflows::agency::attribution::JobAttributionResolver;
use crate::workflows::agency::domain::VerificationMethod;
use crate::workflows::agency::router::{agency_router, AgencyState};

fn test_router(registry: StaticRegistry) -> (Router, Arc<TestService>) {
    let (service, repository, _dispatcher) = build_service(registry);
    let resolver = Arc::new(JobAttributionResolver::new(service.clone(), repository));
    let router = agency_router(AgencyState {
        service: service.clone(),
        resolver,
    });
    (router, service)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn request_body() -> Value {
    json!({
        "agency_company_id": "talent-partners",
        "client_company_id": "clearline-analytics",
        "verification_method": "automated_gst",
        "documents": { "client_gst_number": "29ABCDE1234F1Z5" },
        "client_contact_emails": ["hr@clearline.example"],
    })
}

#[tokio::test]
async fn request_endpoint_creates_an_authorization() {
    let (router, _service) = test_router(StaticRegistry::Matches);

    let response = router
        .oneshot(post_json("/api/v1/agency/authorizations", request_body()))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending_client_confirm");
    assert_eq!(body["agency_company_id"], "talent-partners");
    assert_eq!(body["jobs_posted"], 0);
}

#[tokio::test]
async fn duplicate_request_maps_to_conflict() {
    let (router, _service) = test_router(StaticRegistry::Matches);

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/agency/authorizations", request_body()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(post_json("/api/v1/agency/authorizations", request_body()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn confirm_endpoint_activates_the_record() {
    let (router, service) = test_router(StaticRegistry::Matches);

    let record = service
        .request(request(VerificationMethod::AutomatedGst))
        .expect("request succeeds");

    let uri = format!("/api/v1/agency/authorizations/{}/confirm", record.id.0);
    let response = router
        .oneshot(post_json(&uri, json!({ "email": "hr@clearline.example" })))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn rejection_without_reason_is_unprocessable() {
    let (router, service) = test_router(StaticRegistry::Matches);

    let record = service
        .request(request(VerificationMethod::ManualReview))
        .expect("request succeeds");

    let uri = format!("/api/v1/agency/authorizations/{}/decision", record.id.0);
    let response = router
        .oneshot(post_json(
            &uri,
            json!({ "approve": false, "admin_id": "admin-1" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_authorization_returns_not_found() {
    let (router, _service) = test_router(StaticRegistry::Matches);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/agency/authorizations/auth-does-not-exist")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_requires_a_company_filter() {
    let (router, _service) = test_router(StaticRegistry::Matches);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/agency/authorizations")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn job_endpoint_attributes_and_enforces_quota() {
    let (router, service) = test_router(StaticRegistry::Matches);

    let mut req = request(VerificationMethod::ManualReview);
    req.permissions.max_active_jobs = Some(1);
    let record = activate(&service, req).expect("activation succeeds");

    let job_body = json!({
        "agency_company_id": "talent-partners",
        "agency_user_id": "recruiter-7",
        "client_company_id": "clearline-analytics",
        "job": {
            "title": "Senior Data Engineer",
            "category": "engineering",
            "location": "Bengaluru",
        },
    });

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/agency/jobs", job_body.clone()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["hiring_company_id"], "clearline-analytics");
    assert_eq!(body["posted_by_agency_id"], "talent-partners");
    assert_eq!(body["is_agency_posted"], true);
    assert_eq!(body["authorization_id"], record.id.0);

    let response = router
        .oneshot(post_json("/api/v1/agency/jobs", job_body))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message present")
        .contains("quota"));
}
