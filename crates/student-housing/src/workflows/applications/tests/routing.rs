use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::workflows::testing::{empty_request, get_request, json_request, read_json, Harness};

#[tokio::test]
async fn submit_route_creates_pending_application() {
    let harness = Harness::new();
    let admin = harness.admin("warden");
    harness.student("thandi");
    let lodge = harness.accommodation(admin, 3);
    let token = harness.token("thandi");

    let response = harness
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            &token,
            json!({ "accommodation_id": lodge.0, "notes": "Second-year engineering" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "pending");
    assert_eq!(payload["notes"], "Second-year engineering");
}

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() {
    let harness = Harness::new();

    let response = harness
        .router()
        .oneshot(get_request("/api/v1/applications", "not-a-token"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn approve_route_returns_lease_and_blocks_students() {
    let harness = Harness::new();
    let admin = harness.admin("warden");
    let student = harness.student("thandi");
    let lodge = harness.accommodation(admin, 3);
    let application = harness.apply(student, lodge);
    let uri = format!("/api/v1/applications/{}/approve", application.0);

    let student_token = harness.token("thandi");
    let denied = harness
        .router()
        .oneshot(json_request("POST", &uri, &student_token, json!({})))
        .await
        .expect("route executes");
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let admin_token = harness.token("warden");
    let response = harness
        .router()
        .oneshot(json_request(
            "POST",
            &uri,
            &admin_token,
            json!({ "monthly_rent": "4100.00" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["application"]["status"], "approved");
    assert_eq!(payload["lease"]["monthly_rent"], "4100.00");

    let again = harness
        .router()
        .oneshot(json_request("POST", &uri, &admin_token, json!({})))
        .await
        .expect("route executes");
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_route_filters_by_status() {
    let harness = Harness::new();
    let admin = harness.admin("warden");
    let student = harness.student("thandi");
    let lodge = harness.accommodation(admin, 3);
    harness.apply(student, lodge);
    let token = harness.token("warden");

    let pending = harness
        .router()
        .oneshot(get_request("/api/v1/applications?status=pending", &token))
        .await
        .expect("route executes");
    assert_eq!(pending.status(), StatusCode::OK);
    assert_eq!(read_json(pending).await.as_array().map(Vec::len), Some(1));

    let approved = harness
        .router()
        .oneshot(get_request("/api/v1/applications?status=approved", &token))
        .await
        .expect("route executes");
    assert_eq!(read_json(approved).await.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unknown_application_is_not_found() {
    let harness = Harness::new();
    harness.student("thandi");
    let token = harness.token("thandi");

    let response = harness
        .router()
        .oneshot(get_request("/api/v1/applications/999", &token))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approve_and_reject_accept_an_empty_body() {
    let harness = Harness::new();
    let admin = harness.admin("warden");
    let thandi = harness.student("thandi");
    let sipho = harness.student("sipho");
    let lodge = harness.accommodation(admin, 3);
    let approved = harness.apply(thandi, lodge);
    let rejected = harness.apply(sipho, lodge);
    let token = harness.token("warden");

    let response = harness
        .router()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/applications/{}/approve", approved.0),
            &token,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["lease"]["status"], "awaiting_signature");

    let response = harness
        .router()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/applications/{}/reject", rejected.0),
            &token,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "rejected");
}

#[tokio::test]
async fn malformed_bodies_are_reported_as_json_errors() {
    let harness = Harness::new();
    harness.student("thandi");
    let token = harness.token("thandi");

    let response = harness
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            &token,
            json!({ "accommodation_id": "lodge" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json(response).await;
    assert_eq!(payload["error"], "validation failed");
    assert!(payload["details"][0].is_string());

    let response = harness
        .router()
        .oneshot(get_request("/api/v1/applications/first", &token))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error"].is_string());
}
