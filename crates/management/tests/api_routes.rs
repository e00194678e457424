//! HTTP-level checks of the management router: status codes, actor headers
//! and JSON shapes.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use mailer_audience::{Employee, EmployeeStatus, InMemoryDirectory};
use mailer_core::audit::capture_sink;
use mailer_core::AppConfig;
use mailer_management::{management_router, ManagementState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN_ROLES: &str = "SUPER_ADMIN,APPROVER";

fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.attachments.path = dir.path().to_string_lossy().into_owned();
    config.sending.internal_domains = vec!["corp.example.com".into()];

    let directory = InMemoryDirectory::new(vec![
        Employee {
            id: Uuid::new_v4(),
            email: "ana@corp.example.com".into(),
            full_name: "Ana".into(),
            title: Some("Engineer".into()),
            status: EmployeeStatus::Active,
            department: Some("Engineering".into()),
            location: Some("Austin".into()),
        },
        Employee {
            id: Uuid::new_v4(),
            email: "ben@corp.example.com".into(),
            full_name: "Ben".into(),
            title: None,
            status: EmployeeStatus::Active,
            department: Some("Sales".into()),
            location: Some("Berlin".into()),
        },
    ]);
    let state = ManagementState::new(&config, Arc::new(directory), capture_sink());
    (management_router(state), dir)
}

async fn body_json(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-email", "ops@corp.example.com")
        .header("x-actor-roles", ADMIN_ROLES);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

/// Create an SMTP account and sender identity, returning their ids.
async fn sending_pair(app: &Router) -> (String, String) {
    let resp = call(
        app,
        "POST",
        "/api/admin/smtp-accounts",
        Some(json!({ "name": "Relay", "host": "smtp.corp.example.com", "port": 587 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let smtp_id = body_json(resp).await["id"].as_str().unwrap().to_string();

    let resp = call(
        app,
        "POST",
        "/api/admin/sender-identities",
        Some(json!({
            "display_name": "Comms",
            "email": "Comms@Corp.Example.com",
            "smtp_account_id": smtp_id,
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let sender = body_json(resp).await;
    assert_eq!(sender["email"], "comms@corp.example.com");
    (smtp_id, sender["id"].as_str().unwrap().to_string())
}

async fn create_campaign(app: &Router, category: &str) -> String {
    let (smtp_id, sender_id) = sending_pair(app).await;
    let resp = call(
        app,
        "POST",
        "/api/campaigns",
        Some(json!({
            "title": "Benefits update",
            "subject": "Open enrollment",
            "html_body": "<p>Enroll by Friday</p>",
            "category": category,
            "sender_identity_id": sender_id,
            "smtp_account_id": smtp_id,
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let campaign = body_json(resp).await;
    assert_eq!(campaign["status"], "DRAFT");
    campaign["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = test_app();
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn test_missing_actor_header_is_forbidden() {
    let (app, _dir) = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/audiences")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "All", "rules": [] }).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "forbidden");
}

#[tokio::test]
async fn test_unknown_campaign_is_404() {
    let (app, _dir) = test_app();
    let resp = call(&app, "GET", &format!("/api/campaigns/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approval_flow_over_http() {
    let (app, _dir) = test_app();
    let campaign_id = create_campaign(&app, "GENERAL").await;

    let resp = call(
        &app,
        "POST",
        "/api/audiences",
        Some(json!({
            "name": "Engineering",
            "rules": [{ "rule_type": "DEPARTMENT", "rule_value": "engineering" }],
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let audience_id = body_json(resp).await["id"].as_str().unwrap().to_string();

    let resp = call(
        &app,
        "POST",
        &format!("/api/campaigns/{}/submit", campaign_id),
        Some(json!({ "audience_ids": [audience_id] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "PENDING_APPROVAL");

    let resp = call(&app, "GET", &format!("/api/campaigns/{}/approvals", campaign_id), None).await;
    let approvals = body_json(resp).await;
    assert_eq!(approvals.as_array().unwrap().len(), 1);
    let approval_id = approvals[0]["id"].as_str().unwrap().to_string();

    let resp = call(
        &app,
        "POST",
        &format!("/api/approvals/{}/decision", approval_id),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "APPROVED");

    let resp = call(&app, "GET", &format!("/api/campaigns/{}", campaign_id), None).await;
    assert_eq!(body_json(resp).await["status"], "SENDING");

    let resp = call(
        &app,
        "GET",
        &format!("/api/reports/campaigns/{}/summary", campaign_id),
        None,
    )
    .await;
    let summary = body_json(resp).await;
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["queued"], 1);

    // Audience is frozen while the campaign is sending.
    let resp = call(&app, "DELETE", &format!("/api/audiences/{}", audience_id), None).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = call(&app, "DELETE", &format!("/api/campaigns/{}", campaign_id), None).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["error"], "invalid_state");
}

#[tokio::test]
async fn test_emergency_without_reason_is_unprocessable() {
    let (app, _dir) = test_app();
    let campaign_id = create_campaign(&app, "EMERGENCY").await;
    let resp = call(
        &app,
        "POST",
        &format!("/api/campaigns/{}/submit", campaign_id),
        Some(json!({ "audience_ids": [] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["error"], "missing_reason");
}

#[tokio::test]
async fn test_test_send_rejects_external_domain() {
    let (app, _dir) = test_app();
    let campaign_id = create_campaign(&app, "GENERAL").await;
    let resp = call(
        &app,
        "POST",
        &format!("/api/campaigns/{}/test-send", campaign_id),
        Some(json!({ "recipients": ["someone@gmail.com"] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_attachment_upload() {
    let (app, dir) = test_app();
    let campaign_id = create_campaign(&app, "GENERAL").await;
    let req = Request::builder()
        .method("POST")
        .uri(format!(
            "/api/campaigns/{}/attachments?file_name=handbook.pdf",
            campaign_id
        ))
        .header("x-actor-email", "ops@corp.example.com")
        .header("x-actor-roles", ADMIN_ROLES)
        .header("content-type", "application/pdf")
        .body(Body::from(vec![0x25u8, 0x50, 0x44, 0x46]))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let campaign = body_json(resp).await;
    let attachment = &campaign["attachments"][0];
    assert_eq!(attachment["original_name"], "handbook.pdf");
    assert_eq!(attachment["size"], 4);
    let stored = attachment["stored_name"].as_str().unwrap();
    assert!(dir.path().join(stored).exists());
}

fn upload_request(campaign_id: &str, file_name: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!(
            "/api/campaigns/{}/attachments?file_name={}",
            campaign_id, file_name
        ))
        .header("x-actor-email", "ops@corp.example.com")
        .header("x-actor-roles", ADMIN_ROLES)
        .header("content-type", "application/octet-stream")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_attachment_uploads_all_land() {
    let (app, dir) = test_app();
    let campaign_id = create_campaign(&app, "GENERAL").await;

    let uploads = (0..8).map(|i| {
        let app = app.clone();
        let req = upload_request(&campaign_id, &format!("part-{}.bin", i), vec![i as u8; 64]);
        tokio::spawn(async move { app.oneshot(req).await.unwrap().status() })
    });
    for upload in uploads.collect::<Vec<_>>() {
        assert_eq!(upload.await.unwrap(), StatusCode::OK);
    }

    let resp = call(&app, "GET", &format!("/api/campaigns/{}", campaign_id), None).await;
    let campaign = body_json(resp).await;
    let attachments = campaign["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 8);
    for attachment in attachments {
        assert!(dir.path().join(attachment["stored_name"].as_str().unwrap()).exists());
    }
}

#[tokio::test]
async fn test_attachment_upload_errors_keep_their_status() {
    let (app, _dir) = test_app();
    let resp = app
        .clone()
        .oneshot(upload_request(&Uuid::new_v4().to_string(), "a.pdf", vec![1, 2, 3]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let campaign_id = create_campaign(&app, "GENERAL").await;
    let resp = app
        .clone()
        .oneshot(upload_request(&campaign_id, "empty.pdf", Vec::new()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_policy_is_rejected() {
    let (app, _dir) = test_app();
    let resp = call(
        &app,
        "PUT",
        "/api/admin/policies",
        Some(json!({
            "org_wide_rule": "EVERYONE",
            "department_rule": "DEPT_ADMIN",
            "max_test_recipients": 5,
            "default_throttle_per_minute": 60,
            "send_window_hours": 2,
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = call(&app, "GET", "/api/admin/policies", None).await;
    assert_eq!(body_json(resp).await["org_wide_rule"], "HR_ADMIN+APPROVER");
}
