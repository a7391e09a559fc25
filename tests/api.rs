use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use workflow_catalog::{config::Config, create_app};

fn seed_workflow(dir: &TempDir, subdirectory: &str, filename: &str, definition: Value) {
    let target = dir.path().join("workflows").join(subdirectory);
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join(filename), serde_json::to_vec_pretty(&definition).unwrap()).unwrap();
}

async fn app_with(dir: &TempDir, configure: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config::rooted_at(dir.path());
    config.security.admin_token = None;
    configure(&mut config);
    create_app(config).await.unwrap()
}

async fn app(dir: &TempDir) -> Router {
    app_with(dir, |_| {}).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn categories_of(body: &Value) -> Vec<String> {
    body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect()
}

fn invoice_definition() -> Value {
    json!({
        "name": "Invoice Reminder",
        "active": true,
        "nodes": [
            { "name": "Webhook", "type": "n8n-nodes-base.webhook" },
            { "name": "Stripe", "type": "n8n-nodes-base.stripe" }
        ],
        "connections": {
            "Webhook": { "main": [[{ "node": "Stripe", "type": "main", "index": 0 }]] }
        }
    })
}

#[tokio::test]
async fn health_reports_healthy() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn adding_a_category_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, first) = send(&app, Method::POST, "/api/categories", Some(json!({ "category": "Marketing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["added"], true);
    assert_eq!(first["category"], "Marketing");

    let (_, before) = send(&app, Method::GET, "/api/categories", None).await;

    let (status, second) = send(
        &app,
        Method::POST,
        "/api/categories",
        Some(json!({ "category": "Marketing", "description": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["added"], false);

    let (_, after) = send(&app, Method::GET, "/api/categories", None).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn blank_category_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, Method::POST, "/api/categories", Some(json!({ "category": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
}

#[tokio::test]
async fn category_list_is_sorted_and_contains_uncategorized() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    for name in ["zeta", "Alpha", "Middle"] {
        send(&app, Method::POST, "/api/categories", Some(json!({ "category": name }))).await;
    }

    let (status, body) = send(&app, Method::GET, "/api/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    let categories = categories_of(&body);
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
    assert!(categories.contains(&"Uncategorized".to_string()));
}

#[tokio::test]
async fn assignment_creates_missing_category() {
    let dir = TempDir::new().unwrap();
    seed_workflow(
        &dir,
        "Healthcare",
        "healthcare.json",
        json!({ "name": "Patient Intake", "nodes": [{ "type": "n8n-nodes-base.manualTrigger" }] }),
    );
    let app = app(&dir).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/workflows/healthcare.json/category",
        Some(json!({ "filename": "healthcare.json", "category": "Healthcare Automation" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "healthcare.json");
    assert_eq!(body["category"], "Healthcare Automation");

    let (_, categories) = send(&app, Method::GET, "/api/categories", None).await;
    assert!(categories_of(&categories).contains(&"Healthcare Automation".to_string()));

    let (_, mappings) = send(&app, Method::GET, "/api/category-mappings", None).await;
    assert_eq!(mappings["mappings"]["healthcare.json"], "Healthcare Automation");
}

#[tokio::test]
async fn assignment_rejects_unknown_and_mismatched_filenames() {
    let dir = TempDir::new().unwrap();
    seed_workflow(&dir, "Manual", "known.json", json!({ "name": "Known", "nodes": [] }));
    let app = app(&dir).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/workflows/missing.json/category",
        Some(json!({ "category": "Sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/workflows/known.json/category",
        Some(json!({ "filename": "other.json", "category": "Sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, categories) = send(&app, Method::GET, "/api/categories", None).await;
    assert!(!categories_of(&categories).contains(&"Sales".to_string()));
}

#[tokio::test]
async fn invoice_lifecycle_keeps_category_after_delete() {
    let dir = TempDir::new().unwrap();
    seed_workflow(&dir, "Stripe", "invoice.json", invoice_definition());
    let app = app(&dir).await;

    let (status, detail) = send(&app, Method::GET, "/api/workflows/invoice.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["metadata"]["trigger_type"], "Webhook");
    assert_eq!(detail["raw_json"]["name"], "Invoice Reminder");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/workflows/invoice.json/category",
        Some(json!({ "filename": "invoice.json", "category": "Financial & Accounting" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/categories", None).await;
    let categories = categories_of(&body);
    assert!(categories.contains(&"Financial & Accounting".to_string()));
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);

    let (status, deleted) = send(&app, Method::DELETE, "/api/workflows/invoice.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["filename"], "invoice.json");
    assert_eq!(deleted["deleted_from_db"], true);
    assert_eq!(deleted["deleted_from_filesystem"], true);
    assert!(!dir.path().join("workflows/Stripe/invoice.json").exists());

    let (status, _) = send(&app, Method::GET, "/api/workflows/invoice.json", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/api/categories", None).await;
    assert!(categories_of(&body).contains(&"Financial & Accounting".to_string()));

    let (_, mappings) = send(&app, Method::GET, "/api/category-mappings", None).await;
    assert!(mappings["mappings"].get("invoice.json").is_none());
}

/// Everything a delete could touch: files on disk, both sidecars, index rows and categories
#[derive(Debug, PartialEq)]
struct StoreSnapshot {
    files: Vec<String>,
    mappings_sidecar: Option<Vec<u8>>,
    categories_sidecar: Option<Vec<u8>>,
    index: Value,
    categories: Value,
}

fn files_under(root: &std::path::Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.push(path.strip_prefix(root).unwrap().display().to_string());
            }
        }
    }
    found.sort();
    found
}

async fn snapshot(app: &Router, dir: &TempDir) -> StoreSnapshot {
    let context = dir.path().join("context");
    let (_, index) = send(app, Method::GET, "/api/workflows?per_page=100", None).await;
    let (_, categories) = send(app, Method::GET, "/api/categories", None).await;
    StoreSnapshot {
        files: files_under(&dir.path().join("workflows")),
        mappings_sidecar: std::fs::read(context.join("search_categories.json")).ok(),
        categories_sidecar: std::fs::read(context.join("unique_categories.json")).ok(),
        index,
        categories,
    }
}

/// One indexed workflow with a category assignment, so every store holds something
async fn assigned_invoice(dir: &TempDir) -> Router {
    seed_workflow(dir, "Stripe", "invoice.json", invoice_definition());
    let app = app(dir).await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/workflows/invoice.json/category",
        Some(json!({ "category": "Financial & Accounting" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    app
}

#[tokio::test]
async fn deleting_unknown_workflow_is_not_found_and_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let app = assigned_invoice(&dir).await;
    let before = snapshot(&app, &dir).await;
    assert!(before.mappings_sidecar.is_some());
    assert_eq!(before.files, vec![format!("Stripe{}invoice.json", std::path::MAIN_SEPARATOR)]);

    let (status, body) = send(&app, Method::DELETE, "/api/workflows/unknown.json", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    assert_eq!(snapshot(&app, &dir).await, before);
    let (status, _) = send(&app, Method::GET, "/api/workflows/invoice.json", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn traversal_names_are_rejected_before_any_mutation() {
    let dir = TempDir::new().unwrap();
    let app = assigned_invoice(&dir).await;
    let secret = dir.path().join("workflows").join("secret.json");
    std::fs::write(&secret, "{}").unwrap();
    let before = snapshot(&app, &dir).await;

    for uri in [
        "/api/workflows/..%2Fsecret.json",
        "/api/workflows/%252e%252e%252fsecret.json",
        "/api/workflows/..%5Csecret.json",
        "/api/workflows/..%2FStripe%2Finvoice.json",
    ] {
        let (status, body) = send(&app, Method::DELETE, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "invalid_filename");
    }

    assert!(secret.exists());
    assert_eq!(snapshot(&app, &dir).await, before);
}

#[tokio::test]
async fn invalid_filenames_are_reported_before_the_rate_limit() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, |config| config.security.max_requests_per_minute = 1).await;

    let (status, _) = send(&app, Method::GET, "/api/workflows/missing.json", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, "/api/workflows/..%2Fx.json", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_filename");

    let (status, _) = send(&app, Method::GET, "/api/workflows/missing.json", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn category_listing_pages_assigned_workflows() {
    let dir = TempDir::new().unwrap();
    seed_workflow(&dir, "Stripe", "invoice.json", invoice_definition());
    seed_workflow(&dir, "Stripe", "refund.json", json!({ "name": "Refund", "nodes": [] }));
    seed_workflow(&dir, "Manual", "other.json", json!({ "name": "Other", "nodes": [] }));
    let app = app(&dir).await;

    for filename in ["invoice.json", "refund.json"] {
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/workflows/{}/category", filename),
            Some(json!({ "category": "Financial & Accounting" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, page) = send(
        &app,
        Method::GET,
        "/api/workflows/category/Financial%20%26%20Accounting?per_page=1&page=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["page"], 2);
    assert_eq!(page["workflows"].as_array().unwrap().len(), 1);
    assert_eq!(page["query"], "category:Financial & Accounting");
    assert_eq!(page["filters"], json!({ "category": "Financial & Accounting" }));

    let (_, empty) = send(&app, Method::GET, "/api/workflows/category/Nobody", None).await;
    assert_eq!(empty["total"], 0);

    let (status, _) = send(&app, Method::GET, "/api/workflows/category/Sales?per_page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_accepts_integer_active_flag() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/workflows/upload-json?filename=lenient.json",
        Some(json!({
            "name": "Lenient",
            "active": 1,
            "connections": null,
            "nodes": [{ "name": null, "type": "n8n-nodes-base.slack", "parameters": {} }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "lenient.json");
    assert!(dir.path().join("workflows/Slack/lenient.json").exists());

    let (status, detail) = send(&app, Method::GET, "/api/workflows/lenient.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["metadata"]["active"], true);
}

#[tokio::test]
async fn search_rejects_overflowing_page() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(&app, Method::GET, "/api/workflows?page=9223372036854775807", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn per_file_endpoints_are_rate_limited() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, |config| config.security.max_requests_per_minute = 2).await;

    for _ in 0..2 {
        let (status, _) = send(&app, Method::GET, "/api/workflows/missing.json", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, body) = send(&app, Method::GET, "/api/workflows/missing.json", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");

    // Search and category listing are not limited.
    let (status, _) = send(&app, Method::GET, "/api/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/api/categories", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_indexes_and_assigns_category() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/workflows/upload-json?active=true&category=Communication",
        Some(json!({
            "id": 42,
            "name": "Slack Alerts",
            "active": false,
            "nodes": [
                { "name": "Slack", "type": "n8n-nodes-base.slack" },
                { "name": "Cron", "type": "n8n-nodes-base.cron" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "42_Slack_Alerts.json");
    assert_eq!(body["indexed"], true);
    assert_eq!(body["category"], "Communication");
    assert!(dir.path().join("workflows/Slack/42_Slack_Alerts.json").exists());

    let (status, page) = send(&app, Method::GET, "/api/workflows?q=slack&active_only=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["workflows"][0]["filename"], "42_Slack_Alerts.json");
    assert_eq!(page["workflows"][0]["trigger_type"], "Scheduled");

    let (_, page) = send(&app, Method::GET, "/api/workflows?category=Communication", None).await;
    assert_eq!(page["total"], 1);

    let (_, integrations) = send(&app, Method::GET, "/api/integrations", None).await;
    assert!(integrations["integrations"]
        .as_array()
        .unwrap()
        .contains(&json!("Slack")));
}

#[tokio::test]
async fn upload_rejects_non_object_bodies() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, _) = send(&app, Method::POST, "/api/workflows/upload-json", Some(json!([1, 2, 3]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(files_under(&dir.path().join("workflows")).is_empty());
}

#[tokio::test]
async fn search_rejects_out_of_range_page_size() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let (status, _) = send(&app, Method::GET, "/api/workflows?per_page=101", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/api/workflows?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_and_diagram_serve_the_stored_file() {
    let dir = TempDir::new().unwrap();
    seed_workflow(&dir, "Stripe", "invoice.json", invoice_definition());
    let app = app(&dir).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/workflows/invoice.json/download")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"invoice.json\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let downloaded: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(downloaded, invoice_definition());

    let (status, body) = send(&app, Method::GET, "/api/workflows/invoice.json/diagram", None).await;
    assert_eq!(status, StatusCode::OK);
    let diagram = body["diagram"].as_str().unwrap();
    assert!(diagram.starts_with("graph TD"));
    assert!(diagram.contains("-->"));
}

#[tokio::test]
async fn stats_count_indexed_workflows() {
    let dir = TempDir::new().unwrap();
    seed_workflow(&dir, "Stripe", "invoice.json", invoice_definition());
    seed_workflow(&dir, "Manual", "idle.json", json!({ "name": "Idle", "active": false, "nodes": [] }));
    let app = app(&dir).await;

    let (status, stats) = send(&app, Method::GET, "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["active"], 1);
    assert_eq!(stats["inactive"], 1);
}

#[tokio::test]
async fn reindex_requires_configured_token() {
    let dir = TempDir::new().unwrap();
    let disabled = app(&dir).await;
    let (status, _) = send(&disabled, Method::POST, "/api/reindex?admin_token=anything", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let enabled = app_with(&dir, |config| config.security.admin_token = Some("s3cret".to_string())).await;
    let (status, _) = send(&enabled, Method::POST, "/api/reindex?admin_token=wrong", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&enabled, Method::POST, "/api/reindex?admin_token=s3cret&force=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requested_by"], "admin");
}
