use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;
use territory_server::{api::app_router, build_state, config::Config};

async fn build_test_router() -> (TempDir, axum::Router) {
    let tmp = tempdir().unwrap();
    let config = Config {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        db_path: tmp.path().join("test.db").to_string_lossy().into_owned(),
        data_dir: None,
        cache_dir: None,
        engine_config: None,
        registry_url: None,
        registry_api_key: None,
        redis_url: None,
        request_timeout: Duration::from_secs(10),
        log_retention_days: 90,
        cors_allow_origins: Vec::new(),
    };
    let state = build_state(&config).await.unwrap();
    (tmp, app_router(state, &config))
}

async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn resolve_returns_operator_and_confidence() {
    let (_tmp, app) = build_test_router().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/resolve",
        Some(json!({
            "street": "1234 Belt Line Road",
            "city": "Addison",
            "state": "TX",
            "postalCode": "75001"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operator"]["id"], "1039940674000");
    assert_eq!(body["confidence"], "medium");
    assert_eq!(body["strategy"], "street_level");
    assert_eq!(body["alternates"][0]["id"], "007929441");
}

#[tokio::test]
async fn invalid_postal_code_is_bad_request_with_suggestions() {
    let (_tmp, app) = build_test_router().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/resolve",
        Some(json!({
            "street": "350 5th Ave",
            "city": "New York",
            "state": "NY",
            "postalCode": "10001"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_SUPPORTED_REGION");
    assert!(body["suggestions"]
        .as_array()
        .unwrap()
        .contains(&json!("75201")));
}

#[tokio::test]
async fn bulk_keeps_order_and_reports_failures_inline() {
    let (_tmp, app) = build_test_router().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/resolve/bulk",
        Some(json!({
            "batchSize": 2,
            "addresses": [
                { "street": "100 Congress Ave", "city": "Austin", "state": "TX", "postalCode": "78701" },
                { "street": "1 Main St", "city": "Dallas", "state": "TX", "postalCode": "7520" },
                { "street": "1 Main St", "city": "Dallas", "state": "TX", "postalCode": "75201" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][0]["result"]["operator"]["id"], "AE-0001");
    assert_eq!(body["results"][1]["error"]["code"], "INVALID_LENGTH");
    assert_eq!(body["results"][2]["index"], 2);
}

#[tokio::test]
async fn postal_code_analysis() {
    let (_tmp, app) = build_test_router().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/postal-codes/75001", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isMultiOperator"], true);
    assert_eq!(body["requiresAddressValidation"], true);
    assert_eq!(body["operatorCandidates"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/api/v1/postal-codes/ABCDE", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CHARACTERS");
}

#[tokio::test]
async fn operator_options_lists_recommended_first() {
    let (_tmp, app) = build_test_router().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/operator-options",
        Some(json!({
            "street": "1234 Belt Line Road",
            "city": "Addison",
            "state": "TX",
            "postalCode": "75001"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["options"][0]["recommended"], true);
    assert_eq!(body["options"][0]["operator"]["id"], "1039940674000");
    assert!(body["helpText"].as_str().unwrap().contains("75001"));
}

#[tokio::test]
async fn health_reports_engine_state() {
    let (_tmp, app) = build_test_router().await;
    send(
        &app,
        Method::POST,
        "/api/v1/resolve",
        Some(json!({ "street": "1 Main St", "city": "Dallas", "state": "TX", "postalCode": "752" })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"]["cacheTiers"], json!(["memory", "sqlite"]));
    assert!(body["engine"]["registryCircuit"].is_null());
    assert_eq!(body["recentErrors"][0]["code"], "INVALID_LENGTH");
}

#[tokio::test]
async fn unknown_operator_is_not_found() {
    let (_tmp, app) = build_test_router().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/operators/NOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
