use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

use api::{AppConfig, AppState, build_router};
use extract::LanguageModel;
use extract::testing::ScriptedModel;
use index::Document;
use index::testing::StaticRetriever;

fn app(model: Arc<ScriptedModel>, retriever: Arc<StaticRetriever>) -> axum::Router {
    let state = AppState::with_collaborators(model, retriever, AppConfig::default());
    build_router(Arc::new(state))
}

fn invoice_retriever() -> Arc<StaticRetriever> {
    Arc::new(StaticRetriever::new(vec![
        Document::new("Invoice number: INV-001").with_metadata("source", "invoice.txt"),
    ]))
}

/// Never answers.
struct StalledModel;

#[async_trait]
impl LanguageModel for StalledModel {
    async fn generate(&self, _prompt: &str) -> Result<Vec<String>> {
        std::future::pending::<Result<Vec<String>>>().await
    }
}

/// Answers every field after a short delay and tracks how many calls overlap.
#[derive(Default)]
struct CountingModel {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

const COUNTED_FIELDS: [&str; 5] = ["A", "B", "C", "D", "E"];

#[async_trait]
impl LanguageModel for CountingModel {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let field = COUNTED_FIELDS
            .iter()
            .find(|f| prompt.contains(&format!("what is {f},")))
            .copied()
            .unwrap_or("A");
        let text = if prompt.contains("Helpful answer:") {
            format!(r#"{{"{field}":"value {field}"}}"#)
        } else {
            format!(r#"{{"field_name":"{field}"}}"#)
        };
        Ok(vec![text])
    }
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");

    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn test_extracts_single_invoice_field() {
    let model = Arc::new(ScriptedModel::with_responder(|prompt| {
        if prompt.contains("Helpful answer:") {
            Ok(vec![r#"{"Invoice_Number":"INV-001"}"#.to_string()])
        } else {
            Ok(vec![r#"{"field_name":"Invoice_Number"}"#.to_string()])
        }
    }));
    let retriever = invoice_retriever();

    let (status, body) = post_json(
        app(model.clone(), retriever.clone()),
        "/api/chat",
        json!({
            "dataFields": ["Invoice_Number"],
            "dataFieldsDescription": ["a unique invoice code"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "Invoice_Number": "INV-001" }));
    // One matching call and one answer call; no rewrite, no repair.
    assert_eq!(model.calls(), 2);
    assert_eq!(retriever.queries(), vec!["what is Invoice_Number,"]);
}

#[tokio::test]
async fn test_upstream_failure_returns_500_without_partial_fields() {
    let model = Arc::new(ScriptedModel::failing("upstream model unavailable"));

    let (status, body) = post_json(
        app(model, invoice_retriever()),
        "/api/chat",
        json!({
            "dataFields": ["Invoice_Number", "Total"],
            "dataFieldsDescription": ["a unique invoice code", "amount due"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let object = body.as_object().expect("object body");
    assert_eq!(object.len(), 1);
    assert!(
        object["error"]
            .as_str()
            .unwrap()
            .contains("upstream model unavailable")
    );
}

#[tokio::test]
async fn test_one_failing_field_discards_the_others() {
    let model = Arc::new(ScriptedModel::with_responder(|prompt| {
        if prompt.contains("what is Total,") {
            anyhow::bail!("rate limited");
        }
        if prompt.contains("Helpful answer:") {
            Ok(vec![r#"{"Invoice_Number":"INV-001"}"#.to_string()])
        } else {
            Ok(vec![r#"{"field_name":"Invoice_Number"}"#.to_string()])
        }
    }));

    let (status, body) = post_json(
        app(model, invoice_retriever()),
        "/extract",
        json!({
            "dataFields": ["Invoice_Number", "Total"],
            "dataFieldsDescription": ["a unique invoice code", "amount due"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("Invoice_Number").is_none());
    assert!(body["error"].as_str().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_mismatched_lengths_are_rejected() {
    let model = Arc::new(ScriptedModel::new(vec![]));

    let (status, body) = post_json(
        app(model.clone(), invoice_retriever()),
        "/api/chat",
        json!({
            "dataFields": ["Invoice_Number", "Total"],
            "dataFieldsDescription": ["a unique invoice code"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("validation error"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_an_error_response() {
    let model = Arc::new(ScriptedModel::new(vec![]));

    let (status, body) = post_json(
        app(model, invoice_retriever()),
        "/api/chat",
        json!({ "fields": ["Invoice_Number"] }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
}

#[tokio::test]
async fn test_unparseable_answer_is_repaired() {
    let model = Arc::new(ScriptedModel::with_responder(|prompt| {
        let text = if prompt.contains("did not satisfy the constraints") {
            r#"{"Invoice_Number":"INV-001"}"#
        } else if prompt.contains("Helpful answer:") {
            "The invoice number is INV-001."
        } else {
            r#"{"field_name":"Invoice_Number"}"#
        };
        Ok(vec![text.to_string()])
    }));

    let (status, body) = post_json(
        app(model.clone(), invoice_retriever()),
        "/api/chat",
        json!({
            "dataFields": ["Invoice_Number"],
            "dataFieldsDescription": ["a unique invoice code"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "Invoice_Number": "INV-001" }));
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn test_stats_count_requests() {
    let model = Arc::new(ScriptedModel::failing("down"));
    let state = Arc::new(AppState::with_collaborators(
        model,
        invoice_retriever(),
        AppConfig::default(),
    ));

    post_json(
        build_router(state.clone()),
        "/api/chat",
        json!({ "dataFields": ["A"], "dataFieldsDescription": ["a"] }),
    )
    .await;

    let response = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let stats: Value = serde_json::from_slice(&bytes).expect("json");

    assert_eq!(stats["total_requests"], json!(1));
    assert_eq!(stats["failed_requests"], json!(1));
}

#[tokio::test]
async fn test_request_deadline_returns_500() {
    let mut config = AppConfig::default();
    config.concurrency.request_timeout_secs = 1;
    let state = AppState::with_collaborators(Arc::new(StalledModel), invoice_retriever(), config);

    let (status, body) = post_json(
        build_router(Arc::new(state)),
        "/api/chat",
        json!({
            "dataFields": ["Invoice_Number"],
            "dataFieldsDescription": ["a unique invoice code"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "request timed out after 1s" }));
}

#[tokio::test]
async fn test_field_fan_out_is_bounded() {
    let model = Arc::new(CountingModel::default());
    let mut config = AppConfig::default();
    config.concurrency.max_concurrent_fields = 2;
    let state = AppState::with_collaborators(model.clone(), invoice_retriever(), config);

    let (status, body) = post_json(
        build_router(Arc::new(state)),
        "/api/chat",
        json!({
            "dataFields": COUNTED_FIELDS,
            "dataFieldsDescription": ["a", "b", "c", "d", "e"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_object().expect("object body").len(), 5);
    assert_eq!(body["E"], json!("value E"));
    let peak = model.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
}

#[tokio::test]
async fn test_ingest_missing_path_is_404() {
    let state = AppState::from_config(AppConfig::default());

    let (status, body) = post_json(
        build_router(Arc::new(state)),
        "/ingest",
        json!({ "path": "/definitely/not/here" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("/definitely/not/here"));
}

#[tokio::test]
async fn test_ingest_without_store_is_500() {
    let model = Arc::new(ScriptedModel::new(vec![]));

    let (status, body) = post_json(
        app(model, invoice_retriever()),
        "/ingest",
        json!({ "path": env!("CARGO_MANIFEST_DIR") }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "no vector store configured" }));
}

#[tokio::test]
async fn test_health_reports_each_collaborator() {
    let mut config = AppConfig::default();
    config.llm.base_url = "http://127.0.0.1:9".to_string();
    let state = Arc::new(AppState::with_collaborators(
        Arc::new(ScriptedModel::new(vec![])),
        invoice_retriever(),
        config,
    ));

    let (status, body) = get_json(build_router(state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qdrant"], json!("not configured"));
    assert!(body["llm"].as_str().unwrap().starts_with("error"));

    let (status, body) = post_json(build_router(state), "/health", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qdrant"], json!("not configured"));
}
