//! API Integration Tests
//!
//! The LLM factory is replaced with a stub so no model server is needed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ontograph_api::{create_router, AppState, LlmFactory};
use ontograph_core::{config::LlmConfig, LlmClient, OntographError, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "ontograph-test-boundary";
const TYPES: &str = r#"{"node_types": ["Person", "Org", "Place"]}"#;
const STUB_GRAPH: &str = r#"{"nodes":[{"id":"alice","type":"Person"},{"id":"acme","type":"Org"},{"id":"reno","type":"Place"}],"relationships":[{"source":"alice","target":"acme","type":"WORKS_AT"},{"source":"acme","target":"reno","type":"LOCATED_IN"}]}"#;

struct StubLlm {
    graph: String,
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, system: &str, _user: &str) -> Result<String> {
        if system.contains("between 5 and 15") {
            Ok(TYPES.to_string())
        } else {
            Ok(self.graph.clone())
        }
    }

    fn model(&self) -> &str {
        "stub"
    }
}

/// Router whose LLM factory returns a stub and records the configs it saw
fn test_app(graph: &'static str) -> (Router, Arc<Mutex<Vec<LlmConfig>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let factory: LlmFactory = Arc::new(move |config: &LlmConfig| -> Result<Arc<dyn LlmClient>> {
        recorder.lock().unwrap().push(config.clone());
        Ok(Arc::new(StubLlm {
            graph: graph.to_string(),
        }))
    });

    let state = AppState::default().with_llm_factory(factory);
    (create_router(Arc::new(state)), seen)
}

/// Part of a multipart body
enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app(STUB_GRAPH);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = test_app(STUB_GRAPH);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["max_in_flight"], 10);
    assert_eq!(json["available_slots"], 10);
}

// =============================================================================
// Graph Generation Tests
// =============================================================================

#[tokio::test]
async fn test_generate_from_text() {
    let (app, _) = test_app(STUB_GRAPH);

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[Part::Text(
            "text",
            "Alice works at Acme. Acme is located in Reno.",
        )],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["html"].as_str().unwrap().contains("vis-network"));
    assert_eq!(json["graph"]["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(json["graph"]["relationships"].as_array().unwrap().len(), 2);
    assert_eq!(json["graph"]["nodes"][0]["id"], "Alice");
    assert_eq!(json["graph"]["nodes"][0]["properties"]["document"][0], "raw_text");
    assert_eq!(json["graph"]["source"]["kind"], "user_input");
    assert_eq!(json["stats"]["chunks"], 1);
}

#[tokio::test]
async fn test_generate_legacy_path_with_files() {
    let (app, _) = test_app(STUB_GRAPH);

    let request = multipart_request(
        "/generate-graph/",
        &[
            Part::File("notes.txt", b"Alice works at Acme."),
            Part::File("people.csv", b"name,employer\nAlice,Acme\n"),
            Part::File("image.png", b"\x89PNG"),
        ],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["skipped_files"][0], "image.png");
    let docs = json["graph"]["nodes"][0]["properties"]["document"]
        .as_array()
        .unwrap();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn test_form_overrides_reach_llm_config() {
    let (app, seen) = test_app(STUB_GRAPH);

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[
            Part::Text("api_key", "sk-test"),
            Part::Text("base_url", "http://llm.internal:9000/v1"),
            Part::Text("model_name", "qwen2.5-7b"),
            Part::Text("temperature", "0.3"),
            Part::Text("chunk_size", "500"),
            Part::Text("chunk_overlap", ""),
            Part::Text("text", "Alice works at Acme."),
        ],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].api_key.as_deref(), Some("sk-test"));
    assert_eq!(seen[0].base_url, "http://llm.internal:9000/v1");
    assert_eq!(seen[0].model, "qwen2.5-7b");
    assert!((seen[0].temperature - 0.3).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_no_input_is_bad_request() {
    let (app, _) = test_app(STUB_GRAPH);

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[Part::Text("model_name", "x"), Part::Text("text", "   ")],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_invalid_number_is_bad_request() {
    let (app, _) = test_app(STUB_GRAPH);

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[Part::Text("chunk_size", "big"), Part::Text("text", "Alice.")],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlap_not_below_size_is_bad_request() {
    let (app, seen) = test_app(STUB_GRAPH);

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[
            Part::Text("chunk_size", "100"),
            Part::Text("chunk_overlap", "100"),
            Part::Text("text", "Alice works at Acme."),
        ],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_nothing_extracted_is_unprocessable() {
    let (app, _) = test_app("Sorry, I cannot help with that.");

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[Part::Text("text", "Alice works at Acme.")],
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["code"], "EMPTY_GRAPH");
}

#[tokio::test]
async fn test_llm_construction_failure() {
    let factory: LlmFactory = Arc::new(|_config: &LlmConfig| -> Result<Arc<dyn LlmClient>> {
        Err(OntographError::LlmError("connection refused".to_string()))
    });
    let app = create_router(Arc::new(AppState::default().with_llm_factory(factory)));

    let request = multipart_request(
        "/api/v1/generate-graph",
        &[Part::Text("text", "Alice works at Acme.")],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
