//! Integration tests for the control relay.
//!
//! These drive the full router against a local httpmock upstream, so no
//! network access or real credentials are needed.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

use control_relay::api::{create_router, AppState};
use control_relay::config::ComputeMode;
use control_relay::model::{ControlRequest, GraphRequest};
use control_relay::sweep::{sweep, FailurePolicy};
use control_relay::upstream::{MockEvaluator, UpstreamClient};

const HEADER_BASE_URL: &str = "X-RapidAPI-Base-Url";
const HEADER_API_KEY: &str = "X-RapidAPI-Key";
const HEADER_API_HOST: &str = "X-RapidAPI-Host";

fn relay_app() -> Router {
    let upstream = assert_ok!(UpstreamClient::new(Duration::from_secs(2)));
    create_router(AppState::new(upstream))
}

fn offline_app() -> Router {
    let upstream = assert_ok!(UpstreamClient::new(Duration::from_secs(2)));
    create_router(AppState::new(upstream).with_mode(ComputeMode::Offline))
}

fn calculate_body() -> Value {
    json!({
        "current_h": 5.0,
        "previous_h": 4.0,
        "base_output": [10.0, 20.0],
        "system_id": "plant-7"
    })
}

fn graph_body(parameter_name: &str, steps: u32) -> Value {
    json!({
        "parameter_name": parameter_name,
        "start_value": 1.0,
        "end_value": 2.0,
        "steps": steps,
        "base_request": {
            "current_h": 5.0,
            "previous_h": 4.0,
            "base_output": [10.0]
        }
    })
}

/// Build a POST carrying all three credential headers except `omit`.
fn relay_request(uri: &str, endpoint: &str, body: &Value, omit: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    for (name, value) in [
        (HEADER_BASE_URL, endpoint),
        (HEADER_API_KEY, "integration-key"),
        (HEADER_API_HOST, "compute.example.com"),
    ] {
        if omit != Some(name) {
            builder = builder.header(name, value);
        }
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn read_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn calculate_relays_payload_and_returns_upstream_json_unmodified() {
    let server = MockServer::start();
    let upstream_result = json!({
        "control_parameter": 1.1,
        "processed_output": [12.0, 24.0],
        "vendor_extra": {"nested": true}
    });
    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/calculate")
            .header(HEADER_API_KEY, "integration-key")
            .header(HEADER_API_HOST, "compute.example.com")
            .json_body(json!({
                "current_h": 5.0,
                "previous_h": 4.0,
                "beta_0": 1.0,
                "lambda_factor": 1.0,
                "epsilon": 1e-10,
                "alpha_param": 1.0,
                "gamma_param": 1.0,
                "base_output": [10.0, 20.0],
                "system_id": "plant-7"
            }));
        then.status(200).json_body(upstream_result.clone());
    });

    let response = relay_app()
        .oneshot(relay_request(
            "/api/calculate",
            &server.url("/calculate"),
            &calculate_body(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, upstream_result);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn calculate_rejects_each_missing_credential_header() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST);
        then.status(200).json_body(json!({}));
    });

    for missing in [HEADER_BASE_URL, HEADER_API_KEY, HEADER_API_HOST] {
        let response = relay_app()
            .oneshot(relay_request(
                "/api/calculate",
                &server.url("/calculate"),
                &calculate_body(),
                Some(missing),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "missing {missing}");
        let body = read_json(response).await;
        assert_eq!(body["error"], "missing_credentials");
        assert!(body["message"].as_str().unwrap().contains(missing));
    }

    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn calculate_reports_every_invalid_field() {
    let server = MockServer::start();
    let body = json!({
        "current_h": 0.0,
        "beta_0": 9.0,
        "base_output": []
    });

    let response = relay_app()
        .oneshot(relay_request("/api/calculate", &server.url("/calculate"), &body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["error"], "validation");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert!(fields.contains(&"current_h"));
    assert!(fields.contains(&"beta_0"));
    assert!(fields.contains(&"base_output"));
}

#[tokio::test]
async fn calculate_maps_upstream_failure_to_bad_gateway() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST).path("/calculate");
        then.status(500).body("solver exploded");
    });

    let response = relay_app()
        .oneshot(relay_request(
            "/api/calculate",
            &server.url("/calculate"),
            &calculate_body(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(response).await;
    assert_eq!(body["error"], "upstream");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("500"));
    assert!(message.contains("solver exploded"));
    assert!(!message.contains("integration-key"));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn graph_relays_one_call_per_point() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST).path("/calculate");
        then.status(200).json_body(json!({"output_gain": 2.0}));
    });

    let response = relay_app()
        .oneshot(relay_request(
            "/api/graph",
            &server.url("/calculate"),
            &graph_body("beta_0", 5),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["parameter_name"], "beta_0");
    assert_eq!(body["parameter_values"], json!([1.0, 1.25, 1.5, 1.75, 2.0]));
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert_eq!(mock.calls(), 5);
}

#[tokio::test]
async fn graph_with_unknown_parameter_never_calls_upstream() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST);
        then.status(200).json_body(json!({}));
    });

    let response = relay_app()
        .oneshot(relay_request(
            "/api/graph",
            &server.url("/calculate"),
            &graph_body("not_a_field", 5),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "field_not_found");
    assert!(body["message"].as_str().unwrap().contains("beta_0"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn graph_fails_fast_on_upstream_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST).path("/calculate");
        then.status(503).body("busy");
    });

    let response = relay_app()
        .oneshot(relay_request(
            "/api/graph",
            &server.url("/calculate"),
            &graph_body("alpha_param", 10),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn graph_with_fallback_policy_still_returns_every_point() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::POST).path("/calculate");
        then.status(503).body("busy");
    });

    let upstream = assert_ok!(UpstreamClient::new(Duration::from_secs(2)));
    let app = create_router(AppState::new(upstream).with_policy(FailurePolicy::Fallback));

    let response = app
        .oneshot(relay_request(
            "/api/graph",
            &server.url("/calculate"),
            &graph_body("gamma_param", 5),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn offline_mode_answers_without_credentials() {
    let response = offline_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/calculate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(calculate_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["delta_h"], json!(1.0));
    assert_eq!(body["system_id"], "plant-7");
    assert_eq!(body["processed_output"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn offline_graph_matches_direct_sweep() {
    let response = offline_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/graph")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(graph_body("lambda_factor", 5).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["parameter_values"], json!([1.0, 1.25, 1.5, 1.75, 2.0]));
}

#[tokio::test]
async fn sweep_with_mock_evaluator_sends_independent_requests() {
    let graph = GraphRequest {
        parameter_name: "previous_h".to_string(),
        start_value: 1.0,
        end_value: 3.0,
        steps: 3,
        base_request: ControlRequest::new(5.0, vec![10.0]),
    };
    let mock = MockEvaluator::new();

    let response = assert_ok!(sweep(&graph, &mock, FailurePolicy::FailFast).await);

    assert_eq!(response.parameter_values, vec![1.0, 2.0, 3.0]);
    let sent: Vec<Option<f64>> = mock.requests().iter().map(|r| r.previous_h).collect();
    assert_eq!(sent, vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(graph.base_request.previous_h, None);
}

#[tokio::test]
async fn health_and_legacy_config_endpoints() {
    let app = relay_app();

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "healthy");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/config")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"base_url": "https://x", "api_key": "secret"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_json(response).await["message"].is_string());

    let response = app.oneshot(get("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"base_url": "", "has_api_key": false, "api_host": ""})
    );
}

#[tokio::test]
async fn index_serves_placeholder_when_frontend_missing() {
    let upstream = assert_ok!(UpstreamClient::new(Duration::from_secs(2)));
    let app = create_router(AppState::new(upstream).with_static_dir("/nonexistent/control-relay"));

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_text(response).await.contains("Frontend not found"));
}
