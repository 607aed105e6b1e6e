//! 路由测试
//!
//! 直接调用请求处理函数，不经过网络

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use vital_triage::config::ServerConfig;
use vital_triage::server::routes::{handle, AppState, HttpBody};

const ORIGIN: &str = "http://localhost:5173";

fn state() -> Arc<AppState> {
    Arc::new(AppState::from_config(&ServerConfig::default()))
}

fn post(path: &str, body: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json")
        .body(Full::from(Bytes::from(body.to_string())))
        .unwrap()
}

async fn send(state: Arc<AppState>, req: Request<Full<Bytes>>) -> Response<HttpBody> {
    handle(state, req).await.unwrap()
}

async fn body_json(response: Response<HttpBody>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn healthy_request(name: &str) -> Value {
    json!({
        "name": name,
        "temperature": 36,
        "heart_rate": 65,
        "blood_pressure": 110,
        "respiratory_rate": 16,
        "oxygen_saturation": 98,
        "blood_sugar": 90
    })
}

#[tokio::test]
async fn test_diagnosis_endpoint() {
    let response = send(
        state(),
        post("/get_diagnosis/", &healthy_request("Srini").to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body = body_json(response).await;
    assert_eq!(body["diagnosis"], "Healthy");
    assert_eq!(body["diagnosis_level"], json!(20));
    assert_eq!(
        body["advice"],
        "Keep up the good lifestyle! Regular check-ups and a balanced diet are recommended."
    );
}

#[tokio::test]
async fn test_path_without_trailing_slash() {
    let response = send(
        state(),
        post("/get_diagnosis", &healthy_request("Gokul").to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_general_level_is_a_float() {
    let response = send(
        state(),
        post("/get_diagnosis/", &healthy_request("Unknown").to_string()),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["diagnosis"], "General");
    assert!(body["diagnosis_level"].is_f64());
    assert_eq!(body["diagnosis_level"].as_f64(), Some(1.0));
}

#[tokio::test]
async fn test_out_of_range_is_bad_request() {
    let mut request = healthy_request("Srini");
    request["temperature"] = json!(42.1);
    let response = send(state(), post("/get_diagnosis/", &request.to_string())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["detail"],
        "Temperature must be between 35 and 42 Celsius."
    );
}

#[tokio::test]
async fn test_integral_float_is_accepted() {
    let mut request = healthy_request("Srini");
    request["heart_rate"] = json!(65.0);
    let response = send(state(), post("/get_diagnosis/", &request.to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["diagnosis"], "Healthy");
}

#[tokio::test]
async fn test_oversized_integer_is_range_checked() {
    let mut request = healthy_request("Srini");
    request["blood_pressure"] = json!(99_999_999_999_i64);
    let response = send(state(), post("/get_diagnosis/", &request.to_string())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Blood pressure must be between 90 and 180 mmHg."
    );
}

#[tokio::test]
async fn test_fractional_heart_rate_is_unprocessable() {
    let mut request = healthy_request("Srini");
    request["heart_rate"] = json!(65.5);
    let response = send(state(), post("/get_diagnosis/", &request.to_string())).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() {
    let response = send(state(), post("/get_diagnosis/", "{\"name\": \"Srini\"}")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("invalid request body"));

    let response = send(state(), post("/get_diagnosis/", "not json")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_body_limit() {
    let mut config = ServerConfig::default();
    config.max_body_bytes = 32;
    let state = Arc::new(AppState::from_config(&config));

    let response = send(
        state,
        post("/get_diagnosis/", &healthy_request("Srini").to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let get = |path: &str| {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    };

    let response = send(state(), get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));

    let response = send(state(), get("/get_diagnosis/")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = send(state(), get("/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "detail": "Not Found" }));
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/get_diagnosis/")
        .header("origin", ORIGIN)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = send(state(), req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], ORIGIN);
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-headers"], "content-type");
    assert!(headers["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("POST"));
}

#[tokio::test]
async fn test_cors_preflight_disallowed_origin() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/get_diagnosis/")
        .header("origin", "http://evil.example")
        .header("access-control-request-method", "POST")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = send(state(), req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn test_cors_headers_on_simple_request() {
    let mut req = post("/get_diagnosis/", &healthy_request("Srini").to_string());
    req.headers_mut()
        .insert("origin", ORIGIN.parse().unwrap());
    let response = send(state(), req).await;
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);
    assert_eq!(response.headers()["access-control-allow-credentials"], "true");

    let mut req = post("/get_diagnosis/", &healthy_request("Srini").to_string());
    req.headers_mut()
        .insert("origin", "http://other.example".parse().unwrap());
    let response = send(state(), req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
