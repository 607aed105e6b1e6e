//! 请求路由
//!
//! JSON 编解码、跨域处理以及诊断接口

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::health::{self, HealthData};

pub type HttpBody = Full<Bytes>;

/// 诊断接口路径（带或不带结尾斜杠）
pub const DIAGNOSIS_PATHS: [&str; 2] = ["/get_diagnosis/", "/get_diagnosis"];
/// 健康检查路径
pub const HEALTH_PATH: &str = "/health";

const ALLOWED_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";
const PREFLIGHT_MAX_AGE: &str = "600";

/// 跨域策略：允许列表中的来源、允许凭证、任意方法与请求头
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    /// 请求来源在允许列表中时返回该来源
    fn allowed_origin<'h>(&self, headers: &'h HeaderMap) -> Option<&'h HeaderValue> {
        let origin = headers.get(header::ORIGIN)?;
        let origin_str = origin.to_str().ok()?;
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin_str)
            .then_some(origin)
    }

    fn is_preflight(request_method: &Method, headers: &HeaderMap) -> bool {
        *request_method == Method::OPTIONS
            && headers.contains_key(header::ORIGIN)
            && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    }

    fn preflight(&self, headers: &HeaderMap) -> Response<HttpBody> {
        let Some(origin) = self.allowed_origin(headers) else {
            tracing::info!(origin = ?headers.get(header::ORIGIN), "拒绝跨域预检请求");
            return text_response(StatusCode::BAD_REQUEST, "Disallowed CORS origin");
        };

        let mut response = text_response(StatusCode::OK, "OK");
        let out = response.headers_mut();
        out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        out.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        out.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Some(requested) = headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        out.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        out.insert(header::VARY, HeaderValue::from_static("Origin"));
        response
    }

    fn decorate(&self, origin: Option<HeaderValue>, response: &mut Response<HttpBody>) {
        if let Some(origin) = origin {
            let out = response.headers_mut();
            out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            out.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            out.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
}

/// 所有连接共享的只读状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub cors: CorsPolicy,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            cors: CorsPolicy::new(config.allowed_origins.clone()),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// 处理单个请求
pub async fn handle<B>(state: Arc<AppState>, req: Request<B>) -> Result<Response<HttpBody>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if CorsPolicy::is_preflight(&method, req.headers()) {
        return Ok(state.cors.preflight(req.headers()));
    }

    let origin = state.cors.allowed_origin(req.headers()).cloned();
    let mut response = route(&state, &method, &path, req).await;
    state.cors.decorate(origin, &mut response);

    tracing::debug!(%method, %path, status = response.status().as_u16(), "请求已处理");
    Ok(response)
}

async fn route<B>(state: &AppState, method: &Method, path: &str, req: Request<B>) -> Response<HttpBody>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match (method, path) {
        (&Method::POST, p) if DIAGNOSIS_PATHS.contains(&p) => {
            match read_body(req.into_body(), state.max_body_bytes).await {
                Ok(body) => get_diagnosis(&body),
                Err(response) => response,
            }
        }
        (&Method::GET, HEALTH_PATH) => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        (_, p) if p == HEALTH_PATH || DIAGNOSIS_PATHS.contains(&p) => {
            detail_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => detail_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// 诊断接口：校验读数、评估规则并附上建议
fn get_diagnosis(body: &[u8]) -> Response<HttpBody> {
    let data: HealthData = match serde_json::from_slice(body) {
        Ok(data) => data,
        Err(e) => {
            tracing::info!("请求体解析失败: {}", e);
            return detail_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!("invalid request body: {e}"),
            );
        }
    };

    match health::diagnose(&data) {
        Ok(response) => {
            tracing::info!(
                name = %data.name,
                diagnosis = %response.diagnosis,
                level = %response.diagnosis_level,
                "诊断完成"
            );
            json_response(StatusCode::OK, &response)
        }
        Err(e) => {
            tracing::info!(name = %data.name, "读数超出范围: {}", e);
            detail_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Response<HttpBody>>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::info!("请求体超过上限 {} 字节", limit);
            Err(detail_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            ))
        }
        Err(e) => {
            tracing::warn!("读取请求体失败: {}", e);
            Err(detail_response(StatusCode::BAD_REQUEST, "Failed to read request body"))
        }
    }
}

fn detail_response(status: StatusCode, detail: &str) -> Response<HttpBody> {
    json_response(status, &json!({ "detail": detail }))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<HttpBody> {
    let body = match serde_json::to_vec(value) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("响应序列化失败: {}", e);
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };
    let mut response = Response::new(Full::from(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn text_response(status: StatusCode, text: &'static str) -> Response<HttpBody> {
    let mut response = Response::new(Full::from(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
