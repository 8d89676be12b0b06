//! HTTP 辅助工具：CORS 预检、通用响应头与客户端 IP 解析。

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header};
use axum::{middleware, response::IntoResponse, response::Response};
use std::net::IpAddr;
use std::sync::Arc;

use crate::auth::AuthConfig;

const ALLOW_METHODS: &str = "GET,POST,OPTIONS";

/// 预检请求允许的请求头；启用认证时包含 `Authorization`。
pub fn allowed_headers(auth_enabled: bool) -> &'static str {
    if auth_enabled {
        "Authorization,Content-Type"
    } else {
        "Content-Type"
    }
}

/// 在认证与路由之前，对所有 `OPTIONS` 请求直接返回 `204`。
pub async fn cors_preflight(
    Extension(auth): Extension<Arc<AuthConfig>>,
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Response {
    if *request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(allowed_headers(auth.is_enabled())),
    );
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// 添加基础安全响应头与跨域来源头。
pub async fn add_common_headers(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

/// 从 `x-forwarded-for` 解析客户端 IP。
pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<IpAddr>().ok())
}

/// 综合转发头与连接信息计算客户端 IP。
pub fn resolve_client_ip(headers: &HeaderMap, connect_ip: Option<IpAddr>) -> Option<IpAddr> {
    extract_forwarded_ip(headers).or(connect_ip)
}
