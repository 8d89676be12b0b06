//! 单一静态凭据的 Basic 认证。

use axum::extract::Extension;
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::{body::Body as AxumBody, middleware};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use std::sync::Arc;
use tracing::debug;

use crate::config::AUTH_REALM;
use crate::error::ApiError;

/// 进程内保存的凭据；`credential` 为空表示未启用认证。
#[derive(Debug, Default)]
pub struct AuthConfig {
    pub credential: Option<Credential>,
}

#[derive(Debug)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn disabled() -> Self {
        Self { credential: None }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential {
                username: username.into(),
                password: password.into(),
            }),
        }
    }

    pub fn from_parts(username: Option<String>, password: Option<String>) -> Self {
        match (username, password) {
            (Some(username), Some(password)) => Self::basic(username, password),
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credential.is_some()
    }

    /// 校验请求头；缺失、格式错误或不匹配一律返回 false。
    pub fn authenticate(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.credential else {
            return true;
        };
        match headers.typed_get::<Authorization<Basic>>() {
            Some(Authorization(basic)) => {
                basic.username() == expected.username && basic.password() == expected.password
            }
            None => false,
        }
    }
}

/// 认证中间件：未通过时返回 401 并附带 Basic 质询头。
pub async fn auth_middleware(
    Extension(auth): Extension<Arc<AuthConfig>>,
    req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    if !auth.is_enabled() || is_auth_exempt_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    if auth.authenticate(req.headers()) {
        return Ok(next.run(req).await);
    }

    debug!(path = req.uri().path(), "authentication failed");
    Err(ApiError::Unauthorized(challenge_headers()))
}

fn challenge_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!(r#"Basic realm="{AUTH_REALM}""#)) {
        headers.insert(header::WWW_AUTHENTICATE, value);
    }
    headers
}

fn is_auth_exempt_path(path: &str) -> bool {
    path == "/" || path == "/index.html"
}
