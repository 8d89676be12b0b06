//! 路由组装：端点、中间件与共享状态。

use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::auth::{self, AuthConfig};
use crate::error::ApiError;
use crate::files;
use crate::http::{self, resolve_client_ip};
use crate::info::{self, ServerInfo};
use crate::storage::Storage;
use crate::upload;

/// 组装完整路由。中间件由外到内依次为：追踪、通用响应头、CORS 预检、认证；
/// 存储可用性在各文件处理器内部检查。
pub fn build_router(
    storage: Arc<Storage>,
    auth_config: Arc<AuthConfig>,
    server: Arc<ServerInfo>,
) -> Router {
    Router::new()
        .route("/", get(info::get_index))
        .route("/index.html", get(info::get_index))
        .route(
            "/upload",
            post(upload::upload_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/files", get(files::list_files))
        .route("/files/{name}", get(files::download_file))
        .route("/download/{name}", get(files::download_file))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(middleware::from_fn(auth::auth_middleware))
        .layer(middleware::from_fn(http::cors_preflight))
        .layer(middleware::from_fn(http::add_common_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip());
                    let client_ip = resolve_client_ip(request.headers(), connect_ip)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(storage))
        .layer(Extension(auth_config))
        .layer(Extension(server))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
