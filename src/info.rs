//! 服务自描述信息处理器。

use axum::extract::Extension;
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// 启动时确定的对外访问地址。
#[derive(Clone, Debug)]
pub struct ServerInfo {
    pub base_url: String,
}

impl ServerInfo {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            base_url: format!("http://{addr}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexInfo {
    message: &'static str,
    version: &'static str,
    upload: String,
    files: String,
    download: String,
}

/// 返回服务端点说明，不访问文件系统。
pub async fn get_index(Extension(server): Extension<Arc<ServerInfo>>) -> JsonResponse<IndexInfo> {
    let base = &server.base_url;
    JsonResponse(IndexInfo {
        message: "LAN storage server",
        version: crate::build::PKG_VERSION,
        upload: format!("POST {base}/upload"),
        files: format!("GET {base}/files"),
        download: format!("GET {base}/download/:filename"),
    })
}
