//! 文件列表与下载处理器。

use axum::body::Body as AxumBody;
use axum::extract::rejection::PathRejection;
use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::error::ApiError;
use crate::storage::Storage;

/// 列出存储目录中的文件名。
pub async fn list_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Vec<String>>, ApiError> {
    let names = storage.list_files().await?;
    info!(count = names.len(), "list files");
    Ok(JsonResponse(names))
}

/// 以附件形式下载单个文件。
///
/// 路径参数无法解码（如非 UTF-8 的百分号编码）时按不存在处理。
pub async fn download_file(
    path: Result<Path<String>, PathRejection>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    storage.ensure_available()?;
    let Path(name) = path.map_err(|_| ApiError::NotFound)?;
    let stored = storage.resolve_download(&name).await?;
    let file_size = stored.metadata.len();
    let file = File::open(&stored.path)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    response_headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&file_size.to_string())
            .map_err(|_| ApiError::Internal("failed to build response headers".into()))?,
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&stored.name))
            .map_err(|_| ApiError::Internal("failed to build response headers".into()))?,
    );
    if let Ok(modified) = stored.metadata.modified() {
        let value = fmt_http_date(modified);
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&value)
                .map_err(|_| ApiError::Internal("failed to build response headers".into()))?,
        );
    }

    info!(name = stored.name, size = file_size, "download file");
    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(stream),
    )
        .into_response())
}

fn content_disposition(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"attachment; filename="{escaped}""#)
}
