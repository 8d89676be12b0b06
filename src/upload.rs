//! multipart 上传处理器。

use axum::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use axum::extract::Extension;
use axum::response::Json as JsonResponse;
use futures_util::stream::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::storage::Storage;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    ok: bool,
    files: Vec<SavedFile>,
}

/// 成功落盘的单个文件：表单字段名、存储名与客户端原始文件名。
#[derive(Debug, Serialize)]
pub struct SavedFile {
    field: String,
    name: String,
    original: String,
}

enum PartOutcome {
    Saved(String),
    Skipped,
}

/// 接收 multipart 请求，逐个保存文件分片。
///
/// 单个文件写入失败只记录日志并从结果中略去，不影响同一请求中的其他文件；
/// 请求体本身无法解析时返回 400。存储不可用的判断先于请求体解析。
pub async fn upload_files(
    Extension(storage): Extension<Arc<Storage>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    storage.ensure_available()?;
    let mut multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "malformed multipart request");
        ApiError::BadRequest("Malformed multipart request".into())
    })?;

    let mut saved = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };
        let field_name = field.name().unwrap_or_default().to_string();
        match save_part(&storage, &original, field).await? {
            PartOutcome::Saved(name) => {
                info!(field = field_name, name, original, "file saved");
                saved.push(SavedFile {
                    field: field_name,
                    name,
                    original,
                });
            }
            PartOutcome::Skipped => {}
        }
    }

    Ok(JsonResponse(UploadResponse {
        ok: true,
        files: saved,
    }))
}

/// 将单个文件分片写入存储目录。
///
/// 只有请求体解析错误会向上传播；磁盘写入错误返回 `Skipped`。
async fn save_part(
    storage: &Storage,
    original: &str,
    mut field: Field<'_>,
) -> Result<PartOutcome, ApiError> {
    let (name, mut file) = match storage.create_upload(Some(original)).await {
        Ok(created) => created,
        Err(err) => {
            error!(original, error = ?err, "failed to create upload target");
            return Ok(PartOutcome::Skipped);
        }
    };

    let mut total_written: u64 = 0;
    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                storage.discard(&name).await;
                return Err(malformed(err));
            }
        };
        if let Err(err) = file.write_all(&chunk).await {
            error!(name, error = %err, "write error");
            drop(file);
            storage.discard(&name).await;
            return Ok(PartOutcome::Skipped);
        }
        total_written += chunk.len() as u64;
    }

    if let Err(err) = file.flush().await {
        error!(name, error = %err, "write error");
        drop(file);
        storage.discard(&name).await;
        return Ok(PartOutcome::Skipped);
    }

    info!(name, bytes = total_written, "upload stream finished");
    Ok(PartOutcome::Saved(name))
}

fn malformed(err: MultipartError) -> ApiError {
    warn!(error = %err, "malformed multipart request");
    ApiError::BadRequest("Malformed multipart request".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as AxumBody;
    use axum::extract::FromRequest;
    use axum::http::{Request, header};
    use tempfile::tempdir;

    use crate::config::StorageMode;
    use crate::test_support::{BOUNDARY, make_storage, multipart_body, multipart_content_type};

    async fn make_multipart(body: Vec<u8>) -> Result<Multipart, MultipartRejection> {
        extract_multipart(&multipart_content_type(), body).await
    }

    async fn extract_multipart(
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Multipart, MultipartRejection> {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(AxumBody::from(body))
            .expect("request");
        Multipart::from_request(request, &()).await
    }

    #[tokio::test]
    async fn upload_saves_every_file_part() {
        let (_temp, storage) = make_storage();
        let body = multipart_body(&[
            ("a", Some("report.pdf"), b"first".as_slice()),
            ("note", None, b"plain field".as_slice()),
            ("b", Some("report.pdf"), b"second".as_slice()),
        ]);
        let JsonResponse(response) =
            upload_files(Extension(storage.clone()), make_multipart(body).await)
                .await
                .expect("upload");

        assert!(response.ok);
        assert_eq!(response.files.len(), 2);
        assert_eq!(response.files[0].field, "a");
        assert_eq!(response.files[1].field, "b");
        assert_eq!(response.files[0].original, "report.pdf");
        assert_ne!(response.files[0].name, response.files[1].name);

        let first = std::fs::read(storage.root_path().join(&response.files[0].name))
            .expect("read first");
        let second = std::fs::read(storage.root_path().join(&response.files[1].name))
            .expect("read second");
        assert_eq!(first, b"first".as_slice());
        assert_eq!(second, b"second".as_slice());
    }

    #[tokio::test]
    async fn upload_sanitizes_traversal_names() {
        let (temp, storage) = make_storage();
        let body = multipart_body(&[("file", Some("../../evil name.sh"), b"x".as_slice())]);
        let JsonResponse(response) =
            upload_files(Extension(storage.clone()), make_multipart(body).await)
                .await
                .expect("upload");

        let saved = &response.files[0];
        assert!(saved.name.ends_with("-evil_name.sh"), "{}", saved.name);
        assert_eq!(saved.original, "../../evil name.sh");
        assert!(storage.root_path().join(&saved.name).is_file());
        assert!(!temp.path().join("evil name.sh").exists());
    }

    #[tokio::test]
    async fn upload_with_empty_filename_uses_fallback() {
        let (_temp, storage) = make_storage();
        let body = multipart_body(&[("file", Some(""), b"data".as_slice())]);
        let JsonResponse(response) = upload_files(Extension(storage), make_multipart(body).await)
            .await
            .expect("upload");
        assert!(response.files[0].name.ends_with("-file"));
        assert_eq!(response.files[0].original, "");
    }

    #[tokio::test]
    async fn upload_rejects_when_storage_unavailable() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("usb");
        let storage = Arc::new(Storage::new(root.clone(), StorageMode::Mount));
        let body = multipart_body(&[("file", Some("a.txt"), b"data".as_slice())]);
        let result = upload_files(Extension(storage), make_multipart(body).await).await;

        assert!(matches!(result, Err(ApiError::StorageUnavailable)));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn unavailable_storage_wins_over_non_multipart_body() {
        let temp = tempdir().expect("tempdir");
        let storage = Arc::new(Storage::new(temp.path().join("usb"), StorageMode::Mount));
        let multipart = extract_multipart("text/plain", b"hello".to_vec()).await;
        assert!(multipart.is_err());

        let result = upload_files(Extension(storage), multipart).await;
        assert!(matches!(result, Err(ApiError::StorageUnavailable)));
    }

    #[tokio::test]
    async fn non_multipart_body_is_malformed() {
        let (_temp, storage) = make_storage();
        let multipart = extract_multipart("text/plain", b"hello".to_vec()).await;
        let result = upload_files(Extension(storage.clone()), multipart).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(storage.list_files().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn truncated_body_is_malformed_and_leaves_no_partial_file() {
        let (_temp, storage) = make_storage();
        let mut body = multipart_body(&[("file", Some("a.txt"), b"data".as_slice())]);
        body.truncate(body.len() - format!("\r\n--{BOUNDARY}--\r\n").len());
        let result = upload_files(Extension(storage.clone()), make_multipart(body).await).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(storage.list_files().await.expect("list").is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unwritable_storage_omits_files_without_failing() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, storage) = make_storage();
        let root = storage.root_path().to_path_buf();
        std::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o555))
            .expect("chmod");
        if std::fs::write(root.join("write-check"), b"".as_slice()).is_ok() {
            // Running as root; permissions are not enforced.
            return;
        }

        let body = multipart_body(&[("file", Some("a.txt"), b"data".as_slice())]);
        let JsonResponse(response) = upload_files(Extension(storage), make_multipart(body).await)
            .await
            .expect("upload");
        std::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o755))
            .expect("chmod back");

        assert!(response.ok);
        assert!(response.files.is_empty());
    }
}
