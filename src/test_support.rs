//! 单元测试共用的存储与 multipart 构造工具。

use std::sync::Arc;
use tempfile::{TempDir, tempdir};

use crate::config::StorageMode;
use crate::storage::Storage;

pub const BOUNDARY: &str = "lanbox-test-boundary";

pub fn make_storage() -> (TempDir, Arc<Storage>) {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("storage");
    std::fs::create_dir_all(&root).expect("create storage root");
    (temp, Arc::new(Storage::new(root, StorageMode::Local)))
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// 由 `(字段名, 文件名, 数据)` 列表构造 multipart 请求体；文件名为 `None` 时生成普通表单字段。
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
