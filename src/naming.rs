//! 上传文件名清洗与唯一命名。

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::FALLBACK_FILE_NAME;

/// 常见文件系统单个文件名的字节上限。
const MAX_NAME_BYTES: usize = 255;

/// 去掉客户端文件名中的目录部分，只保留最后一段。
///
/// `/` 和 `\` 都按分隔符处理，尾部分隔符会被忽略。
pub fn basename(name: &str) -> &str {
    let trimmed = name.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// 将 `[A-Za-z0-9._-]` 以外的每个字符替换为 `_`。
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// 由消歧标记和客户端文件名生成落盘名称：`<token>-<sanitized basename>`。
pub fn stored_name(token: u64, client_name: Option<&str>) -> String {
    let base = match client_name.map(basename) {
        Some(base) if !base.is_empty() => base,
        _ => FALLBACK_FILE_NAME,
    };
    format!("{token}-{}", sanitize_component(base))
}

/// 下载路径使用的名称解析，拒绝无法表示单个文件的名称。
pub fn download_name(requested: &str) -> Option<&str> {
    match basename(requested) {
        "" | "." | ".." => None,
        base if base.len() > MAX_NAME_BYTES || base.contains('\0') => None,
        base => Some(base),
    }
}

/// 毫秒时间戳消歧器，同一进程内保证严格递增。
#[derive(Debug, Default)]
pub struct Disambiguator {
    last: AtomicU64,
}

impl Disambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回下一个标记：当前毫秒时间戳，若不大于上一次则取上一次加一。
    pub fn next(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }
}
