use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::ErrorKind;
use tracing::{info, warn};

use crate::config::{MAX_NAME_ATTEMPTS, StorageMode};
use crate::naming::{Disambiguator, download_name, stored_name};

/// 所有文件所在的单一存储目录及其可用状态。
///
/// [`StorageMode::Mount`] 模式下该标志只由后台轮询调用的 [`Storage::refresh`] 写入；
/// 处理器读取缓存值，最多滞后一个轮询周期。
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    mode: StorageMode,
    available: AtomicBool,
    tokens: Disambiguator,
}

/// 通过名称解析的下载目标。
#[derive(Debug)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub metadata: Metadata,
}

impl Storage {
    pub fn new(root: PathBuf, mode: StorageMode) -> Self {
        Self {
            root,
            mode,
            available: AtomicBool::new(mode == StorageMode::Local),
            tokens: Disambiguator::new(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// 启动时准备存储：本地模式递归创建目录，挂载模式做首次探测。
    pub async fn prepare(&self) -> io::Result<()> {
        match self.mode {
            StorageMode::Local => {
                fs::create_dir_all(&self.root).await?;
                self.available.store(true, Ordering::Release);
            }
            StorageMode::Mount => {
                if !self.refresh().await {
                    warn!(root = ?self.root, "storage not available, waiting for it to be mounted");
                }
            }
        }
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn ensure_available(&self) -> Result<(), StorageError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }

    /// 重新探测目录是否存在并缓存结果，状态变化时记录日志。
    pub async fn refresh(&self) -> bool {
        let present = fs::metadata(&self.root)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        let previous = self.available.swap(present, Ordering::AcqRel);
        if previous != present {
            if present {
                info!(root = ?self.root, "storage detected");
            } else {
                warn!(root = ?self.root, "storage not available");
            }
        }
        present
    }

    /// 列出根目录下的普通文件名（不含目录与符号链接）。
    pub async fn list_files(&self) -> Result<Vec<String>, StorageError> {
        self.ensure_available()?;
        let mut dir = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// 将客户端提供的名称解析为根目录下的普通文件。
    ///
    /// 无法成为存储名的名称（含 NUL、超长等）一律视为不存在。
    pub async fn resolve_download(&self, requested: &str) -> Result<StoredFile, StorageError> {
        self.ensure_available()?;
        let name = download_name(requested).ok_or(StorageError::InvalidName)?;
        let path = self.root.join(name);
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput) => {
                return Err(StorageError::NotFound);
            }
            Err(err) => return Err(StorageError::Io(err)),
        };
        if !metadata.file_type().is_file() {
            return Err(StorageError::NotFound);
        }
        Ok(StoredFile {
            name: name.to_string(),
            path,
            metadata,
        })
    }

    /// 为上传创建新文件，名称冲突时换下一个消歧标记，绝不覆盖已有文件。
    pub async fn create_upload(
        &self,
        client_name: Option<&str>,
    ) -> Result<(String, File), StorageError> {
        self.ensure_available()?;
        let mut last_error = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = stored_name(self.tokens.next(), client_name);
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
                .await;
            match opened {
                Ok(file) => return Ok((name, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => last_error = Some(err),
                Err(err) => return Err(StorageError::Io(err)),
            }
        }
        Err(StorageError::Io(
            last_error.unwrap_or_else(|| io::Error::from(ErrorKind::AlreadyExists)),
        ))
    }

    /// 删除写入失败的半成品文件。
    pub async fn discard(&self, name: &str) {
        if let Err(err) = fs::remove_file(self.root.join(name)).await
            && err.kind() != ErrorKind::NotFound
        {
            warn!(name, error = %err, "failed to remove partial upload");
        }
    }
}

#[derive(Debug)]
pub enum StorageError {
    Unavailable,
    InvalidName,
    NotFound,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}
