//! 外部挂载存储的可用性轮询任务。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::StorageMode;
use crate::storage::Storage;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 启动后台任务；仅挂载模式需要轮询，本地模式返回 `None`。
pub fn spawn_background_tasks(
    storage: Arc<Storage>,
    poll_interval: Duration,
) -> Option<JoinHandle<()>> {
    if storage.mode() != StorageMode::Mount {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval.max(MIN_POLL_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            storage.refresh().await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn local_mode_spawns_nothing() {
        let temp = tempdir().expect("tempdir");
        let storage = Arc::new(Storage::new(temp.path().to_path_buf(), StorageMode::Local));
        assert!(spawn_background_tasks(storage, Duration::from_millis(10)).is_none());
    }

    #[tokio::test]
    async fn poller_picks_up_mount_changes() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("usb");
        let storage = Arc::new(Storage::new(root.clone(), StorageMode::Mount));
        let handle = spawn_background_tasks(storage.clone(), Duration::from_millis(20))
            .expect("mount mode spawns a poller");

        std::fs::create_dir_all(&root).expect("mount");
        let mut detected = false;
        for _ in 0..100 {
            if storage.is_available() {
                detected = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(detected, "poller should notice the mounted directory");

        std::fs::remove_dir_all(&root).expect("unmount");
        let mut lost = false;
        for _ in 0..100 {
            if !storage.is_available() {
                lost = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(lost, "poller should notice the removed directory");
        handle.abort();
    }
}
