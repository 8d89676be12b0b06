//! lanbox server binary.
//!
//! A small file drop for a local network: clients upload files with a
//! multipart POST, list what is stored and download single files. The main
//! entry point resolves the bind address, prepares the storage directory,
//! starts the availability poller for mounted storage and serves the router.

mod app;
mod auth;
mod background;
mod config;
mod error;
mod files;
mod http;
mod info;
mod logging;
mod naming;
mod network;
mod storage;
#[cfg(test)]
mod test_support;
mod upload;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::auth::AuthConfig;
use crate::background::spawn_background_tasks;
use crate::config::{Args, BindMode, SHUTDOWN_GRACE_SECS};
use crate::info::ServerInfo;
use crate::storage::Storage;

shadow!(build);

/// Starts the lanbox server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let host = match resolve_bind_host(args.bind) {
        Ok(host) => host,
        Err(err) => {
            error!(error = %err, "refusing to start");
            return Err(err);
        }
    };
    let addr = SocketAddr::new(host, args.port);

    let storage = Arc::new(Storage::new(
        PathBuf::from(&args.storage_dir),
        args.storage_mode,
    ));
    storage.prepare().await?;
    let auth_config = Arc::new(AuthConfig::from_parts(
        args.auth_user.clone(),
        args.auth_pass.clone(),
    ));
    let server = Arc::new(ServerInfo::new(addr));

    let app = app::build_router(storage.clone(), auth_config.clone(), server.clone());
    let handle = Handle::new();

    info!("LAN storage server listening at {}", server.base_url);
    info!(
        root = ?storage.root_path(),
        mode = ?storage.mode(),
        "uploads saved to storage directory"
    );
    if let Some(credential) = &auth_config.credential {
        info!(user = credential.username, "basic auth enabled");
    }

    let poller = spawn_background_tasks(storage, Duration::from_millis(args.poll_interval_ms));
    tokio::spawn(shutdown_signal(handle.clone()));

    let result = axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await;
    if let Some(poller) = poller {
        poller.abort();
    }
    result
}

/// 根据绑定模式确定监听地址；局域网模式找不到私有地址时返回错误。
fn resolve_bind_host(mode: BindMode) -> Result<IpAddr, std::io::Error> {
    match mode {
        BindMode::Loopback => Ok(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        BindMode::Lan => network::discover_lan_ipv4().map(IpAddr::V4),
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
