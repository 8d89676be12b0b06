//! CLI arguments and server configuration defaults.

use clap::{Parser, ValueEnum};
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_STORAGE_DIR: &str = "uploads";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const AUTH_REALM: &str = "LAN Storage";
/// 客户端文件名缺失时使用的默认名称。
pub const FALLBACK_FILE_NAME: &str = "file";
/// 上传目标重名时最多尝试的次数。
pub const MAX_NAME_ATTEMPTS: u32 = 8;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// 监听地址的选择方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BindMode {
    /// 仅监听 127.0.0.1。
    Loopback,
    /// 监听第一个私有网段 IPv4 地址，找不到则拒绝启动。
    Lan,
}

/// 存储目录的可用性判定方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageMode {
    /// 启动时递归创建目录，之后视为始终可用。
    Local,
    /// 外部挂载目录，定时轮询是否存在。
    Mount,
}

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "lanbox", version = VERSION_INFO, about = "LAN file drop server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "LANBOX_STORAGE_DIR",
        default_value = DEFAULT_STORAGE_DIR,
        help = "Storage directory for uploaded files"
    )]
    pub storage_dir: String,
    #[arg(
        short = 'm',
        long,
        env = "LANBOX_STORAGE_MODE",
        value_enum,
        default_value_t = StorageMode::Local,
        help = "Storage mode: local directory or external mount"
    )]
    pub storage_mode: StorageMode,
    #[arg(
        long,
        env = "LANBOX_POLL_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL_MS,
        help = "Mount availability check interval in milliseconds"
    )]
    pub poll_interval_ms: u64,
    #[arg(
        short = 'b',
        long,
        env = "LANBOX_BIND",
        value_enum,
        default_value_t = BindMode::Loopback,
        help = "Bind to loopback or to the first private LAN IPv4 address"
    )]
    pub bind: BindMode,
    #[arg(
        short = 'p',
        long,
        env = "LANBOX_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "LANBOX_AUTH_USER",
        requires = "auth_pass",
        help = "Basic auth username (enables auth together with --auth-pass)"
    )]
    pub auth_user: Option<String>,
    #[arg(
        long,
        env = "LANBOX_AUTH_PASS",
        requires = "auth_user",
        hide_env_values = true,
        help = "Basic auth password"
    )]
    pub auth_pass: Option<String>,
}
