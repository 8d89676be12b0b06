//! 日志初始化：支持 `RUST_LOG` 覆盖，默认输出本服务与请求追踪的 info 日志。

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = concat!(env!("CARGO_CRATE_NAME"), "=info,tower_http=info");

/// 初始化 tracing 日志订阅与默认过滤规则。
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
