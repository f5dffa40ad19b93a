//! 日志初始化

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;
use crate::error::{ErrorCode, InfraResultExt, Result};

/// 安装全局 tracing subscriber
///
/// 过滤规则优先取 `RUST_LOG`，否则取配置中的 `level`。只能调用一次。
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .into_flare(ErrorCode::ConfigurationError, "invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    installed.into_flare(ErrorCode::ConfigurationError, "tracing already initialized")
}
