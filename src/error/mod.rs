//! 错误处理模块
//!
//! 提供统一的错误类型、错误代码分类，以及基础设施错误到业务错误的转换

pub mod builder;
pub mod code;
pub mod flare_error;

pub use builder::ErrorBuilder;
pub use code::{ErrorCategory, ErrorCode};
pub use flare_error::{
    FlareError, MSG_ALREADY_EXISTS, MSG_INCONSISTENT_IDS, MSG_NO_ENDPOINTS, MSG_NOT_FOUND, Result,
    RetryLimit,
};

/// 基础设施层默认使用的结果类型
pub type InfraResult<T> = anyhow::Result<T>;

/// 将基础设施错误转换为 `FlareError`
pub fn map_infra_error<E, S>(error: E, code: ErrorCode, message: S) -> FlareError
where
    E: std::fmt::Display,
    S: Into<String>,
{
    ErrorBuilder::new(code, message.into())
        .details(error.to_string())
        .build()
}

/// `Result` 的辅助扩展，用于把第三方错误快速转换为统一的错误类型
pub trait InfraResultExt<T> {
    fn into_flare<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>;
}

impl<T, E> InfraResultExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn into_flare<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>,
    {
        self.map_err(|err| map_infra_error(err, code, message))
    }
}
