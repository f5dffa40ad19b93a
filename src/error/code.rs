//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 服务发现相关错误
/// - 2000-2999: 调用相关错误
/// - 3000-3999: 存储契约错误
/// - 6000-6999: 系统相关错误
/// - 8000-8999: 序列化相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 服务发现相关错误 (1000-1999)
    // ============================================================
    RegistryLookupFailed = 1000,
    InstanceConstructionFailed = 1002,
    NoEndpoints = 1003,

    // ============================================================
    // 调用相关错误 (2000-2999)
    // ============================================================
    ConnectionFailed = 2000,
    RemoteError = 2001,
    DeadlineExceeded = 2002,
    Cancelled = 2003,
    RetryExhausted = 2004,

    // ============================================================
    // 存储契约错误 (3000-3999)
    // ============================================================
    ProfileAlreadyExists = 3000,
    ProfileNotFound = 3001,
    InconsistentIds = 3002,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    InternalError = 6000,
    ConfigurationError = 6003,

    // ============================================================
    // 序列化相关错误 (8000-8999)
    // ============================================================
    SerializationError = 8000,
    DeserializationError = 8001,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    InvalidParameter = 9001,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RegistryLookupFailed => "REGISTRY_LOOKUP_FAILED",
            ErrorCode::InstanceConstructionFailed => "INSTANCE_CONSTRUCTION_FAILED",
            ErrorCode::NoEndpoints => "NO_ENDPOINTS",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::RemoteError => "REMOTE_ERROR",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::ProfileAlreadyExists => "PROFILE_ALREADY_EXISTS",
            ErrorCode::ProfileNotFound => "PROFILE_NOT_FOUND",
            ErrorCode::InconsistentIds => "INCONSISTENT_IDS",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::DeserializationError => "DESERIALIZATION_ERROR",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Discovery,
            2000..=2999 => ErrorCategory::Invocation,
            3000..=3999 => ErrorCategory::Store,
            6000..=6999 => ErrorCategory::System,
            8000..=8999 => ErrorCategory::Serialization,
            _ => ErrorCategory::General,
        }
    }

    /// 判断是否为瞬时错误（换一个实例重试可能成功）
    ///
    /// 存储契约错误、取消和参数错误不会因为重试而改变结果。
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ErrorCode::ProfileAlreadyExists
                | ErrorCode::ProfileNotFound
                | ErrorCode::InconsistentIds
                | ErrorCode::Cancelled
                | ErrorCode::InvalidParameter
                | ErrorCode::ConfigurationError
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Discovery,
    Invocation,
    Store,
    System,
    Serialization,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Discovery => write!(f, "DISCOVERY"),
            ErrorCategory::Invocation => write!(f, "INVOCATION"),
            ErrorCategory::Store => write!(f, "STORE"),
            ErrorCategory::System => write!(f, "SYSTEM"),
            ErrorCategory::Serialization => write!(f, "SERIALIZATION"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}
