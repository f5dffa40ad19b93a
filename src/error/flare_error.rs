//! 统一错误类型

use super::code::ErrorCode;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// 存储契约错误在线上传输时使用的固定消息
pub const MSG_ALREADY_EXISTS: &str = "already exists";
pub const MSG_NOT_FOUND: &str = "not found";
pub const MSG_INCONSISTENT_IDS: &str = "inconsistent IDs";
pub const MSG_NO_ENDPOINTS: &str = "no endpoints available";

/// 重试终止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// 达到最大尝试次数
    Attempts,
    /// 超过调用截止时间
    Deadline,
}

impl fmt::Display for RetryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryLimit::Attempts => write!(f, "max attempts reached"),
            RetryLimit::Deadline => write!(f, "deadline exceeded"),
        }
    }
}

/// 统一错误类型
#[derive(Error, Debug, Clone)]
pub enum FlareError {
    /// 带错误代码的错误
    #[error("错误 [{code}] {reason}", code = .code.as_str())]
    Localized {
        code: ErrorCode,
        reason: String,
        details: Option<String>,
        params: Option<HashMap<String, String>>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// 重试预算耗尽（尝试次数或截止时间）
    #[error("重试耗尽 ({limit}), 共尝试 {attempts} 次: {}", describe_last(.last))]
    Exhausted {
        limit: RetryLimit,
        attempts: usize,
        last: Option<Box<FlareError>>,
    },

    /// 系统错误（用于内部错误，不暴露给用户）
    #[error("系统错误: {0}")]
    System(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

fn describe_last(last: &Option<Box<FlareError>>) -> String {
    match last {
        Some(err) => err.to_string(),
        None => "no attempt was made".to_string(),
    }
}

impl FlareError {
    /// 创建带错误代码的错误
    pub fn localized(code: ErrorCode, reason: impl Into<String>) -> Self {
        FlareError::Localized {
            code,
            reason: reason.into(),
            details: None,
            params: None,
            timestamp: chrono::Utc::now(),
        }
    }

    fn with_param(code: ErrorCode, reason: &str, key: &str, value: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert(key.to_string(), value.into());
        FlareError::Localized {
            code,
            reason: reason.to_string(),
            details: None,
            params: Some(params),
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建系统错误
    pub fn system(msg: impl Into<String>) -> Self {
        FlareError::System(msg.into())
    }

    /// 创建 IO 错误
    pub fn io(msg: impl Into<String>) -> Self {
        FlareError::Io(msg.into())
    }

    // ============================================================
    // 存储契约错误
    // ============================================================

    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::with_param(ErrorCode::ProfileAlreadyExists, MSG_ALREADY_EXISTS, "id", id)
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::with_param(ErrorCode::ProfileNotFound, MSG_NOT_FOUND, "id", id)
    }

    pub fn inconsistent_ids(path_id: impl Into<String>, body_id: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert("path_id".to_string(), path_id.into());
        params.insert("body_id".to_string(), body_id.into());
        FlareError::Localized {
            code: ErrorCode::InconsistentIds,
            reason: MSG_INCONSISTENT_IDS.to_string(),
            details: None,
            params: Some(params),
            timestamp: chrono::Utc::now(),
        }
    }

    // ============================================================
    // 服务发现与调用错误
    // ============================================================

    pub fn registry_lookup(service: &str, reason: impl fmt::Display) -> Self {
        Self::with_param(
            ErrorCode::RegistryLookupFailed,
            &format!("registry lookup failed: {}", reason),
            "service",
            service,
        )
    }

    pub fn instance_construction(instance: &str, reason: impl fmt::Display) -> Self {
        Self::with_param(
            ErrorCode::InstanceConstructionFailed,
            &format!("cannot build endpoint: {}", reason),
            "instance",
            instance,
        )
    }

    pub fn no_endpoints() -> Self {
        Self::localized(ErrorCode::NoEndpoints, MSG_NO_ENDPOINTS)
    }

    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::ConnectionFailed, reason)
    }

    /// 远端返回了非 2xx 且无法识别的错误
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::with_param(ErrorCode::RemoteError, &message.into(), "status", status.to_string())
    }

    pub fn deadline_exceeded(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::DeadlineExceeded, reason)
    }

    pub fn cancelled() -> Self {
        Self::localized(ErrorCode::Cancelled, "call cancelled")
    }

    pub fn exhausted(limit: RetryLimit, attempts: usize, last: Option<FlareError>) -> Self {
        FlareError::Exhausted {
            limit,
            attempts,
            last: last.map(Box::new),
        }
    }

    // ============================================================
    // 通用错误
    // ============================================================

    pub fn serialization_error(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::SerializationError, reason)
    }

    pub fn deserialization_error(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::DeserializationError, reason)
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::ConfigurationError, reason)
    }

    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::InvalidParameter, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::localized(ErrorCode::InternalError, reason)
    }

    /// 将线上错误消息还原为错误类型
    ///
    /// 存储契约错误按固定消息还原，其它消息按远端错误处理。
    pub fn from_wire(status: u16, message: &str) -> Self {
        match message {
            MSG_ALREADY_EXISTS => Self::localized(ErrorCode::ProfileAlreadyExists, MSG_ALREADY_EXISTS),
            MSG_NOT_FOUND => Self::localized(ErrorCode::ProfileNotFound, MSG_NOT_FOUND),
            MSG_INCONSISTENT_IDS => Self::localized(ErrorCode::InconsistentIds, MSG_INCONSISTENT_IDS),
            other => Self::remote(status, other),
        }
    }

    // ============================================================
    // 信息获取方法
    // ============================================================

    /// 获取错误代码
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            FlareError::Localized { code, .. } => Some(*code),
            FlareError::Exhausted { .. } => Some(ErrorCode::RetryExhausted),
            _ => None,
        }
    }

    /// 获取错误原因
    pub fn reason(&self) -> &str {
        match self {
            FlareError::Localized { reason, .. } => reason,
            FlareError::Exhausted { .. } => "retry exhausted",
            FlareError::System(msg) => msg,
            FlareError::Io(msg) => msg,
        }
    }

    /// 获取错误详情
    pub fn details(&self) -> Option<&str> {
        match self {
            FlareError::Localized { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    /// 获取错误参数
    pub fn param(&self, key: &str) -> Option<&str> {
        match self {
            FlareError::Localized {
                params: Some(params),
                ..
            } => params.get(key).map(String::as_str),
            _ => None,
        }
    }

    /// 写入 `{"err": ...}` 响应体的消息
    pub fn wire_message(&self) -> String {
        match self {
            FlareError::Localized { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// 导致重试终止的最后一次失败
    pub fn last_failure(&self) -> Option<&FlareError> {
        match self {
            FlareError::Exhausted { last, .. } => last.as_deref(),
            _ => None,
        }
    }

    /// 重试终止原因
    pub fn retry_limit(&self) -> Option<RetryLimit> {
        match self {
            FlareError::Exhausted { limit, .. } => Some(*limit),
            _ => None,
        }
    }

    /// 判断是否为瞬时错误，决定调用层是否换实例重试
    ///
    /// 远端返回的 4xx 错误是请求本身的问题，换实例也不会成功。
    pub fn is_transient(&self) -> bool {
        match self {
            FlareError::Localized {
                code: ErrorCode::RemoteError,
                ..
            } => !self.remote_status().is_some_and(|status| (400..500).contains(&status)),
            FlareError::Localized { code, .. } => code.is_transient(),
            FlareError::Exhausted { .. } => false,
            FlareError::System(_) | FlareError::Io(_) => true,
        }
    }

    /// 远端错误的 HTTP 状态码
    pub fn remote_status(&self) -> Option<u16> {
        match self.code() {
            Some(ErrorCode::RemoteError) => self.param("status").and_then(|s| s.parse().ok()),
            _ => None,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.code() == Some(ErrorCode::ProfileAlreadyExists)
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::ProfileNotFound)
    }

    pub fn is_inconsistent_ids(&self) -> bool {
        self.code() == Some(ErrorCode::InconsistentIds)
    }

    pub fn is_no_endpoints(&self) -> bool {
        self.code() == Some(ErrorCode::NoEndpoints)
    }

    pub fn is_cancelled(&self) -> bool {
        self.code() == Some(ErrorCode::Cancelled)
    }

    /// 截止时间超时，或因截止时间而终止的重试
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            FlareError::Exhausted { limit, .. } => *limit == RetryLimit::Deadline,
            _ => self.code() == Some(ErrorCode::DeadlineExceeded),
        }
    }
}

impl From<std::io::Error> for FlareError {
    fn from(err: std::io::Error) -> Self {
        FlareError::Io(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, FlareError>;
