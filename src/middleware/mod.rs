//! 端点中间件模块
//!
//! 以 tower `Layer` 的形式提供超时、日志等端点中间件，
//! 可以逐层包裹任意 [`Endpoint`](crate::endpoint::Endpoint)。

pub mod logging;
pub mod timeout;

pub use logging::{EndpointLoggingLayer, LoggingEndpoint};
pub use timeout::{Timeout, TimeoutLayer};
