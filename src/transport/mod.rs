//! HTTP 传输层
//!
//! 服务端：axum 路由，把档案服务暴露为 JSON over HTTP，并提供 `/metrics`。
//! 客户端：[`HttpFactory`] 为每个实例地址构建 reqwest 端点。

pub mod client;
pub mod server;

pub use client::{HttpEndpoint, HttpFactory};
pub use server::{router, serve, status_for};

use serde::{Deserialize, Serialize};

use crate::service::Profile;

/// `GET /profiles/{id}` 的响应体
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProfileBody {
    pub profile: Profile,
}

/// 非 2xx 响应体 `{"err": "..."}`
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub err: String,
}
