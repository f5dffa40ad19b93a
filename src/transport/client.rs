use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode, Url};
use tracing::debug;

use super::{ErrorBody, ProfileBody};
use crate::discovery::{Factory, Release};
use crate::endpoint::{BoxEndpoint, CallContext, Endpoint};
use crate::error::{FlareError, Result};
use crate::service::{ProfileRequest, ProfileResponse};

/// HTTP 端点工厂
///
/// 实例地址可以是 `host:port`，也可以是完整 URL；没有 scheme 时补 `http://`。
/// 所有端点共享同一个 reqwest 连接池，因此不需要释放资源。
#[derive(Debug, Clone, Default)]
pub struct HttpFactory {
    client: HttpClient,
}

impl HttpFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }
}

/// 解析实例地址为基础 URL
fn base_url(instance: &str) -> Result<Url> {
    let raw = if instance.contains("://") {
        instance.to_string()
    } else {
        format!("http://{}", instance)
    };
    let url = Url::parse(&raw)
        .map_err(|e| FlareError::instance_construction(instance, e))?;
    if url.host_str().is_none() || url.cannot_be_a_base() {
        return Err(FlareError::instance_construction(instance, "missing host"));
    }
    Ok(url)
}

impl Factory<ProfileRequest, ProfileResponse> for HttpFactory {
    fn make(
        &self,
        instance: &str,
    ) -> Result<(BoxEndpoint<ProfileRequest, ProfileResponse>, Option<Release>)> {
        let base = base_url(instance)?;
        debug!(instance = %instance, base = %base, "building http endpoint");
        let endpoint = HttpEndpoint {
            client: self.client.clone(),
            base,
        };
        Ok((Arc::new(endpoint), None))
    }
}

/// 绑定到单个实例的 HTTP 端点
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: HttpClient,
    base: Url,
}

impl HttpEndpoint {
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, id: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FlareError::instance_construction(self.base.as_str(), "cannot be a base url")
            })?;
            segments.pop_if_empty().push("profiles");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, req: &ProfileRequest) -> Result<RequestBuilder> {
        let builder = match req {
            ProfileRequest::Post { profile } => self.client.post(self.url(None)?).json(profile),
            ProfileRequest::Get { id } => self.client.get(self.url(Some(id))?),
            ProfileRequest::Put { id, profile } => {
                self.client.put(self.url(Some(id))?).json(profile)
            }
            ProfileRequest::Delete { id } => self.client.delete(self.url(Some(id))?),
        };
        Ok(builder)
    }
}

/// 从非 2xx 响应还原错误
async fn decode_error(status: StatusCode, resp: reqwest::Response) -> FlareError {
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .map(|body| body.err)
        .filter(|err| !err.is_empty())
        .unwrap_or_else(|| status.to_string());
    FlareError::from_wire(status.as_u16(), &message)
}

#[async_trait]
impl Endpoint<ProfileRequest, ProfileResponse> for HttpEndpoint {
    async fn call(&self, ctx: CallContext, req: ProfileRequest) -> Result<ProfileResponse> {
        let mut builder = self.request(&req)?;
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FlareError::deadline_exceeded(format!("request to {} timed out", self.base))
            } else {
                FlareError::connection_failed(format!("request to {} failed: {}", self.base, e))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(decode_error(status, resp).await);
        }

        match req {
            ProfileRequest::Post { .. } => Ok(ProfileResponse::Posted),
            ProfileRequest::Get { .. } => {
                let body: ProfileBody = resp
                    .json()
                    .await
                    .map_err(|e| FlareError::deserialization_error(e.to_string()))?;
                Ok(ProfileResponse::Profile(body.profile))
            }
            ProfileRequest::Put { .. } => Ok(ProfileResponse::Put),
            ProfileRequest::Delete { .. } => Ok(ProfileResponse::Deleted),
        }
    }
}
