//! 端点抽象
//!
//! 端点是统一的调用单元：接收调用上下文和请求，返回响应或错误。
//! 远程调用、中间件、负载均衡和重试都以端点的形式表达，从而可以自由组合。

pub mod context;

pub use context::CallContext;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// 端点 trait
///
/// 端点本身应当是无状态的值，可以闭包持有由工厂创建的连接资源。
/// 由于需要动态分发（dyn），使用 async-trait。
#[async_trait]
pub trait Endpoint<Req, Resp>: Send + Sync {
    async fn call(&self, ctx: CallContext, req: Req) -> Result<Resp>;
}

/// 动态分发的端点
pub type BoxEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

impl<Req, Resp> std::fmt::Debug for dyn Endpoint<Req, Resp> + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Endpoint")
    }
}

#[async_trait]
impl<Req, Resp, E> Endpoint<Req, Resp> for Arc<E>
where
    E: Endpoint<Req, Resp> + ?Sized,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: CallContext, req: Req) -> Result<Resp> {
        (**self).call(ctx, req).await
    }
}

/// 由闭包构成的端点，见 [`endpoint_fn`]
#[derive(Clone)]
pub struct EndpointFn<F> {
    f: F,
}

/// 用闭包创建端点
///
/// ```rust
/// use flare_profilesvc::endpoint::{boxed, endpoint_fn, BoxEndpoint, CallContext, Endpoint};
///
/// # async fn example() -> flare_profilesvc::Result<()> {
/// let double: BoxEndpoint<u32, u32> = boxed(endpoint_fn(|_ctx: CallContext, n: u32| async move {
///     Ok::<_, flare_profilesvc::FlareError>(n * 2)
/// }));
/// assert_eq!(double.call(CallContext::new(), 21).await?, 42);
/// # Ok(())
/// # }
/// ```
pub fn endpoint_fn<Req, Resp, F, Fut>(f: F) -> EndpointFn<F>
where
    F: Fn(CallContext, Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp>> + Send + 'static,
{
    EndpointFn { f }
}

#[async_trait]
impl<Req, Resp, F, Fut> Endpoint<Req, Resp> for EndpointFn<F>
where
    F: Fn(CallContext, Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp>> + Send + 'static,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: CallContext, req: Req) -> Result<Resp> {
        (self.f)(ctx, req).await
    }
}

/// 将端点装箱为 [`BoxEndpoint`]
pub fn boxed<Req, Resp, E>(endpoint: E) -> BoxEndpoint<Req, Resp>
where
    E: Endpoint<Req, Resp> + 'static,
{
    Arc::new(endpoint)
}
