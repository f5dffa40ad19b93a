use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{header, StatusCode};
use prometheus::Registry;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{ErrorBody, ProfileBody};
use crate::endpoint::CallContext;
use crate::error::{ErrorCode, FlareError, Result};
use crate::metrics;
use crate::service::{Profile, ProfileService};

#[derive(Clone)]
struct AppState {
    service: Arc<dyn ProfileService>,
    registry: Registry,
}

/// 错误到 HTTP 状态码的映射
pub fn status_for(err: &FlareError) -> StatusCode {
    match err.code() {
        Some(ErrorCode::ProfileNotFound) => StatusCode::NOT_FOUND,
        Some(ErrorCode::ProfileAlreadyExists)
        | Some(ErrorCode::InconsistentIds)
        | Some(ErrorCode::InvalidParameter)
        | Some(ErrorCode::DeserializationError) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

struct ApiError(FlareError);

impl From<FlareError> for ApiError {
    fn from(err: FlareError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(FlareError::deserialization_error(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = ErrorBody {
            err: self.0.wire_message(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// 创建路由
///
/// - `POST /profiles`
/// - `GET /profiles/{id}`
/// - `PUT /profiles/{id}`
/// - `DELETE /profiles/{id}`
/// - `GET /metrics`
pub fn router(service: Arc<dyn ProfileService>, registry: Registry) -> Router {
    Router::new()
        .route("/profiles", post(post_profile))
        .route(
            "/profiles/{id}",
            get(get_profile).put(put_profile).delete(delete_profile),
        )
        .route("/metrics", get(get_metrics))
        .with_state(AppState { service, registry })
}

async fn post_profile(
    State(state): State<AppState>,
    body: std::result::Result<Json<Profile>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(profile) = body?;
    state
        .service
        .post_profile(&CallContext::new(), profile)
        .await?;
    Ok(Json(json!({})))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProfileBody>> {
    let profile = state.service.get_profile(&CallContext::new(), &id).await?;
    Ok(Json(ProfileBody { profile }))
}

async fn put_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Profile>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(profile) = body?;
    state
        .service
        .put_profile(&CallContext::new(), &id, profile)
        .await?;
    Ok(Json(json!({})))
}

async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .service
        .delete_profile(&CallContext::new(), &id)
        .await?;
    Ok(Json(json!({})))
}

async fn get_metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let output = metrics::render(&state.registry)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
        .into_response())
}

/// 在监听器上提供服务，取消信号触发后优雅关闭
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    let address = listener.local_addr()?;
    info!(address = %address, "🚀 HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!(address = %address, "🛑 HTTP server stopped");
    Ok(())
}
