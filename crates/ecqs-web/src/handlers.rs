//! HTTP处理器

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ecqs_core::{EcqsError, QueueEntry, RoomType, RoomView, Room};
use ecqs_workflow::{
    ImportReport, ImportRow, QueueEngine, RoomQueue, RoomTypeStatus, DEFAULT_RECENT_CALLS_LIMIT,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 路由共享状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<QueueEngine>,
}

impl AppState {
    pub fn new(engine: Arc<QueueEngine>) -> Self {
        Self { engine }
    }
}

/// API错误，将业务错误映射为HTTP状态码
#[derive(Debug)]
pub struct ApiError(pub EcqsError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<EcqsError> for ApiError {
    fn from(err: EcqsError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn missing_fields() -> Self {
        Self(EcqsError::Validation("Missing required fields".to_string()))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            EcqsError::InvalidRoomType(_)
            | EcqsError::RoomTypeMismatch { .. }
            | EcqsError::InvalidQueueNumber(_)
            | EcqsError::Validation(_) => StatusCode::BAD_REQUEST,
            EcqsError::UnknownRoom(_) | EcqsError::EntryNotFound(_) => StatusCode::NOT_FOUND,
            EcqsError::Announcer(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.0 {
            EcqsError::Validation(msg) => msg,
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// 请求体缺失或不是合法JSON时统一返回 400 "No data provided"
fn payload<T>(body: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!("Rejected request body: {}", rejection);
        ApiError(EcqsError::Validation("No data provided".to_string()))
    })
}

/// 取出非空字段
fn required(field: Option<String>) -> ApiResult<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(ApiError::missing_fields)
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let summary = state.engine.summary().await;

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "queue": summary,
        "announcer": state.engine.announcer_stats(),
    }))
}

pub async fn room_types(State(state): State<AppState>) -> Json<Vec<RoomType>> {
    Json(state.engine.directory().room_types().to_vec())
}

pub async fn rooms(State(state): State<AppState>) -> Json<Vec<Room>> {
    Json(state.engine.directory().rooms().to_vec())
}

/// 单个房间配置（房间显示屏使用）
pub async fn room_config(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomView>> {
    Ok(Json(state.engine.directory().room_view(&room_id)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub room_type: Option<String>,
}

/// 登记处理器
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = payload(body)?;
    let name = required(request.name)?;
    let room_type = required(request.room_type)?;

    let queue_number = state.engine.register(&name, &room_type).await?;

    Ok(Json(json!({
        "success": true,
        "queueNumber": queue_number,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub queue_number: Option<String>,
    pub room_id: Option<String>,
}

/// 叫号处理器，返回双语播报文本
pub async fn call(
    State(state): State<AppState>,
    body: std::result::Result<Json<CallRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = payload(body)?;
    let queue_number = required(request.queue_number)?;
    let room_id = required(request.room_id)?;

    let outcome = state.engine.call(&queue_number, &room_id).await?;

    let announcements = outcome.announcement.map(|announcement| {
        json!({
            "en": announcement.primary,
            "tl": announcement.secondary,
        })
    });

    Ok(Json(json!({
        "success": true,
        "announcements": announcements,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueNumberRequest {
    pub queue_number: Option<String>,
}

pub async fn complete(
    State(state): State<AppState>,
    body: std::result::Result<Json<QueueNumberRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = payload(body)?;
    let queue_number = required(request.queue_number)?;
    state.engine.complete(&queue_number).await?;
    Ok(Json(json!({ "success": true })))
}

/// 删除号票（误登记时使用）
pub async fn delete(
    State(state): State<AppState>,
    body: std::result::Result<Json<QueueNumberRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = payload(body)?;
    let queue_number = required(request.queue_number)?;
    let removed = state.engine.remove(&queue_number).await?;
    info!("Removed {} ({}) via API", removed.number, removed.status);
    Ok(Json(json!({ "success": true })))
}

pub async fn all_entries(State(state): State<AppState>) -> Json<Vec<QueueEntry>> {
    Json(state.engine.entries().await)
}

pub async fn room_queue(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomQueue>> {
    Ok(Json(state.engine.room_queue(&room_id).await?))
}

pub async fn type_queue(
    State(state): State<AppState>,
    Path(room_type): Path<String>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(state.engine.type_queue(&room_type).await?))
}

pub async fn dashboard_status(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, RoomTypeStatus>> {
    Json(state.engine.room_type_status().await)
}

#[derive(Debug, Deserialize)]
pub struct RecentCallsParams {
    pub limit: Option<usize>,
}

pub async fn recent_calls(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<RecentCallsParams>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_CALLS_LIMIT);
    Ok(Json(state.engine.recent_calls(&room_id, limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub data: Option<Vec<ImportRow>>,
}

/// 批量导入处理器
pub async fn import_batch(
    State(state): State<AppState>,
    body: std::result::Result<Json<ImportRequest>, JsonRejection>,
) -> (StatusCode, Json<ImportReport>) {
    match payload(body).ok().and_then(|request| request.data) {
        Some(rows) => (StatusCode::OK, Json(state.engine.register_batch(&rows).await)),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ImportReport {
                success: 0,
                errors: vec!["No data provided".to_string()],
            }),
        ),
    }
}

/// 播放测试语音，不修改账本
pub async fn test_voice(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let announcement = state.engine.test_announcement()?;
    Ok(Json(json!({
        "success": true,
        "announcements": {
            "en": announcement.primary,
            "tl": announcement.secondary,
        },
    })))
}
