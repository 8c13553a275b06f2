//! Handler模块

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::middleware::{RequestId, SessionHeader, SESSION_COOKIE, SESSION_TOKEN_HEADER};
use common::models::{
    CatalogItem, ConnectRequest, ConnectResponse, DebugReport, MessageResponse, QueryView,
    RunQueryRequest, SessionStatus, SessionToken, TablesView,
};
use common::response::ApiResponse;

use crate::service::{ConsoleService, ConsoleServiceTrait};
use crate::state::AppState;

pub const SERVICE_NAME: &str = "console-service";

/// 包装成功响应，附带请求 ID 与耗时
fn respond<T: Serialize>(data: T, request_id: &RequestId, started: Instant) -> ApiResponse<T> {
    ApiResponse::ok_with_service(data, SERVICE_NAME)
        .with_request_id(request_id.as_str())
        .with_duration(started.elapsed().as_millis() as u64)
}

fn header_value(value: String) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&value).map_err(|e| AppError::Internal(format!("invalid header: {e}")))
}

fn session_cookie(token: &SessionToken) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// 保存数据库凭据并建立会话
#[utoipa::path(
    post,
    path = "/api/session/connect",
    tag = "session",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "凭据已保存", body = ApiResponse<ConnectResponse>),
        (status = 400, description = "参数无效")
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    session: SessionHeader,
    Json(req): Json<ConnectRequest>,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let service = ConsoleService::new(&state);
    let data = service.connect(session.token(), req).await?;

    let headers = [
        (SESSION_TOKEN_HEADER.clone(), header_value(data.token.to_string())?),
        (header::SET_COOKIE, header_value(session_cookie(&data.token))?),
    ];
    Ok((headers, Json(respond(data, &request_id, started))).into_response())
}

/// 断开会话（幂等）
#[utoipa::path(
    post,
    path = "/api/session/disconnect",
    tag = "session",
    responses(
        (status = 200, description = "会话已断开", body = ApiResponse<MessageResponse>)
    )
)]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    session: SessionHeader,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let service = ConsoleService::new(&state);
    let data = service.disconnect(session.token()).await;

    let expired = header_value(format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"))?;
    Ok((
        [(header::SET_COOKIE, expired)],
        Json(respond(data, &request_id, started)),
    )
        .into_response())
}

/// 查询当前会话状态
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "session",
    responses(
        (status = 200, description = "会话状态", body = ApiResponse<SessionStatus>)
    )
)]
pub async fn session_status(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    session: SessionHeader,
) -> Json<ApiResponse<SessionStatus>> {
    let started = Instant::now();
    let service = ConsoleService::new(&state);
    let data = service.status(session.token()).await;
    Json(respond(data, &request_id, started))
}

/// 列出所有表及前 5 行预览
#[utoipa::path(
    get,
    path = "/api/tables",
    tag = "tables",
    responses(
        (status = 200, description = "表预览", body = ApiResponse<TablesView>),
        (status = 401, description = "未连接数据库"),
        (status = 502, description = "数据库连接失败")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    session: SessionHeader,
) -> Result<Json<ApiResponse<TablesView>>, AppError> {
    let started = Instant::now();
    let service = ConsoleService::new(&state);
    let data = service.list_tables(session.token()).await?;
    Ok(Json(respond(data, &request_id, started)))
}

/// 列出查询目录
#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "queries",
    responses(
        (status = 200, description = "查询标签列表", body = ApiResponse<Vec<CatalogItem>>)
    )
)]
pub async fn list_catalog(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<CatalogItem>>> {
    let started = Instant::now();
    let service = ConsoleService::new(&state);
    Json(respond(service.catalog(), &request_id, started))
}

/// 执行目录中的命名查询
#[utoipa::path(
    post,
    path = "/api/query",
    tag = "queries",
    request_body = RunQueryRequest,
    responses(
        (status = 200, description = "查询结果", body = ApiResponse<QueryView>),
        (status = 401, description = "未连接数据库"),
        (status = 404, description = "查询标签不存在"),
        (status = 422, description = "查询执行失败")
    )
)]
pub async fn run_query(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    session: SessionHeader,
    Json(req): Json<RunQueryRequest>,
) -> Result<Json<ApiResponse<QueryView>>, AppError> {
    let started = Instant::now();
    req.validate()?;
    let service = ConsoleService::new(&state);
    let data = service.run_catalog_query(session.token(), &req.label).await?;
    Ok(Json(respond(data, &request_id, started)))
}

/// 连接诊断
#[utoipa::path(
    get,
    path = "/api/debug",
    tag = "health",
    responses(
        (status = 200, description = "诊断报告", body = ApiResponse<DebugReport>)
    )
)]
pub async fn debug_probe(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    session: SessionHeader,
) -> Json<ApiResponse<DebugReport>> {
    let started = Instant::now();
    let service = ConsoleService::new(&state);
    let data = service.probe(session.token()).await;
    Json(respond(data, &request_id, started))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        sessions: state.sessions.len().await,
        open_connections: state.connections.stats().open(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 活跃会话数
    pub sessions: usize,
    /// 尚未归还的连接数
    pub open_connections: usize,
}
