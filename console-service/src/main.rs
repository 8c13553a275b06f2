//! 数据库查询控制台服务
//!
//! 提供关系型数据库控制台功能，包括：
//! - 会话凭据管理（连接 / 断开）
//! - 表结构浏览与前 5 行预览
//! - 预定义查询目录的执行

mod catalog;
mod connection_manager;
mod driver;
mod handlers;
mod introspector;
mod mysql;
mod query_runner;
mod routes;
mod service;
mod session_store;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{load_dotenv, AppConfig};
use common::middleware::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use crate::catalog::QueryCatalog;
use crate::handlers::SERVICE_NAME;
use crate::mysql::MySqlConnector;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "查询控制台 API",
        version = "0.1.0",
        description = "关系型数据库查询控制台服务"
    ),
    paths(
        handlers::connect,
        handlers::disconnect,
        handlers::session_status,
        handlers::list_tables,
        handlers::list_catalog,
        handlers::run_query,
        handlers::debug_probe,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectRequest,
        common::models::ConnectResponse,
        common::models::MessageResponse,
        common::models::SessionStatus,
        common::models::SessionToken,
        common::models::TablesView,
        common::models::TablePreview,
        common::models::ResultModel,
        common::models::CatalogItem,
        common::models::RunQueryRequest,
        common::models::QueryView,
        common::models::DebugReport,
        common::models::ProbeOutcome,
        handlers::HealthResponse,
    )),
    tags(
        (name = "session", description = "会话端点"),
        (name = "tables", description = "表浏览端点"),
        (name = "queries", description = "预定义查询端点"),
        (name = "health", description = "健康检查与诊断端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 初始化日志追踪
    init_tracing(config.json_logs);

    // 加载查询目录，失败则直接退出
    let catalog = QueryCatalog::load(&config.catalog_path)
        .with_context(|| format!("加载查询目录失败: {}", config.catalog_path.display()))?;
    info!(queries = catalog.len(), path = %config.catalog_path.display(), "查询目录已加载");
    if catalog.is_empty() {
        tracing::warn!("查询目录为空，只能浏览表");
    }

    // 创建应用状态
    let state = AppState::new(config.clone(), catalog, Arc::new(MySqlConnector));

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_address();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务运行失败")?;

    info!(service = SERVICE_NAME, "服务已停止");
    Ok(())
}

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听退出信号");
    }
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
