//! 控制台服务路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// 创建控制台路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/session/connect", post(handlers::connect))
        .route("/api/session/disconnect", post(handlers::disconnect))
        .route("/api/session", get(handlers::session_status))
        .route("/api/tables", get(handlers::list_tables))
        .route("/api/catalog", get(handlers::list_catalog))
        .route("/api/query", post(handlers::run_query))
        .route("/api/debug", get(handlers::debug_probe))
        .route("/api/health", get(handlers::health_check))
}
