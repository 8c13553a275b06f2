//! 控制台业务服务模块
//!
//! 每个动作都是独立的工作单元：查会话、按需借出一个连接、执行、归还。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use common::errors::{AppError, AppResult};
use common::models::{
    CatalogItem, ConnectRequest, ConnectResponse, DebugReport, MessageResponse, ProbeOutcome,
    QueryView, SessionStatus, SessionToken, TablesView,
};

use crate::connection_manager::ConnectionManager;
use crate::driver::with_timeout;
use crate::introspector::SchemaIntrospector;
use crate::query_runner::CatalogQueryRunner;
use crate::session_store::SessionStore;
use crate::state::AppState;

pub const CONNECTED_MESSAGE: &str = "Connected to the database.";
pub const DISCONNECTED_MESSAGE: &str = "Disconnected from the database.";
pub const TABLES_MESSAGE: &str = "Tables and data fetched successfully.";
pub const QUERY_MESSAGE: &str = "Query executed successfully.";

/// 调试探针使用的语句
const PROBE_SQL: &str = "SELECT 1 AS test";

/// 控制台服务 Trait
#[async_trait]
pub trait ConsoleServiceTrait: Send + Sync {
    /// 保存凭据，不校验可达性
    async fn connect(
        &self,
        existing: Option<&SessionToken>,
        req: ConnectRequest,
    ) -> AppResult<ConnectResponse>;

    /// 断开会话（幂等）
    async fn disconnect(&self, token: Option<&SessionToken>) -> MessageResponse;

    /// 当前会话状态
    async fn status(&self, token: Option<&SessionToken>) -> SessionStatus;

    /// 列出所有表并预览前几行
    async fn list_tables(&self, token: Option<&SessionToken>) -> AppResult<TablesView>;

    /// 执行目录中的命名查询
    async fn run_catalog_query(
        &self,
        token: Option<&SessionToken>,
        label: &str,
    ) -> AppResult<QueryView>;

    /// 目录中的查询标签
    fn catalog(&self) -> Vec<CatalogItem>;

    /// 连接与简单查询诊断
    async fn probe(&self, token: Option<&SessionToken>) -> DebugReport;
}

/// 控制台服务
pub struct ConsoleService {
    sessions: Arc<SessionStore>,
    connections: Arc<ConnectionManager>,
    runner: CatalogQueryRunner,
    introspector: SchemaIntrospector,
    query_timeout: Duration,
}

impl ConsoleService {
    /// 基于共享状态创建服务实例
    pub fn new(state: &AppState) -> Self {
        let query_timeout = state.config.query_timeout();
        Self {
            sessions: state.sessions.clone(),
            connections: state.connections.clone(),
            runner: CatalogQueryRunner::new(state.catalog.clone(), query_timeout),
            introspector: SchemaIntrospector::new(query_timeout),
            query_timeout,
        }
    }
}

#[async_trait]
impl ConsoleServiceTrait for ConsoleService {
    async fn connect(
        &self,
        existing: Option<&SessionToken>,
        req: ConnectRequest,
    ) -> AppResult<ConnectResponse> {
        let credentials = req.into_credentials()?;
        tracing::info!(
            host = %credentials.host,
            port = credentials.port,
            user = %credentials.user,
            database = %credentials.database,
            "连接凭据已保存"
        );
        let token = self.sessions.connect(existing, credentials).await;
        Ok(ConnectResponse {
            token,
            success_message: CONNECTED_MESSAGE.to_string(),
        })
    }

    async fn disconnect(&self, token: Option<&SessionToken>) -> MessageResponse {
        self.sessions.disconnect(token).await;
        MessageResponse {
            success_message: DISCONNECTED_MESSAGE.to_string(),
        }
    }

    async fn status(&self, token: Option<&SessionToken>) -> SessionStatus {
        match self.sessions.get(token).await {
            Ok(credentials) => SessionStatus::from(&credentials),
            Err(_) => SessionStatus::disconnected(),
        }
    }

    async fn list_tables(&self, token: Option<&SessionToken>) -> AppResult<TablesView> {
        let credentials = self.sessions.get(token).await?;
        let mut lease = self.connections.acquire(&credentials).await?;

        let outcome = match lease.connection() {
            Ok(conn) => self.introspector.list_tables(conn).await,
            Err(err) => Err(err),
        };
        self.connections.release(lease).await;

        Ok(TablesView {
            tables: outcome?,
            success_message: TABLES_MESSAGE.to_string(),
        })
    }

    async fn run_catalog_query(
        &self,
        token: Option<&SessionToken>,
        label: &str,
    ) -> AppResult<QueryView> {
        // 未知标签在检查会话之前拒绝，不会触碰连接
        self.runner.resolve(label)?;
        let credentials = self.sessions.get(token).await?;
        let mut lease = self.connections.acquire(&credentials).await?;

        let outcome = match lease.connection() {
            Ok(conn) => self.runner.run(conn, label).await,
            Err(err) => Err(err),
        };
        self.connections.release(lease).await;

        Ok(QueryView {
            label: label.to_string(),
            result: outcome?,
            success_message: QUERY_MESSAGE.to_string(),
        })
    }

    fn catalog(&self) -> Vec<CatalogItem> {
        self.runner.catalog().items()
    }

    async fn probe(&self, token: Option<&SessionToken>) -> DebugReport {
        let server_time = Utc::now();

        let credentials = match self.sessions.get(token).await {
            Ok(credentials) => credentials,
            Err(err) => {
                return DebugReport {
                    server_time,
                    connected: false,
                    connection_test: ProbeOutcome::failed(err.to_string()),
                    simple_query_test: ProbeOutcome::failed(err.to_string()),
                }
            }
        };

        let mut lease = match self.connections.acquire(&credentials).await {
            Ok(lease) => lease,
            Err(err) => {
                return DebugReport {
                    server_time,
                    connected: true,
                    connection_test: ProbeOutcome::failed(err.to_string()),
                    simple_query_test: ProbeOutcome::failed("skipped: no connection"),
                }
            }
        };
        let connection_test = ProbeOutcome {
            success: true,
            latency_ms: Some(lease.latency().as_millis() as u64),
            ..Default::default()
        };

        let started = Instant::now();
        let outcome = match lease.connection() {
            Ok(conn) => with_timeout(self.query_timeout, "query", conn.fetch(PROBE_SQL))
                .await
                .map_err(|err| AppError::statement(err.to_string())),
            Err(err) => Err(err),
        };
        self.connections.release(lease).await;

        let simple_query_test = match outcome {
            Ok(result) => ProbeOutcome {
                success: true,
                latency_ms: Some(started.elapsed().as_millis() as u64),
                error: None,
                result: Some(result),
            },
            Err(err) => ProbeOutcome::failed(err.to_string()),
        };

        DebugReport {
            server_time,
            connected: true,
            connection_test,
            simple_query_test,
        }
    }
}
