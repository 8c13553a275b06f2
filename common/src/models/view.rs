//! Payloads handed to the rendering client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::result::{ResultModel, TablePreview};
use super::session::SessionToken;

/// Result of the connect action.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectResponse {
    /// Token to send back with every later action.
    pub token: SessionToken,
    pub success_message: String,
}

/// Acknowledgement carrying only a message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success_message: String,
}

/// Table browser payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct TablesView {
    pub tables: Vec<TablePreview>,
    pub success_message: String,
}

/// Catalog query payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryView {
    pub label: String,
    pub result: ResultModel,
    pub success_message: String,
}

/// Outcome of one probe step.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ProbeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultModel>,
}

impl ProbeOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Connection diagnostics for the current session.
#[derive(Debug, Serialize, ToSchema)]
pub struct DebugReport {
    pub server_time: DateTime<Utc>,
    pub connected: bool,
    pub connection_test: ProbeOutcome,
    pub simple_query_test: ProbeOutcome,
}
