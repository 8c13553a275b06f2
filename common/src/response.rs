//! API response envelope.
//!
//! Every console action answers with the same shape: either `data` or an
//! `error`, plus request metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard API response wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the action succeeded.
    pub success: bool,

    /// Action payload (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error details (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// Response metadata.
    pub meta: ResponseMeta,
}

/// API error details, enough to render a one-line diagnostic.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Error code for client handling (e.g. "NOT_CONNECTED", "QUERY_ERROR").
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Additional error details such as the offending catalog label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Request ID for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Response timestamp.
    pub timestamp: DateTime<Utc>,

    /// Action processing time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Service name that handled the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            request_id: None,
            timestamp: Utc::now(),
            duration_ms: None,
            service: None,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    /// Creates a successful response tagged with the service name.
    pub fn ok_with_service(data: T, service: impl Into<String>) -> Self {
        Self::ok(data).with_service(service)
    }

    /// Sets the request ID on the response.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.meta.request_id = Some(request_id.into());
        self
    }

    /// Sets the duration on the response.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.meta.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the service name on the response.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.meta.service = Some(service.into());
        self
    }
}

impl ApiResponse<()> {
    /// Creates an error response.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
                details: None,
            }),
            meta: ResponseMeta::default(),
        }
    }

    /// Creates an error response with details.
    pub fn err_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let mut response = Self::err(code, message);
        if let Some(error) = response.error.as_mut() {
            error.details = Some(details);
        }
        response
    }
}
