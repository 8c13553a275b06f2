//! Error taxonomy shared by all services.
//!
//! Every action returns either its result or one [`AppError`]; the error is
//! turned into an [`ApiResponse`] envelope at the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// The session holds no credentials.
    #[error("Database connection not initialized.")]
    NotConnected,

    /// Opening or validating the database connection failed.
    #[error("Error connecting to the database: {0}")]
    Connection(String),

    /// A statement failed to execute.
    #[error("{}", query_message(.label, .cause))]
    Query {
        label: Option<String>,
        cause: String,
    },

    /// The requested label is not part of the catalog.
    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    /// Malformed action parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Field validation failures from request DTOs.
    #[error("Invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The query catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn query_message(label: &Option<String>, cause: &str) -> String {
    match label {
        Some(label) => format!("Error executing query '{label}': {cause}"),
        None => format!("Error executing query: {cause}"),
    }
}

impl AppError {
    /// Builds a query error attributed to a catalog label.
    pub fn query(label: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Query {
            label: Some(label.into()),
            cause: cause.into(),
        }
    }

    /// Builds a query error for an unlabelled statement.
    pub fn statement(cause: impl Into<String>) -> Self {
        Self::Query {
            label: None,
            cause: cause.into(),
        }
    }

    /// Machine readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::Query { .. } => "QUERY_ERROR",
            AppError::UnknownQuery(_) => "UNKNOWN_QUERY",
            AppError::InvalidInput(_) | AppError::Validation(_) => "INVALID_INPUT",
            AppError::Catalog(_) => "CATALOG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for the error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotConnected => StatusCode::UNAUTHORIZED,
            AppError::Connection(_) => StatusCode::BAD_GATEWAY,
            AppError::Query { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnknownQuery(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Catalog(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured details attached to the error envelope, if any.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Query {
                label: Some(label), ..
            } => Some(serde_json::json!({ "label": label })),
            AppError::UnknownQuery(label) => Some(serde_json::json!({ "label": label })),
            AppError::Validation(errors) => serde_json::to_value(errors.field_errors()).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = match self.details() {
            Some(details) => ApiResponse::err_with_details(self.code(), self.to_string(), details),
            None => ApiResponse::err(self.code(), self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_mentions_label() {
        let err = AppError::query("Best seller's type", "Table 'Sale' doesn't exist");
        assert_eq!(
            err.to_string(),
            "Error executing query 'Best seller's type': Table 'Sale' doesn't exist"
        );
        assert_eq!(err.code(), "QUERY_ERROR");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotConnected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Connection("refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::UnknownQuery("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidInput("port".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_into_response_uses_envelope() {
        use http_body_util::BodyExt;

        let response = AppError::UnknownQuery("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNKNOWN_QUERY");
        assert_eq!(body["error"]["details"]["label"], "nope");
    }
}
