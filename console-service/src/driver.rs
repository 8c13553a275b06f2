//! Database driver seam.
//!
//! The console only needs four things from a live connection: a liveness
//! check, the list of tables, a way to materialize any statement into a
//! [`ResultModel`], and an explicit close. Keeping that behind a trait lets
//! the connection lifecycle be exercised without a server.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use common::models::{Credentials, ResultModel};
use thiserror::Error;

/// Failure reported by the underlying driver, carrying the engine message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One open database connection, owned by a single request.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Round-trips to the server.
    async fn ping(&mut self) -> Result<(), DriverError>;

    /// Names of all tables in the connected database, in engine order.
    async fn list_table_names(&mut self) -> Result<Vec<String>, DriverError>;

    /// Executes `sql` verbatim and materializes the full result set.
    async fn fetch(&mut self, sql: &str) -> Result<ResultModel, DriverError>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Opens connections from stored credentials.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn DatabaseConnection>, DriverError>;
}

/// Bounds a driver call, turning an elapsed deadline into a [`DriverError`].
pub async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Err(DriverError::new(format!(
            "{what} timed out after {}s",
            limit.as_secs()
        ))),
    }
}
