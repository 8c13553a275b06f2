//! Catalog query runner.

use std::sync::Arc;
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::{CatalogEntry, ResultModel};
use tokio::time::Instant;

use crate::catalog::QueryCatalog;
use crate::driver::{with_timeout, DatabaseConnection};

/// Runs catalog entries verbatim and records an audit line for each.
#[derive(Debug, Clone)]
pub struct CatalogQueryRunner {
    catalog: Arc<QueryCatalog>,
    query_timeout: Duration,
}

impl CatalogQueryRunner {
    pub fn new(catalog: Arc<QueryCatalog>, query_timeout: Duration) -> Self {
        Self {
            catalog,
            query_timeout,
        }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    /// Looks a label up without touching any connection.
    pub fn resolve(&self, label: &str) -> AppResult<&CatalogEntry> {
        self.catalog
            .get(label)
            .ok_or_else(|| AppError::UnknownQuery(label.to_string()))
    }

    /// Executes `entry` and returns its full result set.
    ///
    /// A failing statement leaves the connection usable; only the error is
    /// returned.
    pub async fn execute(
        &self,
        conn: &mut dyn DatabaseConnection,
        entry: &CatalogEntry,
    ) -> AppResult<ResultModel> {
        let started = Instant::now();
        let outcome = with_timeout(self.query_timeout, "query", conn.fetch(&entry.sql)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                tracing::info!(
                    target: "audit",
                    label = %entry.label,
                    sql = %entry.sql,
                    rows = result.row_count(),
                    columns = result.column_count(),
                    elapsed_ms,
                    "catalog query executed"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(
                    target: "audit",
                    label = %entry.label,
                    sql = %entry.sql,
                    error = %err,
                    elapsed_ms,
                    "catalog query failed"
                );
                Err(AppError::query(&entry.label, err.to_string()))
            }
        }
    }

    /// Resolves and executes `label` on `conn`.
    pub async fn run(
        &self,
        conn: &mut dyn DatabaseConnection,
        label: &str,
    ) -> AppResult<ResultModel> {
        let entry = self.resolve(label)?;
        self.execute(conn, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{people, FakeConnector, FakeScript};

    const NO_SUPERVISEES: &str = "SELECT e.PersonID FROM Employee e";

    fn runner() -> CatalogQueryRunner {
        let catalog = QueryCatalog::from_json(&format!(
            r#"[
                {{"label": "Employees with no supervisees", "sql": "{NO_SUPERVISEES}"}},
                {{"label": "Best seller's type", "sql": "SELECT Type FROM Sale"}}
            ]"#
        ))
        .unwrap();
        CatalogQueryRunner::new(Arc::new(catalog), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_runs_sql_verbatim_without_row_cap() {
        let connector = FakeConnector::new(FakeScript::default().response(NO_SUPERVISEES, people(40)));
        let mut conn = connector.connection();

        let result = runner()
            .run(&mut conn, "Employees with no supervisees")
            .await
            .unwrap();
        assert_eq!(result.row_count(), 40);
    }

    #[tokio::test]
    async fn test_unknown_label_never_touches_connection() {
        let connector = FakeConnector::new(FakeScript::default());
        let mut conn = connector.connection();

        let err = runner().run(&mut conn, "Drop everything").await.unwrap_err();
        assert!(matches!(err, AppError::UnknownQuery(ref label) if label == "Drop everything"));
        assert_eq!(connector.fetches(), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_carries_label_and_cause() {
        let script = FakeScript::default()
            .failing("SELECT Type FROM Sale", "Table 'xyzcompany.Sale' doesn't exist")
            .response(NO_SUPERVISEES, people(1));
        let connector = FakeConnector::new(script);
        let mut conn = connector.connection();
        let runner = runner();

        let err = runner.run(&mut conn, "Best seller's type").await.unwrap_err();
        match err {
            AppError::Query { label, cause } => {
                assert_eq!(label.as_deref(), Some("Best seller's type"));
                assert!(cause.contains("doesn't exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The same connection keeps working.
        let result = runner
            .run(&mut conn, "Employees with no supervisees")
            .await
            .unwrap();
        assert_eq!(result.row_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_query_times_out() {
        let script = FakeScript::default()
            .response(NO_SUPERVISEES, people(1))
            .fetch_delay(Duration::from_secs(600));
        let connector = FakeConnector::new(script);
        let mut conn = connector.connection();

        let err = runner()
            .run(&mut conn, "Employees with no supervisees")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "QUERY_ERROR");
        assert!(err.to_string().contains("timed out after 5s"));
    }
}
