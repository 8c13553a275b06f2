//! Schema introspector: table enumeration plus capped previews.

use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::{TablePreview, PREVIEW_ROW_LIMIT};
use common::utils::quote_identifier;

use crate::driver::{with_timeout, DatabaseConnection};

#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    query_timeout: Duration,
}

impl SchemaIntrospector {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    /// Statement used to sample one table in its natural order.
    pub fn preview_sql(table: &str) -> String {
        format!(
            "SELECT * FROM {} LIMIT {}",
            quote_identifier(table),
            PREVIEW_ROW_LIMIT
        )
    }

    /// Previews every table, in the order the engine lists them.
    ///
    /// Only a failed enumeration fails the call. A table that cannot be read
    /// gets a preview carrying the error and the remaining tables are still
    /// sampled.
    pub async fn list_tables(
        &self,
        conn: &mut dyn DatabaseConnection,
    ) -> AppResult<Vec<TablePreview>> {
        let names = with_timeout(self.query_timeout, "table listing", conn.list_table_names())
            .await
            .map_err(|err| AppError::Connection(err.to_string()))?;

        let mut previews = Vec::with_capacity(names.len());
        for name in names {
            let sql = Self::preview_sql(&name);
            let preview = match with_timeout(self.query_timeout, "preview", conn.fetch(&sql)).await {
                Ok(result) => TablePreview::from_result(name, result),
                Err(err) => {
                    tracing::warn!(table = %name, error = %err, "table preview failed");
                    TablePreview::failed(name, err.to_string())
                }
            };
            previews.push(preview);
        }

        tracing::debug!(tables = previews.len(), "tables previewed");
        Ok(previews)
    }
}
