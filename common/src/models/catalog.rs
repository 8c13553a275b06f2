//! Query catalog models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// One named, parameterless query as stored in the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    /// Unique label shown to the user.
    pub label: String,
    /// Literal SQL text, executed verbatim.
    pub sql: String,
}

/// Catalog listing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogItem {
    pub label: String,
}

/// Request body for running a catalog query.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RunQueryRequest {
    /// Catalog label of the query to run.
    #[validate(length(min = 1, message = "Query label is required"))]
    pub label: String,
}
