//! Query catalog.
//!
//! The catalog maps human readable labels to literal, parameterless SQL. It is
//! loaded once at startup from a JSON file and never changes afterwards.

use std::collections::HashMap;
use std::path::Path;

use common::errors::{AppError, AppResult};
use common::models::{CatalogEntry, CatalogItem};

/// Immutable label → SQL mapping, keeping file order.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl QueryCatalog {
    /// Reads and validates a catalog file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parses a JSON array of `{label, sql}` objects.
    pub fn from_json(content: &str) -> AppResult<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(content)
            .map_err(|e| AppError::Catalog(format!("invalid catalog JSON: {e}")))?;
        Self::from_entries(entries)
    }

    /// Builds a catalog, rejecting blank or duplicate labels and blank SQL.
    ///
    /// Trailing statement terminators are stripped from each query.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> AppResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        let mut normalized = Vec::with_capacity(entries.len());

        for entry in entries {
            let label = entry.label.trim().to_string();
            if label.is_empty() {
                return Err(AppError::Catalog("catalog entry with empty label".into()));
            }
            let sql = entry.sql.trim().trim_end_matches(';').trim_end().to_string();
            if sql.is_empty() {
                return Err(AppError::Catalog(format!("query '{label}' has no SQL")));
            }
            if index.insert(label.clone(), normalized.len()).is_some() {
                return Err(AppError::Catalog(format!("duplicate query label '{label}'")));
            }
            normalized.push(CatalogEntry { label, sql });
        }

        Ok(Self {
            entries: normalized,
            index,
        })
    }

    pub fn get(&self, label: &str) -> Option<&CatalogEntry> {
        self.index.get(label).map(|&i| &self.entries[i])
    }

    /// Labels in file order.
    pub fn items(&self) -> Vec<CatalogItem> {
        self.entries
            .iter()
            .map(|entry| CatalogItem {
                label: entry.label.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
