//! Generic tabular results.
//!
//! A [`ResultModel`] can hold the outcome of any statement: ordered column
//! names plus rows of untyped scalars. It is built once per operation and
//! never mutated afterwards.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Maximum number of rows fetched for a table preview.
pub const PREVIEW_ROW_LIMIT: usize = 5;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact numerics, kept in their textual form.
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// Opaque bytes that are not valid text.
    Binary(Vec<u8>),
}

impl ScalarValue {
    /// Returns the value as an integer when it holds one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(v) => Some(*v),
            ScalarValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ScalarValue::Null, Into::into)
    }
}

// Cells serialize as plain JSON scalars. Dates and times use ISO-8601,
// binary data a `0x`-prefixed hex string.
impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScalarValue::Null => serializer.serialize_none(),
            ScalarValue::Bool(v) => serializer.serialize_bool(*v),
            ScalarValue::Int(v) => serializer.serialize_i64(*v),
            ScalarValue::UInt(v) => serializer.serialize_u64(*v),
            ScalarValue::Float(v) => serializer.serialize_f64(*v),
            ScalarValue::Decimal(v) | ScalarValue::Text(v) => serializer.serialize_str(v),
            ScalarValue::Date(v) => serializer.collect_str(&v.format("%Y-%m-%d")),
            ScalarValue::Time(v) => serializer.collect_str(&v.format("%H:%M:%S%.f")),
            ScalarValue::DateTime(v) => serializer.collect_str(&v.format("%Y-%m-%d %H:%M:%S%.f")),
            ScalarValue::Binary(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                serializer.serialize_str(&format!("0x{hex}"))
            }
        }
    }
}

/// Columns and rows of one statement's output.
///
/// Every row holds exactly one value per column, in column order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, ToSchema)]
pub struct ResultModel {
    /// Column names in result-set order.
    columns: Vec<String>,
    /// Row values.
    #[schema(value_type = Vec<Vec<Object>>)]
    rows: Vec<Vec<ScalarValue>>,
}

impl ResultModel {
    /// Builds a result, rejecting rows whose width differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<ScalarValue>>) -> AppResult<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(AppError::Internal(format!(
                "row {index} has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<ScalarValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&ScalarValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<ScalarValue>>) {
        (self.columns, self.rows)
    }
}

/// A capped sample of one table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, ToSchema)]
pub struct TablePreview {
    /// Source table.
    pub table_name: String,
    /// Column names as reported for the preview result set.
    pub columns: Vec<String>,
    /// At most [`PREVIEW_ROW_LIMIT`] rows.
    #[schema(value_type = Vec<Vec<Object>>)]
    pub rows: Vec<Vec<ScalarValue>>,
    /// Set when this table could not be read; the other previews are unaffected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TablePreview {
    /// Wraps a fetched result, truncating it to the preview cap.
    pub fn from_result(table_name: impl Into<String>, result: ResultModel) -> Self {
        let (columns, mut rows) = result.into_parts();
        rows.truncate(PREVIEW_ROW_LIMIT);
        Self {
            table_name: table_name.into(),
            columns,
            rows,
            error: None,
        }
    }

    /// A preview for a table that failed to load.
    pub fn failed(table_name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            error: Some(cause.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
