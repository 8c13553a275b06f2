//! MySQL driver backed by sqlx.
//!
//! Each console request gets its own `MySqlConnection`; nothing is pooled.
//! Cells are decoded from the column type the server reports, so any
//! statement's result set can be materialized without knowing its shape.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use common::models::{Credentials, ResultModel, ScalarValue};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo, ValueRef};

use crate::driver::{Connector, DatabaseConnection, DriverError};

/// Opens a dedicated MySQL connection per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

impl MySqlConnector {
    fn options(credentials: &Credentials) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database)
            .disable_statement_logging()
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn open(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn DatabaseConnection>, DriverError> {
        let conn = Self::options(credentials)
            .connect()
            .await
            .map_err(driver_error)?;
        tracing::debug!(
            host = %credentials.host,
            port = credentials.port,
            database = %credentials.database,
            "mysql connection opened"
        );
        Ok(Box::new(MySqlSession { conn }))
    }
}

/// A live MySQL connection.
pub struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl DatabaseConnection for MySqlSession {
    async fn ping(&mut self) -> Result<(), DriverError> {
        self.conn.ping().await.map_err(driver_error)
    }

    async fn list_table_names(&mut self) -> Result<Vec<String>, DriverError> {
        let rows = sqlx::query("SHOW TABLES")
            .fetch_all(&mut self.conn)
            .await
            .map_err(driver_error)?;

        rows.iter()
            .map(|row| {
                // Table names come back as VARBINARY on some server versions.
                row.try_get::<String, _>(0)
                    .ok()
                    .or_else(|| {
                        row.try_get::<Vec<u8>, _>(0)
                            .ok()
                            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    })
                    .ok_or_else(|| DriverError::new("unreadable table name in SHOW TABLES"))
            })
            .collect()
    }

    async fn fetch(&mut self, sql: &str) -> Result<ResultModel, DriverError> {
        let statement = (&mut self.conn).prepare(sql).await.map_err(driver_error)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rows = statement
            .query()
            .fetch_all(&mut self.conn)
            .await
            .map_err(driver_error)?;

        let values = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|index| decode_cell(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        ResultModel::new(columns, values).map_err(|e| DriverError::new(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.close().await.map_err(driver_error)
    }
}

/// Keeps the server's own message for database errors.
fn driver_error(err: sqlx::Error) -> DriverError {
    match &err {
        sqlx::Error::Database(db) => DriverError::new(db.message()),
        _ => DriverError::new(err.to_string()),
    }
}

fn decode_cell(row: &MySqlRow, index: usize) -> Result<ScalarValue, DriverError> {
    let raw = row.try_get_raw(index).map_err(driver_error)?;
    if raw.is_null() {
        return Ok(ScalarValue::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let decoded = match type_name.as_str() {
        "BOOLEAN" => row.try_get_unchecked::<bool, _>(index).map(ScalarValue::Bool),
        name if name.ends_with("UNSIGNED") || name == "BIT" => {
            row.try_get_unchecked::<u64, _>(index).map(ScalarValue::UInt)
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<i64, _>(index).map(ScalarValue::Int)
        }
        "FLOAT" => row
            .try_get_unchecked::<f32, _>(index)
            .map(|v| ScalarValue::Float(f64::from(v))),
        "DOUBLE" => row.try_get_unchecked::<f64, _>(index).map(ScalarValue::Float),
        "DECIMAL" => row
            .try_get_unchecked::<String, _>(index)
            .map(ScalarValue::Decimal),
        "DATE" => row
            .try_get_unchecked::<NaiveDate, _>(index)
            .map(ScalarValue::Date),
        "TIME" => row
            .try_get_unchecked::<NaiveTime, _>(index)
            .map(ScalarValue::Time),
        "DATETIME" | "TIMESTAMP" => row
            .try_get_unchecked::<NaiveDateTime, _>(index)
            .map(ScalarValue::DateTime),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            row.try_get_unchecked::<Vec<u8>, _>(index)
                .map(bytes_to_scalar)
        }
        _ => row.try_get_unchecked::<String, _>(index).map(ScalarValue::Text),
    };

    match decoded {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::debug!(column = index, %type_name, error = %err, "falling back to raw bytes");
            let bytes = row
                .try_get_unchecked::<Vec<u8>, _>(index)
                .map_err(driver_error)?;
            Ok(match temporal_text(&type_name, &bytes) {
                Some(text) => ScalarValue::Text(text),
                None => bytes_to_scalar(bytes),
            })
        }
    }
}

/// Renders temporal values chrono cannot represent, such as zero dates and
/// `TIME` values outside one day, the way the server prints them.
///
/// Expects the binary protocol layout: a length byte followed by the packed
/// fields. Anything else yields `None`.
fn temporal_text(type_name: &str, bytes: &[u8]) -> Option<String> {
    let (&len, body) = bytes.split_first()?;
    if usize::from(len) != body.len() {
        return None;
    }

    match type_name {
        "DATE" | "DATETIME" | "TIMESTAMP" => {
            let (year, month, day) = match body.len() {
                0 => (0, 0, 0),
                4 | 7 | 11 => (u16::from_le_bytes([body[0], body[1]]), body[2], body[3]),
                _ => return None,
            };
            let date = format!("{year:04}-{month:02}-{day:02}");
            if type_name == "DATE" {
                return Some(date);
            }
            let (hour, minute, second) = match body.len() {
                7 | 11 => (body[4], body[5], body[6]),
                _ => (0, 0, 0),
            };
            let mut text = format!("{date} {hour:02}:{minute:02}:{second:02}");
            if body.len() == 11 {
                let micros = u32::from_le_bytes([body[7], body[8], body[9], body[10]]);
                text.push_str(&format!(".{micros:06}"));
            }
            Some(text)
        }
        "TIME" => {
            let (negative, hours, minute, second) = match body.len() {
                0 => (false, 0, 0, 0),
                8 | 12 => {
                    let days = u32::from_le_bytes([body[1], body[2], body[3], body[4]]);
                    (body[0] == 1, days * 24 + u32::from(body[5]), body[6], body[7])
                }
                _ => return None,
            };
            let sign = if negative { "-" } else { "" };
            let mut text = format!("{sign}{hours:02}:{minute:02}:{second:02}");
            if body.len() == 12 {
                let micros = u32::from_le_bytes([body[8], body[9], body[10], body[11]]);
                text.push_str(&format!(".{micros:06}"));
            }
            Some(text)
        }
        _ => None,
    }
}

/// Text when the bytes are valid UTF-8, opaque binary otherwise.
fn bytes_to_scalar(bytes: Vec<u8>) -> ScalarValue {
    match String::from_utf8(bytes) {
        Ok(text) => ScalarValue::Text(text),
        Err(err) => ScalarValue::Binary(err.into_bytes()),
    }
}
