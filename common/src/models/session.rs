//! Session credential models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::utils::IdGenerator;

/// Opaque, server-assigned session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Issues a fresh token.
    pub fn generate() -> Self {
        Self(IdGenerator::session_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credentials for one MySQL database.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Request body for the connect action.
///
/// All fields arrive as strings, the way the console form posts them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConnectRequest {
    /// Database host.
    #[validate(length(min = 1, message = "Host is required"))]
    pub host: String,
    /// Database port, must parse as a positive integer.
    #[validate(length(min = 1, message = "Port is required"))]
    pub port: String,
    /// Database user.
    #[validate(length(min = 1, message = "User is required"))]
    pub user: String,
    /// Database password.
    #[validate(length(min = 1, message = "Password is required"))]
    #[serde(skip_serializing)]
    pub password: String,
    /// Database name.
    #[validate(length(min = 1, message = "Database is required"))]
    pub database: String,
}

impl ConnectRequest {
    /// Validates the form and converts it into credentials.
    ///
    /// Host, port, user and database are trimmed before they are checked, so
    /// a field holding only whitespace counts as missing. The password is
    /// kept verbatim.
    pub fn into_credentials(self) -> AppResult<Credentials> {
        self.validate()?;
        let host = required("host", &self.host)?;
        let port = parse_port(&self.port)?;
        let user = required("user", &self.user)?;
        let database = required("database", &self.database)?;
        Ok(Credentials {
            host,
            port,
            user,
            password: self.password,
            database,
        })
    }
}

fn required(field: &str, raw: &str) -> AppResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(value.to_string())
}

fn parse_port(raw: &str) -> AppResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(AppError::InvalidInput(format!(
            "port must be a positive integer, got '{raw}'"
        ))),
        Ok(port) => Ok(port),
    }
}

/// What a client may learn about its session. Never includes the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SessionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl SessionStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            host: None,
            port: None,
            user: None,
            database: None,
        }
    }
}

impl From<&Credentials> for SessionStatus {
    fn from(credentials: &Credentials) -> Self {
        Self {
            connected: true,
            host: Some(credentials.host.clone()),
            port: Some(credentials.port),
            user: Some(credentials.user.clone()),
            database: Some(credentials.database.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(port: &str) -> ConnectRequest {
        ConnectRequest {
            host: "db.internal".into(),
            port: port.into(),
            user: "root".into(),
            password: "secret".into(),
            database: "xyzcompany".into(),
        }
    }

    #[test]
    fn test_valid_request_converts() {
        let credentials = request("3306").into_credentials().unwrap();
        assert_eq!(credentials.port, 3306);
        assert_eq!(credentials.database, "xyzcompany");
    }

    #[test]
    fn test_port_must_be_positive_integer() {
        for bad in ["0", "-1", "abc", "70000", ""] {
            let err = request(bad).into_credentials().unwrap_err();
            assert_eq!(err.code(), "INVALID_INPUT", "port {bad:?}");
        }
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        let mut req = request("3306");
        req.password.clear();
        assert!(matches!(
            req.into_credentials(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let blank_host = ConnectRequest {
            host: "   ".into(),
            ..request("3306")
        };
        let blank_user = ConnectRequest {
            user: "\t".into(),
            ..request("3306")
        };
        let blank_database = ConnectRequest {
            database: "   ".into(),
            ..request("3306")
        };
        for req in [blank_host, blank_user, blank_database] {
            let err = req.into_credentials().unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(ref msg) if msg.contains("blank")));
        }
    }

    #[test]
    fn test_fields_are_trimmed() {
        let credentials = ConnectRequest {
            host: " db.internal ".into(),
            user: " root\n".into(),
            database: "xyzcompany ".into(),
            ..request(" 3306 ")
        }
        .into_credentials()
        .unwrap();
        assert_eq!(credentials.host, "db.internal");
        assert_eq!(credentials.user, "root");
        assert_eq!(credentials.database, "xyzcompany");
        assert_eq!(credentials.port, 3306);
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = request("3306").into_credentials().unwrap();
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_status_never_exposes_password() {
        let credentials = request("3306").into_credentials().unwrap();
        let json = serde_json::to_value(SessionStatus::from(&credentials)).unwrap();
        assert_eq!(json["connected"], true);
        assert!(json.get("password").is_none());
    }
}
