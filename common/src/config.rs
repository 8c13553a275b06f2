//! Service configuration.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the working directory.

use std::path::PathBuf;
use std::time::Duration;

/// Default bind port for the console service.
pub const DEFAULT_PORT: u16 = 5001;

/// Runtime configuration shared by every service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in logs and response metadata.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upper bound for opening and validating a database connection.
    pub connect_timeout_secs: u64,
    /// Upper bound for a single statement.
    pub query_timeout_secs: u64,
    /// Sessions untouched for longer than this are forgotten. `0` disables expiry.
    pub session_idle_timeout_secs: u64,
    /// Location of the query catalog file.
    pub catalog_path: PathBuf,
    /// Emit JSON log lines instead of the human readable format.
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "console-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_secs: 10,
            query_timeout_secs: 30,
            session_idle_timeout_secs: 3600,
            catalog_path: PathBuf::from("catalog/queries.json"),
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration and tags it with the given service name.
    pub fn load_with_service(service: &str) -> Self {
        Self {
            service_name: service.to_string(),
            ..Self::load()
        }
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_u64 = |key: &str, fallback: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(fallback)
        };

        Self {
            service_name: defaults.service_name,
            host: lookup("SERVER_HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.host),
            port: lookup("SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            connect_timeout_secs: parse_u64("CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            query_timeout_secs: parse_u64("QUERY_TIMEOUT_SECS", defaults.query_timeout_secs),
            session_idle_timeout_secs: parse_u64(
                "SESSION_IDLE_TIMEOUT_SECS",
                defaults.session_idle_timeout_secs,
            ),
            catalog_path: lookup("CATALOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Idle expiry for sessions, `None` when disabled.
    pub fn session_idle_timeout(&self) -> Option<Duration> {
        (self.session_idle_timeout_secs > 0)
            .then(|| Duration::from_secs(self.session_idle_timeout_secs))
    }

    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load .env file from the working directory (best-effort, no error if missing).
///
/// Variables already present in the environment win.
pub fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    let Ok(content) = std::fs::read_to_string(env_path) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.catalog_path, PathBuf::from("catalog/queries.json"));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SERVER_PORT", "8088"),
            ("QUERY_TIMEOUT_SECS", "3"),
            ("CATALOG_PATH", "/etc/console/catalog.json"),
            ("LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.port, 8088);
        assert_eq!(config.query_timeout(), Duration::from_secs(3));
        assert_eq!(config.catalog_path, PathBuf::from("/etc/console/catalog.json"));
        assert!(config.json_logs);
    }

    #[test]
    fn test_garbage_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "http")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_zero_idle_timeout_disables_expiry() {
        let config = AppConfig::from_lookup(lookup_from(&[("SESSION_IDLE_TIMEOUT_SECS", "0")]));
        assert!(config.session_idle_timeout().is_none());
    }

    #[test]
    fn test_parse_dotenv_skips_comments() {
        let parsed = parse_dotenv("# comment\nSERVER_PORT=9000\n\nLOG_FORMAT=\"json\"\n");
        assert_eq!(
            parsed,
            vec![
                ("SERVER_PORT".to_string(), "9000".to_string()),
                ("LOG_FORMAT".to_string(), "json".to_string()),
            ]
        );
    }
}
