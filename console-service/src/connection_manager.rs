//! Connection manager.
//!
//! Opens one database connection per request and hands it out as a
//! [`Lease`]. Nothing is pooled: a lease is closed when it is released, and
//! a lease that is dropped without being released is still closed and
//! counted, so opened and released always converge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::Credentials;
use tokio::time::Instant;

use crate::driver::{with_timeout, Connector, DatabaseConnection};

/// Lifetime counters for leases.
#[derive(Debug, Default)]
pub struct LeaseStats {
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl LeaseStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Leases currently outstanding.
    pub fn open(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }
}

/// An open connection owned by exactly one request.
pub struct Lease {
    conn: Option<Box<dyn DatabaseConnection>>,
    stats: Arc<LeaseStats>,
    latency: Duration,
}

impl Lease {
    /// The leased connection.
    pub fn connection(&mut self) -> AppResult<&mut (dyn DatabaseConnection + 'static)> {
        match self.conn.as_deref_mut() {
            Some(conn) => Ok(conn),
            None => Err(AppError::Internal("connection lease already released".into())),
        }
    }

    /// Time spent opening and validating the connection.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Hands the connection out for closing, counting the release once.
    fn take(&mut self) -> Option<Box<dyn DatabaseConnection>> {
        let conn = self.conn.take()?;
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        Some(conn)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.take().is_some() {
            tracing::warn!("connection lease dropped without release");
        }
    }
}

/// Opens and closes per-request connections.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    stats: Arc<LeaseStats>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
            stats: Arc::new(LeaseStats::default()),
        }
    }

    /// Opens a connection for `credentials` and checks it answers.
    ///
    /// A connection that opens but fails the check is released before the
    /// error is returned.
    pub async fn acquire(&self, credentials: &Credentials) -> AppResult<Lease> {
        let started = Instant::now();
        let conn = with_timeout(
            self.connect_timeout,
            "connect",
            self.connector.open(credentials),
        )
        .await
        .map_err(|err| {
            tracing::debug!(host = %credentials.host, error = %err, "connection refused");
            AppError::Connection(err.to_string())
        })?;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);

        let mut lease = Lease {
            conn: Some(conn),
            stats: self.stats.clone(),
            latency: Duration::ZERO,
        };

        let checked = match lease.connection() {
            Ok(conn) => with_timeout(self.connect_timeout, "ping", conn.ping())
                .await
                .map_err(|err| AppError::Connection(err.to_string())),
            Err(err) => Err(err),
        };
        if let Err(err) = checked {
            self.release(lease).await;
            return Err(err);
        }

        lease.latency = started.elapsed();
        tracing::debug!(
            host = %credentials.host,
            database = %credentials.database,
            latency_ms = lease.latency.as_millis() as u64,
            "connection acquired"
        );
        Ok(lease)
    }

    /// Closes the leased connection. Close failures are logged, not returned.
    pub async fn release(&self, mut lease: Lease) {
        let Some(conn) = lease.take() else {
            return;
        };
        if let Err(err) = conn.close().await {
            tracing::warn!(error = %err, "closing connection failed");
        } else {
            tracing::debug!("connection released");
        }
    }

    pub fn stats(&self) -> &LeaseStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{credentials, people, FakeConnector, FakeScript};

    fn manager(connector: &FakeConnector) -> ConnectionManager {
        ConnectionManager::new(Arc::new(connector.clone()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let connector = FakeConnector::new(FakeScript::default());
        let manager = manager(&connector);

        let lease = manager.acquire(&credentials()).await.unwrap();
        assert_eq!(manager.stats().open(), 1);
        assert_eq!(connector.pings(), 1);

        manager.release(lease).await;
        assert_eq!(manager.stats().opened(), 1);
        assert_eq!(manager.stats().released(), 1);
        assert_eq!(connector.closed(), 1);
        assert_eq!(connector.last_credentials(), Some(credentials()));
    }

    #[tokio::test]
    async fn test_open_failure_is_a_connection_error() {
        let connector = FakeConnector::new(FakeScript::default());
        connector.fail_next_opens(1);
        let manager = manager(&connector);

        let err = manager.acquire(&credentials()).await.err().unwrap();
        assert!(matches!(err, AppError::Connection(ref cause) if cause.contains("Can't connect")));
        assert_eq!(manager.stats().opened(), 0);
        assert_eq!(manager.stats().released(), 0);
    }

    #[tokio::test]
    async fn test_failed_ping_releases_connection() {
        let connector = FakeConnector::new(FakeScript::default());
        connector.fail_next_pings(1);
        let manager = manager(&connector);

        let err = manager.acquire(&credentials()).await.err().unwrap();
        assert_eq!(err.code(), "CONNECTION_ERROR");
        assert_eq!(manager.stats().opened(), 1);
        assert_eq!(manager.stats().released(), 1);
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_open_times_out() {
        let connector =
            FakeConnector::new(FakeScript::default().open_delay(Duration::from_secs(60)));
        let manager = ConnectionManager::new(Arc::new(connector), Duration::from_secs(2));

        let err = manager.acquire(&credentials()).await.err().unwrap();
        assert_eq!(
            err.to_string(),
            "Error connecting to the database: connect timed out after 2s"
        );
    }

    #[tokio::test]
    async fn test_dropped_lease_is_counted() {
        let connector = FakeConnector::new(FakeScript::default());
        let manager = manager(&connector);

        let lease = manager.acquire(&credentials()).await.unwrap();
        drop(lease);
        assert_eq!(manager.stats().open(), 0);
        assert_eq!(manager.stats().released(), 1);
    }

    #[tokio::test]
    async fn test_no_leaks_across_thousand_operations() {
        let script = FakeScript::default()
            .response("SELECT * FROM Person", people(3))
            .failing("SELECT * FROM Sale", "Table 'xyzcompany.Sale' doesn't exist");
        let connector = FakeConnector::new(script);
        let manager = manager(&connector);

        let mut failures = 0;
        for i in 0..1000 {
            match i % 7 {
                0 => connector.fail_next_opens(1),
                3 => connector.fail_next_pings(1),
                _ => {}
            }
            let mut lease = match manager.acquire(&credentials()).await {
                Ok(lease) => lease,
                Err(_) => {
                    failures += 1;
                    continue;
                }
            };
            let sql = if i % 2 == 0 {
                "SELECT * FROM Person"
            } else {
                "SELECT * FROM Sale"
            };
            let outcome = lease.connection().unwrap().fetch(sql).await;
            if outcome.is_err() {
                failures += 1;
            }
            manager.release(lease).await;
        }

        let stats = manager.stats();
        assert!(failures > 0);
        assert_eq!(stats.opened(), stats.released());
        assert_eq!(stats.open(), 0);
        assert_eq!(connector.opened(), stats.opened());
        assert_eq!(connector.closed(), stats.released());
    }
}
