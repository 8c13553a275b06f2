//! In-memory driver used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::models::{Credentials, ResultModel, ScalarValue};

use crate::driver::{Connector, DatabaseConnection, DriverError};
use crate::introspector::SchemaIntrospector;

/// Scripted database contents.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    tables: Vec<String>,
    responses: HashMap<String, Result<ResultModel, String>>,
    listing_error: Option<String>,
    open_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
}

impl FakeScript {
    pub fn table(mut self, name: &str, result: ResultModel) -> Self {
        self.tables.push(name.to_string());
        self.responses
            .insert(SchemaIntrospector::preview_sql(name), Ok(result));
        self
    }

    pub fn broken_table(mut self, name: &str, cause: &str) -> Self {
        self.tables.push(name.to_string());
        self.responses
            .insert(SchemaIntrospector::preview_sql(name), Err(cause.to_string()));
        self
    }

    pub fn response(mut self, sql: &str, result: ResultModel) -> Self {
        self.responses.insert(sql.to_string(), Ok(result));
        self
    }

    pub fn failing(mut self, sql: &str, cause: &str) -> Self {
        self.responses.insert(sql.to_string(), Err(cause.to_string()));
        self
    }

    pub fn listing_error(mut self, cause: &str) -> Self {
        self.listing_error = Some(cause.to_string());
        self
    }

    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    script: FakeScript,
    opened: AtomicUsize,
    closed: AtomicUsize,
    pings: AtomicUsize,
    fetches: AtomicUsize,
    fail_open: AtomicUsize,
    fail_ping: AtomicUsize,
    last_credentials: Mutex<Option<Credentials>>,
}

/// Connector whose connections answer from a [`FakeScript`].
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn new(script: FakeScript) -> Self {
        Self {
            state: Arc::new(FakeState {
                script,
                ..Default::default()
            }),
        }
    }

    /// Makes the next `n` opens fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.state.fail_open.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` pings fail.
    pub fn fail_next_pings(&self, n: usize) {
        self.state.fail_ping.store(n, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.state.last_credentials.lock().unwrap().clone()
    }

    /// A standalone connection, bypassing the open counters.
    pub fn connection(&self) -> FakeConnection {
        FakeConnection {
            state: self.state.clone(),
        }
    }
}

/// Consumes one unit of an injected failure budget.
fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn DatabaseConnection>, DriverError> {
        if let Some(delay) = self.state.script.open_delay {
            tokio::time::sleep(delay).await;
        }
        *self.state.last_credentials.lock().unwrap() = Some(credentials.clone());
        if take_failure(&self.state.fail_open) {
            return Err(DriverError::new(format!(
                "Can't connect to MySQL server on '{}'",
                credentials.host
            )));
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.connection()))
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    state: Arc<FakeState>,
}

#[async_trait]
impl DatabaseConnection for FakeConnection {
    async fn ping(&mut self) -> Result<(), DriverError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.state.fail_ping) {
            return Err(DriverError::new("Lost connection to MySQL server"));
        }
        Ok(())
    }

    async fn list_table_names(&mut self) -> Result<Vec<String>, DriverError> {
        match &self.state.script.listing_error {
            Some(cause) => Err(DriverError::new(cause.clone())),
            None => Ok(self.state.script.tables.clone()),
        }
    }

    async fn fetch(&mut self, sql: &str) -> Result<ResultModel, DriverError> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.state.script.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        match self.state.script.responses.get(sql) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(cause)) => Err(DriverError::new(cause.clone())),
            None => Err(DriverError::new(format!(
                "You have an error in your SQL syntax near '{sql}'"
            ))),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        host: "127.0.0.1".into(),
        port: 3306,
        user: "root".into(),
        password: "secret".into(),
        database: "xyzcompany".into(),
    }
}

/// `Person` rows `1..=n` with `PersonID`, `FirstName` and `LastName`.
pub fn people(n: i64) -> ResultModel {
    let rows = (1..=n)
        .map(|id| {
            vec![
                ScalarValue::Int(id),
                ScalarValue::from(format!("First{id}")),
                ScalarValue::from(format!("Last{id}")),
            ]
        })
        .collect();
    ResultModel::new(
        vec!["PersonID".into(), "FirstName".into(), "LastName".into()],
        rows,
    )
    .unwrap()
}
