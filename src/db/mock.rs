//! Mock database clients for testing.
//!
//! `MockDatabaseClient` returns a scripted result set and records every call,
//! so tests can check exactly what reached the database (and what did not).

use super::{ColumnInfo, DatabaseBackend, DatabaseClient, ResultSet, Value};
use crate::error::{CastlistError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A statement as it was handed to a mock client.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Rendered SQL text.
    pub sql: String,
    /// Bound values, in order.
    pub params: Vec<Value>,
}

/// A mock database client that returns a predefined result.
pub struct MockDatabaseClient {
    backend: DatabaseBackend,
    result: ResultSet,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockDatabaseClient {
    /// Creates a mock returning a single text row.
    pub fn new() -> Self {
        let result = ResultSet::new(
            vec![ColumnInfo::new("result", "text")],
            vec![vec![Value::from("Mock result")]],
        )
        .unwrap_or_default();
        Self::with_result(result)
    }

    /// Creates a mock returning the given result for every call.
    pub fn with_result(result: ResultSet) -> Self {
        Self {
            backend: DatabaseBackend::Postgres,
            result,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the backend the mock reports, which decides placeholder rendering.
    pub fn with_backend(mut self, backend: DatabaseBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Makes every call wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.result.clone().with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A mock database client whose every call fails.
pub struct FailingDatabaseClient {
    make_error: fn() -> CastlistError,
    calls: AtomicUsize,
}

impl FailingDatabaseClient {
    /// Creates a client failing with the error built by `make_error`.
    pub fn new(make_error: fn() -> CastlistError) -> Self {
        Self {
            make_error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a client that behaves like an unreachable server.
    pub fn unreachable() -> Self {
        Self::new(|| CastlistError::connection("Cannot connect to localhost:5432"))
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn fetch(&self, _sql: &str, _params: &[Value]) -> Result<ResultSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.make_error)())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
