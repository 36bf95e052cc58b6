//! Database abstraction layer for castlist.
//!
//! Provides a trait-based interface for running a rendered statement with
//! bound values, allowing PostgreSQL and SQLite backends to be used
//! interchangeably by the query executor.

mod mock;
mod postgres;
mod query;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient, RecordedCall};
pub use postgres::PostgresClient;
pub use query::{Params, PlaceholderStyle, Query};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, ResultSet, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Returns the default port for this backend, if it uses one.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::Sqlite => None,
        }
    }

    /// Prefix character of the backend's numbered placeholders.
    pub fn placeholder_prefix(&self) -> char {
        match self {
            Self::Postgres => '$',
            Self::Sqlite => '?',
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates a database client for the configured backend.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(config).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for database clients.
///
/// `fetch` receives SQL already rendered in the backend's placeholder syntax
/// and exactly as many values as it has placeholders. Each call checks a
/// connection out of the client's pool for its whole duration.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// The backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Runs one statement and returns its complete result set.
    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    /// Closes the connection pool.
    async fn close(&self) -> Result<()>;
}

/// Returns true if the error means the database could not be reached at all.
pub(crate) fn is_connection_failure(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
