//! Parameterized query execution.
//!
//! Validates the parameter set against the template, checks that the
//! rendered statement is read-only, and only then makes a round trip to the
//! database.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::db::{DatabaseClient, Params, Query, ResultSet};
use crate::error::{CastlistError, Result};
use crate::safety::SqlClassifier;

/// Query executor bound to one database client.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
    timeout: Option<Duration>,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor with no query timeout.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db, timeout: None }
    }

    /// Bounds every round trip by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executes a query template with the given parameters.
    ///
    /// Arity, syntax and read-only checks happen before the database is
    /// contacted. An empty result is a success with full column metadata.
    pub async fn execute(&self, query: &Query, params: &Params) -> Result<ResultSet> {
        if params.len() != query.param_count() {
            let err = CastlistError::arity(query.param_count(), params.len());
            warn!("Rejected query before execution: {}", err);
            return Err(err);
        }

        let backend = self.db.backend();
        let sql = query.render(backend);

        if let Err(e) = SqlClassifier::new(backend).ensure_read_only(&sql) {
            warn!("Rejected query before execution: {}", e);
            return Err(e);
        }

        let start = Instant::now();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.db.fetch(&sql, params.as_slice()))
                .await
                .unwrap_or_else(|_| Err(CastlistError::Timeout(limit.as_secs()))),
            None => self.db.fetch(&sql, params.as_slice()).await,
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(result_set) => debug!(
                "Query returned {} row(s) in {:?}: {}",
                result_set.row_count(),
                elapsed,
                sql
            ),
            Err(e) => warn!("Query failed after {:?}: {}", elapsed, e),
        }

        result
    }

    /// Parses `sql` as a template and executes it.
    pub async fn execute_sql(&self, sql: &str, params: &Params) -> Result<ResultSet> {
        let query = Query::new(sql)?;
        self.execute(&query, params).await
    }
}
