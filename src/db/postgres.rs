//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{
    is_connection_failure, ColumnInfo, DatabaseBackend, DatabaseClient, ResultSet, Row, Value,
};
use crate::error::{CastlistError, Result};
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::{Column as SqlxColumn, Either, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// How long a call may wait for a free pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Creates a new PostgresClient from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL, retrying transient failures with exponential backoff.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if !is_transient {
                        break;
                    }
                    if attempt < MAX_RETRY_ATTEMPTS {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(match last_error {
            Some(error) => map_connection_error(error, config),
            None => CastlistError::internal("no connection attempt was made"),
        })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let start = Instant::now();

        // Held until the end of the call; dropping it returns the connection to the pool.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| CastlistError::connection(format!("Failed to acquire connection: {e}")))?;

        let statement = (&mut *conn).prepare(sql).await.map_err(map_query_error)?;

        let columns: Vec<ColumnInfo> = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        let param_types: Vec<String> = match statement.parameters() {
            Some(Either::Left(types)) => types.iter().map(|t| t.name().to_string()).collect(),
            Some(Either::Right(count)) => vec![String::new(); count],
            None => Vec::new(),
        };

        if param_types.len() != params.len() {
            return Err(CastlistError::arity(param_types.len(), params.len()));
        }

        let mut query = sqlx::query(sql);
        for (position, (value, pg_type)) in params.iter().zip(&param_types).enumerate() {
            query = PgBind::plan(pg_type, value, position + 1)?.apply(query);
        }

        let rows = query.fetch_all(&mut *conn).await.map_err(map_query_error)?;
        drop(conn);

        let rows: Vec<Row> = rows.iter().map(convert_row).collect::<Result<_>>()?;
        let execution_time = start.elapsed();

        Ok(ResultSet::new(columns, rows)?.with_execution_time(execution_time))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// A value coerced to the exact type PostgreSQL inferred for its placeholder.
///
/// Execution hits sqlx's per-connection statement cache, which holds the
/// statement `prepare` just described, so the binary encoding of each
/// argument must match that statement's parameter type.
#[derive(Debug, Clone, PartialEq)]
enum PgBind {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Numeric(Option<Decimal>),
    Text(Option<String>),
}

impl PgBind {
    fn plan(pg_type: &str, value: &Value, position: usize) -> Result<Self> {
        let pg_type = pg_type.to_uppercase();
        let mismatch = || {
            CastlistError::type_mismatch(format!(
                "parameter ${position} expects {}, got {} value '{}'",
                pg_type.to_lowercase(),
                value.type_name(),
                value
            ))
        };
        let out_of_range = || {
            CastlistError::type_mismatch(format!(
                "parameter ${position}: {value} is out of range for {}",
                pg_type.to_lowercase()
            ))
        };

        let bind = match (pg_type.as_str(), value) {
            ("BOOL" | "BOOLEAN", Value::Bool(b)) => PgBind::Bool(Some(*b)),
            ("BOOL" | "BOOLEAN", Value::Null) => PgBind::Bool(None),

            ("INT2" | "SMALLINT", Value::Int(i)) => {
                PgBind::Int2(Some(i16::try_from(*i).map_err(|_| out_of_range())?))
            }
            ("INT2" | "SMALLINT", Value::Null) => PgBind::Int2(None),

            ("INT4" | "INT" | "INTEGER", Value::Int(i)) => {
                PgBind::Int4(Some(i32::try_from(*i).map_err(|_| out_of_range())?))
            }
            ("INT4" | "INT" | "INTEGER", Value::Null) => PgBind::Int4(None),

            ("INT8" | "BIGINT", Value::Int(i)) => PgBind::Int8(Some(*i)),
            ("INT8" | "BIGINT", Value::Null) => PgBind::Int8(None),

            ("FLOAT4" | "REAL", Value::Float(f)) => PgBind::Float4(Some(*f as f32)),
            ("FLOAT4" | "REAL", Value::Int(i)) => PgBind::Float4(Some(*i as f32)),
            ("FLOAT4" | "REAL", Value::Null) => PgBind::Float4(None),

            ("FLOAT8" | "DOUBLE PRECISION", Value::Float(f)) => PgBind::Float8(Some(*f)),
            ("FLOAT8" | "DOUBLE PRECISION", Value::Int(i)) => PgBind::Float8(Some(*i as f64)),
            ("FLOAT8" | "DOUBLE PRECISION", Value::Null) => PgBind::Float8(None),

            ("NUMERIC" | "DECIMAL", Value::Int(i)) => PgBind::Numeric(Some(Decimal::from(*i))),
            ("NUMERIC" | "DECIMAL", Value::Float(f)) => {
                PgBind::Numeric(Some(Decimal::from_f64(*f).ok_or_else(out_of_range)?))
            }
            ("NUMERIC" | "DECIMAL", Value::Null) => PgBind::Numeric(None),

            ("TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME", Value::String(s)) => {
                PgBind::Text(Some(s.clone()))
            }
            ("TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME", Value::Null) => PgBind::Text(None),

            // A NULL carries no payload, so its encoding fits any placeholder type.
            (_, Value::Null) => PgBind::Text(None),

            ("BOOL" | "BOOLEAN" | "INT2" | "SMALLINT" | "INT4" | "INT" | "INTEGER" | "INT8"
            | "BIGINT" | "FLOAT4" | "REAL" | "FLOAT8" | "DOUBLE PRECISION" | "NUMERIC"
            | "DECIMAL" | "TEXT"
            | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME", _) => return Err(mismatch()),

            (other, _) => {
                let type_name = if other.is_empty() { "unknown" } else { other };
                return Err(CastlistError::type_mismatch(format!(
                    "parameter ${position} has unsupported type {}; add an explicit cast such as ${position}::text or ${position}::float8",
                    type_name.to_lowercase()
                )));
            }
        };

        Ok(bind)
    }

    fn apply(self, query: PgQuery<'_>) -> PgQuery<'_> {
        match self {
            PgBind::Bool(v) => query.bind(v),
            PgBind::Int2(v) => query.bind(v),
            PgBind::Int4(v) => query.bind(v),
            PgBind::Int8(v) => query.bind(v),
            PgBind::Float4(v) => query.bind(v),
            PgBind::Float8(v) => query.bind(v),
            PgBind::Numeric(v) => query.bind(v),
            PgBind::Text(v) => query.bind(v),
        }
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name(), col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, column: &str, type_name: &str) -> Result<Value> {
    let decoded = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(Value::Bool)),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(|i| Value::Int(i as i64))),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(|i| Value::Int(i as i64))),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map(Value::Int)),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|f| Value::Float(widen_f32(f)))),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map(Value::Float)),

        "NUMERIC" | "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(index)
            .map(|v| v.map(numeric_value)),

        // Everything else must be text-compatible
        _ => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map(Value::String)),
    };

    decoded.map(|v| v.unwrap_or(Value::Null)).map_err(|e| {
        CastlistError::query(format!(
            "cannot decode column \"{column}\" of type {}: {e}; cast it to text in the query",
            type_name.to_lowercase()
        ))
    })
}

/// Widens a `real` through its shortest decimal form, so 5.9 stays 5.9.
fn widen_f32(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f as f64)
}

/// NUMERIC values become floats; digits beyond f64 precision are rounded.
fn numeric_value(d: Decimal) -> Value {
    let text = d.to_string();
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::String(text),
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    // Connection refused or timeout are often transient
    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
    {
        return true;
    }

    matches!(error, sqlx::Error::PoolTimedOut)
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> CastlistError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.effective_port();
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        CastlistError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        CastlistError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        CastlistError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        CastlistError::connection(
            "Server requires SSL. Add '?sslmode=require' to connection string.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        CastlistError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        CastlistError::connection(error.to_string())
    }
}

/// Maps a statement error to the error taxonomy by SQLSTATE.
fn map_query_error(error: sqlx::Error) -> CastlistError {
    if is_connection_failure(&error) {
        return CastlistError::connection(error.to_string());
    }

    let Some(code) = error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .map(|code| code.into_owned())
    else {
        return CastlistError::query(error.to_string());
    };

    let message = format_query_error(&error);
    match code.as_str() {
        c if c.starts_with("08") => CastlistError::connection(message),
        "42601" => CastlistError::syntax(message),
        "42804" | "42883" | "22P02" | "42P18" | "22003" => CastlistError::type_mismatch(message),
        _ => CastlistError::query(message),
    }
}

/// Formats a query error with hints if available.
fn format_query_error(error: &sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
