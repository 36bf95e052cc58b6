//! SQLite database client implementation.
//!
//! SQLite is dynamically typed: parameters bind as their natural storage
//! class and result values decode by the storage class they actually have.

use crate::config::ConnectionConfig;
use crate::db::{
    is_connection_failure, ColumnInfo, DatabaseBackend, DatabaseClient, ResultSet, Row, Value,
};
use crate::error::{CastlistError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Sqlite, Statement, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

const SQLITE_ERROR: i32 = 1;
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_MISMATCH: i32 = 20;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Creates a new SqliteClient from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens an existing SQLite database file.
    ///
    /// The file is never created; a missing file is a connection error.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let path = config
            .path
            .as_deref()
            .ok_or_else(|| CastlistError::config("SQLite database path is required"))?;
        let in_memory = path == ":memory:";

        let options = SqliteConnectOptions::from_str(&config.to_connection_string()?)
            .map_err(|e| CastlistError::config(format!("Invalid SQLite path '{path}': {e}")))?
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(false);

        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                CastlistError::connection(format!("Cannot open SQLite database '{path}': {e}"))
            })?;

        debug!("Opened {}", config.display_string());
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let start = Instant::now();

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| CastlistError::connection(format!("Failed to acquire connection: {e}")))?;

        let statement = (&mut *conn).prepare(sql).await.map_err(map_query_error)?;
        let declared: Vec<(String, String)> = statement
            .columns()
            .iter()
            .map(|col| (col.name().to_string(), col.type_info().name().to_string()))
            .collect();

        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }

        let rows = query.fetch_all(&mut *conn).await.map_err(map_query_error)?;
        drop(conn);

        let rows: Vec<Row> = rows.iter().map(convert_row).collect::<Result<_>>()?;
        let columns = describe_columns(declared, &rows);
        let execution_time = start.elapsed();

        Ok(ResultSet::new(columns, rows)?.with_execution_time(execution_time))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
    }
}

/// Builds column metadata, falling back to the values' storage class for
/// expression columns that have no declared type.
fn describe_columns(declared: Vec<(String, String)>, rows: &[Row]) -> Vec<ColumnInfo> {
    declared
        .into_iter()
        .enumerate()
        .map(|(index, (name, data_type))| {
            if data_type != "NULL" {
                return ColumnInfo::new(name, data_type);
            }
            let observed = rows
                .iter()
                .map(|row| &row[index])
                .find(|value| !value.is_null())
                .map(storage_class)
                .unwrap_or("NULL");
            ColumnInfo::new(name, observed)
        })
        .collect()
}

fn storage_class(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) | Value::Int(_) => "INTEGER",
        Value::Float(_) => "REAL",
        Value::String(_) => "TEXT",
    }
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    (0..row.columns().len())
        .map(|index| convert_value(row, index))
        .collect()
}

fn convert_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let decode_error =
        |e: sqlx::Error| CastlistError::query(format!("cannot decode column {index}: {e}"));

    let raw = row.try_get_raw(index).map_err(decode_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    match storage.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(Value::Int).map_err(decode_error),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Float).map_err(decode_error),
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(decode_error)?;
            String::from_utf8(bytes).map(Value::String).map_err(|_| {
                CastlistError::query(format!(
                    "column {index} holds binary data that is not valid UTF-8"
                ))
            })
        }
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .map_err(decode_error),
    }
}

/// Maps a SQLite error to the error taxonomy by result code and message.
fn map_query_error(error: sqlx::Error) -> CastlistError {
    if is_connection_failure(&error) {
        return CastlistError::connection(error.to_string());
    }

    let Some(db_error) = error.as_database_error() else {
        return CastlistError::query(error.to_string());
    };

    let message = format!("ERROR: {}", db_error.message());
    let lower = message.to_lowercase();
    // Extended result codes carry the primary code in their low byte.
    let primary = db_error
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| code & 0xff);

    match primary {
        Some(SQLITE_ERROR)
            if lower.contains("syntax error")
                || lower.contains("incomplete input")
                || lower.contains("unrecognized token") =>
        {
            CastlistError::syntax(message)
        }
        Some(SQLITE_MISMATCH) => CastlistError::type_mismatch(message),
        Some(SQLITE_CANTOPEN | SQLITE_BUSY | SQLITE_LOCKED) => CastlistError::connection(message),
        _ => CastlistError::query(message),
    }
}
