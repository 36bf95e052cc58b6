//! Shared helpers for integration tests.

use castlist::config::ConnectionConfig;
use castlist::db::SqliteClient;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

const MOVIES_FIXTURE: &str = include_str!("../fixtures/movies.sql");

/// A seeded SQLite database that lives as long as this value.
pub struct TestDb {
    _dir: TempDir,
    pub config: ConnectionConfig,
}

impl TestDb {
    /// Creates a temporary database file holding the movie fixture.
    pub async fn seeded() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::raw_sql(MOVIES_FIXTURE).execute(&pool).await.unwrap();
        pool.close().await;

        Self {
            config: ConnectionConfig::sqlite(path.to_string_lossy().into_owned()),
            _dir: dir,
        }
    }

    /// Path of the database file.
    pub fn path(&self) -> &str {
        self.config.path.as_deref().unwrap_or_default()
    }

    /// Opens a client on the database.
    pub async fn client(&self) -> SqliteClient {
        SqliteClient::connect(&self.config).await.unwrap()
    }
}

/// Returns the PostgreSQL test database URL, if one is configured.
pub fn postgres_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with("postgres"))
}

/// Collects one text column of a result set, in row order.
pub fn strings(result: &castlist::db::ResultSet, column: &str) -> Vec<String> {
    result
        .column_values(column)
        .unwrap()
        .into_iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

/// Like [`strings`], sorted, for queries without ORDER BY.
pub fn sorted_strings(result: &castlist::db::ResultSet, column: &str) -> Vec<String> {
    let mut values = strings(result, column);
    values.sort();
    values
}
