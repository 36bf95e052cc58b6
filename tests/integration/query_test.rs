//! Query execution integration tests.
//!
//! Runs parameterized queries through the executor against the seeded
//! SQLite movie database.

use castlist::db::{DatabaseClient, Params, Query, Value};
use castlist::error::CastlistError;
use castlist::params;
use castlist::query::QueryExecutor;
use pretty_assertions::assert_eq;

use super::common::{strings, TestDb};

#[tokio::test]
async fn test_column_count_matches_projection() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT id, title, yr, score FROM movies WHERE yr = $1",
            &params![1962],
        )
        .await
        .unwrap();

    assert_eq!(result.column_count(), 4);
    let names: Vec<&str> = result.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "title", "yr", "score"]);
    assert_eq!(result.row_count(), 3);
    assert!(result.rows().iter().all(|row| row.len() == 4));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_repeated_execution_is_idempotent() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);
    let query = Query::new("SELECT title, score FROM movies WHERE yr >= $1 ORDER BY title").unwrap();
    let params = params![1978];

    let first = executor.execute(&query, &params).await.unwrap();
    let second = executor.execute(&query, &params).await.unwrap();

    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[tokio::test]
async fn test_empty_table_returns_columns_without_rows() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql("SELECT id, name FROM directors", &Params::new())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.row_count(), 0);
    assert_eq!(result.column_count(), 2);
    assert_eq!(result.columns()[0].name, "id");
    assert_eq!(result.columns()[1].name, "name");
}

#[tokio::test]
async fn test_no_matching_rows_is_success() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT title FROM movies WHERE title = $1",
            &params!["Nonexistent Film"],
        )
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.column_count(), 1);
}

#[tokio::test]
async fn test_missing_parameter_is_arity_error() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let err = executor
        .execute_sql("SELECT title FROM movies WHERE yr = $1", &Params::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CastlistError::ParameterArity {
            expected: 1,
            actual: 0
        }
    ));
}

#[tokio::test]
async fn test_values_with_quotes_bind_safely() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT id FROM actors WHERE name = $1",
            &params!["Peter O'Toole"],
        )
        .await
        .unwrap();
    assert_eq!(result.rows(), &[vec![Value::Int(19)]]);

    // An injection attempt is just a name that matches nothing
    let result = executor
        .execute_sql(
            "SELECT id FROM actors WHERE name = $1",
            &params!["x' OR '1'='1"],
        )
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_placeholder_styles() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let anonymous = executor
        .execute_sql(
            "SELECT title FROM movies WHERE yr = ? AND score > ? ORDER BY title",
            &params![1962, 8.0],
        )
        .await
        .unwrap();
    assert_eq!(
        strings(&anonymous, "title"),
        vec!["Lawrence of Arabia", "To Kill a Mockingbird"]
    );

    let query = Query::new("SELECT title FROM movies WHERE yr = :yr AND score > :score ORDER BY title")
        .unwrap();
    let params = query
        .bind_named([("score", Value::Float(8.0)), ("yr", Value::Int(1962))])
        .unwrap();
    let named = executor.execute(&query, &params).await.unwrap();
    assert_eq!(named, anonymous);
}

#[tokio::test]
async fn test_placeholder_text_in_literals_is_not_a_parameter() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT '$1 or ?' AS literal, title FROM movies WHERE id = $1",
            &params![8],
        )
        .await
        .unwrap();

    assert_eq!(
        result.rows(),
        &[vec![Value::from("$1 or ?"), Value::from("Dr. No")]]
    );
}

#[tokio::test]
async fn test_null_values_are_returned() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT title, score, votes FROM movies WHERE yr = $1 ORDER BY title",
            &params![1989],
        )
        .await
        .unwrap();

    assert_eq!(
        result.rows(),
        &[
            vec![Value::from("Look Who's Talking"), Value::Float(5.9), Value::Int(80)],
            vec![Value::from("The Experts"), Value::Null, Value::Null],
        ]
    );
}

#[tokio::test]
async fn test_null_parameter() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT COALESCE($1, 'missing') AS v",
            &params![Value::Null],
        )
        .await
        .unwrap();

    assert_eq!(result.rows(), &[vec![Value::from("missing")]]);
}

#[tokio::test]
async fn test_malformed_query_is_syntax_error() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let err = executor
        .execute_sql("SELECT title FROM movies WHERE", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CastlistError::Syntax(_)), "got {err:?}");

    let err = Query::new("SELECT $1, ?").unwrap_err();
    assert!(matches!(err, CastlistError::Syntax(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unknown_objects_are_query_errors() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let err = executor
        .execute_sql("SELECT * FROM studios", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CastlistError::Query(_)), "got {err:?}");

    let err = executor
        .execute_sql("SELECT budget FROM movies", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CastlistError::Query(_)), "got {err:?}");
}

#[tokio::test]
async fn test_mutating_statements_are_refused() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let err = executor
        .execute_sql("DELETE FROM castings WHERE actor_id = $1", &params![1])
        .await
        .unwrap_err();
    assert!(matches!(err, CastlistError::NotReadOnly(_)), "got {err:?}");

    let err = executor
        .execute_sql(
            "SELECT title FROM movies; DROP TABLE movies",
            &Params::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CastlistError::NotReadOnly(_)), "got {err:?}");

    let result = executor
        .execute_sql(
            "SELECT COUNT(*) AS n FROM castings WHERE actor_id = $1",
            &params![1],
        )
        .await
        .unwrap();
    assert_eq!(result.rows(), &[vec![Value::Int(7)]]);
}

#[tokio::test]
async fn test_concurrent_executions_are_independent() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);
    let query = Query::new("SELECT name FROM actors WHERE id = $1").unwrap();

    let ford_id = params![1];
    let connery_id = params![4];

    let (ford, connery) = tokio::join!(
        executor.execute(&query, &ford_id),
        executor.execute(&query, &connery_id),
    );

    assert_eq!(strings(&ford.unwrap(), "name"), vec!["Harrison Ford"]);
    assert_eq!(strings(&connery.unwrap(), "name"), vec!["Sean Connery"]);
}

#[tokio::test]
async fn test_aggregate_column_types() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = executor
        .execute_sql(
            "SELECT yr, COUNT(*) AS films FROM movies WHERE yr = $1 GROUP BY yr",
            &params![1978],
        )
        .await
        .unwrap();

    assert_eq!(result.rows(), &[vec![Value::Int(1978), Value::Int(4)]]);
    assert_eq!(result.columns()[1].data_type, "INTEGER");
}
