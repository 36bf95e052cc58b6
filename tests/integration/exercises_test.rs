//! Exercise catalog integration tests.
//!
//! Expected values are tallied by hand from `tests/fixtures/movies.sql`.

use castlist::db::Value;
use castlist::exercises;
use castlist::query::QueryExecutor;
use pretty_assertions::assert_eq;

use super::common::{sorted_strings, strings, TestDb};

#[tokio::test]
async fn test_example_join_returns_all_columns() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::example_join(&executor, "Sean Connery")
        .await
        .unwrap();

    // movies (6) + castings (3) + actors (2)
    assert_eq!(result.column_count(), 11);
    assert_eq!(sorted_strings(&result, "title"), vec!["Dr. No", "Goldfinger"]);
}

#[tokio::test]
async fn test_films_of() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::films_of(&executor, "Harrison Ford").await.unwrap();

    assert_eq!(
        sorted_strings(&result, "title"),
        vec![
            "Blade Runner",
            "Force 10 from Navarone",
            "Hanover Street",
            "Raiders of the Lost Ark",
            "Star Wars",
            "The Empire Strikes Back",
            "Witness",
        ]
    );
}

#[tokio::test]
async fn test_supporting_films_exclude_starring_roles() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let supporting = exercises::supporting_films(&executor, "Harrison Ford")
        .await
        .unwrap();

    assert_eq!(
        sorted_strings(&supporting, "title"),
        vec![
            "Force 10 from Navarone",
            "Star Wars",
            "The Empire Strikes Back"
        ]
    );

    // None of them is a film where he has ord = 1
    let starring = executor
        .execute_sql(
            "SELECT title FROM movies \
             JOIN castings ON castings.movie_id = movies.id \
             JOIN actors ON actors.id = castings.actor_id \
             WHERE castings.ord = 1 AND actors.name = $1",
            &castlist::params!["Harrison Ford"],
        )
        .await
        .unwrap();
    let starring = strings(&starring, "title");
    assert_eq!(starring.len(), 4);
    for title in strings(&supporting, "title") {
        assert!(!starring.contains(&title), "{title} is a starring role");
    }
}

#[tokio::test]
async fn test_films_and_leads_for_year() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::films_and_leads_for_year(&executor, 1962)
        .await
        .unwrap();

    let mut rows = result.into_rows();
    rows.sort_by(|a, b| a[0].to_display_string().cmp(&b[0].to_display_string()));
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Dr. No"), Value::from("Sean Connery")],
            vec![Value::from("Lawrence of Arabia"), Value::from("Peter O'Toole")],
            vec![Value::from("To Kill a Mockingbird"), Value::from("Gregory Peck")],
        ]
    );
}

#[tokio::test]
async fn test_busiest_years_match_manual_tally() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::busiest_years(&executor, "John Travolta", 2)
        .await
        .unwrap();

    assert_eq!(result.columns()[0].name, "yr");
    assert_eq!(result.columns()[1].name, "film_count");
    assert_eq!(
        result.rows(),
        &[
            vec![Value::Int(1978), Value::Int(2)],
            vec![Value::Int(1989), Value::Int(2)],
        ]
    );

    let every_year = exercises::busiest_years(&executor, "John Travolta", 1)
        .await
        .unwrap();
    assert_eq!(
        every_year.rows(),
        &[
            vec![Value::Int(1976), Value::Int(1)],
            vec![Value::Int(1977), Value::Int(1)],
            vec![Value::Int(1978), Value::Int(2)],
            vec![Value::Int(1989), Value::Int(2)],
        ]
    );
}

#[tokio::test]
async fn test_films_and_leads_with() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let andrews = exercises::films_and_leads_with(&executor, "Julie Andrews")
        .await
        .unwrap();
    assert_eq!(
        sorted_strings(&andrews, "title"),
        vec!["Mary Poppins", "The Sound of Music"]
    );
    assert_eq!(
        strings(&andrews, "name"),
        vec!["Julie Andrews", "Julie Andrews"]
    );

    let garfunkel = exercises::films_and_leads_with(&executor, "Art Garfunkel")
        .await
        .unwrap();
    assert_eq!(
        sorted_strings(&garfunkel, "name"),
        vec!["Alan Arkin", "Jack Nicholson"]
    );
}

#[tokio::test]
async fn test_prolific_actors_are_alphabetical() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::prolific_actors(&executor, 2).await.unwrap();
    assert_eq!(
        strings(&result, "name"),
        vec![
            "Harrison Ford",
            "John Travolta",
            "Julie Andrews",
            "Mark Hamill",
            "Sean Connery",
        ]
    );

    let result = exercises::prolific_actors(&executor, 5).await.unwrap();
    assert_eq!(strings(&result, "name"), vec!["John Travolta"]);

    // Nobody in the fixture reaches the default threshold
    let result = exercises::prolific_actors(&executor, 15).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(result.column_count(), 1);
}

#[tokio::test]
async fn test_films_by_cast_size_ordering() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::films_by_cast_size(&executor, 1978).await.unwrap();

    assert_eq!(
        result.rows(),
        &[
            vec![Value::from("Superman"), Value::Int(3)],
            vec![Value::from("Force 10 from Navarone"), Value::Int(2)],
            vec![Value::from("Grease"), Value::Int(2)],
            vec![Value::from("Moment by Moment"), Value::Int(2)],
        ]
    );
}

#[tokio::test]
async fn test_colleagues_of() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::colleagues_of(&executor, "Art Garfunkel")
        .await
        .unwrap();

    assert_eq!(
        sorted_strings(&result, "name"),
        vec![
            "Alan Arkin",
            "Ann-Margret",
            "Candice Bergen",
            "Jack Nicholson"
        ]
    );
}

#[tokio::test]
async fn test_every_catalog_entry_runs_with_defaults() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    for exercise in exercises::CATALOG {
        let result = exercise.run(&executor, &[]).await;
        assert!(result.is_ok(), "{} failed: {:?}", exercise.name, result.err());
    }
}

#[tokio::test]
async fn test_run_by_name_with_overrides() {
    let db = TestDb::seeded().await;
    let client = db.client().await;
    let executor = QueryExecutor::new(&client);

    let result = exercises::run(
        &executor,
        "ford-supporting-films",
        &["Mark Hamill".to_string()],
    )
    .await
    .unwrap();

    // Mark Hamill stars in every film he is in
    assert!(result.is_empty());
}
