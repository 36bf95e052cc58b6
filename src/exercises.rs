//! Join exercises over the movie schema.
//!
//! Each exercise is a read-only query over `actors`, `movies` and `castings`
//! whose inputs are bound parameters. They are available both as typed
//! functions and as named catalog entries the CLI can list and run.

use crate::db::{Params, Query, ResultSet, Value};
use crate::error::{CastlistError, Result};
use crate::query::QueryExecutor;

/// Kind of value an exercise argument accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    Integer,
}

/// One argument of an exercise query, bound to its placeholder by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg {
    pub name: &'static str,
    pub kind: ArgKind,
    pub default: &'static str,
}

impl Arg {
    const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Text,
            default,
        }
    }

    const fn integer(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Integer,
            default,
        }
    }

    /// Converts a command-line string into a value of this argument's kind.
    pub fn parse(&self, input: &str) -> Result<Value> {
        match self.kind {
            ArgKind::Text => Ok(Value::String(input.to_string())),
            ArgKind::Integer => input.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                CastlistError::config(format!(
                    "argument '{}' expects an integer, got '{}'",
                    self.name, input
                ))
            }),
        }
    }
}

/// A named exercise query with its default arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exercise {
    pub name: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
    pub args: &'static [Arg],
}

impl Exercise {
    /// Parses the exercise SQL into a query template.
    pub fn query(&self) -> Result<Query> {
        Query::new(self.sql)
    }

    /// Builds the parameter set, taking `overrides` in place of the leading defaults.
    pub fn params(&self, overrides: &[String]) -> Result<Params> {
        if overrides.len() > self.args.len() {
            return Err(CastlistError::arity(self.args.len(), overrides.len()));
        }

        self.args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let input = overrides.get(i).map(String::as_str).unwrap_or(arg.default);
                arg.parse(input)
            })
            .collect()
    }

    /// Runs the exercise with its default arguments, overridden by `overrides`.
    pub async fn run(
        &self,
        executor: &QueryExecutor<'_>,
        overrides: &[String],
    ) -> Result<ResultSet> {
        let params = self.params(overrides)?;
        executor.execute(&self.query()?, &params).await
    }

    /// Argument names with their defaults, e.g. `actor="Harrison Ford"`.
    pub fn usage(&self) -> String {
        self.args
            .iter()
            .map(|arg| match arg.kind {
                ArgKind::Text => format!("{}=\"{}\"", arg.name, arg.default),
                ArgKind::Integer => format!("{}={}", arg.name, arg.default),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

const EXAMPLE_JOIN_SQL: &str = "
SELECT *
FROM movies
JOIN castings ON movies.id = castings.movie_id
JOIN actors ON castings.actor_id = actors.id
WHERE actors.name = $1";

const FILMS_OF_SQL: &str = "
SELECT title
FROM movies
JOIN castings ON movies.id = castings.movie_id
JOIN actors ON actors.id = castings.actor_id
WHERE actors.name = $1";

const SUPPORTING_FILMS_SQL: &str = "
SELECT title
FROM movies
JOIN castings ON castings.movie_id = movies.id
JOIN actors ON actors.id = castings.actor_id
WHERE castings.ord <> 1 AND actors.name = $1";

const FILMS_AND_LEADS_FOR_YEAR_SQL: &str = "
SELECT title, actors.name
FROM movies
JOIN castings ON castings.movie_id = movies.id
JOIN actors ON actors.id = castings.actor_id
WHERE castings.ord = 1 AND movies.yr = $1";

const BUSIEST_YEARS_SQL: &str = "
SELECT yr, COUNT(*) AS film_count
FROM movies
JOIN castings ON castings.movie_id = movies.id
JOIN actors ON actors.id = castings.actor_id
WHERE actors.name = $1
GROUP BY movies.yr
HAVING COUNT(*) >= $2
ORDER BY yr";

const FILMS_AND_LEADS_WITH_SQL: &str = "
SELECT title, actors.name
FROM actors
JOIN castings ON castings.actor_id = actors.id
JOIN movies ON castings.movie_id = movies.id
JOIN castings AS c2 ON c2.movie_id = movies.id
JOIN actors AS a2 ON a2.id = c2.actor_id
WHERE castings.ord = 1 AND a2.name = $1";

const PROLIFIC_ACTORS_SQL: &str = "
SELECT actors.name
FROM castings
JOIN actors ON actors.id = castings.actor_id
WHERE castings.ord = 1
GROUP BY actors.name
HAVING COUNT(*) >= $1
ORDER BY actors.name ASC";

const FILMS_BY_CAST_SIZE_SQL: &str = "
SELECT title, COUNT(castings.actor_id) AS actor_count
FROM movies
JOIN castings ON movies.id = castings.movie_id
WHERE movies.yr = $1
GROUP BY movies.id, movies.title
ORDER BY actor_count DESC, title ASC";

const COLLEAGUES_OF_SQL: &str = "
SELECT a2.name
FROM actors
JOIN castings ON actors.id = castings.actor_id
JOIN castings AS c2 ON c2.movie_id = castings.movie_id
JOIN actors AS a2 ON a2.id = c2.actor_id
WHERE actors.name = $1 AND a2.name <> $1";

const ACTOR_CONNERY: &[Arg] = &[Arg::text("actor", "Sean Connery")];
const ACTOR_FORD: &[Arg] = &[Arg::text("actor", "Harrison Ford")];
const YEAR_1962: &[Arg] = &[Arg::integer("year", "1962")];
const TRAVOLTA_YEARS: &[Arg] = &[
    Arg::text("actor", "John Travolta"),
    Arg::integer("min_films", "2"),
];
const ACTOR_ANDREWS: &[Arg] = &[Arg::text("actor", "Julie Andrews")];
const MIN_LEAD_ROLES: &[Arg] = &[Arg::integer("min_lead_roles", "15")];
const YEAR_1978: &[Arg] = &[Arg::integer("year", "1978")];
const ACTOR_GARFUNKEL: &[Arg] = &[Arg::text("actor", "Art Garfunkel")];

/// Every exercise, in catalog order.
pub const CATALOG: &[Exercise] = &[
    Exercise {
        name: "example-join",
        description: "All movie, casting and actor columns for an actor's films",
        sql: EXAMPLE_JOIN_SQL,
        args: ACTOR_CONNERY,
    },
    Exercise {
        name: "ford-films",
        description: "Films the actor has appeared in",
        sql: FILMS_OF_SQL,
        args: ACTOR_FORD,
    },
    Exercise {
        name: "ford-supporting-films",
        description: "Films the actor appeared in, but not in the starring role",
        sql: SUPPORTING_FILMS_SQL,
        args: ACTOR_FORD,
    },
    Exercise {
        name: "films-and-stars-from-sixty-two",
        description: "Title and leading star of every film from the year",
        sql: FILMS_AND_LEADS_FOR_YEAR_SQL,
        args: YEAR_1962,
    },
    Exercise {
        name: "travoltas-busiest-years",
        description: "Years in which the actor made at least min_films films, with the count",
        sql: BUSIEST_YEARS_SQL,
        args: TRAVOLTA_YEARS,
    },
    Exercise {
        name: "andrews-films-and-leads",
        description: "Title and leading actor of every film the actor played in",
        sql: FILMS_AND_LEADS_WITH_SQL,
        args: ACTOR_ANDREWS,
    },
    Exercise {
        name: "prolific-actors",
        description: "Actors with at least min_lead_roles starring roles, alphabetically",
        sql: PROLIFIC_ACTORS_SQL,
        args: MIN_LEAD_ROLES,
    },
    Exercise {
        name: "films-by-cast-size",
        description: "Films from the year by cast size (descending), then title",
        sql: FILMS_BY_CAST_SIZE_SQL,
        args: YEAR_1978,
    },
    Exercise {
        name: "colleagues-of-garfunkel",
        description: "Everyone who has played alongside the actor",
        sql: COLLEAGUES_OF_SQL,
        args: ACTOR_GARFUNKEL,
    },
];

/// Looks up an exercise by catalog name.
pub fn find(name: &str) -> Option<&'static Exercise> {
    CATALOG.iter().find(|exercise| exercise.name == name)
}

/// Runs the catalog exercise `name` with its defaults overridden by `overrides`.
pub async fn run(
    executor: &QueryExecutor<'_>,
    name: &str,
    overrides: &[String],
) -> Result<ResultSet> {
    let exercise = find(name).ok_or_else(|| {
        CastlistError::config(format!(
            "Unknown exercise '{}'. Run `castlist list` to see the catalog.",
            name
        ))
    })?;
    exercise.run(executor, overrides).await
}

async fn execute(executor: &QueryExecutor<'_>, sql: &str, params: Params) -> Result<ResultSet> {
    executor.execute(&Query::new(sql)?, &params).await
}

/// Every column of movies, castings and actors for the actor's films.
pub async fn example_join(executor: &QueryExecutor<'_>, actor: &str) -> Result<ResultSet> {
    execute(executor, EXAMPLE_JOIN_SQL, crate::params![actor]).await
}

/// Titles of the films the actor has appeared in.
pub async fn films_of(executor: &QueryExecutor<'_>, actor: &str) -> Result<ResultSet> {
    execute(executor, FILMS_OF_SQL, crate::params![actor]).await
}

/// Titles of the films where the actor did not have the starring role.
pub async fn supporting_films(executor: &QueryExecutor<'_>, actor: &str) -> Result<ResultSet> {
    execute(executor, SUPPORTING_FILMS_SQL, crate::params![actor]).await
}

/// Title and leading star of every film released in `yr`.
pub async fn films_and_leads_for_year(
    executor: &QueryExecutor<'_>,
    yr: i64,
) -> Result<ResultSet> {
    execute(executor, FILMS_AND_LEADS_FOR_YEAR_SQL, crate::params![yr]).await
}

/// `(yr, film_count)` for every year the actor made at least `min_films` films.
pub async fn busiest_years(
    executor: &QueryExecutor<'_>,
    actor: &str,
    min_films: i64,
) -> Result<ResultSet> {
    execute(executor, BUSIEST_YEARS_SQL, crate::params![actor, min_films]).await
}

/// Title and leading actor of every film the actor played in.
pub async fn films_and_leads_with(executor: &QueryExecutor<'_>, actor: &str) -> Result<ResultSet> {
    execute(executor, FILMS_AND_LEADS_WITH_SQL, crate::params![actor]).await
}

/// Names of actors with at least `min_lead_roles` starring roles.
pub async fn prolific_actors(
    executor: &QueryExecutor<'_>,
    min_lead_roles: i64,
) -> Result<ResultSet> {
    execute(executor, PROLIFIC_ACTORS_SQL, crate::params![min_lead_roles]).await
}

/// `(title, actor_count)` of the films released in `yr`, largest cast first.
pub async fn films_by_cast_size(executor: &QueryExecutor<'_>, yr: i64) -> Result<ResultSet> {
    execute(executor, FILMS_BY_CAST_SIZE_SQL, crate::params![yr]).await
}

/// Everyone who has played in a film alongside the actor.
pub async fn colleagues_of(executor: &QueryExecutor<'_>, actor: &str) -> Result<ResultSet> {
    execute(executor, COLLEAGUES_OF_SQL, crate::params![actor]).await
}
