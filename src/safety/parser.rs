//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the backend's dialect to parse SQL and classify
//! statements as read-only or mutating.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::{Dialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::db::DatabaseBackend;
use crate::error::{CastlistError, Result};

use super::{Classification, StatementType};

/// SQL classifier that parses and classifies SQL queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlClassifier {
    backend: DatabaseBackend,
}

impl SqlClassifier {
    /// Creates a classifier using the dialect of the given backend.
    pub fn new(backend: DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Classifies a SQL string.
    ///
    /// Text that does not parse, or holds no statement at all, is a syntax error.
    pub fn classify(&self, sql: &str) -> Result<Classification> {
        let dialect = dialect_for(self.backend);
        let statements = Parser::parse_sql(dialect.as_ref(), sql)
            .map_err(|e| CastlistError::syntax(format!("cannot parse query: {}", e)))?;

        match statements.as_slice() {
            [] => Err(CastlistError::syntax("query contains no statement")),
            [statement] => Ok(classify_statement(statement)),
            // Even a batch of SELECTs is refused: one call returns one result set.
            _ => Ok(Classification::mutating(StatementType::Multiple(
                statements.len(),
            ))),
        }
    }

    /// Classifies a SQL string and fails unless it is a single read-only statement.
    pub fn ensure_read_only(&self, sql: &str) -> Result<Classification> {
        let classification = self.classify(sql)?;
        if classification.read_only {
            Ok(classification)
        } else {
            Err(CastlistError::not_read_only(format!(
                "{} is not allowed, only a single read-only statement can be executed",
                classification.statement_type
            )))
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(backend: DatabaseBackend, sql: &str) -> Result<Classification> {
    SqlClassifier::new(backend).classify(sql)
}

fn dialect_for(backend: DatabaseBackend) -> Box<dyn Dialect> {
    match backend {
        DatabaseBackend::Postgres => Box::new(PostgreSqlDialect {}),
        DatabaseBackend::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> Classification {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            // EXPLAIN ANALYZE runs the statement
            if *analyze && !classify_statement(statement).read_only {
                Classification::mutating(StatementType::Explain)
            } else {
                Classification::read_only(StatementType::Explain)
            }
        }
        Statement::ExplainTable { .. } => Classification::read_only(StatementType::Explain),
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => Classification::read_only(StatementType::Show),

        Statement::Insert(_) => Classification::mutating(StatementType::Insert),
        Statement::Update { .. } => Classification::mutating(StatementType::Update),
        Statement::Merge { .. } => Classification::mutating(StatementType::Merge),
        Statement::Delete(_) => Classification::mutating(StatementType::Delete),
        Statement::Drop { .. } => Classification::mutating(StatementType::Drop),
        Statement::Truncate { .. } => Classification::mutating(StatementType::Truncate),
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => Classification::mutating(StatementType::Alter),
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => Classification::mutating(StatementType::Create),
        Statement::Grant { .. } => Classification::mutating(StatementType::Grant),
        Statement::Revoke { .. } => Classification::mutating(StatementType::Revoke),

        // Anything unrecognised (SET, COPY, transactions, ...) is refused
        _ => Classification::mutating(StatementType::Unknown),
    }
}

/// Classifies a Query by recursively inspecting for data-modifying operations.
fn classify_query(query: &Query) -> Classification {
    let mut result = Classification::read_only(StatementType::Select);

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            result = result.or(classify_query(&cte.query));
        }
    }

    result.or(classify_set_expr(&query.body))
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
fn classify_set_expr(set_expr: &SetExpr) -> Classification {
    match set_expr {
        // INSERT and UPDATE in CTE bodies are wrapped as statements. A DELETE
        // or MERGE there does not parse at all and fails as a syntax error.
        SetExpr::Update(stmt) | SetExpr::Insert(stmt) => classify_statement(stmt),

        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),

        SetExpr::SetOperation { left, right, .. } => {
            classify_set_expr(left).or(classify_set_expr(right))
        }

        SetExpr::Values(_) | SetExpr::Table(_) => Classification::read_only(StatementType::Select),
    }
}

/// Classifies a Select by checking its INTO target and FROM clause.
fn classify_select(select: &Select) -> Classification {
    if select.into.is_some() {
        return Classification::mutating(StatementType::SelectInto);
    }

    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .fold(Classification::read_only(StatementType::Select), Classification::or)
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> Classification {
    twj.joins
        .iter()
        .map(|join| classify_table_factor(&join.relation))
        .fold(classify_table_factor(&twj.relation), Classification::or)
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> Classification {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => Classification::read_only(StatementType::Select),
    }
}
