//! Query execution engine.
//!
//! This module runs a plan's statement on an open session:
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Optional query timeout (none unless configured)
//! - Rows converted to JSON maps in select order
//! - Column names described by the engine when no rows come back
//!
//! # Architecture
//!
//! Each flavor has a submodule with the same `fetch_rows` signature. The
//! engine statement is the plan's text as-is; it carries no bind parameters.

use crate::db::session::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::QueryResult;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles statement execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Option<Duration>,
    decode_binary: bool,
}

impl QueryExecutor {
    /// Executor without a timeout that renders UTF-8 blobs as text.
    pub fn new() -> Self {
        Self {
            query_timeout: None,
            decode_binary: true,
        }
    }

    pub fn with_timeout(mut self, query_timeout: Option<Duration>) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Base64-encode every binary column, even when it holds UTF-8 text.
    pub fn with_raw_binary(mut self, raw: bool) -> Self {
        self.decode_binary = !raw;
        self
    }

    /// Execute a statement and return at most `row_limit` rows.
    pub async fn execute(
        &self,
        pool: &DbPool,
        statement: &str,
        row_limit: Option<u32>,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();

        debug!(
            sql = %statement,
            limit = ?row_limit,
            timeout_secs = ?self.query_timeout.map(|t| t.as_secs()),
            "Executing query"
        );

        let mut result = impl_db_dispatch!(pool, {
            Postgres(p) => {
                let rows = postgres::fetch_rows(p, statement, row_limit, self.query_timeout).await?;
                process_rows(rows, row_limit, start, self.decode_binary)
            },
            SQLite(p) => {
                let rows = sqlite::fetch_rows(p, statement, row_limit, self.query_timeout).await?;
                process_rows(rows, row_limit, start, self.decode_binary)
            },
        });

        // Without rows there is nothing to read column names from.
        if result.columns.is_empty() {
            result.columns = describe_columns(pool, statement).await;
        }
        Ok(result)
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Process rows from any flavor into a QueryResult.
fn process_rows<R: RowToJson>(
    rows: Vec<R>,
    row_limit: Option<u32>,
    start: Instant,
    decode_binary: bool,
) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.column_names();
    let rows_to_take = row_limit.map_or(rows.len(), |l| (l as usize).min(rows.len()));

    if rows_to_take < rows.len() {
        warn!(
            total_rows = rows.len(),
            limit = ?row_limit,
            "Query result truncated"
        );
    }

    QueryResult {
        columns,
        rows: rows
            .iter()
            .take(rows_to_take)
            .map(|r| r.to_json_map(decode_binary))
            .collect(),
        execution_time_ms,
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(DbError::from)?);
    }
    Ok(rows)
}

/// Column names of a statement as the engine describes it. Empty when the
/// engine cannot describe it.
async fn describe_columns(pool: &DbPool, statement: &str) -> Vec<String> {
    use sqlx::{Column, Executor};

    let described: Result<Vec<String>, sqlx::Error> = impl_db_dispatch!(pool, {
        Postgres(p) => p
            .describe(statement)
            .await
            .map(|d| d.columns().iter().map(|c| c.name().to_string()).collect()),
        SQLite(p) => p
            .describe(statement)
            .await
            .map(|d| d.columns().iter().map(|c| c.name().to_string()).collect()),
    });

    described.unwrap_or_else(|e| {
        debug!(error = %e, "Could not describe statement columns");
        Vec::new()
    })
}

async fn with_optional_timeout<F, T>(query_timeout: Option<Duration>, future: F) -> DbResult<T>
where
    F: std::future::Future<Output = T>,
{
    match query_timeout {
        None => Ok(future.await),
        Some(limit) => timeout(limit, future)
            .await
            .map_err(|_| DbError::timeout("query execution", limit.as_secs())),
    }
}

// =============================================================================
// Flavor-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: Option<u32>,
        query_timeout: Option<Duration>,
    ) -> DbResult<Vec<PgRow>> {
        use sqlx::Executor;
        let stream = pool.fetch(sql);
        let results = with_optional_timeout(query_timeout, async move {
            match row_limit {
                Some(limit) => stream.take(limit as usize).collect::<Vec<_>>().await,
                None => stream.collect::<Vec<_>>().await,
            }
        })
        .await?;
        collect_rows(results)
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: Option<u32>,
        query_timeout: Option<Duration>,
    ) -> DbResult<Vec<SqliteRow>> {
        use sqlx::Executor;
        let stream = pool.fetch(sql);
        let results = with_optional_timeout(query_timeout, async move {
            match row_limit {
                Some(limit) => stream.take(limit as usize).collect::<Vec<_>>().await,
                None => stream.collect::<Vec<_>>().await,
            }
        })
        .await?;
        collect_rows(results)
    }
}
