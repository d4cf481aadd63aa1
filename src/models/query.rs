//! Query-related data models.
//!
//! This module defines what an invocation asks for, the plan built from it,
//! and the rows that come back.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default number of rows shown by a preview.
pub const DEFAULT_ROW_LIMIT: u32 = 5;

/// Title shown above a table listing.
pub const TABLES_TITLE: &str = "Tables";

/// What one invocation wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum QueryRequest {
    /// List the tables of the source.
    ListTables,
    /// Show the first `limit` rows of `table`.
    Preview { table: String, limit: u32 },
}

impl QueryRequest {
    /// Build a request from an optional table name and a raw limit.
    ///
    /// The limit is validated even when no table is given, so a bad flag is
    /// reported regardless of what is being listed.
    pub fn new(table: Option<&str>, limit: i64) -> DbResult<Self> {
        if limit < 1 {
            return Err(DbError::invalid_limit(limit));
        }
        let limit = u32::try_from(limit).map_err(|_| {
            DbError::invalid_input(format!("limit {} is larger than {}", limit, u32::MAX))
        })?;

        match table {
            None => Ok(Self::ListTables),
            Some(t) if t.trim().is_empty() => {
                Err(DbError::invalid_input("Table name cannot be empty"))
            }
            Some(t) => Ok(Self::Preview {
                table: t.to_string(),
                limit,
            }),
        }
    }

    /// Row cap applied while fetching. Listings are not capped.
    pub fn row_limit(&self) -> Option<u32> {
        match self {
            Self::ListTables => None,
            Self::Preview { limit, .. } => Some(*limit),
        }
    }
}

/// A fully resolved, flavor-specific plan for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Label shown above the rendered result
    pub title: String,
    /// Statements run on every new engine connection before the query
    pub attach: Vec<String>,
    /// The query itself
    pub statement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in select order
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create an empty result.
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
