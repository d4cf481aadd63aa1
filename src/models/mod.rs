//! Data models for peak.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod source;

// Re-export commonly used types
pub use query::{DEFAULT_ROW_LIMIT, QueryPlan, QueryRequest, QueryResult, TABLES_TITLE};
pub use source::{FLAVOR_KEYWORDS, Flavor, detect_flavor, mask_source};
