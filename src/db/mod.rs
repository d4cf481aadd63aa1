//! Database access layer.
//!
//! - Source dispatch: flavor-specific query plans
//! - Sessions: attached single-connection pools
//! - Query execution
//! - Row decoding
//! - Flavor dispatch macro

#[macro_use]
pub mod macros;
pub mod dispatch;
pub mod executor;
pub mod session;
pub mod types;

pub use dispatch::{POSTGRES_SCHEMA, attach_statements, build_plan};
pub use executor::QueryExecutor;
pub use session::{DbPool, Session, SessionOptions};
