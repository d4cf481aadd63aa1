//! peak library
//!
//! Peek onto tables in SQLite and PostgreSQL databases: detect the flavor of
//! a source, build a read-only plan, run it, and render the rows.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod peek;
pub mod render;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use peek::peek;
