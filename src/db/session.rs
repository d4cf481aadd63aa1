//! Engine sessions.
//!
//! A session is a database-specific pool (`PgPool` or `SqlitePool`) capped at
//! one connection. Every connection the pool opens first runs the plan's
//! attach statements, so the query always sees the source the plan was built
//! for. Sessions live for a single invocation and must be closed.

use crate::error::{DbError, DbResult};
use crate::models::source::{is_url_source, keyword_pairs, sqlite_path};
use crate::models::{Flavor, QueryPlan, mask_source};
use sqlx::{
    Connection, Executor, PgConnection, PgPool, SqlitePool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default time allowed to open the engine connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Anonymous on-disk temporary database SQLite sources are attached to.
///
/// Not `sqlite::memory:`: databases attached to an in-memory connection are
/// themselves opened in memory, so the file would never be read.
const SQLITE_ENGINE_URL: &str = "sqlite:";

/// Options for opening a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Database-specific connection pool.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }
}

/// An open, attached engine session.
#[derive(Debug)]
pub struct Session {
    pool: DbPool,
    masked_source: String,
}

impl Session {
    /// Open a session for `plan` against `source`.
    ///
    /// The pool connects eagerly so attach failures (bad credentials, unknown
    /// host, unreadable file) are reported here rather than by the query.
    pub async fn open(
        source: &str,
        flavor: Flavor,
        plan: &QueryPlan,
        options: &SessionOptions,
    ) -> DbResult<Self> {
        let masked_source = mask_source(source);
        info!(source = %masked_source, flavor = %flavor, "Opening session");

        let attach = Arc::new(plan.attach.clone());
        let pool = match flavor {
            Flavor::Postgres => {
                let connect_options = pg_connect_options(source)?;
                Self::reach_server(&connect_options, options.connect_timeout).await?;

                let pool = PgPoolOptions::new()
                    .min_connections(0)
                    .max_connections(1)
                    .acquire_timeout(options.connect_timeout)
                    .after_connect(move |conn, _meta| {
                        let attach = Arc::clone(&attach);
                        Box::pin(async move {
                            for statement in attach.iter() {
                                (&mut *conn).execute(statement.as_str()).await?;
                            }
                            Ok(())
                        })
                    })
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| Self::connect_error(flavor, e, options.connect_timeout))?;
                DbPool::Postgres(pool)
            }
            Flavor::Sqlite => {
                let path = sqlite_path(source);
                if !Path::new(path).is_file() {
                    return Err(DbError::connection(
                        format!("SQLite database file not found: {}", path),
                        "Check the path, or pass --flavor postgres for a PostgreSQL source",
                    ));
                }

                let connect_options = SqliteConnectOptions::from_str(SQLITE_ENGINE_URL)
                    .map_err(|e| DbError::internal(format!("SQLite engine options: {}", e)))?;

                let pool = SqlitePoolOptions::new()
                    .min_connections(0)
                    .max_connections(1)
                    .acquire_timeout(options.connect_timeout)
                    .after_connect(move |conn, _meta| {
                        let attach = Arc::clone(&attach);
                        Box::pin(async move {
                            for statement in attach.iter() {
                                (&mut *conn).execute(statement.as_str()).await?;
                            }
                            Ok(())
                        })
                    })
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| Self::connect_error(flavor, e, options.connect_timeout))?;
                DbPool::SQLite(pool)
            }
        };

        debug!(source = %masked_source, "Session attached");
        Ok(Self {
            pool,
            masked_source,
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close the session. Must be called on success and on error.
    pub async fn close(self) {
        self.pool.close().await;
        info!(source = %self.masked_source, "Session closed");
    }

    /// One direct connection attempt. The pool retries failed connects until
    /// its acquire timeout, which would hide the server's own answer.
    async fn reach_server(options: &PgConnectOptions, connect_timeout: Duration) -> DbResult<()> {
        match timeout(connect_timeout, PgConnection::connect_with(options)).await {
            Err(_) => Err(DbError::timeout("connect", connect_timeout.as_secs())),
            Ok(Err(e)) => Err(Self::connect_error(Flavor::Postgres, e, connect_timeout)),
            Ok(Ok(conn)) => {
                if let Err(e) = conn.close().await {
                    debug!(error = %e, "Closing reachability connection failed");
                }
                Ok(())
            }
        }
    }

    fn connect_error(flavor: Flavor, error: sqlx::Error, connect_timeout: Duration) -> DbError {
        // Engine rejections of the attach statements keep their native message.
        if matches!(error, sqlx::Error::Database(_)) {
            return DbError::from(error);
        }
        if matches!(error, sqlx::Error::PoolTimedOut) {
            return DbError::timeout("connection acquire", connect_timeout.as_secs());
        }
        warn!(error = %error, "Failed to open session");
        DbError::connection(
            format!("Failed to connect: {}", error),
            connection_suggestion(flavor, &error),
        )
    }
}

/// Connect options for a PostgreSQL source in URL or `key=value` form.
pub fn pg_connect_options(source: &str) -> DbResult<PgConnectOptions> {
    if is_url_source(source) {
        return PgConnectOptions::from_str(source).map_err(|e| {
            DbError::connection(
                format!("Invalid PostgreSQL connection string: {}", e),
                format!(
                    "Check the connection URL format: {}",
                    Flavor::Postgres.source_example()
                ),
            )
        });
    }

    let mut options = PgConnectOptions::new();
    for (key, value) in keyword_pairs(source)? {
        options = match key.as_str() {
            "host" | "hostaddr" => options.host(&value),
            "port" => options.port(value.parse().map_err(|_| {
                DbError::connection(
                    format!("Invalid port: {}", value),
                    "port must be a number such as 5432",
                )
            })?),
            "dbname" => options.database(&value),
            "user" => options.username(&value),
            "password" => options.password(&value),
            "application_name" => options.application_name(&value),
            "sslmode" => options.ssl_mode(PgSslMode::from_str(&value).map_err(|_| {
                DbError::connection(
                    format!("Invalid sslmode: {}", value),
                    "Use disable, allow, prefer, require, verify-ca or verify-full",
                )
            })?),
            other => {
                warn!(parameter = other, "Ignoring unsupported connection parameter");
                options
            }
        };
    }
    Ok(options)
}

/// Generate a helpful suggestion for connection errors.
pub fn connection_suggestion(flavor: Flavor, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {} server is running and accessible", flavor);
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password in the connection string".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try sslmode=disable".to_string();
    }

    format!(
        "Verify the source format: {} (or override with --flavor)",
        flavor.source_example()
    )
}
