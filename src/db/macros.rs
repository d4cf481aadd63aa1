//! Flavor dispatch macro.
//!
//! Generates the `match` over [`DbPool`](crate::db::session::DbPool)
//! variants so per-flavor code paths read side by side.

/// Macro for generating flavor dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::session::DbPool::$variant($p) => $body,
            )+
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::db::session::DbPool;

    fn label(pool: &DbPool) -> &'static str {
        impl_db_dispatch!(pool, {
            Postgres(_p) => "postgres",
            SQLite(_p) => "sqlite",
        })
    }

    #[tokio::test]
    async fn test_dispatch_selects_variant() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let db_pool = DbPool::SQLite(pool);
        assert_eq!(label(&db_pool), "sqlite");
        db_pool.close().await;
    }
}
