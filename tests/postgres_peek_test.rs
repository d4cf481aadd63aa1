//! Integration tests against a live PostgreSQL server.
//!
//! These tests are skipped unless TEST_POSTGRES_URL points at a database the
//! tests may create tables in.

use peak::config::Config;
use peak::db::{QueryExecutor, Session, SessionOptions, build_plan};
use peak::models::{Flavor, QueryRequest};
use peak::{DbError, peek};

fn postgres_url() -> Option<String> {
    std::env::var("TEST_POSTGRES_URL").ok()
}

async fn seed(url: &str, table: &str) {
    let pool = sqlx::PgPool::connect(url)
        .await
        .expect("Failed to connect to test database");
    sqlx::query(&format!("DROP TABLE IF EXISTS public.\"{}\"", table))
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(&format!(
        "CREATE TABLE public.\"{}\" (id INT PRIMARY KEY, name TEXT, price NUMERIC(10, 2), created_at TIMESTAMPTZ)",
        table
    ))
    .execute(&pool)
    .await
    .unwrap();
    for id in 1..=3 {
        sqlx::query(&format!(
            "INSERT INTO public.\"{}\" VALUES ($1, $2, 12.50, '2024-01-02T03:04:05Z')",
            table
        ))
        .bind(id)
        .bind(format!("item-{}", id))
        .execute(&pool)
        .await
        .unwrap();
    }
    pool.close().await;
}

#[tokio::test]
async fn test_postgres_list_and_preview() {
    let Some(url) = postgres_url() else {
        eprintln!("TEST_POSTGRES_URL not set, skipping");
        return;
    };
    seed(&url, "peak_items").await;

    let config = Config {
        source: Some(url.clone()),
        ..Config::default()
    };
    let listing = peek(&config).await.unwrap();
    assert!(listing.contains("| peak_items "));

    let config = Config {
        source: Some(url.clone()),
        table: Some("peak_items".to_string()),
        limit: 2,
        ..Config::default()
    };
    let preview = peek(&config).await.unwrap();
    assert!(preview.contains("item-1"));
    assert!(preview.contains("12.50"));
    assert!(preview.contains("2 rows in set"));
}

#[tokio::test]
async fn test_postgres_session_is_read_only() {
    let Some(url) = postgres_url() else {
        eprintln!("TEST_POSTGRES_URL not set, skipping");
        return;
    };
    seed(&url, "peak_read_only").await;

    let plan = build_plan(&url, &QueryRequest::ListTables, Flavor::Postgres).unwrap();
    let session = Session::open(&url, Flavor::Postgres, &plan, &SessionOptions::default())
        .await
        .unwrap();
    let write = QueryExecutor::new()
        .execute(session.pool(), "DELETE FROM peak_read_only", None)
        .await;
    session.close().await;

    let err = write.unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));
    assert_eq!(err.sql_state(), Some("25006"));
}

#[tokio::test]
async fn test_postgres_missing_table() {
    let Some(url) = postgres_url() else {
        eprintln!("TEST_POSTGRES_URL not set, skipping");
        return;
    };

    let config = Config {
        source: Some(url),
        table: Some("peak_no_such_table".to_string()),
        ..Config::default()
    };
    let err = peek(&config).await.unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));
    assert_eq!(err.sql_state(), Some("42P01"));
}
