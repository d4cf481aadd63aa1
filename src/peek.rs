//! The peek operation: one invocation end to end.

use crate::config::Config;
use crate::db::{QueryExecutor, Session, build_plan};
use crate::error::DbResult;
use crate::models::{Flavor, QueryPlan, QueryResult, mask_source};
use crate::render::render;
use tracing::{debug, info};

/// Resolve, plan, execute and render according to `config`.
///
/// Configuration and validation errors are returned before any connection
/// is opened.
pub async fn peek(config: &Config) -> DbResult<String> {
    let source = config.source()?;
    let request = config.request()?;
    let flavor = config.resolve_flavor(source);
    debug!(source = %mask_source(source), flavor = %flavor, "Detected database flavor");

    let plan = build_plan(source, &request, flavor)?;
    let result = run_plan(source, flavor, &plan, request.row_limit(), config).await?;

    info!(title = %plan.title, rows = result.row_count(), "Fetched rows");
    Ok(render(&plan.title, &result, config.format))
}

/// Open a session for `plan`, run its statement, and close the session
/// whether or not the statement succeeded.
pub async fn run_plan(
    source: &str,
    flavor: Flavor,
    plan: &QueryPlan,
    row_limit: Option<u32>,
    config: &Config,
) -> DbResult<QueryResult> {
    let session = Session::open(source, flavor, plan, &config.session_options()).await?;
    let result = QueryExecutor::new()
        .with_timeout(config.query_timeout_duration())
        .with_raw_binary(config.raw_binary)
        .execute(session.pool(), &plan.statement, row_limit)
        .await;
    session.close().await;
    result
}
