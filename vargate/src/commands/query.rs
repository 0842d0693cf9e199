// vargate/src/commands/query.rs
//
// USE CASE: Execute one ad-hoc statement through the guarded executor.

use std::path::PathBuf;

use vargate_core::application::Session;
use vargate_core::domain::query::QueryRequest;

use super::{run_and_print, text_params};
use crate::cli::OutputFormat;

pub fn execute(
    session: &Session,
    sql: String,
    raw_params: &[String],
    max_rows: Option<usize>,
    format: OutputFormat,
    audit_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut request = QueryRequest::new(sql).with_params(text_params(raw_params)?);
    if let Some(limit) = max_rows {
        request = request.with_max_rows(limit);
    }

    let executor = session.open_executor()?;
    tracing::debug!(engine = executor.engine_name(), "Executor ready");
    run_and_print(executor, request, format, audit_out)
}
