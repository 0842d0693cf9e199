// vargate/src/commands/mod.rs

pub mod evaluate;
pub mod lineage;
pub mod query;
pub mod score;
pub mod template;
pub mod variance;

use anyhow::{Context, bail};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use vargate_core::application::{ExecutionError, QueryExecutor, Session};
use vargate_core::domain::query::{QueryParams, QueryRequest, QueryResult, SqlValue};
use vargate_core::infrastructure::adapters::Engine;
use vargate_core::infrastructure::config::load_settings;

use crate::cli::OutputFormat;

/// Settings from `dir`, CLI flags on top, then every catalog loaded and validated.
pub fn load_session(
    dir: &Path,
    db_path: Option<PathBuf>,
    engine: Option<Engine>,
) -> anyhow::Result<Session> {
    let mut settings = load_settings(dir)?;
    if let Some(path) = db_path {
        settings.warehouse_path = path;
    }
    if let Some(engine) = engine {
        settings.engine = engine;
    }
    Ok(Session::load(settings)?)
}

/// `name=value` pairs from repeated `--param` flags.
pub fn parse_params(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    for item in raw {
        let (name, value) = item
            .split_once('=')
            .with_context(|| format!("parameter '{item}' must look like NAME=VALUE"))?;
        let name = name.trim().trim_start_matches(':');
        if name.is_empty() {
            bail!("parameter '{item}' has an empty name");
        }
        if params.insert(name.to_string(), value.to_string()).is_some() {
            bail!("parameter '{name}' given twice");
        }
    }
    Ok(params)
}

pub fn print_result(result: &QueryResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(result.columns.clone());
            for row in &result.rows {
                let cells: Vec<String> = result
                    .columns
                    .iter()
                    .map(|c| row.get(c).map(ToString::to_string).unwrap_or_default())
                    .collect();
                table.add_row(cells);
            }
            println!("{table}");
            println!(
                "📊 {} row(s) in {:.1} ms{}",
                result.row_count,
                result.execution_time_ms,
                if result.truncated { " (truncated)" } else { "" }
            );
        }
    }
    Ok(())
}

/// Runs one request and optionally saves the audit trail. Guard rejections and
/// engine failures end the process with status 1.
pub fn run_or_exit(
    executor: &mut QueryExecutor,
    request: QueryRequest,
    audit_out: Option<PathBuf>,
) -> anyhow::Result<QueryResult> {
    let outcome = executor.execute(request);

    if let Some(path) = audit_out {
        std::fs::write(&path, executor.audit_json()?)
            .with_context(|| format!("Failed to write audit trail to {}", path.display()))?;
    }

    match outcome {
        Ok(result) => Ok(result),
        Err(err) => {
            let label = match err {
                ExecutionError::Rejected(_) => "🛡️  Rejected",
                ExecutionError::Failed(_) => "❌ Failed",
                ExecutionError::TimedOut { .. } => "⏱️  Timed out",
            };
            eprintln!("{label}: {err}");
            std::process::exit(1);
        }
    }
}

pub fn run_and_print(
    mut executor: QueryExecutor,
    request: QueryRequest,
    format: OutputFormat,
    audit_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let result = run_or_exit(&mut executor, request, audit_out)?;
    print_result(&result, format)
}

/// Ad-hoc `name=value` pairs bound as text.
pub fn text_params(raw: &[String]) -> anyhow::Result<QueryParams> {
    let named = parse_params(raw)?;
    Ok(if named.is_empty() {
        QueryParams::None
    } else {
        QueryParams::Named(
            named
                .into_iter()
                .map(|(name, value)| (name, SqlValue::Text(value)))
                .collect(),
        )
    })
}
