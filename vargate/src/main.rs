// vargate/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vargate_core::application::VarianceOptions;

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing) on stderr so stdout stays machine-readable.
    // RUST_LOG=debug vargate query ... to see guard and executor details
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        dir,
        db_path,
        engine,
        command,
    } = Cli::parse();

    // Catalogs and settings are only loaded by commands that need them.
    let session = || commands::load_session(&dir, db_path.clone(), engine);

    match command {
        // --- USE CASE: AD-HOC QUERY ---
        Commands::Query {
            sql,
            params,
            max_rows,
            format,
            audit_out,
        } => commands::query::execute(&session()?, sql, &params, max_rows, format, audit_out),

        // --- USE CASE: TEMPLATES ---
        Commands::Template { action } => commands::template::execute(&session()?, action),

        // --- USE CASE: LINEAGE ---
        Commands::Lineage {
            table,
            downstream,
            format,
        } => commands::lineage::execute(&session()?, table, downstream, format),

        // --- USE CASE: CONFIDENCE SCORE ---
        Commands::Score {
            breadth,
            depth,
            explanation,
            exclusion,
            quality,
            temporal,
            format,
        } => commands::score::execute(
            [breadth, depth, explanation, exclusion, quality, temporal],
            format,
        ),

        // --- USE CASE: VARIANCE DECOMPOSITION ---
        Commands::Variance {
            sql,
            template,
            params,
            dimension,
            actual_col,
            baseline_col,
            variance_col,
            pareto,
            pct_threshold,
            abs_threshold,
            format,
        } => {
            let options = VarianceOptions {
                dimension,
                actual_col,
                baseline_col,
                variance_col,
                pareto_threshold: pareto,
                pct_threshold,
                abs_threshold,
            };
            commands::variance::execute(&session()?, sql, template, &params, &options, format)
        }

        // --- USE CASE: EVALUATION ---
        Commands::Evaluate { findings, format } => {
            commands::evaluate::execute(&session()?, &findings, format)
        }
    }
}
