// vargate/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use vargate_core::infrastructure::adapters::Engine;

#[derive(Parser)]
#[command(name = "vargate")]
#[command(about = "Read-only query boundary for variance investigations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory holding vargate.yaml; relative paths resolve against it
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Warehouse file (overrides settings and VARGATE_DB_PATH)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Warehouse engine: sqlite | duckdb
    #[arg(long, global = true, value_parser = parse_engine)]
    pub engine: Option<Engine>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_engine(raw: &str) -> Result<Engine, String> {
    raw.parse().map_err(|e: vargate_core::infrastructure::error::InfrastructureError| e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LineageFormat {
    #[default]
    Text,
    Mermaid,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ⚡ Runs one read-only statement through the guarded executor
    Query {
        sql: String,

        /// Named parameter bound to :name (repeatable, ex: --param period=2024-03)
        #[arg(long = "param", short = 'p', value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Row cap for this statement (defaults to settings.max_rows)
        #[arg(long)]
        max_rows: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write the audit trail (JSON) to this file
        #[arg(long)]
        audit_out: Option<PathBuf>,
    },

    /// 📋 Lists, shows or runs investigative templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// 🔗 Shows table lineage (whole DAG or one table's upstream)
    Lineage {
        /// Focus on one table
        #[arg(long, short)]
        table: Option<String>,

        /// List downstream tables instead of upstream ones
        #[arg(long, requires = "table")]
        downstream: bool,

        #[arg(long, value_enum, default_value_t = LineageFormat::Text)]
        format: LineageFormat,
    },

    /// 🎯 Computes a confidence score from six factors in [0, 1]
    Score {
        #[arg(long, default_value_t = 0.5)]
        breadth: f64,
        #[arg(long, default_value_t = 0.5)]
        depth: f64,
        #[arg(long, default_value_t = 0.5)]
        explanation: f64,
        #[arg(long, default_value_t = 0.5)]
        exclusion: f64,
        #[arg(long, default_value_t = 0.5)]
        quality: f64,
        #[arg(long, default_value_t = 0.5)]
        temporal: f64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// 📉 Decomposes a query's variance along one dimension (Pareto drivers, materiality)
    Variance {
        /// Statement to run (use --template for a registered template instead)
        #[arg(long, conflicts_with = "template", required_unless_present = "template")]
        sql: Option<String>,

        #[arg(long)]
        template: Option<String>,

        #[arg(long = "param", short = 'p', value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Dimension column to group drivers by
        #[arg(long = "by")]
        dimension: String,

        #[arg(long, default_value = "actual_usd")]
        actual_col: String,
        #[arg(long, default_value = "budget_usd")]
        baseline_col: String,
        #[arg(long, default_value = "variance_usd")]
        variance_col: String,

        /// Cumulative share (%) of absolute variance the drivers must cover
        #[arg(long, default_value_t = 80.0)]
        pareto: f64,
        #[arg(long, default_value_t = 5.0)]
        pct_threshold: f64,
        #[arg(long, default_value_t = 1000.0)]
        abs_threshold: f64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// 🧪 Scores findings files (one per run) against the anomaly catalog
    Evaluate {
        #[arg(required = true)]
        findings: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Lists registered templates
    List,

    /// Shows a template's parameters and body
    Show { name: String },

    /// Renders and executes a template
    Run {
        name: String,

        #[arg(long = "param", short = 'p', value_name = "NAME=VALUE")]
        params: Vec<String>,

        #[arg(long)]
        max_rows: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write the audit trail (JSON) to this file
        #[arg(long)]
        audit_out: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_query() -> Result<()> {
        let args = Cli::parse_from([
            "vargate",
            "query",
            "SELECT * FROM t WHERE period = :period",
            "-p",
            "period=2024-03",
            "--max-rows",
            "10",
        ]);
        assert_eq!(args.dir.to_string_lossy(), ".");
        match args.command {
            Commands::Query {
                sql,
                params,
                max_rows,
                format,
                audit_out,
            } => {
                assert!(sql.starts_with("SELECT"));
                assert_eq!(params, vec!["period=2024-03"]);
                assert_eq!(max_rows, Some(10));
                assert_eq!(format, OutputFormat::Table);
                assert!(audit_out.is_none());
                Ok(())
            }
            _ => bail!("Expected Query command"),
        }
    }

    #[test]
    fn test_cli_parse_global_engine() -> Result<()> {
        let args = Cli::parse_from(["vargate", "lineage", "--engine", "duckdb", "-t", "mart_pnl_report"]);
        assert_eq!(args.engine, Some(Engine::DuckDb));
        match args.command {
            Commands::Lineage {
                table,
                downstream,
                format,
            } => {
                assert_eq!(table.as_deref(), Some("mart_pnl_report"));
                assert!(!downstream);
                assert_eq!(format, LineageFormat::Text);
                Ok(())
            }
            _ => bail!("Expected Lineage command"),
        }
    }

    #[test]
    fn test_cli_parse_template_run() -> Result<()> {
        let args = Cli::parse_from([
            "vargate",
            "template",
            "run",
            "cost_center_drill",
            "--param",
            "cost_center=CC-300",
            "--format",
            "json",
            "--audit-out",
            "trail.json",
        ]);
        match args.command {
            Commands::Template {
                action:
                    TemplateAction::Run {
                        name,
                        params,
                        format,
                        audit_out,
                        ..
                    },
            } => {
                assert_eq!(name, "cost_center_drill");
                assert_eq!(params, vec!["cost_center=CC-300"]);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(audit_out, Some(PathBuf::from("trail.json")));
                Ok(())
            }
            _ => bail!("Expected Template Run command"),
        }
    }

    #[test]
    fn test_cli_parse_score_defaults() -> Result<()> {
        let args = Cli::parse_from(["vargate", "score", "--breadth", "0.9"]);
        match args.command {
            Commands::Score { breadth, depth, .. } => {
                assert_eq!(breadth, 0.9);
                assert_eq!(depth, 0.5);
                Ok(())
            }
            _ => bail!("Expected Score command"),
        }
    }

    #[test]
    fn test_cli_parse_variance() -> Result<()> {
        let args = Cli::parse_from([
            "vargate",
            "variance",
            "--template",
            "variance_summary",
            "--by",
            "department",
        ]);
        match args.command {
            Commands::Variance {
                sql,
                template,
                dimension,
                baseline_col,
                pareto,
                ..
            } => {
                assert!(sql.is_none());
                assert_eq!(template.as_deref(), Some("variance_summary"));
                assert_eq!(dimension, "department");
                assert_eq!(baseline_col, "budget_usd");
                assert_eq!(pareto, 80.0);
                Ok(())
            }
            _ => bail!("Expected Variance command"),
        }
    }

    #[test]
    fn test_cli_variance_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["vargate", "variance", "--by", "department"]).is_err());
        assert!(
            Cli::try_parse_from([
                "vargate", "variance", "--sql", "SELECT 1", "--template", "t", "--by", "d",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_cli_downstream_requires_table() {
        assert!(Cli::try_parse_from(["vargate", "lineage", "--downstream"]).is_err());
        assert!(Cli::try_parse_from(["vargate", "evaluate"]).is_err());
    }
}
