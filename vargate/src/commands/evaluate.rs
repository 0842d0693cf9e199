// vargate/src/commands/evaluate.rs
//
// USE CASE: Score one or more runs' findings against the anomaly catalog.

use anyhow::Context;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vargate_core::application::Session;
use vargate_core::domain::evaluation::{EvaluationResult, Finding, evaluate, summarize};

use crate::cli::OutputFormat;

/// A findings file is either a bare array or a report object with a `findings` key.
#[derive(Deserialize)]
#[serde(untagged)]
enum FindingsFile {
    Bare(Vec<Finding>),
    Report { findings: Vec<Finding> },
}

fn read_findings(path: &Path) -> anyhow::Result<Vec<Finding>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read findings at {}", path.display()))?;
    let file: FindingsFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse findings JSON at {}", path.display()))?;
    Ok(match file {
        FindingsFile::Bare(findings) | FindingsFile::Report { findings } => findings,
    })
}

pub fn execute(session: &Session, paths: &[PathBuf], format: OutputFormat) -> anyhow::Result<()> {
    let mut results: Vec<EvaluationResult> = Vec::with_capacity(paths.len());
    for path in paths {
        let findings = read_findings(path)?;
        results.push(evaluate(&findings, &session.anomalies));
    }
    let summary = summarize(&results);

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "catalog_version": session.anomalies.version,
                "runs": results,
                "summary": summary,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec![
                "Run",
                "Findings",
                "Recall",
                "Precision",
                "Evidence",
                "Depth",
                "Unmatched rules",
            ]);
            for (path, r) in paths.iter().zip(&results) {
                table.add_row(vec![
                    path.display().to_string(),
                    r.findings_count.to_string(),
                    format!("{:.2}", r.recall),
                    format!("{:.2}", r.precision_proxy),
                    format!("{:.2}", r.evidence_sufficiency),
                    format!("{:.2}", r.root_cause_depth),
                    r.unmatched_rules.join(", "),
                ]);
            }
            println!("{table}");

            for r in &results {
                for (rule, findings) in &r.matches {
                    println!("   ✅ {rule} <- {}", findings.join(", "));
                }
            }

            if summary.runs > 1 {
                let c = &summary.consistency;
                println!(
                    "🧪 {} runs: recall {:.2} ± {:.2}, precision {:.2} ± {:.2}",
                    c.runs, c.recall_mean, c.recall_stddev, c.precision_mean, c.precision_stddev
                );
                if !summary.unmatched_rules_union.is_empty() {
                    println!(
                        "⚠️  Missed in at least one run: {}",
                        summary.unmatched_rules_union.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}
