// vargate/src/commands/variance.rs
//
// USE CASE: Run a statement or template, then rank its variance drivers.

use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use vargate_core::application::{Session, VarianceOptions, VarianceReport};
use vargate_core::domain::query::QueryRequest;

use super::{parse_params, run_or_exit, text_params};
use crate::cli::OutputFormat;

pub fn execute(
    session: &Session,
    sql: Option<String>,
    template: Option<String>,
    raw_params: &[String],
    options: &VarianceOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let request = match (sql, template) {
        (_, Some(name)) => session
            .templates
            .render_by_name(&name, &parse_params(raw_params)?)?
            .into_request(),
        (Some(sql), None) => QueryRequest::new(sql).with_params(text_params(raw_params)?),
        (None, None) => anyhow::bail!("either --sql or --template is required"),
    };

    let mut executor = session.open_executor()?;
    let result = run_or_exit(&mut executor, request, None)?;
    if result.truncated {
        tracing::warn!(rows = result.row_count, "Result truncated, variance covers fetched rows only");
    }
    let report = VarianceReport::build(&result, options);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            println!(
                "📉 Variance {:.2} ({:.2}%) on baseline {:.2}{}",
                report.variance_amount,
                report.variance_pct,
                report.total_baseline,
                if report.material { " ⚠️  material" } else { "" }
            );
            println!(
                "   Materiality: |amount| >= {:.2} and |pct| >= {:.2}%",
                report.abs_threshold, report.pct_threshold
            );

            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec![
                options.dimension.as_str(),
                "Variance",
                "Pct",
                "Share",
                "Pareto",
                "Material",
            ]);
            let pareto = report.decomposition.pareto_drivers.len();
            for (rank, d) in report.decomposition.drivers.iter().enumerate() {
                let material = report.material_drivers.contains(&d.value);
                table.add_row(vec![
                    d.value.clone(),
                    format!("{:.2}", d.variance_amount),
                    format!("{:.2}%", d.variance_pct),
                    format!("{:.2}%", d.contribution_pct),
                    if rank < pareto { "✅" } else { "" }.to_string(),
                    if material { "⚠️" } else { "" }.to_string(),
                ]);
            }
            println!("{table}");
            println!(
                "🎯 {} driver(s) cover {:.2}% of absolute variance",
                pareto, report.decomposition.pareto_coverage_pct
            );
        }
    }
    Ok(())
}
