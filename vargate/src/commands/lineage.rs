// vargate/src/commands/lineage.rs
//
// USE CASE: Static lineage, whole DAG or one table's slice of it.

use vargate_core::application::{LineageReport, Session};
use vargate_core::domain::lineage::Layer;

use crate::cli::LineageFormat;

pub fn execute(
    session: &Session,
    table: Option<String>,
    downstream: bool,
    format: LineageFormat,
) -> anyhow::Result<()> {
    let registry = &session.lineage;

    // Downstream listing is a plain walk, not a report.
    if downstream && let Some(name) = &table {
        let tables = registry.downstream_of(name)?;
        match format {
            LineageFormat::Json => {
                let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&names)?);
            }
            _ => {
                println!("🔽 Downstream of {name}:");
                for t in &tables {
                    println!("   ➜ {} ({})", t.name, t.layer);
                }
                if tables.is_empty() {
                    println!("   (none)");
                }
            }
        }
        return Ok(());
    }

    let report = match &table {
        Some(name) => LineageReport::upstream_of(registry, name)?,
        None => LineageReport::full(registry)?,
    };

    match format {
        LineageFormat::Json => println!("{}", report.to_json()?),
        LineageFormat::Mermaid => {
            println!("```mermaid");
            println!("{}", report.to_mermaid());
            println!("```");
        }
        LineageFormat::Text => {
            if let Some(name) = &table {
                let desc = registry.describe(name)?;
                println!("🔗 {} ({})", desc.name, desc.layer);
                println!("   {}", desc.description);
                println!("   Grain: {}", desc.grain);
                if !desc.key_columns.is_empty() {
                    println!("   Keys: {}", desc.key_columns.join(", "));
                }
                if !desc.measure_columns.is_empty() {
                    println!("   Measures: {}", desc.measure_columns.join(", "));
                }
                println!("\n🔼 Upstream (nearest first):");
                for t in registry.upstream_chain(name)? {
                    println!("   ➜ {} ({})", t.name, t.layer);
                }
            } else {
                println!("🏛️  Tables by layer:");
                for layer in Layer::ALL {
                    let names: Vec<&str> = registry.by_layer(layer).map(|t| t.name.as_str()).collect();
                    if !names.is_empty() {
                        println!("   {layer}: {}", names.join(", "));
                    }
                }
            }
            println!("\n🧭 Traversal plan:");
            for (i, layer) in report.layers.iter().enumerate() {
                println!("   {}. {}", i + 1, layer.join(", "));
            }
            println!("\n📊 {} table(s), {} edge(s)", report.nodes.len(), report.edges.len());
        }
    }
    Ok(())
}
