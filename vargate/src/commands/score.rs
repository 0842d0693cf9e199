// vargate/src/commands/score.rs
//
// USE CASE: Confidence score from six evidence factors.

use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use vargate_core::domain::confidence::{ConfidenceInput, score};

use crate::cli::OutputFormat;

pub fn execute(factors: [f64; 6], format: OutputFormat) -> anyhow::Result<()> {
    let [breadth, depth, explanation, exclusion, quality, temporal] = factors;
    let input = ConfidenceInput::new(breadth, depth, explanation, exclusion, quality, temporal)?;
    let result = score(&input);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["Factor", "Value", "Weight", "Contribution"]);
            for (name, value, weight) in input.breakdown() {
                table.add_row(vec![
                    name.to_string(),
                    format!("{value:.2}"),
                    format!("{weight:.2}"),
                    format!("{:.4}", value * weight),
                ]);
            }
            println!("{table}");
            println!("🎯 Confidence: {:.3} ({})", result.score, result.level);
        }
    }
    Ok(())
}
