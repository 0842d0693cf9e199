// vargate/src/commands/template.rs
//
// USE CASE: Browse and run the investigative templates.

use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use vargate_core::application::Session;

use super::{parse_params, run_and_print};
use crate::cli::TemplateAction;

pub fn execute(session: &Session, action: TemplateAction) -> anyhow::Result<()> {
    match action {
        TemplateAction::List => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["Template", "Parameters", "Description"]);
            for template in session.templates.list() {
                let params: Vec<String> = template
                    .params
                    .iter()
                    .map(|p| {
                        if p.required {
                            format!("{} ({})", p.name, p.kind)
                        } else {
                            format!("[{}] ({})", p.name, p.kind)
                        }
                    })
                    .collect();
                table.add_row(vec![
                    template.name.clone(),
                    params.join(", "),
                    template.description.clone(),
                ]);
            }
            println!("{table}");
            println!("📋 {} template(s)", session.templates.len());
        }

        TemplateAction::Show { name } => {
            let template = session.templates.get(&name)?;
            println!("📋 {} - {}", template.name, template.description);
            for p in &template.params {
                let flag = if p.required { "required" } else { "optional" };
                println!("   • :{} [{}, {}] {}", p.name, p.kind, flag, p.description);
            }
            println!("\n{}", template.sql.trim_end());
        }

        TemplateAction::Run {
            name,
            params,
            max_rows,
            format,
            audit_out,
        } => {
            let values = parse_params(&params)?;
            let rendered = session.templates.render_by_name(&name, &values)?;
            let mut request = rendered.into_request();
            if let Some(limit) = max_rows {
                request = request.with_max_rows(limit);
            }
            run_and_print(session.open_executor()?, request, format, audit_out)?;
        }
    }
    Ok(())
}
