use std::collections::HashSet;
use std::io::{self, Read};

use serde::Deserialize;
use serde_json::json;

use crate::cli::commands::TemplateCommands;
use crate::db::{connection, template_repo};
use crate::error::FmsError;
use crate::models::{StepDef, TimingMode};
use crate::output;

pub fn run(cmd: TemplateCommands, json_output: bool) -> i32 {
    let result = match cmd {
        TemplateCommands::Load => run_load(json_output),
        TemplateCommands::List => run_list(json_output),
        TemplateCommands::Show { reference } => run_show(&reference, json_output),
    };
    super::finish(result, json_output)
}

#[derive(Deserialize)]
struct TemplateLoadInput {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    shift_weekend: bool,
    #[serde(default)]
    approver: Option<String>,
    steps: Vec<StepDef>,
}

fn run_load(json_output: bool) -> Result<i32, FmsError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| FmsError::validation(e.to_string()))?;

    let mut template_input: TemplateLoadInput =
        serde_json::from_str(&input).map_err(|e| FmsError::validation(format!("Invalid JSON: {e}")))?;
    validate_load_input(&template_input)?;
    template_input.steps.sort_by_key(|s| s.seq);

    let conn = connection::open_db()?;
    let template = connection::with_transaction(&conn, || {
        template_repo::create_template(
            &conn,
            &ulid::Ulid::new().to_string(),
            template_input.name.trim(),
            template_input.description.as_deref(),
            template_input.shift_weekend,
            template_input.approver.as_deref(),
            &template_input.steps,
        )
    })?;

    if json_output {
        output::json::print(&output::json::success(json!({
            "template": output::json::template_summary(&template)
        })));
    } else {
        println!(
            "Loaded template '{}' with {} steps ({}).",
            template.name,
            template.steps.len(),
            template.id
        );
    }
    Ok(0)
}

fn validate_load_input(input: &TemplateLoadInput) -> Result<(), FmsError> {
    if input.name.trim().is_empty() {
        return Err(FmsError::validation("Template name is required"));
    }
    if input.steps.is_empty() {
        return Err(FmsError::validation("At least one step is required"));
    }

    let mut seen = HashSet::new();
    for s in &input.steps {
        if s.seq == 0 {
            return Err(FmsError::validation("Step sequence numbers start at 1"));
        }
        if !seen.insert(s.seq) {
            return Err(FmsError::validation(format!("Duplicate step seq: {}", s.seq)));
        }
        if s.description.trim().is_empty() {
            return Err(FmsError::validation(format!("Step {} has empty description", s.seq)));
        }
        if s.assignees.iter().all(|a| a.trim().is_empty()) {
            return Err(FmsError::validation(format!("Step {} has no assignees", s.seq)));
        }
        if s.offset.is_none() && s.timing != TimingMode::AskOnCompletion {
            return Err(FmsError::validation(format!(
                "Step {} ({}) requires an offset",
                s.seq,
                s.timing.as_str()
            )));
        }
        if s.checklist_required && s.checklist.is_empty() {
            return Err(FmsError::validation(format!(
                "Step {} requires a checklist but lists no items",
                s.seq
            )));
        }
    }
    let expected: HashSet<u32> = (1..=input.steps.len() as u32).collect();
    if seen != expected {
        return Err(FmsError::validation(format!(
            "Step sequence numbers must be 1..{} without gaps",
            input.steps.len()
        )));
    }
    Ok(())
}

fn run_list(json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let templates = template_repo::list_templates(&conn)?;
    if json_output {
        let list: Vec<_> = templates.iter().map(output::json::template_summary).collect();
        output::json::print(&output::json::success(json!({ "templates": list })));
    } else {
        output::text::print_template_list(&templates);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let template = template_repo::resolve_template(&conn, reference)?;
    if json_output {
        output::json::print(&output::json::success(json!({
            "template": output::json::template_detail(&template)
        })));
    } else {
        output::text::print_template(&template);
    }
    Ok(0)
}
