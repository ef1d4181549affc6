use serde_json::json;

use crate::cli::commands::ScoreCommands;
use crate::db::{connection, project_repo, score_log_repo};
use crate::error::FmsError;
use crate::output;

pub fn run(cmd: ScoreCommands, json_output: bool) -> i32 {
    let result = match cmd {
        ScoreCommands::List { project } => run_list(project.as_deref(), json_output),
    };
    super::finish(result, json_output)
}

fn run_list(project: Option<&str>, json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let project_id = match project {
        Some(reference) => Some(project_repo::load_project(&conn, reference)?.id),
        None => None,
    };
    let entries = score_log_repo::list(&conn, project_id.as_deref())?;
    if json_output {
        let list: Vec<_> = entries.iter().map(output::json::score_entry_json).collect();
        output::json::print(&output::json::success(json!({ "entries": list })));
    } else {
        output::text::print_score_log(&entries);
    }
    Ok(0)
}
