use chrono::Utc;
use serde_json::json;

use crate::cli::commands::ProjectCommands;
use crate::config::Config;
use crate::db::{connection, project_repo};
use crate::engine::service;
use crate::error::FmsError;
use crate::output;

pub fn run(cmd: ProjectCommands, json_output: bool, user: Option<&str>, config: &Config) -> i32 {
    let result = match cmd {
        ProjectCommands::Start { template, start, name } => {
            run_start(&template, start.as_deref(), name.as_deref(), json_output, user, config)
        }
        ProjectCommands::List => run_list(json_output),
        ProjectCommands::Show { reference } => run_show(&reference, json_output),
        ProjectCommands::Delete { reference } => run_delete(&reference, json_output),
    };
    super::finish(result, json_output)
}

fn run_start(
    template: &str,
    start: Option<&str>,
    name: Option<&str>,
    json_output: bool,
    user: Option<&str>,
    config: &Config,
) -> Result<i32, FmsError> {
    let creator = super::acting_user(user, "start a project")?;
    let now = Utc::now();
    let start = match start {
        Some(s) => super::parse_instant(s, "--start")?,
        None => now,
    };
    let conn = connection::open_db()?;
    let project = service::instantiate_project(&conn, config, template, start, creator, name, now)?;

    if json_output {
        output::json::print(&output::json::success(json!({
            "project": output::json::project_detail(&project)
        })));
    } else {
        println!("Started project {} ({})", project.code, project.name);
        for t in &project.tasks {
            output::text::print_task_line(t);
        }
    }
    Ok(0)
}

fn run_list(json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let projects = project_repo::list_projects(&conn)?;
    if json_output {
        let list: Vec<_> = projects.iter().map(output::json::project_summary).collect();
        output::json::print(&output::json::success(json!({ "projects": list })));
    } else {
        output::text::print_project_list(&projects);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let project = project_repo::load_project(&conn, reference)?;
    if json_output {
        output::json::print(&output::json::success(json!({
            "project": output::json::project_detail(&project)
        })));
    } else {
        output::text::print_project(&project);
    }
    Ok(0)
}

fn run_delete(reference: &str, json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let project = service::delete_project(&conn, reference)?;
    if json_output {
        output::json::print(&output::json::success(json!({
            "deleted": { "id": project.id, "code": project.code }
        })));
    } else {
        println!("Deleted project {} ({})", project.code, project.id);
    }
    Ok(0)
}
