use chrono::Utc;
use serde_json::json;

use crate::cli::commands::TaskCommands;
use crate::config::Config;
use crate::db::connection;
use crate::engine::service;
use crate::engine::state_machine::CompletionInput;
use crate::error::FmsError;
use crate::models::Project;
use crate::output;

pub fn run(cmd: TaskCommands, json_output: bool, user: Option<&str>, config: &Config) -> i32 {
    let result = match cmd {
        TaskCommands::Start { project, seq, at } => {
            run_start(&project, seq, at.as_deref(), json_output, user)
        }
        TaskCommands::Complete { project, seq, checked, attachments, notes, due, at } => {
            let args = CompleteArgs { checked, attachments, notes, due, at };
            run_complete(&project, seq, args, json_output, user, config)
        }
        TaskCommands::SetDate { project, seq, date } => run_set_date(&project, seq, &date, json_output),
    };
    super::finish(result, json_output)
}

struct CompleteArgs {
    checked: Vec<String>,
    attachments: Vec<String>,
    notes: Option<String>,
    due: Option<String>,
    at: Option<String>,
}

fn print_task_result(project: &Project, seq: u32, action: &str, json_output: bool) {
    let task = project.tasks.iter().find(|t| t.seq == seq);
    if json_output {
        output::json::print(&output::json::success(json!({
            "project": output::json::project_summary(project),
            "task": task.map(output::json::task_json)
        })));
    } else if let Some(t) = task {
        println!("{action} task {} of {}", t.seq, project.code);
        output::text::print_task_line(t);
    }
}

fn run_start(
    project: &str,
    seq: u32,
    at: Option<&str>,
    json_output: bool,
    user: Option<&str>,
) -> Result<i32, FmsError> {
    let by = super::acting_user(user, "start a task")?;
    let now = super::instant_or_now(at, "--at")?;
    let conn = connection::open_db()?;
    let updated = service::start_task(&conn, project, seq, by, now)?;
    print_task_result(&updated, seq, "Started", json_output);
    Ok(0)
}

fn run_complete(
    project: &str,
    seq: u32,
    args: CompleteArgs,
    json_output: bool,
    user: Option<&str>,
    config: &Config,
) -> Result<i32, FmsError> {
    let by = super::acting_user(user, "complete a task")?;
    let completed_at = super::instant_or_now(args.at.as_deref(), "--at")?;
    let due = args
        .due
        .as_deref()
        .map(|d| super::parse_instant(d, "--due"))
        .transpose()?;

    let mut input = CompletionInput::new(by, completed_at);
    input.checked = args.checked;
    input.attachments = args.attachments;
    input.notes = args.notes;
    input.due = due;

    let conn = connection::open_db()?;
    let outcome = service::complete_task(&conn, config, project, seq, input, Utc::now())?;
    let project = &outcome.project;

    if json_output {
        let task = project.tasks.iter().find(|t| t.seq == seq);
        let next = project.tasks.iter().find(|t| t.seq > seq);
        output::json::print(&output::json::success(json!({
            "project": output::json::project_summary(project),
            "task": task.map(output::json::task_json),
            "next": next.map(output::json::task_json),
            "spawned": outcome.spawned
        })));
    } else {
        println!("Completed task {seq} of {}", project.code);
        for t in project.tasks.iter().filter(|t| t.seq >= seq).take(2) {
            output::text::print_task_line(t);
        }
        for code in &outcome.spawned {
            println!("Spawned project {code}");
        }
        if project.status() == crate::models::ProjectStatus::Completed {
            println!("Project {} completed.", project.code);
        }
    }
    Ok(0)
}

fn run_set_date(project: &str, seq: u32, date: &str, json_output: bool) -> Result<i32, FmsError> {
    let due = super::parse_instant(date, "date")?;
    let conn = connection::open_db()?;
    let updated = service::set_ask_on_completion_date(&conn, project, seq, due, Utc::now())?;
    print_task_result(&updated, seq, "Scheduled", json_output);
    Ok(0)
}
