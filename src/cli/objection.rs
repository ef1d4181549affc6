use chrono::Utc;
use serde_json::json;

use crate::cli::commands::ObjectionCommands;
use crate::db::connection;
use crate::engine::service;
use crate::error::FmsError;
use crate::models::{Decision, ObjectionKind};
use crate::output;

pub fn run(cmd: ObjectionCommands, json_output: bool, user: Option<&str>) -> i32 {
    let result = match cmd {
        ObjectionCommands::Raise { project, seq, kind, remarks, date } => {
            run_raise(&project, seq, &kind, &remarks, date.as_deref(), json_output, user)
        }
        ObjectionCommands::Respond { project, seq, objection, decision, remarks, impact_score } => {
            let decision = Decision::from_str(&decision).ok_or_else(|| {
                FmsError::validation(format!("Invalid decision '{decision}': expected approve or reject"))
            });
            decision.and_then(|d| {
                run_respond(&project, seq, &objection, d, remarks.as_deref(), impact_score, json_output, user)
            })
        }
        ObjectionCommands::Pending => run_pending(json_output, user),
    };
    super::finish(result, json_output)
}

fn run_raise(
    project: &str,
    seq: u32,
    kind: &str,
    remarks: &str,
    date: Option<&str>,
    json_output: bool,
    user: Option<&str>,
) -> Result<i32, FmsError> {
    let by = super::acting_user(user, "raise an objection")?;
    let kind = ObjectionKind::from_str(kind).ok_or_else(|| {
        FmsError::validation(format!(
            "Invalid objection kind '{kind}': expected date_change, hold or terminate"
        ))
    })?;
    let requested_date = date.map(|d| super::parse_instant(d, "--date")).transpose()?;

    let conn = connection::open_db()?;
    let (updated, id) =
        service::raise_objection(&conn, project, seq, kind, requested_date, remarks, by, Utc::now())?;

    if json_output {
        let objection = updated
            .tasks
            .iter()
            .find(|t| t.seq == seq)
            .and_then(|t| t.objections.iter().find(|o| o.id == id));
        output::json::print(&output::json::success(json!({
            "project": { "id": updated.id, "code": updated.code },
            "seq": seq,
            "objection": objection
        })));
    } else {
        println!("Raised {} objection {id} on task {seq} of {}", kind.as_str(), updated.code);
    }
    Ok(0)
}

#[allow(clippy::too_many_arguments)]
fn run_respond(
    project: &str,
    seq: u32,
    objection: &str,
    decision: Decision,
    remarks: Option<&str>,
    impact_score: bool,
    json_output: bool,
    user: Option<&str>,
) -> Result<i32, FmsError> {
    let approver = super::acting_user(user, "respond to an objection")?;
    let conn = connection::open_db()?;
    let updated = service::respond_to_objection(
        &conn,
        project,
        seq,
        objection,
        decision,
        approver,
        remarks,
        impact_score,
        Utc::now(),
    )?;

    let task = updated.tasks.iter().find(|t| t.seq == seq);
    if json_output {
        output::json::print(&output::json::success(json!({
            "project": output::json::project_summary(&updated),
            "task": task.map(output::json::task_json)
        })));
    } else {
        let verb = match decision {
            Decision::Approve => "Approved",
            Decision::Reject => "Rejected",
        };
        println!("{verb} objection on task {seq} of {}", updated.code);
        if let Some(t) = task {
            output::text::print_task_line(t);
        }
    }
    Ok(0)
}

fn run_pending(json_output: bool, user: Option<&str>) -> Result<i32, FmsError> {
    let approver = super::acting_user(user, "list pending objections")?;
    let conn = connection::open_db()?;
    let groups = service::list_pending_objections_for_approver(&conn, approver)?;
    if json_output {
        output::json::print(&output::json::success(json!({
            "projects": output::json::pending_json(&groups)
        })));
    } else {
        output::text::print_pending(&groups);
    }
    Ok(0)
}
