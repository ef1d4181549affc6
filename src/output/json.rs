use serde_json::{json, Value};

use crate::engine::objection::PendingObjections;
use crate::engine::outbox::DrainReport;
use crate::error::FmsError;
use crate::models::{OutboxEvent, Project, ScoreLogEntry, StepState, Task, Template, User};

pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data
    })
}

pub fn error(err: &FmsError) -> Value {
    json!({
        "success": false,
        "error": {
            "code": err.code.as_str(),
            "message": err.message
        }
    })
}

pub fn print(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

pub fn user_json(u: &User) -> Value {
    json!({
        "id": u.id,
        "name": u.name,
        "email": u.email,
        "created_at": u.created_at
    })
}

pub fn template_summary(t: &Template) -> Value {
    json!({
        "id": t.id,
        "name": t.name,
        "steps": t.steps.len(),
        "shift_weekend": t.shift_weekend,
        "approver": t.approver
    })
}

pub fn template_detail(t: &Template) -> Value {
    json!({
        "id": t.id,
        "name": t.name,
        "description": t.description,
        "shift_weekend": t.shift_weekend,
        "approver": t.approver,
        "steps": t.steps,
        "created_at": t.created_at
    })
}

pub fn project_summary(p: &Project) -> Value {
    let done = p.tasks.iter().filter(|t| t.is_finished()).count();
    json!({
        "id": p.id,
        "code": p.code,
        "name": p.name,
        "template": p.template_name,
        "status": p.status().as_str(),
        "tasks_total": p.tasks.len(),
        "tasks_finished": done,
        "score": p.score,
        "version": p.version
    })
}

pub fn project_detail(p: &Project) -> Value {
    json!({
        "id": p.id,
        "code": p.code,
        "name": p.name,
        "template_id": p.template_id,
        "template": p.template_name,
        "spawned_from": p.spawned_from,
        "created_by": p.created_by,
        "approver": p.approver,
        "shift_weekend": p.shift_weekend,
        "start_at": p.start_at,
        "created_at": p.created_at,
        "status": p.status().as_str(),
        "version": p.version,
        "tasks_on_time": p.tasks_on_time,
        "tasks_late": p.tasks_late,
        "score": p.score,
        "tasks": p.tasks.iter().map(task_json).collect::<Vec<_>>()
    })
}

pub fn task_json(t: &Task) -> Value {
    let mut v = json!({
        "seq": t.seq,
        "description": t.description,
        "assignee": { "id": t.assignee_id, "name": t.assignee_name },
        "timing": t.timing.as_str(),
        "offset": t.offset,
        "status": t.status().as_str(),
        "is_finished": t.is_finished(),
        "is_terminated": t.is_terminated(),
        "due": t.planned_due(),
        "original_planned_at": t.original_planned_at,
        "planned_days": t.planned_days,
        "score_impacted": t.score_impacted,
        "checklist": t.checklist,
        "attachments": t.attachments,
        "notes": t.notes,
        "trigger_template": t.trigger_template,
        "objections": t.objections
    });
    match &t.state {
        StepState::InProgress { started_at, .. } => v["started_at"] = json!(started_at),
        StepState::OnHold { prior, since } => {
            v["on_hold_since"] = json!(since);
            v["held_status"] = json!(prior.status().as_str());
        }
        StepState::Terminated { at, by, .. } => {
            v["terminated_at"] = json!(at);
            v["terminated_by"] = json!(by);
        }
        _ => {}
    }
    if let Some(c) = t.completion() {
        v["completed_at"] = json!(c.completed_at);
        v["completed_by"] = json!(c.completed_by);
        v["actual_completion_days"] = json!(t.actual_completion_days());
    }
    if let Some(card) = t.score() {
        v["score"] = json!({
            "score": card.score,
            "planned_days": card.planned_days,
            "actual_days": card.actual_days,
            "on_time": card.on_time,
            "reason": card.reason()
        });
    }
    v
}

pub fn pending_json(groups: &[PendingObjections]) -> Value {
    json!(groups)
}

pub fn score_entry_json(e: &ScoreLogEntry) -> Value {
    json!(e)
}

pub fn outbox_json(e: &OutboxEvent) -> Value {
    json!({
        "id": e.id,
        "project_id": e.project_id,
        "topic": e.topic.as_str(),
        "status": e.status.as_str(),
        "attempts": e.attempts,
        "last_error": e.last_error,
        "created_at": e.created_at,
        "updated_at": e.updated_at
    })
}

pub fn drain_json(r: &DrainReport) -> Value {
    json!(r)
}
