use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{scoring, state_machine};
use crate::error::FmsError;
use crate::models::{
    Decision, Objection, ObjectionKind, ObjectionStatus, Project, Resolution, TaskStatus,
};

#[derive(Debug, Clone)]
pub struct ObjectionRequest {
    pub kind: ObjectionKind,
    pub requested_date: Option<DateTime<Utc>>,
    pub remarks: String,
    pub requested_by: String,
}

#[derive(Debug, Clone)]
pub struct ObjectionResponse {
    pub decision: Decision,
    pub approver: String,
    pub remarks: Option<String>,
    pub impact_score: bool,
}

/// Whole days between two instants, rounded up.
fn extra_days(current: DateTime<Utc>, requested: DateTime<Utc>) -> i64 {
    let secs = (requested - current).num_seconds();
    (secs as f64 / 86_400.0).ceil() as i64
}

/// Appends a pending objection. The schedule is not touched until approval.
pub fn raise(
    project: &mut Project,
    seq: u32,
    request: ObjectionRequest,
    now: DateTime<Utc>,
) -> Result<String, FmsError> {
    let index = state_machine::locate(project, seq)?;
    let task = &project.tasks[index];

    if request.remarks.trim().is_empty() {
        return Err(FmsError::validation(format!(
            "Objection on task {seq} requires remarks"
        )));
    }
    match task.status() {
        TaskStatus::Terminated => {
            return Err(FmsError::illegal_state(format!(
                "Task {seq} of {} is terminated",
                project.code
            )))
        }
        TaskStatus::Done if request.kind != ObjectionKind::Terminate => {
            return Err(FmsError::illegal_state(format!(
                "Task {seq} of {} is done; only a terminate objection is possible",
                project.code
            )))
        }
        _ => {}
    }

    let extra_days_requested = match (request.kind, request.requested_date) {
        (ObjectionKind::DateChange, None) => {
            return Err(FmsError::validation(format!(
                "date_change objection on task {seq} requires a requested date"
            )))
        }
        (ObjectionKind::DateChange, Some(date)) => {
            let floor = task.anchor_at.unwrap_or(project.start_at);
            if date < floor {
                return Err(FmsError::validation(format!(
                    "Requested date {} for task {seq} is before {}",
                    date.to_rfc3339(),
                    floor.to_rfc3339()
                )));
            }
            task.planned_due().map(|current| extra_days(current, date))
        }
        (_, Some(_)) => {
            return Err(FmsError::validation(format!(
                "{} objection on task {seq} does not take a requested date",
                request.kind.as_str()
            )))
        }
        (_, None) => None,
    };

    let objection = Objection {
        id: ulid::Ulid::new().to_string(),
        kind: request.kind,
        requested_date: request.requested_date,
        extra_days_requested,
        remarks: request.remarks,
        requested_by: request.requested_by,
        requested_at: now,
        status: ObjectionStatus::Pending,
        resolution: None,
    };
    let id = objection.id.clone();
    project.tasks[index].objections.push(objection);

    tracing::info!(project = %project.code, seq, objection = %id, kind = request.kind.as_str(), "objection raised");
    Ok(id)
}

fn apply_approval(
    project: &mut Project,
    index: usize,
    objection: &Objection,
    response: &ObjectionResponse,
    now: DateTime<Utc>,
) -> Result<(), FmsError> {
    match objection.kind {
        ObjectionKind::DateChange => {
            let requested = objection.requested_date.ok_or_else(|| {
                FmsError::validation(format!("Objection {} has no requested date", objection.id))
            })?;
            let active = project.is_active_index(index);
            let code = project.code.clone();
            let start = project.start_at;
            let task = &mut project.tasks[index];
            let next = task.state.with_due(requested, active).ok_or_else(|| {
                FmsError::illegal_state(format!(
                    "Task {} of {} is {}; its date can no longer change",
                    task.seq,
                    code,
                    task.status().as_str()
                ))
            })?;
            task.state = next;
            task.freeze_original(now, requested);
            let anchor = task.anchor_at.unwrap_or(start);
            task.planned_days = Some(scoring::day_span(anchor, requested));
            task.score_impacted = response.impact_score;
            Ok(())
        }
        ObjectionKind::Hold => state_machine::hold_task(project, index, now),
        ObjectionKind::Terminate => {
            state_machine::terminate_task(project, index, &response.approver, now)
        }
    }
}

/// Approves or rejects a pending objection. Approval is the only path that
/// changes a task's date, hold or termination. On error nothing changes.
pub fn respond(
    project: &mut Project,
    seq: u32,
    objection_ref: &str,
    response: ObjectionResponse,
    now: DateTime<Utc>,
) -> Result<(), FmsError> {
    let index = state_machine::locate(project, seq)?;
    let pos = project.tasks[index]
        .find_objection(objection_ref)
        .ok_or_else(|| FmsError::objection_not_found(seq, objection_ref))?;
    let objection = project.tasks[index].objections[pos].clone();

    if !objection.is_pending() {
        return Err(FmsError::illegal_state(format!(
            "Objection {} on task {seq} is already {}",
            objection.id,
            objection.status.as_str()
        )));
    }
    if response.approver != project.approver {
        return Err(FmsError::not_authorized(format!(
            "Only the approver of {} may respond to objection {}",
            project.code, objection.id
        )));
    }

    let mut next = project.clone();
    let status = match response.decision {
        Decision::Approve => {
            apply_approval(&mut next, index, &objection, &response, now)?;
            ObjectionStatus::Approved
        }
        Decision::Reject => ObjectionStatus::Rejected,
    };

    let record = &mut next.tasks[index].objections[pos];
    record.status = status;
    record.resolution = Some(Resolution {
        approver: response.approver,
        remarks: response.remarks,
        decided_at: now,
        impact_score: response.impact_score && status == ObjectionStatus::Approved,
    });
    *project = next;

    tracing::info!(
        project = %project.code,
        seq,
        objection = %objection.id,
        kind = objection.kind.as_str(),
        decision = status.as_str(),
        "objection resolved"
    );
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingTask {
    pub seq: u32,
    pub description: String,
    pub assignee: String,
    pub status: TaskStatus,
    pub planned_due: Option<DateTime<Utc>>,
    pub objections: Vec<Objection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingObjections {
    pub project_id: String,
    pub project_code: String,
    pub project_name: String,
    pub tasks: Vec<PendingTask>,
}

/// Tasks with at least one pending objection for `approver`, each filtered to
/// its pending objections.
pub fn pending_for_approver(projects: &[Project], approver: &str) -> Vec<PendingObjections> {
    projects
        .iter()
        .filter(|p| p.approver == approver)
        .filter_map(|p| {
            let tasks: Vec<PendingTask> = p
                .tasks
                .iter()
                .filter_map(|t| {
                    let objections: Vec<Objection> = t.pending_objections().cloned().collect();
                    if objections.is_empty() {
                        return None;
                    }
                    Some(PendingTask {
                        seq: t.seq,
                        description: t.description.clone(),
                        assignee: t.assignee_name.clone(),
                        status: t.status(),
                        planned_due: t.planned_due(),
                        objections,
                    })
                })
                .collect();
            if tasks.is_empty() {
                None
            } else {
                Some(PendingObjections {
                    project_id: p.id.clone(),
                    project_code: p.code.clone(),
                    project_name: p.name.clone(),
                    tasks,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state_machine::tests::{t0, three_step};
    use crate::engine::state_machine::{complete_task, CompletionInput};
    use crate::error::ErrorCode;
    use chrono::Duration;

    fn request(kind: ObjectionKind, date: Option<DateTime<Utc>>) -> ObjectionRequest {
        ObjectionRequest {
            kind,
            requested_date: date,
            remarks: "vendor delayed".into(),
            requested_by: "u1".into(),
        }
    }

    fn approve(impact: bool) -> ObjectionResponse {
        ObjectionResponse {
            decision: Decision::Approve,
            approver: "boss".into(),
            remarks: Some("ok".into()),
            impact_score: impact,
        }
    }

    fn reject() -> ObjectionResponse {
        ObjectionResponse {
            decision: Decision::Reject,
            approver: "boss".into(),
            remarks: None,
            impact_score: false,
        }
    }

    #[test]
    fn raise_computes_extra_days_without_touching_schedule() {
        let mut p = three_step();
        let before = p.tasks[0].state.clone();
        let wanted = t0() + Duration::days(4) + Duration::hours(1);
        let id = raise(&mut p, 1, request(ObjectionKind::DateChange, Some(wanted)), t0()).unwrap();

        let o = &p.tasks[0].objections[0];
        assert_eq!(o.id, id);
        assert_eq!(o.extra_days_requested, Some(3));
        assert_eq!(o.status, ObjectionStatus::Pending);
        assert_eq!(p.tasks[0].state, before);
    }

    #[test]
    fn raise_validates_input() {
        let mut p = three_step();
        let mut r = request(ObjectionKind::Hold, None);
        r.remarks = "  ".into();
        assert_eq!(raise(&mut p, 1, r, t0()).unwrap_err().code, ErrorCode::ValidationError);

        let r = request(ObjectionKind::DateChange, None);
        assert_eq!(raise(&mut p, 1, r, t0()).unwrap_err().code, ErrorCode::ValidationError);

        let r = request(ObjectionKind::DateChange, Some(t0() - Duration::days(1)));
        assert_eq!(raise(&mut p, 1, r, t0()).unwrap_err().code, ErrorCode::ValidationError);

        let r = request(ObjectionKind::Hold, None);
        assert_eq!(raise(&mut p, 9, r, t0()).unwrap_err().code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn raise_then_reject_leaves_task_unchanged() {
        let mut p = three_step();
        let before = p.tasks[0].clone();
        let id = raise(&mut p, 1, request(ObjectionKind::Terminate, None), t0()).unwrap();
        respond(&mut p, 1, &id, reject(), t0()).unwrap();

        let after = &p.tasks[0];
        assert_eq!(after.state, before.state);
        assert_eq!(after.original_planned_at, before.original_planned_at);
        assert_eq!(after.score_impacted, before.score_impacted);
        assert_eq!(after.objections[0].status, ObjectionStatus::Rejected);
    }

    #[test]
    fn objection_resolves_only_once() {
        let mut p = three_step();
        let id = raise(&mut p, 1, request(ObjectionKind::Hold, None), t0()).unwrap();
        respond(&mut p, 1, &id, approve(false), t0()).unwrap();
        assert!(p.tasks[0].is_on_hold());

        let err = respond(&mut p, 1, &id, reject(), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalState);
        let err = respond(&mut p, 1, "NOPE", reject(), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ObjectionNotFound);
    }

    #[test]
    fn only_project_approver_may_respond() {
        let mut p = three_step();
        let id = raise(&mut p, 1, request(ObjectionKind::Hold, None), t0()).unwrap();
        let mut r = approve(false);
        r.approver = "u1".into();
        assert_eq!(respond(&mut p, 1, &id, r, t0()).unwrap_err().code, ErrorCode::NotAuthorized);
        assert!(p.tasks[0].objections[0].is_pending());
    }

    #[test]
    fn empty_reference_matches_nothing() {
        let mut p = three_step();
        raise(&mut p, 1, request(ObjectionKind::Hold, None), t0()).unwrap();
        for reference in ["", "  "] {
            let err = respond(&mut p, 1, reference, approve(false), t0()).unwrap_err();
            assert_eq!(err.code, ErrorCode::ObjectionNotFound);
        }
        assert!(p.tasks[0].objections[0].is_pending());
    }

    #[test]
    fn date_change_keeps_original_date() {
        let mut p = three_step();
        let original = p.tasks[0].original_planned_at;
        let wanted = t0() + Duration::days(6);
        let id = raise(&mut p, 1, request(ObjectionKind::DateChange, Some(wanted)), t0()).unwrap();
        respond(&mut p, 1, &id, approve(true), t0()).unwrap();

        let task = &p.tasks[0];
        assert_eq!(task.planned_due(), Some(wanted));
        assert_eq!(task.original_planned_at, original);
        assert_eq!(task.planned_days, Some(6));
        assert!(task.score_impacted);
    }

    fn score_after_date_change(impact: bool) -> (f64, bool) {
        let mut p = three_step();
        // originally due day 2; moved to day 6; finished on day 5
        let id = raise(&mut p, 1, request(ObjectionKind::DateChange, Some(t0() + Duration::days(6))), t0()).unwrap();
        respond(&mut p, 1, &id, approve(impact), t0()).unwrap();
        complete_task(&mut p, 1, CompletionInput::new("u1", t0() + Duration::days(5))).unwrap();
        let card = p.tasks[0].score().copied().unwrap();
        (card.score, card.score_impacted)
    }

    #[test]
    fn score_impact_keeps_the_late_penalty() {
        let (with_impact, flagged) = score_after_date_change(true);
        assert_eq!(with_impact, 2.0 / 5.0);
        assert!(flagged);
    }

    #[test]
    fn approved_date_change_without_impact_scores_against_revised_date() {
        let (without_impact, flagged) = score_after_date_change(false);
        assert_eq!(without_impact, 1.0);
        assert!(!flagged);
    }

    #[test]
    fn terminate_objection_finishes_task_without_score() {
        let mut p = three_step();
        let id = raise(&mut p, 1, request(ObjectionKind::Terminate, None), t0()).unwrap();
        respond(&mut p, 1, &id, approve(false), t0()).unwrap();
        assert!(p.tasks[0].is_terminated());
        assert_eq!(p.tasks[0].completion_score(), None);

        let err = raise(&mut p, 1, request(ObjectionKind::Terminate, None), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalState);
    }

    #[test]
    fn pending_listing_filters_resolved() {
        let mut p = three_step();
        let resolved = raise(&mut p, 1, request(ObjectionKind::Hold, None), t0()).unwrap();
        raise(&mut p, 2, request(ObjectionKind::Terminate, None), t0()).unwrap();
        respond(&mut p, 1, &resolved, reject(), t0()).unwrap();

        let listing = pending_for_approver(std::slice::from_ref(&p), "boss");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].tasks.len(), 1);
        assert_eq!(listing[0].tasks[0].seq, 2);
        assert_eq!(listing[0].tasks[0].objections.len(), 1);

        assert!(pending_for_approver(std::slice::from_ref(&p), "u1").is_empty());
    }
}
