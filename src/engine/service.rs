//! Request-level operations: each resolves its references, then runs
//! load → mutate → save inside one `BEGIN IMMEDIATE` transaction.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::Config;
use crate::db::{project_repo, template_repo, user_repo, with_transaction};
use crate::engine::objection::{self, ObjectionRequest, ObjectionResponse, PendingObjections};
use crate::engine::state_machine::{self, CompletionInput};
use crate::engine::{instantiate, outbox};
use crate::error::FmsError;
use crate::models::{Decision, ObjectionKind, Project};

/// Load a project, apply `f`, save it conditioned on the loaded version.
fn mutate<T>(
    conn: &Connection,
    project_ref: &str,
    f: impl FnOnce(&mut Project) -> Result<T, FmsError>,
) -> Result<(Project, T), FmsError> {
    with_transaction(conn, || {
        let mut project = project_repo::load_project(conn, project_ref)?;
        let value = f(&mut project)?;
        project_repo::save_project(conn, &mut project)?;
        Ok((project, value))
    })
}

pub fn instantiate_project(
    conn: &Connection,
    config: &Config,
    template_ref: &str,
    start: DateTime<Utc>,
    created_by_ref: &str,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Project, FmsError> {
    with_transaction(conn, || {
        let template = template_repo::resolve_template(conn, template_ref)?;
        let created_by = user_repo::require_user(conn, created_by_ref)?;
        let mut project = instantiate::build_project(&template, start, &created_by, name, now, |r| {
            user_repo::resolve_user(conn, r)
        })?;
        project_repo::create_with_generated_code(conn, &mut project, config.identifier_attempts, || {
            instantiate::generate_code(&config.code_prefix, now)
        })?;
        tracing::info!(
            project = %project.code,
            template = %template.name,
            tasks = project.tasks.len(),
            "project instantiated"
        );
        Ok(project)
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub project: Project,
    /// Codes of projects spawned by downstream triggers during delivery.
    pub spawned: Vec<String>,
}

/// Completes a task. Side effects are delivered from the outbox after the
/// commit; their failure never undoes the completion.
pub fn complete_task(
    conn: &Connection,
    config: &Config,
    project_ref: &str,
    seq: u32,
    mut input: CompletionInput,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, FmsError> {
    input.completed_by = user_repo::require_user(conn, &input.completed_by)?.id;
    let (project, ()) = mutate(conn, project_ref, |p| state_machine::complete_task(p, seq, input))?;

    let spawned = match outbox::drain(conn, config, now) {
        Ok(report) => report.spawned,
        Err(e) => {
            tracing::warn!(project = %project.code, seq, error = %e, "outbox delivery deferred");
            Vec::new()
        }
    };
    Ok(CompletionOutcome { project, spawned })
}

pub fn start_task(
    conn: &Connection,
    project_ref: &str,
    seq: u32,
    by_ref: &str,
    now: DateTime<Utc>,
) -> Result<Project, FmsError> {
    let by = user_repo::require_user(conn, by_ref)?;
    let (project, ()) = mutate(conn, project_ref, |p| state_machine::start_task(p, seq, now))?;
    tracing::info!(project = %project.code, seq, by = %by.name, "task started");
    Ok(project)
}

pub fn set_ask_on_completion_date(
    conn: &Connection,
    project_ref: &str,
    seq: u32,
    due: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Project, FmsError> {
    let (project, ()) = mutate(conn, project_ref, |p| state_machine::supply_due_date(p, seq, due, now))?;
    Ok(project)
}

pub fn raise_objection(
    conn: &Connection,
    project_ref: &str,
    seq: u32,
    kind: ObjectionKind,
    requested_date: Option<DateTime<Utc>>,
    remarks: &str,
    requested_by_ref: &str,
    now: DateTime<Utc>,
) -> Result<(Project, String), FmsError> {
    let requested_by = user_repo::require_user(conn, requested_by_ref)?;
    let request = ObjectionRequest {
        kind,
        requested_date,
        remarks: remarks.to_string(),
        requested_by: requested_by.id,
    };
    mutate(conn, project_ref, |p| objection::raise(p, seq, request, now))
}

#[allow(clippy::too_many_arguments)]
pub fn respond_to_objection(
    conn: &Connection,
    project_ref: &str,
    seq: u32,
    objection_ref: &str,
    decision: Decision,
    approver_ref: &str,
    remarks: Option<&str>,
    impact_score: bool,
    now: DateTime<Utc>,
) -> Result<Project, FmsError> {
    let approver = user_repo::require_user(conn, approver_ref)?;
    let response = ObjectionResponse {
        decision,
        approver: approver.id,
        remarks: remarks.map(str::to_string),
        impact_score,
    };
    let (project, ()) = mutate(conn, project_ref, |p| objection::respond(p, seq, objection_ref, response, now))?;
    Ok(project)
}

pub fn list_pending_objections_for_approver(
    conn: &Connection,
    approver_ref: &str,
) -> Result<Vec<PendingObjections>, FmsError> {
    let approver = user_repo::require_user(conn, approver_ref)?;
    let projects = project_repo::list_with_pending_objections(conn, &approver.id)?;
    Ok(objection::pending_for_approver(&projects, &approver.id))
}

pub fn delete_project(conn: &Connection, project_ref: &str) -> Result<Project, FmsError> {
    with_transaction(conn, || {
        let project = project_repo::load_project(conn, project_ref)?;
        project_repo::delete_project(conn, &project.id)?;
        tracing::info!(project = %project.code, "project deleted");
        Ok(project)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;
    use crate::db::{outbox_repo, score_log_repo};
    use crate::error::ErrorCode;
    use crate::models::{Offset, OutboxStatus, StepDef, StepState, TaskStatus, TimingMode};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn step(seq: u32, timing: TimingMode, days: u32, who: &str, trigger: Option<&str>) -> StepDef {
        StepDef {
            seq,
            description: format!("step {seq}"),
            assignees: vec![who.to_string()],
            timing,
            offset: Some(Offset::Days { days }),
            checklist_required: false,
            checklist: Vec::new(),
            attachments_required: false,
            trigger_template: trigger.map(str::to_string),
        }
    }

    fn seeded(trigger: &str) -> Connection {
        let conn = open_in_memory().unwrap();
        for name in ["alice", "bob", "boss"] {
            user_repo::create_user(&conn, &name.to_uppercase(), name, None).unwrap();
        }
        template_repo::create_template(
            &conn,
            "T-PURCHASE",
            "purchase",
            None,
            false,
            None,
            &[
                step(1, TimingMode::FixedOffset, 2, "alice", Some(trigger)),
                step(2, TimingMode::DependentOffset, 1, "bob", None),
            ],
        )
        .unwrap();
        template_repo::create_template(
            &conn,
            "T-PAYMENT",
            "payment",
            None,
            false,
            None,
            &[step(1, TimingMode::FixedOffset, 1, "bob", None)],
        )
        .unwrap();
        conn
    }

    fn start(conn: &Connection) -> Project {
        instantiate_project(conn, &Config::default(), "purchase", t0(), "boss", None, t0()).unwrap()
    }

    #[test]
    fn instantiation_persists_with_code() {
        let conn = seeded("payment");
        let p = start(&conn);
        assert!(p.code.starts_with("PRJ-240304-"));
        assert_eq!(p.version, 1);
        assert_eq!(p.approver, "BOSS");
        let loaded = project_repo::load_project(&conn, &p.code).unwrap();
        assert_eq!(loaded.tasks[0].status(), TaskStatus::Pending);
    }

    #[test]
    fn unknown_creator_rejected_without_writing() {
        let conn = seeded("payment");
        let err = instantiate_project(&conn, &Config::default(), "purchase", t0(), "ghost", None, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
        assert!(project_repo::list_projects(&conn).unwrap().is_empty());
    }

    #[test]
    fn completion_logs_score_and_spawns_exactly_one_project() {
        let conn = seeded("payment");
        let p = start(&conn);
        let done_at = t0() + Duration::days(1);

        let outcome = complete_task(
            &conn,
            &Config::default(),
            &p.code,
            1,
            CompletionInput::new("alice", done_at),
            done_at,
        )
        .unwrap();
        assert_eq!(outcome.spawned.len(), 1);

        let source = &outcome.project;
        assert_eq!(source.tasks[0].status(), TaskStatus::Done);
        assert_eq!(source.tasks[1].state, StepState::Pending { due: done_at + Duration::days(1) });

        let logs = score_log_repo::list(&conn, Some(&source.id)).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].score, 1.0);

        let spawned = project_repo::load_project(&conn, &outcome.spawned[0]).unwrap();
        assert_eq!(spawned.spawned_from.as_deref(), Some(source.id.as_str()));
        assert_eq!(spawned.name, format!("payment (from {})", source.code));
        assert_eq!(spawned.created_by, "ALICE");
        assert_eq!(spawned.tasks[0].state, StepState::Pending { due: done_at + Duration::days(1) });

        // a second drain finds nothing to redo
        let again = outbox::drain(&conn, &Config::default(), done_at).unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(project_repo::list_projects(&conn).unwrap().len(), 2);
    }

    #[test]
    fn missing_downstream_template_still_completes() {
        let conn = seeded("does-not-exist");
        let p = start(&conn);
        let outcome = complete_task(
            &conn,
            &Config::default(),
            &p.id,
            1,
            CompletionInput::new("alice", t0()),
            t0(),
        )
        .unwrap();
        assert!(outcome.spawned.is_empty());
        assert_eq!(outcome.project.tasks[0].status(), TaskStatus::Done);
        assert_eq!(project_repo::list_projects(&conn).unwrap().len(), 1);
        assert!(outbox_repo::list_events(&conn, Some(OutboxStatus::Pending)).unwrap().is_empty());
    }

    #[test]
    fn failed_completion_leaves_project_untouched() {
        let conn = seeded("payment");
        let p = start(&conn);
        let err = complete_task(&conn, &Config::default(), &p.id, 2, CompletionInput::new("bob", t0()), t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalState);
        let loaded = project_repo::load_project(&conn, &p.id).unwrap();
        assert_eq!(loaded.version, 1);
        assert!(outbox_repo::list_events(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn objection_round_trip_through_the_store() {
        let conn = seeded("payment");
        let p = start(&conn);
        let wanted = t0() + Duration::days(5);

        let (_, id) = raise_objection(
            &conn,
            &p.code,
            1,
            ObjectionKind::DateChange,
            Some(wanted),
            "vendor is late",
            "alice",
            t0(),
        )
        .unwrap();

        let pending = list_pending_objections_for_approver(&conn, "boss").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tasks[0].objections[0].id, id);
        assert!(list_pending_objections_for_approver(&conn, "alice").unwrap().is_empty());

        let err = respond_to_objection(&conn, &p.code, 1, &id, Decision::Approve, "alice", None, false, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthorized);

        let updated =
            respond_to_objection(&conn, &p.code, 1, &id[..10], Decision::Approve, "boss", Some("ok"), true, t0())
                .unwrap();
        assert_eq!(updated.tasks[0].planned_due(), Some(wanted));
        assert!(updated.tasks[0].score_impacted);
        assert!(list_pending_objections_for_approver(&conn, "boss").unwrap().is_empty());
    }

    #[test]
    fn delete_removes_project() {
        let conn = seeded("payment");
        let p = start(&conn);
        delete_project(&conn, &p.code).unwrap();
        let err = project_repo::load_project(&conn, &p.code).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProjectNotFound);
    }
}
