use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::config::Config;
use crate::db::{project_repo, template_repo, user_repo};
use crate::engine::instantiate;
use crate::error::FmsError;
use crate::models::{Project, TaskCompleted, Template};

/// Downstream template by exact name, then exact ID.
fn lookup_template(conn: &Connection, reference: &str) -> Result<Option<Template>, FmsError> {
    if let Some(t) = template_repo::find_template_by_name(conn, reference)? {
        return Ok(Some(t));
    }
    template_repo::get_template_by_id(conn, reference)
}

/// Spawns the downstream project for a completed step. Returns `None` when
/// the step has no trigger or its template no longer exists.
pub fn propagate(
    conn: &Connection,
    config: &Config,
    event: &TaskCompleted,
    now: DateTime<Utc>,
) -> Result<Option<Project>, FmsError> {
    let Some(reference) = event.trigger_template.as_deref() else {
        return Ok(None);
    };
    let Some(template) = lookup_template(conn, reference)? else {
        tracing::warn!(
            project = %event.project_code,
            seq = event.task_seq,
            template = reference,
            "downstream template not found, nothing spawned"
        );
        return Ok(None);
    };

    let created_by = user_repo::require_user(conn, &event.completed_by)?;
    let name = format!("{} (from {})", template.name, event.project_code);
    let mut project = instantiate::build_project(&template, now, &created_by, Some(&name), now, |r| {
        user_repo::resolve_user(conn, r)
    })?;
    project.spawned_from = Some(event.project_id.clone());

    project_repo::create_with_generated_code(conn, &mut project, config.identifier_attempts, || {
        instantiate::generate_code(&config.code_prefix, now)
    })?;

    tracing::info!(
        source = %event.project_code,
        seq = event.task_seq,
        spawned = %project.code,
        template = %template.name,
        "downstream project spawned"
    );
    Ok(Some(project))
}
