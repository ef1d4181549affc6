use rusqlite::{params, Connection, OptionalExtension};

use crate::db::outbox_repo;
use crate::error::FmsError;
use crate::models::Project;

/// Insert a new project with its current `code`. A taken code or id
/// surfaces as `DuplicateId`.
pub fn create_project(conn: &Connection, project: &mut Project) -> Result<(), FmsError> {
    project.version = 1;
    let document = serde_json::to_string(&*project)?;
    conn.execute(
        "INSERT INTO projects (id, code, name, template_id, spawned_from, approver, status,
                               has_pending_objections, version, document)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)",
        params![
            project.id,
            project.code,
            project.name,
            project.template_id,
            project.spawned_from,
            project.approver,
            project.status().as_str(),
            project.has_pending_objections(),
            document
        ],
    )?;
    flush_events(conn, project)
}

/// Insert with a generated code, retrying on code collisions.
pub fn create_with_generated_code(
    conn: &Connection,
    project: &mut Project,
    attempts: u32,
    mut generate: impl FnMut() -> String,
) -> Result<(), FmsError> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        project.code = generate();
        match create_project(conn, project) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_unique_violation() && attempt < attempts => {
                tracing::warn!(code = %project.code, attempt, "project code taken, regenerating");
            }
            Err(e) if e.is_unique_violation() => {
                return Err(FmsError::duplicate_id(format!(
                    "Could not generate a unique project code after {attempts} attempts"
                )))
            }
            Err(e) => return Err(e),
        }
    }
    Err(FmsError::duplicate_id("No attempt made to create project"))
}

/// Write the project back, conditioned on the version it was loaded with.
pub fn save_project(conn: &Connection, project: &mut Project) -> Result<(), FmsError> {
    let expected = project.version;
    project.version = expected + 1;
    let document = serde_json::to_string(&*project)?;
    let changed = conn.execute(
        "UPDATE projects
         SET name = ?1, status = ?2, has_pending_objections = ?3, document = ?4,
             version = version + 1, updated_at = datetime('now')
         WHERE id = ?5 AND version = ?6",
        params![
            project.name,
            project.status().as_str(),
            project.has_pending_objections(),
            document,
            project.id,
            expected
        ],
    )?;
    if changed == 0 {
        project.version = expected;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
            params![project.id],
            |row| row.get(0),
        )?;
        return Err(if exists {
            FmsError::concurrency_conflict(&project.code, expected)
        } else {
            FmsError::project_not_found(&project.id)
        });
    }
    flush_events(conn, project)
}

fn flush_events(conn: &Connection, project: &mut Project) -> Result<(), FmsError> {
    for event in std::mem::take(&mut project.pending_events) {
        outbox_repo::enqueue(conn, &project.id, &event)?;
    }
    Ok(())
}

fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<(String, i64)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode((document, version): (String, i64)) -> Result<Project, FmsError> {
    let mut project: Project = serde_json::from_str(&document)?;
    project.version = version;
    Ok(project)
}

pub fn get_project_by_id(conn: &Connection, id: &str) -> Result<Option<Project>, FmsError> {
    let row = conn
        .query_row(
            "SELECT document, version FROM projects WHERE id = ?1",
            params![id],
            row_to_project,
        )
        .optional()?;
    row.map(decode).transpose()
}

/// Resolve a project reference: exact ID → exact code → ID/code prefix.
pub fn load_project(conn: &Connection, reference: &str) -> Result<Project, FmsError> {
    if let Some(p) = get_project_by_id(conn, reference)? {
        return Ok(p);
    }
    let by_code = conn
        .query_row(
            "SELECT document, version FROM projects WHERE code = ?1",
            params![reference],
            row_to_project,
        )
        .optional()?;
    if let Some(row) = by_code {
        return decode(row);
    }

    let mut stmt = conn.prepare(
        "SELECT document, version FROM projects WHERE id LIKE ?1 OR code LIKE ?1",
    )?;
    let prefix = format!("{reference}%");
    let rows = stmt
        .query_map(params![prefix], row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;
    let mut projects = rows.into_iter().map(decode).collect::<Result<Vec<_>, _>>()?;

    match projects.len() {
        0 => Err(FmsError::project_not_found(reference)),
        1 => Ok(projects.remove(0)),
        _ => {
            let candidates: Vec<String> = projects.iter().map(|p| format!("{} ({})", p.code, p.id)).collect();
            Err(FmsError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>, FmsError> {
    let mut stmt = conn.prepare("SELECT document, version FROM projects ORDER BY created_at DESC, code DESC")?;
    let rows = stmt
        .query_map([], row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode).collect()
}

/// Projects owned by `approver` that have at least one pending objection.
pub fn list_with_pending_objections(conn: &Connection, approver: &str) -> Result<Vec<Project>, FmsError> {
    let mut stmt = conn.prepare(
        "SELECT document, version FROM projects
         WHERE approver = ?1 AND has_pending_objections = 1
         ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![approver], row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode).collect()
}

/// Hard delete. Score logs are an immutable audit trail and stay.
pub fn delete_project(conn: &Connection, id: &str) -> Result<(), FmsError> {
    conn.execute(
        "DELETE FROM outbox_events WHERE project_id = ?1 AND status = 'pending'",
        params![id],
    )?;
    let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(FmsError::project_not_found(id));
    }
    Ok(())
}
