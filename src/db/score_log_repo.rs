use rusqlite::{params, Connection};

use crate::error::FmsError;
use crate::models::ScoreLogEntry;

/// Append-only: there is no update or delete for score logs.
pub fn append(conn: &Connection, entry: &ScoreLogEntry) -> Result<(), FmsError> {
    conn.execute(
        "INSERT INTO score_logs (id, project_id, task_seq, assignee, planned_days, actual_days,
                                 score, on_time, score_impacted, reason, logged_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            entry.id,
            entry.project_id,
            entry.task_seq,
            entry.assignee,
            entry.planned_days,
            entry.actual_days,
            entry.score,
            entry.on_time,
            entry.score_impacted,
            entry.reason,
            entry.logged_at
        ],
    )?;
    Ok(())
}

pub fn list(conn: &Connection, project_id: Option<&str>) -> Result<Vec<ScoreLogEntry>, FmsError> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, task_seq, assignee, planned_days, actual_days,
                score, on_time, score_impacted, reason, logged_at
         FROM score_logs
         WHERE ?1 IS NULL OR project_id = ?1
         ORDER BY logged_at ASC, id ASC",
    )?;
    let entries = stmt
        .query_map(params![project_id], |row| {
            Ok(ScoreLogEntry {
                id: row.get(0)?,
                project_id: row.get(1)?,
                task_seq: row.get(2)?,
                assignee: row.get(3)?,
                planned_days: row.get(4)?,
                actual_days: row.get(5)?,
                score: row.get(6)?,
                on_time: row.get(7)?,
                score_impacted: row.get(8)?,
                reason: row.get(9)?,
                logged_at: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
