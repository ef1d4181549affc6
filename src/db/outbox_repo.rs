use rusqlite::{params, Connection};

use crate::error::FmsError;
use crate::models::{EngineEvent, OutboxEvent, OutboxStatus, OutboxTopic};

const COLUMNS: &str = "id, project_id, topic, payload, status, attempts, last_error, created_at, updated_at";

/// Fan an engine event out into one outbox row per interested consumer.
pub fn enqueue(conn: &Connection, project_id: &str, event: &EngineEvent) -> Result<Vec<String>, FmsError> {
    let mut topics = Vec::new();
    match event {
        EngineEvent::TaskCompleted(done) => {
            if done.score.is_some() {
                topics.push(OutboxTopic::ScoreLog);
            }
            if done.trigger_template.is_some() {
                topics.push(OutboxTopic::Trigger);
            }
        }
    }

    let payload = serde_json::to_string(event)?;
    let mut ids = Vec::with_capacity(topics.len());
    for topic in topics {
        let id = ulid::Ulid::new().to_string();
        conn.execute(
            "INSERT INTO outbox_events (id, project_id, topic, payload) VALUES (?1, ?2, ?3, ?4)",
            params![id, project_id, topic.as_str(), payload],
        )?;
        ids.push(id);
    }
    Ok(ids)
}

/// Oldest pending rows first.
pub fn pending_events(conn: &Connection) -> Result<Vec<OutboxEvent>, FmsError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM outbox_events WHERE status = 'pending' ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt
        .query_map([], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawEvent::into_event).collect()
}

pub fn list_events(conn: &Connection, status: Option<OutboxStatus>) -> Result<Vec<OutboxEvent>, FmsError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM outbox_events
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt
        .query_map(params![status.map(|s| s.as_str())], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawEvent::into_event).collect()
}

pub fn mark_done(conn: &Connection, id: &str) -> Result<(), FmsError> {
    conn.execute(
        "UPDATE outbox_events
         SET status = 'done', attempts = attempts + 1, last_error = NULL, updated_at = datetime('now')
         WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

/// Record a failed attempt; the row gives up once `max_attempts` is reached.
pub fn mark_failure(conn: &Connection, id: &str, error: &str, max_attempts: u32) -> Result<OutboxStatus, FmsError> {
    conn.execute(
        "UPDATE outbox_events
         SET attempts = attempts + 1,
             last_error = ?2,
             status = CASE WHEN attempts + 1 >= ?3 THEN 'failed' ELSE 'pending' END,
             updated_at = datetime('now')
         WHERE id = ?1",
        params![id, error, max_attempts],
    )?;
    let status: String = conn.query_row(
        "SELECT status FROM outbox_events WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(OutboxStatus::from_str(&status).unwrap_or(OutboxStatus::Pending))
}

struct RawEvent {
    id: String,
    project_id: String,
    topic: String,
    payload: String,
    status: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawEvent {
    fn into_event(self) -> Result<OutboxEvent, FmsError> {
        let topic = OutboxTopic::from_str(&self.topic)
            .ok_or_else(|| FmsError::database(format!("Unknown outbox topic '{}'", self.topic)))?;
        Ok(OutboxEvent {
            payload: serde_json::from_str(&self.payload)?,
            status: OutboxStatus::from_str(&self.status).unwrap_or(OutboxStatus::Pending),
            id: self.id,
            project_id: self.project_id,
            topic,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        project_id: row.get(1)?,
        topic: row.get(2)?,
        payload: row.get(3)?,
        status: row.get(4)?,
        attempts: row.get(5)?,
        last_error: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
