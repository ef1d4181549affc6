use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::Config;
use crate::db::{outbox_repo, score_log_repo, with_transaction};
use crate::engine::trigger;
use crate::error::FmsError;
use crate::models::{EngineEvent, OutboxEvent, OutboxStatus, OutboxTopic, ScoreLogEntry};

#[derive(Debug, Default, Clone, Serialize)]
pub struct DrainReport {
    pub processed: usize,
    pub retrying: usize,
    pub failed: usize,
    /// Codes of projects spawned by trigger rows.
    pub spawned: Vec<String>,
}

fn log_score(conn: &Connection, row: &OutboxEvent, now: DateTime<Utc>) -> Result<(), FmsError> {
    let EngineEvent::TaskCompleted(done) = &row.payload;
    let Some(card) = done.score else {
        return Ok(());
    };
    score_log_repo::append(
        conn,
        &ScoreLogEntry {
            id: ulid::Ulid::new().to_string(),
            project_id: done.project_id.clone(),
            task_seq: done.task_seq,
            assignee: done.assignee.clone(),
            planned_days: card.planned_days,
            actual_days: card.actual_days,
            score: card.score,
            on_time: card.on_time,
            score_impacted: card.score_impacted,
            reason: card.reason().to_string(),
            logged_at: now,
        },
    )
}

/// Runs one row's consumer and marks it done in the same transaction.
fn handle(
    conn: &Connection,
    config: &Config,
    row: &OutboxEvent,
    now: DateTime<Utc>,
) -> Result<Option<String>, FmsError> {
    with_transaction(conn, || {
        let spawned = match row.topic {
            OutboxTopic::ScoreLog => {
                log_score(conn, row, now)?;
                None
            }
            OutboxTopic::Trigger => {
                let EngineEvent::TaskCompleted(done) = &row.payload;
                trigger::propagate(conn, config, done, now)?.map(|p| p.code)
            }
        };
        outbox_repo::mark_done(conn, &row.id)?;
        Ok(spawned)
    })
}

/// Deliver every pending outbox row. A failing row is recorded and left for
/// the next drain; it never stops the others.
pub fn drain(conn: &Connection, config: &Config, now: DateTime<Utc>) -> Result<DrainReport, FmsError> {
    let mut report = DrainReport::default();
    for row in outbox_repo::pending_events(conn)? {
        match handle(conn, config, &row, now) {
            Ok(spawned) => {
                report.processed += 1;
                report.spawned.extend(spawned);
            }
            Err(e) => {
                let status =
                    outbox_repo::mark_failure(conn, &row.id, &e.to_string(), config.outbox_max_attempts)?;
                tracing::warn!(
                    event = %row.id,
                    topic = row.topic.as_str(),
                    error = %e,
                    status = status.as_str(),
                    "outbox delivery failed"
                );
                match status {
                    OutboxStatus::Failed => report.failed += 1,
                    _ => report.retrying += 1,
                }
            }
        }
    }
    Ok(report)
}
