use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of scoring one completed task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: f64,
    pub planned_days: i64,
    pub actual_days: i64,
    pub on_time: bool,
    pub score_impacted: bool,
}

impl ScoreCard {
    pub fn reason(&self) -> &'static str {
        if self.score_impacted {
            "objection with score impact"
        } else if self.on_time {
            "on time"
        } else {
            "late"
        }
    }
}

/// Immutable audit record, one per scoring event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreLogEntry {
    pub id: String,
    pub project_id: String,
    pub task_seq: u32,
    pub assignee: String,
    pub planned_days: i64,
    pub actual_days: i64,
    pub score: f64,
    pub on_time: bool,
    pub score_impacted: bool,
    pub reason: String,
    pub logged_at: DateTime<Utc>,
}
