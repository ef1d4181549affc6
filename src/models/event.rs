use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScoreCard;

/// Emitted by the state machine, flushed to the outbox with the project write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    TaskCompleted(TaskCompleted),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub project_id: String,
    pub project_code: String,
    pub task_seq: u32,
    pub assignee: String,
    pub completed_by: String,
    pub completed_at: DateTime<Utc>,
    pub score: Option<ScoreCard>,
    pub trigger_template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxTopic {
    ScoreLog,
    Trigger,
}

impl OutboxTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScoreLog => "score_log",
            Self::Trigger => "trigger",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "score_log" => Some(Self::ScoreLog),
            "trigger" => Some(Self::Trigger),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Done,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: String,
    pub project_id: String,
    pub topic: OutboxTopic,
    pub payload: EngineEvent,
    pub status: OutboxStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
