use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EngineEvent, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Human-readable unique identifier, e.g. `PRJ-240301-0042`.
    pub code: String,
    pub name: String,
    pub template_id: String,
    pub template_name: String,
    pub spawned_from: Option<String>,
    pub created_by: String,
    pub approver: String,
    pub shift_weekend: bool,
    pub start_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every save.
    pub version: i64,
    pub tasks: Vec<Task>,
    pub tasks_on_time: u32,
    pub tasks_late: u32,
    pub score: Option<u32>,
    /// Events raised by the last mutation; flushed to the outbox on save.
    #[serde(skip)]
    pub pending_events: Vec<EngineEvent>,
}

impl Project {
    pub fn status(&self) -> ProjectStatus {
        if self.tasks.iter().all(|t| t.is_finished()) {
            ProjectStatus::Completed
        } else {
            ProjectStatus::Active
        }
    }

    pub fn task_index(&self, seq: u32) -> Option<usize> {
        self.tasks.iter().position(|t| t.seq == seq)
    }

    /// A task is active once every earlier task is done or terminated.
    pub fn is_active_index(&self, index: usize) -> bool {
        self.tasks[..index].iter().all(|t| t.is_finished())
    }

    pub fn has_pending_objections(&self) -> bool {
        self.tasks.iter().any(|t| t.pending_objections().next().is_some())
    }
}
