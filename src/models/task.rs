use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Objection, Offset, ScoreCard, TimingMode};

/// Flat status name, used for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    AwaitingDate,
    Scheduled,
    Pending,
    InProgress,
    OnHold,
    Terminated,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::AwaitingDate => "awaiting_date",
            Self::Scheduled => "scheduled",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Terminated => "terminated",
            Self::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Terminated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub completed_at: DateTime<Utc>,
    pub completed_by: String,
    /// Live due date at the moment of completion.
    pub due: Option<DateTime<Utc>>,
    pub score: Option<ScoreCard>,
}

/// Runtime state of one step. Hold and termination are states, not flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepState {
    /// Dependent step waiting for its predecessor's completion instant.
    NotStarted,
    /// Waiting for a human to supply the due date.
    AwaitingDate,
    /// Has a due date but its predecessor is not done yet.
    Scheduled { due: DateTime<Utc> },
    Pending { due: DateTime<Utc> },
    InProgress {
        due: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },
    OnHold {
        prior: Box<StepState>,
        since: DateTime<Utc>,
    },
    Terminated {
        at: DateTime<Utc>,
        by: String,
        completion: Option<Completion>,
    },
    Done(Completion),
}

impl StepState {
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::NotStarted => TaskStatus::NotStarted,
            Self::AwaitingDate => TaskStatus::AwaitingDate,
            Self::Scheduled { .. } => TaskStatus::Scheduled,
            Self::Pending { .. } => TaskStatus::Pending,
            Self::InProgress { .. } => TaskStatus::InProgress,
            Self::OnHold { .. } => TaskStatus::OnHold,
            Self::Terminated { .. } => TaskStatus::Terminated,
            Self::Done(_) => TaskStatus::Done,
        }
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Scheduled { due } | Self::Pending { due } | Self::InProgress { due, .. } => {
                Some(*due)
            }
            Self::OnHold { prior, .. } => prior.due(),
            Self::Done(c) => c.due,
            Self::NotStarted | Self::AwaitingDate | Self::Terminated { .. } => None,
        }
    }

    /// Same state with a different due date. Undated waiting states become
    /// `Scheduled`, or `Pending` when `active`. Finished states return `None`.
    pub fn with_due(&self, new_due: DateTime<Utc>, active: bool) -> Option<StepState> {
        match self {
            Self::NotStarted | Self::AwaitingDate | Self::Scheduled { .. } => {
                if active {
                    Some(Self::Pending { due: new_due })
                } else {
                    Some(Self::Scheduled { due: new_due })
                }
            }
            Self::Pending { .. } => Some(Self::Pending { due: new_due }),
            Self::InProgress { started_at, .. } => Some(Self::InProgress {
                due: new_due,
                started_at: *started_at,
            }),
            Self::OnHold { prior, since } => prior.with_due(new_due, active).map(|p| Self::OnHold {
                prior: Box::new(p),
                since: *since,
            }),
            Self::Terminated { .. } | Self::Done(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub label: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub seq: u32,
    pub description: String,
    pub assignee_id: String,
    pub assignee_name: String,
    pub timing: TimingMode,
    pub offset: Option<Offset>,
    pub checklist_required: bool,
    pub checklist: Vec<ChecklistItem>,
    pub attachments_required: bool,
    pub attachments: Vec<String>,
    pub trigger_template: Option<String>,
    pub state: StepState,
    /// First computed due date. Never overwritten.
    pub original_planned_at: Option<DateTime<Utc>>,
    /// Instant the first due date was computed from; day counts start here.
    pub anchor_at: Option<DateTime<Utc>>,
    pub planned_days: Option<i64>,
    pub score_impacted: bool,
    pub notes: Option<String>,
    pub objections: Vec<Objection>,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn planned_due(&self) -> Option<DateTime<Utc>> {
        self.state.due()
    }

    pub fn is_on_hold(&self) -> bool {
        matches!(self.state, StepState::OnHold { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, StepState::Terminated { .. })
    }

    /// Done or terminated; either lets the successor proceed.
    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn completion(&self) -> Option<&Completion> {
        match &self.state {
            StepState::Done(c) => Some(c),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<&ScoreCard> {
        self.completion().and_then(|c| c.score.as_ref())
    }

    pub fn completion_score(&self) -> Option<f64> {
        self.score().map(|s| s.score)
    }

    pub fn actual_completion_days(&self) -> Option<i64> {
        self.score().map(|s| s.actual_days)
    }

    /// Records the first due date and its anchor; later calls are no-ops.
    pub fn freeze_original(&mut self, anchor: DateTime<Utc>, due: DateTime<Utc>) {
        if self.original_planned_at.is_none() {
            self.original_planned_at = Some(due);
            self.anchor_at = Some(anchor);
            self.planned_days = Some(crate::engine::scoring::day_span(anchor, due));
        }
    }

    pub fn find_objection(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Some(i) = self.objections.iter().position(|o| o.id == reference) {
            return Some(i);
        }
        let matches: Vec<usize> = self
            .objections
            .iter()
            .enumerate()
            .filter(|(_, o)| o.id.starts_with(reference))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn pending_objections(&self) -> impl Iterator<Item = &Objection> {
        self.objections.iter().filter(|o| o.is_pending())
    }
}
