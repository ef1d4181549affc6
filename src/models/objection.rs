use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionKind {
    DateChange,
    Hold,
    Terminate,
}

impl ObjectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateChange => "date_change",
            Self::Hold => "hold",
            Self::Terminate => "terminate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date_change" | "date-change" => Some(Self::DateChange),
            "hold" => Some(Self::Hold),
            "terminate" => Some(Self::Terminate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ObjectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// The approver's verdict on a pending objection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve" | "approved" => Some(Self::Approve),
            "reject" | "rejected" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub approver: String,
    pub remarks: Option<String>,
    pub decided_at: DateTime<Utc>,
    pub impact_score: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objection {
    pub id: String,
    pub kind: ObjectionKind,
    pub requested_date: Option<DateTime<Utc>>,
    /// Audit only: requested minus current planned date, rounded up to whole days.
    pub extra_days_requested: Option<i64>,
    pub remarks: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub status: ObjectionStatus,
    pub resolution: Option<Resolution>,
}

impl Objection {
    pub fn is_pending(&self) -> bool {
        self.status == ObjectionStatus::Pending
    }
}
