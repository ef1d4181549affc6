use chrono::Duration;
use serde::{Deserialize, Serialize};

/// How a step's due date is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Offset from the project start instant.
    FixedOffset,
    /// Offset from the predecessor's completion instant.
    DependentOffset,
    /// A human supplies the date once the predecessor is done.
    AskOnCompletion,
}

impl TimingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedOffset => "fixed_offset",
            Self::DependentOffset => "dependent_offset",
            Self::AskOnCompletion => "ask_on_completion",
        }
    }
}

/// Offset magnitude and unit. Serialized as `{"unit": "days", "days": 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Offset {
    Hours { hours: u32 },
    Days { days: u32 },
    DaysHours { days: u32, hours: u32 },
}

impl Offset {
    pub fn zero() -> Self {
        Self::Hours { hours: 0 }
    }

    pub fn duration(&self) -> Duration {
        match *self {
            Self::Hours { hours } => Duration::hours(i64::from(hours)),
            Self::Days { days } => Duration::hours(i64::from(days) * 24),
            Self::DaysHours { days, hours } => {
                Duration::hours(i64::from(days) * 24 + i64::from(hours))
            }
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            Self::Hours { hours } => format!("{hours}h"),
            Self::Days { days } => format!("{days}d"),
            Self::DaysHours { days, hours } => format!("{days}d{hours}h"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub seq: u32,
    pub description: String,
    /// User ids or names; the first resolvable one becomes the acting assignee.
    pub assignees: Vec<String>,
    pub timing: TimingMode,
    #[serde(default)]
    pub offset: Option<Offset>,
    #[serde(default)]
    pub checklist_required: bool,
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub attachments_required: bool,
    /// Downstream template spawned when this step completes.
    #[serde(default)]
    pub trigger_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub shift_weekend: bool,
    pub approver: Option<String>,
    pub steps: Vec<StepDef>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_units_parse_from_json() {
        let o: Offset = serde_json::from_str(r#"{"unit":"days_hours","days":1,"hours":6}"#).unwrap();
        assert_eq!(o.duration(), Duration::hours(30));

        let o: Offset = serde_json::from_str(r#"{"unit":"days","days":3}"#).unwrap();
        assert_eq!(o.duration(), Duration::hours(72));
    }

    #[test]
    fn unknown_offset_unit_rejected() {
        let r: Result<Offset, _> = serde_json::from_str(r#"{"unit":"weeks","weeks":1}"#);
        assert!(r.is_err());
    }
}
