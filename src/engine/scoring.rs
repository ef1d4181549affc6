use chrono::{DateTime, Utc};

use crate::models::{ScoreCard, Task};

/// Calendar days from `anchor` to `instant`, time of day ignored, at least 1.
pub fn day_span(anchor: DateTime<Utc>, instant: DateTime<Utc>) -> i64 {
    (instant.date_naive() - anchor.date_naive()).num_days().max(1)
}

pub fn score(
    anchor: DateTime<Utc>,
    planned: DateTime<Utc>,
    completed: DateTime<Utc>,
    score_impacted: bool,
) -> ScoreCard {
    let planned_days = day_span(anchor, planned);
    let actual_days = day_span(anchor, completed);
    let on_time = completed.date_naive() <= planned.date_naive();
    let score = if on_time {
        1.0
    } else {
        (planned_days as f64 / actual_days as f64).clamp(0.0, 1.0)
    };
    ScoreCard {
        score,
        planned_days,
        actual_days,
        on_time,
        score_impacted,
    }
}

/// Planned date used as the scoring baseline. An approved date change moves
/// it to the revised date unless the approver kept the score impact, in
/// which case the task is still measured against its original date.
pub fn baseline(task: &Task) -> Option<DateTime<Utc>> {
    if task.score_impacted {
        task.original_planned_at.or_else(|| task.planned_due())
    } else {
        task.planned_due().or(task.original_planned_at)
    }
}

/// Scores a task that is about to be marked done at `completed`.
pub fn score_task(task: &Task, completed: DateTime<Utc>) -> Option<ScoreCard> {
    let planned = baseline(task)?;
    let anchor = task.anchor_at.unwrap_or(planned);
    Some(score(anchor, planned, completed, task.score_impacted))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aggregate {
    pub on_time: u32,
    pub late: u32,
    pub score: Option<u32>,
}

/// Project-level counters over scored, done tasks. Terminated tasks are
/// excluded from both numerator and denominator.
pub fn aggregate(tasks: &[Task]) -> Aggregate {
    let mut agg = Aggregate::default();
    for card in tasks.iter().filter_map(|t| t.score()) {
        if card.on_time {
            agg.on_time += 1;
        } else {
            agg.late += 1;
        }
    }
    let scored = agg.on_time + agg.late;
    if scored > 0 {
        agg.score = Some((100.0 * f64::from(agg.on_time) / f64::from(scored)).round() as u32);
    }
    agg
}
