use chrono::{DateTime, Utc};

use crate::engine::{due_date, scoring};
use crate::error::FmsError;
use crate::models::{
    ChecklistItem, Completion, EngineEvent, Project, StepState, Task, TaskCompleted, TimingMode,
};

#[derive(Debug, Clone)]
pub struct CompletionInput {
    pub completed_by: String,
    pub completed_at: DateTime<Utc>,
    pub attachments: Vec<String>,
    /// Checklist labels ticked off with this completion.
    pub checked: Vec<String>,
    pub notes: Option<String>,
    /// Due date for an ask-on-completion task completed in the same call.
    pub due: Option<DateTime<Utc>>,
}

impl CompletionInput {
    pub fn new(completed_by: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            completed_by: completed_by.into(),
            completed_at,
            attachments: Vec::new(),
            checked: Vec::new(),
            notes: None,
            due: None,
        }
    }
}

pub fn locate(project: &Project, seq: u32) -> Result<usize, FmsError> {
    project
        .task_index(seq)
        .ok_or_else(|| FmsError::task_not_found(&project.code, seq))
}

fn waiting_reason(project: &Project, index: usize) -> String {
    let blocker = project.tasks[..index]
        .iter()
        .find(|t| !t.is_finished())
        .map(|t| format!("task {} is {}", t.seq, t.status().as_str()))
        .unwrap_or_else(|| "its predecessor is not done".into());
    format!(
        "Task {} of {} is not active yet: {}",
        project.tasks[index].seq, project.code, blocker
    )
}

/// Pending → InProgress.
pub fn start_task(project: &mut Project, seq: u32, now: DateTime<Utc>) -> Result<(), FmsError> {
    let index = locate(project, seq)?;
    let task = &mut project.tasks[index];
    match task.state {
        StepState::Pending { due } => {
            task.state = StepState::InProgress { due, started_at: now };
            Ok(())
        }
        _ => Err(FmsError::illegal_state(format!(
            "Task {} of {} cannot start from status {}",
            seq,
            project.code,
            task.status().as_str()
        ))),
    }
}

/// Supplies the due date of an ask-on-completion task.
pub fn supply_due_date(
    project: &mut Project,
    seq: u32,
    due: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), FmsError> {
    let index = locate(project, seq)?;
    if project.tasks[index].state != StepState::AwaitingDate {
        return Err(FmsError::illegal_state(format!(
            "Task {} of {} is {}; a date can only be supplied while awaiting_date",
            seq,
            project.code,
            project.tasks[index].status().as_str()
        )));
    }
    if due < project.start_at {
        return Err(FmsError::validation(format!(
            "Due date {} for task {} is before project start {}",
            due.to_rfc3339(),
            seq,
            project.start_at.to_rfc3339()
        )));
    }
    let active = project.is_active_index(index);
    let task = &mut project.tasks[index];
    if let Some(next) = task.state.with_due(due, active) {
        task.state = next;
    }
    task.freeze_original(now, due);
    tracing::debug!(project = %project.code, seq, due = %due, "due date supplied");
    Ok(())
}

fn apply_checklist(task: &Task, checked: &[String]) -> Result<Vec<ChecklistItem>, FmsError> {
    let mut items = task.checklist.clone();
    for label in checked {
        match items.iter_mut().find(|i| &i.label == label) {
            Some(item) => item.done = true,
            None => {
                return Err(FmsError::validation(format!(
                    "Task {} has no checklist item '{}'",
                    task.seq, label
                )))
            }
        }
    }
    if task.checklist_required {
        let open: Vec<&str> = items
            .iter()
            .filter(|i| !i.done)
            .map(|i| i.label.as_str())
            .collect();
        if !open.is_empty() {
            return Err(FmsError::validation(format!(
                "Task {} requires its checklist; unchecked: {}",
                task.seq,
                open.join(", ")
            )));
        }
    }
    Ok(items)
}

/// Pending/InProgress → Done, then scoring, successor activation and the
/// completion event. Nothing is mutated unless every check passes.
pub fn complete_task(project: &mut Project, seq: u32, input: CompletionInput) -> Result<(), FmsError> {
    let index = locate(project, seq)?;
    let mut task = project.tasks[index].clone();
    let at = input.completed_at;

    match task.state {
        StepState::Pending { .. } | StepState::InProgress { .. } => {
            if input.due.is_some() {
                return Err(FmsError::validation(format!(
                    "Task {seq} already has a due date; --due only applies to awaiting_date tasks"
                )));
            }
        }
        StepState::AwaitingDate => {
            if !project.is_active_index(index) {
                return Err(FmsError::illegal_state(waiting_reason(project, index)));
            }
            let Some(due) = input.due else {
                return Err(FmsError::validation(format!(
                    "Task {seq} of {} is awaiting a due date; supply one to complete it",
                    project.code
                )));
            };
            if due < project.start_at {
                return Err(FmsError::validation(format!(
                    "Due date {} for task {seq} is before project start",
                    due.to_rfc3339()
                )));
            }
            task.state = StepState::Pending { due };
            task.freeze_original(at, due);
        }
        StepState::OnHold { .. } => {
            return Err(FmsError::illegal_state(format!(
                "Task {seq} of {} is on hold",
                project.code
            )))
        }
        StepState::Terminated { .. } => {
            return Err(FmsError::illegal_state(format!(
                "Task {seq} of {} is terminated",
                project.code
            )))
        }
        StepState::Done(_) => {
            return Err(FmsError::illegal_state(format!(
                "Task {seq} of {} is already done",
                project.code
            )))
        }
        StepState::NotStarted | StepState::Scheduled { .. } => {
            return Err(FmsError::illegal_state(waiting_reason(project, index)))
        }
    }

    task.checklist = apply_checklist(&task, &input.checked)?;
    if task.attachments_required && task.attachments.is_empty() && input.attachments.is_empty() {
        return Err(FmsError::validation(format!(
            "Task {seq} requires at least one attachment"
        )));
    }

    let score = scoring::score_task(&task, at);
    task.attachments.extend(input.attachments);
    if input.notes.is_some() {
        task.notes = input.notes;
    }
    task.state = StepState::Done(Completion {
        completed_at: at,
        completed_by: input.completed_by.clone(),
        due: task.planned_due(),
        score,
    });

    let event = TaskCompleted {
        project_id: project.id.clone(),
        project_code: project.code.clone(),
        task_seq: seq,
        assignee: task.assignee_id.clone(),
        completed_by: input.completed_by,
        completed_at: at,
        score,
        trigger_template: task.trigger_template.clone(),
    };
    project.tasks[index] = task;

    refresh_aggregates(project);
    activate_successor(project, index, at);
    project.pending_events.push(EngineEvent::TaskCompleted(event));

    tracing::info!(
        project = %project.code,
        seq,
        score = ?score.map(|s| s.score),
        on_time = ?score.map(|s| s.on_time),
        "task completed"
    );
    Ok(())
}

fn promote(state: &StepState, task: &Task, finished_at: DateTime<Utc>, shift: bool) -> StepState {
    match state {
        StepState::NotStarted => {
            let due = due_date::due_from(finished_at, task.offset.as_ref(), shift);
            StepState::Pending { due }
        }
        StepState::Scheduled { due } => StepState::Pending { due: *due },
        StepState::OnHold { prior, since } => StepState::OnHold {
            prior: Box::new(promote(prior, task, finished_at, shift)),
            since: *since,
        },
        // AwaitingDate stays gated on a human-supplied date.
        other => other.clone(),
    }
}

/// Moves the first unfinished task after `index` forward once everything
/// before it is finished. Terminated tasks in between are passed over.
pub fn activate_successor(project: &mut Project, index: usize, finished_at: DateTime<Utc>) {
    let Some(next) = (index + 1..project.tasks.len()).find(|&i| !project.tasks[i].is_finished())
    else {
        return;
    };
    if !project.is_active_index(next) {
        return;
    }
    let shift = project.shift_weekend;
    let task = &mut project.tasks[next];
    let before = task.status();
    let promoted = promote(&task.state, task, finished_at, shift);
    if task.original_planned_at.is_none() {
        if let Some(due) = promoted.due() {
            task.freeze_original(finished_at, due);
        }
    }
    task.state = promoted;

    if task.timing == TimingMode::DependentOffset && before != task.status() {
        tracing::debug!(seq = task.seq, due = ?task.planned_due(), "dependent task activated");
    }
}

/// Approved hold objection.
pub fn hold_task(project: &mut Project, index: usize, at: DateTime<Utc>) -> Result<(), FmsError> {
    let task = &mut project.tasks[index];
    match task.state {
        StepState::OnHold { .. } | StepState::Terminated { .. } | StepState::Done(_) => {
            Err(FmsError::illegal_state(format!(
                "Task {} of {} cannot be put on hold from status {}",
                task.seq,
                project.code,
                task.status().as_str()
            )))
        }
        _ => {
            let prior = std::mem::replace(&mut task.state, StepState::NotStarted);
            task.state = StepState::OnHold {
                prior: Box::new(prior),
                since: at,
            };
            Ok(())
        }
    }
}

/// Approved terminate objection. Skips scoring and triggers; the successor
/// proceeds as if the task were done.
pub fn terminate_task(
    project: &mut Project,
    index: usize,
    by: &str,
    at: DateTime<Utc>,
) -> Result<(), FmsError> {
    let task = &mut project.tasks[index];
    let completion = match &task.state {
        StepState::Terminated { .. } => {
            return Err(FmsError::illegal_state(format!(
                "Task {} of {} is already terminated",
                task.seq, project.code
            )))
        }
        StepState::Done(c) => Some(c.clone()),
        _ => None,
    };
    let was_done = completion.is_some();
    task.state = StepState::Terminated {
        at,
        by: by.to_string(),
        completion,
    };
    refresh_aggregates(project);
    if !was_done {
        activate_successor(project, index, at);
    }
    Ok(())
}

pub fn refresh_aggregates(project: &mut Project) {
    let agg = scoring::aggregate(&project.tasks);
    project.tasks_on_time = agg.on_time;
    project.tasks_late = agg.late;
    project.score = agg.score;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Offset, Task};
    use chrono::{Duration, TimeZone};

    pub(crate) fn t0() -> DateTime<Utc> {
        // Monday
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    pub(crate) fn task(seq: u32, timing: TimingMode, offset: Option<Offset>, state: StepState) -> Task {
        Task {
            seq,
            description: format!("step {seq}"),
            assignee_id: "u1".into(),
            assignee_name: "alice".into(),
            timing,
            offset,
            checklist_required: false,
            checklist: Vec::new(),
            attachments_required: false,
            attachments: Vec::new(),
            trigger_template: None,
            state,
            original_planned_at: None,
            anchor_at: None,
            planned_days: None,
            score_impacted: false,
            notes: None,
            objections: Vec::new(),
        }
    }

    pub(crate) fn project(tasks: Vec<Task>) -> Project {
        Project {
            id: "P1".into(),
            code: "PRJ-240304-0001".into(),
            name: "Onboarding".into(),
            template_id: "T1".into(),
            template_name: "onboarding".into(),
            spawned_from: None,
            created_by: "u1".into(),
            approver: "boss".into(),
            shift_weekend: false,
            start_at: t0(),
            created_at: t0(),
            version: 1,
            tasks,
            tasks_on_time: 0,
            tasks_late: 0,
            score: None,
            pending_events: Vec::new(),
        }
    }

    /// pending(2d) → dependent(1d) → ask-on-completion
    pub(crate) fn three_step() -> Project {
        let due1 = t0() + Duration::days(2);
        let mut first = task(1, TimingMode::FixedOffset, Some(Offset::Days { days: 2 }), StepState::Pending { due: due1 });
        first.freeze_original(t0(), due1);
        project(vec![
            first,
            task(2, TimingMode::DependentOffset, Some(Offset::Days { days: 1 }), StepState::NotStarted),
            task(3, TimingMode::AskOnCompletion, None, StepState::AwaitingDate),
        ])
    }

    #[test]
    fn completing_activates_dependent_successor_from_completion_instant() {
        let mut p = three_step();
        assert_eq!(p.tasks[1].planned_due(), None);

        let done_at = t0() + Duration::hours(30);
        complete_task(&mut p, 1, CompletionInput::new("u1", done_at)).unwrap();

        let second = &p.tasks[1];
        assert_eq!(second.status().as_str(), "pending");
        assert_eq!(second.planned_due(), Some(done_at + Duration::days(1)));
        assert_eq!(second.original_planned_at, Some(done_at + Duration::days(1)));
        assert_eq!(second.anchor_at, Some(done_at));
    }

    #[test]
    fn completion_scores_and_emits_event() {
        let mut p = three_step();
        complete_task(&mut p, 1, CompletionInput::new("u1", t0() + Duration::days(1))).unwrap();
        let card = p.tasks[0].score().copied().unwrap();
        assert!(card.on_time);
        assert_eq!(p.tasks_on_time, 1);
        assert_eq!(p.score, Some(100));
        assert_eq!(p.pending_events.len(), 1);
    }

    #[test]
    fn awaiting_date_successor_stays_gated() {
        let mut p = three_step();
        complete_task(&mut p, 1, CompletionInput::new("u1", t0())).unwrap();
        complete_task(&mut p, 2, CompletionInput::new("u1", t0() + Duration::days(1))).unwrap();
        assert_eq!(p.tasks[2].state, StepState::AwaitingDate);
        assert_eq!(p.tasks[2].planned_due(), None);
    }

    #[test]
    fn out_of_order_completion_rejected() {
        let mut p = three_step();
        let err = complete_task(&mut p, 2, CompletionInput::new("u1", t0())).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::IllegalState);
        assert_eq!(p.tasks[1].state, StepState::NotStarted);
    }

    #[test]
    fn awaiting_date_completed_with_date_in_same_call() {
        let mut p = three_step();
        complete_task(&mut p, 1, CompletionInput::new("u1", t0())).unwrap();
        complete_task(&mut p, 2, CompletionInput::new("u1", t0())).unwrap();

        let mut input = CompletionInput::new("u1", t0() + Duration::days(3));
        let err = complete_task(&mut p, 3, input.clone()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        input.due = Some(t0() + Duration::days(5));
        complete_task(&mut p, 3, input).unwrap();
        assert_eq!(p.tasks[2].status().as_str(), "done");
        assert_eq!(p.status().as_str(), "completed");
    }

    #[test]
    fn supply_date_before_activation_schedules() {
        let mut p = three_step();
        supply_due_date(&mut p, 3, t0() + Duration::days(9), t0()).unwrap();
        assert_eq!(p.tasks[2].status().as_str(), "scheduled");

        complete_task(&mut p, 1, CompletionInput::new("u1", t0())).unwrap();
        complete_task(&mut p, 2, CompletionInput::new("u1", t0())).unwrap();
        assert_eq!(p.tasks[2].state, StepState::Pending { due: t0() + Duration::days(9) });
    }

    #[test]
    fn supply_date_only_while_awaiting() {
        let mut p = three_step();
        let err = supply_due_date(&mut p, 1, t0() + Duration::days(9), t0()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::IllegalState);
    }

    #[test]
    fn checklist_and_attachment_requirements() {
        let mut p = three_step();
        p.tasks[0].checklist_required = true;
        p.tasks[0].checklist = vec![
            ChecklistItem { label: "a".into(), done: false },
            ChecklistItem { label: "b".into(), done: false },
        ];
        p.tasks[0].attachments_required = true;

        let mut input = CompletionInput::new("u1", t0());
        input.checked = vec!["a".into()];
        let err = complete_task(&mut p, 1, input.clone()).unwrap_err();
        assert!(err.message.contains("unchecked: b"));

        input.checked = vec!["a".into(), "b".into()];
        let err = complete_task(&mut p, 1, input.clone()).unwrap_err();
        assert!(err.message.contains("attachment"));
        assert!(!p.tasks[0].checklist[0].done);

        input.attachments = vec!["invoice.pdf".into()];
        complete_task(&mut p, 1, input).unwrap();
        assert!(p.tasks[0].checklist.iter().all(|i| i.done));
    }

    #[test]
    fn hold_blocks_completion() {
        let mut p = three_step();
        hold_task(&mut p, 0, t0()).unwrap();
        let err = complete_task(&mut p, 1, CompletionInput::new("u1", t0())).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::IllegalState);
        assert!(err.message.contains("on hold"));
    }

    #[test]
    fn terminate_skips_scoring_and_advances() {
        let mut p = three_step();
        terminate_task(&mut p, 0, "boss", t0()).unwrap();
        assert!(p.tasks[0].is_terminated());
        assert_eq!(p.tasks[0].completion_score(), None);
        assert_eq!(p.score, None);
        assert!(p.pending_events.is_empty());
        assert_eq!(p.tasks[1].status().as_str(), "pending");

        let err = terminate_task(&mut p, 0, "boss", t0()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::IllegalState);
    }

    fn dependent_chain(len: u32) -> Project {
        let due1 = t0() + Duration::days(2);
        let mut first = task(1, TimingMode::FixedOffset, Some(Offset::Days { days: 2 }), StepState::Pending { due: due1 });
        first.freeze_original(t0(), due1);
        let mut tasks = vec![first];
        for seq in 2..=len {
            tasks.push(task(seq, TimingMode::DependentOffset, Some(Offset::Days { days: 1 }), StepState::NotStarted));
        }
        project(tasks)
    }

    #[test]
    fn terminating_a_future_task_is_skipped_when_its_predecessor_finishes() {
        let mut p = dependent_chain(3);
        terminate_task(&mut p, 1, "boss", t0()).unwrap();
        assert_eq!(p.tasks[2].state, StepState::NotStarted);

        let done_at = t0() + Duration::days(1);
        complete_task(&mut p, 1, CompletionInput::new("u1", done_at)).unwrap();
        assert_eq!(p.tasks[2].state, StepState::Pending { due: done_at + Duration::days(1) });

        complete_task(&mut p, 3, CompletionInput::new("u1", done_at + Duration::days(1))).unwrap();
        assert_eq!(p.status().as_str(), "completed");
        assert_eq!(p.tasks_on_time, 2);
    }

    #[test]
    fn a_run_of_terminated_tasks_is_passed_over() {
        let mut p = dependent_chain(4);
        terminate_task(&mut p, 2, "boss", t0()).unwrap();
        terminate_task(&mut p, 1, "boss", t0()).unwrap();

        let done_at = t0() + Duration::hours(12);
        complete_task(&mut p, 1, CompletionInput::new("u1", done_at)).unwrap();
        assert!(p.tasks[1].is_terminated());
        assert!(p.tasks[2].is_terminated());
        assert_eq!(p.tasks[3].state, StepState::Pending { due: done_at + Duration::days(1) });
        assert_eq!(p.tasks[3].anchor_at, Some(done_at));
    }

    #[test]
    fn terminating_the_active_task_skips_terminated_followers() {
        let mut p = dependent_chain(3);
        terminate_task(&mut p, 1, "boss", t0()).unwrap();
        terminate_task(&mut p, 0, "boss", t0()).unwrap();
        assert_eq!(p.tasks[2].state, StepState::Pending { due: t0() + Duration::days(1) });
    }

    #[test]
    fn terminating_a_done_task_drops_it_from_aggregate() {
        let mut p = three_step();
        complete_task(&mut p, 1, CompletionInput::new("u1", t0())).unwrap();
        assert_eq!(p.score, Some(100));
        terminate_task(&mut p, 0, "boss", t0()).unwrap();
        assert_eq!(p.score, None);
        assert_eq!(p.tasks_on_time, 0);
    }

    #[test]
    fn start_then_complete() {
        let mut p = three_step();
        start_task(&mut p, 1, t0()).unwrap();
        assert_eq!(p.tasks[0].status().as_str(), "in_progress");
        assert!(start_task(&mut p, 1, t0()).is_err());
        complete_task(&mut p, 1, CompletionInput::new("u1", t0())).unwrap();
    }
}
