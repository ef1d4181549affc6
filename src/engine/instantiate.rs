use chrono::{DateTime, Utc};

use crate::engine::due_date;
use crate::error::FmsError;
use crate::models::{ChecklistItem, Project, StepState, Task, Template, TimingMode, User};

/// Human-readable project code: `<PREFIX>-<YYMMDD>-<NNNN>`.
pub fn generate_code(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix = ulid::Ulid::new().random() % 10_000;
    format!("{}-{}-{:04}", prefix, now.format("%y%m%d"), suffix)
}

/// Materializes a project from a template. Every step must resolve to an
/// acting assignee or the whole instantiation fails.
pub fn build_project<F>(
    template: &Template,
    start: DateTime<Utc>,
    created_by: &User,
    name: Option<&str>,
    now: DateTime<Utc>,
    mut resolve: F,
) -> Result<Project, FmsError>
where
    F: FnMut(&str) -> Result<Option<User>, FmsError>,
{
    if template.steps.is_empty() {
        return Err(FmsError::validation(format!(
            "Template '{}' has no steps",
            template.name
        )));
    }

    let approver = match template.approver.as_deref() {
        Some(reference) => resolve(reference)?.ok_or_else(|| {
            FmsError::validation(format!(
                "Template '{}' approver '{}' cannot be resolved",
                template.name, reference
            ))
        })?,
        None => created_by.clone(),
    };

    let mut steps: Vec<_> = template.steps.iter().collect();
    steps.sort_by_key(|s| s.seq);

    let mut tasks = Vec::with_capacity(steps.len());
    for (i, step) in steps.into_iter().enumerate() {
        let mut assignee = None;
        for reference in &step.assignees {
            if let Some(user) = resolve(reference)? {
                assignee = Some(user);
                break;
            }
        }
        let Some(assignee) = assignee else {
            return Err(FmsError::validation(format!(
                "Step {} ('{}') of template '{}' has no resolvable assignee (tried: {})",
                step.seq,
                step.description,
                template.name,
                if step.assignees.is_empty() {
                    "none".to_string()
                } else {
                    step.assignees.join(", ")
                }
            )));
        };

        let mut task = Task {
            seq: step.seq,
            description: step.description.clone(),
            assignee_id: assignee.id,
            assignee_name: assignee.name,
            timing: step.timing,
            offset: step.offset,
            checklist_required: step.checklist_required,
            checklist: step
                .checklist
                .iter()
                .map(|label| ChecklistItem {
                    label: label.clone(),
                    done: false,
                })
                .collect(),
            attachments_required: step.attachments_required,
            attachments: Vec::new(),
            trigger_template: step.trigger_template.clone(),
            state: StepState::NotStarted,
            original_planned_at: None,
            anchor_at: None,
            planned_days: None,
            score_impacted: false,
            notes: None,
            objections: Vec::new(),
        };

        let from_start = || due_date::due_from(start, step.offset.as_ref(), template.shift_weekend);
        task.state = match (i, step.timing) {
            (0, _) => StepState::Pending { due: from_start() },
            (_, TimingMode::FixedOffset) => StepState::Scheduled { due: from_start() },
            (_, TimingMode::DependentOffset) => StepState::NotStarted,
            (_, TimingMode::AskOnCompletion) => StepState::AwaitingDate,
        };
        if let Some(due) = task.planned_due() {
            task.freeze_original(start, due);
        }
        tasks.push(task);
    }

    Ok(Project {
        id: ulid::Ulid::new().to_string(),
        code: String::new(),
        name: name.map(str::to_string).unwrap_or_else(|| template.name.clone()),
        template_id: template.id.clone(),
        template_name: template.name.clone(),
        spawned_from: None,
        created_by: created_by.id.clone(),
        approver: approver.id,
        shift_weekend: template.shift_weekend,
        start_at: start,
        created_at: now,
        version: 0,
        tasks,
        tasks_on_time: 0,
        tasks_late: 0,
        score: None,
        pending_events: Vec::new(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Offset, StepDef, TaskStatus};
    use chrono::{Duration, TimeZone};

    pub(crate) fn user(id: &str) -> User {
        User {
            id: id.to_uppercase(),
            name: id.into(),
            email: None,
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    fn step(seq: u32, timing: TimingMode, offset: Option<Offset>, assignees: &[&str]) -> StepDef {
        StepDef {
            seq,
            description: format!("step {seq}"),
            assignees: assignees.iter().map(|s| s.to_string()).collect(),
            timing,
            offset,
            checklist_required: false,
            checklist: Vec::new(),
            attachments_required: false,
            trigger_template: None,
        }
    }

    pub(crate) fn template() -> Template {
        Template {
            id: "T1".into(),
            name: "purchase".into(),
            description: None,
            shift_weekend: false,
            approver: None,
            steps: vec![
                step(1, TimingMode::AskOnCompletion, Some(Offset::Hours { hours: 4 }), &["alice"]),
                step(2, TimingMode::FixedOffset, Some(Offset::Days { days: 3 }), &["ghost", "bob"]),
                step(3, TimingMode::DependentOffset, Some(Offset::Days { days: 1 }), &["alice"]),
                step(4, TimingMode::AskOnCompletion, None, &["bob"]),
            ],
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    fn known(reference: &str) -> Result<Option<User>, FmsError> {
        Ok(match reference {
            "alice" | "bob" | "boss" => Some(user(reference)),
            _ => None,
        })
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn one_task_per_step_in_order() {
        let p = build_project(&template(), start(), &user("boss"), None, start(), known).unwrap();
        let seqs: Vec<u32> = p.tasks.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);

        let statuses: Vec<TaskStatus> = p.tasks.iter().map(|t| t.status()).collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Pending,
                TaskStatus::Scheduled,
                TaskStatus::NotStarted,
                TaskStatus::AwaitingDate
            ]
        );
    }

    #[test]
    fn first_task_due_from_start_regardless_of_mode() {
        let p = build_project(&template(), start(), &user("boss"), None, start(), known).unwrap();
        assert_eq!(p.tasks[0].planned_due(), Some(start() + Duration::hours(4)));
        assert_eq!(p.tasks[0].original_planned_at, p.tasks[0].planned_due());
        assert_eq!(p.tasks[1].planned_due(), Some(start() + Duration::days(3)));
        assert_eq!(p.tasks[2].planned_due(), None);
        assert_eq!(p.tasks[3].planned_due(), None);
    }

    #[test]
    fn first_resolvable_assignee_acts() {
        let p = build_project(&template(), start(), &user("boss"), None, start(), known).unwrap();
        assert_eq!(p.tasks[1].assignee_name, "bob");
        assert_eq!(p.approver, "BOSS");
    }

    #[test]
    fn unresolvable_step_fails_whole_instantiation() {
        let mut t = template();
        t.steps[2].assignees = vec!["ghost".into()];
        let err = build_project(&t, start(), &user("boss"), None, start(), known).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        assert!(err.message.contains("Step 3"));
    }

    #[test]
    fn weekend_rule_applies_to_first_due() {
        let mut t = template();
        t.shift_weekend = true;
        // Saturday 20:00 + 4h lands on Sunday
        let sat = Utc.with_ymd_and_hms(2024, 3, 2, 20, 0, 0).unwrap();
        let p = build_project(&t, sat, &user("boss"), None, sat, known).unwrap();
        assert_eq!(
            p.tasks[0].planned_due(),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn generated_code_shape() {
        let code = generate_code("PRJ", start());
        assert!(code.starts_with("PRJ-240304-"));
        assert_eq!(code.len(), "PRJ-240304-0000".len());
    }
}
