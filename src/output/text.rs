use chrono::{DateTime, Utc};

use crate::engine::objection::PendingObjections;
use crate::engine::outbox::DrainReport;
use crate::models::{OutboxEvent, Project, ScoreLogEntry, Task, Template, User};

fn short(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn due_label(t: &Task) -> String {
    t.planned_due().map(short).unwrap_or_else(|| "-".into())
}

pub fn print_user_list(users: &[User]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }
    for u in users {
        match &u.email {
            Some(email) => println!("  {} ({}) <{email}>", u.name, u.id),
            None => println!("  {} ({})", u.name, u.id),
        }
    }
}

pub fn print_template(t: &Template) {
    println!("Template: {} ({})", t.name, t.id);
    if let Some(ref desc) = t.description {
        println!("  Description: {desc}");
    }
    println!("  Weekend shift: {}", if t.shift_weekend { "on" } else { "off" });
    if let Some(ref approver) = t.approver {
        println!("  Approver: {approver}");
    }
    for s in &t.steps {
        let offset = s.offset.map(|o| o.describe()).unwrap_or_else(|| "-".into());
        print!("  {}. {} [{} {}] -> {}", s.seq, s.description, s.timing.as_str(), offset, s.assignees.join("|"));
        match &s.trigger_template {
            Some(next) => println!(" (triggers {next})"),
            None => println!(),
        }
    }
}

pub fn print_template_list(templates: &[Template]) {
    if templates.is_empty() {
        println!("No templates found.");
        return;
    }
    for t in templates {
        println!("  {} ({}) {} steps", t.name, &t.id[..std::cmp::min(8, t.id.len())], t.steps.len());
    }
}

pub fn print_project(p: &Project) {
    println!("Project: {} ({})", p.code, p.id);
    println!("  Name: {}", p.name);
    println!("  Template: {}", p.template_name);
    if let Some(ref from) = p.spawned_from {
        println!("  Spawned from: {from}");
    }
    println!("  Status: {}", p.status().as_str());
    println!("  Started: {}", short(p.start_at));
    match p.score {
        Some(score) => println!(
            "  Score: {score}% (on time {}, late {})",
            p.tasks_on_time, p.tasks_late
        ),
        None => println!("  Score: -"),
    }
    println!();
    for t in &p.tasks {
        print_task_line(t);
    }
}

pub fn print_task_line(t: &Task) {
    let score = t
        .completion_score()
        .map(|s| format!(" score={s:.2}"))
        .unwrap_or_default();
    let pending = t.pending_objections().count();
    let objections = if pending > 0 {
        format!(" ({pending} pending objection(s))")
    } else {
        String::new()
    };
    println!(
        "  {}. [{}] {} @{} due {}{}{}",
        t.seq,
        t.status().as_str(),
        t.description,
        t.assignee_name,
        due_label(t),
        score,
        objections
    );
}

pub fn print_project_list(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects found.");
        return;
    }
    for p in projects {
        let finished = p.tasks.iter().filter(|t| t.is_finished()).count();
        println!(
            "  {} [{}] {} {}/{}",
            p.code,
            p.status().as_str(),
            p.name,
            finished,
            p.tasks.len()
        );
    }
}

pub fn print_pending(groups: &[PendingObjections]) {
    if groups.is_empty() {
        println!("No pending objections.");
        return;
    }
    for g in groups {
        println!("{} - {}", g.project_code, g.project_name);
        for t in &g.tasks {
            println!("  {}. {} [{}] @{}", t.seq, t.description, t.status.as_str(), t.assignee);
            for o in &t.objections {
                let date = o.requested_date.map(short).unwrap_or_default();
                println!("     {} {} {} \"{}\"", &o.id, o.kind.as_str(), date, o.remarks);
            }
        }
    }
}

pub fn print_score_log(entries: &[ScoreLogEntry]) {
    if entries.is_empty() {
        println!("No score entries.");
        return;
    }
    for e in entries {
        println!(
            "  {} task {} @{} score={:.2} planned={}d actual={}d ({})",
            short(e.logged_at),
            e.task_seq,
            e.assignee,
            e.score,
            e.planned_days,
            e.actual_days,
            e.reason
        );
    }
}

pub fn print_outbox(events: &[OutboxEvent]) {
    if events.is_empty() {
        println!("Outbox is empty.");
        return;
    }
    for e in events {
        let error = e.last_error.as_deref().map(|m| format!(" last_error={m}")).unwrap_or_default();
        println!(
            "  {} [{}] {} attempts={}{}",
            e.id,
            e.status.as_str(),
            e.topic.as_str(),
            e.attempts,
            error
        );
    }
}

pub fn print_drain(r: &DrainReport) {
    println!(
        "Delivered {} event(s); {} retrying, {} failed.",
        r.processed, r.retrying, r.failed
    );
    for code in &r.spawned {
        println!("  Spawned project {code}");
    }
}
