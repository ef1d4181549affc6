use chrono::Utc;
use serde_json::json;

use crate::cli::commands::OutboxCommands;
use crate::config::Config;
use crate::db::{connection, outbox_repo};
use crate::engine::outbox;
use crate::error::FmsError;
use crate::models::OutboxStatus;
use crate::output;

pub fn run(cmd: OutboxCommands, json_output: bool, config: &Config) -> i32 {
    let result = match cmd {
        OutboxCommands::List { status } => run_list(status.as_deref(), json_output),
        OutboxCommands::Drain => run_drain(json_output, config),
    };
    super::finish(result, json_output)
}

fn run_list(status: Option<&str>, json_output: bool) -> Result<i32, FmsError> {
    let status = status
        .map(|s| {
            OutboxStatus::from_str(s).ok_or_else(|| {
                FmsError::validation(format!("Invalid status '{s}': expected pending, done or failed"))
            })
        })
        .transpose()?;
    let conn = connection::open_db()?;
    let events = outbox_repo::list_events(&conn, status)?;
    if json_output {
        let list: Vec<_> = events.iter().map(output::json::outbox_json).collect();
        output::json::print(&output::json::success(json!({ "events": list })));
    } else {
        output::text::print_outbox(&events);
    }
    Ok(0)
}

fn run_drain(json_output: bool, config: &Config) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let report = outbox::drain(&conn, config, Utc::now())?;
    if json_output {
        output::json::print(&output::json::success(output::json::drain_json(&report)));
    } else {
        output::text::print_drain(&report);
    }
    Ok(0)
}
