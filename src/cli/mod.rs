pub mod commands;
pub mod init;
pub mod objection;
pub mod outbox;
pub mod project;
pub mod score;
pub mod task;
pub mod template;
pub mod user;

pub use commands::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::FmsError;
use crate::output;

/// Turn a command result into an exit code, printing the error.
pub fn finish(result: Result<i32, FmsError>, json_output: bool) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            if json_output {
                output::json::print(&output::json::error(&e));
            } else {
                eprintln!("Error: {}", e.message);
            }
            e.code.exit_code()
        }
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD`; the naive forms are UTC.
pub fn parse_instant(value: &str, field: &str) -> Result<DateTime<Utc>, FmsError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(FmsError::validation(format!(
        "Invalid {field} '{value}': expected RFC 3339, YYYY-MM-DD HH:MM or YYYY-MM-DD"
    )))
}

pub fn instant_or_now(value: Option<&str>, field: &str) -> Result<DateTime<Utc>, FmsError> {
    match value {
        Some(v) => parse_instant(v, field),
        None => Ok(Utc::now()),
    }
}

/// The global `--user`, required by commands acting on someone's behalf.
pub fn acting_user<'a>(user: Option<&'a str>, action: &str) -> Result<&'a str, FmsError> {
    user.ok_or_else(|| FmsError::validation(format!("--user is required to {action}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_three_instant_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        assert_eq!(parse_instant("2024-03-04T09:30:00Z", "date").unwrap(), expected);
        assert_eq!(parse_instant("2024-03-04T11:30:00+02:00", "date").unwrap(), expected);
        assert_eq!(parse_instant("2024-03-04 09:30", "date").unwrap(), expected);
        assert_eq!(
            parse_instant("2024-03-04", "date").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_naming_the_field() {
        let err = parse_instant("next tuesday", "--due").unwrap_err();
        assert!(err.message.contains("--due"));
    }
}
