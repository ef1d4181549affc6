use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

use crate::models::Offset;

/// Day excluded from due dates when a template enables the weekend shift.
pub const WEEKEND_DAY: Weekday = Weekday::Sun;

pub fn compute_due_date(anchor: DateTime<Utc>, offset: &Offset) -> DateTime<Utc> {
    anchor + offset.duration()
}

/// Moves an instant that lands on the weekend day forward by one day.
pub fn shift_if_weekend(instant: DateTime<Utc>, enabled: bool) -> DateTime<Utc> {
    if enabled && instant.weekday() == WEEKEND_DAY {
        instant + Duration::days(1)
    } else {
        instant
    }
}

pub fn due_from(anchor: DateTime<Utc>, offset: Option<&Offset>, shift_weekend: bool) -> DateTime<Utc> {
    let offset = offset.copied().unwrap_or_else(Offset::zero);
    shift_if_weekend(compute_due_date(anchor, &offset), shift_weekend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn friday_noon() -> DateTime<Utc> {
        // 2024-03-01 is a Friday
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn hours_offset() {
        let due = compute_due_date(friday_noon(), &Offset::Hours { hours: 5 });
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap());
    }

    #[test]
    fn days_offset_is_24h_multiples() {
        let due = compute_due_date(friday_noon(), &Offset::Days { days: 3 });
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap());
    }

    #[test]
    fn days_hours_offset_sums() {
        let due = compute_due_date(friday_noon(), &Offset::DaysHours { days: 1, hours: 13 });
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 3, 1, 0, 0).unwrap());
    }

    #[test]
    fn sunday_shifted_only_when_enabled() {
        let sunday = Utc.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).unwrap();
        assert_eq!(shift_if_weekend(sunday, false), sunday);
        assert_eq!(
            shift_if_weekend(sunday, true),
            Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
        );
        // Saturday is a working day
        let saturday = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(shift_if_weekend(saturday, true), saturday);
    }

    #[test]
    fn missing_offset_means_anchor_itself() {
        assert_eq!(due_from(friday_noon(), None, true), friday_noon());
        let due = due_from(friday_noon(), Some(&Offset::Days { days: 2 }), true);
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap());
    }
}
