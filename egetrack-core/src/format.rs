//! Formatting helpers shared across UIs.

use chrono::NaiveDate;

/// Format hours with one decimal place, dropping a trailing ".0"
/// (e.g. 2.0 -> "2", 1.5 -> "1.5").
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as i64)
    } else {
        format!("{:.1}", hours)
    }
}

/// Format a date as "DD.MM.YYYY", the notation the schedules use.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Format an inclusive date range as "DD.MM - DD.MM".
pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", start.format("%d.%m"), end.format("%d.%m"))
}

/// Checkbox marker for completion flags.
pub fn completion_marker(is_completed: bool) -> &'static str {
    if is_completed {
        "[x]"
    } else {
        "[ ]"
    }
}
