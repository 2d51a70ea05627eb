//! Schedule generation and day classification
//!
//! Day types are decided when days are created and can be recomputed
//! after a profile changes its training days. Classification priority:
//! fixed exam dates, then the profile's training days, then plain
//! weekend/weekday.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{DayType, Week};
use chrono::{Datelike, Duration, NaiveDate};

/// The fixed exam dates of the 2025 session. These override every
/// other classification.
pub const EXAM_DATES: &[&str] = &["2025-05-27", "2025-05-30", "2025-06-11"];

/// Day-of-week display names, indexed 0 = Sunday .. 6 = Saturday.
const DAY_NAMES: &[&str] = &[
    "Воскресенье",
    "Понедельник",
    "Вторник",
    "Среда",
    "Четверг",
    "Пятница",
    "Суббота",
];

/// Russian display name for a date's day of week.
pub fn day_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

fn is_exam_date(date: NaiveDate) -> bool {
    let formatted = date.format("%Y-%m-%d").to_string();
    EXAM_DATES.contains(&formatted.as_str())
}

/// Classify a date for a profile.
///
/// `training_days` holds day-of-week indices, 0 = Sunday .. 6 = Saturday.
pub fn classify_day(date: NaiveDate, training_days: Option<&[u8]>) -> DayType {
    if is_exam_date(date) {
        return DayType::Exam;
    }

    let dow = date.weekday().num_days_from_sunday() as u8;
    if let Some(days) = training_days {
        if days.contains(&dow) {
            return DayType::Training;
        }
    }

    if dow == 0 || dow == 6 {
        DayType::Weekend
    } else {
        DayType::Weekday
    }
}

/// Generate `num_weeks` consecutive weeks of empty, classified days
/// for a profile, starting at `start_date`.
///
/// Weeks are titled "Неделя 1", "Неделя 2", ... and span seven days
/// each regardless of where in the calendar week the start falls.
pub fn generate_schedule(
    db: &Database,
    profile: &str,
    start_date: NaiveDate,
    num_weeks: u32,
) -> Result<Vec<Week>> {
    let profile_row = db
        .get_profile(profile)?
        .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;
    let training_days = profile_row.training_days.as_deref();

    let mut weeks = Vec::with_capacity(num_weeks as usize);
    for i in 0..num_weeks as i64 {
        let week_start = start_date + Duration::days(i * 7);
        let week_end = week_start + Duration::days(6);
        let week = db.insert_week(
            profile,
            &format!("Неделя {}", i + 1),
            week_start,
            week_end,
        )?;

        let mut date = week_start;
        while date <= week_end {
            db.insert_day(
                week.id,
                profile,
                date,
                day_name(date),
                classify_day(date, training_days),
            )?;
            date += Duration::days(1);
        }

        weeks.push(week);
    }

    tracing::info!(profile, weeks = num_weeks, %start_date, "Schedule generated");
    Ok(weeks)
}

/// Copy another profile's week/day structure onto `profile`, with each
/// day reclassified for the target profile's training days.
///
/// Tasks, comments and metrics are not copied; the clone is an empty
/// scaffold over the same dates.
pub fn clone_schedule(db: &Database, template_profile: &str, profile: &str) -> Result<Vec<Week>> {
    let profile_row = db
        .get_profile(profile)?
        .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;
    let training_days = profile_row.training_days.as_deref();

    let template_weeks = db.list_weeks(template_profile)?;
    if template_weeks.is_empty() {
        return Err(Error::ProfileNotFound(format!(
            "{} (no schedule to clone)",
            template_profile
        )));
    }

    let mut weeks = Vec::with_capacity(template_weeks.len());
    for template_week in template_weeks {
        let week = db.insert_week(
            profile,
            &template_week.title,
            template_week.start_date,
            template_week.end_date,
        )?;

        for template_day in db.list_week_days(template_week.id)? {
            db.insert_day(
                week.id,
                profile,
                template_day.date,
                &template_day.day_name,
                classify_day(template_day.date, training_days),
            )?;
        }

        weeks.push(week);
    }

    tracing::info!(
        profile,
        template = template_profile,
        weeks = weeks.len(),
        "Schedule cloned"
    );
    Ok(weeks)
}

/// Reclassify every existing day of a profile, typically after its
/// training days changed. Returns how many days changed type.
pub fn recompute_day_types(db: &Database, profile: &str) -> Result<usize> {
    let profile_row = db
        .get_profile(profile)?
        .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;
    let training_days = profile_row.training_days.as_deref();

    let mut changed = 0;
    for day in db.list_profile_days(profile)? {
        let expected = classify_day(day.date, training_days);
        if day.day_type != expected {
            db.update_day_type(day.id, expected)?;
            changed += 1;
        }
    }

    if changed > 0 {
        tracing::info!(profile, changed, "Day types recomputed");
    }
    Ok(changed)
}
