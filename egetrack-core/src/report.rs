//! Weekly study-hours report
//!
//! Aggregates recorded study hours over a date range, grouped by ISO
//! week (Monday start). Hours are additionally split by day type, and
//! each week is compared against the profile's configured goals.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::DayType;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// One calendar week of the report.
#[derive(Debug, Clone, Serialize)]
pub struct WeekReport {
    pub week_start: NaiveDate,
    /// Sunday of the same week
    pub week_end: NaiveDate,
    pub iso_week: u32,
    pub iso_year: i32,
    /// Days of this week inside the requested range, whether or not
    /// hours were recorded
    pub total_days: usize,
    pub total_hours: f64,
    pub weekday_hours: f64,
    pub training_hours: f64,
    pub weekend_hours: f64,
    pub exam_hours: f64,
    /// Completed tasks on this week's days
    pub completed_tasks: i64,
    /// Sum of the profile's per-day goals for this week, exam days
    /// excluded. `None` when no goal applies to any day, which is a
    /// different state from a goal of zero.
    pub weekly_goal: Option<f64>,
}

impl WeekReport {
    /// Hours counted against the goal. Exam days are sat, not studied,
    /// so their hours don't count toward it.
    pub fn goal_hours(&self) -> f64 {
        self.total_hours - self.exam_hours
    }

    fn empty(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            week_end: week_start + Duration::days(6),
            iso_week: week_start.iso_week().week(),
            iso_year: week_start.iso_week().year(),
            total_days: 0,
            total_hours: 0.0,
            weekday_hours: 0.0,
            training_hours: 0.0,
            weekend_hours: 0.0,
            exam_hours: 0.0,
            completed_tasks: 0,
            weekly_goal: None,
        }
    }
}

/// Monday of the ISO week containing `date`.
fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Build the weekly report for a profile over an inclusive date range.
///
/// Only days that exist in the schedule contribute. Days without
/// recorded hours still contribute their goal and completed-task
/// counts, so an idle week with a goal shows the shortfall. Weeks are
/// returned in ascending date order.
pub fn build_weekly_report(
    db: &Database,
    profile: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<WeekReport>> {
    if end_date < start_date {
        return Err(Error::validation(
            "date_range",
            "end date is before start date",
        ));
    }

    let goals = db.get_profile_goals(profile)?;
    let days = db.list_days(profile, start_date, end_date)?;

    let day_ids: Vec<i64> = days.iter().map(|d| d.id).collect();
    let completed_by_day = db.count_completed_tasks_by_day(profile, &day_ids)?;

    // BTreeMap keeps weeks sorted by start date
    let mut weeks: BTreeMap<NaiveDate, WeekReport> = BTreeMap::new();

    for day in &days {
        let week_start = week_start_of(day.date);
        let report = weeks
            .entry(week_start)
            .or_insert_with(|| WeekReport::empty(week_start));

        report.total_days += 1;

        // A day without recorded hours contributes 0 to every sum
        if let Some(hours) = day.study_hours {
            report.total_hours += hours;
            match day.day_type {
                DayType::Weekday => report.weekday_hours += hours,
                DayType::Training => report.training_hours += hours,
                DayType::Weekend => report.weekend_hours += hours,
                DayType::Exam => report.exam_hours += hours,
            }
        }

        if let Some(goal) = goals.for_day_type(day.day_type) {
            *report.weekly_goal.get_or_insert(0.0) += goal;
        }

        report.completed_tasks += completed_by_day.get(&day.id).copied().unwrap_or(0);
    }

    Ok(weeks.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DayUpdate, NewTask, StudyGoals, TimeOfDay};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup(goals: StudyGoals) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_profile("Сева", &[], Some(&[2, 4]), goals).unwrap();
        crate::schedule::generate_schedule(&db, "Сева", date("2025-05-05"), 2).unwrap();
        db
    }

    fn record_hours(db: &Database, day: NaiveDate, hours: f64) {
        let days = db.list_days("Сева", day, day).unwrap();
        db.update_day_info(
            days[0].id,
            "Сева",
            &DayUpdate {
                study_hours: Some(hours),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn test_single_week_buckets() {
        let goals = StudyGoals {
            weekday: Some(3.0),
            training: Some(2.0),
            weekend: Some(5.0),
        };
        let db = setup(goals);

        record_hours(&db, date("2025-05-05"), 3.0); // Monday, weekday
        record_hours(&db, date("2025-05-06"), 1.5); // Tuesday, training
        record_hours(&db, date("2025-05-10"), 4.0); // Saturday, weekend

        let reports =
            build_weekly_report(&db, "Сева", date("2025-05-05"), date("2025-05-11")).unwrap();
        assert_eq!(reports.len(), 1);

        let week = &reports[0];
        assert_eq!(week.week_start, date("2025-05-05"));
        assert_eq!(week.week_end, date("2025-05-11"));
        assert_eq!(week.iso_week, 19);
        assert_eq!(week.iso_year, 2025);
        // All seven schedule days fall inside the range
        assert_eq!(week.total_days, 7);
        assert_eq!(week.total_hours, 8.5);
        assert_eq!(week.weekday_hours, 3.0);
        assert_eq!(week.training_hours, 1.5);
        assert_eq!(week.weekend_hours, 4.0);
        assert_eq!(week.exam_hours, 0.0);
        // 3 weekdays * 3 + 2 training * 2 + 2 weekend * 5
        assert_eq!(week.weekly_goal, Some(9.0 + 4.0 + 10.0));
    }

    #[test]
    fn test_weeks_sorted_ascending() {
        let db = setup(StudyGoals::default());
        record_hours(&db, date("2025-05-14"), 2.0);
        record_hours(&db, date("2025-05-05"), 1.0);

        let reports =
            build_weekly_report(&db, "Сева", date("2025-05-05"), date("2025-05-18")).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].week_start < reports[1].week_start);
        assert_eq!(reports[0].total_hours, 1.0);
        assert_eq!(reports[1].total_hours, 2.0);
    }

    #[test]
    fn test_no_goal_is_none_not_zero() {
        let db = setup(StudyGoals::default());
        record_hours(&db, date("2025-05-05"), 2.0);

        let reports =
            build_weekly_report(&db, "Сева", date("2025-05-05"), date("2025-05-11")).unwrap();
        assert_eq!(reports[0].weekly_goal, None);
    }

    #[test]
    fn test_exam_hours_excluded_from_goal() {
        let goals = StudyGoals {
            weekday: Some(3.0),
            ..Default::default()
        };
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_profile("Сева", &[], None, goals).unwrap();
        // Week with two fixed exam dates, 2025-05-27 and 2025-05-30
        crate::schedule::generate_schedule(&db, "Сева", date("2025-05-26"), 1).unwrap();

        record_hours(&db, date("2025-05-26"), 2.0); // Monday, weekday
        record_hours(&db, date("2025-05-27"), 4.0); // exam day

        let reports =
            build_weekly_report(&db, "Сева", date("2025-05-26"), date("2025-06-01")).unwrap();
        let week = &reports[0];
        assert_eq!(week.exam_hours, 4.0);
        assert_eq!(week.total_hours, 6.0);
        assert_eq!(week.goal_hours(), 2.0);
        // Exam days contribute no goal: 3 remaining weekdays * 3
        assert_eq!(week.weekly_goal, Some(9.0));
    }

    #[test]
    fn test_completed_tasks_per_week() {
        let db = setup(StudyGoals::default());
        let days = db.list_days("Сева", date("2025-05-05"), date("2025-05-05")).unwrap();
        let task = db
            .insert_task(
                "Сева",
                &NewTask {
                    day_id: days[0].id,
                    time_of_day: TimeOfDay::Morning,
                    description: "нарешка".to_string(),
                    duration: None,
                    is_exam: false,
                    activity_template_id: None,
                },
            )
            .unwrap();
        db.set_task_completion(task.id, "Сева", true).unwrap();

        let reports =
            build_weekly_report(&db, "Сева", date("2025-05-05"), date("2025-05-11")).unwrap();
        assert_eq!(reports[0].completed_tasks, 1);
        // Hours were never recorded, but the days still count
        assert_eq!(reports[0].total_days, 7);
        assert_eq!(reports[0].total_hours, 0.0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let db = setup(StudyGoals::default());
        assert!(matches!(
            build_weekly_report(&db, "Сева", date("2025-05-11"), date("2025-05-05")),
            Err(Error::Validation { .. })
        ));
    }
}
