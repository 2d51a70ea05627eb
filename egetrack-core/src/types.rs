//! Core domain types for egetrack
//!
//! These types mirror the persistent data model: per-student profiles,
//! a multi-week schedule of typed days and tasks, an independent todo
//! list, and the derived gamification aggregates.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Profile** | A student identity (unique human-chosen name) with subjects, training days and study-hour goals |
//! | **Week** | A titled, inclusive date range owned by one profile; immutable after creation |
//! | **Day** | One calendar date within a week, typed weekday/weekend/training/exam |
//! | **Task** | A study item on a day; completion and score are the mutation paths with side effects |
//! | **Todo** | A free-floating checklist item, no schedule linkage, same completion side effect |
//! | **Stats** | The per-profile rolling aggregate (points, level, streak); materialized, not a count query |
//! | **Achievement** | A catalog entry unlocked at most once per profile |

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a schedule day.
///
/// Derived at creation time: fixed exam dates override everything,
/// then the profile's training-day set, then plain weekday/weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
    Training,
    Exam,
}

impl DayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Weekend => "weekend",
            DayType::Training => "training",
            DayType::Exam => "exam",
        }
    }
}

impl FromStr for DayType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "weekday" => Ok(DayType::Weekday),
            "weekend" => Ok(DayType::Weekend),
            "training" => Ok(DayType::Training),
            "exam" => Ok(DayType::Exam),
            other => Err(format!("unknown day type: {}", other)),
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half of the day a task is scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            other => Err(format!("unknown time of day: {}", other)),
        }
    }
}

/// Unit of a task duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Hours,
    Minutes,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Hours => "hours",
            DurationUnit::Minutes => "minutes",
        }
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hours" => Ok(DurationUnit::Hours),
            "minutes" => Ok(DurationUnit::Minutes),
            other => Err(format!("unknown duration unit: {}", other)),
        }
    }
}

/// Human-entered task duration, stored as a structured quantity.
///
/// The source data carried free text ("2", "1.5 ч", "90 мин"); we parse
/// at the boundary and render formatted text only on output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskDuration {
    pub value: f64,
    pub unit: DurationUnit,
}

impl TaskDuration {
    pub fn hours(value: f64) -> Self {
        Self {
            value,
            unit: DurationUnit::Hours,
        }
    }

    pub fn minutes(value: f64) -> Self {
        Self {
            value,
            unit: DurationUnit::Minutes,
        }
    }

    /// Duration expressed in hours regardless of unit.
    pub fn as_hours(&self) -> f64 {
        match self.unit {
            DurationUnit::Hours => self.value,
            DurationUnit::Minutes => self.value / 60.0,
        }
    }

    /// Parse a human-entered duration string.
    ///
    /// Bare numbers are hours. Accepts "h"/"ч" and "m"/"мин"/"м" suffixes,
    /// with or without a space.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(Error::validation("duration", "empty duration"));
        }

        let (number, unit) = match s.find(|c: char| !c.is_ascii_digit() && c != '.' && c != ',') {
            Some(idx) => {
                let (num, rest) = s.split_at(idx);
                (num, rest.trim())
            }
            None => (s, ""),
        };

        let value: f64 = number
            .replace(',', ".")
            .parse()
            .map_err(|_| Error::validation("duration", format!("not a number: {}", input)))?;

        if value < 0.0 {
            return Err(Error::validation("duration", "duration must be non-negative"));
        }

        let unit = match unit {
            "" | "h" | "ч" | "час" | "часа" | "часов" => DurationUnit::Hours,
            "m" | "min" | "м" | "мин" => DurationUnit::Minutes,
            other => {
                return Err(Error::validation(
                    "duration",
                    format!("unknown unit: {}", other),
                ))
            }
        };

        Ok(Self { value, unit })
    }
}

impl fmt::Display for TaskDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trim a trailing ".0" so "2.0 ч" renders as "2 ч"
        let value = if self.value.fract() == 0.0 {
            format!("{}", self.value as i64)
        } else {
            format!("{}", self.value)
        };
        match self.unit {
            DurationUnit::Hours => write!(f, "{} ч", value),
            DurationUnit::Minutes => write!(f, "{} мин", value),
        }
    }
}

/// Per-student configuration.
///
/// `training_days` holds day-of-week indices with 0 = Sunday through
/// 6 = Saturday (the convention the schedule data was created with).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    /// Unique human-chosen name, also the foreign key used by all
    /// schedule rows.
    pub name: String,
    /// Subject keys (e.g. "rus", "math_prof", "inf", "phys")
    pub subjects: Vec<String>,
    /// Training day-of-week indices, 0 = Sunday .. 6 = Saturday
    pub training_days: Option<Vec<u8>>,
    pub goals: StudyGoals,
    pub created_at: DateTime<Utc>,
}

/// Per-day-type study-hour goals. A `None` goal is "no goal set",
/// which is a different user-facing state from a goal of zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StudyGoals {
    pub weekday: Option<f64>,
    pub training: Option<f64>,
    pub weekend: Option<f64>,
}

impl StudyGoals {
    /// Goal hours for a day of the given type. Exam days carry no goal.
    pub fn for_day_type(&self, day_type: DayType) -> Option<f64> {
        match day_type {
            DayType::Weekday => self.weekday,
            DayType::Training => self.training,
            DayType::Weekend => self.weekend,
            DayType::Exam => None,
        }
    }

    /// True when no goal is configured for any day type.
    pub fn is_empty(&self) -> bool {
        self.weekday.is_none() && self.training.is_none() && self.weekend.is_none()
    }
}

/// A titled schedule week. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Week {
    pub id: i64,
    pub profile: String,
    pub title: String,
    pub start_date: NaiveDate,
    /// Inclusive end of the range, typically start + 6 days
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One calendar day within a week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    pub id: i64,
    pub week_id: i64,
    /// Denormalized profile reference for query filtering
    pub profile: String,
    /// Unique per profile
    pub date: NaiveDate,
    /// Display name ("Понедельник", ...)
    pub day_name: String,
    pub day_type: DayType,
    pub comment: Option<String>,
    /// Self-assessed efficiency percentage [0, 100]
    pub efficiency: Option<u8>,
    /// Self-assessed usefulness percentage [0, 100]
    pub usefulness: Option<u8>,
    /// Recorded study hours [0, 24]
    pub study_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a day's editable fields.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct DayUpdate {
    pub comment: Option<String>,
    pub efficiency: Option<u8>,
    pub usefulness: Option<u8>,
    pub study_hours: Option<f64>,
    pub day_type: Option<DayType>,
}

/// A study task on a schedule day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub day_id: i64,
    pub profile: String,
    pub time_of_day: TimeOfDay,
    pub description: String,
    pub duration: Option<TaskDuration>,
    pub is_completed: bool,
    /// Marks a scored mock exam
    pub is_exam: bool,
    /// Mock-exam score [0, 100]
    pub score: Option<u8>,
    pub activity_template_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub day_id: i64,
    pub time_of_day: TimeOfDay,
    pub description: String,
    pub duration: Option<TaskDuration>,
    pub is_exam: bool,
    pub activity_template_id: Option<i64>,
}

/// Read-only catalog entry used to prefill task creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTemplate {
    pub id: i64,
    pub subject_key: String,
    pub activity_key: String,
    pub description: String,
    /// Default duration in hours
    pub default_duration: Option<f64>,
}

/// A profile-scoped checklist item with no schedule linkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub profile: String,
    pub text: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// The per-profile rolling aggregate maintained by the stats engine.
///
/// Stateful on purpose: streak continuity needs "was yesterday also an
/// active day", which a count query cannot answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub id: i64,
    pub profile: String,
    /// Count of tasks that exist, maintained independently from
    /// `completed_tasks` (see engine docs)
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub streak_days: i64,
    pub points: i64,
    pub level: i64,
    pub last_activity_date: Option<NaiveDate>,
    /// Optimistic-concurrency counter, bumped on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stats {
    /// A zero-initialized aggregate for a profile, created lazily the
    /// first time the profile produces activity.
    pub fn initial(profile: &str, today: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            profile: profile.to_string(),
            total_tasks: 0,
            completed_tasks: 0,
            streak_days: 0,
            points: 0,
            level: 1,
            last_activity_date: Some(today),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Global achievement catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon_name: String,
    /// Point reward added on unlock
    pub points: i64,
}

/// (profile, achievement) unlock record. At most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub id: i64,
    pub profile: String,
    pub achievement_id: i64,
    pub unlocked_at: DateTime<Utc>,
}
