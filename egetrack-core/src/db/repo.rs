//! Database repository layer
//!
//! Provides query and mutation operations for all entity types. Range
//! validation (scores, hours, percentages) happens here, before any
//! write reaches the store.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

const DATE_FMT: &str = "%Y-%m-%d";

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn validate_percent(field: &str, value: u8) -> Result<()> {
    if value > 100 {
        return Err(Error::validation(field, "must be between 0 and 100"));
    }
    Ok(())
}

fn validate_study_hours(value: f64) -> Result<()> {
    if !(0.0..=24.0).contains(&value) {
        return Err(Error::validation(
            "study_hours",
            "must be between 0 and 24",
        ));
    }
    Ok(())
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Delete all rows from all tables. Used by the seeder.
    pub fn wipe_all(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            DELETE FROM unlocked_achievements;
            DELETE FROM stats;
            DELETE FROM todo_items;
            DELETE FROM tasks;
            DELETE FROM days;
            DELETE FROM weeks;
            DELETE FROM activity_templates;
            DELETE FROM achievements;
            DELETE FROM profiles;
            ",
        )?;
        Ok(())
    }

    // ============================================
    // Profile operations
    // ============================================

    /// Insert a new profile
    pub fn insert_profile(
        &self,
        name: &str,
        subjects: &[String],
        training_days: Option<&[u8]>,
        goals: StudyGoals,
    ) -> Result<Profile> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO profiles (name, subjects, training_days, study_goal_weekday,
                                  study_goal_training, study_goal_weekend, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                name,
                serde_json::to_string(subjects)?,
                training_days.map(serde_json::to_string).transpose()?,
                goals.weekday,
                goals.training,
                goals.weekend,
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Profile {
            id,
            name: name.to_string(),
            subjects: subjects.to_vec(),
            training_days: training_days.map(|d| d.to_vec()),
            goals,
            created_at: now,
        })
    }

    /// Get a profile by name
    pub fn get_profile(&self, name: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM profiles WHERE name = ?",
            [name],
            Self::row_to_profile,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List all profiles ordered by creation time
    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM profiles ORDER BY created_at ASC")?;
        let profiles = stmt
            .query_map([], Self::row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// Update a profile's training days and study-hour goals
    pub fn update_profile_settings(
        &self,
        name: &str,
        training_days: Option<&[u8]>,
        goals: StudyGoals,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            r#"
            UPDATE profiles
            SET training_days = ?1, study_goal_weekday = ?2,
                study_goal_training = ?3, study_goal_weekend = ?4
            WHERE name = ?5
            "#,
            params![
                training_days.map(serde_json::to_string).transpose()?,
                goals.weekday,
                goals.training,
                goals.weekend,
                name,
            ],
        )?;
        if updated == 0 {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Get just the three goal values for a profile
    pub fn get_profile_goals(&self, name: &str) -> Result<StudyGoals> {
        self.get_profile(name)?
            .map(|p| p.goals)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
        let subjects_str: String = row.get("subjects")?;
        let training_days_str: Option<String> = row.get("training_days")?;
        let created_at_str: String = row.get("created_at")?;

        Ok(Profile {
            id: row.get("id")?,
            name: row.get("name")?,
            subjects: serde_json::from_str(&subjects_str).unwrap_or_default(),
            training_days: training_days_str.and_then(|s| serde_json::from_str(&s).ok()),
            goals: StudyGoals {
                weekday: row.get("study_goal_weekday")?,
                training: row.get("study_goal_training")?,
                weekend: row.get("study_goal_weekend")?,
            },
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Week operations
    // ============================================

    /// Insert a week. Weeks are immutable after creation.
    pub fn insert_week(
        &self,
        profile: &str,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Week> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO weeks (profile, title, start_date, end_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                profile,
                title,
                fmt_date(start_date),
                fmt_date(end_date),
                now.to_rfc3339(),
            ],
        )?;

        Ok(Week {
            id: conn.last_insert_rowid(),
            profile: profile.to_string(),
            title: title.to_string(),
            start_date,
            end_date,
            created_at: now,
        })
    }

    /// List weeks for a profile ordered by start date
    pub fn list_weeks(&self, profile: &str) -> Result<Vec<Week>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM weeks WHERE profile = ? ORDER BY start_date ASC")?;
        let weeks = stmt
            .query_map([profile], Self::row_to_week)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(weeks)
    }

    fn row_to_week(row: &Row) -> rusqlite::Result<Week> {
        let start_str: String = row.get("start_date")?;
        let end_str: String = row.get("end_date")?;
        let created_at_str: String = row.get("created_at")?;

        Ok(Week {
            id: row.get("id")?,
            profile: row.get("profile")?,
            title: row.get("title")?,
            start_date: parse_date(&start_str)?,
            end_date: parse_date(&end_str)?,
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Day operations
    // ============================================

    /// Insert a day. The day type is decided by the caller at creation
    /// time (see the schedule module).
    pub fn insert_day(
        &self,
        week_id: i64,
        profile: &str,
        date: NaiveDate,
        day_name: &str,
        day_type: DayType,
    ) -> Result<Day> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO days (week_id, profile, date, day_name, day_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                week_id,
                profile,
                fmt_date(date),
                day_name,
                day_type.as_str(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(Day {
            id: conn.last_insert_rowid(),
            week_id,
            profile: profile.to_string(),
            date,
            day_name: day_name.to_string(),
            day_type,
            comment: None,
            efficiency: None,
            usefulness: None,
            study_hours: None,
            created_at: now,
        })
    }

    /// Get a day by ID
    pub fn get_day(&self, id: i64) -> Result<Option<Day>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM days WHERE id = ?", [id], Self::row_to_day)
            .optional()
            .map_err(Error::from)
    }

    /// List days for a profile within an inclusive date range
    pub fn list_days(
        &self,
        profile: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Day>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM days WHERE profile = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date ASC",
        )?;
        let days = stmt
            .query_map(
                params![profile, fmt_date(start_date), fmt_date(end_date)],
                Self::row_to_day,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(days)
    }

    /// List all days belonging to a week
    pub fn list_week_days(&self, week_id: i64) -> Result<Vec<Day>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM days WHERE week_id = ? ORDER BY date ASC")?;
        let days = stmt
            .query_map([week_id], Self::row_to_day)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(days)
    }

    /// List every day a profile has, ordered by date
    pub fn list_profile_days(&self, profile: &str) -> Result<Vec<Day>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM days WHERE profile = ? ORDER BY date ASC")?;
        let days = stmt
            .query_map([profile], Self::row_to_day)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(days)
    }

    /// Apply a partial update to a day's editable fields.
    ///
    /// Validates ranges before writing; a validation failure leaves the
    /// row untouched.
    pub fn update_day_info(&self, day_id: i64, profile: &str, update: &DayUpdate) -> Result<Day> {
        if let Some(eff) = update.efficiency {
            validate_percent("efficiency", eff)?;
        }
        if let Some(useful) = update.usefulness {
            validate_percent("usefulness", useful)?;
        }
        if let Some(hours) = update.study_hours {
            validate_study_hours(hours)?;
        }

        let conn = self.conn.lock().unwrap();

        let mut sets: Vec<&str> = vec![];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(comment) = &update.comment {
            sets.push("comment = ?");
            values.push(Box::new(comment.clone()));
        }
        if let Some(eff) = update.efficiency {
            sets.push("efficiency = ?");
            values.push(Box::new(eff as i64));
        }
        if let Some(useful) = update.usefulness {
            sets.push("usefulness = ?");
            values.push(Box::new(useful as i64));
        }
        if let Some(hours) = update.study_hours {
            sets.push("study_hours = ?");
            values.push(Box::new(hours));
        }
        if let Some(day_type) = update.day_type {
            sets.push("day_type = ?");
            values.push(Box::new(day_type.as_str().to_string()));
        }

        if !sets.is_empty() {
            let sql = format!(
                "UPDATE days SET {} WHERE id = ? AND profile = ?",
                sets.join(", ")
            );
            values.push(Box::new(day_id));
            values.push(Box::new(profile.to_string()));

            let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
            let updated = conn.execute(&sql, refs.as_slice())?;
            if updated == 0 {
                return Err(Error::DayNotFound(day_id));
            }
        }

        conn.query_row("SELECT * FROM days WHERE id = ?", [day_id], Self::row_to_day)
            .optional()?
            .ok_or(Error::DayNotFound(day_id))
    }

    /// Overwrite a day's type (used by the recomputation pass)
    pub fn update_day_type(&self, day_id: i64, day_type: DayType) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE days SET day_type = ?1 WHERE id = ?2",
            params![day_type.as_str(), day_id],
        )?;
        if updated == 0 {
            return Err(Error::DayNotFound(day_id));
        }
        Ok(())
    }

    fn row_to_day(row: &Row) -> rusqlite::Result<Day> {
        let date_str: String = row.get("date")?;
        let day_type_str: String = row.get("day_type")?;
        let efficiency: Option<i64> = row.get("efficiency")?;
        let usefulness: Option<i64> = row.get("usefulness")?;
        let created_at_str: String = row.get("created_at")?;

        Ok(Day {
            id: row.get("id")?,
            week_id: row.get("week_id")?,
            profile: row.get("profile")?,
            date: parse_date(&date_str)?,
            day_name: row.get("day_name")?,
            day_type: day_type_str.parse().unwrap_or(DayType::Weekday),
            comment: row.get("comment")?,
            efficiency: efficiency.map(|v| v as u8),
            usefulness: usefulness.map(|v| v as u8),
            study_hours: row.get("study_hours")?,
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Task operations
    // ============================================

    /// Insert a task row.
    ///
    /// Note: this does NOT touch the stats aggregate; use the engine's
    /// `add_task` so `total_tasks` stays in step.
    pub fn insert_task(&self, profile: &str, task: &NewTask) -> Result<Task> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO tasks (day_id, profile, time_of_day, description, duration_value,
                               duration_unit, is_completed, is_exam, activity_template_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9)
            "#,
            params![
                task.day_id,
                profile,
                task.time_of_day.as_str(),
                task.description,
                task.duration.map(|d| d.value),
                task.duration.map(|d| d.unit.as_str()),
                task.is_exam,
                task.activity_template_id,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Task {
            id: conn.last_insert_rowid(),
            day_id: task.day_id,
            profile: profile.to_string(),
            time_of_day: task.time_of_day,
            description: task.description.clone(),
            duration: task.duration,
            is_completed: false,
            is_exam: task.is_exam,
            score: None,
            activity_template_id: task.activity_template_id,
            created_at: now,
        })
    }

    /// Get a task by ID
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM tasks WHERE id = ?", [id], Self::row_to_task)
            .optional()
            .map_err(Error::from)
    }

    /// List tasks for a day, morning first
    pub fn list_day_tasks(&self, day_id: i64) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks WHERE day_id = ? ORDER BY time_of_day DESC, id ASC",
        )?;
        let tasks = stmt
            .query_map([day_id], Self::row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// List mock-exam tasks for a profile
    pub fn list_exam_tasks(&self, profile: &str) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks WHERE profile = ? AND is_exam = 1 ORDER BY day_id ASC",
        )?;
        let tasks = stmt
            .query_map([profile], Self::row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Update a task's editable fields (not completion or score)
    pub fn update_task(&self, task_id: i64, profile: &str, task: &NewTask) -> Result<Task> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            r#"
            UPDATE tasks
            SET time_of_day = ?1, description = ?2, duration_value = ?3,
                duration_unit = ?4, is_exam = ?5, activity_template_id = ?6
            WHERE id = ?7 AND profile = ?8
            "#,
            params![
                task.time_of_day.as_str(),
                task.description,
                task.duration.map(|d| d.value),
                task.duration.map(|d| d.unit.as_str()),
                task.is_exam,
                task.activity_template_id,
                task_id,
                profile,
            ],
        )?;
        if updated == 0 {
            return Err(Error::TaskNotFound(task_id));
        }

        conn.query_row("SELECT * FROM tasks WHERE id = ?", [task_id], Self::row_to_task)
            .optional()?
            .ok_or(Error::TaskNotFound(task_id))
    }

    /// Delete a task row. See the engine's `delete_task` for the
    /// variant that also decrements `total_tasks`.
    pub fn delete_task(&self, task_id: i64, profile: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND profile = ?2",
            params![task_id, profile],
        )?;
        if deleted == 0 {
            return Err(Error::TaskNotFound(task_id));
        }
        Ok(())
    }

    /// Set a task's completion flag, returning the updated row
    pub fn set_task_completion(
        &self,
        task_id: i64,
        profile: &str,
        is_completed: bool,
    ) -> Result<Task> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tasks SET is_completed = ?1 WHERE id = ?2 AND profile = ?3",
            params![is_completed, task_id, profile],
        )?;
        if updated == 0 {
            return Err(Error::TaskNotFound(task_id));
        }

        conn.query_row("SELECT * FROM tasks WHERE id = ?", [task_id], Self::row_to_task)
            .optional()?
            .ok_or(Error::TaskNotFound(task_id))
    }

    /// Set a mock-exam score. Rejects values outside [0, 100] before
    /// any write.
    pub fn set_task_score(&self, task_id: i64, profile: &str, score: u8) -> Result<Task> {
        validate_percent("score", score)?;

        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tasks SET score = ?1 WHERE id = ?2 AND profile = ?3",
            params![score as i64, task_id, profile],
        )?;
        if updated == 0 {
            return Err(Error::TaskNotFound(task_id));
        }

        conn.query_row("SELECT * FROM tasks WHERE id = ?", [task_id], Self::row_to_task)
            .optional()?
            .ok_or(Error::TaskNotFound(task_id))
    }

    /// Count completed tasks grouped by day, for the given day IDs
    pub fn count_completed_tasks_by_day(
        &self,
        profile: &str,
        day_ids: &[i64],
    ) -> Result<HashMap<i64, i64>> {
        if day_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.conn.lock().unwrap();

        let placeholders = vec!["?"; day_ids.len()].join(", ");
        let sql = format!(
            "SELECT day_id, COUNT(*) FROM tasks
             WHERE profile = ? AND is_completed = 1 AND day_id IN ({})
             GROUP BY day_id",
            placeholders
        );

        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(profile.to_string())];
        for id in day_ids {
            values.push(Box::new(*id));
        }
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map(refs.as_slice(), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(counts)
    }

    fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
        let time_of_day_str: String = row.get("time_of_day")?;
        let duration_value: Option<f64> = row.get("duration_value")?;
        let duration_unit_str: Option<String> = row.get("duration_unit")?;
        let score: Option<i64> = row.get("score")?;
        let created_at_str: String = row.get("created_at")?;

        let duration = match (duration_value, duration_unit_str) {
            (Some(value), Some(unit_str)) => Some(TaskDuration {
                value,
                unit: unit_str.parse().unwrap_or(DurationUnit::Hours),
            }),
            (Some(value), None) => Some(TaskDuration::hours(value)),
            _ => None,
        };

        Ok(Task {
            id: row.get("id")?,
            day_id: row.get("day_id")?,
            profile: row.get("profile")?,
            time_of_day: time_of_day_str.parse().unwrap_or(TimeOfDay::Morning),
            description: row.get("description")?,
            duration,
            is_completed: row.get("is_completed")?,
            is_exam: row.get("is_exam")?,
            score: score.map(|v| v as u8),
            activity_template_id: row.get("activity_template_id")?,
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Todo operations
    // ============================================

    /// Insert a todo item. Empty text is rejected.
    pub fn insert_todo(&self, profile: &str, text: &str) -> Result<TodoItem> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("text", "todo text cannot be empty"));
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO todo_items (profile, text, is_completed, created_at) VALUES (?1, ?2, 0, ?3)",
            params![profile, text, now.to_rfc3339()],
        )?;

        Ok(TodoItem {
            id: conn.last_insert_rowid(),
            profile: profile.to_string(),
            text: text.to_string(),
            is_completed: false,
            created_at: now,
        })
    }

    /// List todo items for a profile, newest first
    pub fn list_todos(&self, profile: &str) -> Result<Vec<TodoItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM todo_items WHERE profile = ? ORDER BY created_at DESC, id DESC")?;
        let todos = stmt
            .query_map([profile], Self::row_to_todo)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    /// Set a todo item's completion flag
    pub fn set_todo_completion(
        &self,
        todo_id: i64,
        profile: &str,
        is_completed: bool,
    ) -> Result<TodoItem> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE todo_items SET is_completed = ?1 WHERE id = ?2 AND profile = ?3",
            params![is_completed, todo_id, profile],
        )?;
        if updated == 0 {
            return Err(Error::TodoNotFound(todo_id));
        }

        conn.query_row(
            "SELECT * FROM todo_items WHERE id = ?",
            [todo_id],
            Self::row_to_todo,
        )
        .optional()?
        .ok_or(Error::TodoNotFound(todo_id))
    }

    /// Delete a todo item
    pub fn delete_todo(&self, todo_id: i64, profile: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM todo_items WHERE id = ?1 AND profile = ?2",
            params![todo_id, profile],
        )?;
        if deleted == 0 {
            return Err(Error::TodoNotFound(todo_id));
        }
        Ok(())
    }

    fn row_to_todo(row: &Row) -> rusqlite::Result<TodoItem> {
        let created_at_str: String = row.get("created_at")?;
        Ok(TodoItem {
            id: row.get("id")?,
            profile: row.get("profile")?,
            text: row.get("text")?,
            is_completed: row.get("is_completed")?,
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Stats operations
    // ============================================

    /// Get the stats aggregate for a profile, if one exists.
    /// Absence is not an error; the engine lazily initializes it.
    pub fn get_stats(&self, profile: &str) -> Result<Option<Stats>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM stats WHERE profile = ?",
            [profile],
            Self::row_to_stats,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert a fresh stats row, returning it with its assigned ID
    pub fn insert_stats(&self, stats: &Stats) -> Result<Stats> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO stats (profile, total_tasks, completed_tasks, streak_days, points,
                               level, last_activity_date, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)
            "#,
            params![
                stats.profile,
                stats.total_tasks,
                stats.completed_tasks,
                stats.streak_days,
                stats.points,
                stats.level,
                stats.last_activity_date.map(fmt_date),
                now.to_rfc3339(),
            ],
        )?;

        let mut inserted = stats.clone();
        inserted.id = conn.last_insert_rowid();
        inserted.version = 0;
        inserted.created_at = now;
        inserted.updated_at = now;
        Ok(inserted)
    }

    /// Conditionally update a stats row.
    ///
    /// The write only applies if `stats.version` still matches the
    /// stored row; otherwise another writer got there first and the
    /// caller gets `Error::ConcurrentUpdate`. No retry is attempted.
    pub fn update_stats(&self, stats: &Stats) -> Result<Stats> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let updated = conn.execute(
            r#"
            UPDATE stats
            SET total_tasks = ?1, completed_tasks = ?2, streak_days = ?3, points = ?4,
                level = ?5, last_activity_date = ?6, version = version + 1, updated_at = ?7
            WHERE id = ?8 AND version = ?9
            "#,
            params![
                stats.total_tasks,
                stats.completed_tasks,
                stats.streak_days,
                stats.points,
                stats.level,
                stats.last_activity_date.map(fmt_date),
                now.to_rfc3339(),
                stats.id,
                stats.version,
            ],
        )?;
        if updated == 0 {
            return Err(Error::ConcurrentUpdate(stats.profile.clone()));
        }

        let mut result = stats.clone();
        result.version += 1;
        result.updated_at = now;
        Ok(result)
    }

    fn row_to_stats(row: &Row) -> rusqlite::Result<Stats> {
        let last_activity_str: Option<String> = row.get("last_activity_date")?;
        let created_at_str: String = row.get("created_at")?;
        let updated_at_str: String = row.get("updated_at")?;

        Ok(Stats {
            id: row.get("id")?,
            profile: row.get("profile")?,
            total_tasks: row.get("total_tasks")?,
            completed_tasks: row.get("completed_tasks")?,
            streak_days: row.get("streak_days")?,
            points: row.get("points")?,
            level: row.get("level")?,
            last_activity_date: last_activity_str.as_deref().map(parse_date).transpose()?,
            version: row.get("version")?,
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    // ============================================
    // Achievement operations
    // ============================================

    /// Insert a catalog entry. Re-inserting an existing name is a no-op
    /// so seeding stays idempotent.
    pub fn insert_achievement(
        &self,
        name: &str,
        description: &str,
        icon_name: &str,
        points: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT OR IGNORE INTO achievements (name, description, icon_name, points)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![name, description, icon_name, points],
        )?;
        Ok(())
    }

    /// List the full achievement catalog
    pub fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM achievements ORDER BY id ASC")?;
        let achievements = stmt
            .query_map([], Self::row_to_achievement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(achievements)
    }

    /// IDs of achievements a profile has already unlocked
    pub fn unlocked_achievement_ids(&self, profile: &str) -> Result<HashSet<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT achievement_id FROM unlocked_achievements WHERE profile = ?")?;
        let ids = stmt
            .query_map([profile], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// List a profile's unlock records, oldest first
    pub fn list_unlocked_achievements(&self, profile: &str) -> Result<Vec<UnlockedAchievement>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM unlocked_achievements WHERE profile = ? ORDER BY unlocked_at ASC, id ASC",
        )?;
        let unlocked = stmt
            .query_map([profile], |row| {
                let unlocked_at_str: String = row.get("unlocked_at")?;
                Ok(UnlockedAchievement {
                    id: row.get("id")?,
                    profile: row.get("profile")?,
                    achievement_id: row.get("achievement_id")?,
                    unlocked_at: parse_ts(&unlocked_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(unlocked)
    }

    /// Record an unlock. Returns false if the pair already existed
    /// (unlocking is idempotent).
    pub fn insert_unlocked_achievement(
        &self,
        profile: &str,
        achievement_id: i64,
        unlocked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO unlocked_achievements (profile, achievement_id, unlocked_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![profile, achievement_id, unlocked_at.to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    fn row_to_achievement(row: &Row) -> rusqlite::Result<Achievement> {
        Ok(Achievement {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            icon_name: row.get("icon_name")?,
            points: row.get("points")?,
        })
    }

    // ============================================
    // Activity template operations
    // ============================================

    /// Insert a catalog template. Idempotent on (subject, activity).
    pub fn insert_activity_template(
        &self,
        subject_key: &str,
        activity_key: &str,
        description: &str,
        default_duration: Option<f64>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT OR IGNORE INTO activity_templates (subject_key, activity_key, description, default_duration)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![subject_key, activity_key, description, default_duration],
        )?;
        Ok(())
    }

    /// List activity templates, optionally filtered by subject
    pub fn list_activity_templates(&self, subject_key: Option<&str>) -> Result<Vec<ActivityTemplate>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from("SELECT * FROM activity_templates WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(subject) = subject_key {
            sql.push_str(" AND subject_key = ?");
            values.push(Box::new(subject.to_string()));
        }
        sql.push_str(" ORDER BY subject_key, activity_key");

        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let templates = stmt
            .query_map(refs.as_slice(), |row| {
                Ok(ActivityTemplate {
                    id: row.get("id")?,
                    subject_key: row.get("subject_key")?,
                    activity_key: row.get("activity_key")?,
                    description: row.get("description")?,
                    default_duration: row.get("default_duration")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_profile("Сева", &["rus".to_string()], Some(&[2, 4]), StudyGoals::default())
            .unwrap();
        db
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_profile_round_trip() {
        let db = test_db();
        let profile = db.get_profile("Сева").unwrap().unwrap();
        assert_eq!(profile.subjects, vec!["rus"]);
        assert_eq!(profile.training_days, Some(vec![2, 4]));
        assert!(profile.goals.is_empty());

        assert!(db.get_profile("нет такого").unwrap().is_none());
    }

    #[test]
    fn test_update_profile_settings() {
        let db = test_db();
        let goals = StudyGoals {
            weekday: Some(3.0),
            training: Some(2.0),
            weekend: Some(5.0),
        };
        db.update_profile_settings("Сева", None, goals).unwrap();

        let stored = db.get_profile_goals("Сева").unwrap();
        assert_eq!(stored.weekday, Some(3.0));
        assert_eq!(stored.weekend, Some(5.0));
        assert_eq!(db.get_profile("Сева").unwrap().unwrap().training_days, None);

        assert!(matches!(
            db.update_profile_settings("призрак", None, goals),
            Err(Error::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_day_update_validation() {
        let db = test_db();
        let week = db
            .insert_week("Сева", "Неделя 1", date("2025-05-05"), date("2025-05-11"))
            .unwrap();
        let day = db
            .insert_day(week.id, "Сева", date("2025-05-05"), "Понедельник", DayType::Weekday)
            .unwrap();

        // Out-of-range hours are rejected before any write
        let err = db.update_day_info(
            day.id,
            "Сева",
            &DayUpdate {
                study_hours: Some(25.0),
                ..Default::default()
            },
        );
        assert!(matches!(err, Err(Error::Validation { .. })));
        assert_eq!(db.get_day(day.id).unwrap().unwrap().study_hours, None);

        let updated = db
            .update_day_info(
                day.id,
                "Сева",
                &DayUpdate {
                    study_hours: Some(3.5),
                    efficiency: Some(80),
                    comment: Some("хороший день".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.study_hours, Some(3.5));
        assert_eq!(updated.efficiency, Some(80));
        assert_eq!(updated.comment.as_deref(), Some("хороший день"));
    }

    #[test]
    fn test_task_score_validation() {
        let db = test_db();
        let week = db
            .insert_week("Сева", "Неделя 1", date("2025-05-05"), date("2025-05-11"))
            .unwrap();
        let day = db
            .insert_day(week.id, "Сева", date("2025-05-05"), "Понедельник", DayType::Weekday)
            .unwrap();
        let task = db
            .insert_task(
                "Сева",
                &NewTask {
                    day_id: day.id,
                    time_of_day: TimeOfDay::Morning,
                    description: "[РУС] Пробник".to_string(),
                    duration: Some(TaskDuration::hours(1.5)),
                    is_exam: true,
                    activity_template_id: None,
                },
            )
            .unwrap();

        assert!(db.set_task_score(task.id, "Сева", 101).is_err());
        let scored = db.set_task_score(task.id, "Сева", 87).unwrap();
        assert_eq!(scored.score, Some(87));
    }

    #[test]
    fn test_task_duration_round_trip() {
        let db = test_db();
        let week = db
            .insert_week("Сева", "Неделя 1", date("2025-05-05"), date("2025-05-11"))
            .unwrap();
        let day = db
            .insert_day(week.id, "Сева", date("2025-05-05"), "Понедельник", DayType::Weekday)
            .unwrap();
        let task = db
            .insert_task(
                "Сева",
                &NewTask {
                    day_id: day.id,
                    time_of_day: TimeOfDay::Afternoon,
                    description: "нарешка".to_string(),
                    duration: Some(TaskDuration::minutes(90.0)),
                    is_exam: false,
                    activity_template_id: None,
                },
            )
            .unwrap();

        let stored = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(stored.duration, Some(TaskDuration::minutes(90.0)));
        assert_eq!(stored.time_of_day, TimeOfDay::Afternoon);
    }

    #[test]
    fn test_stats_versioned_update_detects_race() {
        let db = test_db();
        let stats = db
            .insert_stats(&Stats::initial("Сева", date("2025-05-09")))
            .unwrap();

        let mut first = stats.clone();
        first.points = 5;
        db.update_stats(&first).unwrap();

        // Second writer still holds version 0
        let mut second = stats;
        second.points = 10;
        assert!(matches!(
            db.update_stats(&second),
            Err(Error::ConcurrentUpdate(_))
        ));
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let db = test_db();
        db.insert_achievement("First Task", "Выполните свою первую задачу", "check", 10)
            .unwrap();
        let achievement = &db.list_achievements().unwrap()[0];

        let now = Utc::now();
        assert!(db
            .insert_unlocked_achievement("Сева", achievement.id, now)
            .unwrap());
        assert!(!db
            .insert_unlocked_achievement("Сева", achievement.id, now)
            .unwrap());
        assert_eq!(db.unlocked_achievement_ids("Сева").unwrap().len(), 1);
    }

    #[test]
    fn test_count_completed_tasks_by_day() {
        let db = test_db();
        let week = db
            .insert_week("Сева", "Неделя 1", date("2025-05-05"), date("2025-05-11"))
            .unwrap();
        let day1 = db
            .insert_day(week.id, "Сева", date("2025-05-05"), "Понедельник", DayType::Weekday)
            .unwrap();
        let day2 = db
            .insert_day(week.id, "Сева", date("2025-05-06"), "Вторник", DayType::Training)
            .unwrap();

        for (day_id, completed) in [(day1.id, true), (day1.id, true), (day2.id, false)] {
            let task = db
                .insert_task(
                    "Сева",
                    &NewTask {
                        day_id,
                        time_of_day: TimeOfDay::Morning,
                        description: "задача".to_string(),
                        duration: None,
                        is_exam: false,
                        activity_template_id: None,
                    },
                )
                .unwrap();
            if completed {
                db.set_task_completion(task.id, "Сева", true).unwrap();
            }
        }

        let counts = db
            .count_completed_tasks_by_day("Сева", &[day1.id, day2.id])
            .unwrap();
        assert_eq!(counts.get(&day1.id), Some(&2));
        assert_eq!(counts.get(&day2.id), None);
    }
}
