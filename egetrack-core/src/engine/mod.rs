//! Gamification engine
//!
//! Owns every mutation of the per-profile stats aggregate: points for
//! completions, the daily streak, level derivation and achievement
//! rewards. All side effects of checking a task or todo off flow
//! through here so the aggregate never drifts from user activity.

pub mod achievements;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{NewTask, Stats, Task, TodoItem};
use chrono::{Duration, NaiveDate};

pub use achievements::{evaluate_and_unlock, seed_catalog};

/// Points granted per completed task or todo (and removed on uncheck)
pub const POINTS_PER_TASK: i64 = 5;
/// Bonus granted when the streak reaches a multiple of the interval
pub const STREAK_BONUS_POINTS: i64 = 15;
/// Streak length interval at which the bonus fires
pub const STREAK_BONUS_INTERVAL: i64 = 3;
/// Points per level step
pub const POINTS_PER_LEVEL: i64 = 100;

/// Level derived from total points: 0-99 is level 1, 100-199 level 2, ...
pub fn level_for_points(points: i64) -> i64 {
    (points / POINTS_PER_LEVEL + 1).max(1)
}

/// Result of a stats mutation: the written aggregate plus whatever
/// achievements the mutation unlocked.
#[derive(Debug)]
pub struct StatsUpdate {
    pub stats: Stats,
    pub unlocked: Vec<crate::types::Achievement>,
}

/// Applies gamification rules on top of the repository.
pub struct StatsEngine<'a> {
    db: &'a Database,
}

impl<'a> StatsEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load a profile's aggregate, creating a zeroed one on first use.
    pub fn load_or_init_stats(&self, profile: &str, today: NaiveDate) -> Result<Stats> {
        match self.db.get_stats(profile)? {
            Some(stats) => Ok(stats),
            None => self.db.insert_stats(&Stats::initial(profile, today)),
        }
    }

    /// Set a task's completion flag and apply all gamification effects.
    ///
    /// Setting the flag to its current value changes nothing.
    pub fn complete_task(
        &self,
        profile: &str,
        task_id: i64,
        is_completed: bool,
        today: NaiveDate,
    ) -> Result<(Task, Option<StatsUpdate>)> {
        let task = self
            .db
            .get_task(task_id)?
            .filter(|t| t.profile == profile)
            .ok_or(Error::TaskNotFound(task_id))?;

        if task.is_completed == is_completed {
            return Ok((task, None));
        }

        let task = self.db.set_task_completion(task_id, profile, is_completed)?;
        let update = self.apply_completion_change(profile, is_completed, today)?;
        Ok((task, Some(update)))
    }

    /// Set a todo item's completion flag. Todos share the task reward
    /// rules: same points, same streak effect.
    pub fn complete_todo(
        &self,
        profile: &str,
        todo_id: i64,
        is_completed: bool,
        today: NaiveDate,
    ) -> Result<(TodoItem, Option<StatsUpdate>)> {
        let todo = self
            .db
            .list_todos(profile)?
            .into_iter()
            .find(|t| t.id == todo_id)
            .ok_or(Error::TodoNotFound(todo_id))?;

        if todo.is_completed == is_completed {
            return Ok((todo, None));
        }

        let todo = self.db.set_todo_completion(todo_id, profile, is_completed)?;
        let update = self.apply_completion_change(profile, is_completed, today)?;
        Ok((todo, Some(update)))
    }

    /// Create a task and bump the aggregate's total count.
    pub fn add_task(&self, profile: &str, task: &NewTask, today: NaiveDate) -> Result<Task> {
        let created = self.db.insert_task(profile, task)?;
        self.apply_task_count_change(profile, 1, today)?;
        Ok(created)
    }

    /// Delete a task and drop the aggregate's total count.
    ///
    /// Completed-task credit already earned is deliberately kept, which
    /// is why `completed_tasks` can exceed `total_tasks`.
    pub fn delete_task(&self, profile: &str, task_id: i64, today: NaiveDate) -> Result<()> {
        self.db.delete_task(task_id, profile)?;
        self.apply_task_count_change(profile, -1, today)?;
        Ok(())
    }

    /// Create a todo item and bump the aggregate's total count. Todos
    /// count toward the same total as tasks.
    pub fn add_todo(&self, profile: &str, text: &str, today: NaiveDate) -> Result<TodoItem> {
        let created = self.db.insert_todo(profile, text)?;
        self.apply_task_count_change(profile, 1, today)?;
        Ok(created)
    }

    /// Delete a todo item and drop the aggregate's total count. As with
    /// tasks, completed credit already earned is kept.
    pub fn delete_todo(&self, profile: &str, todo_id: i64, today: NaiveDate) -> Result<()> {
        self.db.delete_todo(todo_id, profile)?;
        self.apply_task_count_change(profile, -1, today)?;
        Ok(())
    }

    /// Core completion rule. `is_completed = true` is a check, `false`
    /// an uncheck.
    ///
    /// A check grants points and advances the streak when this is the
    /// first activity of the day: a consecutive day extends the streak
    /// (with a bonus every third day), a gap resets it to 1, same-day
    /// activity leaves it alone. An uncheck takes the points back but
    /// never touches the streak. Counters clamp at zero. The activity
    /// date advances on every call, uncheck included.
    pub fn apply_completion_change(
        &self,
        profile: &str,
        is_completed: bool,
        today: NaiveDate,
    ) -> Result<StatsUpdate> {
        let mut stats = self.load_or_init_stats(profile, today)?;

        let delta: i64 = if is_completed { 1 } else { -1 };
        stats.completed_tasks = (stats.completed_tasks + delta).max(0);
        stats.points = (stats.points + delta * POINTS_PER_TASK).max(0);

        if is_completed && stats.last_activity_date != Some(today) {
            let yesterday = today - Duration::days(1);
            if stats.last_activity_date == Some(yesterday) {
                stats.streak_days += 1;
                if stats.streak_days % STREAK_BONUS_INTERVAL == 0 {
                    stats.points += STREAK_BONUS_POINTS;
                    tracing::debug!(
                        profile,
                        streak = stats.streak_days,
                        "Streak bonus granted"
                    );
                }
            } else {
                stats.streak_days = 1;
            }
        }

        stats.last_activity_date = Some(today);
        stats.level = level_for_points(stats.points);

        let unlocked = evaluate_and_unlock(self.db, &mut stats)?;

        let stats = self.db.update_stats(&stats)?;
        tracing::debug!(
            profile,
            points = stats.points,
            level = stats.level,
            streak = stats.streak_days,
            "Stats updated"
        );

        Ok(StatsUpdate { stats, unlocked })
    }

    /// Adjust `total_tasks` when tasks are created or deleted. No
    /// points, streak or achievement effects.
    pub fn apply_task_count_change(
        &self,
        profile: &str,
        delta: i64,
        today: NaiveDate,
    ) -> Result<Stats> {
        let mut stats = self.load_or_init_stats(profile, today)?;
        stats.total_tasks = (stats.total_tasks + delta).max(0);
        self.db.update_stats(&stats)
    }
}
