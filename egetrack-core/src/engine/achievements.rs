//! Achievement catalog and unlock evaluation
//!
//! The catalog is seeded once and shared by all profiles. Unlock checks
//! run after every stats mutation; each entry unlocks at most once per
//! profile, enforced by a UNIQUE constraint underneath.

use crate::db::Database;
use crate::error::Result;
use crate::types::{Achievement, Stats};
use chrono::Utc;

use super::level_for_points;

/// Catalog entry definition: name, description, icon, point reward.
const CATALOG: &[(&str, &str, &str, i64)] = &[
    ("First Task", "Выполните свою первую задачу", "check", 10),
    ("Task Master", "Выполните 10 задач", "award", 20),
    ("3-Day Streak", "Будьте активны 3 дня подряд", "calendar", 15),
    ("Week Warrior", "Будьте активны 7 дней подряд", "trophy", 30),
    ("Point Collector", "Наберите 100 очков", "star", 25),
    ("EGE Champion", "Достигните 5 уровня", "zap", 50),
];

/// Insert the built-in catalog. Safe to call repeatedly.
pub fn seed_catalog(db: &Database) -> Result<()> {
    for (name, description, icon, points) in CATALOG {
        db.insert_achievement(name, description, icon, *points)?;
    }
    Ok(())
}

/// Whether a profile's current aggregate satisfies an achievement.
///
/// Unknown names never unlock, so new catalog rows added to the store
/// without a matching condition here are inert rather than an error.
fn is_satisfied(name: &str, stats: &Stats) -> bool {
    match name {
        "First Task" => stats.completed_tasks >= 1,
        "Task Master" => stats.completed_tasks >= 10,
        "3-Day Streak" => stats.streak_days >= 3,
        "Week Warrior" => stats.streak_days >= 7,
        "Point Collector" => stats.points >= 100,
        "EGE Champion" => stats.level >= 5,
        _ => false,
    }
}

/// Evaluate all locked achievements against `stats` in a single pass.
///
/// Rewards are credited to `stats.points` as each unlock lands and the
/// level is recomputed, so an unlock earlier in the pass can satisfy a
/// later entry (e.g. a reward pushing points past 100 unlocks Point
/// Collector in the same call). Achievements that only become reachable
/// because of a reward granted in THIS pass to a LATER entry are picked
/// up on the next mutation.
///
/// Unlock rows are persisted here, before the caller writes the stats
/// row; if that versioned write then loses a race, the unlocks stand
/// but their reward points are not applied.
pub fn evaluate_and_unlock(db: &Database, stats: &mut Stats) -> Result<Vec<Achievement>> {
    let catalog = db.list_achievements()?;
    let already_unlocked = db.unlocked_achievement_ids(&stats.profile)?;

    let mut newly_unlocked = Vec::new();
    let now = Utc::now();

    for achievement in catalog {
        if already_unlocked.contains(&achievement.id) {
            continue;
        }
        if !is_satisfied(&achievement.name, stats) {
            continue;
        }

        // INSERT OR IGNORE underneath; a concurrent unlock of the same
        // pair simply yields no reward here.
        if db.insert_unlocked_achievement(&stats.profile, achievement.id, now)? {
            stats.points += achievement.points;
            stats.level = level_for_points(stats.points);

            tracing::info!(
                profile = %stats.profile,
                achievement = %achievement.name,
                reward = achievement.points,
                "Achievement unlocked"
            );
            newly_unlocked.push(achievement);
        }
    }

    Ok(newly_unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stats_with(completed: i64, streak: i64, points: i64) -> Stats {
        let mut s = Stats::initial("Сева", NaiveDate::from_ymd_opt(2025, 5, 9).unwrap());
        s.completed_tasks = completed;
        s.streak_days = streak;
        s.points = points;
        s.level = level_for_points(points);
        s
    }

    #[test]
    fn test_conditions() {
        assert!(is_satisfied("First Task", &stats_with(1, 0, 5)));
        assert!(!is_satisfied("First Task", &stats_with(0, 0, 0)));

        assert!(is_satisfied("Task Master", &stats_with(10, 0, 50)));
        assert!(!is_satisfied("Task Master", &stats_with(9, 0, 45)));

        assert!(is_satisfied("3-Day Streak", &stats_with(3, 3, 15)));
        assert!(is_satisfied("Week Warrior", &stats_with(7, 7, 35)));
        assert!(!is_satisfied("Week Warrior", &stats_with(7, 6, 35)));

        assert!(is_satisfied("Point Collector", &stats_with(20, 0, 100)));
        assert!(is_satisfied("EGE Champion", &stats_with(80, 0, 400)));
        assert!(!is_satisfied("EGE Champion", &stats_with(79, 0, 399)));

        assert!(!is_satisfied("Сто пробников", &stats_with(100, 100, 1000)));
    }

    #[test]
    fn test_unlock_credits_reward_once() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_profile("Сева", &[], None, Default::default())
            .unwrap();
        seed_catalog(&db).unwrap();

        let mut stats = stats_with(1, 0, 5);
        let unlocked = evaluate_and_unlock(&db, &mut stats).unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].name, "First Task");
        assert_eq!(stats.points, 15);

        // Second pass with the same aggregate finds nothing new
        let again = evaluate_and_unlock(&db, &mut stats).unwrap();
        assert!(again.is_empty());
        assert_eq!(stats.points, 15);
    }

    #[test]
    fn test_reward_cascades_within_one_pass() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_profile("Сева", &[], None, Default::default())
            .unwrap();
        seed_catalog(&db).unwrap();

        // 95 points: Point Collector is out of reach until First Task's
        // +10 reward lands earlier in the same pass.
        let mut stats = stats_with(1, 0, 95);
        let unlocked = evaluate_and_unlock(&db, &mut stats).unwrap();

        let names: Vec<&str> = unlocked.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["First Task", "Point Collector"]);
        assert_eq!(stats.points, 130);
        assert_eq!(stats.level, 2);
    }
}
