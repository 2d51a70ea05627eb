//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- Reference data
    -- ============================================

    CREATE TABLE IF NOT EXISTS profiles (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        name                TEXT NOT NULL UNIQUE,
        subjects            JSON NOT NULL,       -- array of subject keys
        training_days       JSON,                -- array of day-of-week indices, 0 = Sunday
        study_goal_weekday  REAL,
        study_goal_training REAL,
        study_goal_weekend  REAL,
        created_at          DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS activity_templates (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        subject_key      TEXT NOT NULL,
        activity_key     TEXT NOT NULL,
        description      TEXT NOT NULL,
        default_duration REAL,                   -- hours

        UNIQUE(subject_key, activity_key)
    );

    CREATE TABLE IF NOT EXISTS achievements (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL,
        icon_name   TEXT NOT NULL,
        points      INTEGER NOT NULL
    );

    -- ============================================
    -- Schedule
    -- ============================================

    CREATE TABLE IF NOT EXISTS weeks (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        profile    TEXT NOT NULL REFERENCES profiles(name),
        title      TEXT NOT NULL,
        start_date DATE NOT NULL,
        end_date   DATE NOT NULL,                -- inclusive
        created_at DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_weeks_profile ON weeks(profile, start_date);

    CREATE TABLE IF NOT EXISTS days (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        week_id     INTEGER NOT NULL REFERENCES weeks(id),
        profile     TEXT NOT NULL REFERENCES profiles(name),
        date        DATE NOT NULL,
        day_name    TEXT NOT NULL,
        day_type    TEXT NOT NULL,               -- 'weekday', 'weekend', 'training', 'exam'
        comment     TEXT,
        efficiency  INTEGER,                     -- percent [0, 100]
        usefulness  INTEGER,                     -- percent [0, 100]
        study_hours REAL,                        -- [0, 24]
        created_at  DATETIME NOT NULL,

        UNIQUE(profile, date)
    );

    CREATE INDEX IF NOT EXISTS idx_days_week ON days(week_id);
    CREATE INDEX IF NOT EXISTS idx_days_profile_date ON days(profile, date);

    CREATE TABLE IF NOT EXISTS tasks (
        id                   INTEGER PRIMARY KEY AUTOINCREMENT,
        day_id               INTEGER NOT NULL REFERENCES days(id),
        profile              TEXT NOT NULL REFERENCES profiles(name),
        time_of_day          TEXT NOT NULL,      -- 'morning', 'afternoon'
        description          TEXT NOT NULL,
        duration_value       REAL,
        duration_unit        TEXT,               -- 'hours', 'minutes'
        is_completed         INTEGER NOT NULL DEFAULT 0,
        is_exam              INTEGER NOT NULL DEFAULT 0,
        score                INTEGER,            -- [0, 100], mock exams only
        activity_template_id INTEGER REFERENCES activity_templates(id),
        created_at           DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_day ON tasks(day_id);
    CREATE INDEX IF NOT EXISTS idx_tasks_profile ON tasks(profile);
    CREATE INDEX IF NOT EXISTS idx_tasks_exam ON tasks(profile, is_exam) WHERE is_exam = 1;

    CREATE TABLE IF NOT EXISTS todo_items (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        profile      TEXT NOT NULL REFERENCES profiles(name),
        text         TEXT NOT NULL,
        is_completed INTEGER NOT NULL DEFAULT 0,
        created_at   DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_todo_profile ON todo_items(profile, created_at DESC);

    -- ============================================
    -- Derived aggregates
    -- ============================================

    CREATE TABLE IF NOT EXISTS stats (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        profile            TEXT NOT NULL UNIQUE REFERENCES profiles(name),
        total_tasks        INTEGER NOT NULL DEFAULT 0,
        completed_tasks    INTEGER NOT NULL DEFAULT 0,
        streak_days        INTEGER NOT NULL DEFAULT 0,
        points             INTEGER NOT NULL DEFAULT 0,
        level              INTEGER NOT NULL DEFAULT 1,
        last_activity_date DATE,
        version            INTEGER NOT NULL DEFAULT 0,
        created_at         DATETIME NOT NULL,
        updated_at         DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS unlocked_achievements (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        profile        TEXT NOT NULL REFERENCES profiles(name),
        achievement_id INTEGER NOT NULL REFERENCES achievements(id),
        unlocked_at    DATETIME NOT NULL,

        UNIQUE(profile, achievement_id)
    );

    CREATE INDEX IF NOT EXISTS idx_unlocked_profile ON unlocked_achievements(profile);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run migrations twice - should be idempotent
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = [
            "profiles",
            "activity_templates",
            "achievements",
            "weeks",
            "days",
            "tasks",
            "todo_items",
            "stats",
            "unlocked_achievements",
        ];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_day_date_unique_per_profile() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO profiles (name, subjects, created_at) VALUES ('A', '[]', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO weeks (profile, title, start_date, end_date, created_at)
             VALUES ('A', 'w', '2025-05-05', '2025-05-11', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let insert_day = "INSERT INTO days (week_id, profile, date, day_name, day_type, created_at)
             VALUES (1, 'A', '2025-05-05', 'Понедельник', 'weekday', '2025-01-01T00:00:00Z')";
        conn.execute(insert_day, []).unwrap();
        assert!(conn.execute(insert_day, []).is_err());
    }

    #[test]
    fn test_unlock_unique_per_profile_and_achievement() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO profiles (name, subjects, created_at) VALUES ('A', '[]', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO achievements (name, description, icon_name, points)
             VALUES ('First Task', 'd', 'check', 10)",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO unlocked_achievements (profile, achievement_id, unlocked_at)
             VALUES ('A', 1, '2025-01-01T00:00:00Z')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
