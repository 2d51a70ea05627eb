//! Demo data seeder
//!
//! Wipes the store and loads a known starting state: the activity and
//! achievement catalogs, three student profiles and a filled three-week
//! schedule for the first of them. Destructive on purpose; callers
//! gate it behind an explicit flag.

use crate::db::Database;
use crate::engine::{seed_catalog, StatsEngine};
use crate::error::Result;
use crate::schedule::generate_schedule;
use crate::types::{DayType, NewTask, StudyGoals, TaskDuration, TimeOfDay};
use chrono::{Datelike, NaiveDate};

/// Activity catalog: subject, activity, description, default hours.
const ACTIVITY_TEMPLATES: &[(&str, &str, &str, f64)] = &[
    ("rus", "nareshka", "Нарешка по русскому", 2.0),
    ("rus", "part1_probnik", "Пробник часть 1 (русский)", 1.5),
    ("rus", "sochinenie", "Сочинение", 1.5),
    ("rus", "full_probnik", "Полный пробник по русскому", 3.5),
    ("math_prof", "nareshka", "Нарешка по математике", 2.0),
    ("math_prof", "part1_probnik", "Пробник часть 1 (математика)", 1.5),
    ("math_prof", "part2_probnik", "Пробник часть 2 (математика)", 2.0),
    ("math_prof", "full_probnik", "Полный пробник по математике", 4.0),
    ("inf", "nareshka", "Нарешка по информатике", 2.0),
    ("inf", "hardprog", "Сложное программирование", 2.0),
    ("inf", "part1_probnik", "Пробник часть 1 (информатика)", 1.5),
    ("inf", "part2_probnik", "Пробник часть 2 (информатика)", 2.0),
    ("inf", "full_probnik", "Полный пробник по информатике", 4.0),
    ("phys", "nareshka", "Нарешка по физике", 2.0),
    ("phys", "part1_probnik", "Пробник часть 1 (физика)", 2.0),
    ("phys", "part2_probnik", "Пробник часть 2 (физика)", 2.0),
    ("phys", "full_probnik", "Полный пробник по физике", 4.0),
];

const TODO_ITEMS: &[&str] = &[
    "Записаться на пробный ЕГЭ по русскому",
    "Купить сборник задач по математике",
    "Повторить теорию по информатике",
];

/// Wipe the store and load the demo dataset. `today` anchors the
/// generated schedule and the initial stats row.
pub fn seed_demo_data(db: &Database, today: NaiveDate) -> Result<()> {
    tracing::warn!("Wiping all data before seeding");
    db.wipe_all()?;

    for (subject, activity, description, hours) in ACTIVITY_TEMPLATES {
        db.insert_activity_template(subject, activity, description, Some(*hours))?;
    }
    seed_catalog(db)?;

    let core_subjects = ["rus", "math_prof", "inf"].map(String::from);
    db.insert_profile(
        "Сева",
        &core_subjects,
        Some(&[2, 4]),
        StudyGoals {
            weekday: Some(3.0),
            training: Some(2.0),
            weekend: Some(5.0),
        },
    )?;
    db.insert_profile("Ваня", &core_subjects, Some(&[2, 4]), StudyGoals::default())?;
    db.insert_profile(
        "Леша",
        &["rus", "math_prof", "phys"].map(String::from),
        None,
        StudyGoals::default(),
    )?;

    let engine = StatsEngine::new(db);
    engine.load_or_init_stats("Сева", today)?;

    generate_schedule(db, "Сева", today, 3)?;
    for day in db.list_profile_days("Сева")? {
        for task in demo_tasks_for(day.day_type, day.date) {
            let mut task = task;
            task.day_id = day.id;
            engine.add_task("Сева", &task, today)?;
        }
    }

    for text in TODO_ITEMS {
        engine.add_todo("Сева", text, today)?;
    }

    tracing::info!("Demo data seeded");
    Ok(())
}

fn task(description: &str, time_of_day: TimeOfDay, hours: f64, is_exam: bool) -> NewTask {
    NewTask {
        day_id: 0, // filled in by the caller
        time_of_day,
        description: description.to_string(),
        duration: Some(TaskDuration::hours(hours)),
        is_exam,
        activity_template_id: None,
    }
}

/// The demo task plan: weekends are loaded days with a Sunday full
/// mock, training days stay light with a Tuesday mock, plain weekdays
/// get two sessions and a Friday mock. Exam days stay empty.
fn demo_tasks_for(day_type: DayType, date: NaiveDate) -> Vec<NewTask> {
    let dow = date.weekday().num_days_from_sunday();

    match day_type {
        DayType::Weekend => {
            let mut tasks = vec![
                task("[РУС] Нарешка по русскому", TimeOfDay::Morning, 2.0, false),
                task("[МАТ] Нарешка по математике", TimeOfDay::Morning, 2.0, false),
                task("[ИНФ] Сложное программирование", TimeOfDay::Afternoon, 2.0, false),
            ];
            if dow == 0 {
                tasks.push(task("[ФУЛЛ пробник рус]", TimeOfDay::Afternoon, 3.5, true));
            }
            tasks
        }
        DayType::Training => {
            let mut tasks = vec![task(
                "[РУС] Нарешка по русскому",
                TimeOfDay::Morning,
                1.5,
                false,
            )];
            if dow == 2 {
                tasks.push(task("[МАТ] Пробник часть 1", TimeOfDay::Afternoon, 1.5, true));
            }
            tasks
        }
        DayType::Weekday => {
            let mut tasks = vec![
                task("[МАТ] Нарешка по математике", TimeOfDay::Morning, 1.5, false),
                task("[ИНФ] Нарешка по информатике", TimeOfDay::Afternoon, 1.5, false),
            ];
            if dow == 5 {
                tasks.push(task("[ИНФ] Пробник часть 2", TimeOfDay::Afternoon, 2.0, true));
            }
            tasks
        }
        DayType::Exam => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_seed_loads_known_state() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let today = date("2025-03-03"); // a Monday outside the exam window

        seed_demo_data(&db, today).unwrap();

        let profiles = db.list_profiles().unwrap();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].name, "Сева");
        assert_eq!(profiles[0].goals.weekend, Some(5.0));
        assert!(profiles[2].training_days.is_none());

        assert_eq!(db.list_achievements().unwrap().len(), 6);
        assert_eq!(db.list_activity_templates(None).unwrap().len(), 17);
        assert_eq!(db.list_activity_templates(Some("inf")).unwrap().len(), 5);

        let days = db.list_profile_days("Сева").unwrap();
        assert_eq!(days.len(), 21);

        // Tuesday is a training day with the mock exam
        let tuesday_tasks = db.list_day_tasks(days[1].id).unwrap();
        assert_eq!(tuesday_tasks.len(), 2);
        assert!(tuesday_tasks.iter().any(|t| t.is_exam));

        assert_eq!(db.list_todos("Сева").unwrap().len(), 3);

        // Per week: 5 weekday + 2 training + 4 weekend + mocks (3);
        // the 3 todos count toward the total as well
        let stats = db.get_stats("Сева").unwrap().unwrap();
        let scheduled_tasks: i64 = days
            .iter()
            .map(|d| db.list_day_tasks(d.id).unwrap().len() as i64)
            .sum();
        assert_eq!(stats.total_tasks, scheduled_tasks + 3);
        assert_eq!(stats.points, 0);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.last_activity_date, Some(today));
    }

    #[test]
    fn test_seed_is_repeatable() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let today = date("2025-03-03");

        seed_demo_data(&db, today).unwrap();
        seed_demo_data(&db, today).unwrap();

        assert_eq!(db.list_profiles().unwrap().len(), 3);
        assert_eq!(db.list_profile_days("Сева").unwrap().len(), 21);
    }
}
