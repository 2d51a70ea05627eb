//! egetrack - personal exam-prep study tracker
//!
//! CLI for managing study schedules, tracking task completion with
//! points/levels/streaks, and reporting weekly study hours.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use egetrack_core::engine::{seed_catalog, StatsEngine, StatsUpdate};
use egetrack_core::format::{completion_marker, format_date, format_date_range, format_hours};
use egetrack_core::schedule::{clone_schedule, generate_schedule, recompute_day_types};
use egetrack_core::types::{DayUpdate, NewTask, StudyGoals, TaskDuration, TimeOfDay};
use egetrack_core::{build_weekly_report, Config, Database};

#[derive(Parser)]
#[command(name = "egetrack")]
#[command(about = "Exam-prep study schedule tracker")]
#[command(version)]
struct Args {
    /// Profile to act on (falls back to default_profile from config)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wipe the database and load demo data
    Seed {
        /// Required confirmation; seeding destroys existing data
        #[arg(long)]
        force: bool,
    },

    /// List profiles
    Profiles,

    /// Manage the active profile's settings
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Manage the schedule
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Record day metrics (hours, efficiency, comment)
    Day {
        #[command(subcommand)]
        command: DayCommand,
    },

    /// Manage the todo list
    Todo {
        #[command(subcommand)]
        command: TodoCommand,
    },

    /// Show the profile's stats aggregate
    Stats {
        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the achievement catalog and unlock state
    Achievements,

    /// Weekly study-hours report
    Report {
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Range end (YYYY-MM-DD), defaults to the start date
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Create a new profile
    Create {
        name: String,

        /// Subject keys (e.g. rus math_prof inf)
        #[arg(long, num_args = 1..)]
        subjects: Vec<String>,
    },

    /// Set study-hour goals per day type. Omitted goals are cleared.
    SetGoals {
        #[arg(long)]
        weekday: Option<f64>,

        #[arg(long)]
        training: Option<f64>,

        #[arg(long)]
        weekend: Option<f64>,
    },

    /// Set training days (0 = Sunday .. 6 = Saturday) and reclassify
    /// the existing schedule. No days clears them.
    SetTrainingDays {
        days: Vec<u8>,
    },
}

#[derive(Subcommand)]
enum ScheduleCommand {
    /// Generate consecutive weeks of empty days
    Generate {
        /// First day of the schedule (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Number of weeks (defaults from config)
        #[arg(long)]
        weeks: Option<u32>,
    },

    /// Copy another profile's week structure onto this profile
    Clone {
        /// Profile to copy from
        #[arg(long)]
        from: String,
    },

    /// Show the schedule with its tasks
    Show {
        /// Only show days from this date on
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Only show days up to this date
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task to a day
    Add {
        /// Date of the day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Task description
        description: String,

        /// morning or afternoon
        #[arg(long, default_value = "morning")]
        time: String,

        /// Duration, e.g. "2", "1.5 ч", "90 мин"
        #[arg(long)]
        duration: Option<String>,

        /// Mark as a scored mock exam
        #[arg(long)]
        exam: bool,
    },

    /// Mark a task completed
    Done { id: i64 },

    /// Mark a task not completed
    Undo { id: i64 },

    /// Delete a task
    Rm { id: i64 },

    /// Record a mock-exam score [0, 100]
    Score { id: i64, score: u8 },
}

#[derive(Subcommand)]
enum DayCommand {
    /// Update a day's metrics
    Set {
        /// Date of the day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Study hours [0, 24]
        #[arg(long)]
        hours: Option<f64>,

        /// Efficiency percent [0, 100]
        #[arg(long)]
        efficiency: Option<u8>,

        /// Usefulness percent [0, 100]
        #[arg(long)]
        usefulness: Option<u8>,

        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Subcommand)]
enum TodoCommand {
    /// Add a todo item
    Add { text: String },

    /// List todo items
    List,

    /// Mark a todo item completed
    Done { id: i64 },

    /// Mark a todo item not completed
    Undo { id: i64 },

    /// Delete a todo item
    Rm { id: i64 },
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        egetrack_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let today = Local::now().date_naive();

    match args.command {
        Command::Seed { force } => {
            if !force {
                bail!("seeding wipes all existing data; pass --force to confirm");
            }
            egetrack_core::seed::seed_demo_data(&db, today)
                .context("failed to seed demo data")?;
            println!("Demo data loaded.");
        }

        Command::Profiles => {
            let profiles = db.list_profiles()?;
            if profiles.is_empty() {
                println!("No profiles. Create one with 'egetrack profile create' or run 'egetrack seed --force'.");
                return Ok(());
            }
            for p in profiles {
                let training = match &p.training_days {
                    Some(days) if !days.is_empty() => format!(
                        "training days: {}",
                        days.iter()
                            .map(|d| d.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    ),
                    _ => "no training days".to_string(),
                };
                println!("{}  [{}]  {}", p.name, p.subjects.join(", "), training);
            }
        }

        Command::Profile { command } => {
            run_profile_command(&db, &config, args.profile, command)?
        }

        Command::Schedule { command } => {
            let profile = resolve_profile(&config, args.profile)?;
            run_schedule_command(&db, &config, &profile, command, today)?
        }

        Command::Task { command } => {
            let profile = resolve_profile(&config, args.profile)?;
            run_task_command(&db, &profile, command, today)?
        }

        Command::Day {
            command: DayCommand::Set {
                date,
                hours,
                efficiency,
                usefulness,
                comment,
            },
        } => {
            let profile = resolve_profile(&config, args.profile)?;
            let day = find_day(&db, &profile, date)?;
            let updated = db.update_day_info(
                day.id,
                &profile,
                &DayUpdate {
                    comment,
                    efficiency,
                    usefulness,
                    study_hours: hours,
                    day_type: None,
                },
            )?;
            println!(
                "{} {}: {} ч, эффективность {}%",
                updated.day_name,
                format_date(updated.date),
                updated.study_hours.map(format_hours).unwrap_or_else(|| "-".into()),
                updated
                    .efficiency
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".into()),
            );
        }

        Command::Todo { command } => {
            let profile = resolve_profile(&config, args.profile)?;
            run_todo_command(&db, &profile, command, today)?
        }

        Command::Stats { format } => {
            let profile = resolve_profile(&config, args.profile)?;
            let engine = StatsEngine::new(&db);
            let stats = engine.load_or_init_stats(&profile, today)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Профиль: {}", profile);
                println!("  Очки: {}", stats.points);
                println!("  Уровень: {}", stats.level);
                println!("  Серия: {} дн.", stats.streak_days);
                println!(
                    "  Задачи: {} выполнено из {}",
                    stats.completed_tasks, stats.total_tasks
                );
            }
        }

        Command::Achievements => {
            let profile = resolve_profile(&config, args.profile)?;
            seed_catalog(&db)?;
            let unlocked = db.unlocked_achievement_ids(&profile)?;
            for a in db.list_achievements()? {
                let marker = if unlocked.contains(&a.id) { "[x]" } else { "[ ]" };
                println!("{} {} (+{}) - {}", marker, a.name, a.points, a.description);
            }
        }

        Command::Report { start, end, format } => {
            let profile = resolve_profile(&config, args.profile)?;
            let end = end.unwrap_or(start);
            let reports = build_weekly_report(&db, &profile, start, end)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&reports)?);
                return Ok(());
            }

            if reports.is_empty() {
                println!("Нет данных для выбранного периода.");
                return Ok(());
            }

            let total: f64 = reports.iter().map(|w| w.total_hours).sum();
            println!("Всего часов за период: {}", format_hours(total));
            for week in &reports {
                let goal = match week.weekly_goal {
                    Some(goal) => format!(
                        " (цель {} ч, без экзаменов {} ч)",
                        format_hours(goal),
                        format_hours(week.goal_hours())
                    ),
                    None => String::new(),
                };
                println!(
                    "Неделя {}, {}: {} ч, задач выполнено: {}{}",
                    week.iso_week,
                    format_date_range(week.week_start, week.week_end),
                    format_hours(week.total_hours),
                    week.completed_tasks,
                    goal
                );
            }
        }
    }

    Ok(())
}

/// Pick the profile: CLI flag first, then config default.
fn resolve_profile(config: &Config, arg: Option<String>) -> Result<String> {
    arg.or_else(|| config.default_profile.clone())
        .context("no profile given; pass --profile or set default_profile in config")
}

fn find_day(db: &Database, profile: &str, date: NaiveDate) -> Result<egetrack_core::types::Day> {
    let days = db.list_days(profile, date, date)?;
    days.into_iter()
        .next()
        .with_context(|| format!("no schedule day on {} for {}", date, profile))
}

fn run_profile_command(
    db: &Database,
    config: &Config,
    profile_arg: Option<String>,
    command: ProfileCommand,
) -> Result<()> {
    match command {
        ProfileCommand::Create { name, subjects } => {
            db.insert_profile(&name, &subjects, None, StudyGoals::default())?;
            println!("Profile '{}' created.", name);
        }

        ProfileCommand::SetGoals {
            weekday,
            training,
            weekend,
        } => {
            let profile = resolve_profile(config, profile_arg)?;
            let current = db
                .get_profile(&profile)?
                .with_context(|| format!("profile not found: {}", profile))?;
            db.update_profile_settings(
                &profile,
                current.training_days.as_deref(),
                StudyGoals {
                    weekday,
                    training,
                    weekend,
                },
            )?;
            println!("Goals updated for '{}'.", profile);
        }

        ProfileCommand::SetTrainingDays { days } => {
            let profile = resolve_profile(config, profile_arg)?;
            if days.iter().any(|d| *d > 6) {
                bail!("training days must be 0 (Sunday) through 6 (Saturday)");
            }
            let current = db
                .get_profile(&profile)?
                .with_context(|| format!("profile not found: {}", profile))?;
            let training_days = if days.is_empty() { None } else { Some(days) };
            db.update_profile_settings(&profile, training_days.as_deref(), current.goals)?;

            // Day types depend on training days, so reclassify
            let changed = recompute_day_types(db, &profile)?;
            println!("Training days updated; {} day(s) reclassified.", changed);
        }
    }
    Ok(())
}

fn run_schedule_command(
    db: &Database,
    config: &Config,
    profile: &str,
    command: ScheduleCommand,
    today: NaiveDate,
) -> Result<()> {
    match command {
        ScheduleCommand::Generate { start, weeks } => {
            let start = start.unwrap_or(today);
            let weeks = weeks.unwrap_or(config.schedule.default_weeks);
            let created = generate_schedule(db, profile, start, weeks)?;
            println!(
                "Generated {} week(s) starting {}.",
                created.len(),
                format_date(start)
            );
        }

        ScheduleCommand::Clone { from } => {
            let created = clone_schedule(db, &from, profile)?;
            println!("Cloned {} week(s) from '{}'.", created.len(), from);
        }

        ScheduleCommand::Show { start, end } => {
            for week in db.list_weeks(profile)? {
                let days = db.list_week_days(week.id)?;
                let days: Vec<_> = days
                    .into_iter()
                    .filter(|d| start.map_or(true, |s| d.date >= s))
                    .filter(|d| end.map_or(true, |e| d.date <= e))
                    .collect();
                if days.is_empty() {
                    continue;
                }

                println!(
                    "{} ({})",
                    week.title,
                    format_date_range(week.start_date, week.end_date)
                );
                for day in days {
                    println!(
                        "  {} {} [{}]",
                        format_date(day.date),
                        day.day_name,
                        day.day_type
                    );
                    for task in db.list_day_tasks(day.id)? {
                        let duration = task
                            .duration
                            .map(|d| format!(" ({})", d))
                            .unwrap_or_default();
                        let score = task
                            .score
                            .map(|s| format!(" - {} баллов", s))
                            .unwrap_or_default();
                        println!(
                            "    {} #{} {}{}{}",
                            completion_marker(task.is_completed),
                            task.id,
                            task.description,
                            duration,
                            score
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_task_command(
    db: &Database,
    profile: &str,
    command: TaskCommand,
    today: NaiveDate,
) -> Result<()> {
    let engine = StatsEngine::new(db);

    match command {
        TaskCommand::Add {
            date,
            description,
            time,
            duration,
            exam,
        } => {
            let day = find_day(db, profile, date)?;
            let time_of_day: TimeOfDay = time
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let duration = duration.as_deref().map(TaskDuration::parse).transpose()?;

            let task = engine.add_task(
                profile,
                &NewTask {
                    day_id: day.id,
                    time_of_day,
                    description,
                    duration,
                    is_exam: exam,
                    activity_template_id: None,
                },
                today,
            )?;
            println!("Task #{} added to {}.", task.id, format_date(date));
        }

        TaskCommand::Done { id } => {
            let (task, update) = engine.complete_task(profile, id, true, today)?;
            println!("{} #{} {}", completion_marker(true), task.id, task.description);
            report_update(update);
        }

        TaskCommand::Undo { id } => {
            let (task, update) = engine.complete_task(profile, id, false, today)?;
            println!("{} #{} {}", completion_marker(false), task.id, task.description);
            report_update(update);
        }

        TaskCommand::Rm { id } => {
            engine.delete_task(profile, id, today)?;
            println!("Task #{} deleted.", id);
        }

        TaskCommand::Score { id, score } => {
            let task = db.set_task_score(id, profile, score)?;
            println!("#{} {}: {} баллов", task.id, task.description, score);
        }
    }
    Ok(())
}

fn run_todo_command(
    db: &Database,
    profile: &str,
    command: TodoCommand,
    today: NaiveDate,
) -> Result<()> {
    let engine = StatsEngine::new(db);

    match command {
        TodoCommand::Add { text } => {
            let todo = engine.add_todo(profile, &text, today)?;
            println!("Todo #{} added.", todo.id);
        }

        TodoCommand::List => {
            for todo in db.list_todos(profile)? {
                println!(
                    "{} #{} {}",
                    completion_marker(todo.is_completed),
                    todo.id,
                    todo.text
                );
            }
        }

        TodoCommand::Done { id } => {
            let (todo, update) = engine.complete_todo(profile, id, true, today)?;
            println!("{} #{} {}", completion_marker(true), todo.id, todo.text);
            report_update(update);
        }

        TodoCommand::Undo { id } => {
            let (todo, update) = engine.complete_todo(profile, id, false, today)?;
            println!("{} #{} {}", completion_marker(false), todo.id, todo.text);
            report_update(update);
        }

        TodoCommand::Rm { id } => {
            engine.delete_todo(profile, id, today)?;
            println!("Todo #{} deleted.", id);
        }
    }
    Ok(())
}

/// Print the gamification outcome of a completion change.
fn report_update(update: Option<StatsUpdate>) {
    let Some(update) = update else { return };
    println!(
        "Очки: {}, уровень: {}, серия: {} дн.",
        update.stats.points, update.stats.level, update.stats.streak_days
    );
    for achievement in &update.unlocked {
        println!(
            "Достижение разблокировано: {} (+{})",
            achievement.name, achievement.points
        );
    }
}
