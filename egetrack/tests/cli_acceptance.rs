use egetrack_core::Database;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("egetrack/data.db")
    }
}

fn run_cli(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("egetrack"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute egetrack: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "egetrack {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn seed_populates_database() {
    let env = CliTestEnv::new();

    // Seeding without --force must refuse
    let refused = run_cli(&env, &["seed"]);
    assert!(!refused.status.success());

    let output = run_cli(&env, &["seed", "--force"]);
    assert_success(&["seed", "--force"], &output);

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let db = Database::open(&db_path).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    assert_eq!(db.list_profiles().expect("list profiles").len(), 3);
    assert_eq!(db.list_profile_days("Сева").expect("list days").len(), 21);

    let list = run_cli(&env, &["profiles"]);
    assert_success(&["profiles"], &list);
    let stdout = String::from_utf8_lossy(&list.stdout);
    assert!(stdout.contains("Сева"));
    assert!(stdout.contains("Леша"));
}

#[test]
fn completing_a_task_updates_stats_and_unlocks_first_task() {
    let env = CliTestEnv::new();
    assert_success(&["seed", "--force"], &run_cli(&env, &["seed", "--force"]));

    let done = run_cli(&env, &["--profile", "Сева", "task", "done", "1"]);
    assert_success(&["task", "done", "1"], &done);
    let done_stdout = String::from_utf8_lossy(&done.stdout);
    assert!(
        done_stdout.contains("First Task"),
        "expected First Task unlock in output, got:\n{done_stdout}"
    );

    let stats = run_cli(&env, &["--profile", "Сева", "stats", "--format", "json"]);
    assert_success(&["stats", "--format", "json"], &stats);
    let json: serde_json::Value =
        serde_json::from_slice(&stats.stdout).expect("stats output should be JSON");

    // +5 for the task, +10 First Task reward; seeded today, so the
    // streak stays at zero
    assert_eq!(json["points"], 15);
    assert_eq!(json["level"], 1);
    assert_eq!(json["streak_days"], 0);
    assert_eq!(json["completed_tasks"], 1);
}

#[test]
fn todo_flow_and_report() {
    let env = CliTestEnv::new();
    assert_success(&["seed", "--force"], &run_cli(&env, &["seed", "--force"]));

    let add = run_cli(&env, &["--profile", "Ваня", "todo", "add", "Разобрать 19 задание"]);
    assert_success(&["todo", "add"], &add);

    let list = run_cli(&env, &["--profile", "Ваня", "todo", "list"]);
    assert_success(&["todo", "list"], &list);
    let stdout = String::from_utf8_lossy(&list.stdout);
    assert!(stdout.contains("[ ]"));
    assert!(stdout.contains("Разобрать 19 задание"));

    // The report range has schedule days but no recorded hours
    let report = run_cli(
        &env,
        &[
            "--profile", "Сева", "report", "--start", "2000-01-01", "--end", "2000-01-07",
            "--format", "json",
        ],
    );
    assert_success(&["report"], &report);
    let json: serde_json::Value =
        serde_json::from_slice(&report.stdout).expect("report output should be JSON");
    assert!(json.as_array().expect("report is an array").is_empty());
}
