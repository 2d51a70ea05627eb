//! # egetrack-core
//!
//! Core library for egetrack - a personal exam-prep study tracker.
//!
//! This library provides:
//! - Domain types for profiles, weeks, days, tasks and todos
//! - Database storage layer with SQLite
//! - The gamification engine (points, levels, streaks, achievements)
//! - Weekly study-hours reporting
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! All persistent state lives in SQLite behind [`Database`]. Task and
//! todo completion flows through [`engine::StatsEngine`], which owns
//! every mutation of the per-profile stats aggregate and the
//! achievement unlocks it can trigger. Reports are computed on demand
//! from the stored days.
//!
//! ## Example
//!
//! ```rust,no_run
//! use egetrack_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use engine::{StatsEngine, StatsUpdate};
pub use error::{Error, Result};
pub use report::{build_weekly_report, WeekReport};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod report;
pub mod schedule;
pub mod seed;
pub mod types;
