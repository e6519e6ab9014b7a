//! Lexis - study session engine for vocabulary practice
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use lexis::cli::{
    PlanCommand, PlanOptions, ProgressCommand, ProgressOptions, RankCommand, RankOptions,
    RewardsCommand, RewardsOptions,
};
use lexis::config::{data_dir, lexis_home, Config};
use lexis::error::{exit_codes, LexisError};
use lexis::storage::{FileItemStore, FileProgressionStore};
use lexis::QuizMode;

// =============================================================================
// CLI Definition
// =============================================================================

/// Lexis - study session engine for vocabulary practice
#[derive(Parser)]
#[command(name = "lexis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory (defaults to ~/.lexis/data or $LEXIS_HOME/data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List vocabulary items in review order
    Rank {
        /// Restrict to a table (repeatable)
        #[arg(long = "table", short)]
        tables: Vec<String>,
        /// Restrict to a tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Maximum number of items
        #[arg(long, short)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Preview the practice queue of a new session
    Plan {
        /// Table to study (repeatable)
        #[arg(long = "table", short, required = true)]
        tables: Vec<String>,
        /// Restrict to a tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Relation to use (repeatable, default: all of the tables)
        #[arg(long = "relation", short)]
        relations: Vec<String>,
        /// Enabled quiz mode: typing, mc, tf (repeatable, default: all)
        #[arg(long = "mode", short)]
        modes: Vec<QuizMode>,
        /// Number of words to study
        #[arg(long, short, default_value_t = 20)]
        words: usize,
        /// Pick a random relation for every step
        #[arg(long)]
        random_relation: bool,
        /// Seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show XP and milestone progress
    Progress {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List the reward log
    Rewards {
        /// Maximum number of entries
        #[arg(long, short)]
        limit: Option<usize>,
        /// Also list session records
        #[arg(long, short)]
        sessions: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("lexis error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.lexis/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("lexis panic: {}", info);

        if let Some(home) = lexis_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => data_dir()
            .ok_or_else(|| LexisError::config("could not determine data directory"))?,
    };

    match cli.command {
        Commands::Rank {
            tables,
            tags,
            limit,
            json,
            quiet,
        } => run_rank(tables, tags, limit, json, quiet, data_dir),
        Commands::Plan {
            tables,
            tags,
            relations,
            modes,
            words,
            random_relation,
            seed,
            json,
            quiet,
        } => run_plan(
            PlanOptions {
                json,
                quiet,
                tables,
                tags,
                relations,
                modes,
                words,
                random_relation,
                seed,
            },
            data_dir,
        ),
        Commands::Progress { json, quiet } => run_progress(json, quiet, data_dir),
        Commands::Rewards {
            limit,
            sessions,
            json,
            quiet,
        } => run_rewards(limit, sessions, json, quiet, data_dir),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

const DEFAULT_LIMIT: usize = 20;

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

/// Print command output as JSON or text.
fn print_output<T: Serialize>(
    output: &T,
    text: impl FnOnce() -> String,
    json: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if quiet {
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(output)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn run_rank(
    tables: Vec<String>,
    tags: Vec<String>,
    limit: Option<usize>,
    json: bool,
    quiet: bool,
    data_dir: PathBuf,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = FileItemStore::with_dir(data_dir)?;
    let cmd = RankCommand::new(store);
    let options = RankOptions {
        json,
        quiet,
        tables,
        tags,
        limit: limit.unwrap_or(DEFAULT_LIMIT),
    };

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_plan(
    options: PlanOptions,
    data_dir: PathBuf,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = FileItemStore::with_dir(data_dir)?;
    let cmd = PlanCommand::new(store, config.session);

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), options.json, options.quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_progress(
    json: bool,
    quiet: bool,
    data_dir: PathBuf,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = FileProgressionStore::with_dir(data_dir)?;
    let cmd = ProgressCommand::new(store, config.milestones.evaluator());

    let output = cmd.run(&ProgressOptions { json, quiet });
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

fn run_rewards(
    limit: Option<usize>,
    sessions: bool,
    json: bool,
    quiet: bool,
    data_dir: PathBuf,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = FileProgressionStore::with_dir(data_dir)?;
    let cmd = RewardsCommand::new(store);
    let options = RewardsOptions {
        json,
        quiet,
        limit: limit.unwrap_or(DEFAULT_LIMIT),
        sessions,
    };

    let output = cmd.run(&options);
    print_output(&output, || output.format_text(), json, quiet)?;

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
