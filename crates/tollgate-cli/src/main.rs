//! Tollgate pre-tool-use hook
//!
//! Usage:
//!   tollgate                               Check the call in CLAUDE_TOOL_NAME/CLAUDE_TOOL_INPUT
//!                                          (or a hook event on stdin)
//!   tollgate --tool Read --input '{...}'   Check an explicit call
//!   tollgate ledger [--run-id ID]          Print a run's read budget ledger
//!
//! Exit status is 0 when the call may proceed and 2 when it is blocked, with
//! the reason on stderr.

mod hook;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tollgate::ledger::{LedgerRecord, LedgerStore};
use tollgate::{Evaluator, ReadLimits, Settings, ToolAction};

use crate::hook::{HookRequest, TOOL_INPUT_VAR, TOOL_NAME_VAR};

/// Exit status for a blocked tool call.
const BLOCKED_EXIT: u8 = 2;

/// Filter directive variable for log output
const LOG_VAR: &str = "TOLLGATE_LOG";

/// Tollgate - guard agent tool calls against read budgets and workflow phases
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "Pre-tool-use guard for agent file reads and writes")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Tool name (defaults to $CLAUDE_TOOL_NAME)
    #[arg(long)]
    tool: Option<String>,

    /// Tool input as JSON (defaults to $CLAUDE_TOOL_INPUT)
    #[arg(long)]
    input: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the read budget ledger for a run as JSON
    ///
    /// The record is never modified, but the state directory and the run's
    /// lock file are created if missing.
    Ledger {
        /// Run id (defaults to $RUN_ID)
        #[arg(long)]
        run_id: Option<String>,

        /// State directory (defaults to $READ_BUDGET_STATE_DIR)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct LedgerReport {
    state_file: PathBuf,
    limits: ReadLimits,
    #[serde(flatten)]
    record: LedgerRecord,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for `ledger` output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    match args.command {
        Some(Command::Ledger { run_id, state_dir }) => {
            match print_ledger(settings, run_id, state_dir) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("tollgate: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
        None => check(settings, args.tool, args.input),
    }
}

fn check(settings: Settings, tool: Option<String>, input: Option<String>) -> ExitCode {
    let tool = tool.or_else(|| std::env::var(TOOL_NAME_VAR).ok());
    let input = input.or_else(|| std::env::var(TOOL_INPUT_VAR).ok());
    let request = HookRequest::resolve(tool, input, io::stdin().lock());

    let action = ToolAction::parse(&request.tool_name, &request.input, &settings.working_dir);
    let verdict = Evaluator::standard().evaluate(&action, &settings);

    match verdict.denial_reason() {
        None => ExitCode::SUCCESS,
        Some(reason) => {
            eprintln!("{reason}");
            ExitCode::from(BLOCKED_EXIT)
        }
    }
}

fn print_ledger(
    settings: Settings,
    run_id: Option<String>,
    state_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let run_id = run_id.unwrap_or(settings.run_id);
    let state_dir = state_dir.unwrap_or(settings.state_dir);
    let store = LedgerStore::new(state_dir, settings.lock_timeout);

    let record = store
        .load(&run_id)
        .with_context(|| format!("failed to load ledger for run '{run_id}'"))?;
    let report = LedgerReport {
        state_file: store.record_path(&run_id),
        limits: settings.limits,
        record,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
