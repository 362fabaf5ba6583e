use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskdeck_shared::{TaskPriority, due_date_serde};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::coalescer::Completion;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "Taskdeck: terminal client for a remote task store"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rcfile", global = true)]
    pub rcfile: Option<PathBuf>,

    /// Base address of the task store.
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List tasks, optionally filtered.
    List(ListArgs),
    /// Show one task.
    Show { id: String },
    /// Create a task.
    Add(AddArgs),
    /// Change fields of a task.
    Edit(EditArgs),
    /// Mark a task completed.
    Done { id: String },
    /// Mark a task pending again.
    Undo { id: String },
    /// Flip a task's completion flag.
    Toggle { id: String },
    /// Delete a task.
    Delete { id: String },
    /// Show completion statistics.
    Stats,
    /// Interactive session with live filtering.
    Browse,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short = 's', long)]
    pub search: Option<String>,

    #[arg(short = 'p', long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,

    #[arg(short = 'c', long)]
    pub category: Option<String>,

    #[arg(long, default_value = "all", value_parser = parse_completion)]
    pub status: Completion,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(short = 'p', long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,

    #[arg(short = 'c', long)]
    pub category: Option<String>,

    #[arg(long, value_parser = parse_due)]
    pub due: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(short = 't', long)]
    pub title: Option<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(short = 'p', long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,

    #[arg(short = 'c', long)]
    pub category: Option<String>,

    #[arg(long, value_parser = parse_due)]
    pub due: Option<NaiveDate>,
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    s.parse::<TaskPriority>().map_err(|e| e.to_string())
}

fn parse_completion(s: &str) -> Result<Completion, String> {
    s.parse::<Completion>().map_err(|e| e.to_string())
}

fn parse_due(s: &str) -> Result<NaiveDate, String> {
    due_date_serde::parse(s).ok_or_else(|| format!("expected YYYY-MM-DD, got: {s}"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
