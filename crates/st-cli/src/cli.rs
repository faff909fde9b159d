//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Study time tracker.
///
/// Times study sessions per subject with a 25 minute cap and reports how
/// much was studied per day, week, or month.
#[derive(Debug, Parser)]
#[command(name = "st", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show a summary of stored data.
    Status,

    /// Manage subjects.
    #[command(subcommand)]
    Subjects(SubjectsAction),

    /// Browse recorded study sessions.
    #[command(subcommand)]
    Sessions(SessionsAction),

    /// Show minutes studied per subject.
    Report {
        /// Window to report on: day, week, month, or all.
        #[arg(short, long)]
        window: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run an interactive study timer.
    ///
    /// Reads commands from stdin: start [subject], pause, reset, stop,
    /// status, notes/links/footnote/images <text>, help, quit.
    Timer(TimerArgs),
}

/// Subject subcommands.
#[derive(Debug, Subcommand)]
pub enum SubjectsAction {
    /// Register a subject.
    Add {
        /// Subject name (exact, case-sensitive).
        name: String,
    },

    /// List registered subjects.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Session subcommands.
#[derive(Debug, Subcommand)]
pub enum SessionsAction {
    /// List all sessions, oldest first.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one session in detail.
    Show {
        /// Session number as shown by `st sessions list`.
        number: usize,
    },
}

/// Arguments for the interactive timer.
#[derive(Debug, Args)]
pub struct TimerArgs {
    /// Subject to time.
    pub subject: Option<String>,

    /// Notes for the session.
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Comma-separated links.
    #[arg(long, default_value = "")]
    pub links: String,

    /// A footnote for the session.
    #[arg(long, default_value = "")]
    pub footnote: String,

    /// Comma-separated image URLs.
    #[arg(long, default_value = "")]
    pub images: String,
}
