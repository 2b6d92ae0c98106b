//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Work session tracker.
///
/// Records active and idle time on this machine and summarizes it by day,
/// week and session.
#[derive(Debug, Parser)]
#[command(name = "wl", version, about, long_about = None)]
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
    /// Run the tracker in the foreground.
    Run,

    /// Show whether a session is open and since when.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Summarize today.
    Today {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the weekly chart.
    Week {
        /// Weeks relative to the current one (-1 is last week).
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List sessions, newest first.
    Sessions {
        #[command(flatten)]
        paging: Paging,

        /// Include the session still in progress.
        #[arg(long)]
        active: bool,

        /// Only sessions starting on this day (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List days with tracked time, newest first.
    Days {
        #[command(flatten)]
        paging: Paging,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one day's summary and sessions.
    Day {
        /// The day to show (YYYY-MM-DD).
        date: String,

        #[command(flatten)]
        paging: Paging,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Pagination flags shared by listing commands.
#[derive(Debug, Clone, Copy, Args)]
pub struct Paging {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page.
    #[arg(long, default_value_t = 10)]
    pub page_size: u32,
}
