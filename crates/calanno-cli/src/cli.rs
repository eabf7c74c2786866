//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// calanno - Google Calendar annotations for your dashboards
#[derive(Debug, Parser)]
#[command(name = "calanno")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the instance settings file
    #[arg(long, short, env = "CALANNO_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Enable debug output
    #[arg(long = "debug", short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to Google Calendar
    Auth {
        /// Discard stored tokens and sign in again
        #[arg(long, short)]
        force: bool,
    },

    /// Check that the instance can reach the calendar API
    Test,

    /// Fetch annotation records from a calendar
    Query(QueryArgs),

    /// Settings commands
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

/// Arguments for the query command.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Calendar to query; without it the query resolves
    /// to an empty record set
    #[arg(long)]
    pub calendar_id: Option<String>,

    /// Range start: RFC 3339, YYYY-MM-DD, now, or now+/-<n><unit>
    /// with units s, m, h, d, w
    #[arg(long, default_value = "now-24h")]
    pub from: String,

    /// Range end, same formats as --from
    #[arg(long, default_value = "now")]
    pub to: String,

    /// Annotation name echoed into every record
    #[arg(long)]
    pub name: Option<String>,

    /// Print records as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Settings actions.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the resolved settings with secrets omitted
    Show,

    /// Validate the settings file
    Validate,

    /// Show the settings file path
    Path,
}
