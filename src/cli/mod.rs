pub mod calendar;
pub mod mail;
pub mod output;
pub mod relay;

use clap::{Parser, Subcommand, ValueEnum};

/// School communication CLI: mail, calendar, and platform messages
#[derive(Parser, Debug)]
#[command(name = "schoolcomm")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send mail over SMTP
    Mail(mail::MailCommand),

    /// Calendar operations against Microsoft Graph
    Calendar(calendar::CalendarCommand),

    /// Relay messages through the school platform
    Relay(relay::RelayCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// JSON output (best for scripts and agents)
    Json,
    /// Table output (best for humans)
    #[default]
    Table,
    /// Plain output (minimal, for piping)
    Plain,
}
