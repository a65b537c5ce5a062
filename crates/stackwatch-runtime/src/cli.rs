//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use stackwatch_journal::scanner::DEFAULT_RETENTION_DAYS;

use crate::update::DEFAULT_UPDATE_TIMEOUT_SECS;

#[derive(Parser)]
#[command(
    name = "stackwatch",
    version,
    about = "Massacre mission stack tracker for Elite Dangerous"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render the current massacre stacks once and exit
    Stacks(StacksOpts),
    /// Live table that refreshes as the journal grows
    Watch(WatchOpts),
    /// Machine-readable aggregate output (JSON schema v1)
    Json(JsonOpts),
}

#[derive(Args, Clone)]
pub struct JournalOpts {
    /// Journal directory (default: the game's saved-games location)
    #[arg(long, default_value_os_t = default_journal_dir())]
    pub journal_dir: PathBuf,

    /// How many days of journal history to scan
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: i64,
}

impl Default for JournalOpts {
    fn default() -> Self {
        Self {
            journal_dir: default_journal_dir(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Args, Clone)]
pub struct DisplayOpts {
    /// Hide the delta column
    #[arg(long)]
    pub no_delta_column: bool,

    /// Hide the Sum row
    #[arg(long)]
    pub no_sum_row: bool,

    /// Hide the ratio and reward-per-kill summary row
    #[arg(long)]
    pub no_summary_row: bool,

    /// Color output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

impl Default for DisplayOpts {
    fn default() -> Self {
        Self {
            no_delta_column: false,
            no_sum_row: false,
            no_summary_row: false,
            color: "auto".to_string(),
        }
    }
}

#[derive(Args, Clone)]
pub struct StacksOpts {
    #[command(flatten)]
    pub journal: JournalOpts,

    #[command(flatten)]
    pub display: DisplayOpts,

    /// Skip the release check
    #[arg(long)]
    pub no_check_updates: bool,

    /// Timeout for the release check, in seconds
    #[arg(long, default_value_t = DEFAULT_UPDATE_TIMEOUT_SECS)]
    pub update_timeout_secs: u64,
}

impl Default for StacksOpts {
    fn default() -> Self {
        Self {
            journal: JournalOpts::default(),
            display: DisplayOpts::default(),
            no_check_updates: false,
            update_timeout_secs: DEFAULT_UPDATE_TIMEOUT_SECS,
        }
    }
}

#[derive(Args, Clone)]
pub struct WatchOpts {
    #[command(flatten)]
    pub journal: JournalOpts,

    #[command(flatten)]
    pub display: DisplayOpts,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Skip the release check
    #[arg(long)]
    pub no_check_updates: bool,

    /// Timeout for the release check, in seconds
    #[arg(long, default_value_t = DEFAULT_UPDATE_TIMEOUT_SECS)]
    pub update_timeout_secs: u64,
}

#[derive(Args, Clone)]
pub struct JsonOpts {
    #[command(flatten)]
    pub journal: JournalOpts,
}

/// Default journal directory.
///
/// `STACKWATCH_JOURNAL_DIR` wins when set; otherwise the game's
/// saved-games folder when it exists, falling back to the current
/// directory.
pub fn default_journal_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STACKWATCH_JOURNAL_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("USERPROFILE").or_else(|_| std::env::var("HOME"));
    if let Ok(home) = home {
        let saved = PathBuf::from(home)
            .join("Saved Games")
            .join("Frontier Developments")
            .join("Elite Dangerous");
        if saved.is_dir() {
            return saved;
        }
    }
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn stacks_flags_parse() {
        let cli = Cli::parse_from([
            "stackwatch",
            "stacks",
            "--no-delta-column",
            "--retention-days",
            "7",
        ]);
        let Some(Command::Stacks(opts)) = cli.command else {
            panic!("expected stacks subcommand");
        };
        assert!(opts.display.no_delta_column);
        assert!(!opts.display.no_sum_row);
        assert_eq!(opts.journal.retention_days, 7);
        assert!(!opts.no_check_updates);
    }

    #[test]
    fn watch_interval_parses() {
        let cli = Cli::parse_from(["stackwatch", "watch", "--interval-ms", "250"]);
        let Some(Command::Watch(opts)) = cli.command else {
            panic!("expected watch subcommand");
        };
        assert_eq!(opts.interval_ms, 250);
        assert_eq!(opts.update_timeout_secs, DEFAULT_UPDATE_TIMEOUT_SECS);
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["stackwatch"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn stacks_default_matches_clap_defaults() {
        let cli = Cli::parse_from(["stackwatch", "stacks"]);
        let Some(Command::Stacks(parsed)) = cli.command else {
            panic!("expected stacks subcommand");
        };
        let built = StacksOpts::default();
        assert_eq!(parsed.journal.retention_days, built.journal.retention_days);
        assert_eq!(parsed.display.color, built.display.color);
        assert_eq!(parsed.update_timeout_secs, built.update_timeout_secs);
    }
}
