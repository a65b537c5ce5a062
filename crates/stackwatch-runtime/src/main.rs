//! stackwatch: massacre mission stack tracker.
//! Single binary reading game journals directly; no daemon, no state
//! outside the journal directory.

use clap::Parser;

mod bootstrap;
mod cli;
mod cmd_json;
mod cmd_stacks;
mod cmd_watch;
mod render;
mod update;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("STACKWATCH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Stacks(cli::StacksOpts::default()));

    match command {
        cli::Command::Stacks(opts) => cmd_stacks::cmd_stacks(opts).await?,
        cli::Command::Watch(opts) => cmd_watch::cmd_watch(opts).await?,
        cli::Command::Json(opts) => cmd_json::cmd_json(opts).await?,
    }

    Ok(())
}
