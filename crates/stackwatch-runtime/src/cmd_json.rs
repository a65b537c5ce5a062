//! `stackwatch json` — machine-readable aggregate output.

use chrono::{DateTime, SecondsFormat, Utc};

use stackwatch_core::aggregate::AggregateView;

use crate::bootstrap::Session;
use crate::cli::JsonOpts;

/// Build the full JSON schema v1 output.
pub(crate) fn build_json_v1(
    view: &AggregateView,
    commander: Option<&str>,
    generated_at: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "version": 1,
        "generated_at": generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "commander": commander,
        "aggregate": view,
    })
}

/// Entry point for `stackwatch json`.
pub async fn cmd_json(opts: JsonOpts) -> anyhow::Result<()> {
    let session =
        Session::bootstrap(&opts.journal.journal_dir, opts.journal.retention_days).await?;

    let output = build_json_v1(&session.view(), session.commander(), Utc::now());
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
