//! `stackwatch stacks` — render the current massacre stacks once.

use crate::bootstrap::Session;
use crate::cli::StacksOpts;
use crate::render::{self, RenderOptions};
use crate::update;

/// Entry point for `stackwatch stacks`.
pub async fn cmd_stacks(opts: StacksOpts) -> anyhow::Result<()> {
    let update_rx =
        (!opts.no_check_updates).then(|| update::spawn_update_check(opts.update_timeout_secs));

    let session =
        Session::bootstrap(&opts.journal.journal_dir, opts.journal.retention_days).await?;

    let render_opts = RenderOptions::from_display(&opts.display);
    let view = session.view();
    println!("{}", render::format_view(&view, &render_opts));

    if let Some(rx) = update_rx
        && rx.await.unwrap_or(false)
    {
        println!("\n{}", render::format_update_notice(render_opts.use_color));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::StacksOpts;

    #[test]
    fn stacks_opts_defaults() {
        let opts = StacksOpts::default();
        assert_eq!(opts.journal.retention_days, 14);
        assert_eq!(opts.display.color, "auto");
        assert!(!opts.no_check_updates);
    }
}
