//! `stackwatch watch` — live-refresh stacks table.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::bootstrap::Session;
use crate::cli::WatchOpts;
use crate::render::{self, RenderOptions};
use crate::update;

/// Entry point for `stackwatch watch`.
///
/// Repaints only when the repository notifies a change, so an idle
/// journal leaves the screen alone between polls. Transient journal IO
/// failures are logged and retried on the next tick; only a repository
/// invariant breach ends the loop early.
pub async fn cmd_watch(opts: WatchOpts) -> anyhow::Result<()> {
    let mut update_rx =
        (!opts.no_check_updates).then(|| update::spawn_update_check(opts.update_timeout_secs));

    let mut session =
        Session::bootstrap(&opts.journal.journal_dir, opts.journal.retention_days).await?;
    let render_opts = RenderOptions::from_display(&opts.display);

    let (sub, mut active_rx) = session.repo.subscribe_active();
    let mut outdated = false;
    let mut dirty = true;

    loop {
        session.refresh_tail();
        session.pump()?;
        while active_rx.try_recv().is_ok() {
            dirty = true;
        }

        if let Some(mut rx) = update_rx.take() {
            match rx.try_recv() {
                Ok(result) => {
                    outdated = result;
                    dirty |= result;
                }
                Err(oneshot::error::TryRecvError::Empty) => update_rx = Some(rx),
                Err(oneshot::error::TryRecvError::Closed) => {}
            }
        }

        if dirty {
            // Clear screen + cursor home
            print!("\x1b[2J\x1b[H");
            let view = session.view();
            println!("{}", render::format_view(&view, &render_opts));
            if outdated {
                println!("{}", render::format_update_notice(render_opts.use_color));
            }
            let footer = match session.commander() {
                Some(name) => format!("CMDR {name} \u{2014} Ctrl-C to quit"),
                None => "stackwatch watch \u{2014} Ctrl-C to quit".to_string(),
            };
            if render_opts.use_color {
                println!("\n\x1b[2m{footer}\x1b[0m");
            } else {
                println!("\n{footer}");
            }
            dirty = false;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(opts.interval_ms)) => {}
            _ = tokio::signal::ctrl_c() => { break; }
        }
    }

    session.repo.unsubscribe(sub);
    Ok(())
}
