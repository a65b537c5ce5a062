//! Table rendering for the stacks view. Pure string builders so every
//! layout detail is testable without a terminal.

use stackwatch_core::aggregate::{AggregateView, StackSummary};

use crate::cli::DisplayOpts;
use crate::update::DOWNLOAD_URL;

/// Which table parts to draw.
#[derive(Clone)]
pub struct RenderOptions {
    pub delta_column: bool,
    pub sum_row: bool,
    pub summary_row: bool,
    pub use_color: bool,
}

impl RenderOptions {
    pub fn from_display(opts: &DisplayOpts) -> Self {
        Self {
            delta_column: !opts.no_delta_column,
            sum_row: !opts.no_sum_row,
            summary_row: !opts.no_summary_row,
            use_color: resolve_color(&opts.color),
        }
    }
}

/// Resolve --color flag to bool.
pub fn resolve_color(color: &str) -> bool {
    use std::io::IsTerminal;
    match color {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    }
}

/// Render an aggregate view to a printable block.
pub fn format_view(view: &AggregateView, opts: &RenderOptions) -> String {
    match view {
        AggregateView::AwaitingData => format_awaiting_data(opts.use_color),
        AggregateView::NoMatchingMissions => {
            "stackwatch is ready. No massacre missions accepted yet.".to_string()
        }
        AggregateView::Stacks(summary) => format_stacks(summary, opts),
    }
}

fn format_awaiting_data(use_color: bool) -> String {
    let text = "Missing active mission data.\nIf you are in game, go to the main menu and come back.";
    if use_color {
        format!("\x1b[33m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

// ── Stacks table ────────────────────────────────────────────────────────────

fn format_stacks(summary: &StackSummary, opts: &RenderOptions) -> String {
    let header = ["Faction", "Kills", "Reward (Wing)", "Delta"].map(str::to_string);

    let rows: Vec<[String; 4]> = summary
        .stacks
        .iter()
        .map(|stack| {
            [
                stack.key.source_faction.clone(),
                stack.kill_count.to_string(),
                format_reward_pair(stack.reward, stack.shareable_reward),
                stack.delta.to_string(),
            ]
        })
        .collect();

    let sum_row = [
        "Sum".to_string(),
        summary.stack_height.to_string(),
        format_reward_pair(summary.total_reward, summary.shareable_reward),
        String::new(),
    ];

    let mut widths = [0usize; 4];
    for row in std::iter::once(&header)
        .chain(rows.iter())
        .chain(opts.sum_row.then_some(&sum_row))
    {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let cols = if opts.delta_column { 4 } else { 3 };

    let mut out = String::new();
    push_line(&mut out, &render_cells(&header, &widths, cols), "\x1b[1m", opts.use_color);

    for row in &rows {
        out.push_str(&render_cells(row, &widths, cols));
        out.push('\n');
    }

    if opts.sum_row {
        push_line(&mut out, &render_cells(&sum_row, &widths, cols), "\x1b[32m", opts.use_color);
    }

    if opts.summary_row {
        push_line(&mut out, &format_summary_row(summary), "\x1b[32m", opts.use_color);
    }

    for warning in &summary.warnings {
        push_line(&mut out, &warning.to_string(), "\x1b[1;33m", opts.use_color);
    }

    while out.ends_with('\n') {
        out.pop();
    }
    out
}

fn push_line(out: &mut String, line: &str, ansi: &str, use_color: bool) {
    if use_color {
        out.push_str(&format!("{ansi}{line}\x1b[0m\n"));
    } else {
        out.push_str(line);
        out.push('\n');
    }
}

fn render_cells(cells: &[String; 4], widths: &[usize; 4], cols: usize) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().take(cols).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(&format!("{cell:<width$}", width = widths[i]));
    }
    line.trim_end().to_string()
}

/// Rewards print in millions of credits with one decimal: "3.0 (2.0)".
fn format_reward_pair(reward: u64, shareable: u64) -> String {
    format!(
        "{} ({})",
        format_millions_1(reward),
        format_millions_1(shareable)
    )
}

fn format_millions_1(credits: u64) -> String {
    format!("{:.1}", credits as f64 / 1_000_000.0)
}

/// "Ratio: 1.60, Reward: 0.20 (0.10) M CR/Kill. 32 Kills."
fn format_summary_row(summary: &StackSummary) -> String {
    let height = f64::from(summary.stack_height.max(1));
    let ratio = f64::from(summary.total_kills) / height;
    let reward_per_kill = summary.total_reward as f64 / 1_000_000.0 / height;
    let wing_per_kill = summary.shareable_reward as f64 / 1_000_000.0 / height;
    format!(
        "Ratio: {ratio:.2}, Reward: {reward_per_kill:.2} ({wing_per_kill:.2}) M CR/Kill. {} Kills.",
        summary.total_kills
    )
}

/// Footer line for an available update.
pub fn format_update_notice(use_color: bool) -> String {
    let text = format!("A newer release is available: {DOWNLOAD_URL}");
    if use_color {
        format!("\x1b[1;33m{text}\x1b[0m")
    } else {
        text
    }
}
