//! Historical journal scan: builds the per-commander mission index from
//! the retention window of journal files. Runs on the blocking pool and
//! hands its result back over a oneshot channel.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use stackwatch_core::event::JournalEvent;
use stackwatch_core::types::{Mission, MissionId};

use crate::discovery::files_within_retention;
use crate::error::JournalError;
use crate::translate::{LineItem, classify_line};

/// Per-commander mission history: the repository's initial store payload.
pub type HistoricalIndex = HashMap<String, HashMap<MissionId, Mission>>;

/// Default retention window for the historical scan, in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 14;

/// Scan all journal files modified within the retention window, oldest
/// first, collecting accepted missions per commander.
///
/// Commander context resets at each file boundary. Every commander seen
/// gets an index entry even when no missions follow; a mission accepted
/// before any commander record in its file is dropped with a warning.
/// Later records for the same mission id overwrite earlier ones.
pub fn scan_journal_dir(
    dir: &Path,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<HistoricalIndex, JournalError> {
    let files = files_within_retention(dir, retention_days, now)?;
    debug!(
        files = files.len(),
        path = %dir.display(),
        "scanning journal history"
    );

    let mut index = HistoricalIndex::new();
    for path in &files {
        if let Err(e) = scan_file(path, &mut index) {
            warn!(path = %path.display(), error = %e, "failed to scan journal file, skipping");
        }
    }
    Ok(index)
}

fn scan_file(path: &Path, index: &mut HistoricalIndex) -> std::io::Result<()> {
    let reader = BufReader::new(File::open(path)?);
    let mut commander: Option<String> = None;

    for line in reader.lines() {
        let line = line?;
        match classify_line(&line) {
            Some(LineItem::Commander(name)) => {
                index.entry(name.clone()).or_default();
                commander = Some(name);
            }
            Some(LineItem::Event(JournalEvent::Accepted(mission))) => {
                let Some(cmdr) = commander.as_deref() else {
                    warn!(
                        path = %path.display(),
                        mission_id = mission.mission_id,
                        "mission accepted before any commander record, skipping"
                    );
                    continue;
                };
                index
                    .entry(cmdr.to_owned())
                    .or_default()
                    .insert(mission.mission_id, mission);
            }
            // Snapshots and terminal events are live-stream concerns.
            Some(LineItem::Event(_)) | None => {}
        }
    }
    Ok(())
}

/// Run the scan on the blocking pool; the index comes back through the
/// returned oneshot receiver. The receiver errors only if the scan task
/// is dropped before sending.
pub fn spawn_scan(
    dir: PathBuf,
    retention_days: i64,
) -> oneshot::Receiver<Result<HistoricalIndex, JournalError>> {
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let result = scan_journal_dir(&dir, retention_days, Utc::now());
        if tx.send(result).is_err() {
            debug!("scan result receiver dropped");
        }
    });
    rx
}

// ─── Tests ────────────────────────────────────────────────────────
