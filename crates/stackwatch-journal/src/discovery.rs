//! Journal file discovery: which files exist, which fall inside the
//! retention window, and which one is the live session.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::error::JournalError;

/// File name pattern of the game's session journals.
const JOURNAL_PATTERN: &str = "Journal.*.log";

/// List journal files in `dir`, sorted by name.
///
/// A missing directory is an empty listing, not an error: the game may
/// simply never have run on this machine.
pub fn list_journal_files(dir: &Path) -> Result<Vec<PathBuf>, JournalError> {
    let pattern = glob::Pattern::new(JOURNAL_PATTERN)?;

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "journal directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if pattern.matches(name) && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Journal files modified within the last `retention_days` before `now`,
/// ordered oldest first so later files overwrite earlier records.
pub fn files_within_retention(
    dir: &Path,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>, JournalError> {
    let cutoff = now - Duration::days(retention_days);

    let mut dated: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
    for path in list_journal_files(dir)? {
        match modified_at(&path) {
            Ok(mtime) if mtime >= cutoff => dated.push((mtime, path)),
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat journal file, skipping");
            }
        }
    }
    dated.sort();
    Ok(dated.into_iter().map(|(_, path)| path).collect())
}

/// The journal file with the newest modification time: the live session.
pub fn find_latest(dir: &Path) -> Result<Option<PathBuf>, JournalError> {
    let latest = list_journal_files(dir)?
        .into_iter()
        .filter_map(|path| modified_at(&path).ok().map(|mtime| (mtime, path)))
        .max_by_key(|&(mtime, _)| mtime);
    Ok(latest.map(|(_, path)| path))
}

fn modified_at(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

// ─── Tests ────────────────────────────────────────────────────────
