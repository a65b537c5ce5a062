//! Startup wiring shared by every command: scan journal history on the
//! blocking pool, load the store, then replay and keep tailing the
//! newest journal file.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use stackwatch_core::aggregate::{AggregateView, aggregate_massacres};
use stackwatch_core::event::JournalEvent;
use stackwatch_core::types::StackwatchError;
use stackwatch_journal::discovery::find_latest;
use stackwatch_journal::scanner::spawn_scan;
use stackwatch_journal::translate::{LineItem, classify_line};
use stackwatch_journal::watcher::JournalTail;
use stackwatch_repository::MissionRepository;

/// A bootstrapped tracking session: the repository plus the live tail
/// feeding it.
pub struct Session {
    pub repo: MissionRepository,
    journal_dir: PathBuf,
    tail: Option<JournalTail>,
    commander: Option<String>,
}

impl Session {
    /// Scan history, load the store, then replay the newest journal file
    /// from its first line so the current commander identity and mission
    /// snapshot are picked up.
    pub async fn bootstrap(journal_dir: &Path, retention_days: i64) -> anyhow::Result<Self> {
        let scan = spawn_scan(journal_dir.to_path_buf(), retention_days);

        let mut session = Session {
            repo: MissionRepository::new(),
            journal_dir: journal_dir.to_path_buf(),
            tail: None,
            commander: None,
        };

        let index = scan.await??;
        info!(commanders = index.len(), "mission history loaded");
        session.repo.initialize_store(index);

        match find_latest(journal_dir)? {
            Some(path) => {
                debug!(path = %path.display(), "replaying newest journal file");
                let mut tail = JournalTail::from_start(&path)?;
                let lines = tail.poll_new_lines()?;
                for line in &lines {
                    session.apply_line(line)?;
                }
                session.tail = Some(tail);
            }
            None => {
                info!(path = %journal_dir.display(), "no journal files found");
            }
        }

        debug!(readiness = %session.repo.readiness(), "bootstrap complete");
        Ok(session)
    }

    /// Drain any new journal lines into the repository. Returns how many
    /// lines were applied.
    ///
    /// Tail read failures (the file rotated away mid-poll, a torn append)
    /// degrade to an empty batch: the tail's offset stays unadvanced, so
    /// the next poll retries the same range. The only error out of here
    /// is a repository invariant breach.
    pub fn pump(&mut self) -> Result<usize, StackwatchError> {
        let Some(tail) = self.tail.as_mut() else {
            return Ok(0);
        };
        let lines = match tail.poll_new_lines() {
            Ok(lines) => lines,
            Err(e) => {
                warn!(
                    path = %tail.path().display(),
                    error = %e,
                    "journal tail read failed, retrying next poll"
                );
                return Ok(0);
            }
        };
        for line in &lines {
            self.apply_line(line)?;
        }
        Ok(lines.len())
    }

    /// Re-check which journal file is newest. A new session file replaces
    /// the tail and is read from its first line on the next pump.
    /// Discovery failures leave the current tail in place.
    pub fn refresh_tail(&mut self) {
        let latest = match find_latest(&self.journal_dir) {
            Ok(Some(latest)) => latest,
            Ok(None) => return,
            Err(e) => {
                warn!(
                    path = %self.journal_dir.display(),
                    error = %e,
                    "journal discovery failed, keeping current tail"
                );
                return;
            }
        };
        if self.tail.as_ref().is_some_and(|t| t.path() == latest) {
            return;
        }
        match JournalTail::from_start(&latest) {
            Ok(tail) => {
                info!(path = %latest.display(), "following new journal file");
                self.tail = Some(tail);
            }
            Err(e) => {
                warn!(
                    path = %latest.display(),
                    error = %e,
                    "cannot follow new journal file, keeping current tail"
                );
            }
        }
    }

    /// The commander identity from the journal stream, if seen yet.
    pub fn commander(&self) -> Option<&str> {
        self.commander.as_deref()
    }

    /// Aggregate the current active set into the massacre stack view.
    pub fn view(&self) -> AggregateView {
        aggregate_massacres(self.repo.active_missions())
    }

    fn apply_line(&mut self, line: &str) -> Result<(), StackwatchError> {
        let Some(item) = classify_line(line) else {
            return Ok(());
        };
        match item {
            LineItem::Commander(name) => {
                debug!(commander = %name, "commander identity");
                self.commander = Some(name);
            }
            LineItem::Event(event) => {
                let Some(cmdr) = self.commander.clone() else {
                    warn!("mission event before any commander record, skipping");
                    return Ok(());
                };
                match event {
                    JournalEvent::Snapshot { active_ids } => {
                        self.repo.apply_active_snapshot(&cmdr, &active_ids)?;
                    }
                    JournalEvent::Accepted(mission) => {
                        self.repo.accept_mission(&cmdr, mission)?;
                    }
                    JournalEvent::Completed { mission_id }
                    | JournalEvent::Failed { mission_id }
                    | JournalEvent::Abandoned { mission_id } => {
                        self.repo.remove_mission(&cmdr, mission_id)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;

    use stackwatch_repository::Readiness;

    fn temp_journal_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "stackwatch-boot-{tag}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn write_journal(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("create journal file");
        for line in lines {
            writeln!(file, "{line}").expect("write journal line");
        }
        path
    }

    fn append_journal(path: &Path, lines: &[String]) {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(path)
            .expect("open journal file");
        for line in lines {
            writeln!(file, "{line}").expect("append journal line");
        }
    }

    fn commander_line(name: &str) -> String {
        format!(
            r#"{{"timestamp":"2026-01-02T03:04:05Z","event":"Commander","FID":"F7201","Name":"{name}"}}"#
        )
    }

    fn accepted_line(id: u64, faction: &str, kills: u32, reward: u64) -> String {
        format!(
            concat!(
                r#"{{"timestamp":"2026-01-02T03:04:05Z","event":"MissionAccepted","#,
                r#""Faction":"{}","Name":"Mission_Massacre","MissionID":{},"#,
                r#""TargetFaction":"Crimson Raiders","TargetType":"$MissionUtil_FactionTag_Pirate;","#,
                r#""DestinationSystem":"HIP 20277","KillCount":{},"Reward":{},"Wing":false}}"#
            ),
            faction, id, kills, reward
        )
    }

    fn snapshot_line(ids: &[u64]) -> String {
        let stubs: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"MissionID":{id},"Name":"Mission_Massacre","Expires":82800}}"#))
            .collect();
        format!(
            r#"{{"timestamp":"2026-01-02T03:04:05Z","event":"Missions","Active":[{}],"Failed":[],"Complete":[]}}"#,
            stubs.join(",")
        )
    }

    fn completed_line(id: u64) -> String {
        format!(
            r#"{{"timestamp":"2026-01-02T03:04:05Z","event":"MissionCompleted","MissionID":{id}}}"#
        )
    }

    // ── 1. empty directory bootstraps to awaiting data ──

    #[tokio::test]
    async fn bootstrap_empty_dir_awaits_snapshot() {
        let dir = temp_journal_dir("empty");

        let session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.repo.readiness(), Readiness::PartiallyInitialized);
        assert_eq!(session.view(), AggregateView::AwaitingData);
        assert_eq!(session.commander(), None);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── 2. newest file replay yields a live view ──

    #[tokio::test]
    async fn bootstrap_replays_newest_file() {
        let dir = temp_journal_dir("replay");
        write_journal(
            &dir,
            "Journal.2026-01-02T030405.01.log",
            &[
                commander_line("JONES"),
                accepted_line(101, "Blue Brotherhood", 12, 1_000_000),
                accepted_line(102, "Red Ring", 8, 800_000),
                snapshot_line(&[101, 102]),
            ],
        );

        let session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.commander(), Some("JONES"));
        assert_eq!(session.repo.readiness(), Readiness::Initialized);
        assert_eq!(session.repo.active_count(), 2);

        let AggregateView::Stacks(summary) = session.view() else {
            panic!("expected stacks view");
        };
        assert_eq!(summary.stack_height, 12);
        assert_eq!(summary.total_kills, 20);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── 3. pump applies appended lines ──

    #[tokio::test]
    async fn pump_applies_appended_lines() {
        let dir = temp_journal_dir("pump");
        let path = write_journal(
            &dir,
            "Journal.2026-01-02T030405.01.log",
            &[
                commander_line("JONES"),
                accepted_line(101, "Blue Brotherhood", 12, 1_000_000),
                accepted_line(102, "Red Ring", 8, 800_000),
                snapshot_line(&[101, 102]),
            ],
        );

        let mut session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.repo.active_count(), 2);

        append_journal(&path, &[completed_line(101)]);
        let applied = session.pump().expect("pump");
        assert_eq!(applied, 1);
        assert_eq!(session.repo.active_count(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── 4. events before any commander record are skipped ──

    #[tokio::test]
    async fn events_before_commander_are_skipped() {
        let dir = temp_journal_dir("precmdr");
        write_journal(
            &dir,
            "Journal.2026-01-02T030405.01.log",
            &[snapshot_line(&[101]), commander_line("JONES")],
        );

        let session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.commander(), Some("JONES"));
        assert_eq!(session.view(), AggregateView::AwaitingData);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── 5. refresh_tail follows a new session file ──

    #[tokio::test]
    async fn refresh_tail_switches_to_new_session_file() {
        let dir = temp_journal_dir("rotate");
        // ALEX played earlier, so history scan gives them a store bucket.
        write_journal(
            &dir,
            "Journal.2026-01-01T080000.01.log",
            &[
                commander_line("ALEX"),
                accepted_line(201, "Blue Brotherhood", 10, 900_000),
            ],
        );
        std::thread::sleep(std::time::Duration::from_millis(20));
        write_journal(
            &dir,
            "Journal.2026-01-02T030405.01.log",
            &[commander_line("JONES"), snapshot_line(&[])],
        );

        let mut session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.commander(), Some("JONES"));

        std::thread::sleep(std::time::Duration::from_millis(20));
        write_journal(
            &dir,
            "Journal.2026-01-03T091500.01.log",
            &[commander_line("ALEX"), snapshot_line(&[201])],
        );

        session.refresh_tail();
        session.pump().expect("pump");
        assert_eq!(session.commander(), Some("ALEX"));
        assert_eq!(session.repo.commander(), Some("ALEX"));
        assert_eq!(session.repo.active_count(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── 6. pump with no journal file is a no-op ──

    #[tokio::test]
    async fn pump_without_tail_is_noop() {
        let dir = temp_journal_dir("notail");

        let mut session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.pump().expect("pump"), 0);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── 7. tail read failures degrade instead of ending the session ──

    #[tokio::test]
    async fn pump_survives_tail_read_failure() {
        let dir = temp_journal_dir("degrade");
        let path = write_journal(
            &dir,
            "Journal.2026-01-02T030405.01.log",
            &[
                commander_line("JONES"),
                accepted_line(101, "Blue Brotherhood", 12, 1_000_000),
                accepted_line(102, "Red Ring", 8, 800_000),
                snapshot_line(&[101, 102]),
            ],
        );

        let mut session = Session::bootstrap(&dir, 14).await.expect("bootstrap");
        assert_eq!(session.repo.active_count(), 2);

        // The tailed file vanishes mid-session: polls keep returning
        // empty batches instead of erroring out. Holding the removed
        // file open pins its inode so the filesystem cannot hand the
        // same number to the replacement below.
        let pin = fs::File::open(&path).expect("pin original inode");
        fs::remove_file(&path).expect("remove journal");
        assert_eq!(session.pump().expect("degrades"), 0);
        assert_eq!(session.pump().expect("still degrades"), 0);

        // The file comes back (new inode, so the tail restarts from
        // zero) and polling picks up where the journal left off.
        write_journal(
            &dir,
            "Journal.2026-01-02T030405.01.log",
            &[completed_line(101)],
        );
        drop(pin);
        assert_eq!(session.pump().expect("recovers"), 1);
        assert_eq!(session.repo.active_count(), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
