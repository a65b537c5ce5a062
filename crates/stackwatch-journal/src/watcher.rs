//! Live journal tail: follows one journal file across appends and
//! rotation, yielding complete lines only.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Follows one journal file by byte offset.
///
/// Reads normally begin at the end of the file as found at construction;
/// history is the scanner's job. Partial trailing lines are buffered
/// until their newline arrives. A change of inode at the same path means
/// the file was replaced, which resets the offset to zero.
#[derive(Debug)]
pub struct JournalTail {
    path: PathBuf,
    offset: u64,
    inode: Option<u64>,
    partial: String,
}

impl JournalTail {
    /// Tail `path` starting at its current end.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_owned(),
            offset: metadata.len(),
            inode: inode_of(&metadata),
            partial: String::new(),
        })
    }

    /// Tail `path` from the beginning, replaying everything already
    /// written. Used when a new session file appears so its opening
    /// commander and snapshot records are not missed.
    pub fn from_start(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_owned(),
            offset: 0,
            inode: inode_of(&metadata),
            partial: String::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Complete lines appended since the last poll.
    ///
    /// On error the offset is left unadvanced, so a later poll retries
    /// the same byte range once the file is readable again.
    pub fn poll_new_lines(&mut self) -> std::io::Result<Vec<String>> {
        let metadata = std::fs::metadata(&self.path)?;
        let inode = inode_of(&metadata);
        if self.inode.is_some() && inode != self.inode {
            debug!(path = %self.path.display(), "journal file replaced, restarting from zero");
            self.offset = 0;
            self.partial.clear();
            self.inode = inode;
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = String::new();
        file.read_to_string(&mut chunk)?;
        self.offset = file.stream_position()?;

        self.partial.push_str(&chunk);
        let mut lines = Vec::new();
        while let Some(newline) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_owned());
            }
        }
        Ok(lines)
    }
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn inode_of(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

// ─── Tests ────────────────────────────────────────────────────────
