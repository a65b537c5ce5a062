//! stackwatch-journal: Journal source adapter.
//! Discovers the game's journal files, scans the retention window into a
//! per-commander mission history, and tails the newest file for live
//! events.

pub mod discovery;
pub mod error;
pub mod scanner;
pub mod translate;
pub mod watcher;

pub use error::JournalError;
