//! Error types for the journal adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal name pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
