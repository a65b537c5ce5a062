//! stackwatch-core: Mission records, journal event decoding, and stack
//! aggregation. Pure domain logic shared by the repository, the journal
//! adapter, and the runtime; no I/O, no async.

pub mod aggregate;
pub mod event;
pub mod types;
