//! stackwatch-repository: Owned mission state with snapshot reconciliation.
//! Holds the per-commander mission store and the live active set, patches
//! both from journal events, and pushes change notifications to explicit
//! subscribers.

pub mod repository;

pub use repository::{MissionRepository, Readiness, SubscriptionId};
