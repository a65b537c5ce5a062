use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Mission Records ──────────────────────────────────────────────

/// Mission identifier assigned by the game journal.
pub type MissionId = u64;

/// A mission as stored in the repository, decoded from a journal
/// `MissionAccepted` record.
///
/// Only the identity fields are guaranteed: non-massacre missions
/// legitimately omit target faction, target type, destination system,
/// kill count, or reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub mission_id: MissionId,
    /// Internal mission name, e.g. `Mission_Massacre_Wing`.
    pub name: String,
    /// Faction that issued the mission.
    pub source_faction: String,
    pub target_faction: Option<String>,
    pub target_type: Option<String>,
    pub target_system: Option<String>,
    pub kill_count: Option<u32>,
    pub reward: Option<u64>,
    #[serde(default)]
    pub wing: bool,
    pub accepted_at: DateTime<Utc>,
}

/// Projection of a [`Mission`] with every aggregation-relevant field
/// resolved. Missions that fail their domain projection have no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub mission_id: MissionId,
    pub source_faction: String,
    pub target_faction: String,
    pub target_type: String,
    pub target_system: String,
    pub kill_count: u32,
    pub reward: u64,
    pub wing: bool,
}

/// Massacre domain projection: ship-based massacre kill contracts.
///
/// A mission qualifies when its internal name carries the massacre prefix,
/// is not an on-foot variant, and names a non-empty target type. A
/// qualifying mission missing its target faction, destination system, or
/// kill count cannot be stacked and yields no record either; a missing
/// reward is treated as zero.
pub fn massacre_record(mission: &Mission) -> Option<MissionRecord> {
    if !mission.name.starts_with("Mission_Massacre") || mission.name.contains("OnFoot") {
        return None;
    }
    let target_type = mission.target_type.as_deref().filter(|t| !t.is_empty())?;

    Some(MissionRecord {
        mission_id: mission.mission_id,
        source_faction: mission.source_faction.clone(),
        target_faction: mission.target_faction.clone()?,
        target_type: target_type.to_owned(),
        target_system: mission.target_system.clone()?,
        kill_count: mission.kill_count?,
        reward: mission.reward.unwrap_or(0),
        wing: mission.wing,
    })
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackwatchError {
    /// No mission history exists for the named commander.
    MissingCommanderContext { commander: String },
    /// A snapshot or removal referenced an id absent from the store.
    UnknownMissionId { mission_id: MissionId },
    /// A recognized journal record failed to decode.
    MalformedEvent(String),
    /// The active set diverged from the mission store. A defect, never
    /// reachable through the public repository operations.
    InvariantViolation(String),
}

impl fmt::Display for StackwatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCommanderContext { commander } => {
                write!(f, "no mission history for commander {commander}")
            }
            Self::UnknownMissionId { mission_id } => {
                write!(f, "mission {mission_id} not found in store")
            }
            Self::MalformedEvent(msg) => write!(f, "malformed journal event: {msg}"),
            Self::InvariantViolation(msg) => {
                write!(f, "active set diverged from mission store: {msg}")
            }
        }
    }
}

impl std::error::Error for StackwatchError {}

// ─── Tests ────────────────────────────────────────────────────────
