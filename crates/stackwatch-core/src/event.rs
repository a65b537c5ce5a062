//! Journal event decoding: the boundary between free-form journal JSON
//! and the closed event union consumed by the repository. Field access on
//! raw records happens here and nowhere else.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::types::{Mission, MissionId, StackwatchError};

// ─── Event Union ──────────────────────────────────────────────────

/// A journal record relevant to mission tracking.
///
/// Snapshots supersede prior incremental state; the other variants patch
/// the active set between snapshots. Commander identity is not an event:
/// the journal adapter tracks it as line context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEvent {
    /// Point-in-time list of active mission ids (`Missions` record).
    Snapshot { active_ids: Vec<MissionId> },
    /// A newly accepted mission with its full record.
    Accepted(Mission),
    Completed { mission_id: MissionId },
    Failed { mission_id: MissionId },
    Abandoned { mission_id: MissionId },
}

// ─── Raw Records ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MissionAcceptedRecord {
    timestamp: DateTime<Utc>,
    #[serde(rename = "MissionID")]
    mission_id: MissionId,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Faction")]
    faction: String,
    #[serde(rename = "TargetFaction")]
    target_faction: Option<String>,
    #[serde(rename = "TargetType")]
    target_type: Option<String>,
    #[serde(rename = "DestinationSystem")]
    destination_system: Option<String>,
    #[serde(rename = "KillCount")]
    kill_count: Option<u32>,
    #[serde(rename = "Reward")]
    reward: Option<u64>,
    #[serde(rename = "Wing", default)]
    wing: bool,
}

#[derive(Debug, Deserialize)]
struct MissionsRecord {
    /// The journal also carries `Failed` and `Complete` lists; only
    /// `Active` is consulted.
    #[serde(rename = "Active", default)]
    active: Vec<MissionStub>,
}

#[derive(Debug, Deserialize)]
struct MissionStub {
    #[serde(rename = "MissionID")]
    mission_id: MissionId,
}

#[derive(Debug, Deserialize)]
struct MissionIdRecord {
    #[serde(rename = "MissionID")]
    mission_id: MissionId,
}

// ─── Decoding ─────────────────────────────────────────────────────

/// Decode one parsed journal record into the event union.
///
/// Returns `Ok(None)` for record kinds mission tracking does not consult.
/// A recognized kind whose fields fail to decode is a `MalformedEvent`;
/// callers log it and continue with the rest of the stream.
pub fn decode_value(value: &Value) -> Result<Option<JournalEvent>, StackwatchError> {
    let Some(kind) = value.get("event").and_then(Value::as_str) else {
        return Err(StackwatchError::MalformedEvent(
            "record has no event field".to_owned(),
        ));
    };

    let event = match kind {
        "Missions" => {
            let record: MissionsRecord = decode(value)?;
            JournalEvent::Snapshot {
                active_ids: record.active.into_iter().map(|m| m.mission_id).collect(),
            }
        }
        "MissionAccepted" => {
            let record: MissionAcceptedRecord = decode(value)?;
            JournalEvent::Accepted(Mission {
                mission_id: record.mission_id,
                name: record.name,
                source_faction: record.faction,
                target_faction: record.target_faction,
                target_type: record.target_type,
                target_system: record.destination_system,
                kill_count: record.kill_count,
                reward: record.reward,
                wing: record.wing,
                accepted_at: record.timestamp,
            })
        }
        "MissionCompleted" => {
            let record: MissionIdRecord = decode(value)?;
            JournalEvent::Completed {
                mission_id: record.mission_id,
            }
        }
        "MissionFailed" => {
            let record: MissionIdRecord = decode(value)?;
            JournalEvent::Failed {
                mission_id: record.mission_id,
            }
        }
        "MissionAbandoned" => {
            let record: MissionIdRecord = decode(value)?;
            JournalEvent::Abandoned {
                mission_id: record.mission_id,
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, StackwatchError> {
    serde_json::from_value(value.clone()).map_err(|e| StackwatchError::MalformedEvent(e.to_string()))
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).expect("test json")
    }

    #[test]
    fn decode_accepted_full_record() {
        let value = parse(
            r#"{"timestamp":"2026-03-01T12:00:00Z","event":"MissionAccepted",
                "Faction":"Federal Defense Union","Name":"Mission_Massacre",
                "LocalisedName":"Massacre Crimson Raiders pirates",
                "TargetType":"$MissionUtil_FactionTag_Pirate;",
                "TargetFaction":"Crimson Raiders","KillCount":18,
                "DestinationSystem":"HIP 20277","DestinationStation":"Fabian City",
                "Reward":1200000,"Wing":true,"MissionID":921466352}"#,
        );

        let event = decode_value(&value).expect("decodes").expect("relevant");
        let JournalEvent::Accepted(mission) = event else {
            panic!("expected Accepted, got {event:?}");
        };
        assert_eq!(mission.mission_id, 921_466_352);
        assert_eq!(mission.name, "Mission_Massacre");
        assert_eq!(mission.source_faction, "Federal Defense Union");
        assert_eq!(mission.target_faction.as_deref(), Some("Crimson Raiders"));
        assert_eq!(mission.target_system.as_deref(), Some("HIP 20277"));
        assert_eq!(mission.kill_count, Some(18));
        assert_eq!(mission.reward, Some(1_200_000));
        assert!(mission.wing);
        assert_eq!(mission.accepted_at.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn decode_accepted_minimal_record() {
        // Non-massacre missions omit the massacre-specific fields entirely.
        let value = parse(
            r#"{"timestamp":"2026-03-01T12:00:00Z","event":"MissionAccepted",
                "Faction":"The Dark Wheel","Name":"Mission_Courier",
                "Reward":50000,"MissionID":921470001}"#,
        );

        let event = decode_value(&value).expect("decodes").expect("relevant");
        let JournalEvent::Accepted(mission) = event else {
            panic!("expected Accepted, got {event:?}");
        };
        assert_eq!(mission.target_faction, None);
        assert_eq!(mission.target_type, None);
        assert_eq!(mission.kill_count, None);
        assert!(!mission.wing);
    }

    #[test]
    fn decode_snapshot_collects_active_ids() {
        let value = parse(
            r#"{"timestamp":"2026-03-01T12:05:00Z","event":"Missions",
                "Active":[{"MissionID":11,"Name":"Mission_Massacre","Expires":518400},
                          {"MissionID":12,"Name":"Mission_Massacre","Expires":518400}],
                "Failed":[],"Complete":[]}"#,
        );

        let event = decode_value(&value).expect("decodes").expect("relevant");
        assert_eq!(
            event,
            JournalEvent::Snapshot {
                active_ids: vec![11, 12]
            }
        );
    }

    #[test]
    fn decode_snapshot_missing_active_list() {
        let value = parse(r#"{"timestamp":"2026-03-01T12:05:00Z","event":"Missions"}"#);
        let event = decode_value(&value).expect("decodes").expect("relevant");
        assert_eq!(
            event,
            JournalEvent::Snapshot {
                active_ids: Vec::new()
            }
        );
    }

    #[test]
    fn decode_terminal_events() {
        let completed = parse(
            r#"{"timestamp":"2026-03-02T08:00:00Z","event":"MissionCompleted",
                "Faction":"Federal Defense Union","MissionID":31}"#,
        );
        assert_eq!(
            decode_value(&completed).expect("decodes"),
            Some(JournalEvent::Completed { mission_id: 31 })
        );

        let failed = parse(r#"{"timestamp":"2026-03-02T08:00:00Z","event":"MissionFailed","MissionID":32}"#);
        assert_eq!(
            decode_value(&failed).expect("decodes"),
            Some(JournalEvent::Failed { mission_id: 32 })
        );

        let abandoned = parse(r#"{"timestamp":"2026-03-02T08:00:00Z","event":"MissionAbandoned","MissionID":33}"#);
        assert_eq!(
            decode_value(&abandoned).expect("decodes"),
            Some(JournalEvent::Abandoned { mission_id: 33 })
        );
    }

    #[test]
    fn decode_skips_unrelated_kinds() {
        let value = parse(
            r#"{"timestamp":"2026-03-01T12:01:00Z","event":"FSDJump",
                "StarSystem":"HIP 20277","JumpDist":12.3}"#,
        );
        assert_eq!(decode_value(&value).expect("decodes"), None);
    }

    #[test]
    fn decode_missing_event_field_is_malformed() {
        let value = parse(r#"{"timestamp":"2026-03-01T12:01:00Z","MissionID":77}"#);
        let err = decode_value(&value).expect_err("malformed");
        assert!(matches!(err, StackwatchError::MalformedEvent(_)));
    }

    #[test]
    fn decode_bad_fields_on_recognized_kind_is_malformed() {
        // MissionID must be numeric.
        let value = parse(
            r#"{"timestamp":"2026-03-01T12:00:00Z","event":"MissionAccepted",
                "Faction":"F","Name":"Mission_Massacre","MissionID":"not-a-number"}"#,
        );
        let err = decode_value(&value).expect_err("malformed");
        assert!(matches!(err, StackwatchError::MalformedEvent(_)));
    }
}
