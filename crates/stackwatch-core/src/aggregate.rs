//! Stack aggregation: the pure transform from an active mission set to
//! the per-stack analytics view. One grouping core, parameterized by the
//! domain projection; the massacre subset is a thin wrapper over it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Mission, MissionId, MissionRecord, massacre_record};

// ─── View Types ───────────────────────────────────────────────────

/// Grouping key: missions sharing all three dimensions fulfill their kill
/// requirements jointly. Comparison is verbatim on the operator-visible
/// strings, case- and order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackKey {
    pub source_faction: String,
    pub target_faction: String,
    pub target_system: String,
}

/// One stack and its per-stack metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStack {
    pub key: StackKey,
    /// Member records ordered by mission id.
    pub missions: Vec<MissionRecord>,
    pub kill_count: u32,
    pub reward: u64,
    /// Reward restricted to wing-flagged members.
    pub shareable_reward: u64,
    /// Kills remaining to reach the stack height; for the leader, the
    /// non-positive margin over second place.
    pub delta: i64,
}

/// A dimension showing more than one distinct value across the filtered
/// missions. Usually means an unrelated mission slipped into the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackWarning {
    MultipleTargetFactions(Vec<String>),
    MultipleTargetTypes(Vec<String>),
    MultipleTargetSystems(Vec<String>),
}

impl fmt::Display for StackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleTargetFactions(values) => {
                write!(f, "Multiple Target Factions: {}!", values.join(", "))
            }
            Self::MultipleTargetTypes(values) => {
                write!(f, "Multiple Target Types: {}!", values.join(", "))
            }
            Self::MultipleTargetSystems(values) => {
                write!(f, "Multiple Target Systems: {}!", values.join(", "))
            }
        }
    }
}

/// Aggregated analytics over all stacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSummary {
    /// Stacks ordered by key.
    pub stacks: Vec<MissionStack>,
    /// Largest per-stack kill-count sum.
    pub stack_height: u32,
    /// Second-largest distinct per-stack sum; equals `stack_height` when
    /// fewer than two distinct values exist.
    pub second_stack_height: u32,
    pub total_kills: u32,
    pub total_reward: u64,
    pub shareable_reward: u64,
    pub warnings: Vec<StackWarning>,
}

/// Result of aggregation. "No data yet" and "nothing in the domain" are
/// distinct so renderers can treat them differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AggregateView {
    /// The repository has not produced an active set yet.
    AwaitingData,
    /// An active set exists but none of its missions pass the filter.
    NoMatchingMissions,
    Stacks(StackSummary),
}

// ─── Aggregation ──────────────────────────────────────────────────

/// Group an active set into stacks using `project` as the domain filter.
///
/// `None` means the repository has not produced an active set yet.
/// Deterministic: stacks are ordered by key, members by mission id, and
/// identical inputs produce identical views.
pub fn aggregate_by<F>(active: Option<&HashMap<MissionId, Mission>>, project: F) -> AggregateView
where
    F: Fn(&Mission) -> Option<MissionRecord>,
{
    let Some(active) = active else {
        return AggregateView::AwaitingData;
    };

    let mut records: Vec<MissionRecord> = active.values().filter_map(|m| project(m)).collect();
    records.sort_unstable_by_key(|r| r.mission_id);
    if records.is_empty() {
        return AggregateView::NoMatchingMissions;
    }

    let warnings = collect_warnings(&records);

    let mut groups: BTreeMap<StackKey, Vec<MissionRecord>> = BTreeMap::new();
    for record in records {
        let key = StackKey {
            source_faction: record.source_faction.clone(),
            target_faction: record.target_faction.clone(),
            target_system: record.target_system.clone(),
        };
        groups.entry(key).or_default().push(record);
    }

    let mut stacks: Vec<MissionStack> = groups
        .into_iter()
        .map(|(key, missions)| {
            let kill_count = missions.iter().map(|m| m.kill_count).sum();
            let reward = missions.iter().map(|m| m.reward).sum();
            let shareable_reward = missions.iter().filter(|m| m.wing).map(|m| m.reward).sum();
            MissionStack {
                key,
                missions,
                kill_count,
                reward,
                shareable_reward,
                delta: 0,
            }
        })
        .collect();

    let stack_height = stacks.iter().map(|s| s.kill_count).max().unwrap_or(0);
    let second_stack_height = second_distinct_height(&stacks, stack_height);

    for stack in &mut stacks {
        let behind = i64::from(stack_height) - i64::from(stack.kill_count);
        stack.delta = if behind == 0 {
            // Leader: show the margin over second place instead of zero.
            i64::from(second_stack_height) - i64::from(stack_height)
        } else {
            behind
        };
    }

    let total_kills = stacks.iter().map(|s| s.kill_count).sum();
    let total_reward = stacks.iter().map(|s| s.reward).sum();
    let shareable_reward = stacks.iter().map(|s| s.shareable_reward).sum();

    AggregateView::Stacks(StackSummary {
        stacks,
        stack_height,
        second_stack_height,
        total_kills,
        total_reward,
        shareable_reward,
        warnings,
    })
}

/// Aggregate the massacre subset of an active set.
pub fn aggregate_massacres(active: Option<&HashMap<MissionId, Mission>>) -> AggregateView {
    aggregate_by(active, massacre_record)
}

// ─── Helpers ──────────────────────────────────────────────────────

/// Second-largest distinct kill-count sum, or `stack_height` itself when
/// fewer than two distinct values exist.
fn second_distinct_height(stacks: &[MissionStack], stack_height: u32) -> u32 {
    let mut counts: Vec<u32> = stacks.iter().map(|s| s.kill_count).collect();
    counts.sort_unstable();
    counts.dedup();
    if counts.len() >= 2 {
        counts[counts.len() - 2]
    } else {
        stack_height
    }
}

fn collect_warnings(records: &[MissionRecord]) -> Vec<StackWarning> {
    let target_factions = distinct_in_order(records, |r| &r.target_faction);
    let target_types = distinct_in_order(records, |r| &r.target_type);
    let target_systems = distinct_in_order(records, |r| &r.target_system);

    let mut warnings = Vec::new();
    if target_factions.len() > 1 {
        warnings.push(StackWarning::MultipleTargetFactions(target_factions));
    }
    if target_types.len() > 1 {
        warnings.push(StackWarning::MultipleTargetTypes(target_types));
    }
    if target_systems.len() > 1 {
        warnings.push(StackWarning::MultipleTargetSystems(target_systems));
    }
    warnings
}

/// Distinct values in first-seen order over the id-ordered records.
fn distinct_in_order<F>(records: &[MissionRecord], field: F) -> Vec<String>
where
    F: Fn(&MissionRecord) -> &str,
{
    let mut values: Vec<String> = Vec::new();
    for record in records {
        let value = field(record);
        if !values.iter().any(|v| v == value) {
            values.push(value.to_owned());
        }
    }
    values
}

// ─── Tests ────────────────────────────────────────────────────────
