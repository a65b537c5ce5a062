//! Mission repository: reconciles the historical mission store with live
//! point-in-time snapshots into the authoritative active set.
//!
//! The store is append-only per commander and never pruned; the active set
//! is wholesale-replaced by snapshots and patched by accept/remove events
//! between them. Upstream ordering cannot be fully controlled, so missing
//! context, unknown ids, and duplicate snapshots are logged and recovered;
//! the only hard failure is the active set diverging from the store.

use std::collections::HashMap;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use stackwatch_core::types::{Mission, MissionId, StackwatchError};

/// Mission map payload delivered on both notification channels: the active
/// set on "active changed", the commander's full store on "all changed".
pub type MissionMap = HashMap<MissionId, Mission>;

// ─── Readiness ────────────────────────────────────────────────────

/// Two independent readiness bits composed into three states: historical
/// data loaded, and at least one snapshot received for the current
/// commander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    AwaitingInit,
    PartiallyInitialized,
    Initialized,
}

impl Readiness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingInit => "awaiting_init",
            Self::PartiallyInitialized => "partially_initialized",
            Self::Initialized => "initialized",
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Subscriptions ────────────────────────────────────────────────

/// Handle returned by `subscribe_*`, used to unsubscribe explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

// ─── Repository ───────────────────────────────────────────────────

/// Owner of all per-commander mission state.
///
/// Constructed explicitly and passed by reference to collaborators; there
/// is no process-global instance. Listeners register through
/// [`subscribe_active`](Self::subscribe_active) /
/// [`subscribe_all`](Self::subscribe_all) and are pruned automatically
/// once their receiver is dropped.
#[derive(Debug)]
pub struct MissionRepository {
    /// Commander → mission id → mission. Append-only, retained for audit.
    store: HashMap<String, MissionMap>,
    /// Active missions for the current commander.
    active: MissionMap,
    commander: Option<String>,
    store_loaded: bool,
    snapshot_seen: bool,
    next_subscription: u64,
    active_subscribers: HashMap<SubscriptionId, UnboundedSender<MissionMap>>,
    all_subscribers: HashMap<SubscriptionId, UnboundedSender<MissionMap>>,
}

impl MissionRepository {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            active: HashMap::new(),
            commander: None,
            store_loaded: false,
            snapshot_seen: false,
            next_subscription: 0,
            active_subscribers: HashMap::new(),
            all_subscribers: HashMap::new(),
        }
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Load the historical mission index.
    ///
    /// Idempotent for the process lifetime: commanders present in
    /// `history` have their scope replaced, other commanders keep theirs.
    pub fn initialize_store(&mut self, history: HashMap<String, MissionMap>) {
        for (commander, missions) in history {
            debug!(
                commander = %commander,
                missions = missions.len(),
                "loading mission history"
            );
            self.store.insert(commander, missions);
        }
        self.store_loaded = true;
    }

    /// Reconcile a point-in-time snapshot of active mission ids.
    ///
    /// The active set becomes the intersection of `active_ids` with the
    /// commander's store; unknown ids are dropped with a warning. Fires
    /// "active changed" on every accepted snapshot, including when the
    /// resulting set is unchanged.
    pub fn apply_active_snapshot(
        &mut self,
        cmdr: &str,
        active_ids: &[MissionId],
    ) -> Result<(), StackwatchError> {
        if !self.store_loaded {
            warn!(
                commander = %cmdr,
                "snapshot arrived before mission history was loaded, ignoring"
            );
            return Ok(());
        }
        let Some(store) = self.store.get(cmdr) else {
            warn!(
                commander = %cmdr,
                "snapshot names a commander with no mission history, ignoring"
            );
            return Ok(());
        };

        if self.commander.as_deref() != Some(cmdr) {
            if self.commander.is_some() {
                info!(commander = %cmdr, "commander changed, rebuilding active set");
            }
            self.commander = Some(cmdr.to_owned());
            self.snapshot_seen = false;
        }
        if self.snapshot_seen {
            warn!(commander = %cmdr, "snapshot arrived while already initialized, rebuilding");
        } else {
            self.snapshot_seen = true;
        }

        let mut next = MissionMap::with_capacity(active_ids.len());
        for &id in active_ids {
            if let Some(mission) = store.get(&id) {
                next.insert(id, mission.clone());
            } else {
                warn!(
                    commander = %cmdr,
                    mission_id = id,
                    "active mission id missing from store, skipping"
                );
            }
        }
        self.active = next;

        self.check_invariant()?;
        self.notify_active();
        Ok(())
    }

    /// Record a newly accepted mission in both the store and the active
    /// set. A mismatched commander context is logged and ignored.
    pub fn accept_mission(&mut self, cmdr: &str, mission: Mission) -> Result<(), StackwatchError> {
        if !self.store_loaded {
            warn!(
                commander = %cmdr,
                mission_id = mission.mission_id,
                "mission accepted before history was loaded, ignoring"
            );
            return Ok(());
        }
        if let Some(current) = self.commander.as_deref()
            && current != cmdr
        {
            warn!(
                commander = %cmdr,
                current = %current,
                mission_id = mission.mission_id,
                "mission accepted for a different commander, ignoring"
            );
            return Ok(());
        }

        self.store
            .entry(cmdr.to_owned())
            .or_default()
            .insert(mission.mission_id, mission.clone());
        self.active.insert(mission.mission_id, mission);

        self.check_invariant()?;
        self.notify_active();
        self.notify_all();
        Ok(())
    }

    /// Drop a mission from the active set. The store keeps its record for
    /// audit; an absent id is a warning, not an error.
    pub fn remove_mission(
        &mut self,
        cmdr: &str,
        mission_id: MissionId,
    ) -> Result<(), StackwatchError> {
        if !self.store_loaded {
            warn!(
                commander = %cmdr,
                mission_id,
                "mission removal before history was loaded, ignoring"
            );
            return Ok(());
        }
        if let Some(current) = self.commander.as_deref()
            && current != cmdr
        {
            warn!(
                commander = %cmdr,
                current = %current,
                mission_id,
                "mission removal for a different commander, ignoring"
            );
            return Ok(());
        }

        if self.active.remove(&mission_id).is_none() {
            warn!(
                commander = %cmdr,
                mission_id,
                "mission to remove not in active set, skipping"
            );
            return Ok(());
        }

        self.check_invariant()?;
        self.notify_active();
        Ok(())
    }

    /// Fire both notification channels with the current state.
    pub fn notify_listeners(&mut self) {
        self.notify_active();
        self.notify_all();
    }

    // ── Client API ───────────────────────────────────────────────

    pub fn readiness(&self) -> Readiness {
        match (self.store_loaded, self.snapshot_seen) {
            (false, false) => Readiness::AwaitingInit,
            (true, true) => Readiness::Initialized,
            _ => Readiness::PartiallyInitialized,
        }
    }

    pub fn commander(&self) -> Option<&str> {
        self.commander.as_deref()
    }

    /// The active set, once historical data and a snapshot are both in.
    /// `None` before that, so consumers can render "awaiting data".
    pub fn active_missions(&self) -> Option<&MissionMap> {
        (self.readiness() == Readiness::Initialized).then_some(&self.active)
    }

    /// Full mission history for the current commander.
    pub fn commander_missions(&self) -> Option<&MissionMap> {
        self.store.get(self.commander.as_deref()?)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Commanders with a loaded history scope, sorted.
    pub fn commanders(&self) -> Vec<&str> {
        let mut commanders: Vec<&str> = self.store.keys().map(String::as_str).collect();
        commanders.sort_unstable();
        commanders
    }

    /// Register for "active changed" notifications (payload: active set).
    pub fn subscribe_active(&mut self) -> (SubscriptionId, UnboundedReceiver<MissionMap>) {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id();
        self.active_subscribers.insert(id, tx);
        (id, rx)
    }

    /// Register for "all changed" notifications (payload: the commander's
    /// full store scope).
    pub fn subscribe_all(&mut self) -> (SubscriptionId, UnboundedReceiver<MissionMap>) {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id();
        self.all_subscribers.insert(id, tx);
        (id, rx)
    }

    /// Remove a subscription. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.active_subscribers.remove(&id).is_some() || self.all_subscribers.remove(&id).is_some()
    }

    // ── Internals ────────────────────────────────────────────────

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }

    fn notify_active(&mut self) {
        let payload = self.active.clone();
        self.active_subscribers.retain(|id, tx| {
            if tx.send(payload.clone()).is_err() {
                debug!(subscription = id.0, "active listener gone, pruning");
                false
            } else {
                true
            }
        });
    }

    fn notify_all(&mut self) {
        let payload = self
            .commander
            .as_ref()
            .and_then(|c| self.store.get(c))
            .cloned()
            .unwrap_or_default();
        self.all_subscribers.retain(|id, tx| {
            if tx.send(payload.clone()).is_err() {
                debug!(subscription = id.0, "all listener gone, pruning");
                false
            } else {
                true
            }
        });
    }

    /// `active ⊆ store[commander]` must hold after every mutation. Not
    /// reachable through the public operations; detection means a defect.
    fn check_invariant(&self) -> Result<(), StackwatchError> {
        let Some(cmdr) = self.commander.as_deref() else {
            return Ok(());
        };
        let store = self.store.get(cmdr);
        for id in self.active.keys() {
            if !store.is_some_and(|s| s.contains_key(id)) {
                return Err(StackwatchError::InvariantViolation(format!(
                    "mission {id} active but missing from store for {cmdr}"
                )));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn corrupt_active_for_test(&mut self, mission: Mission) {
        self.active.insert(mission.mission_id, mission);
    }

    #[cfg(test)]
    fn subscriber_counts(&self) -> (usize, usize) {
        (self.active_subscribers.len(), self.all_subscribers.len())
    }
}

impl Default for MissionRepository {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
