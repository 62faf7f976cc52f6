//! In-process networking collaborator.
//!
//! `LoopbackHub` plays the part of the relay every peer talks to: it holds
//! the authoritative owner map, the replicated ball states, the score ledger
//! and the event log. Each peer gets a `PeerLink` that sees a copy of that
//! state refreshed only on `pump()`, so between pumps a peer works from a
//! stale view exactly like it would over a real network.
//!
//! Ownership requests are queued and granted after a configurable number of
//! pumps of the requesting peer. The last grant applied wins.

use billiards_shared::protocol::{BallSnapshot, EntityId, PeerId, TableEvent};
use billiards_shared::vec3::Vec3;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::authority::{OwnershipPrimitive, ReplicationPrimitive};
use crate::score::ScoreLedger;
use crate::table::MAX_BALLS;

/// Relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub grants_applied: u64,
    pub grants_dropped: u64,
    pub rejected_writes: u64,
    pub events: u64,
}

/// What changed for one peer since its previous pump.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpReport {
    pub spawned: Vec<BallSnapshot>,
    pub despawned: Vec<EntityId>,
    pub gained: Vec<EntityId>,
    pub lost: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy)]
struct Grant {
    entity: EntityId,
    peer: PeerId,
    /// Requester pump count at which the grant lands
    due: u64,
}

#[derive(Debug, Default)]
struct HubState {
    latency: u32,
    next_peer: u32,
    next_entity: u32,
    /// Connected peers and how many times each has pumped
    pumps: BTreeMap<PeerId, u64>,
    owners: HashMap<EntityId, PeerId>,
    grants: Vec<Grant>,
    replicas: BTreeMap<EntityId, BallSnapshot>,
    scores: ScoreLedger,
    /// Events not yet drained by every connected peer
    events: Vec<TableEvent>,
    /// Absolute index of `events[0]`
    event_base: u64,
    /// Absolute index of each peer's next undrained event
    cursors: BTreeMap<PeerId, u64>,
    stats: HubStats,
}

impl HubState {
    fn owns_table(&self, peer: PeerId) -> bool {
        self.owners.get(&EntityId::TABLE) == Some(&peer)
    }

    fn reject(&mut self, peer: PeerId, what: &str, entity: EntityId) -> bool {
        self.stats.rejected_writes += 1;
        tracing::debug!(%peer, %entity, "{} rejected, no authority", what);
        false
    }

    /// Drop events every connected peer has already drained.
    fn compact_events(&mut self) {
        let end = self.event_base + self.events.len() as u64;
        let oldest = self.cursors.values().copied().min().unwrap_or(end);
        let drained = (oldest.saturating_sub(self.event_base) as usize).min(self.events.len());
        if drained > 0 {
            self.events.drain(..drained);
            self.event_base += drained as u64;
        }
    }

    fn forget(&mut self, entity: EntityId) {
        self.owners.remove(&entity);
        self.grants.retain(|g| g.entity != entity);
    }
}

fn lock(shared: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared relay. Cheap to clone; every clone talks to the same state.
#[derive(Debug, Clone)]
pub struct LoopbackHub {
    shared: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    /// `latency_ticks` extra pumps before a request is granted (0 = next pump).
    pub fn new(latency_ticks: u32) -> Self {
        Self {
            shared: Arc::new(Mutex::new(HubState {
                latency: latency_ticks,
                next_peer: 1,
                next_entity: 1,
                ..Default::default()
            })),
        }
    }

    /// Join a new peer. The first peer to join owns the table.
    pub fn connect(&self) -> PeerLink {
        let mut state = lock(&self.shared);
        let peer = PeerId(state.next_peer);
        state.next_peer += 1;
        state.pumps.insert(peer, 0);
        if !state.owners.contains_key(&EntityId::TABLE) {
            state.owners.insert(EntityId::TABLE, peer);
            tracing::info!(%peer, "peer owns the table");
        }
        let cursor = state.event_base + state.events.len() as u64;
        state.cursors.insert(peer, cursor);
        // Table authority is known from the start; balls arrive on the first pump
        let owners: HashMap<EntityId, PeerId> = state
            .owners
            .get_key_value(&EntityId::TABLE)
            .map(|(entity, owner)| (*entity, *owner))
            .into_iter()
            .collect();
        drop(state);

        tracing::info!(%peer, "peer connected");
        PeerLink {
            peer,
            shared: Arc::clone(&self.shared),
            owners,
            replicas: BTreeMap::new(),
            scores: ScoreLedger::new(),
            outstanding: HashSet::new(),
        }
    }

    pub fn stats(&self) -> HubStats {
        lock(&self.shared).stats
    }

    pub fn peer_count(&self) -> usize {
        lock(&self.shared).pumps.len()
    }

    /// Current owner according to the relay, not any peer's view.
    pub fn owner_of(&self, entity: EntityId) -> Option<PeerId> {
        lock(&self.shared).owners.get(&entity).copied()
    }

    pub fn scores(&self) -> ScoreLedger {
        lock(&self.shared).scores.clone()
    }
}

/// One peer's connection to the hub.
#[derive(Debug)]
pub struct PeerLink {
    peer: PeerId,
    shared: Arc<Mutex<HubState>>,
    owners: HashMap<EntityId, PeerId>,
    replicas: BTreeMap<EntityId, BallSnapshot>,
    scores: ScoreLedger,
    outstanding: HashSet<EntityId>,
}

impl PeerLink {
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Land this peer's due grants and refresh the local view.
    pub fn pump(&mut self) -> PumpReport {
        let peer = self.peer;
        let mut state = lock(&self.shared);

        let count = {
            let count = state.pumps.entry(peer).or_insert(0);
            *count += 1;
            *count
        };

        let (due, waiting): (Vec<Grant>, Vec<Grant>) = state
            .grants
            .drain(..)
            .partition(|g| g.peer == peer && g.due <= count);
        state.grants = waiting;
        for grant in due {
            if grant.entity == EntityId::TABLE || state.replicas.contains_key(&grant.entity) {
                let previous = state.owners.insert(grant.entity, peer);
                state.stats.grants_applied += 1;
                tracing::debug!(%peer, entity = %grant.entity, ?previous, "ownership granted");
            } else {
                state.stats.grants_dropped += 1;
                tracing::debug!(%peer, entity = %grant.entity, "grant dropped, entity gone");
            }
        }

        self.outstanding
            .retain(|e| state.grants.iter().any(|g| g.peer == peer && g.entity == *e));

        let mut report = PumpReport::default();
        for (id, snapshot) in &state.replicas {
            if !self.replicas.contains_key(id) {
                report.spawned.push(*snapshot);
            }
        }
        for id in self.replicas.keys() {
            if !state.replicas.contains_key(id) {
                report.despawned.push(*id);
            }
        }
        for (entity, owner) in &state.owners {
            if *owner == peer && self.owners.get(entity) != Some(&peer) {
                report.gained.push(*entity);
            }
        }
        for (entity, owner) in &self.owners {
            if *owner == peer && state.owners.get(entity) != Some(&peer) {
                report.lost.push(*entity);
            }
        }

        report.gained.sort();
        report.lost.sort();

        self.owners = state.owners.clone();
        self.replicas = state.replicas.clone();
        self.scores = state.scores.clone();
        report
    }

    /// Whether this peer's view says it owns the table.
    pub fn owns_table(&self) -> bool {
        self.is_owner(EntityId::TABLE)
    }

    pub fn claim_table(&mut self) {
        self.request_ownership(EntityId::TABLE);
    }

    /// Create a ball at rest. Table owner only; the new ball belongs to the
    /// spawner and shows up for everyone on their next pump.
    pub fn spawn_ball(&mut self, number: u8, position: Vec3) -> Option<EntityId> {
        let mut state = lock(&self.shared);
        if !state.owns_table(self.peer) {
            state.reject(self.peer, "spawn", EntityId::TABLE);
            return None;
        }
        if state.replicas.len() >= MAX_BALLS {
            state.stats.rejected_writes += 1;
            tracing::warn!(peer = %self.peer, number, "spawn rejected, table full");
            return None;
        }
        let id = EntityId(state.next_entity);
        state.next_entity += 1;
        state.replicas.insert(
            id,
            BallSnapshot {
                id,
                number,
                position,
                velocity: Vec3::ZERO,
                last_hitter: None,
            },
        );
        state.owners.insert(id, self.peer);
        Some(id)
    }

    /// Remove every ball and zero the scores. Table owner only.
    pub fn reset_table(&mut self) -> bool {
        let mut state = lock(&self.shared);
        if !state.owns_table(self.peer) {
            return state.reject(self.peer, "reset", EntityId::TABLE);
        }
        let ids: Vec<EntityId> = state.replicas.keys().copied().collect();
        for id in ids {
            state.forget(id);
        }
        state.replicas.clear();
        state.scores.clear();
        true
    }

    pub fn replicas(&self) -> impl Iterator<Item = &BallSnapshot> {
        self.replicas.values()
    }

    /// Scores as of the last pump.
    pub fn scores(&self) -> &ScoreLedger {
        &self.scores
    }

    /// Events emitted since the previous drain.
    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        let mut state = lock(&self.shared);
        let end = state.event_base + state.events.len() as u64;
        let cursor = state.cursors.get(&self.peer).copied().unwrap_or(end);
        let start = (cursor.saturating_sub(state.event_base) as usize).min(state.events.len());
        let events = state.events[start..].to_vec();
        state.cursors.insert(self.peer, end);
        state.compact_events();
        events
    }
}

impl OwnershipPrimitive for PeerLink {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn request_ownership(&mut self, entity: EntityId) {
        if self.is_owner(entity) || !self.outstanding.insert(entity) {
            return;
        }
        let mut state = lock(&self.shared);
        let pumped = state.pumps.get(&self.peer).copied().unwrap_or(0);
        let due = pumped + 1 + state.latency as u64;
        state.grants.push(Grant {
            entity,
            peer: self.peer,
            due,
        });
        tracing::debug!(peer = %self.peer, %entity, due, "ownership requested");
    }

    fn owner_of(&self, entity: EntityId) -> Option<PeerId> {
        self.owners.get(&entity).copied()
    }

    fn request_outstanding(&self, entity: EntityId) -> bool {
        self.outstanding.contains(&entity)
    }
}

impl ReplicationPrimitive for PeerLink {
    fn publish(&mut self, snapshot: BallSnapshot) -> bool {
        let mut state = lock(&self.shared);
        if state.owners.get(&snapshot.id) != Some(&self.peer)
            || !state.replicas.contains_key(&snapshot.id)
        {
            return state.reject(self.peer, "publish", snapshot.id);
        }
        state.replicas.insert(snapshot.id, snapshot);
        drop(state);
        self.replicas.insert(snapshot.id, snapshot);
        true
    }

    fn replica(&self, entity: EntityId) -> Option<&BallSnapshot> {
        self.replicas.get(&entity)
    }

    fn despawn(&mut self, entity: EntityId) -> bool {
        let mut state = lock(&self.shared);
        if !state.owns_table(self.peer) {
            return state.reject(self.peer, "despawn", entity);
        }
        state.forget(entity);
        state.replicas.remove(&entity).is_some()
    }

    fn respawn(&mut self, snapshot: BallSnapshot) -> bool {
        let mut state = lock(&self.shared);
        if !state.owns_table(self.peer) {
            return state.reject(self.peer, "respawn", snapshot.id);
        }
        state.forget(snapshot.id);
        state.replicas.insert(snapshot.id, snapshot);
        state.owners.insert(snapshot.id, self.peer);
        true
    }

    fn publish_scores(&mut self, ledger: &ScoreLedger) -> bool {
        let mut state = lock(&self.shared);
        if !state.owns_table(self.peer) {
            return state.reject(self.peer, "score update", EntityId::TABLE);
        }
        state.scores = ledger.clone();
        true
    }

    fn emit(&mut self, event: TableEvent) -> bool {
        let mut state = lock(&self.shared);
        if !state.owns_table(self.peer) {
            return state.reject(self.peer, "event", EntityId::TABLE);
        }
        state.events.push(event);
        state.stats.events += 1;
        true
    }
}

impl Drop for PeerLink {
    /// Hand everything the departing peer owned to the (possibly new) table owner.
    fn drop(&mut self) {
        let peer = self.peer;
        let mut state = lock(&self.shared);
        state.pumps.remove(&peer);
        state.cursors.remove(&peer);
        state.compact_events();
        state.grants.retain(|g| g.peer != peer);

        let heir = match state.owners.get(&EntityId::TABLE) {
            Some(owner) if *owner != peer => Some(*owner),
            _ => state.pumps.keys().next().copied(),
        };
        match heir {
            Some(heir) => {
                for owner in state.owners.values_mut() {
                    if *owner == peer {
                        *owner = heir;
                    }
                }
                tracing::info!(%peer, %heir, "peer left, authority handed over");
            }
            None => {
                state.owners.retain(|_, owner| *owner != peer);
                tracing::info!(%peer, "last peer left");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billiards_shared::vec3::vec3;

    /// Hub with a table owner `a`, a second peer `b` and one ball owned by `a`.
    fn two_peers(latency: u32) -> (LoopbackHub, PeerLink, PeerLink, EntityId) {
        let hub = LoopbackHub::new(latency);
        let mut a = hub.connect();
        let mut b = hub.connect();
        let id = a.spawn_ball(1, Vec3::ZERO).expect("table owner spawns");
        a.pump();
        b.pump();
        (hub, a, b, id)
    }

    #[test]
    fn first_peer_owns_table() {
        let hub = LoopbackHub::new(0);
        let mut a = hub.connect();
        let mut b = hub.connect();
        assert!(a.owns_table());
        assert_eq!(b.owner_of(EntityId::TABLE), Some(a.peer()));
        a.pump();
        b.pump();
        assert!(a.owns_table());
        assert!(!b.owns_table());
    }

    #[test]
    fn only_table_owner_spawns() {
        let (hub, _a, mut b, _) = two_peers(0);
        assert!(b.spawn_ball(2, Vec3::ZERO).is_none());
        assert_eq!(hub.stats().rejected_writes, 1);
    }

    #[test]
    fn spawn_shows_up_on_next_pump() {
        let hub = LoopbackHub::new(0);
        let mut a = hub.connect();
        let mut b = hub.connect();
        let id = a.spawn_ball(4, vec3(0.5, 0.0, 0.0));
        let report = b.pump();
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(Some(report.spawned[0].id), id);
        assert_eq!(b.owner_of(report.spawned[0].id), Some(a.peer()));
        assert_eq!(b.replicas().map(|s| s.number).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn spawn_rejected_when_table_is_full() {
        let hub = LoopbackHub::new(0);
        let mut a = hub.connect();
        for number in 0..MAX_BALLS {
            assert!(a.spawn_ball(number as u8, Vec3::ZERO).is_some());
        }

        assert!(a.spawn_ball(3, Vec3::ZERO).is_none());
        assert_eq!(hub.stats().rejected_writes, 1);
        assert_eq!(a.pump().spawned.len(), MAX_BALLS);
    }

    #[test]
    fn grant_lands_after_latency() {
        let (hub, a, mut b, id) = two_peers(2);
        b.request_ownership(id);
        assert!(b.request_outstanding(id));

        assert!(b.pump().gained.is_empty());
        assert!(b.pump().gained.is_empty());
        let report = b.pump();
        assert_eq!(report.gained, vec![id]);
        assert!(b.is_owner(id));
        assert!(!b.request_outstanding(id));
        assert_eq!(hub.owner_of(id), Some(b.peer()));
        assert_eq!(hub.stats().grants_applied, 1);
        drop(a);
    }

    #[test]
    fn zero_latency_grants_on_next_pump() {
        let (_hub, _a, mut b, id) = two_peers(0);
        b.request_ownership(id);
        assert!(!b.is_owner(id));
        b.pump();
        assert!(b.is_owner(id));
    }

    #[test]
    fn repeated_requests_queue_one_grant() {
        let (hub, _a, mut b, id) = two_peers(0);
        b.request_ownership(id);
        b.request_ownership(id);
        b.pump();
        assert_eq!(hub.stats().grants_applied, 1);
    }

    #[test]
    fn non_owner_publish_is_rejected() {
        let (hub, _a, mut b, id) = two_peers(0);
        let snapshot = BallSnapshot {
            id,
            number: 1,
            position: vec3(0.3, 0.0, 0.0),
            velocity: vec3(1.0, 0.0, 0.0),
            last_hitter: Some(b.peer()),
        };
        assert!(!b.publish(snapshot));
        assert_eq!(hub.stats().rejected_writes, 1);
        assert_eq!(b.replica(id).map(|s| s.position), Some(Vec3::ZERO));
    }

    #[test]
    fn stale_owner_is_rejected_until_it_pumps() {
        let (_hub, mut a, mut b, id) = two_peers(0);
        b.request_ownership(id);
        b.pump();

        // a still believes it owns the ball
        assert!(a.is_owner(id));
        let stale = BallSnapshot {
            id,
            number: 1,
            position: vec3(0.1, 0.0, 0.0),
            velocity: Vec3::ZERO,
            last_hitter: None,
        };
        assert!(!a.publish(stale));

        let report = a.pump();
        assert_eq!(report.lost, vec![id]);
        assert_eq!(a.owner_of(id), Some(b.peer()));
    }

    #[test]
    fn grant_for_despawned_ball_is_dropped() {
        let (hub, mut a, mut b, id) = two_peers(1);
        b.request_ownership(id);
        assert!(a.despawn(id));
        b.pump();
        b.pump();
        assert_eq!(hub.owner_of(id), None);
        assert!(!b.request_outstanding(id));
    }

    #[test]
    fn table_writes_need_table_authority() {
        let (_hub, mut a, mut b, _) = two_peers(0);
        assert!(!b.emit(TableEvent::Racked { balls: 1 }));
        assert!(!b.publish_scores(&ScoreLedger::new()));
        assert!(a.emit(TableEvent::Racked { balls: 1 }));
        assert_eq!(b.drain_events(), vec![TableEvent::Racked { balls: 1 }]);
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn event_log_keeps_only_undrained_events() {
        let (hub, mut a, mut b, _) = two_peers(0);
        assert!(a.emit(TableEvent::Racked { balls: 1 }));
        assert!(a.emit(TableEvent::Racked { balls: 2 }));

        assert_eq!(a.drain_events().len(), 2);
        assert_eq!(lock(&hub.shared).events.len(), 2);

        assert_eq!(b.drain_events().len(), 2);
        assert!(lock(&hub.shared).events.is_empty());

        assert!(a.emit(TableEvent::Racked { balls: 3 }));
        drop(b);
        assert_eq!(a.drain_events(), vec![TableEvent::Racked { balls: 3 }]);
        assert!(lock(&hub.shared).events.is_empty());
        assert_eq!(hub.stats().events, 3);
    }

    #[test]
    fn scores_reach_other_peers_on_pump() {
        let (_hub, mut a, mut b, _) = two_peers(0);
        let mut ledger = ScoreLedger::new();
        ledger.credit(b.peer(), 2);
        assert!(a.publish_scores(&ledger));
        assert_eq!(b.scores().get_score(b.peer()), 0);
        b.pump();
        assert_eq!(b.scores().get_score(b.peer()), 2);
    }

    #[test]
    fn reset_clears_balls_and_scores() {
        let (hub, mut a, mut b, id) = two_peers(0);
        let mut ledger = ScoreLedger::new();
        ledger.credit(a.peer(), 1);
        a.publish_scores(&ledger);
        assert!(a.reset_table());
        let report = b.pump();
        assert_eq!(report.despawned, vec![id]);
        assert_eq!(hub.scores(), ScoreLedger::new());
    }

    #[test]
    fn leaving_owner_hands_table_to_remaining_peer() {
        let (hub, a, mut b, id) = two_peers(0);
        let a_peer = a.peer();
        drop(a);
        b.pump();
        assert!(b.owns_table());
        assert!(b.is_owner(id));
        assert_ne!(hub.owner_of(id), Some(a_peer));
        assert_eq!(hub.peer_count(), 1);
    }
}
