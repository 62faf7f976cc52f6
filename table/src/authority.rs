//! Write-authority seams between the simulation and the networking layer.
//!
//! The networking collaborator decides who owns what; the simulation only
//! asks for ownership and reads the answer a tick later. Each ball caches the
//! answer as an [`Ownership`] tag so hit and collision logic branch on one
//! value per tick instead of querying the network mid-step.

use billiards_shared::protocol::{BallSnapshot, EntityId, PeerId, TableEvent};

use crate::score::ScoreLedger;

/// Local view of who may write an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    /// This peer holds write authority.
    Owned,
    /// Another peer holds write authority.
    OwnedBy(PeerId),
    /// This peer asked for authority and has not heard back yet.
    RequestPending,
    /// Nobody holds write authority.
    #[default]
    Unowned,
}

impl Ownership {
    pub fn is_owned(self) -> bool {
        matches!(self, Ownership::Owned)
    }
}

/// Exclusive write authority over replicated entities.
///
/// Requests are fire-and-forget: a grant is observed through `owner_of` on a
/// later tick, never synchronously.
pub trait OwnershipPrimitive {
    fn local_peer(&self) -> PeerId;

    /// Ask for authority over `entity`. Repeated requests while one is
    /// outstanding are ignored.
    fn request_ownership(&mut self, entity: EntityId);

    fn owner_of(&self, entity: EntityId) -> Option<PeerId>;

    /// Whether this peer has a request for `entity` still in flight.
    fn request_outstanding(&self, entity: EntityId) -> bool;

    fn is_owner(&self, entity: EntityId) -> bool {
        self.owner_of(entity) == Some(self.local_peer())
    }
}

/// Mirrors owner-written state to every peer.
///
/// Writes from a peer that does not hold the relevant authority are rejected
/// and reported as `false`. Table-level writes (despawn, respawn, scores,
/// events) need authority over [`EntityId::TABLE`].
pub trait ReplicationPrimitive {
    fn publish(&mut self, snapshot: BallSnapshot) -> bool;

    /// Last state published by the owner of `entity`, as seen by this peer.
    fn replica(&self, entity: EntityId) -> Option<&BallSnapshot>;

    fn despawn(&mut self, entity: EntityId) -> bool;

    /// Replace a ball's state wholesale and hand its authority to the table owner.
    fn respawn(&mut self, snapshot: BallSnapshot) -> bool;

    fn publish_scores(&mut self, ledger: &ScoreLedger) -> bool;

    fn emit(&mut self, event: TableEvent) -> bool;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Network stub that records requests and never grants them.
    #[derive(Default)]
    pub(crate) struct RecordingAuthority {
        pub local: PeerId,
        pub owners: HashMap<EntityId, PeerId>,
        pub requests: Vec<EntityId>,
        pub replicas: HashMap<EntityId, BallSnapshot>,
        pub published: Vec<BallSnapshot>,
        pub events: Vec<TableEvent>,
        outstanding: HashSet<EntityId>,
    }

    impl RecordingAuthority {
        pub fn new(local: PeerId) -> Self {
            Self {
                local,
                ..Default::default()
            }
        }

        pub fn with_replica(mut self, snapshot: BallSnapshot) -> Self {
            self.replicas.insert(snapshot.id, snapshot);
            self
        }

        fn owns_table(&self) -> bool {
            self.is_owner(EntityId::TABLE)
        }

        pub fn with_owner(mut self, entity: EntityId, owner: PeerId) -> Self {
            self.owners.insert(entity, owner);
            self
        }
    }

    impl OwnershipPrimitive for RecordingAuthority {
        fn local_peer(&self) -> PeerId {
            self.local
        }

        fn request_ownership(&mut self, entity: EntityId) {
            if self.outstanding.insert(entity) {
                self.requests.push(entity);
            }
        }

        fn owner_of(&self, entity: EntityId) -> Option<PeerId> {
            self.owners.get(&entity).copied()
        }

        fn request_outstanding(&self, entity: EntityId) -> bool {
            self.outstanding.contains(&entity)
        }
    }

    impl ReplicationPrimitive for RecordingAuthority {
        fn publish(&mut self, snapshot: BallSnapshot) -> bool {
            if !self.is_owner(snapshot.id) {
                return false;
            }
            self.published.push(snapshot);
            self.replicas.insert(snapshot.id, snapshot);
            true
        }

        fn replica(&self, entity: EntityId) -> Option<&BallSnapshot> {
            self.replicas.get(&entity)
        }

        fn despawn(&mut self, entity: EntityId) -> bool {
            self.owns_table() && self.replicas.remove(&entity).is_some()
        }

        fn respawn(&mut self, snapshot: BallSnapshot) -> bool {
            if !self.owns_table() {
                return false;
            }
            self.replicas.insert(snapshot.id, snapshot);
            true
        }

        fn publish_scores(&mut self, _ledger: &ScoreLedger) -> bool {
            self.owns_table()
        }

        fn emit(&mut self, event: TableEvent) -> bool {
            if !self.owns_table() {
                return false;
            }
            self.events.push(event);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingAuthority;
    use super::*;

    #[test]
    fn only_owned_counts_as_owned() {
        assert!(Ownership::Owned.is_owned());
        assert!(!Ownership::OwnedBy(PeerId(2)).is_owned());
        assert!(!Ownership::RequestPending.is_owned());
        assert!(!Ownership::Unowned.is_owned());
    }

    #[test]
    fn is_owner_compares_with_local_peer() {
        let auth = RecordingAuthority::new(PeerId(1))
            .with_owner(EntityId(1), PeerId(1))
            .with_owner(EntityId(2), PeerId(2));
        assert!(auth.is_owner(EntityId(1)));
        assert!(!auth.is_owner(EntityId(2)));
        assert!(!auth.is_owner(EntityId(3)));
    }

    #[test]
    fn repeated_requests_are_deduplicated() {
        let mut auth = RecordingAuthority::new(PeerId(1));
        auth.request_ownership(EntityId(5));
        auth.request_ownership(EntityId(5));
        assert_eq!(auth.requests, vec![EntityId(5)]);
        assert!(auth.request_outstanding(EntityId(5)));
    }
}
