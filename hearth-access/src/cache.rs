//! Snapshot cache with superseding loads
//!
//! Each member slot records the generation of the most recently started load.
//! A finished load installs its snapshot only if its ticket still carries that
//! generation; anything older is discarded. Installing swaps a single `Arc`,
//! so readers see either the old snapshot or the new one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{MemberId, MemberSnapshot};

/// Proof that a load was started, used to install its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub member_id: MemberId,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Slot {
    latest_generation: u64,
    snapshot: Option<Arc<MemberSnapshot>>,
}

/// Read cache of member snapshots
#[derive(Debug, Default)]
pub struct SnapshotCache {
    slots: RwLock<HashMap<MemberId, Slot>>,
    next_generation: AtomicU64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a load for `member_id`, superseding any load already in flight
    pub fn begin_load(&self, member_id: &str) -> LoadTicket {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        // Issued under the lock so generations and slot updates stay in order
        let generation = self.issue();
        slots.entry(member_id.to_string()).or_default().latest_generation = generation;
        LoadTicket {
            member_id: member_id.to_string(),
            generation,
        }
    }

    /// Install a finished load. Returns false if the ticket was superseded.
    pub fn install(&self, ticket: &LoadTicket, snapshot: Arc<MemberSnapshot>) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        match slots.get_mut(&ticket.member_id) {
            Some(slot) if slot.latest_generation == ticket.generation => {
                slot.snapshot = Some(snapshot);
                true
            }
            _ => false,
        }
    }

    /// Whether `ticket` is still the newest load for its member
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&ticket.member_id)
            .is_some_and(|slot| slot.latest_generation == ticket.generation)
    }

    /// Current snapshot, or `None` while nothing has been loaded
    pub fn current(&self, member_id: &str) -> Option<Arc<MemberSnapshot>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(member_id).and_then(|slot| slot.snapshot.clone())
    }

    /// Drop the member's snapshot and supersede in-flight loads
    pub fn invalidate(&self, member_id: &str) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self.issue();
        if let Some(slot) = slots.get_mut(member_id) {
            slot.latest_generation = generation;
            slot.snapshot = None;
        }
    }

    /// Number of members with an installed snapshot
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.snapshot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdditionalAdultGrant, FamilyMember, Role};

    fn snapshot(role: Role) -> Arc<MemberSnapshot> {
        Arc::new(MemberSnapshot::loaded(
            FamilyMember::new("kid", role),
            vec![],
            AdditionalAdultGrant::none(),
        ))
    }

    #[test]
    fn test_empty_cache_has_no_snapshot() {
        let cache = SnapshotCache::new();
        assert!(cache.current("kid").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_install_current_ticket() {
        let cache = SnapshotCache::new();
        let ticket = cache.begin_load("kid");

        assert!(cache.install(&ticket, snapshot(Role::Child)));
        assert_eq!(cache.current("kid").unwrap().member.as_ref().unwrap().role, Role::Child);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_later_initiated_load_wins() {
        let cache = SnapshotCache::new();
        let first = cache.begin_load("kid");
        let second = cache.begin_load("kid");

        // Later load finishes first
        assert!(cache.install(&second, snapshot(Role::Teen)));
        // Earlier load arrives late and is discarded
        assert!(!cache.is_current(&first));
        assert!(!cache.install(&first, snapshot(Role::Child)));

        assert_eq!(cache.current("kid").unwrap().member.as_ref().unwrap().role, Role::Teen);
    }

    #[test]
    fn test_loads_for_different_members_do_not_interfere() {
        let cache = SnapshotCache::new();
        let kid = cache.begin_load("kid");
        let teen = cache.begin_load("teen");

        assert!(cache.install(&kid, snapshot(Role::Child)));
        assert!(cache.install(&teen, snapshot(Role::Teen)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_drops_snapshot_and_in_flight_loads() {
        let cache = SnapshotCache::new();
        let first = cache.begin_load("kid");
        assert!(cache.install(&first, snapshot(Role::Child)));

        let in_flight = cache.begin_load("kid");
        cache.invalidate("kid");

        assert!(cache.current("kid").is_none());
        assert!(!cache.install(&in_flight, snapshot(Role::Teen)));
    }

    #[test]
    fn test_install_without_ticket_slot_is_rejected() {
        let cache = SnapshotCache::new();
        let forged = LoadTicket {
            member_id: "kid".into(),
            generation: 42,
        };
        assert!(!cache.install(&forged, snapshot(Role::Child)));
    }

    #[test]
    fn test_reader_keeps_old_snapshot_across_swap() {
        let cache = SnapshotCache::new();
        let first = cache.begin_load("kid");
        cache.install(&first, snapshot(Role::Child));
        let held = cache.current("kid").unwrap();

        let second = cache.begin_load("kid");
        cache.install(&second, snapshot(Role::Teen));

        // The reader's view is whole and unchanged
        assert_eq!(held.member.as_ref().unwrap().role, Role::Child);
        assert_eq!(cache.current("kid").unwrap().member.as_ref().unwrap().role, Role::Teen);
    }
}
