use std::collections::{BTreeSet, HashSet};

use orrery_common::EntityId;

/// The set of live entity ids.
///
/// Ids are issued monotonically by [`EntityIndex::allocate`]. Recycling of
/// destroyed ids is off unless explicitly enabled, so a script holding an old
/// id can never observe a different entity through it.
///
/// # Invariants
/// - `has(id)` is true iff `id` was added and not deleted since.
/// - A freshly allocated id is never live.
/// - Neither `add` nor `allocate` can fail, including at the top of the id
///   space.
#[derive(Debug, Clone)]
pub struct EntityIndex {
    live: HashSet<EntityId>,
    next: u64,
    recycle: bool,
    /// Deleted raw ids awaiting reuse. Only populated when `recycle` is set.
    free: BTreeSet<u64>,
}

impl Default for EntityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityIndex {
    /// An empty index with recycling off. The first allocated id is `#1`.
    pub fn new() -> Self {
        Self {
            live: HashSet::new(),
            next: 1,
            recycle: false,
            free: BTreeSet::new(),
        }
    }

    /// Create an index that reissues destroyed ids, lowest first.
    pub fn with_recycling(recycle: bool) -> Self {
        Self {
            recycle,
            ..Self::new()
        }
    }

    /// Whether destroyed ids are reissued.
    pub fn recycling(&self) -> bool {
        self.recycle
    }

    /// Issue an id that is not currently live. Does not add it.
    ///
    /// Once the counter reaches `u64::MAX` and that id is taken, the lowest
    /// id that is not live is issued instead.
    pub fn allocate(&mut self) -> EntityId {
        if self.recycle {
            if let Some(raw) = self.free.pop_first() {
                return EntityId(raw);
            }
        }
        let id = EntityId(self.next);
        if self.live.contains(&id) {
            return self.lowest_vacant();
        }
        self.next = self.next.saturating_add(1);
        id
    }

    fn lowest_vacant(&self) -> EntityId {
        (0..=u64::MAX)
            .map(EntityId)
            .find(|id| !self.live.contains(id))
            .unwrap_or(EntityId(0))
    }

    /// Insert `id` into the live set. Adding a live id is a no-op.
    pub fn add(&mut self, id: EntityId) {
        self.next = self.next.max(id.0.saturating_add(1));
        self.free.remove(&id.0);
        self.live.insert(id);
    }

    /// O(1) membership test.
    pub fn has(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    /// Remove `id` from the live set. Deleting an absent id is a no-op.
    pub fn delete(&mut self, id: EntityId) {
        if self.live.remove(&id) && self.recycle {
            self.free.insert(id.0);
        }
    }

    /// All live ids. Unordered; sort if you need determinism.
    pub fn list(&self) -> HashSet<EntityId> {
        self.live.clone()
    }

    /// Live ids in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.iter().copied()
    }

    /// Live ids in ascending order.
    pub fn sorted(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.live.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live ids.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_is_idempotent() {
        let mut index = EntityIndex::new();
        index.add(EntityId(7));
        index.add(EntityId(7));
        assert!(index.has(EntityId(7)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut index = EntityIndex::new();
        index.add(EntityId(3));
        index.delete(EntityId(3));
        index.delete(EntityId(3));
        index.delete(EntityId(99));
        assert!(!index.has(EntityId(3)));
        assert!(index.is_empty());
    }

    #[test]
    fn list_has_set_semantics() {
        let mut a = EntityIndex::new();
        a.add(EntityId(1));
        a.add(EntityId(2));
        let mut b = EntityIndex::new();
        b.add(EntityId(2));
        b.add(EntityId(1));
        let expected: HashSet<EntityId> = [EntityId(1), EntityId(2)].into_iter().collect();
        assert_eq!(a.list(), expected);
        assert_eq!(b.list(), expected);
    }

    #[test]
    fn allocation_is_monotonic_by_default() {
        let mut index = EntityIndex::new();
        let a = index.allocate();
        index.add(a);
        index.delete(a);
        let b = index.allocate();
        assert!(b > a);
    }

    #[test]
    fn allocation_skips_explicitly_added_ids() {
        let mut index = EntityIndex::new();
        index.add(EntityId(10));
        let next = index.allocate();
        assert_eq!(next, EntityId(11));
    }

    #[test]
    fn recycling_reuses_lowest_freed_id() {
        let mut index = EntityIndex::with_recycling(true);
        let ids: Vec<EntityId> = (0..3)
            .map(|_| {
                let id = index.allocate();
                index.add(id);
                id
            })
            .collect();
        index.delete(ids[2]);
        index.delete(ids[0]);
        assert_eq!(index.allocate(), ids[0]);
        assert_eq!(index.allocate(), ids[2]);
    }

    #[test]
    fn top_of_id_space_does_not_overflow() {
        let mut index = EntityIndex::new();
        index.add(EntityId(u64::MAX));
        index.add(EntityId(u64::MAX));
        assert!(index.has(EntityId(u64::MAX)));

        let a = index.allocate();
        assert!(!index.has(a));
        index.add(a);
        let b = index.allocate();
        assert!(!index.has(b));
        assert_ne!(a, b);
    }

    #[test]
    fn allocate_after_max_reuses_vacant_ids() {
        let mut index = EntityIndex::new();
        index.add(EntityId(1));
        index.add(EntityId(u64::MAX - 1));
        assert_eq!(index.allocate(), EntityId(u64::MAX));
        index.add(EntityId(u64::MAX));
        assert_eq!(index.allocate(), EntityId(0));
    }

    #[test]
    fn sorted_is_ascending() {
        let mut index = EntityIndex::new();
        for raw in [5, 1, 3] {
            index.add(EntityId(raw));
        }
        assert_eq!(index.sorted(), vec![EntityId(1), EntityId(3), EntityId(5)]);
    }

    proptest! {
        #[test]
        fn has_reflects_net_effect(ops in proptest::collection::vec((any::<bool>(), 0u64..16), 0..64)) {
            let mut index = EntityIndex::new();
            let mut model = HashSet::new();
            for (insert, raw) in ops {
                let id = EntityId(raw);
                if insert {
                    index.add(id);
                    model.insert(id);
                } else {
                    index.delete(id);
                    model.remove(&id);
                }
            }
            for raw in 0u64..16 {
                prop_assert_eq!(index.has(EntityId(raw)), model.contains(&EntityId(raw)));
            }
            prop_assert_eq!(index.list(), model);
        }
    }
}
