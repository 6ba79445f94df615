//! Free-list pool backing the world's tile and pickup instances.
//!
//! Identifiers are monotonic and never reused, so a released handle is
//! simply absent from the live set; callers perform liveness checks instead
//! of holding back-references that could dangle.

use std::collections::BTreeMap;

use crystal_run_core::{InstanceTag, PoolStats};

#[derive(Debug)]
struct Entry<T> {
    tag: InstanceTag,
    payload: T,
}

/// Pooled-instance provider: pre-warmed free list plus live instances keyed
/// by monotonic identifiers with deterministic iteration order.
#[derive(Debug)]
pub(crate) struct Pool<T> {
    live: BTreeMap<u64, Entry<T>>,
    idle: u32,
    next_id: u64,
    cold_acquisitions: u32,
}

impl<T> Pool<T> {
    pub(crate) const fn new() -> Self {
        Self {
            live: BTreeMap::new(),
            idle: 0,
            next_id: 0,
            cold_acquisitions: 0,
        }
    }

    /// Pre-warms the free list with `count` idle instances.
    pub(crate) fn populate(&mut self, count: u32) {
        self.idle = self.idle.saturating_add(count);
    }

    /// Hands out an instance, reusing a warm slot when one is idle.
    ///
    /// An empty free list falls back to cold construction and is counted in
    /// [`PoolStats::cold_acquisitions`]; callers are expected to pre-size the
    /// pool via [`Pool::populate`] before sustained acquisition.
    pub(crate) fn acquire(&mut self, tag: InstanceTag, payload: T) -> u64 {
        if self.idle > 0 {
            self.idle -= 1;
        } else {
            self.cold_acquisitions = self.cold_acquisitions.saturating_add(1);
        }

        let id = self.next_id;
        self.next_id += 1;
        let _ = self.live.insert(id, Entry { tag, payload });
        id
    }

    /// Returns the instance to the free list. Stale identifiers are a no-op.
    pub(crate) fn release(&mut self, id: u64) -> bool {
        if self.live.remove(&id).is_some() {
            self.idle = self.idle.saturating_add(1);
            true
        } else {
            false
        }
    }

    /// Broadcast reclaim: releases every live instance not tagged `keep`.
    ///
    /// Returns the released identifiers in ascending order.
    pub(crate) fn release_all_except(&mut self, keep: InstanceTag) -> Vec<u64> {
        let ids: Vec<u64> = self
            .live
            .iter()
            .filter(|(_, entry)| entry.tag != keep)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            let _ = self.live.remove(id);
            self.idle = self.idle.saturating_add(1);
        }

        ids
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.live.get_mut(&id).map(|entry| &mut entry.payload)
    }

    pub(crate) fn is_live(&self, id: u64) -> bool {
        self.live.contains_key(&id)
    }

    /// Iterates live instances in ascending identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u64, InstanceTag, &T)> {
        self.live
            .iter()
            .map(|(id, entry)| (*id, entry.tag, &entry.payload))
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.live.len() as u32,
            idle: self.idle,
            cold_acquisitions: self.cold_acquisitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Pool;
    use crystal_run_core::InstanceTag;

    #[test]
    fn acquire_reuses_warm_slots_before_constructing() {
        let mut pool: Pool<u8> = Pool::new();
        pool.populate(2);

        let _ = pool.acquire(InstanceTag::Expendable, 0);
        let _ = pool.acquire(InstanceTag::Expendable, 1);
        assert_eq!(pool.stats().cold_acquisitions, 0);
        assert_eq!(pool.stats().idle, 0);

        let _ = pool.acquire(InstanceTag::Expendable, 2);
        assert_eq!(pool.stats().cold_acquisitions, 1);
        assert_eq!(pool.stats().live, 3);
    }

    #[test]
    fn release_returns_instances_to_the_free_list() {
        let mut pool: Pool<u8> = Pool::new();
        let id = pool.acquire(InstanceTag::Expendable, 7);

        assert!(pool.release(id));
        assert!(!pool.is_live(id));
        assert_eq!(pool.stats().idle, 1);
    }

    #[test]
    fn releasing_a_stale_identifier_is_a_no_op() {
        let mut pool: Pool<u8> = Pool::new();
        let id = pool.acquire(InstanceTag::Expendable, 7);
        assert!(pool.release(id));
        assert!(!pool.release(id));
        assert_eq!(pool.stats().idle, 1);
    }

    #[test]
    fn identifiers_are_never_reused() {
        let mut pool: Pool<u8> = Pool::new();
        let first = pool.acquire(InstanceTag::Expendable, 0);
        assert!(pool.release(first));
        let second = pool.acquire(InstanceTag::Expendable, 1);
        assert_ne!(first, second);
    }

    #[test]
    fn broadcast_release_keeps_tagged_instances() {
        let mut pool: Pool<u8> = Pool::new();
        let marker = pool.acquire(InstanceTag::Marker, 0);
        let expendable = pool.acquire(InstanceTag::Expendable, 1);

        let released = pool.release_all_except(InstanceTag::Marker);
        assert_eq!(released, vec![expendable]);
        assert!(pool.is_live(marker));
        assert!(!pool.is_live(expendable));
    }
}
