// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::state::StateKind;
use ahash::AHashMap;
use scenery_core::scene::NodeId;

/// Identifies the node (and, for composite geometry, the part) a state slot
/// was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// The node that exported the state.
    pub node: NodeId,
    /// Sub-index for nodes exporting several states of one kind.
    pub part: u32,
}

impl StateKey {
    /// Key of the single state a node exports.
    pub fn node(node: NodeId) -> Self {
        Self { node, part: 0 }
    }

    /// Key of one part of a composite node.
    pub fn part(node: NodeId, part: u32) -> Self {
        Self { node, part }
    }
}

/// A non-owning, counted reference to one slot of a [`HandlePool`].
///
/// The `stateId` of the handle is its `(index, generation)` pair; two handles
/// are the same state exactly when they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHandle {
    /// The kind of the pool the handle belongs to.
    pub kind: StateKind,
    /// Slot index inside the pool.
    pub index: u32,
    /// Generation of the slot when the handle was issued.
    pub generation: u32,
}

#[derive(Debug)]
struct SlotEntry<T> {
    key: Option<StateKey>,
    payload: T,
    ref_count: u32,
    pinned: bool,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<SlotEntry<T>>,
}

/// Arena of state payloads for one [`StateKind`].
///
/// Slots are looked up either by handle or by the [`StateKey`] of the node
/// that exported them. A pool may carry a pinned default slot that every
/// entry falls back to when no node of the kind is on the stack; the default
/// is never evicted.
#[derive(Debug)]
pub struct HandlePool<T> {
    kind: StateKind,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    by_key: AHashMap<StateKey, u32>,
    default: Option<StateHandle>,
}

impl<T> HandlePool<T> {
    /// Creates an empty pool without a default slot.
    pub fn new(kind: StateKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            by_key: AHashMap::new(),
            default: None,
        }
    }

    /// Creates a pool whose slot 0 is a pinned default holding `payload`.
    pub fn with_default(kind: StateKind, payload: T) -> Self {
        let mut pool = Self::new(kind);
        let handle = pool.allocate(None, payload);
        if let Some(slot) = pool.slots.get_mut(handle.index as usize) {
            if let Some(entry) = slot.entry.as_mut() {
                entry.pinned = true;
            }
        }
        pool.default = Some(handle);
        pool
    }

    /// The kind of state stored in this pool.
    pub fn kind(&self) -> StateKind {
        self.kind
    }

    /// The pinned default handle, if the pool has one.
    pub fn default_handle(&self) -> Option<StateHandle> {
        self.default
    }

    /// Returns the live handle exported by `key`, if any.
    pub fn handle_for(&self, key: StateKey) -> Option<StateHandle> {
        let index = *self.by_key.get(&key)?;
        let slot = self.slots.get(index as usize)?;
        slot.entry.as_ref().map(|_| StateHandle {
            kind: self.kind,
            index,
            generation: slot.generation,
        })
    }

    /// Fetches the slot exported by `key`, creating it with `create` if absent.
    ///
    /// Returns the handle and whether a new slot was created. A freshly
    /// created slot starts with a reference count of zero.
    pub fn get_or_insert_with<F>(&mut self, key: StateKey, create: F) -> (StateHandle, bool)
    where
        F: FnOnce() -> T,
    {
        if let Some(handle) = self.handle_for(key) {
            return (handle, false);
        }
        let handle = self.allocate(Some(key), create());
        (handle, true)
    }

    /// Same as [`get_or_insert_with`](Self::get_or_insert_with) for fallible construction.
    pub fn try_get_or_insert_with<F, E>(
        &mut self,
        key: StateKey,
        create: F,
    ) -> Result<(StateHandle, bool), E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(handle) = self.handle_for(key) {
            return Ok((handle, false));
        }
        let payload = create()?;
        Ok((self.allocate(Some(key), payload), true))
    }

    /// Stores `payload` under `key`, replacing the payload of a live slot in
    /// place (its handle and reference count are kept).
    ///
    /// Returns the handle and the replaced payload, if any.
    pub fn insert_keyed(&mut self, key: StateKey, payload: T) -> (StateHandle, Option<T>) {
        if let Some(handle) = self.handle_for(key) {
            if let Some(entry) = self.entry_mut(handle) {
                let old = std::mem::replace(&mut entry.payload, payload);
                return (handle, Some(old));
            }
        }
        (self.allocate(Some(key), payload), None)
    }

    fn allocate(&mut self, key: Option<StateKey>, payload: T) -> StateHandle {
        let entry = SlotEntry {
            key,
            payload,
            ref_count: 0,
            pinned: false,
        };
        let (index, generation) = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.entry = Some(entry);
            (index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            (index, 0)
        };
        if let Some(key) = key {
            self.by_key.insert(key, index);
        }
        StateHandle {
            kind: self.kind,
            index,
            generation,
        }
    }

    fn entry(&self, handle: StateHandle) -> Option<&SlotEntry<T>> {
        if handle.kind != self.kind {
            return None;
        }
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, handle: StateHandle) -> Option<&mut SlotEntry<T>> {
        if handle.kind != self.kind {
            return None;
        }
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Resolves a handle to its payload. Stale handles resolve to `None`.
    pub fn get(&self, handle: StateHandle) -> Option<&T> {
        self.entry(handle).map(|e| &e.payload)
    }

    /// Resolves a handle to its payload for in-place update by the owning kind.
    pub fn get_mut(&mut self, handle: StateHandle) -> Option<&mut T> {
        self.entry_mut(handle).map(|e| &mut e.payload)
    }

    /// Whether the handle still points at a live slot.
    pub fn contains(&self, handle: StateHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// Current reference count of a live handle.
    pub fn ref_count(&self, handle: StateHandle) -> Option<u32> {
        self.entry(handle).map(|e| e.ref_count)
    }

    /// Adds one reference. Returns `false` for stale handles.
    pub fn acquire(&mut self, handle: StateHandle) -> bool {
        match self.entry_mut(handle) {
            Some(entry) => {
                entry.ref_count += 1;
                true
            }
            None => {
                log::warn!("acquire on stale {:?} handle {:?}", self.kind, handle);
                false
            }
        }
    }

    /// Drops one reference, evicting the slot when the count reaches zero.
    ///
    /// Returns the evicted payload so the caller can free GPU resources it owns.
    pub fn release(&mut self, handle: StateHandle) -> Option<T> {
        let entry = match self.entry_mut(handle) {
            Some(entry) => entry,
            None => {
                log::warn!("release on stale {:?} handle {:?}", self.kind, handle);
                return None;
            }
        };
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 || entry.pinned {
            return None;
        }
        self.evict(handle.index)
    }

    fn evict(&mut self, index: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        let entry = slot.entry.take()?;
        if let Some(key) = entry.key {
            if self.by_key.get(&key) == Some(&index) {
                self.by_key.remove(&key);
            }
        }
        self.free.push(index);
        Some(entry.payload)
    }

    /// Evicts every unpinned slot nobody references.
    ///
    /// Slots are created lazily when a node exports state; those that never got
    /// bound by a draw-list entry are collected here at the end of a pass.
    pub fn sweep_unreferenced(&mut self) -> Vec<T> {
        let doomed: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.entry {
                Some(entry) if entry.ref_count == 0 && !entry.pinned => Some(index as u32),
                _ => None,
            })
            .collect();
        doomed
            .into_iter()
            .filter_map(|index| self.evict(index))
            .collect()
    }

    /// Number of live slots, the pinned default included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Whether the pool holds no live slot at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every live handle and its payload.
    pub fn iter(&self) -> impl Iterator<Item = (StateHandle, &T)> + '_ {
        let kind = self.kind;
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    StateHandle {
                        kind,
                        index: index as u32,
                        generation: slot.generation,
                    },
                    &entry.payload,
                )
            })
        })
    }

    /// Removes every slot except the pinned default and returns their payloads.
    pub fn clear(&mut self) -> Vec<T> {
        let doomed: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.entry {
                Some(entry) if !entry.pinned => Some(index as u32),
                _ => None,
            })
            .collect();
        doomed
            .into_iter()
            .filter_map(|index| self.evict(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(index: u32) -> StateKey {
        StateKey::node(NodeId {
            index,
            generation: 0,
        })
    }

    #[test]
    fn test_release_to_zero_evicts_and_invalidates_handle() {
        let mut pool = HandlePool::new(StateKind::Material);
        let (handle, created) = pool.get_or_insert_with(key(1), || 7u32);
        assert!(created);

        assert!(pool.acquire(handle));
        assert!(pool.acquire(handle));
        assert_eq!(pool.ref_count(handle), Some(2));

        assert_eq!(pool.release(handle), None);
        assert_eq!(pool.release(handle), Some(7));
        assert!(!pool.contains(handle));
        assert_eq!(pool.handle_for(key(1)), None);
    }

    #[test]
    fn test_recycled_slot_bumps_generation() {
        let mut pool = HandlePool::new(StateKind::Layer);
        let (old, _) = pool.get_or_insert_with(key(1), || 1u32);
        pool.acquire(old);
        pool.release(old);

        let (new, created) = pool.get_or_insert_with(key(2), || 2u32);
        assert!(created);
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);
        assert_eq!(pool.get(old), None);
        assert_eq!(pool.get(new), Some(&2));
    }

    #[test]
    fn test_pinned_default_survives_release_and_sweep() {
        let mut pool = HandlePool::with_default(StateKind::Flags, 0u32);
        let default = pool.default_handle().expect("default slot");
        pool.acquire(default);
        assert_eq!(pool.release(default), None);
        assert!(pool.sweep_unreferenced().is_empty());
        assert!(pool.contains(default));
    }

    #[test]
    fn test_sweep_collects_slots_never_bound() {
        let mut pool = HandlePool::new(StateKind::Name);
        let (bound, _) = pool.get_or_insert_with(key(1), || "bound");
        pool.get_or_insert_with(key(2), || "orphan");
        pool.acquire(bound);

        let swept = pool.sweep_unreferenced();
        assert_eq!(swept, vec!["orphan"]);
        assert!(pool.contains(bound));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_existing_key_is_fetched_not_recreated() {
        let mut pool = HandlePool::new(StateKind::Material);
        let (a, created_a) = pool.get_or_insert_with(key(3), || 1u32);
        let (b, created_b) = pool.get_or_insert_with(key(3), || 2u32);
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(pool.get(a), Some(&1));
    }

    #[test]
    fn test_handle_of_another_kind_does_not_resolve() {
        let mut pool = HandlePool::new(StateKind::Material);
        let (handle, _) = pool.get_or_insert_with(key(1), || 1u32);
        let foreign = StateHandle {
            kind: StateKind::Texture,
            ..handle
        };
        assert_eq!(pool.get(foreign), None);
    }

    #[test]
    fn test_insert_keyed_replaces_payload_keeping_identity() {
        let mut pool = HandlePool::new(StateKind::Material);
        let (first, old) = pool.insert_keyed(key(4), 1u32);
        assert_eq!(old, None);
        pool.acquire(first);

        let (second, old) = pool.insert_keyed(key(4), 9u32);
        assert_eq!(second, first);
        assert_eq!(old, Some(1));
        assert_eq!(pool.get(first), Some(&9));
        assert_eq!(pool.ref_count(first), Some(1));
    }
}
