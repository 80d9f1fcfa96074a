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

//! Draw-list entries, the per-scene bin that orders them, and the cached
//! list of entries currently visible.

use super::soup::{StatePayload, StateSoup};
use crate::shader_lane::ProgramKey;
use ahash::AHashMap;
use scenery_core::scene::NodeId;
use scenery_data::{StateHandle, StateKind};

/// Index of an entry slot in a [`DrawBin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u32);

/// One renderable unit: a geometry part bound to one handle per kind.
#[derive(Debug, Clone)]
pub struct DrawEntry {
    /// Geometry node that owns the entry.
    pub node: NodeId,
    /// Part of the geometry node.
    pub part: u32,
    /// One handle per state kind, indexed by [`StateKind::index`].
    pub bindings: [StateHandle; StateKind::COUNT],
    /// Program the entry is drawn with.
    pub program: ProgramKey,
    /// Key assigned by the last sort.
    pub sort_key: u64,
    /// Set by removal; the slot is reclaimed by the next sweep.
    pub destroyed: bool,
}

impl DrawEntry {
    /// The handle bound for `kind`.
    pub fn binding(&self, kind: StateKind) -> StateHandle {
        self.bindings[kind.index()]
    }
}

/// Scene tag filter.
///
/// A mask is a list of alternatives separated by `|`. An alternative ending
/// in `*` matches any tag starting with the text before it; any other
/// alternative matches a tag exactly. Untagged entries always pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMask {
    source: String,
    alternatives: Vec<(String, bool)>,
}

impl TagMask {
    /// Parses a mask.
    pub fn new(mask: &str) -> Self {
        let alternatives = mask
            .split('|')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| match a.strip_suffix('*') {
                Some(prefix) => (prefix.to_string(), true),
                None => (a.to_string(), false),
            })
            .collect();
        Self {
            source: mask.to_string(),
            alternatives,
        }
    }

    /// The mask text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether an entry with `tag` passes the mask.
    pub fn matches(&self, tag: Option<&str>) -> bool {
        let Some(tag) = tag else {
            return true;
        };
        self.alternatives.iter().any(|(text, prefix)| {
            if *prefix {
                tag.starts_with(text.as_str())
            } else {
                tag == text
            }
        })
    }
}

/// The ordered draw list of one scene.
///
/// Removal only flags entries; [`sweep`](Self::sweep) reclaims their slots
/// before the next render. Every change that can alter what a player sees
/// between two consecutive entries bumps [`version`](Self::version), which
/// invalidates cached command lists.
#[derive(Debug, Default)]
pub struct DrawBin {
    entries: Vec<Option<DrawEntry>>,
    free: Vec<u32>,
    order: Vec<EntryId>,
    by_node: AHashMap<NodeId, Vec<EntryId>>,
    visible: Option<Vec<EntryId>>,
    tag_mask: Option<TagMask>,
    needs_sweep: bool,
    needs_sort: bool,
    version: u64,
}

impl DrawBin {
    /// Creates an empty bin.
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Default::default()
        }
    }

    /// Appends an entry and indexes it by its node.
    pub fn insert(&mut self, entry: DrawEntry) -> EntryId {
        let node = entry.node;
        let id = match self.free.pop() {
            Some(index) => {
                self.entries[index as usize] = Some(entry);
                EntryId(index)
            }
            None => {
                self.entries.push(Some(entry));
                EntryId(self.entries.len() as u32 - 1)
            }
        };
        self.order.push(id);
        self.by_node.entry(node).or_default().push(id);
        self.needs_sort = true;
        self.invalidate();
        id
    }

    /// Looks an entry up, destroyed or not.
    pub fn get(&self, id: EntryId) -> Option<&DrawEntry> {
        self.entries.get(id.0 as usize)?.as_ref()
    }

    /// Mutable access; callers must [`touch`](Self::touch) after changing bindings.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut DrawEntry> {
        self.entries.get_mut(id.0 as usize)?.as_mut()
    }

    /// Live entries owned by a node, in part order.
    pub fn entries_of(&self, node: NodeId) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self
            .by_node
            .get(&node)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.get(*id).is_some_and(|e| !e.destroyed))
                    .collect()
            })
            .unwrap_or_default();
        ids.sort_by_key(|id| self.get(*id).map(|e| e.part));
        ids
    }

    /// Flags an entry destroyed and returns it so its references can be released.
    pub fn mark_destroyed(&mut self, id: EntryId) -> Option<DrawEntry> {
        let entry = self.get_mut(id)?;
        if entry.destroyed {
            return None;
        }
        entry.destroyed = true;
        let snapshot = entry.clone();
        if let Some(ids) = self.by_node.get_mut(&snapshot.node) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.by_node.remove(&snapshot.node);
            }
        }
        self.needs_sweep = true;
        self.invalidate();
        Some(snapshot)
    }

    /// Drops destroyed entries from the order and frees their slots.
    ///
    /// Returns the reclaimed ids so per-entry caches can be cleared.
    pub fn sweep(&mut self) -> Vec<EntryId> {
        if !self.needs_sweep {
            return Vec::new();
        }
        self.needs_sweep = false;
        let mut reclaimed = Vec::new();
        let entries = &mut self.entries;
        self.order.retain(|id| {
            let destroyed = entries
                .get(id.0 as usize)
                .and_then(Option::as_ref)
                .map_or(true, |e| e.destroyed);
            if destroyed {
                if let Some(slot) = entries.get_mut(id.0 as usize) {
                    *slot = None;
                }
                reclaimed.push(*id);
            }
            !destroyed
        });
        self.free.extend(reclaimed.iter().map(|id| id.0));
        if !reclaimed.is_empty() {
            log::trace!("Swept {} destroyed draw-list entries", reclaimed.len());
        }
        reclaimed
    }

    /// Entry ids in draw order, destroyed ones included until swept.
    pub fn order(&self) -> &[EntryId] {
        &self.order
    }

    /// Replaces the draw order after sorting.
    pub fn set_order(&mut self, order: Vec<EntryId>) {
        self.order = order;
        self.needs_sort = false;
        self.invalidate();
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .filter(|e| !e.destroyed)
            .count()
    }

    /// Whether the bin holds no live entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether new entries arrived since the last sort.
    pub fn needs_sort(&self) -> bool {
        self.needs_sort
    }

    /// Requests a resort before the next render.
    pub fn request_sort(&mut self) {
        self.needs_sort = true;
    }

    /// Changes the tag mask; only the visible cache is affected.
    pub fn set_tag_mask(&mut self, mask: Option<TagMask>) {
        if self.tag_mask != mask {
            self.tag_mask = mask;
            self.invalidate();
        }
    }

    /// The current tag mask.
    pub fn tag_mask(&self) -> Option<&TagMask> {
        self.tag_mask.as_ref()
    }

    /// Bumps the version after an entry's bindings changed in place.
    pub fn touch(&mut self) {
        self.version += 1;
    }

    /// Drops the visible cache and bumps the version.
    pub fn invalidate(&mut self) {
        self.visible = None;
        self.version += 1;
    }

    /// Counter identifying the current structure of the bin.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the visible cache is currently built.
    pub fn visible_cached(&self) -> bool {
        self.visible.is_some()
    }

    /// Entries to draw, rebuilding the cache if it was invalidated.
    ///
    /// An entry is visible when it is not destroyed, its flags and layer are
    /// enabled and its tag passes the mask.
    pub fn visible(&mut self, soup: &StateSoup) -> &[EntryId] {
        if self.visible.is_none() {
            let list: Vec<EntryId> = self
                .order
                .iter()
                .copied()
                .filter(|id| {
                    self.get(*id)
                        .is_some_and(|e| !e.destroyed && self.passes(e, soup))
                })
                .collect();
            log::trace!("Rebuilt visible cache: {} entries", list.len());
            self.visible = Some(list);
        }
        self.visible.as_deref().unwrap_or(&[])
    }

    fn passes(&self, entry: &DrawEntry, soup: &StateSoup) -> bool {
        let flags = soup
            .get(entry.binding(StateKind::Flags))
            .and_then(StatePayload::flags);
        if flags.is_some_and(|f| !f.enabled) {
            return false;
        }
        let layer = soup
            .get(entry.binding(StateKind::Layer))
            .and_then(StatePayload::layer);
        if layer.is_some_and(|l| !l.enabled) {
            return false;
        }
        match &self.tag_mask {
            Some(mask) => {
                let tag = soup
                    .get(entry.binding(StateKind::Tag))
                    .and_then(StatePayload::tag)
                    .and_then(|t| t.tag.as_deref());
                mask.matches(tag)
            }
            None => true,
        }
    }

    /// Empties the bin, returning every live entry for release.
    pub fn drain(&mut self) -> Vec<DrawEntry> {
        let live = self
            .entries
            .drain(..)
            .flatten()
            .filter(|e| !e.destroyed)
            .collect();
        self.free.clear();
        self.order.clear();
        self.by_node.clear();
        self.needs_sweep = false;
        self.needs_sort = false;
        self.invalidate();
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(soup: &StateSoup, node: u32, part: u32) -> DrawEntry {
        let bindings = std::array::from_fn(|i| {
            soup.default_handle(StateKind::ALL[i]).unwrap_or(StateHandle {
                kind: StateKind::ALL[i],
                index: 0,
                generation: 0,
            })
        });
        DrawEntry {
            node: NodeId {
                index: node,
                generation: 0,
            },
            part,
            bindings,
            program: ProgramKey(0),
            sort_key: 0,
            destroyed: false,
        }
    }

    #[test]
    fn test_tag_mask_matches_exact_and_prefix_alternatives() {
        let mask = TagMask::new("red|blu*");
        assert!(mask.matches(Some("red")));
        assert!(mask.matches(Some("blue")));
        assert!(!mask.matches(Some("reddish")));
        assert!(!mask.matches(Some("green")));
        assert!(mask.matches(None));
    }

    #[test]
    fn test_destroyed_entries_leave_on_sweep_and_slots_are_reused() {
        let soup = StateSoup::new();
        let mut bin = DrawBin::new();
        let a = bin.insert(entry(&soup, 1, 0));
        let b = bin.insert(entry(&soup, 2, 0));

        assert!(bin.mark_destroyed(a).is_some());
        assert!(bin.mark_destroyed(a).is_none());
        assert_eq!(bin.order().len(), 2);
        assert_eq!(bin.visible(&soup), &[b]);

        assert_eq!(bin.sweep(), vec![a]);
        assert_eq!(bin.order(), &[b]);
        let c = bin.insert(entry(&soup, 3, 0));
        assert_eq!(c, a);
    }

    #[test]
    fn test_entries_of_returns_parts_in_order() {
        let soup = StateSoup::new();
        let mut bin = DrawBin::new();
        let p1 = bin.insert(entry(&soup, 7, 1));
        let p0 = bin.insert(entry(&soup, 7, 0));
        let node = NodeId {
            index: 7,
            generation: 0,
        };
        assert_eq!(bin.entries_of(node), vec![p0, p1]);
    }

    #[test]
    fn test_changing_the_mask_invalidates_only_the_visible_cache() {
        let soup = StateSoup::new();
        let mut bin = DrawBin::new();
        bin.insert(entry(&soup, 1, 0));
        bin.visible(&soup);
        let version = bin.version();
        assert!(bin.visible_cached());

        bin.set_tag_mask(Some(TagMask::new("a")));
        assert!(!bin.visible_cached());
        assert!(bin.version() > version);
        assert_eq!(bin.len(), 1);
    }
}
