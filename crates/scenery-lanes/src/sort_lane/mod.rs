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

//! Bin sorting strategies.
//!
//! Sorting clusters entries so the command player switches expensive state
//! as rarely as possible. Every strategy keeps layer priorities
//! non-decreasing; they differ in how they order within a layer.

mod ranked_sort_lane;
mod simple_sort_lane;

pub use ranked_sort_lane::*;
pub use simple_sort_lane::*;

use crate::draw_lane::{DrawBin, EntryId, StatePayload, StateSoup};
use scenery_core::SortPolicy;
use scenery_data::{StateHandle, StateKind};

/// The sort criteria of one live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortItem {
    /// The entry.
    pub id: EntryId,
    /// Priority of its layer.
    pub layer: i32,
    /// Dense id of its program.
    pub program: u32,
    /// Its texture handle.
    pub texture: StateHandle,
    /// Its geometry handle.
    pub geometry: StateHandle,
    /// Key assigned by the strategy.
    pub sort_key: u64,
}

/// A strategy assigning sort keys to the items of a bin.
pub trait SortLane: Send + Sync {
    /// Human-readable identifier of the strategy.
    fn strategy_name(&self) -> &'static str;

    /// Assigns `sort_key` on every item. Items arrive in bin order.
    fn assign_keys(&self, items: &mut [SortItem]);
}

/// The strategy selected by a policy.
pub fn lane_for(policy: SortPolicy) -> Box<dyn SortLane> {
    match policy {
        SortPolicy::Simple => Box::new(SimpleSortLane),
        SortPolicy::Ranked => Box::new(RankedSortLane),
    }
}

/// Sorts the live entries of a bin ascending by key, stable for equal keys.
///
/// Destroyed entries are swept first. Writes each entry's key back and
/// replaces the bin order, which invalidates the visible cache.
pub fn sort(lane: &dyn SortLane, bin: &mut DrawBin, soup: &StateSoup) {
    bin.sweep();
    let mut items: Vec<SortItem> = bin
        .order()
        .iter()
        .filter_map(|&id| {
            let entry = bin.get(id)?;
            let layer = soup
                .get(entry.binding(StateKind::Layer))
                .and_then(StatePayload::layer)
                .map_or(0, |l| l.priority);
            Some(SortItem {
                id,
                layer,
                program: entry.program.0,
                texture: entry.binding(StateKind::Texture),
                geometry: entry.binding(StateKind::Geometry),
                sort_key: 0,
            })
        })
        .collect();

    lane.assign_keys(&mut items);
    items.sort_by_key(|item| item.sort_key);

    for item in &items {
        if let Some(entry) = bin.get_mut(item.id) {
            entry.sort_key = item.sort_key;
        }
    }
    log::debug!(
        "Sorted {} entries with the {} strategy",
        items.len(),
        lane.strategy_name()
    );
    bin.set_order(items.into_iter().map(|item| item.id).collect());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn handle(kind: StateKind, index: u32) -> StateHandle {
        StateHandle {
            kind,
            index,
            generation: 0,
        }
    }

    pub(crate) fn item(id: u32, layer: i32, program: u32, texture: u32, geometry: u32) -> SortItem {
        SortItem {
            id: EntryId(id),
            layer,
            program,
            texture: handle(StateKind::Texture, texture),
            geometry: handle(StateKind::Geometry, geometry),
            sort_key: 0,
        }
    }

    pub(crate) fn sorted(lane: &dyn SortLane, mut items: Vec<SortItem>) -> Vec<SortItem> {
        lane.assign_keys(&mut items);
        items.sort_by_key(|i| i.sort_key);
        items
    }

    #[test]
    fn test_both_strategies_keep_layers_non_decreasing() {
        let items = vec![
            item(0, 3, 0, 0, 0),
            item(1, -2, 5, 1, 1),
            item(2, 0, 1, 0, 2),
            item(3, 3, 2, 1, 3),
            item(4, -2, 0, 0, 4),
        ];
        for policy in [SortPolicy::Simple, SortPolicy::Ranked] {
            let lane = lane_for(policy);
            let out = sorted(lane.as_ref(), items.clone());
            assert!(
                out.windows(2).all(|w| w[0].layer <= w[1].layer),
                "{} broke layer order",
                lane.strategy_name()
            );
        }
    }
}
