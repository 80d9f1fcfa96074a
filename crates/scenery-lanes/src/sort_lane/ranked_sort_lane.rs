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

//! Layer, program, texture and geometry, each replaced by a dense rank.

use super::{SortItem, SortLane};
use ahash::AHashMap;
use std::hash::Hash;

/// Assigns dense ranks `0..n` to distinct values in order of first appearance.
fn first_seen_ranks<T: Copy + Eq + Hash>(values: impl Iterator<Item = T>) -> AHashMap<T, u64> {
    let mut ranks = AHashMap::new();
    for value in values {
        let next = ranks.len() as u64;
        ranks.entry(value).or_insert(next);
    }
    ranks
}

/// Sorts by a mixed-radix key over layer, program, texture and geometry ranks.
///
/// Program, texture and geometry ranks are dense in bin order; layers are
/// ranked by ascending priority so the layer digit preserves priority order.
/// Key: `((layer * P + program) * T + texture) * G + geometry`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankedSortLane;

impl SortLane for RankedSortLane {
    fn strategy_name(&self) -> &'static str {
        "Ranked"
    }

    fn assign_keys(&self, items: &mut [SortItem]) {
        let programs = first_seen_ranks(items.iter().map(|i| i.program));
        let textures = first_seen_ranks(items.iter().map(|i| i.texture));
        let geometries = first_seen_ranks(items.iter().map(|i| i.geometry));
        let mut priorities: Vec<i32> = items.iter().map(|i| i.layer).collect();
        priorities.sort_unstable();
        priorities.dedup();

        let p = programs.len().max(1) as u64;
        let t = textures.len().max(1) as u64;
        let g = geometries.len().max(1) as u64;
        for item in items.iter_mut() {
            let layer = priorities.binary_search(&item.layer).unwrap_or(0) as u64;
            let program = programs.get(&item.program).copied().unwrap_or(0);
            let texture = textures.get(&item.texture).copied().unwrap_or(0);
            let geometry = geometries.get(&item.geometry).copied().unwrap_or(0);
            item.sort_key = ((layer * p + program) * t + texture) * g + geometry;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort_lane::tests::{item, sorted};

    #[test]
    fn test_ranks_follow_first_appearance() {
        let ranks = first_seen_ranks([7, 3, 7, 9].into_iter());
        assert_eq!(ranks[&7], 0);
        assert_eq!(ranks[&3], 1);
        assert_eq!(ranks[&9], 2);
    }

    #[test]
    fn test_textures_cluster_within_a_program() {
        let out = sorted(
            &RankedSortLane,
            vec![
                item(0, 0, 1, 0, 0),
                item(1, 0, 1, 1, 1),
                item(2, 0, 1, 0, 2),
                item(3, 0, 2, 0, 3),
            ],
        );
        let ids: Vec<u32> = out.iter().map(|i| i.id.0).collect();
        assert_eq!(ids, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_keys_are_unique_for_distinct_criteria() {
        let mut items = vec![
            item(0, 0, 0, 0, 0),
            item(1, 0, 0, 1, 0),
            item(2, 0, 1, 0, 0),
            item(3, 1, 0, 0, 0),
        ];
        RankedSortLane.assign_keys(&mut items);
        let mut keys: Vec<u64> = items.iter().map(|i| i.sort_key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }
}
