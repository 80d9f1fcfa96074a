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

//! Layer first, then program.

use super::{SortItem, SortLane};

/// Room reserved for program ids inside one layer.
const LAYER_STRIDE: u64 = 1 << 32;

/// Sorts by `layer * LARGE + program`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleSortLane;

impl SimpleSortLane {
    /// Maps a signed priority to an unsigned, order-preserving value.
    fn layer_bits(priority: i32) -> u64 {
        (priority as i64 - i32::MIN as i64) as u64
    }
}

impl SortLane for SimpleSortLane {
    fn strategy_name(&self) -> &'static str {
        "Simple"
    }

    fn assign_keys(&self, items: &mut [SortItem]) {
        for item in items {
            item.sort_key = Self::layer_bits(item.layer) * LAYER_STRIDE + item.program as u64;
        }
    }
}
