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

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use scenery_data::{StateHandle, StateKind};
use scenery_lanes::draw_lane::EntryId;
use scenery_lanes::sort_lane::{RankedSortLane, SimpleSortLane, SortItem, SortLane};

fn handle(kind: StateKind, index: u32) -> StateHandle {
    StateHandle {
        kind,
        index,
        generation: 0,
    }
}

fn items(count: u32) -> Vec<SortItem> {
    (0..count)
        .map(|i| SortItem {
            id: EntryId(i),
            layer: (i % 4) as i32 - 2,
            program: i % 17,
            texture: handle(StateKind::Texture, i % 31),
            geometry: handle(StateKind::Geometry, i),
            sort_key: 0,
        })
        .collect()
}

fn bench_sort(c: &mut Criterion) {
    let input = items(10_000);
    let mut group = c.benchmark_group("Bin Sort");

    let lanes: [(&str, &dyn SortLane); 2] = [("Simple", &SimpleSortLane), ("Ranked", &RankedSortLane)];
    for (name, lane) in lanes {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut work = input.clone();
                lane.assign_keys(&mut work);
                work.sort_by_key(|item| item.sort_key);
                black_box(work);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sort);
criterion_main!(benches);
