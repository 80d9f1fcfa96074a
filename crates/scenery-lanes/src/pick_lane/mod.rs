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

//! Picking: identity and depth codecs, and the off-screen pick passes.

mod codec;
mod picker;

pub use self::codec::{
    decode_pick_index, encode_pick_index, pack_depth, pick_color, unpack_depth,
    unpack_depth_bytes, MAX_PICK_INDEX,
};
pub use self::picker::{unproject, PickHit, Picker};
