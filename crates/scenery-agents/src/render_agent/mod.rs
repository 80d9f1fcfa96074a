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

//! Acts as the agent of the rendering subsystem.
//!
//! This module owns the per-scene state and drives the lanes in order for
//! every frame:
//! - asks the compile scheduler how much of the tree must be re-traversed;
//! - walks the tree depth-first, pushing each node's state, exporting the
//!   dirty stack tops into the state soup and binding geometry into the bin;
//! - re-sorts the bin when entries arrived or layer priorities changed;
//! - replays or rebuilds each visible entry's command list on the device.
//!
//! Picking re-uses the same entries with the pick and ray-pick programs.

mod agent;
mod context;
mod traversal;

pub use self::agent::{RenderAgent, RenderStats};
pub use self::context::SceneCompileContext;
