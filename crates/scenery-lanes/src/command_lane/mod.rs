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

//! Command lists: building them with redundant state elided, caching them
//! per entry and replaying them.

mod arena;
mod command;
mod player;

pub use self::arena::CommandArena;
pub use self::command::{pipeline_state, AttributeSlot, Command, UniformSlot};
pub use self::player::{CommandPlayer, FrameStats};

/// What a pass writes into its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Shaded colors.
    Draw,
    /// Pick indices encoded as colors.
    Pick,
    /// Packed depth encoded as colors.
    RayPick,
}

impl RenderMode {
    fn index(self) -> usize {
        match self {
            RenderMode::Draw => 0,
            RenderMode::Pick => 1,
            RenderMode::RayPick => 2,
        }
    }

    /// Whether the pass uses the pick programs.
    pub fn is_pick(self) -> bool {
        !matches!(self, RenderMode::Draw)
    }
}
