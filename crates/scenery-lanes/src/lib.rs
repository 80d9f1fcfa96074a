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

//! # Scenery Lanes
//!
//! Hot-path pipelines of the render-scheduling core: compile scheduling,
//! draw-list building over the state soup, shader signatures and the program
//! cache, bin sorting, command playback and picking.

#![warn(missing_docs)]

pub mod command_lane;
pub mod compile_lane;
pub mod draw_lane;
pub mod error;
pub mod pick_lane;
pub mod shader_lane;
pub mod sort_lane;

#[cfg(test)]
mod test_support;

pub use error::{RenderError, RenderResult};
