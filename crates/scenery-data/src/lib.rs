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

//! # Scenery Data
//!
//! Data layouts used while compiling a scene: the generation-checked
//! [`HandlePool`] that owns every state handle, the payload types of each
//! state kind, the per-kind [`StateStacks`] pushed and popped during
//! traversal, and the [`SceneGraph`] tree those stacks are fed from.

#![warn(missing_docs)]

pub mod pool;
pub mod scene;
pub mod state;

pub use pool::{HandlePool, StateHandle, StateKey};
pub use scene::{AttrValue, NodeData, SceneGraph, SceneNode, SceneTopology};
pub use state::{StateKind, StateStacks};
