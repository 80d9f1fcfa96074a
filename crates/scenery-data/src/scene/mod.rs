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

//! The scene-node tree the compile traversal walks.
//!
//! Only what the render core consumes is modelled here: structure,
//! kind-specific attributes and their validation, and a per-node revision
//! counter telling uploaded resources when they went stale.

mod attr;
mod graph;
mod node_data;

pub use self::attr::AttrValue;
pub use self::graph::{SceneGraph, SceneNode, SceneTopology};
pub use self::node_data::{CameraData, NodeData};
