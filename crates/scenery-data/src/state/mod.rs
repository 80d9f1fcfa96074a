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

//! State kinds, their payloads, and the stacks traversal pushes them onto.
//!
//! Payload types come in two flavours. Pure values (materials, flags,
//! layers...) are stored in the pools as they are. Kinds that own device
//! resources (geometry, textures, morph targets, framebuffers) have an
//! uploaded form carrying buffer or texture ids plus the revision of the node
//! they were uploaded from.

mod geometry;
mod kind;
mod lighting;
mod shader;
mod stacks;
mod surface;
mod texture;

pub use self::geometry::*;
pub use self::kind::StateKind;
pub use self::lighting::*;
pub use self::shader::*;
pub use self::stacks::{ExportedState, StateContribution, StateSource, StateStacks, StateValue};
pub use self::surface::*;
pub use self::texture::*;
