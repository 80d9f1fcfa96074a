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

//! Identifiers and vocabulary of the scene tree as seen by the compiler.
//!
//! The scene tree itself lives in `scenery-data`; this module only defines
//! what the scheduler needs to reason about mutations: which node, which kind
//! of node, which operation, and how expensive the resulting recompile is.

mod error;
mod ids;
mod kind;
mod level;

pub use self::error::SceneError;
pub use self::ids::{NodeId, SceneId};
pub use self::kind::{NodeKind, NodeOp};
pub use self::level::{CompileLevel, PassLevel};
