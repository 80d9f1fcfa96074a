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

use super::{NodeId, NodeKind};
use std::fmt;

/// A configuration error raised by a scene-tree operation.
///
/// These are fatal to the offending operation only; the tree is left as it
/// was before the call.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The node id is stale or was never issued.
    NodeNotFound(NodeId),
    /// The node kind has no attribute with this name.
    UnknownAttribute {
        /// Kind of the node that was addressed.
        kind: NodeKind,
        /// The attribute that was requested.
        attr: String,
    },
    /// The attribute exists but the value has the wrong shape.
    InvalidValue {
        /// The attribute that was set.
        attr: String,
        /// A description of the accepted value.
        expected: &'static str,
    },
    /// The root of a scene cannot be removed or re-parented.
    RootRemoval,
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::NodeNotFound(id) => write!(f, "Node {id} not found"),
            SceneError::UnknownAttribute { kind, attr } => {
                write!(f, "Node kind '{kind}' has no attribute '{attr}'")
            }
            SceneError::InvalidValue { attr, expected } => {
                write!(f, "Invalid value for '{attr}': expected {expected}")
            }
            SceneError::RootRemoval => write!(f, "The scene root cannot be removed"),
        }
    }
}

impl std::error::Error for SceneError {}
