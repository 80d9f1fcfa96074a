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

//! Error type of the render hot path.

use scenery_core::renderer::{ResourceError, ShaderError};
use scenery_data::StateKind;
use thiserror::Error;

/// Failures raised while building, sorting or playing a draw list.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A program for a new signature failed to compile or link.
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// A buffer, texture or framebuffer could not be created or destroyed.
    #[error("GPU resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The scene holds an entry whose program failed to build.
    #[error("Scene is unrenderable: no program for signature '{signature}'")]
    Unrenderable {
        /// The state signature whose program is missing.
        signature: String,
    },

    /// An entry references a state handle that was already evicted.
    #[error("Stale {kind:?} handle bound to a draw-list entry")]
    StaleHandle {
        /// Kind of the stale handle.
        kind: StateKind,
    },
}

impl RenderError {
    /// The state signature the error relates to, if any.
    pub fn signature(&self) -> Option<&str> {
        match self {
            RenderError::Shader(e) => Some(e.label()),
            RenderError::Unrenderable { signature } => Some(signature),
            _ => None,
        }
    }
}

/// Result alias of the render lanes.
pub type RenderResult<T> = Result<T, RenderError>;
