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

use crate::scene::{PassLevel, SceneId};

/// Lifecycle and diagnostics events for scenes.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A scene was created; its scheduler starts with a full compile pending.
    SceneCreated {
        /// The new scene.
        scene: SceneId,
    },
    /// A scene was destroyed; its draw list, pools and programs are released.
    SceneDestroyed {
        /// The destroyed scene.
        scene: SceneId,
    },
    /// A compile pass is about to traverse the scene.
    SceneCompiling {
        /// The scene being compiled.
        scene: SceneId,
        /// The granularity chosen for this pass.
        level: PassLevel,
    },
    /// The draw list of a scene is about to be played.
    SceneRendering {
        /// The scene being rendered.
        scene: SceneId,
    },
    /// Every scene must drop its cached compile state and recompile from scratch.
    Reset,
    /// A shader or GPU resource failure.
    Error {
        /// The scene that hit the failure.
        scene: SceneId,
        /// Human-readable description including the offending signature.
        message: String,
    },
}
