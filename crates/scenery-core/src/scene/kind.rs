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

use serde::{Deserialize, Serialize};

/// The type tag of a scene node.
///
/// Every kind derives from [`NodeKind::Node`]; the compile configuration
/// table consults the base entry before the kind's own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The plain grouping node every other kind derives from.
    Node,
    /// The root of a scene.
    Scene,
    /// Translation of the model transform.
    Translate,
    /// Rotation of the model transform.
    Rotate,
    /// Scaling of the model transform.
    Scale,
    /// An arbitrary model matrix.
    Matrix,
    /// The view transform.
    LookAt,
    /// The projection transform.
    Camera,
    /// A group of light sources.
    Lights,
    /// Surface material.
    Material,
    /// One or more texture layers.
    Texture,
    /// Clipping planes.
    Clips,
    /// Color scale/add/saturation applied to output pixels.
    ColorTransform,
    /// Morph-target animation.
    Morph,
    /// Rendering flags (enabled, picking, culling...).
    Flags,
    /// Render-order priority.
    Layer,
    /// A tag filtered by the scene tag mask.
    Tag,
    /// User shader code hooks.
    Shader,
    /// Uniform values consumed by user shader code.
    ShaderParams,
    /// Redirects rendering into an off-screen target.
    FrameBuf,
    /// A pickable name.
    Name,
    /// Per-subtree renderer properties (depth/blend functions, point size).
    Renderer,
    /// Callbacks fired when the geometry below is drawn.
    RenderListeners,
    /// Renderable geometry.
    Geometry,
}

impl NodeKind {
    /// Every kind, base kind first.
    pub const ALL: [NodeKind; 24] = [
        NodeKind::Node,
        NodeKind::Scene,
        NodeKind::Translate,
        NodeKind::Rotate,
        NodeKind::Scale,
        NodeKind::Matrix,
        NodeKind::LookAt,
        NodeKind::Camera,
        NodeKind::Lights,
        NodeKind::Material,
        NodeKind::Texture,
        NodeKind::Clips,
        NodeKind::ColorTransform,
        NodeKind::Morph,
        NodeKind::Flags,
        NodeKind::Layer,
        NodeKind::Tag,
        NodeKind::Shader,
        NodeKind::ShaderParams,
        NodeKind::FrameBuf,
        NodeKind::Name,
        NodeKind::Renderer,
        NodeKind::RenderListeners,
        NodeKind::Geometry,
    ];

    /// The kind this kind derives from; `None` for [`NodeKind::Node`].
    pub fn base(&self) -> Option<NodeKind> {
        match self {
            NodeKind::Node => None,
            _ => Some(NodeKind::Node),
        }
    }

    /// Stable lowercase name used in logs and signatures.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Node => "node",
            NodeKind::Scene => "scene",
            NodeKind::Translate => "translate",
            NodeKind::Rotate => "rotate",
            NodeKind::Scale => "scale",
            NodeKind::Matrix => "matrix",
            NodeKind::LookAt => "lookAt",
            NodeKind::Camera => "camera",
            NodeKind::Lights => "lights",
            NodeKind::Material => "material",
            NodeKind::Texture => "texture",
            NodeKind::Clips => "clips",
            NodeKind::ColorTransform => "colorTransform",
            NodeKind::Morph => "morph",
            NodeKind::Flags => "flags",
            NodeKind::Layer => "layer",
            NodeKind::Tag => "tag",
            NodeKind::Shader => "shader",
            NodeKind::ShaderParams => "shaderParams",
            NodeKind::FrameBuf => "frameBuf",
            NodeKind::Name => "name",
            NodeKind::Renderer => "renderer",
            NodeKind::RenderListeners => "renderListeners",
            NodeKind::Geometry => "geometry",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A mutation applied to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOp {
    /// The node was attached under a parent.
    Add,
    /// The node (and its subtree) was detached.
    Remove,
    /// An attribute of the node changed.
    Set,
    /// The node was created.
    Create,
    /// The node was destroyed.
    Destroy,
    /// An asynchronous resource of the node finished loading.
    Loaded,
}
