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

/// One category of renderable state bound by a draw-list entry.
///
/// The discriminant doubles as the index into per-kind arrays (stacks, dirty
/// bits, entry bindings), so the declaration order is also the order in which
/// a command list emits its commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKind {
    /// Output framebuffer.
    FrameBuf,
    /// Program-independent pipeline flags (depth/blend/point size).
    Renderer,
    /// Projection transform.
    ProjTransform,
    /// View transform.
    ViewTransform,
    /// Model (world) transform.
    ModelTransform,
    /// Accumulated light sources.
    Lights,
    /// Surface material.
    Material,
    /// Texture layers.
    Texture,
    /// Clipping planes.
    Clips,
    /// Output color transform.
    ColorTransform,
    /// Morph targets and factor.
    Morph,
    /// Merged rendering flags.
    Flags,
    /// Render-order layer.
    Layer,
    /// Tag tested against the scene tag mask.
    Tag,
    /// Pickable name.
    Name,
    /// User shader code.
    Shader,
    /// Uniforms consumed by user shader code.
    ShaderParams,
    /// Listeners fired when the entry is drawn.
    RenderListeners,
    /// Vertex and index buffers.
    Geometry,
}

impl StateKind {
    /// Number of state kinds.
    pub const COUNT: usize = 19;

    /// Every kind, in index order.
    pub const ALL: [StateKind; StateKind::COUNT] = [
        StateKind::FrameBuf,
        StateKind::Renderer,
        StateKind::ProjTransform,
        StateKind::ViewTransform,
        StateKind::ModelTransform,
        StateKind::Lights,
        StateKind::Material,
        StateKind::Texture,
        StateKind::Clips,
        StateKind::ColorTransform,
        StateKind::Morph,
        StateKind::Flags,
        StateKind::Layer,
        StateKind::Tag,
        StateKind::Name,
        StateKind::Shader,
        StateKind::ShaderParams,
        StateKind::RenderListeners,
        StateKind::Geometry,
    ];

    /// Array index of the kind.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the kind contributes a fragment to the program signature.
    pub fn affects_program(self) -> bool {
        matches!(
            self,
            StateKind::Lights
                | StateKind::Texture
                | StateKind::Clips
                | StateKind::ColorTransform
                | StateKind::Morph
                | StateKind::Shader
                | StateKind::Renderer
                | StateKind::Geometry
        )
    }

    /// Whether an existing entry may re-attach this kind during a partial pass.
    pub fn reattachable(self) -> bool {
        matches!(self, StateKind::Flags | StateKind::RenderListeners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_index_order() {
        for (i, kind) in StateKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
