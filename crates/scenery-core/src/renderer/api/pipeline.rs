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

//! Fixed-function pipeline flags applied before a draw.

use serde::{Deserialize, Serialize};

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullFace {
    /// Draw both sides.
    None,
    /// Cull back faces.
    #[default]
    Back,
    /// Cull front faces.
    Front,
}

/// Winding order considered front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrontFace {
    /// Counter-clockwise.
    #[default]
    Ccw,
    /// Clockwise.
    Cw,
}

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthFunc {
    /// Never passes.
    Never,
    /// Passes if the incoming depth is less than the stored one.
    #[default]
    Less,
    /// Passes if equal.
    Equal,
    /// Passes if less or equal.
    LessEqual,
    /// Passes if greater.
    Greater,
    /// Passes if not equal.
    NotEqual,
    /// Passes if greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

impl DepthFunc {
    /// Evaluates the comparison for an incoming fragment depth.
    pub fn passes(&self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthFunc::Never => false,
            DepthFunc::Less => incoming < stored,
            DepthFunc::Equal => incoming == stored,
            DepthFunc::LessEqual => incoming <= stored,
            DepthFunc::Greater => incoming > stored,
            DepthFunc::NotEqual => incoming != stored,
            DepthFunc::GreaterEqual => incoming >= stored,
            DepthFunc::Always => true,
        }
    }
}

/// Source/destination factors of a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source alpha.
    SrcAlpha,
    /// `1 - source alpha`.
    OneMinusSrcAlpha,
    /// Destination alpha.
    DstAlpha,
    /// `1 - destination alpha`.
    OneMinusDstAlpha,
}

/// A blend equation, `src * sfactor + dst * dfactor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendFunc {
    /// Factor applied to the incoming fragment.
    pub src: BlendFactor,
    /// Factor applied to the stored pixel.
    pub dst: BlendFactor,
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self {
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

/// The per-draw pipeline flags a [`GpuDevice`](crate::renderer::GpuDevice) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    /// Face culling mode.
    pub cull_face: CullFace,
    /// Front-face winding.
    pub front_face: FrontFace,
    /// Whether depth testing is enabled.
    pub depth_test: bool,
    /// Depth comparison used when testing.
    pub depth_func: DepthFunc,
    /// Blend equation, or `None` for opaque output.
    pub blend: Option<BlendFunc>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            cull_face: CullFace::Back,
            front_face: FrontFace::Ccw,
            depth_test: true,
            depth_func: DepthFunc::Less,
            blend: None,
        }
    }
}
