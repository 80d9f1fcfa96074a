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

//! Payloads of the small, self-contained state kinds.

use glam::{Mat4, Vec3, Vec4};
use scenery_core::renderer::{BlendFunc, DepthFunc, FramebufferId, FrontFace};
use serde::{Deserialize, Serialize};

/// A composed transform and its normal matrix.
///
/// Used for the model, view and projection kinds alike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    /// The composed matrix.
    pub matrix: Mat4,
    /// Inverse-transpose of `matrix`, for transforming normals.
    pub normal_matrix: Mat4,
}

impl TransformState {
    /// Builds a transform and derives its normal matrix.
    pub fn new(matrix: Mat4) -> Self {
        let normal_matrix = if matrix.determinant().abs() > f32::EPSILON {
            matrix.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            matrix,
            normal_matrix,
        }
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

/// Surface reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialState {
    /// Diffuse color.
    pub base_color: Vec3,
    /// Color of specular highlights.
    pub specular_color: Vec3,
    /// Specular intensity.
    pub specular: f32,
    /// Specular exponent.
    pub shine: f32,
    /// Emissive intensity.
    pub emit: f32,
    /// Opacity.
    pub alpha: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            specular_color: Vec3::ONE,
            specular: 1.0,
            shine: 70.0,
            emit: 0.0,
            alpha: 1.0,
        }
    }
}

/// How a clip plane discards fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMode {
    /// The plane is ignored.
    #[default]
    Disabled,
    /// Fragments on the positive side are kept.
    Inside,
    /// Fragments on the positive side are discarded.
    Outside,
}

impl ClipMode {
    /// Value of the per-plane mode uniform.
    pub fn as_uniform(&self) -> i32 {
        match self {
            ClipMode::Disabled => 0,
            ClipMode::Inside => 1,
            ClipMode::Outside => 2,
        }
    }
}

/// One world-space clipping plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlane {
    /// Discard mode.
    pub mode: ClipMode,
    /// Plane normal.
    pub normal: Vec3,
    /// Signed distance from the origin.
    pub dist: f32,
}

/// Every clip plane active at a traversal position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipState {
    /// Planes, outermost first.
    pub planes: Vec<ClipPlane>,
}

/// Per-pixel color adjustment applied after shading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorTransformState {
    /// Component-wise multiplier.
    pub scale: Vec4,
    /// Component-wise offset.
    pub add: Vec4,
    /// Saturation adjustment in `[-1, 1]`.
    pub saturation: f32,
}

impl ColorTransformState {
    /// Whether applying the transform would leave colors untouched.
    pub fn is_identity(&self) -> bool {
        self.scale == Vec4::ONE && self.add == Vec4::ZERO && self.saturation == 0.0
    }
}

impl Default for ColorTransformState {
    fn default() -> Self {
        Self {
            scale: Vec4::ONE,
            add: Vec4::ZERO,
            saturation: 0.0,
        }
    }
}

/// Rendering switches inherited down the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagsState {
    /// Whether geometry is drawn at all.
    pub enabled: bool,
    /// Whether geometry takes part in picking.
    pub picking: bool,
    /// Whether clip planes apply.
    pub clipping: bool,
    /// Whether geometry is blended as transparent.
    pub transparent: bool,
    /// Whether back faces are drawn.
    pub backfaces: bool,
    /// Winding treated as front-facing.
    pub front_face: FrontFace,
    /// Whether back faces are lit.
    pub backface_lighting: bool,
    /// Whether back faces are textured.
    pub backface_texturing: bool,
    /// Whether specular highlights are computed.
    pub specular: bool,
}

impl Default for FlagsState {
    fn default() -> Self {
        Self {
            enabled: true,
            picking: true,
            clipping: true,
            transparent: false,
            backfaces: true,
            front_face: FrontFace::Ccw,
            backface_lighting: true,
            backface_texturing: true,
            specular: true,
        }
    }
}

/// Flags set by one flags node; unset fields are inherited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagsOverride {
    /// See [`FlagsState::enabled`].
    pub enabled: Option<bool>,
    /// See [`FlagsState::picking`].
    pub picking: Option<bool>,
    /// See [`FlagsState::clipping`].
    pub clipping: Option<bool>,
    /// See [`FlagsState::transparent`].
    pub transparent: Option<bool>,
    /// See [`FlagsState::backfaces`].
    pub backfaces: Option<bool>,
    /// See [`FlagsState::front_face`].
    pub front_face: Option<FrontFace>,
    /// See [`FlagsState::backface_lighting`].
    pub backface_lighting: Option<bool>,
    /// See [`FlagsState::backface_texturing`].
    pub backface_texturing: Option<bool>,
    /// See [`FlagsState::specular`].
    pub specular: Option<bool>,
}

impl FlagsOverride {
    /// Merges the set fields over `base`.
    pub fn apply(&self, base: &FlagsState) -> FlagsState {
        FlagsState {
            enabled: self.enabled.unwrap_or(base.enabled),
            picking: self.picking.unwrap_or(base.picking),
            clipping: self.clipping.unwrap_or(base.clipping),
            transparent: self.transparent.unwrap_or(base.transparent),
            backfaces: self.backfaces.unwrap_or(base.backfaces),
            front_face: self.front_face.unwrap_or(base.front_face),
            backface_lighting: self.backface_lighting.unwrap_or(base.backface_lighting),
            backface_texturing: self.backface_texturing.unwrap_or(base.backface_texturing),
            specular: self.specular.unwrap_or(base.specular),
        }
    }
}

/// Render-order priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerState {
    /// Lower priorities render first.
    pub priority: i32,
    /// Whether the layer is drawn.
    pub enabled: bool,
}

impl Default for LayerState {
    fn default() -> Self {
        Self {
            priority: 0,
            enabled: true,
        }
    }
}

/// Tag tested against the scene tag mask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagState {
    /// `None` when no tag node is in scope.
    pub tag: Option<String>,
}

/// Name reported by picking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NameState {
    /// `None` when no name node is in scope; such geometry is never a pick hit.
    pub name: Option<String>,
}

/// Fixed-function settings of a subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererState {
    /// Depth comparison.
    pub depth_func: DepthFunc,
    /// Blend equation used for transparent geometry.
    pub blend: Option<BlendFunc>,
    /// Color the render target is cleared to.
    pub clear_color: Vec4,
    /// Rasterized point size.
    pub point_size: f32,
}

impl RendererState {
    /// Whether the point size differs from the rasterizer default.
    pub fn has_point_size(&self) -> bool {
        (self.point_size - 1.0).abs() > f32::EPSILON
    }
}

impl Default for RendererState {
    fn default() -> Self {
        Self {
            depth_func: DepthFunc::Less,
            blend: None,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            point_size: 1.0,
        }
    }
}

/// Renderer settings of one renderer node; unset fields are inherited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOverride {
    /// See [`RendererState::depth_func`].
    pub depth_func: Option<DepthFunc>,
    /// See [`RendererState::blend`].
    pub blend: Option<BlendFunc>,
    /// See [`RendererState::clear_color`].
    pub clear_color: Option<Vec4>,
    /// See [`RendererState::point_size`].
    pub point_size: Option<f32>,
}

impl RendererOverride {
    /// Merges the set fields over `base`.
    pub fn apply(&self, base: &RendererState) -> RendererState {
        RendererState {
            depth_func: self.depth_func.unwrap_or(base.depth_func),
            blend: self.blend.or(base.blend),
            clear_color: self.clear_color.unwrap_or(base.clear_color),
            point_size: self.point_size.unwrap_or(base.point_size),
        }
    }
}

/// Identifies a callback registered with the render agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

/// Listeners fired when geometry below them is drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderListenersState {
    /// Listener ids, outermost first.
    pub listeners: Vec<ListenerId>,
}

/// Off-screen render target of a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramebufferState {
    /// `None` renders to the canvas.
    pub framebuffer: Option<FramebufferId>,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Revision of the node the target was allocated for.
    pub revision: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flags_override_only_touches_set_fields() {
        let base = FlagsState::default();
        let merged = FlagsOverride {
            picking: Some(false),
            transparent: Some(true),
            ..Default::default()
        }
        .apply(&base);

        assert!(!merged.picking);
        assert!(merged.transparent);
        assert!(merged.enabled);
        assert_eq!(merged.front_face, base.front_face);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_inverse_scale() {
        let state = TransformState::new(Mat4::from_scale(Vec3::splat(2.0)));
        assert_relative_eq!(state.normal_matrix.x_axis.x, 0.5);
    }

    #[test]
    fn test_singular_matrix_falls_back_to_identity_normals() {
        let state = TransformState::new(Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)));
        assert_eq!(state.normal_matrix, Mat4::IDENTITY);
    }

    #[test]
    fn test_renderer_override_reports_point_size() {
        let merged = RendererOverride {
            point_size: Some(4.0),
            ..Default::default()
        }
        .apply(&RendererState::default());
        assert!(merged.has_point_size());
        assert!(!RendererState::default().has_point_size());
    }
}
