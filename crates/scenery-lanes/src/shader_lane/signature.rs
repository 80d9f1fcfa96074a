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

//! Structured program signatures.
//!
//! Each shader-relevant state kind contributes one [`SignaturePart`]. The
//! parts are cached per state handle by the state soup and assembled into a
//! [`StateSignature`] per draw-list entry; the signature's [`key`] is the
//! program cache key and the composer's only input.
//!
//! [`key`]: StateSignature::key

use scenery_core::renderer::Primitive;
use scenery_data::state::{
    ClipState, GeometryState, LightMode, LightSpace, LightsState, MorphState, RendererState,
    ShaderCode, ShaderState, TextureApplyTo, TextureBlendMode, TextureState,
};
use std::fmt::Write;
use std::sync::Arc;

/// What the composer needs to know about one light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightSignature {
    /// Light kind.
    pub mode: LightMode,
    /// Space of position and direction.
    pub space: LightSpace,
    /// Contributes diffuse shading.
    pub diffuse: bool,
    /// Contributes specular highlights.
    pub specular: bool,
}

/// What the composer needs to know about one texture layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureLayerSignature {
    /// Channel modulated.
    pub apply_to: TextureApplyTo,
    /// Combination mode.
    pub blend_mode: TextureBlendMode,
    /// UV set sampled.
    pub uv_set: u32,
}

/// Which vertex arrays a geometry supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometrySignature {
    /// Normals present.
    pub normals: bool,
    /// Primary UVs present.
    pub uvs: bool,
    /// Secondary UVs present.
    pub uvs2: bool,
    /// Vertex colors present.
    pub colors: bool,
    /// Topology drawn.
    pub primitive: Primitive,
}

impl Default for GeometrySignature {
    fn default() -> Self {
        Self {
            normals: false,
            uvs: false,
            uvs2: false,
            colors: false,
            primitive: Primitive::Triangles,
        }
    }
}

/// Which arrays the bound morph targets supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MorphSignature {
    /// Target positions present.
    pub positions: bool,
    /// Target normals present.
    pub normals: bool,
    /// Target UVs present.
    pub uvs: bool,
}

/// The program-relevant summary of one state handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignaturePart {
    /// Number of clip planes.
    Clips(usize),
    /// Whether a color transform is in scope.
    ColorTransform(bool),
    /// Active lights.
    Lights(Vec<LightSignature>),
    /// Bound morph targets.
    Morph(Option<MorphSignature>),
    /// Texture layers.
    Texture(Vec<TextureLayerSignature>),
    /// User shader code and its digest.
    Shader(Option<(u64, Arc<ShaderCode>)>),
    /// Whether a point size is set.
    Renderer(bool),
    /// Vertex arrays.
    Geometry(GeometrySignature),
}

impl SignaturePart {
    /// Summary of a clip state.
    pub fn of_clips(state: &ClipState) -> Self {
        SignaturePart::Clips(state.planes.len())
    }

    /// Summary of a lights state.
    pub fn of_lights(state: &LightsState) -> Self {
        SignaturePart::Lights(
            state
                .lights
                .iter()
                .map(|l| LightSignature {
                    mode: l.mode,
                    space: l.space,
                    diffuse: l.diffuse,
                    specular: l.specular,
                })
                .collect(),
        )
    }

    /// Summary of a morph state.
    pub fn of_morph(state: &MorphState) -> Self {
        SignaturePart::Morph(state.data.as_ref().and_then(|data| {
            let sig = MorphSignature {
                positions: data.has_positions(),
                normals: data.has_normals(),
                uvs: data.has_uvs(),
            };
            (data.targets.len() >= 2 && (sig.positions || sig.normals || sig.uvs)).then_some(sig)
        }))
    }

    /// Summary of a texture state.
    pub fn of_texture(state: &TextureState) -> Self {
        SignaturePart::Texture(
            state
                .layers
                .iter()
                .map(|l| TextureLayerSignature {
                    apply_to: l.layer.apply_to,
                    blend_mode: l.layer.blend_mode,
                    uv_set: l.layer.uv_set,
                })
                .collect(),
        )
    }

    /// Summary of a shader state.
    pub fn of_shader(state: &ShaderState) -> Self {
        SignaturePart::Shader(
            state
                .code
                .as_ref()
                .filter(|c| !c.is_empty())
                .map(|c| (c.digest(), c.clone())),
        )
    }

    /// Summary of a renderer state.
    pub fn of_renderer(state: &RendererState) -> Self {
        SignaturePart::Renderer(state.has_point_size())
    }

    /// Summary of an uploaded geometry part.
    pub fn of_geometry(state: &GeometryState) -> Self {
        SignaturePart::Geometry(GeometrySignature {
            normals: state.vertices.normals.is_some(),
            uvs: state.vertices.uvs.is_some(),
            uvs2: state.vertices.uvs2.is_some(),
            colors: state.vertices.colors.is_some(),
            primitive: state.primitive,
        })
    }
}

/// Everything that selects a program.
///
/// Two entries with equal signatures share one program; the composer is a
/// pure function of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateSignature {
    /// Identity of the canvas the program renders to.
    pub canvas: String,
    /// Number of clip planes.
    pub clip_planes: usize,
    /// Whether a color transform applies.
    pub color_transform: bool,
    /// Active lights, in uniform order.
    pub lights: Vec<LightSignature>,
    /// Bound morph targets.
    pub morph: Option<MorphSignature>,
    /// Texture layers, in application order.
    pub texture: Vec<TextureLayerSignature>,
    /// User shader code.
    pub shader: Option<(u64, Arc<ShaderCode>)>,
    /// Whether the point size uniform is written.
    pub point_size: bool,
    /// Vertex arrays of the geometry.
    pub geometry: GeometrySignature,
}

impl StateSignature {
    /// An empty signature for `canvas`, with no optional state.
    pub fn new(canvas: impl Into<String>) -> Self {
        Self {
            canvas: canvas.into(),
            clip_planes: 0,
            color_transform: false,
            lights: Vec::new(),
            morph: None,
            texture: Vec::new(),
            shader: None,
            point_size: false,
            geometry: GeometrySignature::default(),
        }
    }

    /// Folds one part into the signature.
    pub fn apply(&mut self, part: &SignaturePart) {
        match part {
            SignaturePart::Clips(n) => self.clip_planes = *n,
            SignaturePart::ColorTransform(on) => self.color_transform = *on,
            SignaturePart::Lights(l) => self.lights = l.clone(),
            SignaturePart::Morph(m) => self.morph = *m,
            SignaturePart::Texture(t) => self.texture = t.clone(),
            SignaturePart::Shader(s) => self.shader = s.clone(),
            SignaturePart::Renderer(p) => self.point_size = *p,
            SignaturePart::Geometry(g) => self.geometry = *g,
        }
    }

    /// Whether lighting code is emitted; lighting needs normals.
    pub fn lit(&self) -> bool {
        !self.lights.is_empty() && self.has_normals()
    }

    /// Whether a normal attribute is bound, from geometry or morph targets.
    pub fn has_normals(&self) -> bool {
        self.geometry.normals || self.morph.is_some_and(|m| m.normals)
    }

    /// Whether primary UVs are available, from geometry or morph targets.
    pub fn has_uvs(&self) -> bool {
        self.geometry.uvs || self.morph.is_some_and(|m| m.uvs)
    }

    /// Whether texture layers are sampled at all.
    pub fn textured(&self) -> bool {
        self.texture
            .iter()
            .any(|l| self.uv_available(l.uv_set))
    }

    /// Whether the UV set a layer samples is available.
    pub fn uv_available(&self, uv_set: u32) -> bool {
        match uv_set {
            0 => self.has_uvs(),
            1 => self.geometry.uvs2,
            _ => false,
        }
    }

    /// The program cache key: hash fragments joined by `;`.
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(64);
        key.push_str(&self.canvas);
        key.push(';');
        if self.clip_planes > 0 {
            let _ = write!(key, "cp{}", self.clip_planes);
        }
        key.push(';');
        if self.color_transform {
            key.push_str("ct");
        }
        key.push(';');
        if !self.lights.is_empty() {
            key.push('l');
            for (i, l) in self.lights.iter().enumerate() {
                if i > 0 {
                    key.push(',');
                }
                key.push_str(l.mode.tag());
                key.push(if l.diffuse { 'd' } else { '_' });
                key.push(if l.specular { 's' } else { '_' });
                key.push(match l.space {
                    LightSpace::View => 'v',
                    LightSpace::World => 'w',
                });
            }
        }
        key.push(';');
        if let Some(m) = self.morph {
            key.push('m');
            for (on, c) in [(m.positions, 'p'), (m.normals, 'n'), (m.uvs, 'u')] {
                if on {
                    key.push(c);
                }
            }
        }
        key.push(';');
        if !self.texture.is_empty() {
            key.push('t');
            for l in &self.texture {
                key.push_str(l.apply_to.tag());
                key.push_str(l.blend_mode.tag());
                let _ = write!(key, "{}", l.uv_set);
            }
        }
        key.push(';');
        if let Some((digest, _)) = &self.shader {
            let _ = write!(key, "s{digest:016x}");
        }
        key.push(';');
        if self.point_size {
            key.push_str("ps");
        }
        key.push(';');
        key.push('g');
        let g = &self.geometry;
        for (on, c) in [(g.normals, "n"), (g.uvs, "u"), (g.uvs2, "u2"), (g.colors, "c")] {
            if on {
                key.push_str(c);
            }
        }
        let _ = write!(key, "{:?}", g.primitive);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_data::state::{Light, LightsState};
    use glam::Vec3;

    #[test]
    fn test_key_lists_nine_fragments() {
        let sig = StateSignature::new("canvas");
        assert_eq!(sig.key().split(';').count(), 9);
        assert_eq!(sig.key(), "canvas;;;;;;;;gTriangles");
    }

    #[test]
    fn test_equal_state_gives_equal_key() {
        let lights = LightsState {
            ambient: Vec3::ZERO,
            lights: vec![Light::directional(Vec3::NEG_Z), Light::point(Vec3::ONE)],
        };
        let mut a = StateSignature::new("c");
        let mut b = StateSignature::new("c");
        a.apply(&SignaturePart::of_lights(&lights));
        b.apply(&SignaturePart::of_lights(&lights.clone()));
        assert_eq!(a.key(), b.key());
        assert!(a.key().contains("ldirdsw,pointdsw"));
    }

    #[test]
    fn test_lighting_requires_normals() {
        let mut sig = StateSignature::new("c");
        sig.apply(&SignaturePart::Lights(vec![LightSignature {
            mode: LightMode::Dir,
            space: LightSpace::World,
            diffuse: true,
            specular: true,
        }]));
        assert!(!sig.lit());
        sig.geometry.normals = true;
        assert!(sig.lit());
    }
}
