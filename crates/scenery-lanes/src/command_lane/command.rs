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

//! Command records and how each one resolves against the state soup.
//!
//! A command captures handles and resolved locations, never payload values:
//! values are read from the soup when the command runs, so an in-place
//! payload refresh is picked up by the next replay without a rebuild.

use crate::draw_lane::StatePayload;
use glam::{Mat4, Vec3};
use scenery_core::renderer::{
    AttributeLocation, BlendFunc, CullFace, PipelineState, UniformLocation, UniformValue,
};
use scenery_data::state::{GeometryState, MorphState};
use scenery_data::StateHandle;

/// A value read out of one payload for one uniform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    /// Transform matrix.
    Matrix,
    /// Transform normal matrix.
    NormalMatrix,
    /// Summed ambient light.
    Ambient,
    /// Direction of light `i`.
    LightDir(usize),
    /// Position of light `i`.
    LightPos(usize),
    /// Color of light `i`.
    LightColor(usize),
    /// Attenuation of light `i`.
    LightAttenuation(usize),
    /// Cutoff of light `i`.
    LightCutoff(usize),
    /// Material base color.
    BaseColor,
    /// Material specular color.
    SpecularColor,
    /// Material specular factor.
    Specular,
    /// Material shininess.
    Shine,
    /// Material emission.
    Emit,
    /// Material alpha.
    Alpha,
    /// Texture unit of layer `i`.
    LayerSampler(usize),
    /// Texture matrix of layer `i`.
    LayerMatrix(usize),
    /// Blend factor of layer `i`.
    LayerBlendFactor(usize),
    /// Mode of clip plane `i`.
    ClipMode(usize),
    /// Normal and distance of clip plane `i`.
    ClipPlane(usize),
    /// Color transform scale.
    ColorScale,
    /// Color transform offset.
    ColorAdd,
    /// Color transform saturation.
    ColorSaturation,
    /// Local blend weight of the selected morph key pair.
    MorphFactor,
    /// Whether clipping is enabled.
    Clipping,
    /// Whether back faces are lit.
    BackfaceLighting,
    /// Whether back faces are textured.
    BackfaceTexturing,
    /// Whether specular highlights are computed.
    SpecularLighting,
    /// Point size.
    PointSize,
    /// A named shader parameter.
    Param(String),
}

fn mat4(m: Mat4) -> UniformValue {
    UniformValue::Mat4(m.to_cols_array())
}

fn vec3(v: Vec3) -> UniformValue {
    UniformValue::Vec3(v.to_array())
}

impl UniformSlot {
    /// The value of this slot in `payload`, if the payload has one.
    pub fn value(&self, payload: &StatePayload) -> Option<UniformValue> {
        use UniformSlot as S;
        Some(match (self, payload) {
            (S::Matrix, StatePayload::Transform(t)) => mat4(t.matrix),
            (S::NormalMatrix, StatePayload::Transform(t)) => mat4(t.normal_matrix),
            (S::Ambient, StatePayload::Lights(l)) => vec3(l.ambient),
            (S::LightDir(i), StatePayload::Lights(l)) => vec3(l.lights.get(*i)?.dir),
            (S::LightPos(i), StatePayload::Lights(l)) => vec3(l.lights.get(*i)?.pos),
            (S::LightColor(i), StatePayload::Lights(l)) => vec3(l.lights.get(*i)?.color),
            (S::LightAttenuation(i), StatePayload::Lights(l)) => {
                vec3(l.lights.get(*i)?.attenuation)
            }
            (S::LightCutoff(i), StatePayload::Lights(l)) => {
                UniformValue::Float(l.lights.get(*i)?.cutoff)
            }
            (S::BaseColor, StatePayload::Material(m)) => vec3(m.base_color),
            (S::SpecularColor, StatePayload::Material(m)) => vec3(m.specular_color),
            (S::Specular, StatePayload::Material(m)) => UniformValue::Float(m.specular),
            (S::Shine, StatePayload::Material(m)) => UniformValue::Float(m.shine),
            (S::Emit, StatePayload::Material(m)) => UniformValue::Float(m.emit),
            (S::Alpha, StatePayload::Material(m)) => UniformValue::Float(m.alpha),
            (S::LayerSampler(i), StatePayload::Texture(t)) => {
                t.layers.get(*i)?;
                UniformValue::Sampler(*i as u32)
            }
            (S::LayerMatrix(i), StatePayload::Texture(t)) => mat4(t.layers.get(*i)?.layer.matrix()),
            (S::LayerBlendFactor(i), StatePayload::Texture(t)) => {
                UniformValue::Float(t.layers.get(*i)?.layer.blend_factor)
            }
            (S::ClipMode(i), StatePayload::Clips(c)) => {
                UniformValue::Int(c.planes.get(*i)?.mode.as_uniform())
            }
            (S::ClipPlane(i), StatePayload::Clips(c)) => {
                let plane = c.planes.get(*i)?;
                UniformValue::Vec4(plane.normal.extend(plane.dist).to_array())
            }
            (S::ColorScale, StatePayload::ColorTransform(c)) => UniformValue::Vec4(c.scale.to_array()),
            (S::ColorAdd, StatePayload::ColorTransform(c)) => UniformValue::Vec4(c.add.to_array()),
            (S::ColorSaturation, StatePayload::ColorTransform(c)) => {
                UniformValue::Float(c.saturation)
            }
            (S::MorphFactor, StatePayload::Morph(m)) => {
                UniformValue::Float(m.frame().map_or(0.0, |f| f.blend))
            }
            (S::Clipping, StatePayload::Flags(f)) => UniformValue::Bool(f.clipping),
            (S::BackfaceLighting, StatePayload::Flags(f)) => UniformValue::Bool(f.backface_lighting),
            (S::BackfaceTexturing, StatePayload::Flags(f)) => {
                UniformValue::Bool(f.backface_texturing)
            }
            (S::SpecularLighting, StatePayload::Flags(f)) => UniformValue::Bool(f.specular),
            (S::PointSize, StatePayload::Renderer(r)) => UniformValue::Float(r.point_size),
            (S::Param(name), StatePayload::ShaderParams(p)) => *p.params.get(name)?,
            _ => return None,
        })
    }
}

/// A vertex array bound from a geometry part or a morph target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSlot {
    /// Positions, from the lower morph target when it has them.
    Vertex,
    /// Normals, likewise.
    Normal,
    /// Primary UVs, likewise.
    Uv,
    /// Secondary UVs.
    Uv2,
    /// Vertex colors.
    Color,
    /// Positions of the upper morph target.
    MorphVertex,
    /// Normals of the upper morph target.
    MorphNormal,
    /// UVs of the upper morph target.
    MorphUv,
}

impl AttributeSlot {
    /// Every slot, with its attribute name.
    pub const ALL: [(AttributeSlot, &'static str); 8] = [
        (AttributeSlot::Vertex, "aVertex"),
        (AttributeSlot::Normal, "aNormal"),
        (AttributeSlot::Uv, "aUVCoord"),
        (AttributeSlot::Uv2, "aUVCoord2"),
        (AttributeSlot::Color, "aVertexColor"),
        (AttributeSlot::MorphVertex, "aMorphVertex"),
        (AttributeSlot::MorphNormal, "aMorphNormal"),
        (AttributeSlot::MorphUv, "aMorphUVCoord"),
    ];

    /// Floats per vertex.
    pub fn components(&self) -> u32 {
        match self {
            AttributeSlot::Vertex
            | AttributeSlot::Normal
            | AttributeSlot::MorphVertex
            | AttributeSlot::MorphNormal => 3,
            AttributeSlot::Uv | AttributeSlot::Uv2 | AttributeSlot::MorphUv => 2,
            AttributeSlot::Color => 4,
        }
    }

    /// The buffer this slot reads, given the bound geometry part and morph.
    pub fn buffer(
        &self,
        geometry: &GeometryState,
        morph: Option<&MorphState>,
    ) -> Option<scenery_core::renderer::BufferId> {
        let frame = morph.and_then(|m| m.frame().map(|f| (m, f)));
        let lower = frame.and_then(|(m, f)| m.targets.get(f.key1));
        let upper = frame.and_then(|(m, f)| m.targets.get(f.key2));
        let v = &geometry.vertices;
        match self {
            AttributeSlot::Vertex => lower.and_then(|t| t.positions).or(Some(v.positions)),
            AttributeSlot::Normal => lower.and_then(|t| t.normals).or(v.normals),
            AttributeSlot::Uv => lower.and_then(|t| t.uvs).or(v.uvs),
            AttributeSlot::Uv2 => v.uvs2,
            AttributeSlot::Color => v.colors,
            AttributeSlot::MorphVertex => upper.and_then(|t| t.positions).or(Some(v.positions)),
            AttributeSlot::MorphNormal => upper.and_then(|t| t.normals).or(v.normals),
            AttributeSlot::MorphUv => upper.and_then(|t| t.uvs).or(v.uvs),
        }
    }
}

/// Pipeline flags for an entry, from its flags and renderer payloads.
///
/// Pick passes never blend.
pub fn pipeline_state(flags: &StatePayload, renderer: &StatePayload, blending: bool) -> PipelineState {
    let mut state = PipelineState::default();
    if let Some(f) = flags.flags() {
        state.cull_face = if f.backfaces {
            CullFace::None
        } else {
            CullFace::Back
        };
        state.front_face = f.front_face;
        if blending && f.transparent {
            state.blend = Some(BlendFunc::default());
        }
    }
    if let Some(r) = renderer.renderer() {
        state.depth_func = r.depth_func;
        if blending {
            state.blend = r.blend.or(state.blend);
        }
    }
    state
}

/// One recorded GPU operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Binds the draw program or the pick program.
    UseProgram(scenery_core::renderer::ProgramId),
    /// Binds the off-screen target of a framebuffer handle, or the canvas
    /// for the default handle.
    BindTarget(StateHandle),
    /// Applies pipeline flags.
    Pipeline {
        /// Flags handle.
        flags: StateHandle,
        /// Renderer handle.
        renderer: StateHandle,
    },
    /// Writes one uniform read from a payload.
    Uniform {
        /// Payload source.
        handle: StateHandle,
        /// What to read.
        slot: UniformSlot,
        /// Where to write.
        location: UniformLocation,
    },
    /// Writes a literal captured at build time.
    Literal {
        /// Where to write.
        location: UniformLocation,
        /// Value.
        value: UniformValue,
    },
    /// Binds every texture layer to the unit of its index.
    BindTextures(StateHandle),
    /// Binds one vertex array.
    Attribute {
        /// Geometry part.
        geometry: StateHandle,
        /// Morph state in scope.
        morph: StateHandle,
        /// Which array.
        slot: AttributeSlot,
        /// Where to bind it.
        location: AttributeLocation,
    },
    /// Reports the listeners of a handle as fired.
    Listeners(StateHandle),
    /// Draws a geometry part's indices.
    Draw(StateHandle),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_data::state::{
        FlagsState, LightsState, Light, MorphData, MorphTarget, MorphTargetBuffers, RendererState,
        VertexBuffers,
    };
    use scenery_core::renderer::{BufferId, Primitive};
    use std::sync::Arc;

    #[test]
    fn test_light_slots_read_the_indexed_light() {
        let mut lights = LightsState::empty();
        lights.lights.push(Light::directional(Vec3::X));
        lights.lights.push(Light::point(Vec3::new(1.0, 2.0, 3.0)));
        let payload = StatePayload::Lights(lights);
        assert_eq!(
            UniformSlot::LightPos(1).value(&payload),
            Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
        );
        assert_eq!(UniformSlot::LightPos(2).value(&payload), None);
        assert_eq!(UniformSlot::BaseColor.value(&payload), None);
    }

    #[test]
    fn test_morph_targets_replace_geometry_arrays() {
        let geometry = GeometryState {
            vertices: Arc::new(VertexBuffers {
                positions: BufferId(1),
                normals: Some(BufferId(2)),
                uvs: None,
                uvs2: None,
                colors: None,
            }),
            index_buffer: BufferId(3),
            index_count: 3,
            primitive: Primitive::Triangles,
            revision: 1,
        };
        let target = MorphTarget {
            positions: Some(vec![0.0; 3]),
            ..Default::default()
        };
        let morph = MorphState {
            data: Some(Arc::new(MorphData {
                keys: vec![0.0, 1.0],
                targets: vec![target.clone(), target],
            })),
            targets: vec![
                MorphTargetBuffers {
                    positions: Some(BufferId(10)),
                    ..Default::default()
                },
                MorphTargetBuffers {
                    positions: Some(BufferId(11)),
                    ..Default::default()
                },
            ],
            factor: 0.5,
            revision: 1,
        };
        let slot = |s: AttributeSlot| s.buffer(&geometry, Some(&morph));
        assert_eq!(slot(AttributeSlot::Vertex), Some(BufferId(10)));
        assert_eq!(slot(AttributeSlot::MorphVertex), Some(BufferId(11)));
        assert_eq!(slot(AttributeSlot::Normal), Some(BufferId(2)));
        assert_eq!(AttributeSlot::Vertex.buffer(&geometry, None), Some(BufferId(1)));
    }

    #[test]
    fn test_transparent_flags_blend_only_when_allowed() {
        let flags = StatePayload::Flags(FlagsState {
            transparent: true,
            backfaces: true,
            ..Default::default()
        });
        let renderer = StatePayload::Renderer(RendererState::default());
        let draw = pipeline_state(&flags, &renderer, true);
        assert_eq!(draw.blend, Some(BlendFunc::default()));
        assert_eq!(draw.cull_face, CullFace::None);
        assert_eq!(pipeline_state(&flags, &renderer, false).blend, None);
    }
}
