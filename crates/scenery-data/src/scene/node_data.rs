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

use super::attr::{list_index, AttrValue};
use crate::state::{
    ClipMode, ClipPlane, ColorTransformState, FlagsOverride, GeometryData, LayerState, Light,
    LightMode, LightsState, ListenerId, MaterialState, MorphData, RendererOverride, ShaderCode,
    StateContribution, TextureLayer,
};
use glam::{Mat4, Vec3};
use scenery_core::renderer::{BlendFunc, DepthFunc, FrontFace, UniformValue};
use scenery_core::scene::{NodeKind, SceneError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Vertical field of view, in degrees.
    pub fovy: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl CameraData {
    /// The projection matrix, OpenGL depth convention.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fovy.to_radians(), self.aspect, self.near, self.far)
    }
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            fovy: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 5000.0,
        }
    }
}

/// Kind-specific attributes of a scene node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// A plain grouping node.
    Group,
    /// Translation.
    Translate(Vec3),
    /// Rotation of `angle` degrees about `axis`.
    Rotate {
        /// Angle in degrees.
        angle: f32,
        /// Rotation axis.
        axis: Vec3,
    },
    /// Scaling.
    Scale(Vec3),
    /// Arbitrary local matrix.
    Matrix(Mat4),
    /// View transform.
    LookAt {
        /// Camera position.
        eye: Vec3,
        /// Point looked at.
        look: Vec3,
        /// Up direction.
        up: Vec3,
    },
    /// Projection.
    Camera(CameraData),
    /// Light sources.
    Lights(LightsState),
    /// Material.
    Material(MaterialState),
    /// Texture layers.
    Texture(Vec<TextureLayer>),
    /// Clip planes.
    Clips(Vec<ClipPlane>),
    /// Color transform.
    ColorTransform(ColorTransformState),
    /// Morph targets.
    Morph {
        /// Key-framed targets.
        data: Arc<MorphData>,
        /// Current factor.
        factor: f32,
    },
    /// Rendering flags.
    Flags(FlagsOverride),
    /// Render-order layer.
    Layer(LayerState),
    /// Tag.
    Tag(String),
    /// User shader code.
    Shader(Arc<ShaderCode>),
    /// Uniforms for user shader code.
    ShaderParams(BTreeMap<String, UniformValue>),
    /// Off-screen render target.
    FrameBuf {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Pick name.
    Name(String),
    /// Renderer settings.
    Renderer(RendererOverride),
    /// Render listeners.
    RenderListeners(Vec<ListenerId>),
    /// Renderable geometry.
    Geometry(Arc<GeometryData>),
}

impl NodeData {
    /// The node kind this data belongs to.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Group => NodeKind::Node,
            NodeData::Translate(_) => NodeKind::Translate,
            NodeData::Rotate { .. } => NodeKind::Rotate,
            NodeData::Scale(_) => NodeKind::Scale,
            NodeData::Matrix(_) => NodeKind::Matrix,
            NodeData::LookAt { .. } => NodeKind::LookAt,
            NodeData::Camera(_) => NodeKind::Camera,
            NodeData::Lights(_) => NodeKind::Lights,
            NodeData::Material(_) => NodeKind::Material,
            NodeData::Texture(_) => NodeKind::Texture,
            NodeData::Clips(_) => NodeKind::Clips,
            NodeData::ColorTransform(_) => NodeKind::ColorTransform,
            NodeData::Morph { .. } => NodeKind::Morph,
            NodeData::Flags(_) => NodeKind::Flags,
            NodeData::Layer(_) => NodeKind::Layer,
            NodeData::Tag(_) => NodeKind::Tag,
            NodeData::Shader(_) => NodeKind::Shader,
            NodeData::ShaderParams(_) => NodeKind::ShaderParams,
            NodeData::FrameBuf { .. } => NodeKind::FrameBuf,
            NodeData::Name(_) => NodeKind::Name,
            NodeData::Renderer(_) => NodeKind::Renderer,
            NodeData::RenderListeners(_) => NodeKind::RenderListeners,
            NodeData::Geometry(_) => NodeKind::Geometry,
        }
    }

    /// What the node pushes onto the state stacks when traversed.
    ///
    /// Grouping and geometry nodes push nothing.
    pub fn contribution(&self) -> Option<StateContribution> {
        let c = match self {
            NodeData::Group | NodeData::Geometry(_) => return None,
            NodeData::Translate(t) => StateContribution::ModelTransform(Mat4::from_translation(*t)),
            NodeData::Rotate { angle, axis } => {
                let axis = axis.normalize_or_zero();
                let local = if axis == Vec3::ZERO {
                    Mat4::IDENTITY
                } else {
                    Mat4::from_axis_angle(axis, angle.to_radians())
                };
                StateContribution::ModelTransform(local)
            }
            NodeData::Scale(s) => StateContribution::ModelTransform(Mat4::from_scale(*s)),
            NodeData::Matrix(m) => StateContribution::ModelTransform(*m),
            NodeData::LookAt { eye, look, up } => {
                StateContribution::ViewTransform(Mat4::look_at_rh(*eye, *look, *up))
            }
            NodeData::Camera(c) => StateContribution::ProjTransform(c.matrix()),
            NodeData::Lights(l) => StateContribution::Lights(l.clone()),
            NodeData::Material(m) => StateContribution::Material(*m),
            NodeData::Texture(layers) => StateContribution::Texture(layers.clone()),
            NodeData::Clips(planes) => StateContribution::Clips(planes.clone()),
            NodeData::ColorTransform(c) => StateContribution::ColorTransform(*c),
            NodeData::Morph { data, factor } => StateContribution::Morph {
                data: data.clone(),
                factor: *factor,
            },
            NodeData::Flags(f) => StateContribution::Flags(*f),
            NodeData::Layer(l) => StateContribution::Layer(*l),
            NodeData::Tag(t) => StateContribution::Tag(t.clone()),
            NodeData::Shader(code) => StateContribution::Shader(code.clone()),
            NodeData::ShaderParams(p) => StateContribution::ShaderParams(p.clone()),
            NodeData::FrameBuf { width, height } => StateContribution::FrameBuf {
                width: *width,
                height: *height,
            },
            NodeData::Name(n) => StateContribution::Name(n.clone()),
            NodeData::Renderer(r) => StateContribution::Renderer(*r),
            NodeData::RenderListeners(l) => StateContribution::RenderListeners(l.clone()),
        };
        Some(c)
    }

    /// Writes one attribute, validating its shape.
    ///
    /// On error the data is left untouched.
    pub fn set_attribute(
        &mut self,
        attr: &str,
        sub_attr: Option<&str>,
        value: &AttrValue,
    ) -> Result<(), SceneError> {
        let kind = self.kind();
        let unknown = || SceneError::UnknownAttribute {
            kind,
            attr: attr.to_string(),
        };
        match self {
            NodeData::Translate(v) | NodeData::Scale(v) => match attr {
                "x" => v.x = value.float(attr)?,
                "y" => v.y = value.float(attr)?,
                "z" => v.z = value.float(attr)?,
                "xyz" => *v = value.vec3(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Rotate { angle, axis } => match attr {
                "angle" => *angle = value.float(attr)?,
                "axis" => *axis = value.vec3(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Matrix(m) => match attr {
                "elements" => *m = value.mat4(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::LookAt { eye, look, up } => match attr {
                "eye" => *eye = value.vec3(attr)?,
                "look" => *look = value.vec3(attr)?,
                "up" => *up = value.vec3(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Camera(c) => match attr {
                "fovy" => c.fovy = value.float(attr)?,
                "aspect" => c.aspect = value.float(attr)?,
                "near" => c.near = value.float(attr)?,
                "far" => c.far = value.float(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Lights(state) => match attr {
                "lights" => match value {
                    AttrValue::Lights(l) => state.lights = l.clone(),
                    _ => return Err(invalid(attr, "a light list")),
                },
                "ambient" => state.ambient = value.vec3(attr)?,
                _ if LIGHT_ATTRS.contains(&attr) => {
                    let i = list_index(attr, sub_attr, state.lights.len())?;
                    set_light(&mut state.lights[i], attr, value)?;
                }
                _ => return Err(unknown()),
            },
            NodeData::Material(m) => match attr {
                "baseColor" => m.base_color = value.vec3(attr)?,
                "specularColor" => m.specular_color = value.vec3(attr)?,
                "specular" => m.specular = value.float(attr)?,
                "shine" => m.shine = value.float(attr)?,
                "emit" => m.emit = value.float(attr)?,
                "alpha" => m.alpha = value.float(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Texture(layers) => match attr {
                "layers" => match value {
                    AttrValue::TextureLayers(l) => *layers = l.clone(),
                    _ => return Err(invalid(attr, "a texture layer list")),
                },
                "blendFactor" | "translate" | "rotate" | "scale" => {
                    let i = list_index(attr, sub_attr, layers.len())?;
                    let layer = &mut layers[i];
                    match attr {
                        "blendFactor" => layer.blend_factor = value.float(attr)?,
                        "translate" => layer.translate = value.vec3(attr)?,
                        "rotate" => layer.rotate = value.float(attr)?,
                        _ => layer.scale = value.vec3(attr)?,
                    }
                }
                _ => return Err(unknown()),
            },
            NodeData::Clips(planes) => match attr {
                "clips" => match value {
                    AttrValue::Clips(p) => *planes = p.clone(),
                    _ => return Err(invalid(attr, "a clip plane list")),
                },
                "mode" | "normal" | "dist" => {
                    let i = list_index(attr, sub_attr, planes.len())?;
                    let plane = &mut planes[i];
                    match attr {
                        "mode" => plane.mode = parse_clip_mode(value.text(attr)?, attr)?,
                        "normal" => plane.normal = value.vec3(attr)?,
                        _ => plane.dist = value.float(attr)?,
                    }
                }
                _ => return Err(unknown()),
            },
            NodeData::ColorTransform(c) => match attr {
                "scale" => c.scale = value.vec4(attr)?,
                "add" => c.add = value.vec4(attr)?,
                "saturation" => c.saturation = value.float(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Morph { data, factor } => match attr {
                "factor" => *factor = value.float(attr)?,
                "data" => match value {
                    AttrValue::Morph(d) => *data = d.clone(),
                    _ => return Err(invalid(attr, "morph data")),
                },
                _ => return Err(unknown()),
            },
            NodeData::Flags(f) => match attr {
                "enabled" => f.enabled = Some(value.boolean(attr)?),
                "picking" => f.picking = Some(value.boolean(attr)?),
                "clipping" => f.clipping = Some(value.boolean(attr)?),
                "transparent" => f.transparent = Some(value.boolean(attr)?),
                "backfaces" => f.backfaces = Some(value.boolean(attr)?),
                "backfaceLighting" => f.backface_lighting = Some(value.boolean(attr)?),
                "backfaceTexturing" => f.backface_texturing = Some(value.boolean(attr)?),
                "specular" => f.specular = Some(value.boolean(attr)?),
                "frontface" => {
                    f.front_face = Some(match value.text(attr)? {
                        "ccw" => FrontFace::Ccw,
                        "cw" => FrontFace::Cw,
                        _ => return Err(invalid(attr, "\"cw\" or \"ccw\"")),
                    })
                }
                _ => return Err(unknown()),
            },
            NodeData::Layer(l) => match attr {
                "priority" => l.priority = value.int(attr)?,
                "enabled" => l.enabled = value.boolean(attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Tag(t) => match attr {
                "tag" => *t = value.text(attr)?.to_string(),
                _ => return Err(unknown()),
            },
            NodeData::Name(n) => match attr {
                "name" => *n = value.text(attr)?.to_string(),
                _ => return Err(unknown()),
            },
            NodeData::Shader(code) => match attr {
                "code" => match value {
                    AttrValue::Shader(c) => *code = c.clone(),
                    _ => return Err(invalid(attr, "shader code")),
                },
                _ => return Err(unknown()),
            },
            NodeData::ShaderParams(params) => match attr {
                "params" => {
                    let name = sub_attr.ok_or_else(|| invalid(attr, "a uniform name as sub-attribute"))?;
                    params.insert(name.to_string(), value.uniform(attr)?);
                }
                _ => return Err(unknown()),
            },
            NodeData::FrameBuf { width, height } => match attr {
                "width" => *width = positive(value.int(attr)?, attr)?,
                "height" => *height = positive(value.int(attr)?, attr)?,
                _ => return Err(unknown()),
            },
            NodeData::Renderer(r) => match attr {
                "depthFunc" => r.depth_func = Some(parse_depth_func(value.text(attr)?, attr)?),
                "blend" => {
                    r.blend = if value.boolean(attr)? {
                        Some(BlendFunc::default())
                    } else {
                        None
                    }
                }
                "clearColor" => r.clear_color = Some(value.vec4(attr)?),
                "pointSize" => r.point_size = Some(value.float(attr)?),
                _ => return Err(unknown()),
            },
            NodeData::Geometry(g) => match attr {
                "data" => match value {
                    AttrValue::Geometry(d) => *g = d.clone(),
                    _ => return Err(invalid(attr, "geometry data")),
                },
                _ => return Err(unknown()),
            },
            NodeData::Group | NodeData::RenderListeners(_) => return Err(unknown()),
        }
        Ok(())
    }
}

fn invalid(attr: &str, expected: &'static str) -> SceneError {
    SceneError::InvalidValue {
        attr: attr.to_string(),
        expected,
    }
}

fn positive(v: i32, attr: &str) -> Result<u32, SceneError> {
    if v > 0 {
        Ok(v as u32)
    } else {
        Err(invalid(attr, "a positive integer"))
    }
}

const LIGHT_ATTRS: [&str; 8] = [
    "color",
    "dir",
    "pos",
    "attenuation",
    "cutoff",
    "diffuse",
    "specular",
    "mode",
];

fn set_light(light: &mut Light, attr: &str, value: &AttrValue) -> Result<(), SceneError> {
    match attr {
        "color" => light.color = value.vec3(attr)?,
        "dir" => light.dir = value.vec3(attr)?,
        "pos" => light.pos = value.vec3(attr)?,
        "attenuation" => light.attenuation = value.vec3(attr)?,
        "cutoff" => light.cutoff = value.float(attr)?,
        "diffuse" => light.diffuse = value.boolean(attr)?,
        "specular" => light.specular = value.boolean(attr)?,
        _ => {
            light.mode = match value.text(attr)? {
                "dir" => LightMode::Dir,
                "point" => LightMode::Point,
                "spot" => LightMode::Spot,
                _ => return Err(invalid(attr, "\"dir\", \"point\" or \"spot\"")),
            }
        }
    }
    Ok(())
}

fn parse_clip_mode(s: &str, attr: &str) -> Result<ClipMode, SceneError> {
    match s {
        "disabled" => Ok(ClipMode::Disabled),
        "inside" => Ok(ClipMode::Inside),
        "outside" => Ok(ClipMode::Outside),
        _ => Err(invalid(attr, "\"disabled\", \"inside\" or \"outside\"")),
    }
}

fn parse_depth_func(s: &str, attr: &str) -> Result<DepthFunc, SceneError> {
    Ok(match s {
        "never" => DepthFunc::Never,
        "less" => DepthFunc::Less,
        "equal" => DepthFunc::Equal,
        "lequal" => DepthFunc::LessEqual,
        "greater" => DepthFunc::Greater,
        "notequal" => DepthFunc::NotEqual,
        "gequal" => DepthFunc::GreaterEqual,
        "always" => DepthFunc::Always,
        _ => return Err(invalid(attr, "a depth function name")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_attributes_are_written() {
        let mut data = NodeData::Material(MaterialState::default());
        data.set_attribute("baseColor", None, &AttrValue::Vec3(Vec3::X))
            .unwrap();
        match data {
            NodeData::Material(m) => assert_eq!(m.base_color, Vec3::X),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_wrong_value_shape_is_rejected() {
        let mut data = NodeData::Layer(LayerState::default());
        let err = data
            .set_attribute("priority", None, &AttrValue::Text("high".into()))
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidValue { .. }));
        assert_eq!(data, NodeData::Layer(LayerState::default()));
    }

    #[test]
    fn test_unknown_attribute_names_the_kind() {
        let mut data = NodeData::Tag("a".into());
        let err = data
            .set_attribute("colour", None, &AttrValue::Bool(true))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::UnknownAttribute {
                kind: NodeKind::Tag,
                attr: "colour".into()
            }
        );
    }

    #[test]
    fn test_light_properties_are_indexed_by_sub_attribute() {
        let mut data = NodeData::Lights(LightsState {
            ambient: Vec3::ZERO,
            lights: vec![Light::directional(Vec3::NEG_Z), Light::point(Vec3::ZERO)],
        });
        data.set_attribute("color", Some("1"), &AttrValue::Vec3(Vec3::Y))
            .unwrap();
        let err = data
            .set_attribute("color", Some("5"), &AttrValue::Vec3(Vec3::Y))
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidValue { .. }));
        match data {
            NodeData::Lights(l) => {
                assert_eq!(l.lights[1].color, Vec3::Y);
                assert_eq!(l.lights[0].color, Vec3::ONE);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_zero_axis_rotation_is_identity() {
        let data = NodeData::Rotate {
            angle: 90.0,
            axis: Vec3::ZERO,
        };
        assert_eq!(
            data.contribution(),
            Some(StateContribution::ModelTransform(Mat4::IDENTITY))
        );
    }
}
