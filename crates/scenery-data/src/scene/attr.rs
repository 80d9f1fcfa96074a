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

use crate::state::{ClipPlane, GeometryData, Light, MorphData, ShaderCode, TextureLayer};
use glam::{Mat4, Vec3, Vec4};
use scenery_core::renderer::UniformValue;
use scenery_core::scene::SceneError;
use std::sync::Arc;

/// A value written to a node attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A scalar.
    Float(f32),
    /// An integer.
    Int(i32),
    /// A switch.
    Bool(bool),
    /// A 3-vector.
    Vec3(Vec3),
    /// A 4-vector.
    Vec4(Vec4),
    /// A 4x4 matrix.
    Mat4(Mat4),
    /// A string or enumerated keyword.
    Text(String),
    /// A raw uniform value for shader params.
    Uniform(UniformValue),
    /// A replacement light list.
    Lights(Vec<Light>),
    /// A replacement texture layer list.
    TextureLayers(Vec<TextureLayer>),
    /// A replacement clip plane list.
    Clips(Vec<ClipPlane>),
    /// Replacement geometry.
    Geometry(Arc<GeometryData>),
    /// Replacement morph targets.
    Morph(Arc<MorphData>),
    /// Replacement shader code.
    Shader(Arc<ShaderCode>),
}

fn invalid(attr: &str, expected: &'static str) -> SceneError {
    SceneError::InvalidValue {
        attr: attr.to_string(),
        expected,
    }
}

impl AttrValue {
    pub(crate) fn float(&self, attr: &str) -> Result<f32, SceneError> {
        match *self {
            AttrValue::Float(v) => Ok(v),
            AttrValue::Int(v) => Ok(v as f32),
            _ => Err(invalid(attr, "a number")),
        }
    }

    pub(crate) fn int(&self, attr: &str) -> Result<i32, SceneError> {
        match *self {
            AttrValue::Int(v) => Ok(v),
            _ => Err(invalid(attr, "an integer")),
        }
    }

    pub(crate) fn boolean(&self, attr: &str) -> Result<bool, SceneError> {
        match *self {
            AttrValue::Bool(v) => Ok(v),
            _ => Err(invalid(attr, "a boolean")),
        }
    }

    pub(crate) fn vec3(&self, attr: &str) -> Result<Vec3, SceneError> {
        match *self {
            AttrValue::Vec3(v) => Ok(v),
            _ => Err(invalid(attr, "a 3-vector")),
        }
    }

    pub(crate) fn vec4(&self, attr: &str) -> Result<Vec4, SceneError> {
        match *self {
            AttrValue::Vec4(v) => Ok(v),
            _ => Err(invalid(attr, "a 4-vector")),
        }
    }

    pub(crate) fn mat4(&self, attr: &str) -> Result<Mat4, SceneError> {
        match *self {
            AttrValue::Mat4(v) => Ok(v),
            _ => Err(invalid(attr, "a 4x4 matrix")),
        }
    }

    pub(crate) fn text(&self, attr: &str) -> Result<&str, SceneError> {
        match self {
            AttrValue::Text(v) => Ok(v),
            _ => Err(invalid(attr, "a string")),
        }
    }

    pub(crate) fn uniform(&self, attr: &str) -> Result<UniformValue, SceneError> {
        match *self {
            AttrValue::Uniform(v) => Ok(v),
            AttrValue::Float(v) => Ok(UniformValue::Float(v)),
            AttrValue::Int(v) => Ok(UniformValue::Int(v)),
            AttrValue::Bool(v) => Ok(UniformValue::Bool(v)),
            AttrValue::Vec3(v) => Ok(UniformValue::Vec3(v.to_array())),
            AttrValue::Vec4(v) => Ok(UniformValue::Vec4(v.to_array())),
            AttrValue::Mat4(v) => Ok(UniformValue::Mat4(v.to_cols_array())),
            _ => Err(invalid(attr, "a uniform value")),
        }
    }
}

/// Parses the list index carried by a sub-attribute, `0` when absent.
pub(crate) fn list_index(
    attr: &str,
    sub_attr: Option<&str>,
    len: usize,
) -> Result<usize, SceneError> {
    let index = match sub_attr {
        None => 0,
        Some(s) => s
            .parse::<usize>()
            .map_err(|_| invalid(attr, "a numeric list index as sub-attribute"))?,
    };
    if index < len {
        Ok(index)
    } else {
        Err(invalid(attr, "a sub-attribute index inside the list"))
    }
}
