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

//! Literal values that can be written into a uniform slot.

/// A value assignable to a uniform.
///
/// Matrices are stored column-major, matching the layout expected by
/// immediate-mode GPU APIs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// A single float.
    Float(f32),
    /// A signed integer (also used for mode switches).
    Int(i32),
    /// A boolean flag.
    Bool(bool),
    /// A two-component vector.
    Vec2([f32; 2]),
    /// A three-component vector.
    Vec3([f32; 3]),
    /// A four-component vector.
    Vec4([f32; 4]),
    /// A column-major 3x3 matrix.
    Mat3([f32; 9]),
    /// A column-major 4x4 matrix.
    Mat4([f32; 16]),
    /// A texture unit index for a sampler uniform.
    Sampler(u32),
}

impl UniformValue {
    /// Interprets the value as a mode switch, the way shader code reads it.
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            UniformValue::Int(v) => Some(v),
            UniformValue::Bool(v) => Some(v as i32),
            UniformValue::Sampler(v) => Some(v as i32),
            _ => None,
        }
    }
}
