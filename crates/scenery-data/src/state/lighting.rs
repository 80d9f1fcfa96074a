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

//! Light sources.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// The kind of a light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightMode {
    /// Parallel rays along `dir`.
    Dir,
    /// Omnidirectional light at `pos`.
    Point,
    /// Cone of light at `pos` pointing along `dir`.
    Spot,
}

impl LightMode {
    /// Short tag used in shader signatures.
    pub fn tag(&self) -> &'static str {
        match self {
            LightMode::Dir => "dir",
            LightMode::Point => "point",
            LightMode::Spot => "spot",
        }
    }
}

/// Coordinate space a light's position and direction are given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSpace {
    /// Relative to the camera.
    View,
    /// Relative to the world.
    #[default]
    World,
}

/// One light source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Light kind.
    pub mode: LightMode,
    /// Emitted color.
    pub color: Vec3,
    /// Whether the light contributes diffuse shading.
    pub diffuse: bool,
    /// Whether the light contributes specular highlights.
    pub specular: bool,
    /// Direction for directional and spot lights.
    pub dir: Vec3,
    /// Position for point and spot lights.
    pub pos: Vec3,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: Vec3,
    /// Cone half-angle of spot lights, in degrees.
    pub cutoff: f32,
    /// Space of `pos` and `dir`.
    pub space: LightSpace,
}

impl Light {
    /// A white directional light shining along `dir`.
    pub fn directional(dir: Vec3) -> Self {
        Self {
            mode: LightMode::Dir,
            color: Vec3::ONE,
            diffuse: true,
            specular: true,
            dir,
            pos: Vec3::ZERO,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            cutoff: 180.0,
            space: LightSpace::World,
        }
    }

    /// A white point light at `pos`.
    pub fn point(pos: Vec3) -> Self {
        Self {
            mode: LightMode::Point,
            pos,
            dir: Vec3::NEG_Z,
            ..Self::directional(Vec3::NEG_Z)
        }
    }
}

/// Every light active at a traversal position.
#[derive(Debug, Clone, PartialEq)]
pub struct LightsState {
    /// Summed ambient color.
    pub ambient: Vec3,
    /// Light sources, outermost first.
    pub lights: Vec<Light>,
}

impl LightsState {
    /// Appends `other` to this set, summing the ambient terms.
    pub fn accumulate(&self, other: &LightsState) -> LightsState {
        let mut lights = self.lights.clone();
        lights.extend(other.lights.iter().copied());
        LightsState {
            ambient: self.ambient + other.ambient,
            lights,
        }
    }

    /// An empty set with no ambient term.
    pub fn empty() -> Self {
        Self {
            ambient: Vec3::ZERO,
            lights: Vec::new(),
        }
    }
}

impl Default for LightsState {
    /// The lighting used when no lights node is in scope.
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.7),
            lights: vec![Light::directional(Vec3::new(-0.5, -0.5, -1.0))],
        }
    }
}
