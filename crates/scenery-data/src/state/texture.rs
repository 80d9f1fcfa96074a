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

//! Texture layers.

use glam::{Mat4, Vec3};
use scenery_core::renderer::TextureId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which material channel a texture layer modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureApplyTo {
    /// Diffuse color.
    #[default]
    BaseColor,
    /// Opacity.
    Alpha,
    /// Emission.
    Emit,
    /// Specular intensity.
    Specular,
    /// Perturbs the shading normal.
    Normals,
}

impl TextureApplyTo {
    /// Short tag used in shader signatures.
    pub fn tag(&self) -> &'static str {
        match self {
            TextureApplyTo::BaseColor => "c",
            TextureApplyTo::Alpha => "a",
            TextureApplyTo::Emit => "e",
            TextureApplyTo::Specular => "s",
            TextureApplyTo::Normals => "n",
        }
    }
}

/// How a layer combines with the channel it is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureBlendMode {
    /// `channel * texel`
    #[default]
    Multiply,
    /// `mix(channel, texel, blend_factor)`
    Add,
}

impl TextureBlendMode {
    /// Short tag used in shader signatures.
    pub fn tag(&self) -> &'static str {
        match self {
            TextureBlendMode::Multiply => "m",
            TextureBlendMode::Add => "a",
        }
    }
}

/// Decoded RGBA8 pixels of a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 rows, bottom row first.
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// A single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let texels = (width * height) as usize;
        Self {
            width,
            height,
            rgba: rgba.iter().copied().cycle().take(texels * 4).collect(),
        }
    }
}

/// One layer of a texture node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureLayer {
    /// Pixel source.
    pub image: Arc<TextureImage>,
    /// Channel the layer modulates.
    pub apply_to: TextureApplyTo,
    /// Combination mode.
    pub blend_mode: TextureBlendMode,
    /// Weight of the layer for [`TextureBlendMode::Add`].
    pub blend_factor: f32,
    /// UV set sampled: 0 for the primary coordinates, 1 for the secondary.
    pub uv_set: u32,
    /// UV translation.
    pub translate: Vec3,
    /// UV rotation about Z, in degrees.
    pub rotate: f32,
    /// UV scale.
    pub scale: Vec3,
}

impl TextureLayer {
    /// A multiplicative base-color layer with an identity UV transform.
    pub fn new(image: Arc<TextureImage>) -> Self {
        Self {
            image,
            apply_to: TextureApplyTo::BaseColor,
            blend_mode: TextureBlendMode::Multiply,
            blend_factor: 1.0,
            uv_set: 0,
            translate: Vec3::ZERO,
            rotate: 0.0,
            scale: Vec3::ONE,
        }
    }

    /// The UV transform of the layer: scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translate)
            * Mat4::from_rotation_z(self.rotate.to_radians())
            * Mat4::from_scale(self.scale)
    }
}

/// A layer whose image has been uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTextureLayer {
    /// Device texture holding the layer's image.
    pub texture: TextureId,
    /// The layer description.
    pub layer: TextureLayer,
}

/// Texture layers active at a traversal position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureState {
    /// Uploaded layers, in application order.
    pub layers: Vec<BoundTextureLayer>,
    /// Revision of the node the layers were uploaded from.
    pub revision: u64,
}
