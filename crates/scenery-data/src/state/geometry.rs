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

//! Geometry and morph-target data, before and after upload.

use scenery_core::renderer::{BufferId, Primitive};
use std::sync::Arc;

/// One index list of a geometry, drawn as its own draw-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryPart {
    /// Topology of the indices.
    pub primitive: Primitive,
    /// Element indices into the shared vertex arrays.
    pub indices: Vec<u32>,
}

/// CPU-side vertex arrays of a geometry node.
///
/// Every array is flat: three floats per position or normal, two per UV,
/// four per color. All parts share the vertex arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions.
    pub positions: Vec<f32>,
    /// Vertex normals.
    pub normals: Option<Vec<f32>>,
    /// Primary texture coordinates.
    pub uvs: Option<Vec<f32>>,
    /// Secondary texture coordinates.
    pub uvs2: Option<Vec<f32>>,
    /// Vertex colors.
    pub colors: Option<Vec<f32>>,
    /// Index lists.
    pub parts: Vec<GeometryPart>,
}

impl GeometryData {
    /// Single-part triangle geometry.
    pub fn triangles(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            parts: vec![GeometryPart {
                primitive: Primitive::Triangles,
                indices,
            }],
            ..Default::default()
        }
    }

    /// A unit quad in the XY plane facing +Z, with normals and UVs.
    pub fn quad(half_extent: f32) -> Self {
        let e = half_extent;
        Self {
            positions: vec![-e, -e, 0.0, e, -e, 0.0, e, e, 0.0, -e, e, 0.0],
            normals: Some(vec![0.0, 0.0, 1.0].repeat(4)),
            uvs: Some(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
            uvs2: None,
            colors: None,
            parts: vec![GeometryPart {
                primitive: Primitive::Triangles,
                indices: vec![0, 1, 2, 0, 2, 3],
            }],
        }
    }

    /// Number of vertices described by `positions`.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Uploaded vertex arrays, shared by every part of one geometry node.
#[derive(Debug, PartialEq, Eq)]
pub struct VertexBuffers {
    /// Position buffer.
    pub positions: BufferId,
    /// Normal buffer.
    pub normals: Option<BufferId>,
    /// Primary UV buffer.
    pub uvs: Option<BufferId>,
    /// Secondary UV buffer.
    pub uvs2: Option<BufferId>,
    /// Color buffer.
    pub colors: Option<BufferId>,
}

impl VertexBuffers {
    /// Every buffer id held, for destruction.
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        std::iter::once(self.positions)
            .chain(self.normals)
            .chain(self.uvs)
            .chain(self.uvs2)
            .chain(self.colors)
    }
}

/// One uploaded part of a geometry node.
///
/// The vertex buffers are freed when the last part referencing them is
/// evicted, which is when [`Arc::try_unwrap`] on `vertices` succeeds.
#[derive(Debug)]
pub struct GeometryState {
    /// Shared vertex buffers.
    pub vertices: Arc<VertexBuffers>,
    /// This part's index buffer.
    pub index_buffer: BufferId,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Topology of the indices.
    pub primitive: Primitive,
    /// Revision of the node the buffers were uploaded from.
    pub revision: u64,
}

/// One morph target: replacement vertex arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    /// Target positions.
    pub positions: Option<Vec<f32>>,
    /// Target normals.
    pub normals: Option<Vec<f32>>,
    /// Target UVs.
    pub uvs: Option<Vec<f32>>,
}

/// Key-framed morph targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphData {
    /// Ascending key positions, one per target.
    pub keys: Vec<f32>,
    /// Targets, one per key.
    pub targets: Vec<MorphTarget>,
}

/// The target pair and local blend weight selected by a morph factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphFrame {
    /// Index of the lower target.
    pub key1: usize,
    /// Index of the upper target.
    pub key2: usize,
    /// Interpolation weight between the two, in `[0, 1]`.
    pub blend: f32,
}

impl MorphData {
    /// Selects the key pair bracketing `factor` and the weight between them.
    ///
    /// Factors outside the key range clamp to the first or last pair.
    pub fn frame(&self, factor: f32) -> MorphFrame {
        let keys = &self.keys;
        if keys.len() < 2 {
            return MorphFrame {
                key1: 0,
                key2: 0,
                blend: 0.0,
            };
        }
        let last = keys.len() - 1;
        let mut key1 = 0;
        while key1 + 1 < last && keys[key1 + 1] <= factor {
            key1 += 1;
        }
        let key2 = key1 + 1;
        let span = keys[key2] - keys[key1];
        let blend = if span > 0.0 {
            ((factor - keys[key1]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        MorphFrame { key1, key2, blend }
    }

    /// Whether any target carries positions.
    pub fn has_positions(&self) -> bool {
        self.targets.iter().any(|t| t.positions.is_some())
    }

    /// Whether any target carries normals.
    pub fn has_normals(&self) -> bool {
        self.targets.iter().any(|t| t.normals.is_some())
    }

    /// Whether any target carries UVs.
    pub fn has_uvs(&self) -> bool {
        self.targets.iter().any(|t| t.uvs.is_some())
    }
}

/// Uploaded buffers of one morph target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MorphTargetBuffers {
    /// Position buffer.
    pub positions: Option<BufferId>,
    /// Normal buffer.
    pub normals: Option<BufferId>,
    /// UV buffer.
    pub uvs: Option<BufferId>,
}

impl MorphTargetBuffers {
    /// Every buffer id held, for destruction.
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> {
        self.positions
            .into_iter()
            .chain(self.normals)
            .chain(self.uvs)
    }
}

/// Morph targets in scope, uploaded, and the current factor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphState {
    /// Source data; `None` for the default "no morph" state.
    pub data: Option<Arc<MorphData>>,
    /// One set of buffers per target.
    pub targets: Vec<MorphTargetBuffers>,
    /// Current animation position along the keys.
    pub factor: f32,
    /// Revision of the node the targets were uploaded from.
    pub revision: u64,
}

impl MorphState {
    /// The frame selected by the current factor, if targets are bound.
    pub fn frame(&self) -> Option<MorphFrame> {
        let data = self.data.as_ref()?;
        if data.targets.len() < 2 {
            return None;
        }
        Some(data.frame(self.factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn morph(keys: &[f32]) -> MorphData {
        MorphData {
            keys: keys.to_vec(),
            targets: vec![MorphTarget::default(); keys.len()],
        }
    }

    #[test]
    fn test_factor_between_keys_selects_bracket() {
        let frame = morph(&[0.0, 1.0, 3.0]).frame(2.0);
        assert_eq!((frame.key1, frame.key2), (1, 2));
        assert_relative_eq!(frame.blend, 0.5);
    }

    #[test]
    fn test_factor_past_the_end_clamps_to_last_pair() {
        let frame = morph(&[0.0, 1.0, 3.0]).frame(10.0);
        assert_eq!((frame.key1, frame.key2), (1, 2));
        assert_relative_eq!(frame.blend, 1.0);
    }

    #[test]
    fn test_factor_before_the_start_clamps_to_first_pair() {
        let frame = morph(&[0.0, 1.0]).frame(-1.0);
        assert_eq!((frame.key1, frame.key2), (0, 1));
        assert_relative_eq!(frame.blend, 0.0);
    }

    #[test]
    fn test_quad_has_one_triangle_part() {
        let quad = GeometryData::quad(1.0);
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.parts.len(), 1);
        assert_eq!(quad.parts[0].indices.len(), 6);
    }
}
