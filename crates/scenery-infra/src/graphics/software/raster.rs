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

//! Triangle setup and scan conversion.

use glam::{Vec2, Vec4};
use scenery_core::renderer::{CullFace, FrontFace, Primitive};

/// Interpolated per-vertex values: world position (3), UV (2), color (4).
pub(crate) const VARYINGS: usize = 9;

/// A vertex after the position stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShadedVertex {
    pub clip: Vec4,
    pub varyings: [f32; VARYINGS],
}

/// One covered pixel of a triangle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    pub front_facing: bool,
    pub varyings: [f32; VARYINGS],
}

/// Index triples of the triangles a primitive stream describes.
///
/// Point and line primitives produce no triangles.
pub(crate) fn assemble(primitive: Primitive, indices: &[u32]) -> Vec<[u32; 3]> {
    match primitive {
        Primitive::Triangles => indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
        Primitive::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    [w[0], w[1], w[2]]
                } else {
                    [w[1], w[0], w[2]]
                }
            })
            .collect(),
        Primitive::TriangleFan => match indices.split_first() {
            Some((&hub, rest)) => rest.windows(2).map(|w| [hub, w[0], w[1]]).collect(),
            None => Vec::new(),
        },
        Primitive::Points | Primitive::Lines | Primitive::LineLoop | Primitive::LineStrip => {
            Vec::new()
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Scan-converts one triangle onto a `width` x `height` target, sampling at
/// pixel centers with `y` counted from the bottom row.
///
/// Triangles crossing the eye plane are dropped rather than clipped.
pub(crate) fn rasterize_triangle(
    vertices: [ShadedVertex; 3],
    (width, height): (u32, u32),
    cull: CullFace,
    front_face: FrontFace,
    mut emit: impl FnMut(Fragment),
) {
    if width == 0 || height == 0 || vertices.iter().any(|v| v.clip.w <= 1e-6) {
        return;
    }
    let screen = vertices.map(|v| {
        let ndc = v.clip.truncate() / v.clip.w;
        (
            Vec2::new(
                (ndc.x * 0.5 + 0.5) * width as f32,
                (ndc.y * 0.5 + 0.5) * height as f32,
            ),
            ndc.z * 0.5 + 0.5,
        )
    });
    let [(p0, z0), (p1, z1), (p2, z2)] = screen;
    let area = edge(p0, p1, p2);
    if area.abs() <= f32::EPSILON {
        return;
    }
    let counter_clockwise = area > 0.0;
    let front_facing = match front_face {
        FrontFace::Ccw => counter_clockwise,
        FrontFace::Cw => !counter_clockwise,
    };
    match cull {
        CullFace::Back if !front_facing => return,
        CullFace::Front if front_facing => return,
        _ => {}
    }

    let min = p0.min(p1).min(p2);
    let max = p0.max(p1).max(p2);
    let x_start = min.x.floor().max(0.0) as u32;
    let y_start = min.y.floor().max(0.0) as u32;
    let x_end = (max.x.ceil() as i64).clamp(0, width as i64) as u32;
    let y_end = (max.y.ceil() as i64).clamp(0, height as i64) as u32;
    let inv_w = vertices.map(|v| 1.0 / v.clip.w);

    for y in y_start..y_end {
        for x in x_start..x_end {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b0 = edge(p1, p2, p) / area;
            let b1 = edge(p2, p0, p) / area;
            let b2 = edge(p0, p1, p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }
            let depth = b0 * z0 + b1 * z1 + b2 * z2;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }
            let weights = [b0 * inv_w[0], b1 * inv_w[1], b2 * inv_w[2]];
            let norm = weights.iter().sum::<f32>();
            let mut varyings = [0.0; VARYINGS];
            for (i, out) in varyings.iter_mut().enumerate() {
                *out = (0..3)
                    .map(|v| weights[v] * vertices[v].varyings[i])
                    .sum::<f32>()
                    / norm;
            }
            emit(Fragment {
                x,
                y,
                depth,
                front_facing,
                varyings,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex(x: f32, y: f32) -> ShadedVertex {
        ShadedVertex {
            clip: Vec4::new(x, y, 0.0, 1.0),
            varyings: [x; VARYINGS],
        }
    }

    fn covered(vertices: [ShadedVertex; 3], cull: CullFace) -> Vec<Fragment> {
        let mut out = Vec::new();
        rasterize_triangle(vertices, (8, 8), cull, FrontFace::Ccw, |f| out.push(f));
        out
    }

    #[test]
    fn test_strips_and_fans_keep_a_consistent_winding() {
        assert_eq!(
            assemble(Primitive::TriangleStrip, &[0, 1, 2, 3]),
            vec![[0, 1, 2], [2, 1, 3]]
        );
        assert_eq!(
            assemble(Primitive::TriangleFan, &[0, 1, 2, 3]),
            vec![[0, 1, 2], [0, 2, 3]]
        );
        assert!(assemble(Primitive::Lines, &[0, 1]).is_empty());
    }

    #[test]
    fn test_a_full_screen_pair_covers_every_pixel_once() {
        let a = [vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(1.0, 1.0)];
        let b = [vertex(-1.0, -1.0), vertex(1.0, 1.0), vertex(-1.0, 1.0)];
        let mut hits = covered(a, CullFace::Back);
        hits.extend(covered(b, CullFace::Back));
        assert!(hits.len() >= 64);
        let mut pixels: Vec<(u32, u32)> = hits.iter().map(|f| (f.x, f.y)).collect();
        pixels.sort();
        pixels.dedup();
        assert_eq!(pixels.len(), 64);
        assert!(hits.iter().all(|f| f.front_facing && f.depth == 0.5));
    }

    #[test]
    fn test_back_faces_are_culled_on_request() {
        let clockwise = [vertex(-1.0, -1.0), vertex(1.0, 1.0), vertex(1.0, -1.0)];
        assert!(covered(clockwise, CullFace::Back).is_empty());
        let kept = covered(clockwise, CullFace::None);
        assert!(!kept.is_empty());
        assert!(kept.iter().all(|f| !f.front_facing));
    }

    #[test]
    fn test_varyings_are_interpolated() {
        let a = [vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(1.0, 1.0)];
        let hits = covered(a, CullFace::Back);
        let corner = hits.iter().find(|f| f.x == 7 && f.y == 0).unwrap();
        // x of the pixel center in clip space
        assert_relative_eq!(corner.varyings[0], 0.875, epsilon = 1e-4);
    }

    #[test]
    fn test_depth_is_interpolated_across_the_triangle() {
        let at = |x: f32, y: f32, z: f32| ShadedVertex {
            clip: Vec4::new(x, y, z, 1.0),
            varyings: [0.0; VARYINGS],
        };
        // z runs from -1 on the left edge to 1 on the right one
        let slope = [at(-1.0, -1.0, -1.0), at(1.0, -1.0, 1.0), at(1.0, 1.0, 1.0)];
        let hits = covered(slope, CullFace::Back);
        for fragment in &hits {
            let expected = (fragment.x as f32 + 0.5) / 8.0;
            assert_relative_eq!(fragment.depth, expected, epsilon = 1e-5);
        }
        assert!(!hits.is_empty());
    }
}
