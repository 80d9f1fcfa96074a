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

//! Color and depth storage of the canvas and of off-screen framebuffers.

/// Converts a normalized channel to a byte.
///
/// This is `floor(c * 256)` with a small bias, not the `round(c * 255)` a
/// hardware GPU applies. Exact multiples of 1/255 and of 1/256 both land on
/// their byte, so pick colors and packed depth read back exactly here. On a
/// hardware device the packed depth bytes may be off by one, which moves the
/// unpacked depth by less than 2/256.
pub(crate) fn quantize(channel: f32) -> u8 {
    (channel * 256.0 + 1e-3).floor().clamp(0.0, 255.0) as u8
}

/// An RGBA8 color buffer with a float depth buffer, rows stored bottom up.
#[derive(Debug, Clone)]
pub(crate) struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub color: Vec<[u8; 4]>,
    pub depth: Vec<f32>,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![[0; 4]; len],
            depth: vec![1.0; len],
        }
    }

    /// Bytes held by the target.
    pub fn byte_size(&self) -> usize {
        self.color.len() * 8
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        let color = color.map(quantize);
        self.color.fill(color);
        self.depth.fill(1.0);
    }

    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.index(x, y).map_or([0; 4], |i| self.color[i])
    }

    /// Color rows top down, tightly packed.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.color.len() * 4);
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                out.extend_from_slice(&self.pixel(x, y));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantization_keeps_byte_fractions_exact() {
        for b in 0..=255u8 {
            assert_eq!(quantize(b as f32 / 255.0), b);
            assert_eq!(quantize(b as f32 / 256.0), b);
        }
        assert_eq!(quantize(-0.5), 0);
        // half-way values truncate instead of rounding
        assert_eq!(quantize(0.5 / 255.0), 0);
        assert_eq!(quantize(2.0), 255);
    }

    #[test]
    fn test_clear_resets_color_and_depth() {
        let mut target = RenderTarget::new(4, 2);
        target.depth[3] = 0.25;
        target.clear([1.0, 0.0, 0.0, 1.0]);
        assert_eq!(target.pixel(3, 1), [255, 0, 0, 255]);
        assert!(target.depth.iter().all(|d| *d == 1.0));
        assert_eq!(target.pixel(4, 0), [0; 4]);
    }

    #[test]
    fn test_rgba_rows_are_flipped_to_top_down() {
        let mut target = RenderTarget::new(1, 2);
        target.color[0] = [1, 1, 1, 1];
        assert_eq!(target.to_rgba(), vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }
}
