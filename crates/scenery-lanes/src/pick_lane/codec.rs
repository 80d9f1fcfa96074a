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

//! Encodings used to read identity and depth back from a color target.

/// Largest index representable in one RGB pixel.
pub const MAX_PICK_INDEX: u32 = (1 << 24) - 1;

/// Splits an index into the red, green and blue bytes of a pick color.
pub fn encode_pick_index(index: u32) -> [u8; 3] {
    [
        (index & 0xFF) as u8,
        ((index >> 8) & 0xFF) as u8,
        ((index >> 16) & 0xFF) as u8,
    ]
}

/// Recovers an index from the red, green and blue bytes of a pixel.
pub fn decode_pick_index(rgb: [u8; 3]) -> u32 {
    rgb[0] as u32 | (rgb[1] as u32) << 8 | (rgb[2] as u32) << 16
}

/// The color written for a pick index, with each byte normalized by 255.
pub fn pick_color(index: u32) -> [f32; 4] {
    let [r, g, b] = encode_pick_index(index);
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
}

const SHIFTS: [f64; 4] = [256.0 * 256.0 * 256.0, 256.0 * 256.0, 256.0, 1.0];

/// Packs a normalized depth into four channels, least significant first.
///
/// Each channel above the first holds a multiple of 1/256, so the value
/// survives 8-bit quantization. Depths are clamped to `[0, 1)`.
pub fn pack_depth(depth: f32) -> [f32; 4] {
    let d = (depth as f64).clamp(0.0, 1.0 - 1.0 / SHIFTS[0] / 256.0);
    let mut out = [0.0f32; 4];
    for i in 0..4 {
        let hi = (d * SHIFTS[i]).fract();
        let lo = if i == 0 {
            0.0
        } else {
            (d * SHIFTS[i - 1]).fract() / 256.0
        };
        out[i] = (hi - lo) as f32;
    }
    out
}

/// Reconstructs a depth from four packed channels.
pub fn unpack_depth(channels: [f32; 4]) -> f32 {
    let weights = [1.0 / SHIFTS[0], 1.0 / SHIFTS[1], 1.0 / SHIFTS[2], 1.0];
    channels
        .iter()
        .zip(weights)
        .map(|(&c, w)| c as f64 * w)
        .sum::<f64>() as f32
}

/// Reconstructs a depth from a pixel read back from an 8-bit target.
pub fn unpack_depth_bytes(rgba: [u8; 4]) -> f32 {
    unpack_depth(rgba.map(|b| b as f32 / 256.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pick_indices_round_trip_across_the_range() {
        for index in [0, 1, 255, 256, 65_535, 65_536, 1_234_567, MAX_PICK_INDEX] {
            assert_eq!(decode_pick_index(encode_pick_index(index)), index);
        }
        for index in (0..=MAX_PICK_INDEX).step_by(9_973) {
            assert_eq!(decode_pick_index(encode_pick_index(index)), index);
        }
    }

    #[test]
    fn test_pick_colors_split_bytes_low_first() {
        assert_eq!(encode_pick_index(0x0A0B0C), [0x0C, 0x0B, 0x0A]);
        assert_eq!(pick_color(255), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_depth_round_trips_within_tolerance() {
        for i in 0..=1000 {
            let depth = i as f32 / 1000.0;
            assert_abs_diff_eq!(unpack_depth(pack_depth(depth)), depth, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_packed_depth_survives_byte_quantization() {
        for depth in [0.0, 0.1234, 0.5, 0.87654, 0.999] {
            let bytes = pack_depth(depth).map(|c| ((c * 256.0 + 1e-3).floor()).min(255.0) as u8);
            assert_abs_diff_eq!(unpack_depth_bytes(bytes), depth, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_packed_depth_tolerates_rounding_quantization() {
        for i in 0..=100 {
            let depth = i as f32 / 101.0;
            let bytes = pack_depth(depth).map(|c| (c * 255.0).round() as u8);
            assert_abs_diff_eq!(unpack_depth_bytes(bytes), depth, epsilon = 2.0 / 256.0);
        }
    }
}
