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

//! Off-screen pick and ray-pick passes over the visible entries.

use super::codec::{decode_pick_index, unpack_depth_bytes};
use crate::command_lane::{CommandPlayer, RenderMode};
use crate::draw_lane::{DrawListBuilder, EntryId, StatePayload};
use crate::error::RenderResult;
use glam::{Mat4, Vec3, Vec4};
use scenery_core::renderer::{FramebufferId, GpuDevice};
use scenery_data::StateKind;

/// A pick result.
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Name of the innermost name node above the hit geometry.
    pub name: String,
    /// Canvas coordinates that were picked, origin at the top left.
    pub canvas_pos: [u32; 2],
    /// World-space position of the hit, when requested.
    pub world_pos: Option<Vec3>,
}

#[derive(Debug, Clone, Copy)]
struct Targets {
    size: (u32, u32),
    pick: FramebufferId,
    ray: FramebufferId,
}

/// Owns the pick targets of one scene.
///
/// Targets match the canvas size and are recreated when it changes.
#[derive(Debug, Default)]
pub struct Picker {
    targets: Option<Targets>,
}

impl Picker {
    /// Creates a picker; targets are allocated by the first pick.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the named geometry under a canvas position.
    ///
    /// Entries whose flags disable picking are skipped. Background, unnamed
    /// geometry and positions outside the canvas yield `None`.
    pub fn pick(
        &mut self,
        device: &mut dyn GpuDevice,
        builder: &mut DrawListBuilder,
        player: &mut CommandPlayer,
        x: u32,
        y: u32,
        with_world_pos: bool,
    ) -> RenderResult<Option<PickHit>> {
        let (width, height) = device.canvas_size();
        if x >= width || y >= height {
            return Ok(None);
        }
        let targets = self.targets(device, (width, height))?;
        let row = height - 1 - y;

        let pickable = Self::pickable(builder);
        Self::render(device, builder, player, &pickable, targets.pick, RenderMode::Pick)?;
        let [r, g, b, _] = device.read_pixel(x, row);
        let index = decode_pick_index([r, g, b]);
        let hit = index
            .checked_sub(1)
            .and_then(|i| player.pick_table().get(i as usize).copied());
        let Some(id) = hit else {
            device.bind_framebuffer(None);
            log::debug!("Pick at ({x}, {y}) hit the background");
            return Ok(None);
        };

        let soup = builder.soup();
        let Some(entry) = builder.bin().get(id) else {
            device.bind_framebuffer(None);
            return Ok(None);
        };
        let name = soup
            .get(entry.binding(StateKind::Name))
            .and_then(StatePayload::name)
            .and_then(|n| n.name.clone());
        let Some(name) = name else {
            device.bind_framebuffer(None);
            log::debug!("Pick at ({x}, {y}) hit unnamed entry {id:?}");
            return Ok(None);
        };
        let matrix = |kind| {
            soup.get(entry.binding(kind))
                .and_then(StatePayload::transform)
                .map_or(Mat4::IDENTITY, |t| t.matrix)
        };
        let view_proj = matrix(StateKind::ProjTransform) * matrix(StateKind::ViewTransform);

        let world_pos = if with_world_pos {
            Self::render(device, builder, player, &pickable, targets.ray, RenderMode::RayPick)?;
            let depth = unpack_depth_bytes(device.read_pixel(x, row));
            Some(unproject(view_proj, x, y, (width, height), depth))
        } else {
            None
        };
        device.bind_framebuffer(None);

        log::debug!("Pick at ({x}, {y}) hit '{name}'");
        Ok(Some(PickHit {
            name,
            canvas_pos: [x, y],
            world_pos,
        }))
    }

    /// Destroys the pick targets.
    pub fn release(&mut self, device: &mut dyn GpuDevice) {
        if let Some(targets) = self.targets.take() {
            for framebuffer in [targets.pick, targets.ray] {
                if let Err(e) = device.destroy_framebuffer(framebuffer) {
                    log::warn!("Failed to destroy pick target {framebuffer:?}: {e}");
                }
            }
        }
    }

    fn targets(&mut self, device: &mut dyn GpuDevice, size: (u32, u32)) -> RenderResult<Targets> {
        if let Some(targets) = self.targets {
            if targets.size == size {
                return Ok(targets);
            }
            log::debug!("Canvas resized to {size:?}, recreating pick targets");
            self.release(device);
        }
        let pick = device.create_framebuffer(size.0, size.1)?;
        let ray = match device.create_framebuffer(size.0, size.1) {
            Ok(ray) => ray,
            Err(e) => {
                if let Err(e) = device.destroy_framebuffer(pick) {
                    log::warn!("Failed to destroy pick target {pick:?}: {e}");
                }
                return Err(e.into());
            }
        };
        let targets = Targets { size, pick, ray };
        self.targets = Some(targets);
        Ok(targets)
    }

    fn pickable(builder: &mut DrawListBuilder) -> Vec<EntryId> {
        let (soup, bin) = builder.parts_mut();
        let visible = bin.visible(soup).to_vec();
        visible
            .into_iter()
            .filter(|id| {
                bin.get(*id).is_some_and(|e| {
                    soup.get(e.binding(StateKind::Flags))
                        .and_then(StatePayload::flags)
                        .map_or(true, |f| f.picking)
                })
            })
            .collect()
    }

    fn render(
        device: &mut dyn GpuDevice,
        builder: &DrawListBuilder,
        player: &mut CommandPlayer,
        entries: &[EntryId],
        target: FramebufferId,
        mode: RenderMode,
    ) -> RenderResult<()> {
        device.bind_framebuffer(Some(target));
        device.clear([0.0; 4]);
        player.init(mode);
        let version = builder.bin().version();
        for &id in entries {
            if let Some(entry) = builder.bin().get(id) {
                player.render_entry(device, builder.soup(), builder.programs(), version, id, entry)?;
            }
        }
        player.cleanup(device);
        Ok(())
    }
}

/// Maps a canvas pixel and a normalized depth back to world space.
///
/// The pixel center is used; `y` counts from the top of the canvas.
pub fn unproject(view_proj: Mat4, x: u32, y: u32, size: (u32, u32), depth: f32) -> Vec3 {
    let ndc = Vec4::new(
        2.0 * (x as f32 + 0.5) / size.0 as f32 - 1.0,
        1.0 - 2.0 * (y as f32 + 0.5) / size.1 as f32,
        2.0 * depth - 1.0,
        1.0,
    );
    let world = view_proj.inverse() * ndc;
    if world.w.abs() <= f32::EPSILON {
        return world.truncate();
    }
    world.truncate() / world.w
}
