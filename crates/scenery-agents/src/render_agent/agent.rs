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

//! Defines the RenderAgent, the orchestrator owning every scene.

use super::context::SceneCompileContext;
use super::traversal;
use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use scenery_core::event::{EventBus, SceneEvent};
use scenery_core::renderer::GpuDevice;
use scenery_core::scene::{CompileLevel, NodeId, NodeOp, PassLevel, SceneId};
use scenery_core::EngineSettings;
use scenery_data::state::ListenerId;
use scenery_data::{AttrValue, NodeData};
use scenery_lanes::command_lane::{FrameStats, RenderMode};
use scenery_lanes::draw_lane::{PassSummary, TagMask};
use scenery_lanes::pick_lane::PickHit;
use scenery_lanes::sort_lane::sort;
use scenery_lanes::{RenderError, RenderResult};
use std::time::{Duration, Instant};

/// Report of one [`RenderAgent::render_frame`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStats {
    /// The scene rendered.
    pub scene: SceneId,
    /// Frames of this scene rendered so far, this one included.
    pub frame_number: u64,
    /// What the compile scheduler decided for this frame.
    pub pass_level: PassLevel,
    /// Entries rendered.
    pub entries: usize,
    /// Indexed draws issued.
    pub draw_calls: usize,
    /// Program changes between consecutive entries.
    pub program_switches: usize,
    /// Commands built because no cached list was valid.
    pub commands_built: usize,
    /// Commands replayed from a cached list.
    pub commands_replayed: usize,
    /// Entries created or rebuilt by the compile pass.
    pub entries_rebuilt: usize,
    /// Entries whose handles were swapped in place by the compile pass.
    pub entries_reattached: usize,
    /// Programs alive after the pass.
    pub live_programs: usize,
    /// Render listeners fired during the draw, in firing order.
    pub fired_listeners: Vec<ListenerId>,
    /// Wall time spent in the call.
    pub frame_time: Duration,
}

impl RenderStats {
    fn new(
        scene: SceneId,
        frame_number: u64,
        pass_level: PassLevel,
        summary: PassSummary,
        frame: FrameStats,
        live_programs: usize,
        frame_time: Duration,
    ) -> Self {
        Self {
            scene,
            frame_number,
            pass_level,
            entries: frame.entries,
            draw_calls: frame.draw_calls,
            program_switches: frame.program_switches,
            commands_built: frame.commands_built,
            commands_replayed: frame.commands_replayed,
            entries_rebuilt: summary.entries_rebuilt,
            entries_reattached: summary.entries_reattached,
            live_programs,
            fired_listeners: frame.fired_listeners,
            frame_time,
        }
    }
}

/// The agent responsible for compiling, rendering and picking scenes.
///
/// It owns the GPU device and one [`SceneCompileContext`] per scene, and
/// publishes lifecycle and error notifications on its event bus.
pub struct RenderAgent {
    // The device every scene renders through.
    device: Box<dyn GpuDevice>,
    settings: EngineSettings,
    scenes: AHashMap<SceneId, SceneCompileContext>,
    next_scene: u32,
    // Outbound notifications, including the error channel.
    events: EventBus<SceneEvent>,
    // Total number of frames rendered across all scenes.
    frame_count: u64,
}

impl std::fmt::Debug for RenderAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderAgent")
            .field("device", &self.device)
            .field("scenes", &self.scenes.len())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

fn lookup(
    scenes: &mut AHashMap<SceneId, SceneCompileContext>,
    scene: SceneId,
) -> Result<&mut SceneCompileContext> {
    scenes
        .get_mut(&scene)
        .ok_or_else(|| anyhow!("Unknown scene {scene}"))
}

impl RenderAgent {
    /// Creates an agent rendering through `device`.
    pub fn new(device: Box<dyn GpuDevice>, settings: EngineSettings) -> Self {
        log::info!(
            "RenderAgent created (canvas '{}', {:?} sort)",
            settings.canvas_id,
            settings.sort_policy
        );
        Self {
            device,
            settings,
            scenes: AHashMap::new(),
            next_scene: 0,
            events: EventBus::new(),
            frame_count: 0,
        }
    }

    /// The settings every new scene is configured from.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The GPU device.
    pub fn device(&self) -> &dyn GpuDevice {
        self.device.as_ref()
    }

    /// The GPU device, for direct read-back.
    pub fn device_mut(&mut self) -> &mut dyn GpuDevice {
        self.device.as_mut()
    }

    /// The bus lifecycle and error notifications are published on.
    pub fn events(&self) -> &EventBus<SceneEvent> {
        &self.events
    }

    /// A scene's compile context.
    pub fn scene(&self, scene: SceneId) -> Option<&SceneCompileContext> {
        self.scenes.get(&scene)
    }

    /// Total number of frames rendered across all scenes.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Creates an empty scene. Its first frame compiles everything.
    pub fn create_scene(&mut self) -> SceneId {
        let id = SceneId(self.next_scene);
        self.next_scene += 1;
        self.scenes
            .insert(id, SceneCompileContext::new(id, &self.settings));
        self.events.publish(SceneEvent::SceneCreated { scene: id });
        log::info!("Created {id}");
        id
    }

    /// Destroys a scene and every GPU resource it holds.
    pub fn destroy_scene(&mut self, scene: SceneId) -> Result<()> {
        let mut ctx = self
            .scenes
            .remove(&scene)
            .ok_or_else(|| anyhow!("Unknown scene {scene}"))?;
        let device = self.device.as_mut();
        ctx.builder.clear(device);
        ctx.picker.release(device);
        self.events.publish(SceneEvent::SceneDestroyed { scene });
        log::info!("Destroyed {scene}");
        Ok(())
    }

    /// The root node of a scene.
    pub fn root(&self, scene: SceneId) -> Result<NodeId> {
        self.scene(scene)
            .map(|ctx| ctx.graph.root())
            .ok_or_else(|| anyhow!("Unknown scene {scene}"))
    }

    /// Appends a node under `parent`.
    pub fn add_node(&mut self, scene: SceneId, parent: NodeId, data: NodeData) -> Result<NodeId> {
        let ctx = lookup(&mut self.scenes, scene)?;
        let kind = data.kind();
        let node = ctx
            .graph
            .add_node(parent, data)
            .with_context(|| format!("Adding a {kind} node to {scene}"))?;
        ctx.scheduler.notify(node, kind, NodeOp::Add, None, None);
        Ok(node)
    }

    /// Removes a node and its subtree.
    ///
    /// Entries of the removed geometry are destroyed right away; the state
    /// and programs they referenced are evicted by the next compile pass.
    pub fn remove_node(&mut self, scene: SceneId, node: NodeId) -> Result<()> {
        let ctx = lookup(&mut self.scenes, scene)?;
        let kind = ctx
            .graph
            .node(node)
            .with_context(|| format!("Removing a node from {scene}"))?
            .kind;
        let geometry: Vec<NodeId> = ctx
            .graph
            .subtree(node)
            .into_iter()
            .filter(|id| {
                ctx.graph
                    .get(*id)
                    .is_some_and(|n| matches!(n.data, NodeData::Geometry(_)))
            })
            .collect();
        ctx.graph
            .remove_subtree(node)
            .with_context(|| format!("Removing node {node} from {scene}"))?;
        let device = self.device.as_mut();
        for id in geometry {
            ctx.builder.remove_geometry(device, id);
        }
        ctx.scheduler.notify(node, kind, NodeOp::Remove, None, None);
        Ok(())
    }

    /// Writes one node attribute and records the compile level it needs.
    ///
    /// Changes resolving to [`CompileLevel::Redraw`] or
    /// [`CompileLevel::Resort`] are applied to the exported payloads right
    /// away, so the next frame replays the cached draw list with the new
    /// values.
    pub fn set_attribute(
        &mut self,
        scene: SceneId,
        node: NodeId,
        attr: &str,
        sub_attr: Option<&str>,
        value: AttrValue,
    ) -> Result<CompileLevel> {
        let ctx = lookup(&mut self.scenes, scene)?;
        let kind = ctx
            .graph
            .set_attribute(node, attr, sub_attr, &value)
            .with_context(|| format!("Setting '{attr}' on node {node} of {scene}"))?
            .kind;
        let level = ctx
            .scheduler
            .notify(node, kind, NodeOp::Set, Some(attr), sub_attr);
        if matches!(level, CompileLevel::Redraw | CompileLevel::Resort) && !ctx.refresh_in_place(node)
        {
            log::warn!("'{attr}' on {kind} node {node} needs a recompile");
            ctx.scheduler.request_full_compile();
        }
        Ok(level)
    }

    /// Restricts drawing to entries whose tag matches `mask`, or lifts the
    /// restriction with `None`.
    pub fn set_tag_mask(&mut self, scene: SceneId, mask: Option<&str>) -> Result<()> {
        let ctx = lookup(&mut self.scenes, scene)?;
        ctx.builder.bin_mut().set_tag_mask(mask.map(TagMask::new));
        ctx.scheduler.request_redraw();
        Ok(())
    }

    /// Compiles what changed since the last frame, sorts if needed and draws
    /// the visible entries to the canvas.
    ///
    /// A frame with nothing to do draws nothing. Shader failures are
    /// published on the event bus and leave the scene unrenderable until a
    /// full compile succeeds.
    pub fn render_frame(&mut self, scene: SceneId) -> Result<RenderStats> {
        let start = Instant::now();
        let device = self.device.as_mut();
        let ctx = lookup(&mut self.scenes, scene)?;

        let decision = ctx.scheduler.begin_pass(&ctx.graph);
        self.events.publish(SceneEvent::SceneCompiling {
            scene,
            level: decision.level,
        });

        let mut summary = PassSummary::default();
        if decision.level.traverses() {
            let outcome = traversal::compile(ctx, device, decision.level);
            ctx.scheduler.end_pass();
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.events.publish(SceneEvent::Error {
                        scene,
                        message: e.to_string(),
                    });
                    return Err(e).with_context(|| format!("Compiling {scene}"));
                }
            };
            for failure in &outcome.shader_failures {
                self.events.publish(SceneEvent::Error {
                    scene,
                    message: failure.to_string(),
                });
            }
            summary = outcome.summary;
        } else {
            ctx.scheduler.end_pass();
        }

        if let Some(signature) = ctx.builder.unrenderable() {
            let e = RenderError::Unrenderable {
                signature: signature.to_string(),
            };
            return Err(e).with_context(|| format!("Rendering {scene}"));
        }

        if decision.resort || ctx.builder.bin().needs_sort() {
            let (soup, bin) = ctx.builder.parts_mut();
            sort(ctx.sorter.as_ref(), bin, soup);
        }

        if !decision.level.renders() {
            return Ok(RenderStats::new(
                scene,
                ctx.frame_number,
                decision.level,
                summary,
                FrameStats::default(),
                ctx.builder.programs().len(),
                start.elapsed(),
            ));
        }

        self.events.publish(SceneEvent::SceneRendering { scene });
        device.bind_framebuffer(None);
        device.clear(self.settings.clear_color);
        let drawn = draw(ctx, device);
        let frame = ctx.player.cleanup(device);
        drawn.with_context(|| format!("Rendering {scene}"))?;

        ctx.frame_number += 1;
        self.frame_count += 1;
        let stats = RenderStats::new(
            scene,
            ctx.frame_number,
            decision.level,
            summary,
            frame,
            ctx.builder.programs().len(),
            start.elapsed(),
        );
        log::debug!(
            "Rendered frame {} of {scene}: {:?} pass, {} draws, {} built, {} replayed",
            stats.frame_number,
            stats.pass_level,
            stats.draw_calls,
            stats.commands_built,
            stats.commands_replayed
        );
        Ok(stats)
    }

    /// Resolves the named geometry under a canvas position of a scene.
    ///
    /// Picks against the draw list of the last compile. Misses and pick
    /// failures other than resource exhaustion yield `None`.
    pub fn pick(
        &mut self,
        scene: SceneId,
        x: u32,
        y: u32,
        with_world_pos: bool,
    ) -> Result<Option<PickHit>> {
        let device = self.device.as_mut();
        let ctx = lookup(&mut self.scenes, scene)?;
        let SceneCompileContext {
            builder,
            player,
            picker,
            ..
        } = ctx;
        match picker.pick(device, builder, player, x, y, with_world_pos) {
            Ok(hit) => Ok(hit),
            Err(RenderError::Resource(e)) => {
                Err(e).with_context(|| format!("Picking ({x}, {y}) in {scene}"))
            }
            Err(e) => {
                log::warn!("Pick at ({x}, {y}) in {scene} failed: {e}");
                Ok(None)
            }
        }
    }

    /// Handles inbound notifications. Returns how many were handled.
    ///
    /// `Reset` resets every scene, `SceneDestroyed` destroys the scene,
    /// `SceneCompiling` with [`PassLevel::Everything`] schedules a full
    /// compile and `SceneRendering` schedules a redraw.
    pub fn process_events(&mut self, events: impl IntoIterator<Item = SceneEvent>) -> usize {
        let mut handled = 0;
        for event in events {
            match event {
                SceneEvent::Reset => self.reset_scenes(),
                SceneEvent::SceneDestroyed { scene } => {
                    if let Err(e) = self.destroy_scene(scene) {
                        log::warn!("Ignoring destroy notification: {e}");
                        continue;
                    }
                }
                SceneEvent::SceneCompiling { scene, level } => {
                    let Some(ctx) = self.scenes.get_mut(&scene) else {
                        continue;
                    };
                    match level {
                        PassLevel::Everything => ctx.scheduler.request_full_compile(),
                        _ => ctx.scheduler.request_redraw(),
                    }
                }
                SceneEvent::SceneRendering { scene } => {
                    let Some(ctx) = self.scenes.get_mut(&scene) else {
                        continue;
                    };
                    ctx.scheduler.request_redraw();
                }
                SceneEvent::SceneCreated { .. } | SceneEvent::Error { .. } => {
                    log::trace!("Ignoring inbound {event:?}");
                    continue;
                }
            }
            handled += 1;
        }
        handled
    }

    /// Releases every entry, handle, program and pick target of every scene
    /// and schedules a full compile. Scene trees are kept.
    pub fn reset(&mut self) {
        self.reset_scenes();
        self.events.publish(SceneEvent::Reset);
    }

    fn reset_scenes(&mut self) {
        let device = self.device.as_mut();
        for ctx in self.scenes.values_mut() {
            ctx.builder.clear(device);
            ctx.player.invalidate_all();
            ctx.picker.release(device);
            ctx.stacks.reset();
            ctx.scheduler.request_full_compile();
        }
        log::info!("Reset {} scenes", self.scenes.len());
    }
}

fn draw(ctx: &mut SceneCompileContext, device: &mut dyn GpuDevice) -> RenderResult<()> {
    ctx.player.init(RenderMode::Draw);
    let visible = {
        let (soup, bin) = ctx.builder.parts_mut();
        bin.visible(soup).to_vec()
    };
    let builder = &ctx.builder;
    let version = builder.bin().version();
    for id in visible {
        if let Some(entry) = builder.bin().get(id) {
            ctx.player.render_entry(
                device,
                builder.soup(),
                builder.programs(),
                version,
                id,
                entry,
            )?;
        }
    }
    Ok(())
}

impl Drop for RenderAgent {
    fn drop(&mut self) {
        let device = self.device.as_mut();
        for ctx in self.scenes.values_mut() {
            ctx.builder.clear(device);
            ctx.picker.release(device);
        }
    }
}
