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

//! Builds, caches and replays the command list of each drawn entry.

use super::arena::CommandArena;
use super::command::{pipeline_state, AttributeSlot, Command, UniformSlot};
use super::RenderMode;
use crate::draw_lane::{DrawEntry, EntryId, StatePayload, StateSoup};
use crate::error::{RenderError, RenderResult};
use crate::pick_lane::pick_color;
use crate::shader_lane::ProgramCache;
use ahash::AHashSet;
use scenery_core::renderer::{FramebufferId, GpuDevice, ProgramId, UniformValue};
use scenery_data::state::ListenerId;
use scenery_data::{StateHandle, StateKind};

/// Counters of one pass of the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Entries rendered.
    pub entries: usize,
    /// Indexed draws issued.
    pub draw_calls: usize,
    /// Program binds issued.
    pub program_switches: usize,
    /// Commands built because no valid cached list existed.
    pub commands_built: usize,
    /// Commands replayed from a cached list.
    pub commands_replayed: usize,
    /// Listeners fired, in firing order.
    pub fired_listeners: Vec<ListenerId>,
}

/// Plays entries in one render mode.
///
/// Between [`init`](Self::init) and [`cleanup`](Self::cleanup) the player
/// remembers the handles bound by the previous entry. A list is built by
/// emitting commands only for kinds whose handle differs from the previous
/// entry's, except after a program switch, which re-emits every kind. Draw
/// commands are never elided. Lists are cached per entry and stay valid as
/// long as the bin version they were built against.
#[derive(Debug)]
pub struct CommandPlayer {
    arena: CommandArena,
    mode: RenderMode,
    previous: Option<[StateHandle; StateKind::COUNT]>,
    previous_program: Option<ProgramId>,
    cleared: AHashSet<FramebufferId>,
    pick_table: Vec<EntryId>,
    stats: FrameStats,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandPlayer {
    /// Creates a player with an empty cache.
    pub fn new() -> Self {
        Self {
            arena: CommandArena::new(),
            mode: RenderMode::Draw,
            previous: None,
            previous_program: None,
            cleared: AHashSet::new(),
            pick_table: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    /// Starts a pass in `mode`.
    pub fn init(&mut self, mode: RenderMode) {
        self.mode = mode;
        self.previous = None;
        self.previous_program = None;
        self.cleared.clear();
        self.pick_table.clear();
        self.stats = FrameStats::default();
    }

    /// Renders one entry, replaying its cached list when still valid.
    pub fn render_entry(
        &mut self,
        device: &mut dyn GpuDevice,
        soup: &StateSoup,
        programs: &ProgramCache,
        version: u64,
        id: EntryId,
        entry: &DrawEntry,
    ) -> RenderResult<()> {
        let program = programs
            .get(entry.program)
            .ok_or_else(|| RenderError::Unrenderable {
                signature: format!("{:?}", entry.program),
            })?;
        let program = if self.mode.is_pick() {
            program.pick
        } else {
            program.draw
        };
        if self.mode.is_pick() {
            self.pick_table.push(id);
        }

        let cached = self.arena.get(self.mode, id, version).is_some();
        if !cached {
            let commands = self.build(device, soup, program, entry);
            log::trace!(
                "Built {} {:?} commands for entry {id:?}",
                commands.len(),
                self.mode
            );
            self.stats.commands_built += commands.len();
            self.arena.store(self.mode, id, version, commands);
        }

        let Self {
            arena,
            mode,
            cleared,
            stats,
            ..
        } = self;
        let commands = arena.get(*mode, id, version).unwrap_or(&[]);
        if cached {
            stats.commands_replayed += commands.len();
        }
        for command in commands {
            execute(command, device, soup, *mode, cleared, stats);
        }

        self.previous = Some(entry.bindings);
        self.previous_program = Some(program);
        self.stats.entries += 1;
        Ok(())
    }

    /// Ends the pass, flushing the device. Returns the pass counters.
    pub fn cleanup(&mut self, device: &mut dyn GpuDevice) -> FrameStats {
        device.flush();
        self.previous = None;
        self.previous_program = None;
        std::mem::take(&mut self.stats)
    }

    /// Entries rendered by the last pick pass; pick index `i` is entry `i - 1`.
    pub fn pick_table(&self) -> &[EntryId] {
        &self.pick_table
    }

    /// Drops every cached list.
    pub fn invalidate_all(&mut self) {
        self.arena.clear();
    }

    fn build(
        &self,
        device: &dyn GpuDevice,
        soup: &StateSoup,
        program: ProgramId,
        entry: &DrawEntry,
    ) -> Vec<Command> {
        let switched = self.previous_program != Some(program);
        let changed = |kind: StateKind| {
            switched
                || self
                    .previous
                    .map_or(true, |p| p[kind.index()] != entry.binding(kind))
        };
        let draw_mode = !self.mode.is_pick();
        let mut out = Vec::new();
        let uniforms =
            |out: &mut Vec<Command>, handle: StateHandle, slots: Vec<(UniformSlot, String)>| {
                for (slot, name) in slots {
                    if let Some(location) = device.uniform_location(program, &name) {
                        out.push(Command::Uniform {
                            handle,
                            slot,
                            location,
                        });
                    }
                }
            };

        if switched {
            out.push(Command::UseProgram(program));
            if let Some(location) = device.uniform_location(program, "uRayPickMode") {
                let ray = self.mode == RenderMode::RayPick;
                out.push(Command::Literal {
                    location,
                    value: UniformValue::Int(ray as i32),
                });
            }
        }

        let payload = |kind: StateKind| soup.get(entry.binding(kind));
        let mut pipeline_emitted = false;
        for kind in StateKind::ALL {
            let handle = entry.binding(kind);
            let geometry_changed = kind == StateKind::Geometry && changed(StateKind::Morph);
            if !changed(kind) && !geometry_changed {
                continue;
            }
            match kind {
                StateKind::FrameBuf if draw_mode => out.push(Command::BindTarget(handle)),
                StateKind::Renderer | StateKind::Flags => {
                    if !pipeline_emitted {
                        out.push(Command::Pipeline {
                            flags: entry.binding(StateKind::Flags),
                            renderer: entry.binding(StateKind::Renderer),
                        });
                        pipeline_emitted = true;
                    }
                    let slots = if kind == StateKind::Renderer {
                        vec![(UniformSlot::PointSize, "uPointSize".to_string())]
                    } else {
                        vec![
                            (UniformSlot::Clipping, "uClipping".to_string()),
                            (UniformSlot::BackfaceLighting, "uBackfaceLighting".to_string()),
                            (UniformSlot::BackfaceTexturing, "uBackfaceTexturing".to_string()),
                            (UniformSlot::SpecularLighting, "uSpecularLighting".to_string()),
                        ]
                    };
                    uniforms(&mut out, handle, slots);
                }
                StateKind::ProjTransform => {
                    uniforms(&mut out, handle, vec![(UniformSlot::Matrix, "uPMatrix".into())])
                }
                StateKind::ViewTransform => uniforms(
                    &mut out,
                    handle,
                    vec![
                        (UniformSlot::Matrix, "uVMatrix".into()),
                        (UniformSlot::NormalMatrix, "uVNMatrix".into()),
                    ],
                ),
                StateKind::ModelTransform => uniforms(
                    &mut out,
                    handle,
                    vec![
                        (UniformSlot::Matrix, "uMMatrix".into()),
                        (UniformSlot::NormalMatrix, "uMNMatrix".into()),
                    ],
                ),
                StateKind::Lights if draw_mode => {
                    let count = payload(kind)
                        .and_then(StatePayload::lights)
                        .map_or(0, |l| l.lights.len());
                    let mut slots = vec![(UniformSlot::Ambient, "uAmbientColor".to_string())];
                    for i in 0..count {
                        slots.extend([
                            (UniformSlot::LightDir(i), format!("uLightDir{i}")),
                            (UniformSlot::LightPos(i), format!("uLightPos{i}")),
                            (UniformSlot::LightColor(i), format!("uLightColor{i}")),
                            (UniformSlot::LightAttenuation(i), format!("uLightAttenuation{i}")),
                            (UniformSlot::LightCutoff(i), format!("uLightCutoff{i}")),
                        ]);
                    }
                    uniforms(&mut out, handle, slots);
                }
                StateKind::Material if draw_mode => uniforms(
                    &mut out,
                    handle,
                    vec![
                        (UniformSlot::BaseColor, "uMaterialBaseColor".into()),
                        (UniformSlot::SpecularColor, "uMaterialSpecularColor".into()),
                        (UniformSlot::Specular, "uMaterialSpecular".into()),
                        (UniformSlot::Shine, "uMaterialShine".into()),
                        (UniformSlot::Emit, "uMaterialEmit".into()),
                        (UniformSlot::Alpha, "uMaterialAlpha".into()),
                    ],
                ),
                StateKind::Texture if draw_mode => {
                    let count = payload(kind)
                        .and_then(StatePayload::texture)
                        .map_or(0, |t| t.layers.len());
                    if count > 0 {
                        out.push(Command::BindTextures(handle));
                    }
                    let slots = (0..count)
                        .flat_map(|i| {
                            [
                                (UniformSlot::LayerSampler(i), format!("uSampler{i}")),
                                (UniformSlot::LayerMatrix(i), format!("uLayer{i}Matrix")),
                                (UniformSlot::LayerBlendFactor(i), format!("uLayer{i}BlendFactor")),
                            ]
                        })
                        .collect();
                    uniforms(&mut out, handle, slots);
                }
                StateKind::Clips => {
                    let count = payload(kind)
                        .and_then(StatePayload::clips)
                        .map_or(0, |c| c.planes.len());
                    let slots = (0..count)
                        .flat_map(|i| {
                            [
                                (UniformSlot::ClipMode(i), format!("uClipMode{i}")),
                                (UniformSlot::ClipPlane(i), format!("uClipNormalAndDist{i}")),
                            ]
                        })
                        .collect();
                    uniforms(&mut out, handle, slots);
                }
                StateKind::ColorTransform if draw_mode => uniforms(
                    &mut out,
                    handle,
                    vec![
                        (UniformSlot::ColorScale, "uColorTransformScale".into()),
                        (UniformSlot::ColorAdd, "uColorTransformAdd".into()),
                        (UniformSlot::ColorSaturation, "uColorTransformSaturation".into()),
                    ],
                ),
                StateKind::Morph => uniforms(
                    &mut out,
                    handle,
                    vec![(UniformSlot::MorphFactor, "uMorphFactor".into())],
                ),
                StateKind::ShaderParams => {
                    let slots = payload(kind)
                        .and_then(StatePayload::shader_params)
                        .map(|p| {
                            p.params
                                .keys()
                                .map(|name| (UniformSlot::Param(name.clone()), name.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    uniforms(&mut out, handle, slots);
                }
                StateKind::RenderListeners if draw_mode => {
                    let any = payload(kind)
                        .and_then(StatePayload::listeners)
                        .is_some_and(|l| !l.listeners.is_empty());
                    if any {
                        out.push(Command::Listeners(handle));
                    }
                }
                StateKind::Geometry => {
                    let morph = entry.binding(StateKind::Morph);
                    for (slot, name) in AttributeSlot::ALL {
                        if let Some(location) = device.attribute_location(program, name) {
                            out.push(Command::Attribute {
                                geometry: handle,
                                morph,
                                slot,
                                location,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        if self.mode == RenderMode::Pick {
            if let Some(location) = device.uniform_location(program, "uPickColor") {
                out.push(Command::Literal {
                    location,
                    value: UniformValue::Vec4(pick_color(self.pick_table.len() as u32)),
                });
            }
        }
        out.push(Command::Draw(entry.binding(StateKind::Geometry)));
        out
    }
}

fn execute(
    command: &Command,
    device: &mut dyn GpuDevice,
    soup: &StateSoup,
    mode: RenderMode,
    cleared: &mut AHashSet<FramebufferId>,
    stats: &mut FrameStats,
) {
    match command {
        Command::UseProgram(program) => {
            device.use_program(*program);
            stats.program_switches += 1;
        }
        Command::BindTarget(handle) => {
            let target = soup
                .get(*handle)
                .and_then(StatePayload::framebuffer)
                .and_then(|f| f.framebuffer);
            device.bind_framebuffer(target);
            if let Some(framebuffer) = target {
                if cleared.insert(framebuffer) {
                    device.clear([0.0; 4]);
                }
            }
        }
        Command::Pipeline { flags, renderer } => {
            if let (Some(flags), Some(renderer)) = (soup.get(*flags), soup.get(*renderer)) {
                device.set_pipeline_state(pipeline_state(flags, renderer, !mode.is_pick()));
            }
        }
        Command::Uniform {
            handle,
            slot,
            location,
        } => {
            if let Some(value) = soup.get(*handle).and_then(|p| slot.value(p)) {
                device.set_uniform(*location, value);
            }
        }
        Command::Literal { location, value } => device.set_uniform(*location, *value),
        Command::BindTextures(handle) => {
            if let Some(texture) = soup.get(*handle).and_then(StatePayload::texture) {
                for (unit, layer) in texture.layers.iter().enumerate() {
                    device.bind_texture(unit as u32, layer.texture);
                }
            }
        }
        Command::Attribute {
            geometry,
            morph,
            slot,
            location,
        } => {
            let Some(geometry) = soup.get(*geometry).and_then(StatePayload::geometry) else {
                return;
            };
            let morph = soup.get(*morph).and_then(StatePayload::morph);
            if let Some(buffer) = slot.buffer(geometry, morph) {
                device.bind_attribute(*location, buffer, slot.components());
            }
        }
        Command::Listeners(handle) => {
            if let Some(listeners) = soup.get(*handle).and_then(StatePayload::listeners) {
                stats.fired_listeners.extend(listeners.listeners.iter().copied());
            }
        }
        Command::Draw(handle) => match soup.get(*handle).and_then(StatePayload::geometry) {
            Some(geometry) => {
                device.draw_indexed(geometry.primitive, geometry.index_buffer, geometry.index_count);
                stats.draw_calls += 1;
            }
            None => log::warn!("Skipping draw of evicted geometry {handle:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_lane::DrawListBuilder;
    use crate::test_support::{Call, RecordingDevice};
    use glam::Vec3;
    use scenery_core::scene::{NodeId, PassLevel};
    use scenery_data::state::{
        ExportedState, GeometryData, MaterialState, RenderListenersState, ShaderCode,
        ShaderParamsState, ShaderState, StateSource, StateValue,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn node(index: u32) -> NodeId {
        NodeId {
            index,
            generation: 0,
        }
    }

    fn material_export(index: u32, revision: u64, color: Vec3) -> ExportedState {
        ExportedState {
            kind: StateKind::Material,
            top: Some((
                StateSource {
                    node: node(index),
                    revision,
                },
                StateValue::Material(MaterialState {
                    base_color: color,
                    ..Default::default()
                }),
            )),
        }
    }

    fn scene(device: &mut RecordingDevice) -> DrawListBuilder {
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .set_state(device, material_export(1, 1, Vec3::X))
            .unwrap();
        builder
            .bind_geometry(device, node(2), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder
            .bind_geometry(device, node(3), 1, &GeometryData::quad(0.5))
            .unwrap();
        builder.finish(device);
        builder
    }

    fn play(
        player: &mut CommandPlayer,
        device: &mut RecordingDevice,
        builder: &mut DrawListBuilder,
        mode: RenderMode,
    ) -> FrameStats {
        player.init(mode);
        let version = builder.bin().version();
        let ids: Vec<EntryId> = {
            let (soup, bin) = builder.parts_mut();
            bin.visible(soup).to_vec()
        };
        for id in ids {
            let entry = builder.bin().get(id).unwrap().clone();
            player
                .render_entry(device, builder.soup(), builder.programs(), version, id, &entry)
                .unwrap();
        }
        player.cleanup(device)
    }

    #[test]
    fn test_shared_state_is_not_reissued_for_the_next_entry() {
        let mut device = RecordingDevice::new();
        let mut builder = scene(&mut device);
        let mut player = CommandPlayer::new();
        device.calls.clear();

        let stats = play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.program_switches, 1);
        assert_eq!(device.uniform_writes("uMaterialBaseColor").len(), 1);
        // both entries bind their own vertex arrays
        let vertex_binds = device
            .calls
            .iter()
            .filter(|c| matches!(c, Call::BindAttribute(name, ..) if name == "aVertex"))
            .count();
        assert_eq!(vertex_binds, 2);
    }

    #[test]
    fn test_unchanged_bins_replay_cached_lists() {
        let mut device = RecordingDevice::new();
        let mut builder = scene(&mut device);
        let mut player = CommandPlayer::new();

        let first = play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        assert!(first.commands_built > 0);
        assert_eq!(first.commands_replayed, 0);

        let second = play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        assert_eq!(second.commands_built, 0);
        assert_eq!(second.commands_replayed, first.commands_built);
        assert_eq!(second.draw_calls, 2);
    }

    #[test]
    fn test_replay_reads_refreshed_payloads() {
        let mut device = RecordingDevice::new();
        let mut builder = scene(&mut device);
        let mut player = CommandPlayer::new();
        play(&mut player, &mut device, &mut builder, RenderMode::Draw);

        let refreshed = builder.refresh(
            StateKind::Material,
            StateSource {
                node: node(1),
                revision: 2,
            },
            StateValue::Material(MaterialState {
                base_color: Vec3::Z,
                ..Default::default()
            }),
        );
        assert!(refreshed);
        device.calls.clear();
        let stats = play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        assert_eq!(stats.commands_built, 0);
        assert_eq!(
            device.uniform_writes("uMaterialBaseColor"),
            vec![UniformValue::Vec3([0.0, 0.0, 1.0])]
        );
    }

    #[test]
    fn test_pick_pass_writes_one_color_per_entry() {
        let mut device = RecordingDevice::new();
        let mut builder = scene(&mut device);
        let mut player = CommandPlayer::new();
        device.calls.clear();

        play(&mut player, &mut device, &mut builder, RenderMode::Pick);
        assert_eq!(player.pick_table().len(), 2);
        assert_eq!(
            device.uniform_writes("uPickColor"),
            vec![
                UniformValue::Vec4(pick_color(1)),
                UniformValue::Vec4(pick_color(2))
            ]
        );
        assert_eq!(device.uniform_writes("uRayPickMode"), vec![UniformValue::Int(0)]);
        assert!(device.uniform_writes("uMaterialBaseColor").is_empty());
    }

    #[test]
    fn test_undeclared_uniforms_emit_nothing() {
        let mut device = RecordingDevice::new();
        let mut builder = scene(&mut device);
        let mut player = CommandPlayer::new();
        device.calls.clear();
        play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        // no lights and no point size: neither is declared
        assert!(device.uniform_writes("uLightColor0").is_empty());
        assert!(device.uniform_writes("uPointSize").is_empty());
    }

    #[test]
    fn test_listeners_fire_in_draw_mode_only() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .set_state(
                &mut device,
                ExportedState {
                    kind: StateKind::RenderListeners,
                    top: Some((
                        StateSource {
                            node: node(1),
                            revision: 1,
                        },
                        StateValue::RenderListeners(RenderListenersState {
                            listeners: vec![ListenerId(7)],
                        }),
                    )),
                },
            )
            .unwrap();
        builder
            .bind_geometry(&mut device, node(2), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder.finish(&mut device);

        let mut player = CommandPlayer::new();
        let draw = play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        assert_eq!(draw.fired_listeners, vec![ListenerId(7)]);
        let pick = play(&mut player, &mut device, &mut builder, RenderMode::Pick);
        assert!(pick.fired_listeners.is_empty());
    }

    fn export(kind: StateKind, index: u32, value: StateValue) -> ExportedState {
        ExportedState {
            kind,
            top: Some((
                StateSource {
                    node: node(index),
                    revision: 1,
                },
                value,
            )),
        }
    }

    fn params(entries: &[(&str, UniformValue)]) -> StateValue {
        StateValue::ShaderParams(ShaderParamsState {
            params: entries
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    /// A quad under a shader declaring `uTint` and an empty params node.
    fn tinted_scene(device: &mut RecordingDevice) -> DrawListBuilder {
        let code = ShaderCode {
            fragment_code: "uniform vec4 uTint;\n".into(),
            ..Default::default()
        };
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .set_state(
                device,
                export(
                    StateKind::Shader,
                    1,
                    StateValue::Shader(ShaderState {
                        code: Some(Arc::new(code)),
                    }),
                ),
            )
            .unwrap();
        builder
            .set_state(device, export(StateKind::ShaderParams, 2, params(&[])))
            .unwrap();
        builder
            .bind_geometry(device, node(3), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder.finish(device);
        builder
    }

    #[test]
    fn test_refreshed_params_with_new_names_are_uploaded() {
        let mut device = RecordingDevice::new();
        let mut builder = tinted_scene(&mut device);
        let mut player = CommandPlayer::new();
        play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        let version = builder.bin().version();

        // --- ACT ---
        let tint = UniformValue::Vec4([0.0, 1.0, 0.0, 1.0]);
        let source = StateSource {
            node: node(2),
            revision: 2,
        };
        let refreshed = builder.refresh(StateKind::ShaderParams, source, params(&[("uTint", tint)]));
        device.calls.clear();
        let stats = play(&mut player, &mut device, &mut builder, RenderMode::Draw);

        // --- ASSERT ---
        assert!(refreshed);
        assert!(builder.bin().version() > version);
        assert!(stats.commands_built > 0);
        assert_eq!(device.uniform_writes("uTint"), vec![tint]);
    }

    #[test]
    fn test_refreshed_params_with_the_same_names_are_replayed() {
        let mut device = RecordingDevice::new();
        let mut builder = tinted_scene(&mut device);
        let red = UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]);
        let blue = UniformValue::Vec4([0.0, 0.0, 1.0, 1.0]);
        let source = |revision| StateSource {
            node: node(2),
            revision,
        };
        assert!(builder.refresh(StateKind::ShaderParams, source(2), params(&[("uTint", red)])));
        let mut player = CommandPlayer::new();
        play(&mut player, &mut device, &mut builder, RenderMode::Draw);
        let version = builder.bin().version();

        // --- ACT ---
        let refreshed = builder.refresh(StateKind::ShaderParams, source(3), params(&[("uTint", blue)]));
        device.calls.clear();
        let stats = play(&mut player, &mut device, &mut builder, RenderMode::Draw);

        // --- ASSERT ---
        assert!(refreshed);
        assert_eq!(builder.bin().version(), version);
        assert_eq!(stats.commands_built, 0);
        assert_eq!(device.uniform_writes("uTint"), vec![blue]);
    }
}
