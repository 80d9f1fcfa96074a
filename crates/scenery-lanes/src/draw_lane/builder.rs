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

//! Turns the state soup's current handles into draw-list entries.

use super::bin::{DrawBin, DrawEntry, EntryId};
use super::soup::StateSoup;
use crate::error::{RenderError, RenderResult};
use crate::shader_lane::{ProgramCache, ProgramKey, StateSignature};
use ahash::{AHashMap, AHashSet};
use scenery_core::renderer::GpuDevice;
use scenery_core::scene::{NodeId, PassLevel};
use scenery_data::state::{ExportedState, GeometryData, StateSource, StateValue};
use scenery_data::{StateHandle, StateKind};
use std::sync::Arc;

const SIGNATURE_LEN: usize = 8;

/// Kinds whose parts make up a state signature, in signature order.
const SIGNATURE_KINDS: [StateKind; SIGNATURE_LEN] = [
    StateKind::Clips,
    StateKind::ColorTransform,
    StateKind::Lights,
    StateKind::Morph,
    StateKind::Texture,
    StateKind::Shader,
    StateKind::Renderer,
    StateKind::Geometry,
];

type Bindings = [StateHandle; StateKind::COUNT];

/// What the last [`finish`](DrawListBuilder::finish) cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Entries built or rebuilt during the pass.
    pub entries_rebuilt: usize,
    /// Entries whose flags or listeners were re-attached in place.
    pub entries_reattached: usize,
    /// Pool slots evicted because nothing referenced them.
    pub states_swept: usize,
    /// Programs destroyed because no entry used them.
    pub programs_collected: usize,
}

/// Owns the draw list of one scene: the state soup, the bin and the programs.
///
/// A pass is bracketed by [`begin`](Self::begin) and [`finish`](Self::finish).
/// In between, traversal feeds exported stack tops through
/// [`set_state`](Self::set_state) and calls
/// [`bind_geometry`](Self::bind_geometry) for every geometry node visited.
#[derive(Debug)]
pub struct DrawListBuilder {
    canvas_id: String,
    soup: StateSoup,
    bin: DrawBin,
    programs: ProgramCache,
    pass: PassLevel,
    signatures: AHashMap<[StateHandle; SIGNATURE_LEN], Arc<StateSignature>>,
    bound: AHashSet<NodeId>,
    summary: PassSummary,
    failed: Option<String>,
}

impl DrawListBuilder {
    /// Creates an empty draw list for a canvas.
    pub fn new(canvas_id: impl Into<String>) -> Self {
        Self {
            canvas_id: canvas_id.into(),
            soup: StateSoup::new(),
            bin: DrawBin::new(),
            programs: ProgramCache::new(),
            pass: PassLevel::Nothing,
            signatures: AHashMap::new(),
            bound: AHashSet::new(),
            summary: PassSummary::default(),
            failed: None,
        }
    }

    /// The state soup.
    pub fn soup(&self) -> &StateSoup {
        &self.soup
    }

    /// The draw-list bin.
    pub fn bin(&self) -> &DrawBin {
        &self.bin
    }

    /// Mutable bin access, for sorting and the visible cache.
    pub fn bin_mut(&mut self) -> &mut DrawBin {
        &mut self.bin
    }

    /// Soup and bin together, for callers reading payloads while filtering.
    pub fn parts_mut(&mut self) -> (&StateSoup, &mut DrawBin) {
        (&self.soup, &mut self.bin)
    }

    /// The program cache.
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// The signature of the last program that failed to build, if the scene
    /// has been unrenderable since the last successful full pass.
    pub fn unrenderable(&self) -> Option<&str> {
        self.failed.as_deref()
    }

    /// Starts a traversal pass.
    pub fn begin(&mut self, pass: PassLevel) {
        self.pass = pass;
        self.signatures.clear();
        self.bound.clear();
        self.summary = PassSummary::default();
        self.soup.reset_current();
        if pass == PassLevel::Everything {
            self.programs.forget_failures();
            self.failed = None;
        }
    }

    /// Sets the current handle of one kind from an exported stack top.
    pub fn set_state(
        &mut self,
        device: &mut dyn GpuDevice,
        exported: ExportedState,
    ) -> RenderResult<()> {
        let full = self.pass == PassLevel::Everything;
        self.soup
            .set_state(device, exported.kind, exported.top, full)
    }

    /// Creates, updates or re-attaches the entries of one geometry node.
    ///
    /// One entry exists per geometry part. An entry whose bindings are
    /// unchanged is left alone. During a partial pass an entry whose only
    /// changes are in re-attachable kinds keeps its program and swaps those
    /// handles in place; any other change rebuilds the entry. New handles
    /// and programs are acquired before old ones are released, so state
    /// shared with the old bindings is never evicted in between.
    pub fn bind_geometry(
        &mut self,
        device: &mut dyn GpuDevice,
        node: NodeId,
        revision: u64,
        geometry: &GeometryData,
    ) -> RenderResult<()> {
        self.bound.insert(node);
        let parts = self
            .soup
            .geometry_handles(device, node, revision, geometry)?;
        let existing = self.bin.entries_of(node);
        let mut first_error = None;

        for (part, &geometry_handle) in parts.iter().enumerate() {
            let bindings = self.current_bindings(geometry_handle)?;
            let result = match existing.get(part) {
                Some(&id) => self.update_entry(device, id, bindings),
                None => self.create_entry(device, node, part as u32, bindings),
            };
            if let Err(e) = result {
                if let Some(&id) = existing.get(part) {
                    self.destroy_entry(device, id);
                }
                first_error.get_or_insert(e);
            }
        }
        for &id in existing.iter().skip(parts.len()) {
            self.destroy_entry(device, id);
        }

        match first_error {
            Some(e) => {
                if let Some(signature) = e.signature() {
                    self.failed = Some(signature.to_string());
                }
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Destroys every entry owned by a geometry node, releasing its references.
    pub fn remove_geometry(&mut self, device: &mut dyn GpuDevice, node: NodeId) {
        let ids = self.bin.entries_of(node);
        for id in &ids {
            self.destroy_entry(device, *id);
        }
        if !ids.is_empty() {
            log::debug!("Removed {} entries of geometry node {node}", ids.len());
        }
    }

    /// Refreshes a node's exported payload without rebuilding any entry.
    ///
    /// Returns `false` when the change cannot be applied in place. Shader
    /// params whose names changed are refreshed too, and the bin is
    /// invalidated so command lists are rebuilt with the new uniform slots.
    pub fn refresh(&mut self, kind: StateKind, source: StateSource, value: StateValue) -> bool {
        let relayout = self.soup.params_layout_changes(source.node, &value);
        if !self.soup.refresh_state(kind, source, value) {
            return false;
        }
        match kind {
            StateKind::Flags | StateKind::Tag => self.bin.invalidate(),
            StateKind::ShaderParams if relayout => {
                log::debug!("Shader params of node {} changed names", source.node);
                self.bin.invalidate();
            }
            StateKind::Layer => {
                self.bin.invalidate();
                self.bin.request_sort();
            }
            _ => {}
        }
        true
    }

    /// Ends a traversal pass.
    ///
    /// After a full pass, entries of geometry nodes that were not bound are
    /// destroyed. Unreferenced pool slots and programs are then evicted and
    /// the visible cache is dropped.
    pub fn finish(&mut self, device: &mut dyn GpuDevice) -> PassSummary {
        if self.pass == PassLevel::Everything {
            let orphans: Vec<EntryId> = self
                .bin
                .order()
                .iter()
                .copied()
                .filter(|id| {
                    self.bin
                        .get(*id)
                        .is_some_and(|e| !e.destroyed && !self.bound.contains(&e.node))
                })
                .collect();
            for id in orphans {
                self.destroy_entry(device, id);
            }
        }
        self.bin.sweep();
        self.summary.states_swept = self.soup.sweep_unreferenced(device);
        self.summary.programs_collected = self.programs.collect_garbage(device);
        self.bin.invalidate();
        self.soup.reset_current();
        self.signatures.clear();
        log::debug!(
            "Finished {:?} pass: {} entries, {} programs, {:?}",
            self.pass,
            self.bin.len(),
            self.programs.len(),
            self.summary
        );
        self.summary
    }

    /// Releases every entry, handle and program.
    pub fn clear(&mut self, device: &mut dyn GpuDevice) {
        for entry in self.bin.drain() {
            self.release_entry(device, &entry);
        }
        self.soup.clear(device);
        self.programs.clear(device);
        self.signatures.clear();
        self.failed = None;
    }

    fn current_bindings(&self, geometry: StateHandle) -> RenderResult<Bindings> {
        let mut bindings = [geometry; StateKind::COUNT];
        for kind in StateKind::ALL {
            if kind == StateKind::Geometry {
                continue;
            }
            bindings[kind.index()] = self
                .soup
                .current(kind)
                .ok_or(RenderError::StaleHandle { kind })?;
        }
        Ok(bindings)
    }

    fn signature(&mut self, bindings: &Bindings) -> Arc<StateSignature> {
        let key = SIGNATURE_KINDS.map(|kind| bindings[kind.index()]);
        if let Some(signature) = self.signatures.get(&key) {
            return signature.clone();
        }
        let mut signature = StateSignature::new(self.canvas_id.clone());
        for handle in key {
            if let Some(part) = self.soup.part(handle) {
                signature.apply(part);
            }
        }
        let signature = Arc::new(signature);
        self.signatures.insert(key, signature.clone());
        signature
    }

    fn create_entry(
        &mut self,
        device: &mut dyn GpuDevice,
        node: NodeId,
        part: u32,
        bindings: Bindings,
    ) -> RenderResult<()> {
        let signature = self.signature(&bindings);
        let program = self.programs.get_program(device, &signature)?;
        for handle in bindings {
            self.soup.acquire(handle);
        }
        let id = self.bin.insert(DrawEntry {
            node,
            part,
            bindings,
            program,
            sort_key: 0,
            destroyed: false,
        });
        self.summary.entries_rebuilt += 1;
        log::trace!("Created entry {id:?} for node {node} part {part}");
        Ok(())
    }

    fn update_entry(
        &mut self,
        device: &mut dyn GpuDevice,
        id: EntryId,
        bindings: Bindings,
    ) -> RenderResult<()> {
        let Some((old_bindings, old_program)) =
            self.bin.get(id).map(|e| (e.bindings, e.program))
        else {
            return Ok(());
        };
        let signature = self.signature(&bindings);
        let same_program = self
            .programs
            .get(old_program)
            .is_some_and(|p| p.signature.key() == signature.key());
        if same_program && old_bindings == bindings {
            return Ok(());
        }

        let only_reattachable = StateKind::ALL
            .iter()
            .all(|k| k.reattachable() || old_bindings[k.index()] == bindings[k.index()]);
        if self.pass == PassLevel::Partial && same_program && only_reattachable {
            self.swap_bindings(device, id, &old_bindings, bindings, old_program);
            self.summary.entries_reattached += 1;
            return Ok(());
        }

        let program = self.programs.get_program(device, &signature)?;
        self.swap_bindings(device, id, &old_bindings, bindings, program);
        self.programs.release_program(old_program);
        self.bin.request_sort();
        self.summary.entries_rebuilt += 1;
        log::trace!("Rebuilt entry {id:?} with program {program:?}");
        Ok(())
    }

    fn swap_bindings(
        &mut self,
        device: &mut dyn GpuDevice,
        id: EntryId,
        old: &Bindings,
        new: Bindings,
        program: ProgramKey,
    ) {
        for (old_handle, new_handle) in old.iter().zip(new.iter()) {
            if old_handle != new_handle {
                self.soup.acquire(*new_handle);
            }
        }
        for (old_handle, new_handle) in old.iter().zip(new.iter()) {
            if old_handle != new_handle {
                self.soup.release(device, *old_handle);
            }
        }
        if let Some(entry) = self.bin.get_mut(id) {
            entry.bindings = new;
            entry.program = program;
        }
        self.bin.touch();
        self.bin.invalidate();
    }

    fn destroy_entry(&mut self, device: &mut dyn GpuDevice, id: EntryId) {
        if let Some(entry) = self.bin.mark_destroyed(id) {
            self.release_entry(device, &entry);
        }
    }

    fn release_entry(&mut self, device: &mut dyn GpuDevice, entry: &DrawEntry) {
        for handle in entry.bindings {
            self.soup.release(device, handle);
        }
        self.programs.release_program(entry.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingDevice;
    use glam::Vec3;
    use scenery_data::state::{
        FlagsState, LightsState, Light, MaterialState, TextureImage, TextureLayer,
    };

    fn node(index: u32) -> NodeId {
        NodeId {
            index,
            generation: 0,
        }
    }

    fn export(kind: StateKind, node_index: u32, revision: u64, value: StateValue) -> ExportedState {
        ExportedState {
            kind,
            top: Some((
                StateSource {
                    node: node(node_index),
                    revision,
                },
                value,
            )),
        }
    }

    fn material(color: Vec3) -> StateValue {
        StateValue::Material(MaterialState {
            base_color: color,
            ..Default::default()
        })
    }

    #[test]
    fn test_shared_material_is_evicted_after_every_owner_is_removed() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .set_state(&mut device, export(StateKind::Material, 1, 1, material(Vec3::X)))
            .unwrap();
        let shared = builder.soup().current(StateKind::Material).unwrap();
        for geometry in 10..14 {
            builder
                .bind_geometry(&mut device, node(geometry), 1, &GeometryData::quad(1.0))
                .unwrap();
        }
        builder.finish(&mut device);
        assert_eq!(builder.soup().ref_count(shared), Some(4));

        for geometry in 10..14 {
            builder.remove_geometry(&mut device, node(geometry));
        }
        assert_eq!(builder.soup().ref_count(shared), None);
        assert!(builder.soup().get(shared).is_none());
    }

    #[test]
    fn test_equal_signatures_share_one_program() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder
            .bind_geometry(&mut device, node(2), 1, &GeometryData::quad(2.0))
            .unwrap();
        builder.finish(&mut device);

        let programs: Vec<ProgramKey> = builder
            .bin()
            .order()
            .iter()
            .filter_map(|id| builder.bin().get(*id))
            .map(|e| e.program)
            .collect();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0], programs[1]);
        assert_eq!(builder.programs().len(), 1);
        assert_eq!(builder.programs().get(programs[0]).unwrap().ref_count(), 2);
    }

    #[test]
    fn test_lights_change_the_program() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        let mut lights = LightsState::empty();
        lights.lights.push(Light::directional(Vec3::NEG_Z));
        builder
            .set_state(&mut device, export(StateKind::Lights, 5, 1, StateValue::Lights(lights)))
            .unwrap();
        builder
            .bind_geometry(&mut device, node(2), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder.finish(&mut device);
        assert_eq!(builder.programs().len(), 2);
    }

    #[test]
    fn test_partial_pass_reattaches_flags_in_place() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        let flags = |enabled| {
            StateValue::Flags(FlagsState {
                enabled,
                ..Default::default()
            })
        };

        builder.begin(PassLevel::Everything);
        builder
            .set_state(&mut device, export(StateKind::Flags, 3, 1, flags(true)))
            .unwrap();
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder.finish(&mut device);
        let id = builder.bin().order()[0];
        let program = builder.bin().get(id).unwrap().program;

        builder.begin(PassLevel::Partial);
        builder
            .set_state(&mut device, export(StateKind::Flags, 4, 1, flags(false)))
            .unwrap();
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        let summary = builder.finish(&mut device);

        assert_eq!(summary.entries_reattached, 1);
        assert_eq!(summary.entries_rebuilt, 0);
        let entry = builder.bin().get(id).unwrap();
        assert_eq!(entry.program, program);
        let bound = entry.binding(StateKind::Flags);
        assert_eq!(builder.soup().handle_for(StateKind::Flags, node(4)), Some(bound));
        // the old flags handle lost its only reference
        assert_eq!(builder.soup().handle_for(StateKind::Flags, node(3)), None);
    }

    #[test]
    fn test_full_pass_drops_entries_of_unvisited_geometry() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder.finish(&mut device);

        builder.begin(PassLevel::Everything);
        let summary = builder.finish(&mut device);
        assert!(builder.bin().is_empty());
        assert_eq!(summary.programs_collected, 1);
        assert_eq!(device.live_programs(), 0);
        assert!(device.buffers.is_empty());
    }

    #[test]
    fn test_a_failed_program_marks_the_scene_unrenderable() {
        let mut device = RecordingDevice::new();
        device.fail_on = Some("broken".into());
        let mut builder = DrawListBuilder::new("broken");
        builder.begin(PassLevel::Everything);
        let result = builder.bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0));
        assert!(result.is_err());
        builder.finish(&mut device);
        assert!(builder.unrenderable().is_some());
        assert!(builder.bin().is_empty());
    }

    #[test]
    fn test_texture_changes_rebuild_the_entry() {
        let mut device = RecordingDevice::new();
        let mut builder = DrawListBuilder::new("canvas");
        builder.begin(PassLevel::Everything);
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        builder.finish(&mut device);
        let id = builder.bin().order()[0];
        let before = builder.bin().get(id).unwrap().program;

        builder.begin(PassLevel::Partial);
        let layer = TextureLayer::new(Arc::new(TextureImage::solid(1, 1, [9; 4])));
        builder
            .set_state(
                &mut device,
                export(StateKind::Texture, 7, 1, StateValue::Texture(vec![layer])),
            )
            .unwrap();
        builder
            .bind_geometry(&mut device, node(1), 1, &GeometryData::quad(1.0))
            .unwrap();
        let summary = builder.finish(&mut device);
        assert_eq!(summary.entries_rebuilt, 1);
        assert_ne!(builder.bin().get(id).unwrap().program, before);
        assert_eq!(builder.programs().len(), 1);
    }
}
