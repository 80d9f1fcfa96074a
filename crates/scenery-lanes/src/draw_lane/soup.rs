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

//! The state soup: one handle pool per state kind, plus the "current top"
//! handle of every kind at the traversal position being compiled.

use crate::error::RenderResult;
use crate::shader_lane::SignaturePart;
use ahash::AHashMap;
use scenery_core::renderer::{BufferId, BufferKind, GpuDevice};
use scenery_core::scene::NodeId;
use scenery_data::state::{
    BoundTextureLayer, ClipState, ColorTransformState, FlagsState, FramebufferState,
    GeometryData, GeometryState, LayerState, LightsState, MaterialState, MorphState,
    MorphTargetBuffers, NameState, RenderListenersState, RendererState, ShaderParamsState,
    ShaderState, StateSource, StateValue, TagState, TextureState, TransformState, VertexBuffers,
};
use scenery_data::{HandlePool, StateHandle, StateKey, StateKind};
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// The payload stored behind a state handle.
///
/// Not `Clone`: geometry parts share their vertex buffers through an `Arc`
/// whose strong count decides when the buffers are freed.
#[derive(Debug)]
pub enum StatePayload {
    /// Model, view or projection transform.
    Transform(TransformState),
    /// Material.
    Material(MaterialState),
    /// Lights.
    Lights(LightsState),
    /// Uploaded texture layers.
    Texture(TextureState),
    /// Clip planes.
    Clips(ClipState),
    /// Color transform.
    ColorTransform(ColorTransformState),
    /// Uploaded morph targets.
    Morph(MorphState),
    /// Flags.
    Flags(FlagsState),
    /// Layer.
    Layer(LayerState),
    /// Tag.
    Tag(TagState),
    /// Pick name.
    Name(NameState),
    /// User shader code.
    Shader(ShaderState),
    /// Shader params.
    ShaderParams(ShaderParamsState),
    /// Off-screen target.
    FrameBuf(FramebufferState),
    /// Renderer settings.
    Renderer(RendererState),
    /// Render listeners.
    RenderListeners(RenderListenersState),
    /// One uploaded geometry part.
    Geometry(GeometryState),
}

macro_rules! payload_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("The payload as [`", stringify!($ty), "`], if it is one.")]
        pub fn $name(&self) -> Option<&$ty> {
            match self {
                StatePayload::$variant(v) => Some(v),
                _ => None,
            }
        }
    };
}

impl StatePayload {
    payload_accessor!(transform, Transform, TransformState);
    payload_accessor!(material, Material, MaterialState);
    payload_accessor!(lights, Lights, LightsState);
    payload_accessor!(texture, Texture, TextureState);
    payload_accessor!(clips, Clips, ClipState);
    payload_accessor!(color_transform, ColorTransform, ColorTransformState);
    payload_accessor!(morph, Morph, MorphState);
    payload_accessor!(flags, Flags, FlagsState);
    payload_accessor!(layer, Layer, LayerState);
    payload_accessor!(tag, Tag, TagState);
    payload_accessor!(name, Name, NameState);
    payload_accessor!(shader, Shader, ShaderState);
    payload_accessor!(shader_params, ShaderParams, ShaderParamsState);
    payload_accessor!(framebuffer, FrameBuf, FramebufferState);
    payload_accessor!(renderer, Renderer, RendererState);
    payload_accessor!(listeners, RenderListeners, RenderListenersState);
    payload_accessor!(geometry, Geometry, GeometryState);

    fn default_for(kind: StateKind) -> Option<StatePayload> {
        let payload = match kind {
            StateKind::ModelTransform => StatePayload::Transform(TransformState::default()),
            StateKind::ViewTransform => StatePayload::Transform(TransformState::new(
                Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            )),
            StateKind::ProjTransform => StatePayload::Transform(TransformState::new(
                Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 5000.0),
            )),
            StateKind::Material => StatePayload::Material(MaterialState::default()),
            StateKind::Lights => StatePayload::Lights(LightsState::default()),
            StateKind::Texture => StatePayload::Texture(TextureState::default()),
            StateKind::Clips => StatePayload::Clips(ClipState::default()),
            StateKind::ColorTransform => {
                StatePayload::ColorTransform(ColorTransformState::default())
            }
            StateKind::Morph => StatePayload::Morph(MorphState::default()),
            StateKind::Flags => StatePayload::Flags(FlagsState::default()),
            StateKind::Layer => StatePayload::Layer(LayerState::default()),
            StateKind::Tag => StatePayload::Tag(TagState::default()),
            StateKind::Name => StatePayload::Name(NameState::default()),
            StateKind::Shader => StatePayload::Shader(ShaderState::default()),
            StateKind::ShaderParams => StatePayload::ShaderParams(ShaderParamsState::default()),
            StateKind::FrameBuf => StatePayload::FrameBuf(FramebufferState::default()),
            StateKind::Renderer => StatePayload::Renderer(RendererState::default()),
            StateKind::RenderListeners => {
                StatePayload::RenderListeners(RenderListenersState::default())
            }
            StateKind::Geometry => return None,
        };
        Some(payload)
    }

    /// Revision of the node the device resources were uploaded from.
    fn upload_revision(&self) -> Option<u64> {
        match self {
            StatePayload::Texture(t) => Some(t.revision),
            StatePayload::Morph(m) => Some(m.revision),
            StatePayload::FrameBuf(f) => Some(f.revision),
            StatePayload::Geometry(g) => Some(g.revision),
            _ => None,
        }
    }
}

fn upload_f32(device: &mut dyn GpuDevice, data: &[f32]) -> RenderResult<BufferId> {
    Ok(device.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(data))?)
}

fn upload_optional(
    device: &mut dyn GpuDevice,
    data: Option<&Vec<f32>>,
) -> RenderResult<Option<BufferId>> {
    data.map(|d| upload_f32(device, d)).transpose()
}

/// Pools of every state kind and the handles currently on top.
#[derive(Debug)]
pub struct StateSoup {
    pools: Vec<HandlePool<StatePayload>>,
    current: [Option<StateHandle>; StateKind::COUNT],
    parts: AHashMap<StateHandle, SignaturePart>,
}

impl Default for StateSoup {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSoup {
    /// Creates the pools, each with its pinned default handle.
    pub fn new() -> Self {
        let pools: Vec<HandlePool<StatePayload>> = StateKind::ALL
            .iter()
            .map(|&kind| match StatePayload::default_for(kind) {
                Some(payload) => HandlePool::with_default(kind, payload),
                None => HandlePool::new(kind),
            })
            .collect();
        let mut soup = Self {
            pools,
            current: [None; StateKind::COUNT],
            parts: AHashMap::new(),
        };
        for kind in StateKind::ALL {
            if let Some(handle) = soup.pool(kind).default_handle() {
                soup.refresh_part(handle, true);
            }
        }
        soup.reset_current();
        soup
    }

    fn pool(&self, kind: StateKind) -> &HandlePool<StatePayload> {
        &self.pools[kind.index()]
    }

    fn pool_mut(&mut self, kind: StateKind) -> &mut HandlePool<StatePayload> {
        &mut self.pools[kind.index()]
    }

    /// Points every kind back at its default handle.
    pub fn reset_current(&mut self) {
        for kind in StateKind::ALL {
            self.current[kind.index()] = self.pool(kind).default_handle();
        }
    }

    /// The handle currently on top for `kind`.
    pub fn current(&self, kind: StateKind) -> Option<StateHandle> {
        self.current[kind.index()]
    }

    /// The default handle of `kind`.
    pub fn default_handle(&self, kind: StateKind) -> Option<StateHandle> {
        self.pool(kind).default_handle()
    }

    /// Resolves a handle to its payload.
    pub fn get(&self, handle: StateHandle) -> Option<&StatePayload> {
        self.pool(handle.kind).get(handle)
    }

    /// The live handle a node exported for `kind`.
    pub fn handle_for(&self, kind: StateKind, node: NodeId) -> Option<StateHandle> {
        self.pool(kind).handle_for(StateKey::node(node))
    }

    /// Reference count of a handle.
    pub fn ref_count(&self, handle: StateHandle) -> Option<u32> {
        self.pool(handle.kind).ref_count(handle)
    }

    /// Number of live handles of a kind, the default included.
    pub fn len(&self, kind: StateKind) -> usize {
        self.pool(kind).len()
    }

    /// Cached signature part of a handle.
    pub fn part(&self, handle: StateHandle) -> Option<&SignaturePart> {
        self.parts.get(&handle)
    }

    /// Adds one reference to a handle.
    pub fn acquire(&mut self, handle: StateHandle) -> bool {
        self.pool_mut(handle.kind).acquire(handle)
    }

    /// Drops one reference, destroying the device resources of an evicted payload.
    pub fn release(&mut self, device: &mut dyn GpuDevice, handle: StateHandle) {
        if let Some(payload) = self.pool_mut(handle.kind).release(handle) {
            self.parts.remove(&handle);
            Self::destroy_payload(device, payload);
        }
    }

    /// Sets the current handle of one kind from an exported stack top.
    ///
    /// `None` resets the kind to its default handle. Otherwise the handle the
    /// source node exported is fetched or created and its payload updated;
    /// kinds owning device resources upload only when the source revision
    /// changed. The signature part is recomputed for new handles, re-uploads
    /// and on full passes.
    pub fn set_state(
        &mut self,
        device: &mut dyn GpuDevice,
        kind: StateKind,
        top: Option<(StateSource, StateValue)>,
        full_pass: bool,
    ) -> RenderResult<()> {
        let Some((source, value)) = top else {
            self.current[kind.index()] = self.pool(kind).default_handle();
            return Ok(());
        };
        let key = StateKey::node(source.node);
        let existing = self.pool(kind).handle_for(key);
        let up_to_date = existing
            .and_then(|h| self.pool(kind).get(h))
            .and_then(StatePayload::upload_revision)
            == Some(source.revision);

        let (handle, replaced) = if up_to_date {
            match existing {
                Some(handle) => (handle, false),
                None => return Ok(()),
            }
        } else {
            let payload = match Self::to_payload(device, kind, source.revision, value)? {
                Some(payload) => payload,
                None => {
                    log::warn!("Ignoring {kind:?} value that does not match its kind");
                    return Ok(());
                }
            };
            let (handle, old) = self.pool_mut(kind).insert_keyed(key, payload);
            let replaced_resources = old.as_ref().and_then(StatePayload::upload_revision).is_some();
            if let Some(old) = old {
                Self::destroy_payload(device, old);
            }
            (handle, existing.is_none() || replaced_resources)
        };

        if replaced || full_pass || !self.parts.contains_key(&handle) {
            self.refresh_part(handle, false);
        }
        self.current[kind.index()] = Some(handle);
        Ok(())
    }

    /// Replaces the payload a node exported, keeping the handle identity.
    ///
    /// Used for mutations that need no recompile. Device resources and the
    /// signature part are kept; returns `false` when the node has no live handle.
    pub fn refresh_state(
        &mut self,
        kind: StateKind,
        source: StateSource,
        value: StateValue,
    ) -> bool {
        let Some(handle) = self.handle_for(kind, source.node) else {
            return false;
        };
        let Some(payload) = self.pool_mut(kind).get_mut(handle) else {
            return false;
        };
        match (payload, value) {
            (StatePayload::Transform(t), StateValue::Transform(v)) => *t = v,
            (StatePayload::Material(m), StateValue::Material(v)) => *m = v,
            (StatePayload::ColorTransform(c), StateValue::ColorTransform(v)) => *c = v,
            (StatePayload::Layer(l), StateValue::Layer(v)) => *l = v,
            (StatePayload::Name(n), StateValue::Name(v)) => *n = v,
            (StatePayload::Tag(t), StateValue::Tag(v)) => *t = v,
            (StatePayload::Flags(f), StateValue::Flags(v)) => *f = v,
            (StatePayload::ShaderParams(p), StateValue::ShaderParams(v)) => *p = v,
            (StatePayload::Renderer(r), StateValue::Renderer(v)) => {
                if r.has_point_size() != v.has_point_size() {
                    return false;
                }
                *r = v;
            }
            (StatePayload::Morph(m), StateValue::Morph { factor, .. }) => {
                m.factor = factor;
                m.revision = source.revision;
            }
            (StatePayload::Texture(t), StateValue::Texture(layers)) => {
                if t.layers.len() != layers.len() {
                    return false;
                }
                for (bound, layer) in t.layers.iter_mut().zip(layers) {
                    bound.layer.blend_factor = layer.blend_factor;
                    bound.layer.translate = layer.translate;
                    bound.layer.rotate = layer.rotate;
                    bound.layer.scale = layer.scale;
                }
                t.revision = source.revision;
            }
            (_, value) => {
                log::debug!("No in-place refresh for {kind:?} value {value:?}");
                return false;
            }
        }
        true
    }

    /// Whether `value` names a different set of shader params than the
    /// payload `node` exported. Command lists hold one uniform slot per name,
    /// so such a change must rebuild them.
    pub fn params_layout_changes(&self, node: NodeId, value: &StateValue) -> bool {
        let StateValue::ShaderParams(next) = value else {
            return false;
        };
        self.handle_for(StateKind::ShaderParams, node)
            .and_then(|handle| self.pool(StateKind::ShaderParams).get(handle))
            .and_then(StatePayload::shader_params)
            .is_some_and(|current| !current.params.keys().eq(next.params.keys()))
    }

    /// Uploads (or re-uses) the parts of a geometry node.
    ///
    /// Parts share one set of vertex buffers and own one index buffer each.
    /// Returns one handle per part, in part order.
    pub fn geometry_handles(
        &mut self,
        device: &mut dyn GpuDevice,
        node: NodeId,
        revision: u64,
        data: &GeometryData,
    ) -> RenderResult<Vec<StateHandle>> {
        let kind = StateKind::Geometry;
        let current: Vec<Option<StateHandle>> = (0..data.parts.len() as u32)
            .map(|part| self.pool(kind).handle_for(StateKey::part(node, part)))
            .collect();
        let fresh = current.iter().all(|h| {
            h.and_then(|h| self.pool(kind).get(h))
                .and_then(StatePayload::geometry)
                .is_some_and(|g| g.revision == revision)
        });
        if fresh {
            return Ok(current.into_iter().flatten().collect());
        }

        log::trace!("Uploading geometry of node {node} ({} parts)", data.parts.len());
        let vertices = Arc::new(VertexBuffers {
            positions: upload_f32(device, &data.positions)?,
            normals: upload_optional(device, data.normals.as_ref())?,
            uvs: upload_optional(device, data.uvs.as_ref())?,
            uvs2: upload_optional(device, data.uvs2.as_ref())?,
            colors: upload_optional(device, data.colors.as_ref())?,
        });
        let mut handles = Vec::with_capacity(data.parts.len());
        for (part, geometry) in data.parts.iter().enumerate() {
            let index_buffer =
                device.create_buffer(BufferKind::Index, bytemuck::cast_slice(&geometry.indices))?;
            let payload = StatePayload::Geometry(GeometryState {
                vertices: vertices.clone(),
                index_buffer,
                index_count: geometry.indices.len() as u32,
                primitive: geometry.primitive,
                revision,
            });
            let (handle, old) = self
                .pool_mut(kind)
                .insert_keyed(StateKey::part(node, part as u32), payload);
            if let Some(old) = old {
                Self::destroy_payload(device, old);
            }
            self.refresh_part(handle, true);
            handles.push(handle);
        }
        drop(vertices);
        Ok(handles)
    }

    /// Evicts every slot nobody references and destroys its resources.
    pub fn sweep_unreferenced(&mut self, device: &mut dyn GpuDevice) -> usize {
        let mut swept = 0;
        for kind in StateKind::ALL {
            let pool = &mut self.pools[kind.index()];
            let live_before: Vec<StateHandle> = pool.iter().map(|(h, _)| h).collect();
            let doomed = pool.sweep_unreferenced();
            swept += doomed.len();
            for payload in doomed {
                Self::destroy_payload(device, payload);
            }
            let pool = &self.pools[kind.index()];
            for handle in live_before {
                if !pool.contains(handle) {
                    self.parts.remove(&handle);
                }
            }
        }
        swept
    }

    /// Destroys every non-default slot regardless of references.
    pub fn clear(&mut self, device: &mut dyn GpuDevice) {
        for pool in &mut self.pools {
            for payload in pool.clear() {
                Self::destroy_payload(device, payload);
            }
        }
        let pools = &self.pools;
        self.parts
            .retain(|handle, _| pools[handle.kind.index()].contains(*handle));
        self.reset_current();
    }

    fn refresh_part(&mut self, handle: StateHandle, force: bool) {
        let Some(payload) = self.get(handle) else {
            return;
        };
        let is_default = self.pool(handle.kind).default_handle() == Some(handle);
        let part = match payload {
            StatePayload::Clips(c) => SignaturePart::of_clips(c),
            StatePayload::ColorTransform(_) => SignaturePart::ColorTransform(!is_default),
            StatePayload::Lights(l) => SignaturePart::of_lights(l),
            StatePayload::Morph(m) => SignaturePart::of_morph(m),
            StatePayload::Texture(t) => SignaturePart::of_texture(t),
            StatePayload::Shader(s) => SignaturePart::of_shader(s),
            StatePayload::Renderer(r) => SignaturePart::of_renderer(r),
            StatePayload::Geometry(g) => SignaturePart::of_geometry(g),
            _ => return,
        };
        if force || self.parts.get(&handle) != Some(&part) {
            self.parts.insert(handle, part);
        }
    }

    fn to_payload(
        device: &mut dyn GpuDevice,
        kind: StateKind,
        revision: u64,
        value: StateValue,
    ) -> RenderResult<Option<StatePayload>> {
        let payload = match (kind, value) {
            (
                StateKind::ModelTransform | StateKind::ViewTransform | StateKind::ProjTransform,
                StateValue::Transform(t),
            ) => StatePayload::Transform(t),
            (StateKind::Material, StateValue::Material(m)) => StatePayload::Material(m),
            (StateKind::Lights, StateValue::Lights(l)) => StatePayload::Lights(l),
            (StateKind::Clips, StateValue::Clips(c)) => StatePayload::Clips(c),
            (StateKind::ColorTransform, StateValue::ColorTransform(c)) => {
                StatePayload::ColorTransform(c)
            }
            (StateKind::Flags, StateValue::Flags(f)) => StatePayload::Flags(f),
            (StateKind::Layer, StateValue::Layer(l)) => StatePayload::Layer(l),
            (StateKind::Tag, StateValue::Tag(t)) => StatePayload::Tag(t),
            (StateKind::Name, StateValue::Name(n)) => StatePayload::Name(n),
            (StateKind::Shader, StateValue::Shader(s)) => StatePayload::Shader(s),
            (StateKind::ShaderParams, StateValue::ShaderParams(p)) => {
                StatePayload::ShaderParams(p)
            }
            (StateKind::Renderer, StateValue::Renderer(r)) => StatePayload::Renderer(r),
            (StateKind::RenderListeners, StateValue::RenderListeners(l)) => {
                StatePayload::RenderListeners(l)
            }
            (StateKind::Texture, StateValue::Texture(layers)) => {
                let mut bound = Vec::with_capacity(layers.len());
                for layer in layers {
                    let image = layer.image.clone();
                    let texture = device.create_texture(image.width, image.height, &image.rgba)?;
                    bound.push(BoundTextureLayer { texture, layer });
                }
                StatePayload::Texture(TextureState {
                    layers: bound,
                    revision,
                })
            }
            (StateKind::Morph, StateValue::Morph { data, factor }) => {
                let mut targets = Vec::with_capacity(data.targets.len());
                for target in &data.targets {
                    targets.push(MorphTargetBuffers {
                        positions: upload_optional(device, target.positions.as_ref())?,
                        normals: upload_optional(device, target.normals.as_ref())?,
                        uvs: upload_optional(device, target.uvs.as_ref())?,
                    });
                }
                StatePayload::Morph(MorphState {
                    data: Some(data),
                    targets,
                    factor,
                    revision,
                })
            }
            (StateKind::FrameBuf, StateValue::FrameBuf { width, height }) => {
                let framebuffer = device.create_framebuffer(width, height)?;
                StatePayload::FrameBuf(FramebufferState {
                    framebuffer: Some(framebuffer),
                    width,
                    height,
                    revision,
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(payload))
    }

    fn destroy_payload(device: &mut dyn GpuDevice, payload: StatePayload) {
        let result = match payload {
            StatePayload::Texture(t) => t
                .layers
                .iter()
                .try_for_each(|l| device.destroy_texture(l.texture)),
            StatePayload::Morph(m) => m
                .targets
                .iter()
                .flat_map(MorphTargetBuffers::buffers)
                .try_for_each(|b| device.destroy_buffer(b)),
            StatePayload::FrameBuf(f) => match f.framebuffer {
                Some(fb) => device.destroy_framebuffer(fb),
                None => Ok(()),
            },
            StatePayload::Geometry(g) => {
                let index = device.destroy_buffer(g.index_buffer);
                // The last part holding the shared vertex buffers frees them.
                let shared = match Arc::try_unwrap(g.vertices) {
                    Ok(vertices) => vertices
                        .buffers()
                        .collect::<Vec<_>>()
                        .into_iter()
                        .try_for_each(|b| device.destroy_buffer(b)),
                    Err(_) => Ok(()),
                };
                index.and(shared)
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("Failed to destroy state resources: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingDevice;
    use scenery_data::state::{TextureImage, TextureLayer};

    fn node(index: u32) -> NodeId {
        NodeId {
            index,
            generation: 0,
        }
    }

    fn source(index: u32, revision: u64) -> StateSource {
        StateSource {
            node: node(index),
            revision,
        }
    }

    #[test]
    fn test_every_kind_but_geometry_starts_at_its_default() {
        let soup = StateSoup::new();
        for kind in StateKind::ALL {
            let expected = kind != StateKind::Geometry;
            assert_eq!(soup.current(kind).is_some(), expected, "{kind:?}");
        }
    }

    #[test]
    fn test_set_state_overwrites_payload_of_the_same_node() {
        let mut device = RecordingDevice::new();
        let mut soup = StateSoup::new();
        let red = MaterialState {
            base_color: Vec3::X,
            ..Default::default()
        };
        soup.set_state(
            &mut device,
            StateKind::Material,
            Some((source(1, 1), StateValue::Material(red))),
            true,
        )
        .unwrap();
        let first = soup.current(StateKind::Material).unwrap();

        let green = MaterialState {
            base_color: Vec3::Y,
            ..Default::default()
        };
        soup.set_state(
            &mut device,
            StateKind::Material,
            Some((source(1, 2), StateValue::Material(green))),
            false,
        )
        .unwrap();
        let second = soup.current(StateKind::Material).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            soup.get(second).and_then(StatePayload::material).unwrap().base_color,
            Vec3::Y
        );

        soup.set_state(&mut device, StateKind::Material, None, false).unwrap();
        assert_eq!(
            soup.current(StateKind::Material),
            soup.default_handle(StateKind::Material)
        );
    }

    #[test]
    fn test_textures_upload_once_per_revision() {
        let mut device = RecordingDevice::new();
        let mut soup = StateSoup::new();
        let layer = TextureLayer::new(Arc::new(TextureImage::solid(2, 2, [255; 4])));
        let value = || StateValue::Texture(vec![layer.clone()]);

        soup.set_state(&mut device, StateKind::Texture, Some((source(3, 5), value())), true)
            .unwrap();
        soup.set_state(&mut device, StateKind::Texture, Some((source(3, 5), value())), true)
            .unwrap();
        assert_eq!(device.textures.len(), 1);

        soup.set_state(&mut device, StateKind::Texture, Some((source(3, 6), value())), true)
            .unwrap();
        assert_eq!(device.textures.len(), 1, "old texture destroyed on re-upload");
    }

    #[test]
    fn test_shared_vertex_buffers_outlive_all_but_the_last_part() {
        let mut device = RecordingDevice::new();
        let mut soup = StateSoup::new();
        let mut data = GeometryData::quad(1.0);
        data.parts.push(data.parts[0].clone());

        let handles = soup.geometry_handles(&mut device, node(9), 1, &data).unwrap();
        assert_eq!(handles.len(), 2);
        // positions, normals, uvs + two index buffers
        assert_eq!(device.buffers.len(), 5);

        for &h in &handles {
            soup.acquire(h);
        }
        soup.release(&mut device, handles[0]);
        assert_eq!(device.buffers.len(), 4);
        soup.release(&mut device, handles[1]);
        assert!(device.buffers.is_empty());
    }

    #[test]
    fn test_unchanged_geometry_is_not_uploaded_again() {
        let mut device = RecordingDevice::new();
        let mut soup = StateSoup::new();
        let data = GeometryData::quad(1.0);
        let a = soup.geometry_handles(&mut device, node(2), 4, &data).unwrap();
        let b = soup.geometry_handles(&mut device, node(2), 4, &data).unwrap();
        assert_eq!(a, b);
        assert_eq!(device.buffers.len(), 4);
    }

    #[test]
    fn test_color_transform_part_reflects_presence() {
        let mut device = RecordingDevice::new();
        let mut soup = StateSoup::new();
        let default = soup.current(StateKind::ColorTransform).unwrap();
        assert_eq!(soup.part(default), Some(&SignaturePart::ColorTransform(false)));

        soup.set_state(
            &mut device,
            StateKind::ColorTransform,
            Some((
                source(4, 1),
                StateValue::ColorTransform(ColorTransformState::default()),
            )),
            true,
        )
        .unwrap();
        let own = soup.current(StateKind::ColorTransform).unwrap();
        assert_eq!(soup.part(own), Some(&SignaturePart::ColorTransform(true)));
    }

    #[test]
    fn test_sweep_destroys_unbound_uploads() {
        let mut device = RecordingDevice::new();
        let mut soup = StateSoup::new();
        soup.set_state(
            &mut device,
            StateKind::FrameBuf,
            Some((source(5, 1), StateValue::FrameBuf { width: 8, height: 8 })),
            true,
        )
        .unwrap();
        assert_eq!(device.framebuffers.len(), 1);
        assert_eq!(soup.sweep_unreferenced(&mut device), 1);
        assert!(device.framebuffers.is_empty());
    }
}
