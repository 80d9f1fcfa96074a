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

//! The software implementation of [`GpuDevice`].

use super::raster::{assemble, rasterize_triangle, Fragment, ShadedVertex, VARYINGS};
use super::shader::{compile_stage, link, ProgramReflection};
use super::target::{quantize, RenderTarget};
use glam::{Mat4, Vec3, Vec4};
use scenery_core::renderer::{
    AttributeLocation, BlendFactor, BlendFunc, BufferId, BufferKind, FramebufferId, GpuDevice,
    PipelineState, Primitive, ProgramId, ResourceError, ShaderError, ShaderStage, TextureId,
    UniformLocation, UniformValue,
};
use std::collections::HashMap;

const MAX_TEXTURE_UNITS: i32 = 8;

/// Counters accumulated by a [`SoftwareDevice`] since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// `draw_indexed` calls.
    pub draw_calls: u64,
    /// Fragments that passed every test and were written.
    pub fragments_written: u64,
    /// Programs successfully linked.
    pub programs_linked: u64,
    /// Uniform writes.
    pub uniform_writes: u64,
}

#[derive(Debug)]
struct SoftwareProgram {
    label: String,
    reflection: ProgramReflection,
    values: HashMap<u32, UniformValue>,
}

impl SoftwareProgram {
    fn declares(&self, name: &str) -> bool {
        self.reflection.uniforms.contains_key(name)
    }

    fn uniform(&self, name: &str) -> Option<UniformValue> {
        let slot = self.reflection.uniforms.get(name)?;
        self.values.get(slot).copied()
    }

    fn float(&self, name: &str) -> Option<f32> {
        match self.uniform(name)? {
            UniformValue::Float(v) => Some(v),
            UniformValue::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    fn int(&self, name: &str) -> Option<i32> {
        self.uniform(name)?.as_int()
    }

    fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.uniform(name)? {
            UniformValue::Vec3(v) => Some(Vec3::from_array(v)),
            _ => None,
        }
    }

    fn vec4(&self, name: &str) -> Option<Vec4> {
        match self.uniform(name)? {
            UniformValue::Vec4(v) => Some(Vec4::from_array(v)),
            _ => None,
        }
    }

    fn mat4(&self, name: &str) -> Option<Mat4> {
        match self.uniform(name)? {
            UniformValue::Mat4(m) => Some(Mat4::from_cols_array(&m)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Texture {
    /// Nearest sample with repeat wrapping; `v = 0` is the first row.
    fn sample(&self, u: f32, v: f32) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ONE;
        }
        let wrap = |t: f32, size: u32| {
            let t = t - t.floor();
            ((t * size as f32) as u32).min(size - 1)
        };
        let i = (wrap(v, self.height) * self.width + wrap(u, self.width)) as usize * 4;
        match self.rgba.get(i..i + 4) {
            Some(texel) => Vec4::new(
                texel[0] as f32 / 255.0,
                texel[1] as f32 / 255.0,
                texel[2] as f32 / 255.0,
                texel[3] as f32 / 255.0,
            ),
            None => Vec4::ONE,
        }
    }
}

/// What the fragment stage of a draw computes.
enum Output {
    Pick(Vec4),
    Depth,
    Color(Surface),
}

struct Surface {
    base_color: Vec3,
    alpha: f32,
    emit: f32,
    // Ambient plus every light color; direction and attenuation are ignored.
    light: Option<Vec3>,
    vertex_colors: bool,
    // Every layer modulates the base color by its blend factor.
    textures: Vec<(Texture, f32)>,
    color_transform: Option<(Vec4, Vec4, f32)>,
}

struct FragmentStage {
    clip_planes: Vec<(i32, Vec4)>,
    output: Output,
}

impl FragmentStage {
    fn new(
        program: &SoftwareProgram,
        units: &HashMap<u32, TextureId>,
        textures: &HashMap<TextureId, Texture>,
        vertex_colors: bool,
    ) -> Self {
        let mut clip_planes = Vec::new();
        if program.int("uClipping").unwrap_or(0) != 0 {
            for i in 0.. {
                let mode = format!("uClipMode{i}");
                if !program.declares(&mode) {
                    break;
                }
                let plane = program
                    .vec4(&format!("uClipNormalAndDist{i}"))
                    .unwrap_or(Vec4::ZERO);
                clip_planes.push((program.int(&mode).unwrap_or(0), plane));
            }
        }

        let output = if program.declares("uPickColor") {
            if program.int("uRayPickMode") == Some(1) {
                Output::Depth
            } else {
                Output::Pick(program.vec4("uPickColor").unwrap_or(Vec4::ZERO))
            }
        } else {
            let light = program.declares("uAmbientColor").then(|| {
                let mut total = program.vec3("uAmbientColor").unwrap_or(Vec3::ZERO);
                for i in 0.. {
                    let name = format!("uLightColor{i}");
                    if !program.declares(&name) {
                        break;
                    }
                    total += program.vec3(&name).unwrap_or(Vec3::ZERO);
                }
                total
            });
            let mut sampled = Vec::new();
            for i in 0..MAX_TEXTURE_UNITS {
                let name = format!("uSampler{i}");
                if !program.declares(&name) {
                    continue;
                }
                let unit = program.int(&name).unwrap_or(i);
                if let Some(texture) = units.get(&(unit as u32)).and_then(|t| textures.get(t)) {
                    let factor = program
                        .float(&format!("uLayer{i}BlendFactor"))
                        .unwrap_or(1.0);
                    sampled.push((texture.clone(), factor));
                }
            }
            let color_transform = program.declares("uColorTransformScale").then(|| {
                (
                    program.vec4("uColorTransformScale").unwrap_or(Vec4::ONE),
                    program.vec4("uColorTransformAdd").unwrap_or(Vec4::ZERO),
                    program.float("uColorTransformSaturation").unwrap_or(0.0),
                )
            });
            Output::Color(Surface {
                base_color: program.vec3("uMaterialBaseColor").unwrap_or(Vec3::ONE),
                alpha: program.float("uMaterialAlpha").unwrap_or(1.0),
                emit: program.float("uMaterialEmit").unwrap_or(0.0),
                light,
                vertex_colors,
                textures: sampled,
                color_transform,
            })
        };
        Self {
            clip_planes,
            output,
        }
    }

    /// The fragment color, or `None` when the fragment is discarded.
    fn shade(&self, fragment: &Fragment) -> Option<Vec4> {
        let v = &fragment.varyings;
        let world = Vec3::new(v[0], v[1], v[2]);
        for (mode, plane) in &self.clip_planes {
            let dist = world.dot(plane.truncate()) - plane.w;
            if (*mode == 1 && dist > 0.0) || (*mode == 2 && dist < 0.0) {
                return None;
            }
        }

        let color = match &self.output {
            Output::Pick(color) => *color,
            Output::Depth => pack_depth(fragment.depth),
            Output::Color(surface) => {
                let mut color = surface.base_color.extend(surface.alpha);
                if surface.vertex_colors {
                    color *= Vec4::new(v[5], v[6], v[7], v[8]);
                }
                for (texture, factor) in &surface.textures {
                    let texel = texture.sample(v[3], v[4]).truncate();
                    color = (color.truncate() * Vec3::ONE.lerp(texel, *factor)).extend(color.w);
                }
                let rgb = color.truncate();
                let lit = match surface.light {
                    Some(light) => surface.emit * rgb + light * rgb,
                    None => surface.emit * rgb + rgb,
                };
                let mut out = lit.extend(color.w);
                if let Some((scale, add, saturation)) = surface.color_transform {
                    let intensity = out.truncate().dot(Vec3::new(0.3, 0.59, 0.11));
                    let rgb = Vec3::splat(intensity).lerp(out.truncate(), 1.0 + saturation);
                    out = rgb.extend(out.w) * scale + add;
                }
                out
            }
        };
        Some(color.clamp(Vec4::ZERO, Vec4::ONE))
    }
}

/// `packDepth` of the pick fragment stage: four channels, least significant
/// first, each above the first a multiple of 1/256.
fn pack_depth(depth: f32) -> Vec4 {
    let d = depth as f64;
    let shifts = [256.0 * 256.0 * 256.0, 256.0 * 256.0, 256.0, 1.0];
    let res = shifts.map(|s: f64| (d * s).fract());
    Vec4::new(
        res[0] as f32,
        (res[1] - res[0] / 256.0) as f32,
        (res[2] - res[1] / 256.0) as f32,
        (res[3] - res[2] / 256.0) as f32,
    )
}

fn factor(factor: BlendFactor, src: Vec4, dst: Vec4) -> f32 {
    match factor {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcAlpha => src.w,
        BlendFactor::OneMinusSrcAlpha => 1.0 - src.w,
        BlendFactor::DstAlpha => dst.w,
        BlendFactor::OneMinusDstAlpha => 1.0 - dst.w,
    }
}

fn blend(func: BlendFunc, src: Vec4, dst: Vec4) -> Vec4 {
    src * factor(func.src, src, dst) + dst * factor(func.dst, src, dst)
}

fn read_f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<f32>)
        .collect()
}

fn read_u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<u32>)
        .collect()
}

/// A headless GPU that validates shader source and rasterizes triangles
/// into RGBA8 targets on the CPU.
///
/// Shader code is not executed: the rasterizer reads the uniforms and
/// attributes the composed programs declare (matrices, morph factor, clip
/// planes, material, color transform, pick color, ray-pick mode) and
/// applies their meaning directly. Lighting is flat: ambient plus every
/// light color.
///
/// Channels are written as `floor(c * 256)` rather than the hardware
/// `round(c * 255)`, so packed pick depth reads back exactly on this device
/// and only to within 2/256 on a hardware one.
pub struct SoftwareDevice {
    canvas: RenderTarget,
    framebuffers: HashMap<FramebufferId, RenderTarget>,
    bound_framebuffer: Option<FramebufferId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, Texture>,
    programs: HashMap<ProgramId, SoftwareProgram>,
    current_program: Option<ProgramId>,
    // Attribute slot to (buffer, components).
    attributes: HashMap<u32, (BufferId, u32)>,
    texture_units: HashMap<u32, TextureId>,
    pipeline: PipelineState,
    next_id: u32,
    allocated: usize,
    memory_limit: Option<usize>,
    stats: DeviceStats,
}

impl std::fmt::Debug for SoftwareDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareDevice")
            .field("canvas", &(self.canvas.width, self.canvas.height))
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("programs", &self.programs.len())
            .field("framebuffers", &self.framebuffers.len())
            .field("allocated", &self.allocated)
            .field("stats", &self.stats)
            .finish()
    }
}

impl SoftwareDevice {
    /// A device with a `width` x `height` canvas and no memory limit.
    pub fn new(width: u32, height: u32) -> Self {
        log::info!("SoftwareDevice created with a {width}x{height} canvas");
        Self {
            canvas: RenderTarget::new(width, height),
            framebuffers: HashMap::new(),
            bound_framebuffer: None,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            attributes: HashMap::new(),
            texture_units: HashMap::new(),
            pipeline: PipelineState::default(),
            next_id: 1,
            allocated: 0,
            memory_limit: None,
            stats: DeviceStats::default(),
        }
    }

    /// Fails buffer, texture and framebuffer creation past `bytes` in total.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Resizes the canvas, discarding its content.
    pub fn resize(&mut self, width: u32, height: u32) {
        log::debug!("SoftwareDevice canvas resized to {width}x{height}");
        self.canvas = RenderTarget::new(width, height);
    }

    /// Counters since creation.
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Bytes currently held by buffers, textures and framebuffers.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    /// Programs alive.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Buffers alive.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Textures alive.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Off-screen framebuffers alive.
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// The label a program was created with.
    pub fn program_label(&self, id: ProgramId) -> Option<&str> {
        self.programs.get(&id).map(|p| p.label.as_str())
    }

    /// The value last written to uniform `name`, per live program declaring
    /// it and holding a value, in program creation order.
    pub fn uniform_values(&self, name: &str) -> Vec<UniformValue> {
        let mut ids: Vec<&ProgramId> = self.programs.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.programs.get(id)?.uniform(name))
            .collect()
    }

    /// A canvas pixel, `y` counted from the top row.
    pub fn canvas_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        match self.canvas.height.checked_sub(1 + y) {
            Some(row) => self.canvas.pixel(x, row),
            None => [0; 4],
        }
    }

    /// The canvas as tightly packed RGBA8 rows, top row first.
    pub fn canvas_rgba(&self) -> Vec<u8> {
        self.canvas.to_rgba()
    }

    fn allocate(&mut self, resource: &'static str, bytes: usize) -> Result<u32, ResourceError> {
        if let Some(limit) = self.memory_limit {
            if self.allocated + bytes > limit {
                log::error!("SoftwareDevice out of memory allocating a {bytes} byte {resource}");
                return Err(ResourceError::AllocationFailed {
                    resource,
                    details: format!(
                        "{bytes} bytes requested, {} of {limit} in use",
                        self.allocated
                    ),
                });
            }
        }
        self.allocated += bytes;
        Ok(self.next_id())
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn target_mut(&mut self) -> &mut RenderTarget {
        match self
            .bound_framebuffer
            .and_then(|id| self.framebuffers.get_mut(&id))
        {
            Some(target) => target,
            None => &mut self.canvas,
        }
    }

    fn attribute(&self, program: &SoftwareProgram, name: &str) -> Option<(Vec<f32>, usize)> {
        let slot = program.reflection.attributes.get(name)?;
        let (buffer, components) = self.attributes.get(slot)?;
        let data = self.buffers.get(buffer)?;
        Some((read_f32s(data), (*components).max(1) as usize))
    }

    fn shade_vertices(&self, program: &SoftwareProgram) -> Option<Vec<ShadedVertex>> {
        let (positions, stride) = self.attribute(program, "aVertex")?;
        let morph = self.attribute(program, "aMorphVertex");
        let factor = program.float("uMorphFactor").unwrap_or(0.0);
        let uvs = self.attribute(program, "aUVCoord");
        let colors = self.attribute(program, "aVertexColor");

        let model = program.mat4("uMMatrix").unwrap_or(Mat4::IDENTITY);
        let view = program.mat4("uVMatrix").unwrap_or(Mat4::IDENTITY);
        let proj = program.mat4("uPMatrix").unwrap_or(Mat4::IDENTITY);
        let view_proj = proj * view;

        let read = |data: &[f32], stride: usize, i: usize, n: usize| -> [f32; 4] {
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for (c, slot) in out.iter_mut().enumerate().take(n.min(stride)) {
                *slot = data.get(i * stride + c).copied().unwrap_or(0.0);
            }
            out
        };

        let count = positions.len() / stride;
        let vertices = (0..count)
            .map(|i| {
                let [x, y, z, _] = read(&positions, stride, i, 3);
                let mut position = Vec3::new(x, y, z);
                if let Some((target, stride)) = &morph {
                    let [tx, ty, tz, _] = read(target, *stride, i, 3);
                    position = position.lerp(Vec3::new(tx, ty, tz), factor);
                }
                let world = model * position.extend(1.0);
                let mut varyings = [0.0; VARYINGS];
                varyings[..3].copy_from_slice(&world.truncate().to_array());
                if let Some((uv, stride)) = &uvs {
                    let [u, v, _, _] = read(uv, *stride, i, 2);
                    varyings[3] = u;
                    varyings[4] = v;
                }
                let color = match &colors {
                    Some((colors, stride)) => read(colors, *stride, i, 4),
                    None => [1.0; 4],
                };
                varyings[5..9].copy_from_slice(&color);
                ShadedVertex {
                    clip: view_proj * world,
                    varyings,
                }
            })
            .collect();
        Some(vertices)
    }
}

impl GpuDevice for SoftwareDevice {
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.allocate("buffer", data.len())?);
        self.buffers.insert(id, data.to_vec());
        log::trace!("Created {kind:?} buffer {id:?} ({} bytes)", data.len());
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        let data = self.buffers.remove(&id).ok_or(ResourceError::InvalidHandle)?;
        self.allocated -= data.len();
        self.attributes.retain(|_, (buffer, _)| *buffer != id);
        Ok(())
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureId, ResourceError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ResourceError::BackendError(format!(
                "texture of {width}x{height} needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        let id = TextureId(self.allocate("texture", expected)?);
        self.textures.insert(
            id,
            Texture {
                width,
                height,
                rgba: rgba.to_vec(),
            },
        );
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        let texture = self.textures.remove(&id).ok_or(ResourceError::InvalidHandle)?;
        self.allocated -= texture.rgba.len();
        self.texture_units.retain(|_, t| *t != id);
        Ok(())
    }

    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError> {
        let vertex = compile_stage(ShaderStage::Vertex, label, vertex_source)?;
        let fragment = compile_stage(ShaderStage::Fragment, label, fragment_source)?;
        let reflection = link(label, vertex_source, fragment_source, &vertex, &fragment)?;
        let id = ProgramId(self.next_id());
        log::debug!(
            "Linked program {id:?} '{label}' ({} uniforms, {} attributes)",
            reflection.uniforms.len(),
            reflection.attributes.len()
        );
        self.programs.insert(
            id,
            SoftwareProgram {
                label: label.to_string(),
                reflection,
                values: HashMap::new(),
            },
        );
        self.stats.programs_linked += 1;
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.programs.remove(&id).ok_or(ResourceError::InvalidHandle)?;
        if self.current_program == Some(id) {
            self.current_program = None;
        }
        Ok(())
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let slot = *self.programs.get(&program)?.reflection.uniforms.get(name)?;
        Some(UniformLocation { program, slot })
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        let slot = *self.programs.get(&program)?.reflection.attributes.get(name)?;
        Some(AttributeLocation { program, slot })
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains_key(&program) {
            log::warn!("use_program on unknown program {program:?}");
            return;
        }
        self.current_program = Some(program);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        match self.programs.get_mut(&location.program) {
            Some(program) => {
                program.values.insert(location.slot, value);
                self.stats.uniform_writes += 1;
            }
            None => log::warn!("Uniform write to unknown program {:?}", location.program),
        }
    }

    fn bind_attribute(&mut self, location: AttributeLocation, buffer: BufferId, components: u32) {
        self.attributes.insert(location.slot, (buffer, components));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.texture_units.insert(unit, texture);
    }

    fn set_pipeline_state(&mut self, state: PipelineState) {
        self.pipeline = state;
    }

    fn draw_indexed(&mut self, primitive: Primitive, index_buffer: BufferId, count: u32) {
        self.stats.draw_calls += 1;
        let Some(program) = self.current_program.and_then(|id| self.programs.get(&id)) else {
            log::warn!("draw_indexed without a program in use");
            return;
        };
        let Some(indices) = self.buffers.get(&index_buffer).map(|b| read_u32s(b)) else {
            log::warn!("draw_indexed with unknown index buffer {index_buffer:?}");
            return;
        };
        let Some(vertices) = self.shade_vertices(program) else {
            log::trace!("draw_indexed skipped: no position attribute bound");
            return;
        };
        let vertex_colors = program.reflection.attributes.contains_key("aVertexColor");
        let stage = FragmentStage::new(program, &self.texture_units, &self.textures, vertex_colors);
        let pipeline = self.pipeline;
        let count = (count as usize).min(indices.len());
        let triangles = assemble(primitive, &indices[..count]);

        let target = self.target_mut();
        let size = (target.width, target.height);
        let mut written = 0;
        for triangle in triangles {
            let Some(corners) = triangle
                .iter()
                .map(|&i| vertices.get(i as usize).copied())
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let corners = [corners[0], corners[1], corners[2]];
            rasterize_triangle(corners, size, pipeline.cull_face, pipeline.front_face, |fragment| {
                let Some(i) = target.index(fragment.x, fragment.y) else {
                    return;
                };
                if pipeline.depth_test && !pipeline.depth_func.passes(fragment.depth, target.depth[i]) {
                    return;
                }
                let Some(color) = stage.shade(&fragment) else {
                    return;
                };
                if pipeline.depth_test {
                    target.depth[i] = fragment.depth;
                }
                let color = match pipeline.blend {
                    Some(func) => {
                        let [r, g, b, a] = target.color[i].map(|c| c as f32 / 255.0);
                        blend(func, color, Vec4::new(r, g, b, a))
                    }
                    None => color,
                };
                target.color[i] = color.to_array().map(quantize);
                written += 1;
            });
        }
        self.stats.fragments_written += written;
    }

    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId, ResourceError> {
        let target = RenderTarget::new(width, height);
        let id = FramebufferId(self.allocate("framebuffer", target.byte_size())?);
        self.framebuffers.insert(id, target);
        log::debug!("Created framebuffer {id:?} ({width}x{height})");
        Ok(id)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        match framebuffer {
            Some(id) if !self.framebuffers.contains_key(&id) => {
                log::warn!("bind_framebuffer on unknown framebuffer {id:?}, binding the canvas");
                self.bound_framebuffer = None;
            }
            _ => self.bound_framebuffer = framebuffer,
        }
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<(), ResourceError> {
        let target = self
            .framebuffers
            .remove(&id)
            .ok_or(ResourceError::InvalidHandle)?;
        self.allocated -= target.byte_size();
        if self.bound_framebuffer == Some(id) {
            self.bound_framebuffer = None;
        }
        Ok(())
    }

    fn canvas_size(&self) -> (u32, u32) {
        (self.canvas.width, self.canvas.height)
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.target_mut().clear(color);
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> [u8; 4] {
        self.target_mut().pixel(x, y)
    }

    fn flush(&mut self) {}

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "precision highp float;
attribute vec3 aVertex;
uniform mat4 uMMatrix;
uniform mat4 uVMatrix;
uniform mat4 uPMatrix;
void main() {
    gl_Position = uPMatrix * uVMatrix * uMMatrix * vec4(aVertex, 1.0);
}
";

    const COLOR: &str = "precision highp float;
uniform vec3 uMaterialBaseColor;
void main() {
    gl_FragColor = vec4(uMaterialBaseColor, 1.0);
}
";

    const PICK: &str = "precision highp float;
uniform vec4 uPickColor;
uniform int uRayPickMode;
vec4 packDepth(float depth) {
    return fract(depth * vec4(16777216.0, 65536.0, 256.0, 1.0));
}
void main() {
    if (uRayPickMode == 1) {
        gl_FragColor = packDepth(gl_FragCoord.z);
    } else {
        gl_FragColor = uPickColor;
    }
}
";

    fn program(device: &mut SoftwareDevice, fragment: &str) -> ProgramId {
        device.create_program("test", VERTEX, fragment).unwrap()
    }

    fn set(device: &mut SoftwareDevice, program: ProgramId, name: &str, value: UniformValue) {
        let location = device.uniform_location(program, name).unwrap();
        device.set_uniform(location, value);
    }

    /// Draws a quad covering the whole target at depth `z` in clip space.
    fn draw_quad(device: &mut SoftwareDevice, program: ProgramId, z: f32) {
        let positions: [f32; 12] = [
            -1.0, -1.0, z, 1.0, -1.0, z, 1.0, 1.0, z, -1.0, 1.0, z,
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
        let vertices = device
            .create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&positions))
            .unwrap();
        let index = device
            .create_buffer(BufferKind::Index, bytemuck::cast_slice(&indices))
            .unwrap();
        device.use_program(program);
        let location = device.attribute_location(program, "aVertex").unwrap();
        device.bind_attribute(location, vertices, 3);
        device.draw_indexed(Primitive::Triangles, index, 6);
    }

    #[test]
    fn test_draws_the_material_color() {
        let mut device = SoftwareDevice::new(4, 4);
        let program = program(&mut device, COLOR);
        set(&mut device, program, "uMaterialBaseColor", UniformValue::Vec3([1.0, 0.0, 0.0]));

        device.clear([0.0, 0.0, 0.0, 1.0]);
        draw_quad(&mut device, program, 0.0);

        assert_eq!(device.canvas_pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(device.canvas_pixel(3, 3), [255, 0, 0, 255]);
        assert_eq!(device.stats().draw_calls, 1);
        assert_eq!(device.stats().fragments_written, 16);
    }

    #[test]
    fn test_nearer_fragments_win_the_depth_test() {
        let mut device = SoftwareDevice::new(2, 2);
        let program = program(&mut device, COLOR);
        device.clear([0.0; 4]);

        set(&mut device, program, "uMaterialBaseColor", UniformValue::Vec3([1.0, 0.0, 0.0]));
        draw_quad(&mut device, program, -0.5);
        set(&mut device, program, "uMaterialBaseColor", UniformValue::Vec3([0.0, 1.0, 0.0]));
        draw_quad(&mut device, program, 0.5);
        assert_eq!(device.canvas_pixel(1, 1), [255, 0, 0, 255]);

        device.set_pipeline_state(PipelineState {
            depth_test: false,
            ..PipelineState::default()
        });
        draw_quad(&mut device, program, 0.5);
        assert_eq!(device.canvas_pixel(1, 1), [0, 255, 0, 255]);
    }

    #[test]
    fn test_pick_programs_write_exact_colors_and_packed_depth() {
        let mut device = SoftwareDevice::new(2, 2);
        let program = program(&mut device, PICK);
        device.clear([0.0; 4]);

        set(&mut device, program, "uPickColor", UniformValue::Vec4([0.0, 0.0, 2.0 / 255.0, 1.0]));
        set(&mut device, program, "uRayPickMode", UniformValue::Int(0));
        draw_quad(&mut device, program, 0.0);
        assert_eq!(device.read_pixel(0, 0), [0, 0, 2, 255]);

        device.clear([0.0; 4]);
        set(&mut device, program, "uRayPickMode", UniformValue::Int(1));
        draw_quad(&mut device, program, 0.0);
        // window depth 0.5 lands entirely in the most significant channel
        assert_eq!(device.read_pixel(1, 1), [0, 0, 0, 128]);
    }

    #[test]
    fn test_framebuffers_are_separate_targets() {
        let mut device = SoftwareDevice::new(2, 2);
        device.clear([0.0, 0.0, 1.0, 1.0]);
        let fb = device.create_framebuffer(2, 2).unwrap();
        device.bind_framebuffer(Some(fb));
        device.clear([1.0, 1.0, 1.0, 1.0]);
        assert_eq!(device.read_pixel(0, 0), [255; 4]);

        device.bind_framebuffer(None);
        assert_eq!(device.read_pixel(0, 0), [0, 0, 255, 255]);
        device.destroy_framebuffer(fb).unwrap();
        assert_eq!(device.live_framebuffers(), 0);
        assert!(matches!(
            device.destroy_framebuffer(fb),
            Err(ResourceError::InvalidHandle)
        ));
    }

    #[test]
    fn test_allocations_past_the_limit_fail() {
        let mut device = SoftwareDevice::new(1, 1).with_memory_limit(16);
        let first = device.create_buffer(BufferKind::Vertex, &[0; 12]).unwrap();
        let err = device.create_buffer(BufferKind::Vertex, &[0; 12]).unwrap_err();
        assert!(matches!(err, ResourceError::AllocationFailed { resource: "buffer", .. }));

        device.destroy_buffer(first).unwrap();
        assert_eq!(device.allocated_bytes(), 0);
        assert!(device.create_buffer(BufferKind::Vertex, &[0; 12]).is_ok());
    }

    #[test]
    fn test_invalid_source_creates_no_program() {
        let mut device = SoftwareDevice::new(1, 1);
        let err = device
            .create_program("broken", VERTEX, "void main() { gl_FragColor = vec4(1.0); ")
            .unwrap_err();
        assert_eq!(err.label(), "broken");
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.stats().programs_linked, 0);
    }
}
