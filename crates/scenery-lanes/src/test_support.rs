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

//! A recording [`GpuDevice`] for unit tests.

use ahash::AHashMap;
use scenery_core::renderer::{
    AttributeLocation, BufferId, BufferKind, FramebufferId, GpuDevice, PipelineState, Primitive,
    ProgramId, ResourceError, ShaderError, ShaderStage, TextureId, UniformLocation, UniformValue,
};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UseProgram(ProgramId),
    SetUniform(String, UniformValue),
    BindAttribute(String, BufferId, u32),
    BindTexture(u32, TextureId),
    Pipeline(PipelineState),
    Draw(Primitive, BufferId, u32),
    BindFramebuffer(Option<FramebufferId>),
    Clear([f32; 4]),
}

#[derive(Debug)]
struct ProgramInfo {
    label: String,
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

fn declared(source: &str, qualifier: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            (words.next() == Some(qualifier)).then(|| words.nth(1))?
        })
        .map(|name| name.trim_end_matches(';').to_string())
        .collect()
}

/// Records every call; programs fail when their label contains `fail_on`.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub calls: Vec<Call>,
    pub buffers: AHashMap<u32, Vec<u8>>,
    pub textures: AHashMap<u32, (u32, u32)>,
    pub framebuffers: AHashMap<u32, (u32, u32)>,
    pub fail_on: Option<String>,
    pub pixel: [u8; 4],
    pub size: (u32, u32),
    programs: AHashMap<u32, ProgramInfo>,
    current: Option<ProgramId>,
    next_id: u32,
    pub programs_created: usize,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            size: (64, 64),
            ..Default::default()
        }
    }

    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn program_label(&self, id: ProgramId) -> Option<&str> {
        self.programs.get(&id.0).map(|p| p.label.as_str())
    }

    pub fn uniform_writes(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetUniform(n, v) if n == name => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Draw(..)))
            .count()
    }
}

impl GpuDevice for RecordingDevice {
    fn create_buffer(&mut self, _kind: BufferKind, data: &[u8]) -> Result<BufferId, ResourceError> {
        let id = self.id();
        self.buffers.insert(id, data.to_vec());
        Ok(BufferId(id))
    }

    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        _rgba: &[u8],
    ) -> Result<TextureId, ResourceError> {
        let id = self.id();
        self.textures.insert(id, (width, height));
        Ok(TextureId(id))
    }

    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        self.textures
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError> {
        if self.fail_on.as_deref().is_some_and(|f| label.contains(f)) {
            return Err(ShaderError::CompilationFailure {
                stage: ShaderStage::Fragment,
                label: label.to_string(),
                source: fragment_source.to_string(),
                log: "forced failure".to_string(),
            });
        }
        let id = self.id();
        let mut uniforms = declared(vertex_source, "uniform");
        for u in declared(fragment_source, "uniform") {
            if !uniforms.contains(&u) {
                uniforms.push(u);
            }
        }
        self.programs.insert(
            id,
            ProgramInfo {
                label: label.to_string(),
                uniforms,
                attributes: declared(vertex_source, "attribute"),
            },
        );
        self.programs_created += 1;
        Ok(ProgramId(id))
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.programs
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let info = self.programs.get(&program.0)?;
        let slot = info.uniforms.iter().position(|u| u == name)?;
        Some(UniformLocation {
            program,
            slot: slot as u32,
        })
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        let info = self.programs.get(&program.0)?;
        let slot = info.attributes.iter().position(|a| a == name)?;
        Some(AttributeLocation {
            program,
            slot: slot as u32,
        })
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current = Some(program);
        self.calls.push(Call::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self
            .programs
            .get(&location.program.0)
            .and_then(|p| p.uniforms.get(location.slot as usize))
            .cloned()
            .unwrap_or_default();
        self.calls.push(Call::SetUniform(name, value));
    }

    fn bind_attribute(&mut self, location: AttributeLocation, buffer: BufferId, components: u32) {
        let name = self
            .programs
            .get(&location.program.0)
            .and_then(|p| p.attributes.get(location.slot as usize))
            .cloned()
            .unwrap_or_default();
        self.calls.push(Call::BindAttribute(name, buffer, components));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(Call::BindTexture(unit, texture));
    }

    fn set_pipeline_state(&mut self, state: PipelineState) {
        self.calls.push(Call::Pipeline(state));
    }

    fn draw_indexed(&mut self, primitive: Primitive, index_buffer: BufferId, count: u32) {
        self.calls.push(Call::Draw(primitive, index_buffer, count));
    }

    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId, ResourceError> {
        let id = self.id();
        self.framebuffers.insert(id, (width, height));
        Ok(FramebufferId(id))
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.calls.push(Call::BindFramebuffer(framebuffer));
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<(), ResourceError> {
        self.framebuffers
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(Call::Clear(color));
    }

    fn read_pixel(&mut self, _x: u32, _y: u32) -> [u8; 4] {
        self.pixel
    }

    fn flush(&mut self) {}

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
