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

use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, ShaderError};
use std::any::Any;
use std::fmt::Debug;

/// The immediate-mode GPU command interface consumed by the draw-list engine.
///
/// Implementations keep their own binding state (current program, bound
/// framebuffer, attribute and texture bindings), exactly like a WebGL context.
/// All calls are issued from the single thread that compiles and renders a
/// scene, so the trait takes `&mut self`.
pub trait GpuDevice: Debug {
    /// Creates a GPU buffer initialised with `data`.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the backend cannot allocate the buffer.
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates an RGBA8 texture of the given size from tightly packed pixels.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the backend cannot allocate the texture.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError>;

    /// Compiles both stages and links them into a program.
    ///
    /// `label` identifies the program in diagnostics (the state signature).
    /// ## Errors
    /// * `ShaderError::CompilationFailure` - If either stage fails to compile.
    /// * `ShaderError::LinkFailure` - If linking or validation fails.
    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError>;

    /// Destroys a program.
    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError>;

    /// Looks up a uniform by name. `None` when the program does not declare it.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Looks up a vertex attribute by name. `None` when the program does not declare it.
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation>;

    /// Makes `program` current for subsequent uniform writes and draws.
    fn use_program(&mut self, program: ProgramId);

    /// Writes a uniform of the current program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Binds `buffer` to an attribute slot with the given number of `f32` components.
    fn bind_attribute(&mut self, location: AttributeLocation, buffer: BufferId, components: u32);

    /// Binds a texture to a texture unit.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Applies cull, winding, depth and blend flags.
    fn set_pipeline_state(&mut self, state: PipelineState);

    /// Draws `count` indices from `index_buffer` using the current bindings.
    fn draw_indexed(&mut self, primitive: Primitive, index_buffer: BufferId, count: u32);

    /// Creates an off-screen color + depth target.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the backend cannot allocate the target.
    fn create_framebuffer(&mut self, width: u32, height: u32)
        -> Result<FramebufferId, ResourceError>;

    /// Binds an off-screen target, or the default canvas target for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Destroys an off-screen target.
    fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<(), ResourceError>;

    /// Size in pixels of the default canvas target.
    fn canvas_size(&self) -> (u32, u32);

    /// Clears color and depth of the bound target.
    fn clear(&mut self, color: [f32; 4]);

    /// Reads back one RGBA8 pixel of the bound target; `y` counts from the bottom row.
    fn read_pixel(&mut self, x: u32, y: u32) -> [u8; 4];

    /// Flushes queued commands.
    fn flush(&mut self);

    /// Returns the device as `Any`, for downcasting to the concrete backend.
    fn as_any(&self) -> &dyn Any;
}
