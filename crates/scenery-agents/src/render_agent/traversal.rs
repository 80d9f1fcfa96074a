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

//! The depth-first compile traversal feeding the draw-list builder.

use super::context::SceneCompileContext;
use scenery_core::renderer::GpuDevice;
use scenery_core::scene::{NodeId, PassLevel};
use scenery_data::state::StateStacks;
use scenery_data::{NodeData, SceneGraph};
use scenery_lanes::compile_lane::CompileScheduler;
use scenery_lanes::draw_lane::{DrawListBuilder, PassSummary};
use scenery_lanes::{RenderError, RenderResult};

/// What a traversal produced.
#[derive(Debug, Default)]
pub(crate) struct CompileOutcome {
    pub summary: PassSummary,
    /// Shader failures hit while binding geometry. The traversal carries on
    /// past them so other geometry still gets its entries.
    pub shader_failures: Vec<RenderError>,
}

struct Compiler<'a> {
    graph: &'a SceneGraph,
    scheduler: &'a mut CompileScheduler,
    stacks: &'a mut StateStacks,
    builder: &'a mut DrawListBuilder,
    device: &'a mut dyn GpuDevice,
    shader_failures: Vec<RenderError>,
}

impl Compiler<'_> {
    fn visit(&mut self, node: NodeId) -> RenderResult<()> {
        let graph = self.graph;
        let Some(scene_node) = graph.get(node) else {
            return Ok(());
        };
        if !self.scheduler.should_visit(graph, node, scene_node.kind) {
            return Ok(());
        }

        let pushed = scene_node.data.contribution().map(|contribution| {
            let kind = contribution.kind();
            self.stacks.push(node, scene_node.revision, contribution);
            kind
        });

        if let NodeData::Geometry(geometry) = &scene_node.data {
            for exported in self.stacks.marshal() {
                self.builder.set_state(self.device, exported)?;
            }
            match self
                .builder
                .bind_geometry(self.device, node, scene_node.revision, geometry)
            {
                Ok(()) => {}
                Err(e) if e.signature().is_some() => {
                    log::error!("Geometry node {node} is unrenderable: {e}");
                    self.shader_failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        for &child in &scene_node.children {
            self.visit(child)?;
        }

        if let Some(kind) = pushed {
            self.stacks.pop(kind);
        }
        Ok(())
    }
}

/// Runs one traversing pass over the scene and closes it on the builder.
///
/// Resource failures abort the pass; the builder is still finished so that
/// references taken so far are accounted for.
pub(crate) fn compile(
    ctx: &mut SceneCompileContext,
    device: &mut dyn GpuDevice,
    level: PassLevel,
) -> RenderResult<CompileOutcome> {
    let SceneCompileContext {
        graph,
        scheduler,
        stacks,
        builder,
        ..
    } = ctx;

    let graph: &SceneGraph = graph;
    builder.begin(level);
    stacks.reset();
    let mut compiler = Compiler {
        graph,
        scheduler,
        stacks,
        builder: &mut *builder,
        device: &mut *device,
        shader_failures: Vec::new(),
    };
    let result = compiler.visit(graph.root());
    let shader_failures = std::mem::take(&mut compiler.shader_failures);

    let summary = builder.finish(device);
    result?;
    Ok(CompileOutcome {
        summary,
        shader_failures,
    })
}
