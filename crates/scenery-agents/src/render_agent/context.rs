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

//! Everything one scene needs between frames.

use scenery_core::scene::{NodeId, SceneId};
use scenery_core::EngineSettings;
use scenery_data::state::{StateSource, StateStacks, StateValue};
use scenery_data::{SceneGraph, SceneTopology, StateKind};
use scenery_lanes::command_lane::CommandPlayer;
use scenery_lanes::compile_lane::{CompileConfig, CompileScheduler};
use scenery_lanes::draw_lane::DrawListBuilder;
use scenery_lanes::pick_lane::Picker;
use scenery_lanes::sort_lane::{lane_for, SortLane};

/// The per-scene compile and render state.
///
/// Each scene owns its own stacks, pools, programs and caches, so two scenes
/// never observe each other's state.
pub struct SceneCompileContext {
    pub(crate) id: SceneId,
    pub(crate) graph: SceneGraph,
    pub(crate) scheduler: CompileScheduler,
    pub(crate) stacks: StateStacks,
    pub(crate) builder: DrawListBuilder,
    pub(crate) player: CommandPlayer,
    pub(crate) picker: Picker,
    pub(crate) sorter: Box<dyn SortLane>,
    pub(crate) frame_number: u64,
}

impl std::fmt::Debug for SceneCompileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneCompileContext")
            .field("id", &self.id)
            .field("nodes", &self.graph.len())
            .field("entries", &self.builder.bin().len())
            .field("sorter", &self.sorter.strategy_name())
            .field("frame_number", &self.frame_number)
            .finish()
    }
}

impl SceneCompileContext {
    /// An empty scene configured from `settings`, with a full compile pending.
    pub fn new(id: SceneId, settings: &EngineSettings) -> Self {
        Self {
            id,
            graph: SceneGraph::new(),
            scheduler: CompileScheduler::new(CompileConfig::with_rules(&settings.compile_rules)),
            stacks: StateStacks::new(),
            builder: DrawListBuilder::new(settings.canvas_id.clone()),
            player: CommandPlayer::new(),
            picker: Picker::new(),
            sorter: lane_for(settings.sort_policy),
            frame_number: 0,
        }
    }

    /// The scene's identifier.
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// The scene tree.
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The compile scheduler.
    pub fn scheduler(&self) -> &CompileScheduler {
        &self.scheduler
    }

    /// The draw-list builder, with its soup, bin and program cache.
    pub fn builder(&self) -> &DrawListBuilder {
        &self.builder
    }

    /// Frames rendered so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Rewrites the exported payload of `node`, and of every node below it
    /// contributing the same kind, without touching any entry.
    ///
    /// Returns `false` if some already exported payload could not be updated
    /// in place; the caller must then fall back to a recompile.
    pub(crate) fn refresh_in_place(&mut self, node: NodeId) -> bool {
        let Some(kind) = self.contribution_kind(node) else {
            return true;
        };
        let mut refreshed = true;
        for target in self.graph.subtree(node) {
            if self.contribution_kind(target) != Some(kind) {
                continue;
            }
            let Some((source, value)) = self.aggregate_at(target, kind) else {
                continue;
            };
            let exported = self.builder.soup().handle_for(kind, target).is_some();
            if exported && !self.builder.refresh(kind, source, value) {
                log::debug!("{kind:?} of node {target} cannot be refreshed in place");
                refreshed = false;
            }
        }
        refreshed
    }

    fn contribution_kind(&self, node: NodeId) -> Option<StateKind> {
        self.graph
            .get(node)
            .and_then(|n| n.data.contribution())
            .map(|c| c.kind())
    }

    /// The stack top of `kind` right after `node` pushed its contribution,
    /// replaying only that kind along the path from the root.
    fn aggregate_at(&self, node: NodeId, kind: StateKind) -> Option<(StateSource, StateValue)> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.graph.parent(current) {
            path.push(parent);
            current = parent;
        }

        let mut stacks = StateStacks::new();
        for id in path.into_iter().rev() {
            let Some(scene_node) = self.graph.get(id) else {
                continue;
            };
            if let Some(contribution) = scene_node.data.contribution() {
                if contribution.kind() == kind {
                    stacks.push(id, scene_node.revision, contribution);
                }
            }
        }
        stacks
            .marshal()
            .into_iter()
            .find(|e| e.kind == kind)
            .and_then(|e| e.top)
    }
}
