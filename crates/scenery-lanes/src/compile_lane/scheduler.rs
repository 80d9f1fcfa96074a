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

//! Decides how much of a scene each frame re-traverses.

use super::CompileConfig;
use ahash::{AHashMap, AHashSet};
use scenery_core::scene::{CompileLevel, NodeId, NodeKind, NodeOp, PassLevel};
use scenery_data::SceneTopology;

/// What [`CompileScheduler::begin_pass`] decided for the coming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDecision {
    /// Granularity of the pass.
    pub level: PassLevel,
    /// Whether the bin must be re-sorted after the pass.
    pub resort: bool,
}

/// Records mutation intent between frames and prunes the next traversal.
///
/// At most one level is recorded per node and a recorded level only moves
/// towards more general levels, so repeated notifications are idempotent.
#[derive(Debug)]
pub struct CompileScheduler {
    config: CompileConfig,
    full_pending: bool,
    redraw_pending: bool,
    queued: AHashMap<NodeId, CompileLevel>,
    pass: PassLevel,
    dirty_branches: AHashSet<NodeId>,
    dirty_paths: AHashSet<NodeId>,
    always_paths: AHashSet<NodeId>,
}

impl CompileScheduler {
    /// A scheduler with a full compile pending.
    pub fn new(config: CompileConfig) -> Self {
        Self {
            config,
            full_pending: true,
            redraw_pending: false,
            queued: AHashMap::new(),
            pass: PassLevel::Nothing,
            dirty_branches: AHashSet::new(),
            dirty_paths: AHashSet::new(),
            always_paths: AHashSet::new(),
        }
    }

    /// The configuration table in use.
    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// The pass currently running, [`PassLevel::Nothing`] between passes.
    pub fn pass_level(&self) -> PassLevel {
        self.pass
    }

    /// Whether nothing is pending for the next frame.
    pub fn is_idle(&self) -> bool {
        !self.full_pending && !self.redraw_pending && self.queued.is_empty()
    }

    /// Forces the next pass to compile everything.
    pub fn request_full_compile(&mut self) {
        self.full_pending = true;
        self.queued.clear();
    }

    /// Forces the next pass to at least replay the draw list.
    pub fn request_redraw(&mut self) {
        self.redraw_pending = true;
    }

    /// Records the compile level a just-applied mutation requires.
    ///
    /// Returns the resolved level.
    pub fn notify(
        &mut self,
        node: NodeId,
        kind: NodeKind,
        op: NodeOp,
        attr: Option<&str>,
        sub_attr: Option<&str>,
    ) -> CompileLevel {
        let level = self.config.level(kind, op, attr, sub_attr);
        match level {
            CompileLevel::Nothing => {}
            CompileLevel::Redraw => self.redraw_pending = true,
            CompileLevel::CompileScene => self.request_full_compile(),
            _ if self.full_pending => {}
            _ => {
                let recorded = self.queued.entry(node).or_insert(level);
                if level < *recorded {
                    *recorded = level;
                }
            }
        }
        log::trace!("notify {kind} {node} {op:?} {attr:?} -> {level:?}");
        level
    }

    /// Drains recorded intent and decides the granularity of the coming pass.
    pub fn begin_pass<T: SceneTopology>(&mut self, topology: &T) -> PassDecision {
        self.dirty_branches.clear();
        self.dirty_paths.clear();

        if self.full_pending {
            self.full_pending = false;
            self.redraw_pending = false;
            self.queued.clear();
            self.always_paths.clear();
            self.pass = PassLevel::Everything;
            log::debug!("Compile pass: everything");
            return PassDecision {
                level: PassLevel::Everything,
                resort: true,
            };
        }

        if self.queued.is_empty() {
            let level = if std::mem::take(&mut self.redraw_pending) {
                PassLevel::Redraw
            } else {
                PassLevel::Nothing
            };
            self.pass = level;
            return PassDecision {
                level,
                resort: false,
            };
        }

        let mut queued: Vec<(NodeId, CompileLevel)> = self.queued.drain().collect();
        queued.sort_by_key(|(node, level)| (*level, *node));

        let mut resort = false;
        for (node, level) in queued {
            if topology.kind(node).is_none() {
                continue;
            }
            match level {
                CompileLevel::CompileBranch => {
                    self.mark_branch(topology, node);
                    self.mark_path(topology, node);
                }
                CompileLevel::CompilePath => self.mark_path(topology, node),
                CompileLevel::Resort => resort = true,
                _ => {}
            }
        }
        self.redraw_pending = false;
        self.pass = PassLevel::Partial;
        log::debug!(
            "Compile pass: partial ({} branch nodes, {} path nodes, resort: {resort})",
            self.dirty_branches.len(),
            self.dirty_paths.len()
        );
        PassDecision {
            level: PassLevel::Partial,
            resort,
        }
    }

    fn mark_branch<T: SceneTopology>(&mut self, topology: &T, node: NodeId) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if self.dirty_branches.insert(next) {
                stack.extend_from_slice(topology.children(next));
            }
        }
    }

    fn mark_path<T: SceneTopology>(&mut self, topology: &T, node: NodeId) {
        Self::mark_ancestors(&mut self.dirty_paths, topology, node);
    }

    fn mark_ancestors<T: SceneTopology>(set: &mut AHashSet<NodeId>, topology: &T, node: NodeId) {
        let mut current = Some(node);
        while let Some(n) = current {
            if !set.insert(n) {
                break;
            }
            current = topology.parent(n);
        }
    }

    /// Whether the traversal should enter `node` during the current pass.
    pub fn should_visit<T: SceneTopology>(
        &mut self,
        topology: &T,
        node: NodeId,
        kind: NodeKind,
    ) -> bool {
        let always = self.config.always_compile(kind);
        if always && self.pass.traverses() {
            Self::mark_ancestors(&mut self.always_paths, topology, node);
        }
        match self.pass {
            PassLevel::Everything => true,
            PassLevel::Partial => {
                always
                    || self.dirty_branches.contains(&node)
                    || self.dirty_paths.contains(&node)
                    || self.always_paths.contains(&node)
            }
            PassLevel::Redraw | PassLevel::Nothing => false,
        }
    }

    /// Whether `node` lies inside a subtree that is being fully recompiled.
    pub fn in_dirty_branch(&self, node: NodeId) -> bool {
        self.pass == PassLevel::Everything || self.dirty_branches.contains(&node)
    }

    /// Closes the current pass.
    pub fn end_pass(&mut self) {
        self.dirty_branches.clear();
        self.dirty_paths.clear();
        self.pass = PassLevel::Nothing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_data::state::{LayerState, MaterialState};
    use scenery_data::{NodeData, SceneGraph};
    use std::sync::Arc;

    struct Fixture {
        graph: SceneGraph,
        group: NodeId,
        material: NodeId,
        geometry: NodeId,
        sibling: NodeId,
    }

    fn fixture() -> Fixture {
        let mut graph = SceneGraph::new();
        let group = graph.add_node(graph.root(), NodeData::Group).unwrap();
        let material = graph
            .add_node(group, NodeData::Material(MaterialState::default()))
            .unwrap();
        let geometry = graph
            .add_node(
                material,
                NodeData::Geometry(Arc::new(scenery_data::state::GeometryData::quad(1.0))),
            )
            .unwrap();
        let sibling = graph
            .add_node(graph.root(), NodeData::Layer(LayerState::default()))
            .unwrap();
        Fixture {
            graph,
            group,
            material,
            geometry,
            sibling,
        }
    }

    fn settled(f: &Fixture) -> CompileScheduler {
        let mut scheduler = CompileScheduler::new(CompileConfig::default());
        scheduler.begin_pass(&f.graph);
        scheduler.end_pass();
        scheduler
    }

    #[test]
    fn test_first_pass_compiles_everything() {
        let f = fixture();
        let mut scheduler = CompileScheduler::new(CompileConfig::default());
        let decision = scheduler.begin_pass(&f.graph);
        assert_eq!(decision.level, PassLevel::Everything);
        assert!(scheduler.should_visit(&f.graph, f.sibling, NodeKind::Layer));
        scheduler.end_pass();
        assert_eq!(scheduler.begin_pass(&f.graph).level, PassLevel::Nothing);
    }

    #[test]
    fn test_redraw_level_does_not_traverse() {
        let f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(
            f.material,
            NodeKind::Material,
            NodeOp::Set,
            Some("baseColor"),
            None,
        );
        let decision = scheduler.begin_pass(&f.graph);
        assert_eq!(decision.level, PassLevel::Redraw);
        assert!(!scheduler.should_visit(&f.graph, f.graph.root(), NodeKind::Scene));
    }

    #[test]
    fn test_branch_marks_subtree_and_path_only() {
        let f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(f.group, NodeKind::Node, NodeOp::Add, None, None);

        let decision = scheduler.begin_pass(&f.graph);
        assert_eq!(decision.level, PassLevel::Partial);
        let g = &f.graph;
        assert!(scheduler.should_visit(g, g.root(), NodeKind::Scene));
        assert!(scheduler.should_visit(g, f.group, NodeKind::Node));
        assert!(scheduler.should_visit(g, f.material, NodeKind::Material));
        assert!(scheduler.should_visit(g, f.geometry, NodeKind::Geometry));
        assert!(!scheduler.should_visit(g, f.sibling, NodeKind::Layer));
    }

    #[test]
    fn test_path_level_does_not_descend() {
        let f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(f.group, NodeKind::Name, NodeOp::Set, Some("other"), None);

        assert_eq!(scheduler.begin_pass(&f.graph).level, PassLevel::Partial);
        assert!(scheduler.should_visit(&f.graph, f.group, NodeKind::Node));
        assert!(!scheduler.should_visit(&f.graph, f.material, NodeKind::Material));
    }

    #[test]
    fn test_resort_sets_the_flag() {
        let f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(f.sibling, NodeKind::Layer, NodeOp::Set, Some("priority"), None);
        let decision = scheduler.begin_pass(&f.graph);
        assert_eq!(
            decision,
            PassDecision {
                level: PassLevel::Partial,
                resort: true
            }
        );
    }

    #[test]
    fn test_scene_level_subsumes_queued_work() {
        let f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(f.group, NodeKind::Node, NodeOp::Add, None, None);
        scheduler.notify(f.geometry, NodeKind::Geometry, NodeOp::Set, Some("data"), None);
        scheduler.notify(f.sibling, NodeKind::Layer, NodeOp::Set, Some("priority"), None);
        assert_eq!(scheduler.begin_pass(&f.graph).level, PassLevel::Everything);
    }

    #[test]
    fn test_cheaper_request_never_downgrades_recorded_level() {
        let f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(f.group, NodeKind::Node, NodeOp::Add, None, None);
        scheduler.notify(f.group, NodeKind::Name, NodeOp::Set, Some("other"), None);
        scheduler.begin_pass(&f.graph);
        assert!(scheduler.should_visit(&f.graph, f.geometry, NodeKind::Geometry));
    }

    #[test]
    fn test_repeated_notification_is_idempotent() {
        let f = fixture();
        let run = |times: usize| {
            let mut scheduler = settled(&f);
            for _ in 0..times {
                scheduler.notify(f.group, NodeKind::Node, NodeOp::Add, None, None);
            }
            let decision = scheduler.begin_pass(&f.graph);
            let visits: Vec<bool> = [f.group, f.material, f.geometry, f.sibling]
                .iter()
                .map(|n| {
                    let kind = f.graph.kind(*n).unwrap();
                    scheduler.should_visit(&f.graph, *n, kind)
                })
                .collect();
            (decision, visits)
        };
        assert_eq!(run(1), run(2));
    }

    #[test]
    fn test_always_compile_nodes_are_visited_every_pass() {
        let f = fixture();
        let config = CompileConfig::builder()
            .op(NodeKind::Layer, NodeOp::Set, CompileLevel::Resort)
            .always_compile(NodeKind::Geometry)
            .build();
        let mut scheduler = CompileScheduler::new(config);

        scheduler.begin_pass(&f.graph);
        for node in f.graph.subtree(f.graph.root()) {
            let kind = f.graph.kind(node).unwrap();
            scheduler.should_visit(&f.graph, node, kind);
        }
        scheduler.end_pass();

        scheduler.notify(f.sibling, NodeKind::Layer, NodeOp::Set, Some("priority"), None);
        assert_eq!(scheduler.begin_pass(&f.graph).level, PassLevel::Partial);
        let g = &f.graph;
        assert!(scheduler.should_visit(g, g.root(), NodeKind::Scene));
        assert!(scheduler.should_visit(g, f.group, NodeKind::Node));
        assert!(scheduler.should_visit(g, f.material, NodeKind::Material));
        assert!(scheduler.should_visit(g, f.geometry, NodeKind::Geometry));
    }

    #[test]
    fn test_removed_nodes_in_queue_are_skipped() {
        let mut f = fixture();
        let mut scheduler = settled(&f);
        scheduler.notify(f.material, NodeKind::Node, NodeOp::Add, None, None);
        f.graph.remove_subtree(f.group).unwrap();
        let decision = scheduler.begin_pass(&f.graph);
        assert_eq!(decision.level, PassLevel::Partial);
        assert!(!scheduler.should_visit(&f.graph, f.graph.root(), NodeKind::Scene));
    }
}
