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

use super::{AttrValue, NodeData};
use scenery_core::scene::{NodeId, NodeKind, SceneError};

/// Read-only view of a tree's structure, as needed by the compile scheduler.
pub trait SceneTopology {
    /// Parent of a node; `None` for the root or unknown nodes.
    fn parent(&self, id: NodeId) -> Option<NodeId>;
    /// Children of a node, in traversal order.
    fn children(&self, id: NodeId) -> &[NodeId];
    /// Kind of a node, if it is live.
    fn kind(&self, id: NodeId) -> Option<NodeKind>;
}

/// One node of a [`SceneGraph`].
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// The node's identifier.
    pub id: NodeId,
    /// The node's kind.
    pub kind: NodeKind,
    /// Parent node, `None` for the root.
    pub parent: Option<NodeId>,
    /// Child nodes in traversal order.
    pub children: Vec<NodeId>,
    /// Kind-specific attributes.
    pub data: NodeData,
    /// Bumped every time an attribute of the node is written.
    pub revision: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

/// An arena-allocated scene tree with generation-checked node ids.
#[derive(Debug)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    next_revision: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// A tree holding only a [`NodeKind::Scene`] root.
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(SceneNode {
                    id: root,
                    kind: NodeKind::Scene,
                    parent: None,
                    children: Vec::new(),
                    data: NodeData::Group,
                    revision: 1,
                }),
            }],
            free: Vec::new(),
            root,
            next_revision: 2,
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    /// Whether only the root is left.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Looks up a live node.
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Looks up a live node, failing with [`SceneError::NodeNotFound`].
    pub fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn bump_revision(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }

    /// Creates a node under `parent`, appended after its existing children.
    pub fn add_node(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let revision = self.bump_revision();
        let kind = data.kind();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation += 1;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.slots[id.index as usize].node = Some(SceneNode {
            id,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            data,
            revision,
        });
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Detaches and destroys a node and every descendant.
    ///
    /// Returns the removed nodes in pre-order, the node itself first.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<SceneNode>, SceneError> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        let order = self.subtree(id);
        let mut removed = Vec::with_capacity(order.len());
        for node_id in order {
            let slot = &mut self.slots[node_id.index as usize];
            if let Some(node) = slot.node.take() {
                removed.push(node);
                self.free.push(node_id.index);
            }
        }
        Ok(removed)
    }

    /// Writes one attribute of a node and bumps its revision.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        attr: &str,
        sub_attr: Option<&str>,
        value: &AttrValue,
    ) -> Result<&SceneNode, SceneError> {
        let revision = self.bump_revision();
        let node = self.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.data.set_attribute(attr, sub_attr, value)?;
        node.revision = revision;
        Ok(node)
    }

    /// Node ids of a subtree in pre-order, `id` first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.get(next) {
                order.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Iterates over every live node in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.slots.iter().filter_map(|s| s.node.as_ref())
    }
}

impl SceneTopology for SceneGraph {
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(|n| n.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LayerState, MaterialState};
    use glam::Vec3;

    #[test]
    fn test_add_and_remove_subtree_recycles_slots_with_new_generation() {
        let mut graph = SceneGraph::new();
        let group = graph.add_node(graph.root(), NodeData::Group).unwrap();
        let child = graph
            .add_node(group, NodeData::Material(MaterialState::default()))
            .unwrap();

        let removed = graph.remove_subtree(group).unwrap();
        assert_eq!(
            removed.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![group, child]
        );
        assert!(graph.children(graph.root()).is_empty());
        assert!(!graph.contains(child));

        let reused = graph.add_node(graph.root(), NodeData::Group).unwrap();
        assert_ne!(reused, group);
        assert_ne!(reused, child);
        assert!(graph.get(group).is_none());
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut graph = SceneGraph::new();
        assert_eq!(
            graph.remove_subtree(graph.root()).unwrap_err(),
            SceneError::RootRemoval
        );
    }

    #[test]
    fn test_set_attribute_bumps_revision_only_on_success() {
        let mut graph = SceneGraph::new();
        let layer = graph
            .add_node(graph.root(), NodeData::Layer(LayerState::default()))
            .unwrap();
        let before = graph.node(layer).unwrap().revision;

        graph
            .set_attribute(layer, "priority", None, &AttrValue::Int(3))
            .unwrap();
        let after = graph.node(layer).unwrap().revision;
        assert!(after > before);

        assert!(graph
            .set_attribute(layer, "priority", None, &AttrValue::Vec3(Vec3::ONE))
            .is_err());
        assert_eq!(graph.node(layer).unwrap().revision, after);
    }

    #[test]
    fn test_subtree_is_pre_order() {
        let mut graph = SceneGraph::new();
        let a = graph.add_node(graph.root(), NodeData::Group).unwrap();
        let b = graph.add_node(a, NodeData::Group).unwrap();
        let c = graph.add_node(a, NodeData::Group).unwrap();
        let d = graph.add_node(b, NodeData::Group).unwrap();
        assert_eq!(graph.subtree(a), vec![a, b, d, c]);
    }
}
