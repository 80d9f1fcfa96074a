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

use super::{
    ClipPlane, ClipState, ColorTransformState, FlagsOverride, FlagsState, LayerState,
    ListenerId, LightsState, MaterialState, MorphData, NameState, RenderListenersState,
    RendererOverride, RendererState, ShaderCode, ShaderParamsState, ShaderState, StateKind,
    TagState, TextureLayer, TransformState,
};
use glam::Mat4;
use scenery_core::renderer::UniformValue;
use scenery_core::scene::NodeId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The node a stack frame was pushed by, and the revision of the state it
/// aggregates.
///
/// For accumulating kinds the revision is the highest revision of every
/// frame below, so a change to any contributing node shows up as a change
/// of the top revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateSource {
    /// The pushing node.
    pub node: NodeId,
    /// Aggregated revision.
    pub revision: u64,
}

/// What one node pushes onto its kind's stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StateContribution {
    /// Local model matrix, composed onto the parent's world matrix.
    ModelTransform(Mat4),
    /// View matrix; the innermost one wins.
    ViewTransform(Mat4),
    /// Projection matrix; the innermost one wins.
    ProjTransform(Mat4),
    /// Material; the innermost one wins.
    Material(MaterialState),
    /// Lights appended to the ones already in scope.
    Lights(LightsState),
    /// Texture layers appended to the ones already in scope.
    Texture(Vec<TextureLayer>),
    /// Clip planes appended to the ones already in scope.
    Clips(Vec<ClipPlane>),
    /// Color transform; the innermost one wins.
    ColorTransform(ColorTransformState),
    /// Morph targets and factor; the innermost one wins.
    Morph {
        /// Key-framed targets.
        data: Arc<MorphData>,
        /// Current factor.
        factor: f32,
    },
    /// Flags merged field-wise over the ones in scope.
    Flags(FlagsOverride),
    /// Layer; the innermost one wins.
    Layer(LayerState),
    /// Tag; the innermost one wins.
    Tag(String),
    /// Pick name; the innermost one wins.
    Name(String),
    /// Shader code; the innermost one wins.
    Shader(Arc<ShaderCode>),
    /// Uniform values merged over the ones in scope.
    ShaderParams(BTreeMap<String, UniformValue>),
    /// Off-screen target size; the innermost one wins.
    FrameBuf {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Renderer settings merged over the ones in scope.
    Renderer(RendererOverride),
    /// Listeners appended to the ones in scope.
    RenderListeners(Vec<ListenerId>),
}

impl StateContribution {
    /// The stack this contribution is pushed onto.
    pub fn kind(&self) -> StateKind {
        match self {
            StateContribution::ModelTransform(_) => StateKind::ModelTransform,
            StateContribution::ViewTransform(_) => StateKind::ViewTransform,
            StateContribution::ProjTransform(_) => StateKind::ProjTransform,
            StateContribution::Material(_) => StateKind::Material,
            StateContribution::Lights(_) => StateKind::Lights,
            StateContribution::Texture(_) => StateKind::Texture,
            StateContribution::Clips(_) => StateKind::Clips,
            StateContribution::ColorTransform(_) => StateKind::ColorTransform,
            StateContribution::Morph { .. } => StateKind::Morph,
            StateContribution::Flags(_) => StateKind::Flags,
            StateContribution::Layer(_) => StateKind::Layer,
            StateContribution::Tag(_) => StateKind::Tag,
            StateContribution::Name(_) => StateKind::Name,
            StateContribution::Shader(_) => StateKind::Shader,
            StateContribution::ShaderParams(_) => StateKind::ShaderParams,
            StateContribution::FrameBuf { .. } => StateKind::FrameBuf,
            StateContribution::Renderer(_) => StateKind::Renderer,
            StateContribution::RenderListeners(_) => StateKind::RenderListeners,
        }
    }
}

/// The aggregated value at the top of one stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// Composed model, view or projection transform.
    Transform(TransformState),
    /// Material.
    Material(MaterialState),
    /// Accumulated lights.
    Lights(LightsState),
    /// Accumulated texture layers, not yet uploaded.
    Texture(Vec<TextureLayer>),
    /// Accumulated clip planes.
    Clips(ClipState),
    /// Color transform.
    ColorTransform(ColorTransformState),
    /// Morph targets, not yet uploaded.
    Morph {
        /// Key-framed targets.
        data: Arc<MorphData>,
        /// Current factor.
        factor: f32,
    },
    /// Merged flags.
    Flags(FlagsState),
    /// Layer.
    Layer(LayerState),
    /// Tag.
    Tag(TagState),
    /// Pick name.
    Name(NameState),
    /// Shader code.
    Shader(ShaderState),
    /// Merged shader params.
    ShaderParams(ShaderParamsState),
    /// Off-screen target size, not yet allocated.
    FrameBuf {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Merged renderer settings.
    Renderer(RendererState),
    /// Accumulated listeners.
    RenderListeners(RenderListenersState),
}

/// One kind's current top, handed to the state soup by [`StateStacks::marshal`].
///
/// `top == None` means the stack is empty and the kind's default handle applies.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedState {
    /// The kind exported.
    pub kind: StateKind,
    /// Source and value of the top frame.
    pub top: Option<(StateSource, StateValue)>,
}

#[derive(Debug, Clone)]
struct Frame {
    source: StateSource,
    value: StateValue,
}

/// Per-kind stacks pushed and popped in traversal order.
///
/// Pushing or popping a kind marks it dirty; [`marshal`](Self::marshal)
/// exports only dirty kinds, so consecutive geometry under the same state
/// re-uses what was exported before.
#[derive(Debug)]
pub struct StateStacks {
    stacks: [Vec<Frame>; StateKind::COUNT],
    dirty: [bool; StateKind::COUNT],
}

impl Default for StateStacks {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStacks {
    /// Empty stacks, every kind dirty.
    pub fn new() -> Self {
        Self {
            stacks: std::array::from_fn(|_| Vec::new()),
            dirty: [true; StateKind::COUNT],
        }
    }

    /// Empties every stack and marks every kind dirty, ready for a new traversal.
    pub fn reset(&mut self) {
        for stack in &mut self.stacks {
            stack.clear();
        }
        self.dirty = [true; StateKind::COUNT];
    }

    /// Depth of a kind's stack.
    pub fn depth(&self, kind: StateKind) -> usize {
        self.stacks[kind.index()].len()
    }

    /// Whether every stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stacks.iter().all(Vec::is_empty)
    }

    /// The aggregated value at the top of a stack.
    pub fn top(&self, kind: StateKind) -> Option<&StateValue> {
        self.stacks[kind.index()].last().map(|f| &f.value)
    }

    fn top_source(&self, kind: StateKind) -> Option<StateSource> {
        self.stacks[kind.index()].last().map(|f| f.source)
    }

    /// Pushes a node's contribution, aggregating it with the current top.
    pub fn push(&mut self, node: NodeId, revision: u64, contribution: StateContribution) {
        let kind = contribution.kind();
        let value = self.aggregate(contribution);
        let revision = match self.top_source(kind) {
            Some(parent) => parent.revision.max(revision),
            None => revision,
        };
        self.stacks[kind.index()].push(Frame {
            source: StateSource { node, revision },
            value,
        });
        self.dirty[kind.index()] = true;
    }

    /// Pops the top of a kind's stack.
    pub fn pop(&mut self, kind: StateKind) {
        if self.stacks[kind.index()].pop().is_none() {
            log::warn!("Unbalanced pop on empty {kind:?} stack");
        }
        self.dirty[kind.index()] = true;
    }

    /// Exports the top of every dirty stack and clears the dirty bits.
    pub fn marshal(&mut self) -> Vec<ExportedState> {
        let mut exported = Vec::new();
        for kind in StateKind::ALL {
            let i = kind.index();
            if !self.dirty[i] || kind == StateKind::Geometry {
                continue;
            }
            self.dirty[i] = false;
            exported.push(ExportedState {
                kind,
                top: self.stacks[i]
                    .last()
                    .map(|f| (f.source, f.value.clone())),
            });
        }
        exported
    }

    fn aggregate(&self, contribution: StateContribution) -> StateValue {
        match contribution {
            StateContribution::ModelTransform(local) => {
                let parent = match self.top(StateKind::ModelTransform) {
                    Some(StateValue::Transform(t)) => t.matrix,
                    _ => Mat4::IDENTITY,
                };
                StateValue::Transform(TransformState::new(parent * local))
            }
            StateContribution::ViewTransform(m) | StateContribution::ProjTransform(m) => {
                StateValue::Transform(TransformState::new(m))
            }
            StateContribution::Material(m) => StateValue::Material(m),
            StateContribution::Lights(own) => match self.top(StateKind::Lights) {
                Some(StateValue::Lights(outer)) => StateValue::Lights(outer.accumulate(&own)),
                _ => StateValue::Lights(own),
            },
            StateContribution::Texture(own) => match self.top(StateKind::Texture) {
                Some(StateValue::Texture(outer)) => {
                    let mut layers = outer.clone();
                    layers.extend(own);
                    StateValue::Texture(layers)
                }
                _ => StateValue::Texture(own),
            },
            StateContribution::Clips(own) => {
                let mut planes = match self.top(StateKind::Clips) {
                    Some(StateValue::Clips(outer)) => outer.planes.clone(),
                    _ => Vec::new(),
                };
                planes.extend(own);
                StateValue::Clips(ClipState { planes })
            }
            StateContribution::ColorTransform(c) => StateValue::ColorTransform(c),
            StateContribution::Morph { data, factor } => StateValue::Morph { data, factor },
            StateContribution::Flags(o) => {
                let base = match self.top(StateKind::Flags) {
                    Some(StateValue::Flags(outer)) => *outer,
                    _ => FlagsState::default(),
                };
                StateValue::Flags(o.apply(&base))
            }
            StateContribution::Layer(l) => StateValue::Layer(l),
            StateContribution::Tag(tag) => StateValue::Tag(TagState { tag: Some(tag) }),
            StateContribution::Name(name) => StateValue::Name(NameState { name: Some(name) }),
            StateContribution::Shader(code) => StateValue::Shader(ShaderState { code: Some(code) }),
            StateContribution::ShaderParams(own) => {
                let merged = match self.top(StateKind::ShaderParams) {
                    Some(StateValue::ShaderParams(outer)) => outer.merge(&own),
                    _ => ShaderParamsState { params: own },
                };
                StateValue::ShaderParams(merged)
            }
            StateContribution::FrameBuf { width, height } => StateValue::FrameBuf { width, height },
            StateContribution::Renderer(o) => {
                let base = match self.top(StateKind::Renderer) {
                    Some(StateValue::Renderer(outer)) => *outer,
                    _ => RendererState::default(),
                };
                StateValue::Renderer(o.apply(&base))
            }
            StateContribution::RenderListeners(own) => {
                let mut listeners = match self.top(StateKind::RenderListeners) {
                    Some(StateValue::RenderListeners(outer)) => outer.listeners.clone(),
                    _ => Vec::new(),
                };
                listeners.extend(own);
                StateValue::RenderListeners(RenderListenersState { listeners })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Light;
    use glam::Vec3;

    fn node(index: u32) -> NodeId {
        NodeId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn test_model_transforms_compose_down_the_stack() {
        let mut stacks = StateStacks::new();
        stacks.push(
            node(1),
            1,
            StateContribution::ModelTransform(Mat4::from_translation(Vec3::X)),
        );
        stacks.push(
            node(2),
            1,
            StateContribution::ModelTransform(Mat4::from_translation(Vec3::Y)),
        );

        match stacks.top(StateKind::ModelTransform) {
            Some(StateValue::Transform(t)) => {
                assert_eq!(t.matrix.w_axis.truncate(), Vec3::new(1.0, 1.0, 0.0));
            }
            other => panic!("unexpected top {other:?}"),
        }

        stacks.pop(StateKind::ModelTransform);
        match stacks.top(StateKind::ModelTransform) {
            Some(StateValue::Transform(t)) => assert_eq!(t.matrix.w_axis.truncate(), Vec3::X),
            other => panic!("unexpected top {other:?}"),
        }
    }

    #[test]
    fn test_lights_accumulate_and_revision_tracks_outer_changes() {
        let mut stacks = StateStacks::new();
        let lights = |n: usize| LightsState {
            ambient: Vec3::splat(0.1),
            lights: vec![Light::directional(Vec3::NEG_Z); n],
        };
        stacks.push(node(1), 9, StateContribution::Lights(lights(1)));
        stacks.push(node(2), 3, StateContribution::Lights(lights(2)));

        let exported = stacks.marshal();
        let lights_export = exported
            .iter()
            .find(|e| e.kind == StateKind::Lights)
            .expect("lights exported");
        let (source, value) = lights_export.top.clone().expect("lights in scope");
        assert_eq!(source.node, node(2));
        assert_eq!(source.revision, 9);
        match value {
            StateValue::Lights(l) => {
                assert_eq!(l.lights.len(), 3);
                assert_eq!(l.ambient, Vec3::splat(0.2));
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_marshal_exports_only_dirty_kinds() {
        let mut stacks = StateStacks::new();
        let first = stacks.marshal();
        assert_eq!(first.len(), StateKind::COUNT - 1);
        assert!(first.iter().all(|e| e.top.is_none()));

        stacks.push(
            node(1),
            1,
            StateContribution::Material(MaterialState::default()),
        );
        let second = stacks.marshal();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind, StateKind::Material);

        assert!(stacks.marshal().is_empty());

        stacks.pop(StateKind::Material);
        let popped = stacks.marshal();
        assert_eq!(popped.len(), 1);
        assert!(popped[0].top.is_none());
    }

    #[test]
    fn test_flags_merge_field_wise() {
        let mut stacks = StateStacks::new();
        stacks.push(
            node(1),
            1,
            StateContribution::Flags(FlagsOverride {
                picking: Some(false),
                ..Default::default()
            }),
        );
        stacks.push(
            node(2),
            1,
            StateContribution::Flags(FlagsOverride {
                transparent: Some(true),
                ..Default::default()
            }),
        );
        match stacks.top(StateKind::Flags) {
            Some(StateValue::Flags(f)) => {
                assert!(!f.picking);
                assert!(f.transparent);
            }
            other => panic!("unexpected top {other:?}"),
        }
    }
}
