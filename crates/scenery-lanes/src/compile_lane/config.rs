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

//! The table mapping node mutations to compile levels.

use ahash::{AHashMap, AHashSet};
use scenery_core::scene::{CompileLevel, NodeKind, NodeOp};
use scenery_core::CompileRule;

#[derive(Debug, Clone, Default)]
struct AttrRules {
    level: Option<CompileLevel>,
    by_sub_attr: AHashMap<String, CompileLevel>,
}

#[derive(Debug, Clone, Default)]
struct OpRules {
    level: Option<CompileLevel>,
    by_attr: AHashMap<String, AttrRules>,
}

#[derive(Debug, Clone, Default)]
struct KindRules {
    level: Option<CompileLevel>,
    by_op: AHashMap<NodeOp, OpRules>,
}

/// Resolves the compile level required by a node mutation.
///
/// Lookups fall back from the most to the least specific entry:
/// `(kind, op, attr, sub_attr)`, `(kind, op, attr)`, `(kind, op)`, `(kind)`
/// and finally [`CompileLevel::CompileScene`]. Operation entries of the base
/// kind are copied into every derived kind and win over the derived kind's
/// own entries for the same key. Override rules go through the same merge.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    // Entries as declared, before the base-kind merge.
    declared: AHashMap<NodeKind, KindRules>,
    kinds: AHashMap<NodeKind, KindRules>,
    always_compile: AHashSet<NodeKind>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfigBuilder::with_defaults().build()
    }
}

impl CompileConfig {
    /// Starts an empty table.
    pub fn builder() -> CompileConfigBuilder {
        CompileConfigBuilder::default()
    }

    /// The default table with `rules` layered on top.
    pub fn with_rules(rules: &[CompileRule]) -> Self {
        let mut config = Self::default();
        for rule in rules {
            config.apply_rule(rule);
        }
        config
    }

    /// Resolves the level of one mutation.
    ///
    /// Unconfigured combinations resolve to [`CompileLevel::CompileScene`].
    pub fn level(
        &self,
        kind: NodeKind,
        op: NodeOp,
        attr: Option<&str>,
        sub_attr: Option<&str>,
    ) -> CompileLevel {
        if let Some(level) = self.lookup(kind, op, attr, sub_attr) {
            return level;
        }
        log::warn!(
            "No compile level configured for {kind} {op:?} {}{}; compiling the whole scene",
            attr.unwrap_or("-"),
            sub_attr.map(|s| format!(".{s}")).unwrap_or_default(),
        );
        CompileLevel::CompileScene
    }

    fn lookup(
        &self,
        kind: NodeKind,
        op: NodeOp,
        attr: Option<&str>,
        sub_attr: Option<&str>,
    ) -> Option<CompileLevel> {
        let rules = self.kinds.get(&kind)?;
        if let Some(op_rules) = rules.by_op.get(&op) {
            if let Some(attr_rules) = attr.and_then(|a| op_rules.by_attr.get(a)) {
                if let Some(level) = sub_attr.and_then(|s| attr_rules.by_sub_attr.get(s)) {
                    return Some(*level);
                }
                if attr_rules.level.is_some() {
                    return attr_rules.level;
                }
            }
            if op_rules.level.is_some() {
                return op_rules.level;
            }
        }
        rules.level
    }

    /// Whether nodes of `kind` are visited on every pass.
    pub fn always_compile(&self, kind: NodeKind) -> bool {
        self.always_compile.contains(&kind)
    }

    /// Applies one override rule.
    pub fn apply_rule(&mut self, rule: &CompileRule) {
        if let Some(always) = rule.always_compile {
            if always {
                self.always_compile.insert(rule.kind);
            } else {
                self.always_compile.remove(&rule.kind);
            }
        }
        let Some(level) = rule.level else {
            return;
        };
        set_level(
            self.declared.entry(rule.kind).or_default(),
            rule.op,
            rule.attr.as_deref(),
            rule.sub_attr.as_deref(),
            level,
        );
        self.kinds = merge_base_rules(&self.declared);
    }
}

/// Copies the operation entries of the base kind into every derived kind.
fn merge_base_rules(declared: &AHashMap<NodeKind, KindRules>) -> AHashMap<NodeKind, KindRules> {
    let mut kinds = declared.clone();
    let base_rules = declared.get(&NodeKind::Node).cloned().unwrap_or_default();
    for kind in NodeKind::ALL {
        if kind.base().is_none() {
            continue;
        }
        let rules = kinds.entry(kind).or_default();
        for (op, op_rules) in &base_rules.by_op {
            rules.by_op.insert(*op, op_rules.clone());
        }
    }
    kinds
}

fn set_level(
    rules: &mut KindRules,
    op: Option<NodeOp>,
    attr: Option<&str>,
    sub_attr: Option<&str>,
    level: CompileLevel,
) {
    let Some(op) = op else {
        rules.level = Some(level);
        return;
    };
    let op_rules = rules.by_op.entry(op).or_default();
    let Some(attr) = attr else {
        op_rules.level = Some(level);
        return;
    };
    let attr_rules = op_rules.by_attr.entry(attr.to_string()).or_default();
    match sub_attr {
        Some(sub) => {
            attr_rules.by_sub_attr.insert(sub.to_string(), level);
        }
        None => attr_rules.level = Some(level),
    }
}

/// Accumulates rules, then merges base-kind entries into every kind.
#[derive(Debug, Default)]
pub struct CompileConfigBuilder {
    kinds: AHashMap<NodeKind, KindRules>,
    always_compile: AHashSet<NodeKind>,
}

impl CompileConfigBuilder {
    /// Sets the level of `(kind)`.
    pub fn kind(mut self, kind: NodeKind, level: CompileLevel) -> Self {
        set_level(self.kinds.entry(kind).or_default(), None, None, None, level);
        self
    }

    /// Sets the level of `(kind, op)`.
    pub fn op(mut self, kind: NodeKind, op: NodeOp, level: CompileLevel) -> Self {
        set_level(self.kinds.entry(kind).or_default(), Some(op), None, None, level);
        self
    }

    /// Sets the level of `(kind, op, attr)`.
    pub fn attr(mut self, kind: NodeKind, op: NodeOp, attr: &str, level: CompileLevel) -> Self {
        set_level(
            self.kinds.entry(kind).or_default(),
            Some(op),
            Some(attr),
            None,
            level,
        );
        self
    }

    /// Sets the level of `(kind, op, attr, sub_attr)`.
    pub fn sub_attr(
        mut self,
        kind: NodeKind,
        op: NodeOp,
        attr: &str,
        sub_attr: &str,
        level: CompileLevel,
    ) -> Self {
        set_level(
            self.kinds.entry(kind).or_default(),
            Some(op),
            Some(attr),
            Some(sub_attr),
            level,
        );
        self
    }

    /// Marks `kind` as visited on every pass.
    pub fn always_compile(mut self, kind: NodeKind) -> Self {
        self.always_compile.insert(kind);
        self
    }

    /// The built-in table.
    pub fn with_defaults() -> Self {
        use CompileLevel::*;
        use NodeKind as K;
        use NodeOp::*;

        let mut builder = Self::default()
            .op(K::Node, Add, CompileBranch)
            .op(K::Node, Remove, Redraw)
            .op(K::Node, Create, Nothing)
            .op(K::Node, Destroy, Nothing)
            .op(K::Node, Loaded, CompileBranch);

        for kind in [K::Translate, K::Rotate, K::Scale, K::Matrix, K::LookAt, K::Camera] {
            builder = builder.op(kind, Set, CompileBranch);
        }

        builder
            .op(K::Scene, Set, CompileScene)
            .op(K::Lights, Set, CompileBranch)
            .attr(K::Lights, Set, "lights", CompileScene)
            .attr(K::Lights, Set, "mode", CompileScene)
            .attr(K::Lights, Set, "diffuse", CompileScene)
            .attr(K::Lights, Set, "specular", CompileScene)
            .op(K::Material, Set, Redraw)
            .op(K::Texture, Set, CompileBranch)
            .attr(K::Texture, Set, "layers", CompileScene)
            .attr(K::Texture, Set, "blendFactor", Redraw)
            .attr(K::Texture, Set, "translate", Redraw)
            .attr(K::Texture, Set, "rotate", Redraw)
            .attr(K::Texture, Set, "scale", Redraw)
            .op(K::Clips, Set, CompileBranch)
            .attr(K::Clips, Set, "clips", CompileScene)
            .op(K::ColorTransform, Set, Redraw)
            .op(K::Morph, Set, CompileScene)
            .attr(K::Morph, Set, "factor", Redraw)
            .op(K::Flags, Set, CompileBranch)
            .op(K::Layer, Set, CompileBranch)
            .attr(K::Layer, Set, "priority", Resort)
            .op(K::Tag, Set, CompileBranch)
            .op(K::Name, Set, CompilePath)
            .attr(K::Name, Set, "name", Redraw)
            .op(K::Shader, Set, CompileScene)
            .op(K::ShaderParams, Set, Redraw)
            .op(K::FrameBuf, Set, CompileScene)
            .op(K::Renderer, Set, Redraw)
            .attr(K::Renderer, Set, "pointSize", CompileScene)
            .op(K::RenderListeners, Set, CompileBranch)
            .op(K::Geometry, Set, CompileScene)
    }

    /// Merges base-kind entries and freezes the table.
    pub fn build(self) -> CompileConfig {
        CompileConfig {
            kinds: merge_base_rules(&self.kinds),
            declared: self.kinds,
            always_compile: self.always_compile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_goes_from_sub_attr_to_kind() {
        let config = CompileConfig::builder()
            .kind(NodeKind::Material, CompileLevel::CompilePath)
            .op(NodeKind::Material, NodeOp::Set, CompileLevel::Redraw)
            .attr(NodeKind::Material, NodeOp::Set, "alpha", CompileLevel::CompileBranch)
            .sub_attr(
                NodeKind::Material,
                NodeOp::Set,
                "alpha",
                "fade",
                CompileLevel::Resort,
            )
            .build();

        let level = |op, attr, sub| config.level(NodeKind::Material, op, attr, sub);
        assert_eq!(level(NodeOp::Set, Some("alpha"), Some("fade")), CompileLevel::Resort);
        assert_eq!(level(NodeOp::Set, Some("alpha"), Some("x")), CompileLevel::CompileBranch);
        assert_eq!(level(NodeOp::Set, Some("emit"), None), CompileLevel::Redraw);
        assert_eq!(level(NodeOp::Loaded, None, None), CompileLevel::CompilePath);
    }

    #[test]
    fn test_unconfigured_kind_compiles_the_scene() {
        let config = CompileConfig::builder().build();
        assert_eq!(
            config.level(NodeKind::Texture, NodeOp::Set, Some("x"), None),
            CompileLevel::CompileScene
        );
    }

    #[test]
    fn test_base_kind_entries_win_over_derived_ones() {
        let config = CompileConfig::builder()
            .op(NodeKind::Node, NodeOp::Add, CompileLevel::CompileBranch)
            .op(NodeKind::Material, NodeOp::Add, CompileLevel::Nothing)
            .build();
        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Add, None, None),
            CompileLevel::CompileBranch
        );
        assert_eq!(
            config.level(NodeKind::Geometry, NodeOp::Add, None, None),
            CompileLevel::CompileBranch
        );
    }

    #[test]
    fn test_default_table_matches_redraw_and_resort_cases() {
        let config = CompileConfig::default();
        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Set, Some("baseColor"), None),
            CompileLevel::Redraw
        );
        assert_eq!(
            config.level(NodeKind::Layer, NodeOp::Set, Some("priority"), None),
            CompileLevel::Resort
        );
        assert_eq!(
            config.level(NodeKind::Lights, NodeOp::Set, Some("mode"), Some("0")),
            CompileLevel::CompileScene
        );
        assert_eq!(
            config.level(NodeKind::Lights, NodeOp::Set, Some("color"), Some("0")),
            CompileLevel::CompileBranch
        );
    }

    #[test]
    fn test_rules_override_defaults_and_toggle_always_compile() {
        let config = CompileConfig::with_rules(&[
            CompileRule {
                kind: NodeKind::Material,
                op: Some(NodeOp::Set),
                attr: Some("baseColor".into()),
                sub_attr: None,
                level: Some(CompileLevel::CompileScene),
                always_compile: None,
            },
            CompileRule {
                kind: NodeKind::Name,
                op: None,
                attr: None,
                sub_attr: None,
                level: None,
                always_compile: Some(true),
            },
        ]);
        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Set, Some("baseColor"), None),
            CompileLevel::CompileScene
        );
        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Set, Some("alpha"), None),
            CompileLevel::Redraw
        );
        assert!(config.always_compile(NodeKind::Name));
        assert!(!config.always_compile(NodeKind::Material));
    }

    #[test]
    fn test_base_kind_rules_from_settings_reach_derived_kinds() {
        let rule = |kind, level| CompileRule {
            kind,
            op: Some(NodeOp::Add),
            attr: None,
            sub_attr: None,
            level: Some(level),
            always_compile: None,
        };
        let config = CompileConfig::with_rules(&[
            rule(NodeKind::Node, CompileLevel::CompileScene),
            rule(NodeKind::Geometry, CompileLevel::Nothing),
        ]);

        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Add, None, None),
            CompileLevel::CompileScene
        );
        assert_eq!(
            config.level(NodeKind::Geometry, NodeOp::Add, None, None),
            CompileLevel::CompileScene,
            "The base-kind entry wins over the derived one"
        );
        // entries of other operations are untouched
        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Remove, None, None),
            CompileLevel::Redraw
        );
        assert_eq!(
            config.level(NodeKind::Material, NodeOp::Set, None, None),
            CompileLevel::Redraw
        );
    }
}
