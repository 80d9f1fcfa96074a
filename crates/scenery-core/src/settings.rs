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

//! Engine settings, loadable from RON.

use crate::scene::{CompileLevel, NodeKind, NodeOp};
use serde::{Deserialize, Serialize};

/// Which sort-key formula the bin sorter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// `layer priority * LARGE + program id`.
    Simple,
    /// Dense ranks of layer, program, texture and geometry.
    #[default]
    Ranked,
}

/// One override of the built-in compile configuration table.
///
/// Omitted `op`/`attr`/`sub_attr` make the rule apply at a coarser level of
/// the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileRule {
    /// Node kind the rule applies to.
    pub kind: NodeKind,
    /// Operation, or `None` for a kind-wide default.
    #[serde(default)]
    pub op: Option<NodeOp>,
    /// Attribute name, when the rule is attribute-specific.
    #[serde(default)]
    pub attr: Option<String>,
    /// Sub-attribute name (e.g. one field of a compound attribute).
    #[serde(default)]
    pub sub_attr: Option<String>,
    /// The level to record, if the rule sets one.
    #[serde(default)]
    pub level: Option<CompileLevel>,
    /// Marks every node of `kind` as visited on every pass.
    #[serde(default)]
    pub always_compile: Option<bool>,
}

/// A collection of global settings for one render agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Identity of the canvas; part of every state signature.
    pub canvas_id: String,
    /// The color the draw target is cleared to each frame.
    pub clear_color: [f32; 4],
    /// Sort-key formula for the bin sorter.
    pub sort_policy: SortPolicy,
    /// Overrides layered on the built-in compile configuration table.
    pub compile_rules: Vec<CompileRule>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            canvas_id: "canvas".to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            sort_policy: SortPolicy::Ranked,
            compile_rules: Vec::new(),
        }
    }
}

impl EngineSettings {
    /// Parses settings from RON text. Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ron_struct_yields_defaults() {
        let settings = EngineSettings::from_ron("()").expect("valid RON");
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_compile_rules_parse_from_ron() {
        let text = r#"(
            canvas_id: "main",
            sort_policy: simple,
            compile_rules: [
                (kind: material, op: Some(set), attr: Some("baseColor"), level: Some(compile_scene)),
                (kind: name, always_compile: Some(true)),
            ],
        )"#;
        let settings = EngineSettings::from_ron(text).expect("valid RON");
        assert_eq!(settings.canvas_id, "main");
        assert_eq!(settings.sort_policy, SortPolicy::Simple);
        assert_eq!(settings.compile_rules.len(), 2);
        assert_eq!(settings.compile_rules[0].kind, NodeKind::Material);
        assert_eq!(
            settings.compile_rules[0].level,
            Some(CompileLevel::CompileScene)
        );
        assert_eq!(settings.compile_rules[1].always_compile, Some(true));
    }
}
