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

//! User shader code and the uniforms it consumes.

use scenery_core::renderer::UniformValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Injection points of the vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexHook {
    /// `vec4 f(vec4 modelPos)`
    ModelPos,
    /// `vec4 f(vec4 worldPos)`
    WorldPos,
    /// `vec4 f(vec4 viewPos)`
    ViewPos,
    /// `mat4 f(mat4 viewMatrix)`
    ViewMatrix,
    /// `mat4 f(mat4 projMatrix)`
    ProjMatrix,
}

/// Injection points of the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentHook {
    /// `vec4 f(vec4 worldPos)`
    WorldPos,
    /// `vec4 f(vec4 viewPos)`
    ViewPos,
    /// `vec3 f(vec3 color)`
    MaterialBaseColor,
    /// `float f(float alpha)`
    MaterialAlpha,
    /// `float f(float emit)`
    MaterialEmit,
    /// `float f(float specular)`
    MaterialSpecular,
    /// `vec3 f(vec3 color)`
    MaterialSpecularColor,
    /// `float f(float shine)`
    MaterialShine,
    /// `vec4 f(vec4 color)`
    PixelColor,
}

/// Code spliced into generated programs by a shader node.
///
/// Each stage's `code` is inserted verbatim before `main`; each hook names
/// a function declared in that code which replaces the default expression at
/// its injection point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderCode {
    /// Declarations added to the vertex stage.
    pub vertex_code: String,
    /// Declarations added to the fragment stage.
    pub fragment_code: String,
    /// Vertex hook bindings.
    pub vertex_hooks: BTreeMap<VertexHook, String>,
    /// Fragment hook bindings.
    pub fragment_hooks: BTreeMap<FragmentHook, String>,
}

impl ShaderCode {
    /// Whether the code contributes nothing.
    pub fn is_empty(&self) -> bool {
        self.vertex_code.is_empty()
            && self.fragment_code.is_empty()
            && self.vertex_hooks.is_empty()
            && self.fragment_hooks.is_empty()
    }

    /// A stable digest of the code and hook bindings.
    pub fn digest(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// User shader code in scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderState {
    /// `None` when no shader node is in scope.
    pub code: Option<Arc<ShaderCode>>,
}

/// Uniform values set by shader-params nodes, inner values winning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderParamsState {
    /// Uniform name to value.
    pub params: BTreeMap<String, UniformValue>,
}

impl ShaderParamsState {
    /// Merges `inner` over this set.
    pub fn merge(&self, inner: &BTreeMap<String, UniformValue>) -> ShaderParamsState {
        let mut params = self.params.clone();
        params.extend(inner.iter().map(|(k, v)| (k.clone(), *v)));
        ShaderParamsState { params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_changes_with_hook_bindings() {
        let plain = ShaderCode {
            vertex_code: "vec4 lift(vec4 p) { return p; }".into(),
            ..Default::default()
        };
        let mut hooked = plain.clone();
        hooked.vertex_hooks.insert(VertexHook::WorldPos, "lift".into());

        assert_eq!(plain.digest(), plain.clone().digest());
        assert_ne!(plain.digest(), hooked.digest());
    }

    #[test]
    fn test_inner_params_override_outer() {
        let outer = ShaderParamsState {
            params: BTreeMap::from([
                ("uTime".to_string(), UniformValue::Float(1.0)),
                ("uGain".to_string(), UniformValue::Float(2.0)),
            ]),
        };
        let merged = outer.merge(&BTreeMap::from([(
            "uTime".to_string(),
            UniformValue::Float(5.0),
        )]));
        assert_eq!(merged.params["uTime"], UniformValue::Float(5.0));
        assert_eq!(merged.params["uGain"], UniformValue::Float(2.0));
    }
}
