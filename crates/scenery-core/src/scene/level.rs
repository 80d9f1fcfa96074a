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

use serde::{Deserialize, Serialize};

/// Granularity of the re-traversal required after a node mutation.
///
/// Variants are declared from most to least expensive, so the derived `Ord`
/// makes "lower" mean "more general": `CompileScene < CompileBranch < ... <
/// Nothing`. A recorded level for a node only ever moves downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileLevel {
    /// Recompile the whole scene.
    CompileScene,
    /// Recompile the node, its whole subtree and its path to the root.
    CompileBranch,
    /// Recompile the path from the node to the root.
    CompilePath,
    /// Re-sort the draw list.
    Resort,
    /// Replay the cached draw list.
    Redraw,
    /// No visible effect.
    Nothing,
}

/// What a compile pass decided to do for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassLevel {
    /// Full traversal; every draw-list entry is rebuilt.
    Everything,
    /// Traversal pruned to dirty paths and branches.
    Partial,
    /// No traversal, replay only.
    Redraw,
    /// Nothing to do this frame.
    Nothing,
}

impl PassLevel {
    /// Whether this pass traverses the scene tree at all.
    pub fn traverses(&self) -> bool {
        matches!(self, PassLevel::Everything | PassLevel::Partial)
    }

    /// Whether this pass produces a new image.
    pub fn renders(&self) -> bool {
        !matches!(self, PassLevel::Nothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_from_most_to_least_expensive() {
        assert!(CompileLevel::CompileScene < CompileLevel::CompileBranch);
        assert!(CompileLevel::CompileBranch < CompileLevel::CompilePath);
        assert!(CompileLevel::CompilePath < CompileLevel::Resort);
        assert!(CompileLevel::Resort < CompileLevel::Redraw);
        assert!(CompileLevel::Redraw < CompileLevel::Nothing);
    }

    #[test]
    fn test_pass_levels_report_traversal_and_rendering() {
        assert!(PassLevel::Everything.traverses());
        assert!(PassLevel::Partial.traverses());
        assert!(!PassLevel::Redraw.traverses());
        assert!(PassLevel::Redraw.renders());
        assert!(!PassLevel::Nothing.renders());
    }
}
