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

//! Flat storage of per-entry command lists.

use super::command::Command;
use super::RenderMode;
use crate::draw_lane::EntryId;
use std::ops::Range;

#[derive(Debug, Default)]
struct ModeArena {
    version: u64,
    commands: Vec<Command>,
    spans: Vec<Option<Range<usize>>>,
}

/// Command lists of every entry, one arena per render mode.
///
/// Each arena is tagged with the bin version its lists were built against.
/// Storing a list for a newer version drops every list of the older one.
#[derive(Debug, Default)]
pub struct CommandArena {
    modes: [ModeArena; 3],
}

impl CommandArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached list of an entry, if it was built for `version`.
    pub fn get(&self, mode: RenderMode, id: EntryId, version: u64) -> Option<&[Command]> {
        let arena = &self.modes[mode.index()];
        if arena.version != version {
            return None;
        }
        let span = arena.spans.get(id.0 as usize)?.clone()?;
        arena.commands.get(span)
    }

    /// Stores the list of an entry built for `version`.
    pub fn store(&mut self, mode: RenderMode, id: EntryId, version: u64, commands: Vec<Command>) {
        let arena = &mut self.modes[mode.index()];
        if arena.version != version {
            arena.version = version;
            arena.commands.clear();
            arena.spans.clear();
        }
        let index = id.0 as usize;
        if arena.spans.len() <= index {
            arena.spans.resize(index + 1, None);
        }
        let start = arena.commands.len();
        arena.commands.extend(commands);
        arena.spans[index] = Some(start..arena.commands.len());
    }

    /// Drops every list of every mode.
    pub fn clear(&mut self) {
        for arena in &mut self.modes {
            arena.version = 0;
            arena.commands.clear();
            arena.spans.clear();
        }
    }

    /// Number of commands stored for a mode.
    pub fn len(&self, mode: RenderMode) -> usize {
        self.modes[mode.index()].commands.len()
    }
}
