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

//! Reference-counted programs keyed by state signature.

use super::composer::{compose_draw, compose_pick};
use super::signature::StateSignature;
use crate::error::{RenderError, RenderResult};
use ahash::{AHashMap, AHashSet};
use scenery_core::renderer::{GpuDevice, ProgramId};
use std::sync::Arc;

/// Dense id of a cached program, used as a sort criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey(pub u32);

/// A compiled shading program and its pick companion.
#[derive(Debug)]
pub struct Program {
    /// Dense id.
    pub key: ProgramKey,
    /// The signature both programs were composed from.
    pub signature: Arc<StateSignature>,
    /// Program used by the draw pass.
    pub draw: ProgramId,
    /// Program used by both pick passes.
    pub pick: ProgramId,
    ref_count: u32,
}

impl Program {
    /// Number of draw-list entries using the program.
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

/// Programs shared by every entry with an equal signature.
///
/// Releasing the last reference does not destroy a program; unreferenced
/// programs are destroyed by [`collect_garbage`](Self::collect_garbage) at
/// the end of a compile pass, so a program released and re-requested within
/// one pass survives.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: AHashMap<ProgramKey, Program>,
    by_signature: AHashMap<String, ProgramKey>,
    failed: AHashSet<String>,
    next_key: u32,
}

impl ProgramCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the program for `signature`, composing and compiling it on a
    /// miss, and takes one reference.
    ///
    /// A signature that failed once is not recompiled until
    /// [`forget_failures`](Self::forget_failures) is called.
    pub fn get_program(
        &mut self,
        device: &mut dyn GpuDevice,
        signature: &Arc<StateSignature>,
    ) -> RenderResult<ProgramKey> {
        let hash = signature.key();
        if let Some(key) = self.by_signature.get(&hash) {
            if let Some(program) = self.programs.get_mut(key) {
                program.ref_count += 1;
                return Ok(*key);
            }
        }
        if self.failed.contains(&hash) {
            return Err(RenderError::Unrenderable { signature: hash });
        }

        let draw_source = compose_draw(signature);
        let draw = match device.create_program(&hash, &draw_source.vertex, &draw_source.fragment)
        {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to build program: {e}");
                self.failed.insert(hash);
                return Err(e.into());
            }
        };
        let pick_source = compose_pick(signature);
        let pick_label = format!("{hash} (pick)");
        let pick =
            match device.create_program(&pick_label, &pick_source.vertex, &pick_source.fragment) {
                Ok(id) => id,
                Err(e) => {
                    log::error!("Failed to build pick program: {e}");
                    if let Err(e) = device.destroy_program(draw) {
                        log::warn!("Failed to destroy orphaned program {draw:?}: {e}");
                    }
                    self.failed.insert(hash);
                    return Err(e.into());
                }
            };

        let key = ProgramKey(self.next_key);
        self.next_key += 1;
        log::debug!("Built program {key:?} for signature '{hash}'");
        self.programs.insert(
            key,
            Program {
                key,
                signature: signature.clone(),
                draw,
                pick,
                ref_count: 1,
            },
        );
        self.by_signature.insert(hash, key);
        Ok(key)
    }

    /// Drops one reference to a program.
    pub fn release_program(&mut self, key: ProgramKey) {
        match self.programs.get_mut(&key) {
            Some(program) if program.ref_count > 0 => program.ref_count -= 1,
            Some(_) => log::warn!("Program {key:?} released more often than acquired"),
            None => log::warn!("Released unknown program {key:?}"),
        }
    }

    /// Destroys every program with no references left. Returns how many.
    pub fn collect_garbage(&mut self, device: &mut dyn GpuDevice) -> usize {
        let dead: Vec<ProgramKey> = self
            .programs
            .values()
            .filter(|p| p.ref_count == 0)
            .map(|p| p.key)
            .collect();
        for key in &dead {
            if let Some(program) = self.programs.remove(key) {
                self.by_signature.retain(|_, k| k != key);
                Self::destroy(device, &program);
            }
        }
        if !dead.is_empty() {
            log::debug!("Collected {} unreferenced programs", dead.len());
        }
        dead.len()
    }

    /// Allows previously failed signatures to be compiled again.
    pub fn forget_failures(&mut self) {
        self.failed.clear();
    }

    /// Looks a program up.
    pub fn get(&self, key: ProgramKey) -> Option<&Program> {
        self.programs.get(&key)
    }

    /// Number of live programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the cache holds no programs.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Destroys every program regardless of references.
    pub fn clear(&mut self, device: &mut dyn GpuDevice) {
        for (_, program) in self.programs.drain() {
            Self::destroy(device, &program);
        }
        self.by_signature.clear();
        self.failed.clear();
    }

    fn destroy(device: &mut dyn GpuDevice, program: &Program) {
        for id in [program.draw, program.pick] {
            if let Err(e) = device.destroy_program(id) {
                log::warn!("Failed to destroy program {id:?}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingDevice;

    fn signature(canvas: &str) -> Arc<StateSignature> {
        Arc::new(StateSignature::new(canvas))
    }

    #[test]
    fn test_equal_signatures_share_one_program() {
        let mut device = RecordingDevice::new();
        let mut cache = ProgramCache::new();
        let a = cache.get_program(&mut device, &signature("c")).unwrap();
        let b = cache.get_program(&mut device, &signature("c")).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.get(a).unwrap().ref_count(), 2);
        // draw + pick
        assert_eq!(device.live_programs(), 2);
    }

    #[test]
    fn test_released_programs_survive_until_collected() {
        let mut device = RecordingDevice::new();
        let mut cache = ProgramCache::new();
        let key = cache.get_program(&mut device, &signature("c")).unwrap();
        cache.release_program(key);
        assert_eq!(cache.len(), 1);

        let again = cache.get_program(&mut device, &signature("c")).unwrap();
        assert_eq!(again, key);
        assert_eq!(device.programs_created, 2);

        cache.release_program(key);
        assert_eq!(cache.collect_garbage(&mut device), 1);
        assert!(cache.is_empty());
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_failed_signatures_are_not_retried() {
        let mut device = RecordingDevice::new();
        device.fail_on = Some("broken".into());
        let mut cache = ProgramCache::new();

        let first = cache.get_program(&mut device, &signature("broken"));
        assert!(matches!(first, Err(RenderError::Shader(_))));
        let second = cache.get_program(&mut device, &signature("broken"));
        assert!(matches!(second, Err(RenderError::Unrenderable { .. })));

        device.fail_on = None;
        cache.forget_failures();
        assert!(cache.get_program(&mut device, &signature("broken")).is_ok());
    }

    #[test]
    fn test_distinct_signatures_get_distinct_keys() {
        let mut device = RecordingDevice::new();
        let mut cache = ProgramCache::new();
        let a = cache.get_program(&mut device, &signature("a")).unwrap();
        let b = cache.get_program(&mut device, &signature("b")).unwrap();
        assert_ne!(a, b);
        cache.clear(&mut device);
        assert_eq!(device.live_programs(), 0);
    }
}
