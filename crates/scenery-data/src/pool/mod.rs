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

//! Reference-counted, generation-checked storage for state handles.
//!
//! A [`HandlePool`] is the only place a state handle's reference count can
//! change. Draw-list entries hold [`StateHandle`] values, which are plain
//! `Copy` indices; they [`acquire`](HandlePool::acquire) on bind and
//! [`release`](HandlePool::release) on unbind. When the count of a slot falls
//! to zero the slot is evicted, its generation is bumped and every handle
//! still pointing at it stops resolving.

mod handle_pool;

pub use self::handle_pool::{HandlePool, StateHandle, StateKey};
