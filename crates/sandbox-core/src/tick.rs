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

//! The contract between the sandbox and the host's per-frame loop.

use std::rc::Rc;

/// A zero-argument hook the host calls once per frame.
pub type TickHook = Rc<dyn Fn()>;

/// Identifies a hook subscribed to a [`TickSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHookId(pub u64);

/// The host's tick source.
///
/// The sandbox subscribes exactly one hook while it is running and removes it
/// when it stops, so a stopped sandbox cannot observe ticks at all.
pub trait TickSource {
    /// Subscribes a hook, returning the id needed to remove it.
    fn subscribe(&self, hook: TickHook) -> TickHookId;

    /// Removes a hook. Returns `false` if the id was not subscribed.
    fn unsubscribe(&self, id: TickHookId) -> bool;
}
