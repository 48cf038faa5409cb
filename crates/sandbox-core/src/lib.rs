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

//! # Sandbox Core
//!
//! Foundational crate containing the handles and contracts shared by the
//! sandbox scheduler: callable handles, weak anchors with liveness checks,
//! identity keys, the host tick-source contract and the event bus.
//!
//! Nothing in here knows about scheduling policy. The runtime crate builds the
//! registry and the cycle driver on top of these types.

#![warn(missing_docs)]

pub mod anchor;
pub mod callback;
pub mod event;
pub mod identity;
pub mod tick;
pub mod utils;

pub use anchor::{Anchor, AnchorId, Liveness};
pub use callback::{Callback, CallbackId, CallbackResult};
pub use event::{ClearReason, EventBus, FaultKind, SandboxEvent};
pub use identity::{IdentityKey, SenderTag};
pub use tick::{TickHook, TickHookId, TickSource};
pub use utils::clock::{Clock, ManualClock, SystemClock};
