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

//! Notifications emitted by the sandbox scheduler.
//!
//! The [`EventBus`] is a generic bounded channel; [`SandboxEvent`] is the
//! vocabulary the scheduler publishes on it. Consumers (inspectors, loggers,
//! tests) drain the bus at their own pace.

mod bus;

pub use self::bus::EventBus;

use crate::identity::SenderTag;
use std::fmt;
use std::time::Duration;

/// Classification of a fault captured at the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The callback returned an error.
    Error,
    /// The callback panicked.
    Panic,
    /// The callback ran out of a resource (allocation failure, capacity overflow).
    ResourceExhausted,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Error => f.write_str("error"),
            FaultKind::Panic => f.write_str("panic"),
            FaultKind::ResourceExhausted => f.write_str("resource exhaustion"),
        }
    }
}

/// Why the registry was emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// A caller asked for it.
    Requested,
    /// A composed pass faulted.
    Fault,
}

/// A notification published by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxEvent {
    /// The driver entered or left the running state.
    StateChanged {
        /// The new state.
        running: bool,
    },
    /// The health tracker closed a window or was flushed.
    AverageTickUpdated {
        /// Mean tick interval over the window.
        average: Duration,
        /// Longest tick interval seen in the window.
        peak: Duration,
        /// Number of ticks in the window.
        samples: u32,
    },
    /// A tick that started with a non-empty registry has finished.
    Stepped {
        /// Whether the throttle gate let a pass run.
        executed: bool,
    },
    /// An isolated callback faulted and was removed.
    CallbackFaulted {
        /// Position the callback held when it faulted.
        index: usize,
        /// The callback's name.
        callback: String,
        /// The subscription's sender tag.
        sender: SenderTag,
        /// The fault classification.
        kind: FaultKind,
        /// The error or panic message.
        message: String,
    },
    /// Every subscription was removed at once.
    RegistryCleared {
        /// Number of subscriptions removed.
        removed: usize,
        /// What triggered the clear.
        reason: ClearReason,
    },
    /// The validity sweeper evicted subscriptions with dead anchors.
    SubscriptionsSwept {
        /// Number of subscriptions removed.
        removed: usize,
    },
}
