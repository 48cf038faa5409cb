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

//! # Sandbox Runtime
//!
//! The scheduler itself. A [`Sandbox`] keeps an ordered list of callback
//! subscriptions, invokes them once per host tick while running, and keeps
//! going when one of them fails.
//!
//! - [`registry`]: ordered subscriptions with identity-based deduplication.
//! - [`sweeper`]: evicts subscriptions whose anchor has died.
//! - [`fault`]: fault boundaries around user code.
//! - [`driver`]: the lifecycle, throttling and the per-tick pass.
//! - [`settings`]: persisted preferences.
//! - [`diagnostics`]: read-only snapshots for tooling.

#![warn(missing_docs)]

pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod fault;
pub mod registry;
pub mod settings;
pub mod sweeper;
pub mod throttle;
pub mod ticker;

pub use diagnostics::{AnchorInfo, SubscriptionInfo};
pub use driver::{DriverState, Sandbox};
pub use error::{RegistrationError, SettingsError};
pub use fault::{Fault, Outcome};
pub use registry::{CallbackRegistry, Registration, Subscription};
pub use settings::{SandboxSettings, ThrottleMode};
pub use throttle::ThrottleGate;
pub use ticker::ManualTicker;
