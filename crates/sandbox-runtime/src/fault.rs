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

//! Call-boundary fault capture.
//!
//! Every invocation is turned into an [`Outcome`] value. Returned errors and
//! unwinding panics both become [`Fault`]s; containment decisions are taken on
//! that value by the driver.
//!
//! Stack overflow and out-of-memory abort a Rust process outright and never
//! reach this boundary. The [`FaultKind::ResourceExhausted`] label only covers
//! what does unwind: `try_reserve` failures and capacity-overflow panics.

use sandbox_core::{Callback, FaultKind};
use std::any::Any;
use std::cell::Cell;
use std::collections::TryReserveError;
use std::panic::{self, AssertUnwindSafe};

const EXHAUSTION_MARKERS: [&str; 3] = ["capacity overflow", "memory allocation", "out of memory"];

/// A captured fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Classification.
    pub kind: FaultKind,
    /// The error or panic message.
    pub message: String,
    /// Name of the callback that faulted.
    pub callback: String,
}

/// The result of invoking a callback or a composed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every procedure ran to completion.
    Completed,
    /// A procedure faulted; the invocation stopped there.
    Faulted(Fault),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Faulted`].
    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Faulted(_))
    }
}

/// Invokes one callback behind a fault boundary.
pub fn invoke_guarded(callback: &Callback) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| callback.invoke())) {
        Ok(Ok(())) => Outcome::Completed,
        Ok(Err(error)) => Outcome::Faulted(from_error(callback.name(), &error)),
        Err(payload) => Outcome::Faulted(from_panic(callback.name(), payload)),
    }
}

/// Invokes `unit` in order as a single all-or-nothing call.
///
/// The first fault aborts the remaining callbacks.
pub fn invoke_composed(unit: &[Callback]) -> Outcome {
    let current = Cell::new(0_usize);
    let result = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<()> {
        for (index, callback) in unit.iter().enumerate() {
            current.set(index);
            callback.invoke()?;
        }
        Ok(())
    }));

    let origin = unit.get(current.get()).map_or("", |callback| callback.name());
    match result {
        Ok(Ok(())) => Outcome::Completed,
        Ok(Err(error)) => Outcome::Faulted(from_error(origin, &error)),
        Err(payload) => Outcome::Faulted(from_panic(origin, payload)),
    }
}

fn from_error(callback: &str, error: &anyhow::Error) -> Fault {
    let exhausted = error
        .chain()
        .any(|cause| cause.downcast_ref::<TryReserveError>().is_some());
    Fault {
        kind: if exhausted {
            FaultKind::ResourceExhausted
        } else {
            FaultKind::Error
        },
        message: format!("{error:#}"),
        callback: callback.to_owned(),
    }
}

fn from_panic(callback: &str, payload: Box<dyn Any + Send>) -> Fault {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());

    let lowered = message.to_lowercase();
    let exhausted = EXHAUSTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker));

    Fault {
        kind: if exhausted {
            FaultKind::ResourceExhausted
        } else {
            FaultKind::Panic
        },
        message,
        callback: callback.to_owned(),
    }
}
