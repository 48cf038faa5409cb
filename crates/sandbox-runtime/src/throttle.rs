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

//! Minimum-interval gate between passes.

use std::time::Duration;

/// Accumulates elapsed time and opens once a threshold is reached.
///
/// Opening resets the accumulator to zero, not to the overshoot, and skipped
/// intervals are never made up with extra passes.
#[derive(Debug, Default, Clone)]
pub struct ThrottleGate {
    accumulated: Duration,
}

impl ThrottleGate {
    /// Adds elapsed time. Returns the new accumulated total.
    pub fn absorb(&mut self, elapsed: Duration) -> Duration {
        self.accumulated += elapsed;
        self.accumulated
    }

    /// Decides whether a pass may run.
    ///
    /// `None` means unthrottled: always open, and the accumulator is cleared
    /// so switching to a throttled mode starts from zero.
    pub fn try_open(&mut self, threshold: Option<Duration>) -> bool {
        match threshold {
            None => {
                self.accumulated = Duration::ZERO;
                true
            }
            Some(threshold) if self.accumulated >= threshold => {
                self.accumulated = Duration::ZERO;
                true
            }
            Some(_) => false,
        }
    }

    /// Time accumulated since the gate last opened.
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Drops any accumulated time.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }
}
