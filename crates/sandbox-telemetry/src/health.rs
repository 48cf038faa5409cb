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

//! Windowed average of the measured tick interval.
//!
//! The tracker accumulates tick intervals until their sum reaches the
//! configured window, then publishes the mean and starts over. Windows are
//! measured in elapsed time rather than sample count, so the reporting rate
//! stays steady whatever the host's frame rate.

use std::time::Duration;

/// Shortest window the tracker accepts.
pub const MIN_WINDOW: Duration = Duration::from_millis(100);

/// Window used by [`HealthTracker::default`].
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Summary of one closed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    /// Mean tick interval.
    pub average: Duration,
    /// Longest tick interval.
    pub peak: Duration,
    /// Number of ticks that went into the window.
    pub samples: u32,
}

/// Rolling tick-interval average.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    window: Duration,
    ticks: u32,
    elapsed: Duration,
    peak: Duration,
    average: Duration,
    windows_closed: u64,
}

impl HealthTracker {
    /// Creates a tracker. Windows shorter than [`MIN_WINDOW`] are raised to it.
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(MIN_WINDOW),
            ticks: 0,
            elapsed: Duration::ZERO,
            peak: Duration::ZERO,
            average: Duration::ZERO,
            windows_closed: 0,
        }
    }

    /// Records one tick interval.
    ///
    /// ## Returns
    /// The window summary if this tick closed the window.
    pub fn record(&mut self, interval: Duration) -> Option<HealthReport> {
        self.ticks = self.ticks.saturating_add(1);
        self.elapsed += interval;
        self.peak = self.peak.max(interval);

        if self.elapsed >= self.window {
            Some(self.close_window())
        } else {
            None
        }
    }

    /// Closes the current window early.
    ///
    /// Called whenever timing-related configuration changes so the published
    /// average never mixes behaviour from before and after the change.
    ///
    /// ## Returns
    /// `None` if no tick was recorded since the last window closed.
    pub fn flush(&mut self) -> Option<HealthReport> {
        if self.ticks == 0 {
            return None;
        }
        Some(self.close_window())
    }

    /// The most recent average, or zero before the first window closes.
    pub fn average(&self) -> Duration {
        self.average
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Changes the window, clamped to [`MIN_WINDOW`].
    pub fn set_window(&mut self, window: Duration) {
        self.window = window.max(MIN_WINDOW);
    }

    /// Ticks recorded in the open window.
    pub fn pending_ticks(&self) -> u32 {
        self.ticks
    }

    /// Number of windows closed so far, flushes included.
    pub fn windows_closed(&self) -> u64 {
        self.windows_closed
    }

    fn close_window(&mut self) -> HealthReport {
        let report = HealthReport {
            average: self.elapsed / self.ticks,
            peak: self.peak,
            samples: self.ticks,
        };
        self.average = report.average;
        self.ticks = 0;
        self.elapsed = Duration::ZERO;
        self.peak = Duration::ZERO;
        self.windows_closed += 1;

        log::debug!(
            "HealthTracker: average tick {:.3} ms over {} samples (peak {:.3} ms)",
            report.average.as_secs_f64() * 1000.0,
            report.samples,
            report.peak.as_secs_f64() * 1000.0
        );
        report
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
