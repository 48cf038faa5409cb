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

//! Scheduler preferences and their RON persistence.
//!
//! Durations are stored as fractional seconds so the files stay easy to edit
//! by hand:
//!
//! ```ron
//! (
//!     throttle: MinimumInterval,
//!     custom_min_step: 0.25,
//!     fixed_step: 0.02,
//!     health_window: 10.0,
//!     auto_clean: true,
//!     isolate_faults: true,
//!     auto_launch: true,
//!     resume_running: false,
//! )
//! ```

use crate::error::SettingsError;
use sandbox_telemetry::health::MIN_WINDOW;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How often passes may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThrottleMode {
    /// A pass on every tick.
    #[default]
    Uncontrolled,
    /// At most one pass per `fixed_step` of accumulated time.
    FixedStep,
    /// At most one pass per `custom_min_step` of accumulated time.
    MinimumInterval,
}

/// Persisted scheduler preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Throttle mode.
    pub throttle: ThrottleMode,
    /// Threshold used by [`ThrottleMode::MinimumInterval`].
    #[serde(with = "duration_secs")]
    pub custom_min_step: Duration,
    /// The host's fixed simulation step, used by [`ThrottleMode::FixedStep`].
    #[serde(with = "duration_secs")]
    pub fixed_step: Duration,
    /// Length of a health-tracking window.
    #[serde(with = "duration_secs")]
    pub health_window: Duration,
    /// Sweep dead anchors before every pass.
    pub auto_clean: bool,
    /// Run callbacks one at a time and remove only the one that faults.
    /// When off, callbacks run as one unit and any fault clears the registry.
    pub isolate_faults: bool,
    /// Start the driver whenever a subscription is added.
    pub auto_launch: bool,
    /// Whether the driver was running when these settings were captured.
    /// A sandbox created from them starts running again.
    pub resume_running: bool,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            throttle: ThrottleMode::Uncontrolled,
            custom_min_step: Duration::from_millis(10),
            fixed_step: Duration::from_millis(20),
            health_window: Duration::from_secs(10),
            auto_clean: true,
            isolate_faults: true,
            auto_launch: true,
            resume_running: false,
        }
    }
}

impl SandboxSettings {
    /// The throttle threshold, or `None` when every tick may run a pass.
    pub fn min_interval(&self) -> Option<Duration> {
        let threshold = match self.throttle {
            ThrottleMode::Uncontrolled => return None,
            ThrottleMode::FixedStep => self.fixed_step,
            ThrottleMode::MinimumInterval => self.custom_min_step,
        };
        (!threshold.is_zero()).then_some(threshold)
    }

    /// Applies the same clamps the scheduler enforces.
    pub fn normalized(mut self) -> Self {
        self.health_window = self.health_window.max(MIN_WINDOW);
        self
    }

    /// Reads settings from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: SandboxSettings =
            ron::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("Loaded sandbox settings from {}", path.display());
        Ok(settings.normalized())
    }

    /// Reads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!(
                "No sandbox settings at {}, using defaults",
                path.display()
            );
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("{e}. Falling back to default sandbox settings.");
            Self::default()
        })
    }

    /// Writes settings to a RON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Saved sandbox settings to {}", path.display());
        Ok(())
    }
}

mod duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_interval_per_mode() {
        let mut settings = SandboxSettings::default();
        assert_eq!(settings.min_interval(), None);

        settings.throttle = ThrottleMode::MinimumInterval;
        settings.custom_min_step = Duration::from_millis(250);
        assert_eq!(settings.min_interval(), Some(Duration::from_millis(250)));

        settings.throttle = ThrottleMode::FixedStep;
        assert_eq!(settings.min_interval(), Some(Duration::from_millis(20)));

        settings.fixed_step = Duration::ZERO;
        assert_eq!(settings.min_interval(), None, "zero threshold never throttles");
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("sandbox.ron");

        let settings = SandboxSettings {
            throttle: ThrottleMode::MinimumInterval,
            custom_min_step: Duration::from_millis(250),
            auto_clean: false,
            isolate_faults: false,
            ..Default::default()
        };
        settings.save(&path).unwrap();

        assert_eq!(SandboxSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.ron");
        std::fs::write(&path, "(throttle: FixedStep, health_window: 0.01)").unwrap();

        let settings = SandboxSettings::load(&path).unwrap();
        assert_eq!(settings.throttle, ThrottleMode::FixedStep);
        assert!(settings.isolate_faults);
        assert_eq!(settings.health_window, MIN_WINDOW);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.ron");
        std::fs::write(&path, "(throttle: Sometimes)").unwrap();

        assert!(matches!(
            SandboxSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
        assert_eq!(
            SandboxSettings::load_or_default(&path),
            SandboxSettings::default()
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ron");
        assert!(matches!(
            SandboxSettings::load(&path),
            Err(SettingsError::Io { .. })
        ));
        assert_eq!(
            SandboxSettings::load_or_default(&path),
            SandboxSettings::default()
        );
    }
}
