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

//! Error types for registration and settings persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Why a subscription could not be registered.
///
/// Registration failures are ordinary values; nothing is logged above debug
/// level and the registry is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The sender tag was empty.
    #[error("a subscription needs a sender tag")]
    MissingSender,
    /// The callback was created with an empty name.
    #[error("a subscription needs a named callback")]
    MissingCallbackName,
    /// The anchor was already dead at registration time.
    #[error("anchor of type `{type_name}` is no longer live")]
    DeadAnchor {
        /// Type name of the anchored object.
        type_name: &'static str,
    },
}

/// Failure to load or save [`SandboxSettings`](crate::settings::SandboxSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the file failed.
    #[error("settings file '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid RON for the settings schema.
    #[error("invalid settings in '{path}': {source}")]
    Parse {
        /// The file involved.
        path: PathBuf,
        /// The parser error, with position.
        #[source]
        source: ron::error::SpannedError,
    },
    /// The settings could not be encoded.
    #[error("failed to encode settings: {0}")]
    Encode(#[from] ron::Error),
}
