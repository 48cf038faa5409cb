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

//! Sender tags and the identity keys used to deduplicate subscriptions.

use crate::anchor::{Anchor, AnchorId};
use crate::callback::{Callback, CallbackId};
use std::borrow::Cow;
use std::fmt;

/// The logical owner or context a subscription was registered from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderTag(Cow<'static, str>);

impl SenderTag {
    /// A tag naming the type `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// A free-form tag.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The tag as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty tag counts as "no sender".
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SenderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The key under which a subscription is unique inside a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Anchored subscriptions are keyed by object, sender and callback name,
    /// so re-registering "the same method of the same object" with a fresh
    /// closure replaces the old one.
    Anchored {
        /// The anchored object.
        anchor: AnchorId,
        /// The sender tag.
        sender: SenderTag,
        /// The callback's name.
        name: String,
    },
    /// Unanchored subscriptions are keyed by the handle itself.
    Callback(CallbackId),
}

impl IdentityKey {
    /// Computes the key a registration would be stored under.
    pub fn new(anchor: Option<&Anchor>, sender: &SenderTag, callback: &Callback) -> Self {
        match anchor {
            Some(anchor) => Self::Anchored {
                anchor: anchor.id(),
                sender: sender.clone(),
                name: callback.name().to_owned(),
            },
            None => Self::Callback(callback.id()),
        }
    }
}
