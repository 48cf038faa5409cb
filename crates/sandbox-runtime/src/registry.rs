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

//! Ordered store of subscriptions.
//!
//! List order is execution order, and indices are how pause, move and remove
//! address entries. Entries are unique by [`IdentityKey`]: registering a
//! duplicate rebinds the existing entry in place so that callbacks keep running
//! in creation order.

use crate::diagnostics::SubscriptionInfo;
use crate::error::RegistrationError;
use sandbox_core::{Anchor, Callback, IdentityKey, SenderTag};

/// One entry of the registry.
#[derive(Debug, Clone)]
pub struct Subscription {
    paused: bool,
    callback: Callback,
    anchor: Option<Anchor>,
    sender: SenderTag,
    key: IdentityKey,
}

impl Subscription {
    /// Whether the entry is skipped during passes.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The scheduled callback.
    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// The anchor, if the subscription has one.
    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    /// The sender tag.
    pub fn sender(&self) -> &SenderTag {
        &self.sender
    }

    /// The identity key the entry is stored under.
    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    /// Unanchored subscriptions are always valid.
    pub fn is_valid(&self) -> bool {
        self.anchor.as_ref().map_or(true, Anchor::is_live)
    }
}

/// Outcome of a successful [`CallbackRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new entry was appended at this index.
    Added(usize),
    /// An entry with the same identity key was rebound at this index.
    Rebound(usize),
}

impl Registration {
    /// The index of the affected entry.
    pub fn index(self) -> usize {
        match self {
            Registration::Added(index) | Registration::Rebound(index) => index,
        }
    }
}

/// The ordered subscription list.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    entries: Vec<Subscription>,
    // Active callbacks in order, built on demand for composed passes.
    composed: Option<Vec<Callback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, or rebinds the entry that already has its identity key.
    ///
    /// A rebound entry keeps its position and is resumed if it was paused.
    pub fn add(
        &mut self,
        anchor: Option<Anchor>,
        sender: SenderTag,
        callback: Callback,
    ) -> Result<Registration, RegistrationError> {
        if sender.is_empty() {
            return Err(RegistrationError::MissingSender);
        }
        if callback.name().trim().is_empty() {
            return Err(RegistrationError::MissingCallbackName);
        }
        if let Some(anchor) = anchor.as_ref().filter(|a| !a.is_live()) {
            return Err(RegistrationError::DeadAnchor {
                type_name: anchor.type_name(),
            });
        }

        let key = IdentityKey::new(anchor.as_ref(), &sender, &callback);
        self.composed = None;

        if let Some(index) = self.find(&key) {
            let entry = &mut self.entries[index];
            log::debug!(
                "CallbackRegistry: Rebound '{}' from {} at index {}",
                callback.name(),
                sender,
                index
            );
            entry.callback = callback;
            entry.paused = false;
            return Ok(Registration::Rebound(index));
        }

        log::debug!(
            "CallbackRegistry: Added '{}' from {} at index {}",
            callback.name(),
            sender,
            self.entries.len()
        );
        self.entries.push(Subscription {
            paused: false,
            callback,
            anchor,
            sender,
            key,
        });
        Ok(Registration::Added(self.entries.len() - 1))
    }

    /// Index of the entry stored under `key`.
    pub fn find(&self, key: &IdentityKey) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == *key)
    }

    /// Index of the first entry whose callback is `callback` itself.
    pub fn find_callback(&self, callback: &Callback) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.callback.ptr_eq(callback))
    }

    /// Removes the entry at `index`.
    pub fn remove_at(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.entries.remove(index);
        self.composed = None;
        true
    }

    /// Removes the entry whose callback is `callback`.
    pub fn remove_callback(&mut self, callback: &Callback) -> bool {
        match self.find_callback(callback) {
            Some(index) => self.remove_at(index),
            None => false,
        }
    }

    /// Removes the entry stored under `key`.
    pub fn remove_key(&mut self, key: &IdentityKey) -> bool {
        match self.find(key) {
            Some(index) => self.remove_at(index),
            None => false,
        }
    }

    /// Removes every entry. Returns how many were removed.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.composed = None;
        removed
    }

    /// Pauses the entry at `index`.
    pub fn pause(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.paused = true;
                self.composed = None;
                true
            }
            None => false,
        }
    }

    /// Resumes the entry at `index`. Returns `false` if it was not paused.
    pub fn unpause(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.paused => {
                entry.paused = false;
                self.composed = None;
                true
            }
            _ => false,
        }
    }

    /// Swaps the entry at `index` with its predecessor. No-op at the top.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.entries.len() {
            return false;
        }
        self.entries.swap(index - 1, index);
        self.composed = None;
        true
    }

    /// Swaps the entry at `index` with its successor. No-op at the bottom.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index >= self.entries.len().saturating_sub(1) {
            return false;
        }
        self.entries.swap(index, index + 1);
        self.composed = None;
        true
    }

    /// The entry at `index`.
    pub fn get(&self, index: usize) -> Option<&Subscription> {
        self.entries.get(index)
    }

    /// Iterates entries in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.iter()
    }

    /// Total number of entries, paused ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that are not paused.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.paused).count()
    }

    /// Read-only view of the entry at `index`.
    pub fn snapshot(&self, index: usize) -> Option<SubscriptionInfo> {
        self.entries
            .get(index)
            .map(|entry| SubscriptionInfo::capture(index, entry))
    }

    /// Read-only views of every entry.
    pub fn snapshots(&self) -> Vec<SubscriptionInfo> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| SubscriptionInfo::capture(index, entry))
            .collect()
    }

    /// The active callbacks, in order, as a single invocation unit.
    ///
    /// The list is cached until the next structural change.
    pub fn composed(&mut self) -> Vec<Callback> {
        let entries = &self.entries;
        self.composed
            .get_or_insert_with(|| {
                entries
                    .iter()
                    .filter(|entry| !entry.paused)
                    .map(|entry| entry.callback.clone())
                    .collect()
            })
            .clone()
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Subscription) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| keep(entry));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.composed = None;
        }
        removed
    }
}
