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

//! Reference validity sweeper.
//!
//! Evicts every subscription whose anchor is no longer live. The whole list is
//! scanned; unanchored entries are skipped, never treated as the end of the
//! anchored section.

use crate::registry::CallbackRegistry;

/// Removes subscriptions with dead anchors.
///
/// ## Returns
/// The number of evicted subscriptions.
pub fn sweep(registry: &mut CallbackRegistry) -> usize {
    if registry.is_empty() {
        return 0;
    }

    let removed = registry.retain(|entry| {
        let valid = entry.is_valid();
        if !valid {
            log::debug!(
                "Sweeper: Evicting '{}' from {}, anchor of type {} is gone",
                entry.callback().name(),
                entry.sender(),
                entry.anchor().map_or("?", |anchor| anchor.type_name())
            );
        }
        valid
    });

    if removed > 0 {
        log::info!("Sweeper: Removed {removed} subscription(s) with dead anchors");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_core::{Anchor, Callback, Liveness, SenderTag};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Prop {
        destroyed: Cell<bool>,
    }

    impl Liveness for Prop {
        fn is_live(&self) -> bool {
            !self.destroyed.get()
        }
    }

    fn tag() -> SenderTag {
        SenderTag::of::<Prop>()
    }

    #[test]
    fn test_sweep_of_empty_registry() {
        let mut registry = CallbackRegistry::new();
        assert_eq!(sweep(&mut registry), 0);
    }

    #[test]
    fn test_sweep_continues_past_unanchored_entries() {
        let mut registry = CallbackRegistry::new();
        let early = Rc::new(5_i32);
        let late = Rc::new(7_i32);

        registry
            .add(Some(Anchor::plain(&early)), tag(), Callback::from_fn("early", || {}))
            .unwrap();
        registry
            .add(None, tag(), Callback::from_fn("free", || {}))
            .unwrap();
        registry
            .add(Some(Anchor::plain(&late)), tag(), Callback::from_fn("late", || {}))
            .unwrap();

        drop(early);
        drop(late);

        assert_eq!(sweep(&mut registry), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().callback().name(), "free");
    }

    #[test]
    fn test_sweep_uses_host_destroyed_flag() {
        let mut registry = CallbackRegistry::new();
        let prop = Rc::new(Prop {
            destroyed: Cell::new(false),
        });
        registry
            .add(Some(Anchor::checked(&prop)), tag(), Callback::from_fn("spin", || {}))
            .unwrap();

        assert_eq!(sweep(&mut registry), 0);
        prop.destroyed.set(true);
        assert_eq!(sweep(&mut registry), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_keeps_paused_live_entries() {
        let mut registry = CallbackRegistry::new();
        let owner = Rc::new(1_u8);
        registry
            .add(Some(Anchor::plain(&owner)), tag(), Callback::from_fn("a", || {}))
            .unwrap();
        registry.pause(0);

        assert_eq!(sweep(&mut registry), 0);
        assert!(registry.get(0).unwrap().is_paused());
    }
}
