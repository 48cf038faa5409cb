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

//! An in-process tick source for hosts that drive their own frame loop.

use sandbox_core::{TickHook, TickHookId, TickSource};
use std::cell::{Cell, RefCell};

/// A [`TickSource`] fired explicitly by the host, once per frame.
#[derive(Default)]
pub struct ManualTicker {
    hooks: RefCell<Vec<(TickHookId, TickHook)>>,
    next_id: Cell<u64>,
}

impl ManualTicker {
    /// Creates a ticker with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls every subscribed hook once, in subscription order.
    ///
    /// Hooks may subscribe or unsubscribe while running. A hook unsubscribed
    /// during the call is not reached afterwards; a hook subscribed during the
    /// call first runs on the next one.
    ///
    /// ## Returns
    /// The number of hooks called.
    pub fn fire(&self) -> usize {
        let hooks: Vec<(TickHookId, TickHook)> = self.hooks.borrow().clone();
        let mut called = 0;
        for (id, hook) in &hooks {
            if !self.is_subscribed(*id) {
                continue;
            }
            hook();
            called += 1;
        }
        called
    }

    /// Returns `true` while `id` is subscribed.
    pub fn is_subscribed(&self, id: TickHookId) -> bool {
        self.hooks.borrow().iter().any(|(hook_id, _)| *hook_id == id)
    }

    /// Number of subscribed hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.borrow().len()
    }
}

impl TickSource for ManualTicker {
    fn subscribe(&self, hook: TickHook) -> TickHookId {
        let id = TickHookId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.hooks.borrow_mut().push((id, hook));
        log::trace!("ManualTicker: Subscribed hook {}", id.0);
        id
    }

    fn unsubscribe(&self, id: TickHookId) -> bool {
        let mut hooks = self.hooks.borrow_mut();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        let removed = hooks.len() != before;
        if removed {
            log::trace!("ManualTicker: Unsubscribed hook {}", id.0);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_fire_calls_hooks_in_order() {
        let ticker = ManualTicker::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());
        ticker.subscribe(Rc::new(move || a.borrow_mut().push("a")));
        ticker.subscribe(Rc::new(move || b.borrow_mut().push("b")));

        assert_eq!(ticker.fire(), 2);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_unsubscribe() {
        let ticker = ManualTicker::new();
        let id = ticker.subscribe(Rc::new(|| {}));
        assert_eq!(ticker.hook_count(), 1);
        assert!(ticker.unsubscribe(id));
        assert!(!ticker.unsubscribe(id));
        assert_eq!(ticker.fire(), 0);
    }

    #[test]
    fn test_hook_unsubscribed_mid_fire_is_skipped() {
        let ticker = Rc::new(ManualTicker::new());
        let later = Rc::new(Cell::new(None));
        let hits = Rc::new(Cell::new(0));

        let (source, target) = (Rc::downgrade(&ticker), later.clone());
        ticker.subscribe(Rc::new(move || {
            if let (Some(source), Some(id)) = (source.upgrade(), target.get()) {
                source.unsubscribe(id);
            }
        }));
        let counter = hits.clone();
        let id = ticker.subscribe(Rc::new(move || counter.set(counter.get() + 1)));
        later.set(Some(id));

        assert_eq!(ticker.fire(), 1);
        assert_eq!(hits.get(), 0);
        assert!(!ticker.is_subscribed(id));
    }

    #[test]
    fn test_hook_may_unsubscribe_itself() {
        let ticker = Rc::new(ManualTicker::new());
        let slot = Rc::new(Cell::new(None));
        let (source, own_id) = (Rc::downgrade(&ticker), slot.clone());
        let id = ticker.subscribe(Rc::new(move || {
            if let (Some(source), Some(id)) = (source.upgrade(), own_id.get()) {
                source.unsubscribe(id);
            }
        }));
        slot.set(Some(id));

        assert_eq!(ticker.fire(), 1);
        assert_eq!(ticker.fire(), 0);
    }
}
