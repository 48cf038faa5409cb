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

//! Read-only snapshots of registry state for inspectors and tooling.

use crate::registry::Subscription;
use sandbox_core::{AnchorId, CallbackId, SenderTag};
use std::fmt;

/// What a snapshot knows about a subscription's anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorInfo {
    /// Identity of the anchored object.
    pub id: AnchorId,
    /// Type name of the anchored object.
    pub type_name: &'static str,
    /// Whether the anchor follows a host destroyed-object flag.
    pub host_managed: bool,
    /// Liveness at the time of the snapshot.
    pub live: bool,
}

/// A copy of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Position in the registry.
    pub index: usize,
    /// Whether the entry is paused.
    pub paused: bool,
    /// The callback's name.
    pub callback: String,
    /// The callback's identity.
    pub callback_id: CallbackId,
    /// Anchor details, if anchored.
    pub anchor: Option<AnchorInfo>,
    /// The sender tag.
    pub sender: SenderTag,
}

impl SubscriptionInfo {
    pub(crate) fn capture(index: usize, entry: &Subscription) -> Self {
        Self {
            index,
            paused: entry.is_paused(),
            callback: entry.callback().name().to_owned(),
            callback_id: entry.callback().id(),
            anchor: entry.anchor().map(|anchor| AnchorInfo {
                id: anchor.id(),
                type_name: anchor.type_name(),
                host_managed: anchor.is_host_managed(),
                live: anchor.is_live(),
            }),
            sender: entry.sender().clone(),
        }
    }
}

impl fmt::Display for SubscriptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}){}",
            self.index,
            self.callback,
            self.sender,
            if self.paused { " paused" } else { "" }
        )?;
        if let Some(anchor) = &self.anchor {
            write!(
                f,
                " @ {}{}",
                anchor.type_name,
                if anchor.live { "" } else { " (dead)" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::CallbackRegistry;
    use sandbox_core::{Anchor, Callback, SenderTag};
    use std::rc::Rc;

    struct Lamp;

    #[test]
    fn test_snapshot_reflects_entry() {
        let mut registry = CallbackRegistry::new();
        let lamp = Rc::new(Lamp);
        let cb = Callback::from_fn("glow", || {});
        registry
            .add(Some(Anchor::plain(&lamp)), SenderTag::of::<Lamp>(), cb.clone())
            .unwrap();
        registry.pause(0);

        let info = registry.snapshot(0).expect("entry exists");
        assert_eq!(info.index, 0);
        assert!(info.paused);
        assert_eq!(info.callback, "glow");
        assert_eq!(info.callback_id, cb.id());
        let anchor = info.anchor.as_ref().expect("anchored");
        assert!(anchor.live);
        assert!(!anchor.host_managed);
        assert!(anchor.type_name.ends_with("Lamp"));

        let text = info.to_string();
        assert!(text.starts_with("[0] glow"));
        assert!(text.contains("paused"));
    }

    #[test]
    fn test_snapshot_out_of_range() {
        let registry = CallbackRegistry::new();
        assert!(registry.snapshot(0).is_none());
        assert!(registry.snapshots().is_empty());
    }

    #[test]
    fn test_snapshot_reports_dead_anchor() {
        let mut registry = CallbackRegistry::new();
        let lamp = Rc::new(Lamp);
        registry
            .add(
                Some(Anchor::plain(&lamp)),
                SenderTag::of::<Lamp>(),
                Callback::from_fn("glow", || {}),
            )
            .unwrap();
        drop(lamp);

        let info = &registry.snapshots()[0];
        assert!(!info.anchor.as_ref().unwrap().live);
        assert!(info.to_string().ends_with("(dead)"));
    }
}
