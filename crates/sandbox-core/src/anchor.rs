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

//! Weak anchors that condition a subscription's validity on an object's life.
//!
//! An [`Anchor`] never keeps its referent alive. Two flavours exist:
//!
//! - **plain** anchors are live for as long as the referent exists;
//! - **checked** anchors additionally ask the referent through [`Liveness`],
//!   which lets host-managed objects report "destroyed" while still allocated.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

/// A liveness check for host-managed objects.
///
/// Hosts often keep a destroyed object allocated until some later point and
/// flag it instead. Implement this trait to expose that flag to the sandbox.
pub trait Liveness {
    /// Returns `false` once the host considers the object destroyed.
    fn is_live(&self) -> bool;
}

/// Stable identity of an anchored object, derived from its allocation.
///
/// The anchor's weak reference keeps the allocation reserved, so the id cannot
/// be reused by another object while any anchor to it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(usize);

#[derive(Clone)]
enum AnchorTarget {
    Plain(Weak<dyn Any>),
    Checked(Weak<dyn Liveness>),
}

/// A weak, typed reference to the object a subscription is attached to.
#[derive(Clone)]
pub struct Anchor {
    target: AnchorTarget,
    id: AnchorId,
    type_name: &'static str,
}

impl Anchor {
    /// Anchors to a plain object: live while the object exists.
    pub fn plain<T: Any>(target: &Rc<T>) -> Self {
        let weak: Weak<T> = Rc::downgrade(target);
        let weak: Weak<dyn Any> = weak;
        Self {
            target: AnchorTarget::Plain(weak),
            id: AnchorId(Rc::as_ptr(target) as *const () as usize),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Anchors to a host-managed object: live while the object exists and its
    /// [`Liveness`] check agrees.
    pub fn checked<T: Liveness + 'static>(target: &Rc<T>) -> Self {
        let weak: Weak<T> = Rc::downgrade(target);
        let weak: Weak<dyn Liveness> = weak;
        Self {
            target: AnchorTarget::Checked(weak),
            id: AnchorId(Rc::as_ptr(target) as *const () as usize),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The identity of the anchored object.
    pub fn id(&self) -> AnchorId {
        self.id
    }

    /// The type name of the anchored object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` for anchors created with [`Anchor::checked`].
    pub fn is_host_managed(&self) -> bool {
        matches!(self.target, AnchorTarget::Checked(_))
    }

    /// Asks whether the anchored object is still alive.
    pub fn is_live(&self) -> bool {
        match &self.target {
            AnchorTarget::Plain(weak) => weak.strong_count() > 0,
            AnchorTarget::Checked(weak) => match weak.upgrade() {
                Some(target) => self.ask(target),
                None => false,
            },
        }
    }

    // A panicking liveness check counts as dead.
    fn ask(&self, target: Rc<dyn Liveness>) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| target.is_live())).unwrap_or_else(|_| {
            log::warn!(
                "Anchor: Liveness check of {} panicked, treating the object as destroyed",
                self.type_name
            );
            false
        })
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("host_managed", &self.is_host_managed())
            .field("live", &self.is_live())
            .finish()
    }
}
