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

//! Opaque, shareable handles to zero-argument procedures.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The result every scheduled procedure reports back to the scheduler.
///
/// Returning `Err` is treated exactly like a panic: the invocation is a fault.
pub type CallbackResult = anyhow::Result<()>;

type CallbackFn = dyn FnMut() -> CallbackResult;

/// Stable identity of a [`Callback`] handle.
///
/// Two handles share an id if and only if one is a clone of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(usize);

/// A named, reference-counted handle to a zero-argument procedure.
///
/// Cloning the handle is cheap and preserves its identity, so the same
/// handle can be used to register and later remove a subscription.
#[derive(Clone)]
pub struct Callback {
    name: Cow<'static, str>,
    func: Rc<RefCell<CallbackFn>>,
}

impl Callback {
    /// Wraps a fallible procedure.
    ///
    /// The `name` takes the role of a method name: anchored subscriptions use it
    /// to recognise a re-registration of "the same method on the same object".
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: FnMut() -> CallbackResult + 'static,
    {
        let func: Rc<RefCell<CallbackFn>> = Rc::new(RefCell::new(func));
        Self {
            name: name.into(),
            func,
        }
    }

    /// Wraps an infallible procedure.
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, mut func: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self::new(name, move || {
            func();
            Ok(())
        })
    }

    /// The name this handle was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identity of the underlying procedure.
    pub fn id(&self) -> CallbackId {
        CallbackId(Rc::as_ptr(&self.func) as *const () as usize)
    }

    /// Returns `true` if both handles point at the same procedure.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        self.id() == other.id()
    }

    /// Runs the procedure once.
    ///
    /// A procedure that is already running further up the stack cannot be
    /// entered again; that attempt is reported as an error rather than a panic.
    pub fn invoke(&self) -> CallbackResult {
        match self.func.try_borrow_mut() {
            Ok(mut func) => (&mut *func)(),
            Err(_) => Err(anyhow::anyhow!(
                "callback '{}' was re-entered while already running",
                self.name
            )),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("id", &self.id())
            .finish()
    }
}
