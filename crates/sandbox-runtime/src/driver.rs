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

//! The cycle driver.
//!
//! [`Sandbox`] owns the registry and runs it once per host tick while it is
//! running. Each tick goes through the same steps:
//!
//! 1. measure the time since the previous tick;
//! 2. feed the health tracker;
//! 3. stop here if the registry is empty;
//! 4. ask the throttle gate; if it opens, sweep dead anchors (when auto-clean
//!    is on) and run a pass with the configured discipline;
//! 5. publish [`SandboxEvent::Stepped`].
//!
//! No borrow of the scheduler state is held while user code runs, so a
//! callback may add, remove, pause or move subscriptions, or stop the driver.

use crate::diagnostics::SubscriptionInfo;
use crate::error::RegistrationError;
use crate::fault::{self, Fault, Outcome};
use crate::registry::{CallbackRegistry, Registration};
use crate::settings::{SandboxSettings, ThrottleMode};
use crate::sweeper;
use crate::throttle::ThrottleGate;
use sandbox_core::{
    Anchor, Callback, ClearReason, Clock, EventBus, FaultKind, IdentityKey, Liveness,
    SandboxEvent, SenderTag, SystemClock, TickHook, TickHookId, TickSource,
};
use sandbox_telemetry::{HealthReport, HealthTracker};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Maximum number of undrained events kept on the bus.
pub const EVENT_BACKLOG: usize = 1024;

/// The driver's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not subscribed to the tick source. The initial state.
    Stopped,
    /// Subscribed; every host tick reaches the scheduler.
    Running,
}

// What a pass knows about the subscription it is invoking.
struct Invocation {
    callback: Callback,
    key: IdentityKey,
    sender: SenderTag,
}

struct SandboxState {
    registry: CallbackRegistry,
    settings: SandboxSettings,
    health: HealthTracker,
    throttle: ThrottleGate,
    driver: DriverState,
    source: Rc<dyn TickSource>,
    hook: Option<TickHookId>,
    clock: Rc<dyn Clock>,
    last_tick: Option<Duration>,
    delta_time: Duration,
    last_pass: Duration,
    in_pass: bool,
    ticks: u64,
    passes: u64,
    events: EventBus<SandboxEvent>,
}

impl SandboxState {
    fn publish_report(&self, report: HealthReport) {
        self.events.publish(SandboxEvent::AverageTickUpdated {
            average: report.average,
            peak: report.peak,
            samples: report.samples,
        });
    }

    fn flush_health(&mut self) {
        if let Some(report) = self.health.flush() {
            self.publish_report(report);
        }
    }

    fn sweep(&mut self) -> usize {
        let removed = sweeper::sweep(&mut self.registry);
        if removed > 0 {
            self.events
                .publish(SandboxEvent::SubscriptionsSwept { removed });
        }
        removed
    }

    // Runs before any configuration or state change.
    fn before_change(&mut self) {
        self.flush_health();
        if self.settings.auto_clean {
            self.sweep();
        }
    }

    fn contain_fault(&mut self, index: usize, faulted: &Invocation, fault: Fault) {
        // The subscription may have moved, been rebound or removed itself
        // while running. Only the entry that still holds the faulting handle
        // under the key it was invoked with is removed.
        let position = self
            .registry
            .find(&faulted.key)
            .filter(|&i| {
                self.registry
                    .get(i)
                    .is_some_and(|entry| entry.callback().ptr_eq(&faulted.callback))
            });
        let sender = faulted.sender.clone();

        if fault.kind == FaultKind::ResourceExhausted {
            log::error!(
                "Sandbox: RESOURCE EXHAUSTION in callback {index} '{}'",
                fault.callback
            );
        }
        log::warn!(
            "Sandbox: Callback {index} '{}' from {sender} crashed due to {} and was switched off: {}",
            fault.callback,
            fault.kind,
            fault.message
        );

        if let Some(position) = position {
            self.registry.remove_at(position);
        }
        self.events.publish(SandboxEvent::CallbackFaulted {
            index,
            callback: fault.callback,
            sender,
            kind: fault.kind,
            message: fault.message,
        });
    }
}

impl Drop for SandboxState {
    fn drop(&mut self) {
        if let Some(id) = self.hook.take() {
            self.source.unsubscribe(id);
        }
    }
}

/// A cooperative per-tick callback scheduler.
///
/// `Sandbox` is a cheap handle: clones share the same scheduler. It is
/// deliberately `!Send`; every operation must happen on the thread that
/// drives the tick source.
///
/// # Example
///
/// ```rust
/// use sandbox_runtime::{ManualTicker, Sandbox, SandboxSettings};
/// use sandbox_core::{Callback, SenderTag};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let ticker = Rc::new(ManualTicker::new());
/// let sandbox = Sandbox::new(ticker.clone(), SandboxSettings::default());
///
/// let hits = Rc::new(Cell::new(0));
/// let counter = hits.clone();
/// sandbox
///     .add(None, SenderTag::named("demo"), Callback::from_fn("count", move || {
///         counter.set(counter.get() + 1)
///     }))
///     .unwrap();
///
/// // Auto-launch started the driver on the first registration.
/// ticker.fire();
/// ticker.fire();
/// assert_eq!(hits.get(), 2);
/// ```
#[derive(Clone)]
pub struct Sandbox {
    inner: Rc<RefCell<SandboxState>>,
}

impl Sandbox {
    /// Creates a scheduler measuring time with the system clock.
    pub fn new(source: Rc<dyn TickSource>, settings: SandboxSettings) -> Self {
        Self::with_clock(source, settings, Rc::new(SystemClock::new()))
    }

    /// Creates a scheduler with an explicit clock.
    ///
    /// The scheduler starts stopped unless `settings.resume_running` records
    /// that the previous session was running.
    pub fn with_clock(
        source: Rc<dyn TickSource>,
        settings: SandboxSettings,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let settings = settings.normalized();
        let resume = settings.resume_running;
        log::info!(
            "Sandbox created (throttle={:?}, isolate_faults={}, auto_clean={})",
            settings.throttle,
            settings.isolate_faults,
            settings.auto_clean
        );
        let state = SandboxState {
            registry: CallbackRegistry::new(),
            health: HealthTracker::new(settings.health_window),
            settings,
            throttle: ThrottleGate::default(),
            driver: DriverState::Stopped,
            source,
            hook: None,
            clock,
            last_tick: None,
            delta_time: Duration::ZERO,
            last_pass: Duration::ZERO,
            in_pass: false,
            ticks: 0,
            passes: 0,
            events: EventBus::with_capacity(EVENT_BACKLOG),
        };
        let sandbox = Self {
            inner: Rc::new(RefCell::new(state)),
        };
        if resume {
            log::info!("Sandbox: Restoring the running state of the previous session");
            sandbox.start();
        }
        sandbox
    }

    // --- Lifecycle ---

    /// The current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.inner.borrow().driver
    }

    /// Returns `true` while subscribed to the tick source.
    pub fn is_running(&self) -> bool {
        self.state() == DriverState::Running
    }

    /// Subscribes to the tick source.
    pub fn start(&self) {
        self.set_running(true);
    }

    /// Unsubscribes from the tick source. Subscriptions are kept.
    pub fn stop(&self) {
        self.set_running(false);
    }

    /// Moves the driver to `Running` or `Stopped`.
    pub fn set_running(&self, running: bool) {
        let mut state = self.inner.borrow_mut();
        if (state.driver == DriverState::Running) == running {
            return;
        }
        state.before_change();

        if running {
            let weak = Rc::downgrade(&self.inner);
            let hook: TickHook = Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Sandbox { inner }.tick();
                }
            });
            let id = state.source.subscribe(hook);
            state.hook = Some(id);
            state.driver = DriverState::Running;
            state.last_tick = Some(state.clock.now());
            log::info!("Sandbox: Running");
        } else {
            if let Some(id) = state.hook.take() {
                state.source.unsubscribe(id);
            }
            state.driver = DriverState::Stopped;
            state.last_tick = None;
            log::info!("Sandbox: Stopped");
        }
        state.settings.resume_running = running;
        state
            .events
            .publish(SandboxEvent::StateChanged { running });
    }

    // --- Registration ---

    /// Registers a callback, or rebinds the subscription with the same identity key.
    ///
    /// Starts the driver when auto-launch is enabled.
    pub fn add(
        &self,
        anchor: Option<Anchor>,
        sender: SenderTag,
        callback: Callback,
    ) -> Result<Registration, RegistrationError> {
        let (registration, launch) = {
            let mut state = self.inner.borrow_mut();
            let registration = state.registry.add(anchor, sender, callback)?;
            (registration, state.settings.auto_launch)
        };
        if launch {
            self.start();
        }
        Ok(registration)
    }

    /// Registers a callback anchored to `owner`, tagged with the owner's type.
    pub fn add_for<T: Any>(
        &self,
        owner: &Rc<T>,
        callback: Callback,
    ) -> Result<Registration, RegistrationError> {
        self.add(Some(Anchor::plain(owner)), SenderTag::of::<T>(), callback)
    }

    /// Registers a callback anchored to a host-managed `owner`.
    pub fn add_checked<T: Liveness + 'static>(
        &self,
        owner: &Rc<T>,
        callback: Callback,
    ) -> Result<Registration, RegistrationError> {
        self.add(Some(Anchor::checked(owner)), SenderTag::of::<T>(), callback)
    }

    /// Registers an unanchored callback tagged with the type `T`.
    pub fn add_static<T: ?Sized>(
        &self,
        callback: Callback,
    ) -> Result<Registration, RegistrationError> {
        self.add(None, SenderTag::of::<T>(), callback)
    }

    /// Removes the subscription whose callback is `callback`.
    pub fn remove_callback(&self, callback: &Callback) -> bool {
        self.inner.borrow_mut().registry.remove_callback(callback)
    }

    /// Removes the subscription stored under `key`.
    pub fn remove_key(&self, key: &IdentityKey) -> bool {
        self.inner.borrow_mut().registry.remove_key(key)
    }

    /// Removes the subscription at `index`.
    pub fn remove_at(&self, index: usize) -> bool {
        self.inner.borrow_mut().registry.remove_at(index)
    }

    /// Removes every subscription.
    pub fn remove_all(&self) {
        let mut state = self.inner.borrow_mut();
        let removed = state.registry.remove_all();
        log::debug!("Sandbox: Removed all {removed} subscription(s)");
        state.events.publish(SandboxEvent::RegistryCleared {
            removed,
            reason: ClearReason::Requested,
        });
    }

    /// Pauses the subscription at `index`.
    pub fn pause(&self, index: usize) -> bool {
        self.inner.borrow_mut().registry.pause(index)
    }

    /// Resumes the subscription at `index`.
    pub fn unpause(&self, index: usize) -> bool {
        self.inner.borrow_mut().registry.unpause(index)
    }

    /// Swaps the subscription at `index` with the one before it.
    pub fn move_up(&self, index: usize) -> bool {
        self.inner.borrow_mut().registry.move_up(index)
    }

    /// Swaps the subscription at `index` with the one after it.
    pub fn move_down(&self, index: usize) -> bool {
        self.inner.borrow_mut().registry.move_down(index)
    }

    /// Index of the subscription stored under `key`.
    pub fn find(&self, key: &IdentityKey) -> Option<usize> {
        self.inner.borrow().registry.find(key)
    }

    /// Index of the subscription whose callback is `callback`.
    pub fn find_callback(&self, callback: &Callback) -> Option<usize> {
        self.inner.borrow().registry.find_callback(callback)
    }

    /// Index of the subscription a registration with these arguments would hit.
    pub fn find_anchored(
        &self,
        anchor: &Anchor,
        sender: &SenderTag,
        callback: &Callback,
    ) -> Option<usize> {
        self.find(&IdentityKey::new(Some(anchor), sender, callback))
    }

    /// Evicts subscriptions whose anchors are dead. Returns how many.
    pub fn sweep(&self) -> usize {
        self.inner.borrow_mut().sweep()
    }

    // --- Diagnostics ---

    /// Number of subscriptions, paused ones included.
    pub fn total_count(&self) -> usize {
        self.inner.borrow().registry.len()
    }

    /// Number of subscriptions that are not paused.
    pub fn active_count(&self) -> usize {
        self.inner.borrow().registry.active_count()
    }

    /// Snapshot of the subscription at `index`.
    pub fn snapshot(&self, index: usize) -> Option<SubscriptionInfo> {
        self.inner.borrow().registry.snapshot(index)
    }

    /// Snapshots of every subscription, in execution order.
    pub fn snapshots(&self) -> Vec<SubscriptionInfo> {
        self.inner.borrow().registry.snapshots()
    }

    /// Elapsed time as seen by the throttle on the last tick: the raw tick
    /// interval when unthrottled, the accumulated time otherwise.
    pub fn delta_time(&self) -> Duration {
        self.inner.borrow().delta_time
    }

    /// The latest average tick interval, zero until a window closes.
    pub fn average_tick(&self) -> Duration {
        self.inner.borrow().health.average()
    }

    /// How long the most recent pass took.
    pub fn last_pass_duration(&self) -> Duration {
        self.inner.borrow().last_pass
    }

    /// Ticks received since creation.
    pub fn tick_count(&self) -> u64 {
        self.inner.borrow().ticks
    }

    /// Passes executed since creation.
    pub fn pass_count(&self) -> u64 {
        self.inner.borrow().passes
    }

    /// A receiver for scheduler notifications.
    pub fn events(&self) -> flume::Receiver<SandboxEvent> {
        self.inner.borrow().events.receiver()
    }

    /// Removes and returns every queued notification.
    pub fn drain_events(&self) -> Vec<SandboxEvent> {
        self.inner.borrow().events.drain()
    }

    // --- Settings ---

    /// A copy of the current settings.
    pub fn settings(&self) -> SandboxSettings {
        self.inner.borrow().settings.clone()
    }

    /// Replaces all settings at once. `resume_running` is ignored; use
    /// [`Sandbox::start`] and [`Sandbox::stop`].
    pub fn apply_settings(&self, settings: SandboxSettings) {
        self.update_settings(|current| *current = settings);
    }

    /// Sets the throttle mode.
    pub fn set_throttle_mode(&self, mode: ThrottleMode) {
        self.update_settings(|s| s.throttle = mode);
    }

    /// Sets the threshold used by [`ThrottleMode::MinimumInterval`].
    pub fn set_custom_min_step(&self, step: Duration) {
        self.update_settings(|s| s.custom_min_step = step);
    }

    /// Sets the host's fixed step, used by [`ThrottleMode::FixedStep`].
    pub fn set_fixed_step(&self, step: Duration) {
        self.update_settings(|s| s.fixed_step = step);
    }

    /// Sets the health-tracking window.
    pub fn set_health_window(&self, window: Duration) {
        self.update_settings(|s| s.health_window = window);
    }

    /// Enables or disables sweeping before every pass.
    pub fn set_auto_clean(&self, enabled: bool) {
        self.update_settings(|s| s.auto_clean = enabled);
    }

    /// Chooses between isolating (`true`) and composed (`false`) execution.
    pub fn set_isolate_faults(&self, enabled: bool) {
        self.update_settings(|s| s.isolate_faults = enabled);
    }

    /// Enables or disables starting the driver on registration.
    pub fn set_auto_launch(&self, enabled: bool) {
        self.update_settings(|s| s.auto_launch = enabled);
    }

    /// Closes the current health window early.
    pub fn flush_health(&self) {
        self.inner.borrow_mut().flush_health();
    }

    fn update_settings(&self, change: impl FnOnce(&mut SandboxSettings)) {
        let mut state = self.inner.borrow_mut();
        let mut next = state.settings.clone();
        change(&mut next);
        // The running state is recorded by the driver, never applied here.
        next.resume_running = state.settings.resume_running;
        let next = next.normalized();
        if next == state.settings {
            return;
        }

        state.before_change();
        state.health.set_window(next.health_window);
        log::debug!("Sandbox: Settings changed to {next:?}");
        state.settings = next;
    }

    // --- Tick ---

    fn tick(&self) {
        let Ok(mut state) = self.inner.try_borrow_mut() else {
            log::warn!("Sandbox: Tick arrived while the scheduler was borrowed, ignoring it");
            return;
        };
        if state.driver != DriverState::Running {
            log::trace!("Sandbox: Tick reached a stopped scheduler, ignoring it");
            return;
        }
        if state.in_pass {
            log::warn!("Sandbox: Re-entrant tick from inside a pass ignored");
            return;
        }

        let now = state.clock.now();
        let elapsed = state
            .last_tick
            .map_or(Duration::ZERO, |previous| now.saturating_sub(previous));
        state.last_tick = Some(now);
        state.ticks += 1;

        if let Some(report) = state.health.record(elapsed) {
            state.publish_report(report);
        }

        let threshold = state.settings.min_interval();
        if threshold.is_none() {
            state.throttle.reset();
        }
        state.delta_time = state.throttle.absorb(elapsed);

        if state.registry.is_empty() {
            return;
        }
        if !state.throttle.try_open(threshold) {
            state
                .events
                .publish(SandboxEvent::Stepped { executed: false });
            return;
        }

        if state.settings.auto_clean {
            state.sweep();
        }
        state.in_pass = true;
        let isolate = state.settings.isolate_faults;
        let clock = Rc::clone(&state.clock);
        drop(state);

        let started = clock.now();
        if isolate {
            self.perform_isolated();
        } else {
            self.perform_composed();
        }

        let mut state = self.inner.borrow_mut();
        state.in_pass = false;
        state.passes += 1;
        state.last_pass = clock.now().saturating_sub(started);
        state
            .events
            .publish(SandboxEvent::Stepped { executed: true });
    }

    fn perform_isolated(&self) {
        let mut index = 0;
        loop {
            let current = {
                let state = self.inner.borrow();
                match state.registry.get(index) {
                    None => break,
                    Some(entry) if entry.is_paused() => {
                        index += 1;
                        continue;
                    }
                    Some(entry) => Invocation {
                        callback: entry.callback().clone(),
                        key: entry.key().clone(),
                        sender: entry.sender().clone(),
                    },
                }
            };

            match fault::invoke_guarded(&current.callback) {
                Outcome::Completed => index += 1,
                Outcome::Faulted(fault) => {
                    self.inner
                        .borrow_mut()
                        .contain_fault(index, &current, fault);
                    break;
                }
            }
        }
    }

    fn perform_composed(&self) {
        let unit = self.inner.borrow_mut().registry.composed();
        if let Outcome::Faulted(fault) = fault::invoke_composed(&unit) {
            let mut state = self.inner.borrow_mut();
            log::warn!(
                "Sandbox: Composed pass crashed in '{}' due to {} and will be switched off: {}",
                fault.callback,
                fault.kind,
                fault.message
            );
            let removed = state.registry.remove_all();
            state.events.publish(SandboxEvent::RegistryCleared {
                removed,
                reason: ClearReason::Fault,
            });
        }
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => f
                .debug_struct("Sandbox")
                .field("state", &state.driver)
                .field("total", &state.registry.len())
                .field("active", &state.registry.active_count())
                .field("settings", &state.settings)
                .finish(),
            Err(_) => f.write_str("Sandbox { <busy> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::ManualTicker;
    use sandbox_core::ManualClock;
    use std::cell::Cell;

    fn setup(settings: SandboxSettings) -> (Sandbox, Rc<ManualTicker>, ManualClock) {
        let ticker = Rc::new(ManualTicker::new());
        let clock = ManualClock::new();
        let sandbox = Sandbox::with_clock(ticker.clone(), settings, Rc::new(clock.clone()));
        (sandbox, ticker, clock)
    }

    fn manual_launch() -> SandboxSettings {
        SandboxSettings {
            auto_launch: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_stopped_and_subscribes_on_start() {
        let (sandbox, ticker, _) = setup(manual_launch());
        assert_eq!(sandbox.state(), DriverState::Stopped);
        assert_eq!(ticker.hook_count(), 0);

        sandbox.start();
        assert!(sandbox.is_running());
        assert_eq!(ticker.hook_count(), 1);

        sandbox.start();
        assert_eq!(ticker.hook_count(), 1, "starting twice subscribes once");

        sandbox.stop();
        assert_eq!(ticker.hook_count(), 0);
    }

    #[test]
    fn test_auto_launch_starts_on_add() {
        let (sandbox, _, _) = setup(SandboxSettings::default());
        sandbox
            .add_static::<Sandbox>(Callback::from_fn("noop", || {}))
            .unwrap();
        assert!(sandbox.is_running());
    }

    #[test]
    fn test_failed_add_does_not_launch() {
        let (sandbox, _, _) = setup(SandboxSettings::default());
        let result = sandbox.add(None, SenderTag::named(""), Callback::from_fn("x", || {}));
        assert_eq!(result, Err(RegistrationError::MissingSender));
        assert!(!sandbox.is_running());
    }

    #[test]
    fn test_stopped_sandbox_sees_no_ticks() {
        let (sandbox, ticker, _) = setup(manual_launch());
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        sandbox
            .add_static::<Sandbox>(Callback::from_fn("count", move || {
                counter.set(counter.get() + 1)
            }))
            .unwrap();

        ticker.fire();
        assert_eq!(hits.get(), 0);
        assert_eq!(sandbox.tick_count(), 0);

        sandbox.start();
        ticker.fire();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dropping_last_handle_unsubscribes() {
        let (sandbox, ticker, _) = setup(manual_launch());
        sandbox.start();
        assert_eq!(ticker.hook_count(), 1);
        drop(sandbox);
        assert_eq!(ticker.hook_count(), 0);
    }

    #[test]
    fn test_callback_can_stop_the_driver() {
        let (sandbox, ticker, _) = setup(SandboxSettings::default());
        let handle = sandbox.clone();
        sandbox
            .add_static::<Sandbox>(Callback::from_fn("halt", move || handle.stop()))
            .unwrap();

        ticker.fire();
        assert!(!sandbox.is_running());
        assert_eq!(sandbox.total_count(), 1, "stopping keeps subscriptions");
    }

    #[test]
    fn test_reentrant_tick_is_ignored() {
        let (sandbox, ticker, _) = setup(SandboxSettings::default());
        let hits = Rc::new(Cell::new(0));
        let (source, counter) = (ticker.clone(), hits.clone());
        sandbox
            .add_static::<Sandbox>(Callback::from_fn("recurse", move || {
                counter.set(counter.get() + 1);
                source.fire();
            }))
            .unwrap();

        ticker.fire();
        assert_eq!(hits.get(), 1);
        assert_eq!(sandbox.total_count(), 1);
    }

    #[test]
    fn test_delta_time_and_pass_duration() {
        let (sandbox, ticker, clock) = setup(SandboxSettings::default());
        let timer = clock.clone();
        sandbox
            .add_static::<Sandbox>(Callback::from_fn("work", move || {
                timer.advance(Duration::from_millis(3))
            }))
            .unwrap();

        clock.advance(Duration::from_millis(16));
        ticker.fire();
        assert_eq!(sandbox.delta_time(), Duration::from_millis(16));
        assert_eq!(sandbox.last_pass_duration(), Duration::from_millis(3));
        assert_eq!(sandbox.pass_count(), 1);
    }

    #[test]
    fn test_settings_change_flushes_health() {
        let (sandbox, ticker, clock) = setup(manual_launch());
        sandbox.start();
        for _ in 0..4 {
            clock.advance(Duration::from_millis(25));
            ticker.fire();
        }
        assert_eq!(sandbox.average_tick(), Duration::ZERO);

        sandbox.set_throttle_mode(ThrottleMode::MinimumInterval);
        assert_eq!(sandbox.average_tick(), Duration::from_millis(25));
        assert!(sandbox
            .drain_events()
            .iter()
            .any(|e| matches!(e, SandboxEvent::AverageTickUpdated { samples: 4, .. })));
    }

    #[test]
    fn test_unchanged_setting_does_not_flush() {
        let (sandbox, ticker, clock) = setup(manual_launch());
        sandbox.start();
        clock.advance(Duration::from_millis(25));
        ticker.fire();

        sandbox.set_isolate_faults(true);
        assert_eq!(sandbox.average_tick(), Duration::ZERO);
    }

    #[test]
    fn test_health_window_is_clamped() {
        let (sandbox, _, _) = setup(manual_launch());
        sandbox.set_health_window(Duration::from_millis(1));
        assert_eq!(
            sandbox.settings().health_window,
            sandbox_telemetry::health::MIN_WINDOW
        );
    }

    /// A source that keeps calling every hook it had when the frame began.
    #[derive(Default)]
    struct EagerSource {
        hooks: RefCell<Vec<(TickHookId, TickHook)>>,
    }

    impl EagerSource {
        fn fire(&self) {
            let hooks = self.hooks.borrow().clone();
            for (_, hook) in hooks {
                hook();
            }
        }
    }

    impl TickSource for EagerSource {
        fn subscribe(&self, hook: TickHook) -> TickHookId {
            let next = self.hooks.borrow().last().map_or(0, |(id, _)| id.0 + 1);
            let id = TickHookId(next);
            self.hooks.borrow_mut().push((id, hook));
            id
        }

        fn unsubscribe(&self, id: TickHookId) -> bool {
            let mut hooks = self.hooks.borrow_mut();
            let before = hooks.len();
            hooks.retain(|(hook_id, _)| *hook_id != id);
            hooks.len() != before
        }
    }

    #[test]
    fn test_stopped_driver_ignores_late_hook_calls() {
        let source = Rc::new(EagerSource::default());
        let first = Sandbox::new(source.clone(), SandboxSettings::default());
        let second = Sandbox::new(source.clone(), SandboxSettings::default());

        let target = second.clone();
        first
            .add_static::<Sandbox>(Callback::from_fn("halt_other", move || target.stop()))
            .unwrap();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        second
            .add_static::<Sandbox>(Callback::from_fn("count", move || {
                counter.set(counter.get() + 1)
            }))
            .unwrap();

        source.fire();
        assert!(!second.is_running());
        assert_eq!(hits.get(), 0);
        assert_eq!(second.tick_count(), 0);
        assert_eq!(second.pass_count(), 0);
    }

    #[test]
    fn test_resume_running_restores_state() {
        let settings = SandboxSettings {
            resume_running: true,
            ..manual_launch()
        };
        let (sandbox, ticker, _) = setup(settings);
        assert!(sandbox.is_running());
        assert_eq!(ticker.hook_count(), 1);

        sandbox.stop();
        assert!(!sandbox.settings().resume_running);
        sandbox.start();
        assert!(sandbox.settings().resume_running);
    }

    #[test]
    fn test_apply_settings_leaves_running_state_alone() {
        let (sandbox, _, _) = setup(manual_launch());
        sandbox.apply_settings(SandboxSettings {
            resume_running: true,
            ..manual_launch()
        });
        assert!(!sandbox.is_running());
        assert!(!sandbox.settings().resume_running);
    }
}
