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

// A small host application for the sandbox scheduler.
// Run with: cargo run -p pulsar -- --ticks 240

use anyhow::{bail, Result};
use clap::Parser;
use sandbox_core::{Callback, Liveness, SandboxEvent};
use sandbox_runtime::{ManualTicker, Sandbox, SandboxSettings, ThrottleMode};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Drives the sandbox scheduler from a simulated frame loop")]
struct Args {
    /// Number of host frames to simulate.
    #[arg(long, default_value_t = 180)]
    ticks: u32,

    /// Host frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// RON settings file. Created with defaults if `--save` is given.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings back to `--settings` on exit.
    #[arg(long)]
    save: bool,

    /// Run callbacks as one unit; any fault clears the registry.
    #[arg(long)]
    composed: bool,

    /// Minimum milliseconds between passes.
    #[arg(long)]
    min_step_ms: Option<u64>,
}

/// A scene object destroyed by the host while its callback is still registered.
struct Pulsar {
    phase: Cell<f32>,
    destroyed: Cell<bool>,
}

impl Pulsar {
    fn pulse(&self) {
        let phase = (self.phase.get() + 0.1) % std::f32::consts::TAU;
        self.phase.set(phase);
        log::trace!("Pulsar: brightness {:.2}", phase.sin().abs());
    }
}

impl Liveness for Pulsar {
    fn is_live(&self) -> bool {
        !self.destroyed.get()
    }
}

/// An editor plugin whose handle is dropped mid-run.
struct Plugin;

#[derive(Default)]
struct Tally {
    faults: u32,
    swept: usize,
    reports: u32,
}

impl Tally {
    fn absorb(&mut self, events: impl Iterator<Item = SandboxEvent>) {
        for event in events {
            match event {
                SandboxEvent::CallbackFaulted { callback, kind, .. } => {
                    log::info!("Host: '{callback}' was switched off ({kind})");
                    self.faults += 1;
                }
                SandboxEvent::RegistryCleared { removed, reason } => {
                    log::info!("Host: {removed} subscription(s) cleared ({reason:?})");
                }
                SandboxEvent::SubscriptionsSwept { removed } => self.swept += removed,
                SandboxEvent::AverageTickUpdated { average, peak, .. } => {
                    log::info!(
                        "Host: average tick {:.2} ms (peak {:.2} ms)",
                        average.as_secs_f64() * 1000.0,
                        peak.as_secs_f64() * 1000.0
                    );
                    self.reports += 1;
                }
                _ => {}
            }
        }
    }
}

fn build_settings(args: &Args) -> SandboxSettings {
    let mut settings = match &args.settings {
        Some(path) => SandboxSettings::load_or_default(path),
        None => SandboxSettings::default(),
    };
    if args.composed {
        settings.isolate_faults = false;
    }
    if let Some(ms) = args.min_step_ms {
        settings.throttle = ThrottleMode::MinimumInterval;
        settings.custom_min_step = Duration::from_millis(ms);
    }
    settings.health_window = Duration::from_secs(1);
    settings
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    // Faults are reported by the scheduler itself.
    std::panic::set_hook(Box::new(|info| log::debug!("Captured panic: {info}")));

    let args = Args::parse();
    if args.save && args.settings.is_none() {
        bail!("--save needs a --settings path");
    }

    let ticker = Rc::new(ManualTicker::new());
    let sandbox = Sandbox::new(ticker.clone(), build_settings(&args));
    let events = sandbox.events();

    let pulsar = Rc::new(Pulsar {
        phase: Cell::new(0.0),
        destroyed: Cell::new(false),
    });
    let target = Rc::downgrade(&pulsar);
    sandbox.add_checked(
        &pulsar,
        Callback::from_fn("pulse", move || {
            if let Some(pulsar) = target.upgrade() {
                pulsar.pulse();
            }
        }),
    )?;

    let mut plugin = Some(Rc::new(Plugin));
    if let Some(plugin) = &plugin {
        sandbox.add_for(
            plugin,
            Callback::from_fn("plugin_refresh", || log::trace!("Plugin: refresh")),
        )?;
    }

    let frames = Rc::new(Cell::new(0_u32));
    let counter = frames.clone();
    sandbox.add_static::<Sandbox>(Callback::from_fn("frame_counter", move || {
        counter.set(counter.get() + 1)
    }))?;

    let mut calls = 0_u32;
    sandbox.add_static::<Sandbox>(Callback::new("flaky_importer", move || {
        calls += 1;
        if calls == 30 {
            bail!("import queue corrupted after {calls} calls");
        }
        Ok(())
    }))?;

    let mut tally = Tally::default();
    let frame = Duration::from_millis(args.frame_ms);
    for tick in 0..args.ticks {
        if tick == args.ticks / 3 {
            log::info!("Host: dropping the plugin");
            drop(plugin.take());
        }
        if tick == args.ticks / 2 {
            log::info!("Host: destroying the pulsar");
            pulsar.destroyed.set(true);
        }
        ticker.fire();
        tally.absorb(events.try_iter());
        std::thread::sleep(frame);
    }
    sandbox.sweep();
    sandbox.stop();

    println!("Subscriptions after {} frames:", args.ticks);
    for info in sandbox.snapshots() {
        println!("  {info}");
    }
    println!(
        "Passes: {}  counter: {}  average tick: {:.2} ms  last pass: {:?}",
        sandbox.pass_count(),
        frames.get(),
        sandbox.average_tick().as_secs_f64() * 1000.0,
        sandbox.last_pass_duration()
    );

    tally.absorb(events.try_iter());
    println!(
        "Faults: {}  swept: {}  health reports: {}",
        tally.faults, tally.swept, tally.reports
    );

    if let (true, Some(path)) = (args.save, &args.settings) {
        sandbox.settings().save(path)?;
    }
    Ok(())
}
