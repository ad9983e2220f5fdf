//! Simulated time.

use once_cell::sync::OnceCell;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// A monotonically increasing source of simulated time, measured in seconds.
pub trait Clock: Sync {
    /// Establishes `t = 0`. Calling it again has no effect.
    fn start(&self);

    /// Gets the simulated time elapsed since [Clock::start], in s.
    fn now(&self) -> f64;

    /// Suspends the calling thread for the given simulated duration in s.
    /// Zero or negative durations return immediately.
    fn sleep(&self, secs: f64);
}

/// A clock which runs at a fixed multiple of real time.
///
/// A scale of 1.0 runs in real time, 0.01 runs a hundred times faster
/// and 0.0 skips every delay.
pub struct ScaledClock {
    /// Real seconds per simulated second.
    scale: f64,
    /// The instant `t = 0`.
    epoch: OnceCell<Instant>,
}

impl ScaledClock {
    /// Creates a clock with the given number of real seconds per simulated second.
    ///
    /// Negative or non-finite scales are treated as zero.
    pub fn new(scale: f64) -> Self {
        Self {
            scale: if scale.is_finite() { scale.max(0.0) } else { 0.0 },
            epoch: OnceCell::new(),
        }
    }

    /// Gets the number of real seconds per simulated second.
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// A clock which only moves when told to, for deterministic tests.
///
/// Sleeping threads stay blocked until [ManualClock::advance] carries the
/// simulated time past their wake-up time, so a test decides exactly which
/// crossings overlap.
#[derive(Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    /// Signalled whenever the time moves or a thread starts sleeping.
    changed: Condvar,
}

#[derive(Debug, Default)]
struct ManualState {
    now: f64,
    /// The wake-up times of the threads currently sleeping.
    wakeups: Vec<f64>,
}

impl ManualClock {
    /// Creates a clock stopped at `t = 0`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Moves the simulated time forward, waking every sleeper whose time has come.
    pub fn advance(&self, secs: f64) {
        let mut state = self.lock();
        if secs > 0.0 {
            state.now += secs;
        }
        log::trace!("manual clock advanced to {}", state.now);
        self.changed.notify_all();
    }

    /// Blocks until at least `count` threads are sleeping until some time after now.
    pub fn wait_for_sleepers(&self, count: usize) {
        let mut state = self.lock();
        while state.blocked() < count {
            state = self.changed.wait(state).expect("manual clock poisoned");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().expect("manual clock poisoned")
    }
}

impl ManualState {
    fn blocked(&self) -> usize {
        self.wakeups.iter().filter(|&&wakeup| wakeup > self.now).count()
    }
}

impl Clock for ManualClock {
    fn start(&self) {}

    fn now(&self) -> f64 {
        self.lock().now
    }

    fn sleep(&self, secs: f64) {
        if secs <= 0.0 {
            return;
        }
        let mut state = self.lock();
        let wakeup = state.now + secs;
        state.wakeups.push(wakeup);
        self.changed.notify_all();
        while state.now < wakeup {
            state = self.changed.wait(state).expect("manual clock poisoned");
        }
        if let Some(idx) = state.wakeups.iter().position(|&other| other == wakeup) {
            state.wakeups.swap_remove(idx);
        }
    }
}

impl Clock for ScaledClock {
    fn start(&self) {
        self.epoch.get_or_init(Instant::now);
    }

    fn now(&self) -> f64 {
        match self.epoch.get() {
            Some(epoch) if self.scale > 0.0 => epoch.elapsed().as_secs_f64() / self.scale,
            _ => 0.0,
        }
    }

    fn sleep(&self, secs: f64) {
        if secs > 0.0 && self.scale > 0.0 {
            thread::sleep(Duration::from_secs_f64(secs * self.scale));
        }
    }
}
