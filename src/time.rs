//! Time sources for the engine.
//!
//! `FrameClock` turns the variable timestamps of a render loop into a
//! wall-clock delta (for timers) and a clamped simulation delta (for the
//! tick simulator). `Clock` supplies Unix milliseconds for save stamps and
//! offline catch-up.

use std::cell::Cell;
use std::rc::Rc;

/// Wall-clock source in Unix milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// The real clock: `Date.now()` in the browser, `SystemTime` elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> u64 {
        js_sys::Date::now().max(0.0) as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

/// Hand-driven clock for tests and headless drivers. Clones share the same
/// instant.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self(Rc::new(Cell::new(now_ms)))
    }

    pub fn set(&self, now_ms: u64) {
        self.0.set(now_ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Deltas produced by one [`FrameClock::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameDelta {
    /// Real seconds since the previous frame.
    pub wall_seconds: f64,
    /// `wall_seconds` clamped to the maximum simulation step.
    pub sim_seconds: f64,
}

pub struct FrameClock {
    /// Largest simulation step handed out per frame, in seconds.
    max_step: f64,
    /// Timestamp of the last update (ms), None before the first frame
    last_timestamp: Option<f64>,
}

impl FrameClock {
    /// A negative or NaN `max_step` hands out zero-length steps.
    pub fn new(max_step: f64) -> Self {
        Self {
            max_step: max_step.max(0.0),
            last_timestamp: None,
        }
    }

    /// Feed a frame timestamp (from `performance.now()` or similar).
    ///
    /// The first frame only records the timestamp. Backwards jumps count as
    /// zero elapsed time.
    pub fn update(&mut self, now_ms: f64) -> FrameDelta {
        let wall = match self.last_timestamp {
            Some(prev) => ((now_ms - prev) / 1000.0).max(0.0),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        let sim = wall.min(self.max_step);
        FrameDelta {
            wall_seconds: wall,
            sim_seconds: sim,
        }
    }
}
