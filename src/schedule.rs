//! Cooperative interval timers driven by the engine's frame loop.
//!
//! There is exactly one timer per purpose; rescheduling replaces the
//! period in place, so a change can never leave a second timer behind.

/// A repeating timer measured in seconds of wall time.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalTimer {
    period: Option<f64>,
    elapsed: f64,
}

impl IntervalTimer {
    pub fn new(period_seconds: f64) -> Self {
        let mut timer = Self::disabled();
        timer.reschedule(period_seconds);
        timer
    }

    pub fn disabled() -> Self {
        Self {
            period: None,
            elapsed: 0.0,
        }
    }

    /// Replace the period and restart the countdown. A non-positive period
    /// cancels the timer.
    pub fn reschedule(&mut self, period_seconds: f64) {
        self.period = (period_seconds.is_finite() && period_seconds > 0.0).then_some(period_seconds);
        self.elapsed = 0.0;
    }

    pub fn cancel(&mut self) {
        self.period = None;
        self.elapsed = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<f64> {
        self.period
    }

    /// Advance by `dt` seconds and return how many times the timer fired.
    pub fn advance(&mut self, dt: f64) -> u32 {
        let Some(period) = self.period else {
            return 0;
        };
        if !(dt.is_finite() && dt > 0.0) {
            return 0;
        }
        self.elapsed += dt;
        if self.elapsed < period {
            return 0;
        }
        let fired = (self.elapsed / period).floor();
        self.elapsed -= fired * period;
        fired.min(u32::MAX as f64) as u32
    }
}

/// The engine's two periodic jobs.
#[derive(Clone, Debug)]
pub struct Scheduler {
    pub autosave: IntervalTimer,
    pub trivia: IntervalTimer,
}

/// What fired during one [`Scheduler::advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Due {
    pub autosave: bool,
    pub trivia: bool,
}

impl Scheduler {
    pub fn new(autosave_ms: u64, trivia_seconds: f64) -> Self {
        Self {
            autosave: IntervalTimer::new(autosave_ms as f64 / 1000.0),
            trivia: IntervalTimer::new(trivia_seconds),
        }
    }

    pub fn set_autosave_ms(&mut self, ms: u64) {
        self.autosave.reschedule(ms as f64 / 1000.0);
    }

    /// Several periods elapsing in one call still yield a single job run.
    pub fn advance(&mut self, dt: f64) -> Due {
        Due {
            autosave: self.autosave.advance(dt) > 0,
            trivia: self.trivia.advance(dt) > 0,
        }
    }
}
